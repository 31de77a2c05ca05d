pub mod registry;


pub use registry::{BreakerRegistry, BreakerState};
