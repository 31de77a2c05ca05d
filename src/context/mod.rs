pub mod manager;


pub use manager::{ContextEntry, ContextManager};
