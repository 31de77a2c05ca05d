pub mod responder;


pub use responder::{FallbackConfig, FallbackResponder, Intent, LAST_RESORT_RESPONSE};
