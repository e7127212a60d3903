// Public API for integration tests and potential library usage

pub mod artifact;
pub mod collector;
pub mod error;
pub mod notify;
pub mod protocol;
pub mod state;
pub mod timer;
pub mod topics;
pub mod types;
pub mod ws;
