//! Camera capture client sending frame streams to the detect server.
pub mod sensors;

pub use common::Error;
