mod channel;
mod facade;

pub(crate) mod message;
pub(crate) mod pending;
pub(crate) mod requests;
pub(crate) mod task;

pub use channel::*;
pub use facade::*;
