//! Request handlers.

pub mod collections;
pub mod health;
pub mod jobs;

pub use collections::*;
pub use health::*;
pub use jobs::*;
