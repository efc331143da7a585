//! Helpers shared by the unit tests: a context builder around
//! [`crate::MockTransport`], hand-written transports and callback recorders.
mod common;
mod mock_builder;

pub use common::*;
pub use mock_builder::*;
