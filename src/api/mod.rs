//! Declarative request pipeline.
//!
//! An [`EndpointDefinition`] describes a call. Each call becomes a
//! [`RequestModel`] that goes through the [`DispatchQueue`] (one request in
//! flight at a time, only while `api.online` is true), is answered from the
//! [`ResponseCache`] or the [`Transport`], and finally runs through the
//! [`HandlerPipeline`] which writes results back into the store.

mod cache;
mod dispatch;
mod endpoint;
mod flags;
mod handlers;
#[cfg(feature = "http")]
mod http;
mod queue;
mod request;
mod response;
mod transport;

pub use cache::*;
pub use endpoint::*;
pub use handlers::*;
#[cfg(feature = "http")]
pub use http::*;
pub use queue::*;
pub use request::*;
pub use response::*;
pub use transport::*;

#[cfg(test)]
mod pipeline_test;
