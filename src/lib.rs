//! Reactive state container with a declarative request pipeline.
//!
//! State lives in one JSON tree addressed by dot/bracket paths. Watchers
//! subscribe to paths and are notified in batches, ensurers before plain
//! watchers. Network calls are declared as endpoints; each call is queued,
//! sent one at a time, optionally answered from a cache, and its response is
//! mapped back into the state tree.
//!
//! # Examples
//! ```ignore
//! let atom = Atom::new(AtomConfig::new()?.validate()?, Arc::new(HttpTransport::default()));
//! atom.create(
//!     "profile",
//!     Definition::Api(
//!         EndpointDefinition::get("/profile.json")
//!             .query(json!({ "jwt": "#user.jwt" }))
//!             .map("onCode200", "user.profile", |res| res.raw.body.clone()),
//!     ),
//! )?;
//! atom.init()?;
//! atom.send("profile", CallArgs::default())?;
//! atom.run_until_idle().await?;
//! ```

mod api;
mod atom;
mod config;
mod definition;
mod errors;
mod reactive;
mod store;

pub mod constants;
pub mod metrics;
pub mod utils;

pub use api::*;
pub use atom::*;
pub use crate::config::*;
pub use definition::*;
pub use errors::*;
pub use reactive::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
