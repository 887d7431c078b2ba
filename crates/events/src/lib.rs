//! Outbound delivery of worker results.
//!
//! - [`delivery`] -- the callback channel from a worker back to the origin
//!   service, with bounded fixed-delay retry.

pub mod delivery;

pub use delivery::callback::{CallbackDelivery, CallbackError, CallbackSink, RetryPolicy};
