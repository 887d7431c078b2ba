//! Generation worker library.
//!
//! - [`config`] -- environment-driven worker configuration.
//! - [`consumer`] -- the receive / process / acknowledge loop for one queue.

pub mod config;
pub mod consumer;
