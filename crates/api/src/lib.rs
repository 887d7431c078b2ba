//! Origin service for the generation pipeline.
//!
//! Accepts generation requests, fans them out onto the task queues,
//! receives worker callbacks and answers status polls. Exposed as a library
//! so integration tests and the binary entrypoint share the same router.

pub mod config;
pub mod error;
pub mod handlers;
pub mod jobs;
pub mod response;
pub mod router;
pub mod routes;
pub mod state;
