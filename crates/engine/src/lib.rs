//! Client library for the remote inference engine.
//!
//! The engine exposes a serverless "submit job / poll status" API: a submit
//! either returns the output inline or a task id to poll. This crate wraps
//! that API ([`api`]), its wire types ([`messages`]) and the tolerant
//! output field lookup the workers rely on ([`output`]).

pub mod api;
pub mod messages;
pub mod output;

pub use api::{EngineApi, EngineConfig, EngineError, InferenceEngine};
pub use messages::{EngineStatus, PendingHandle, StatusResponse, SubmitOutcome};
