//! Domain types shared by the origin service and the generation workers.
//!
//! - [`types`] -- id and timestamp aliases, [`JobId`](types::JobId).
//! - [`kind`] -- the artifact kinds a job can fan out into.
//! - [`task`] -- queued units of work and their wire decoding.
//! - [`envelope`] -- the worker → origin callback payload.
//! - [`result`] -- persisted per-kind results.
//! - [`queue`], [`repository`], [`artifact`] -- the storage seams, implemented
//!   by `prodgen-db`.

pub mod artifact;
pub mod envelope;
pub mod error;
pub mod kind;
pub mod queue;
pub mod repository;
pub mod result;
pub mod task;
pub mod types;
