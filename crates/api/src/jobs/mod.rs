//! The job lifecycle as seen by the origin service.
//!
//! - [`submitter`] fans a request out onto the task queues.
//! - [`receiver`] stores worker callbacks idempotently.
//! - [`status`] aggregates stored results into job completion.

pub mod receiver;
pub mod status;
pub mod submitter;

pub use receiver::{CallbackReceiver, ReceiveError};
pub use status::{JobStatusReport, KindStatus, OverallStatus, StatusAggregator};
pub use submitter::{JobSubmitter, SubmitError, SubmittedJob};
