//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod generation_result_repo;
pub mod task_queue_repo;

pub use generation_result_repo::GenerationResultRepo;
pub use task_queue_repo::TaskQueueRepo;
