//! Row structs for the pipeline tables.

pub mod generation_result;
pub mod task_queue;
