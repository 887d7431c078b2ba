//! Worker-side generation pipeline.
//!
//! Turns one decoded [`Task`](prodgen_core::task::Task) into at most one
//! callback:
//!
//! - [`prompt`] -- deterministic prompt and engine-input builders.
//! - [`translate`] -- product-name translation for image prompts.
//! - [`poll`] -- the bounded, cancellable engine status loop.
//! - [`processor`] -- the per-task state machine tying them together.

pub mod poll;
pub mod processor;
pub mod prompt;
pub mod translate;

pub use poll::{PollOutcome, PollPolicy};
pub use processor::{AbortReason, PollPolicies, TaskOutcome, TaskProcessor};
pub use translate::{DeeplTranslator, PassthroughTranslator, TranslateError, Translator};
