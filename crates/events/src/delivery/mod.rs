//! External delivery channels.
//!
//! Only the HTTP callback channel exists today; a worker pushes exactly one
//! envelope per finished task through it.

pub mod callback;
