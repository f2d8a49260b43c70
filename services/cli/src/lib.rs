//! Poliglot CLI Library Crate
//!
//! Terminal adapters around `poliglot-core`: environment configuration,
//! prompt loading, speech and bell output, and the text screens. The
//! `poliglot` binary wires them together.

pub mod config;
pub mod prompts;
pub mod speech;
pub mod terminal;
