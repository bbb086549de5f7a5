//! Pointer input module
//!
//! The core never talks to the OS. Pointer moves and clicks go through the
//! [`PointerDriver`] trait, implemented by whatever injects input on the host.

pub mod pointer;

pub use pointer::*;

/// Input errors
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Input injection failed: {0}")]
    Injection(String),
}
