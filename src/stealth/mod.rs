//! Stealth module
//!
//! Randomized timing so automated motion does not replay at a fixed pace:
//! - per-waypoint speed multipliers
//! - a short pause before each click
//! - random headings for idle movement

pub mod humanize;

pub use humanize::*;
