//! Tether Diff - Answer comparison
//!
//! This crate provides:
//! - A character-level Myers alignment driven by a custom comparator
//! - `diff_strings`, which compares a learner's answer to a reference
//!   solution while ignoring case and insignificant punctuation/whitespace

pub mod align;
pub mod answer;

pub use align::*;
pub use answer::*;
