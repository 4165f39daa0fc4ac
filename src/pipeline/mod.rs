//! # Assembly Pipeline
//!
//! The pipeline engine coordinates trimming, canvas selection, letterbox
//! normalization, and final concatenation/encoding into one showreel.

pub mod engine;

pub use engine::ReelEngine;
