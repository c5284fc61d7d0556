//! Shared utility helpers.

pub mod duration;
