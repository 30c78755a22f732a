//! Data types for claim extraction.

pub mod candidate;
pub mod claim;
pub mod config;
pub mod model;
