//! Core trait abstractions for the claim extraction library.
//!
//! These traits define the interfaces that applications implement
//! to provide model access and usage accounting.

pub mod extractor;
pub mod usage;
