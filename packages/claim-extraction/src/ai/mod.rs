//! Extractor implementations.
//!
//! This module provides a reference implementation of the `Extractor` trait.
//! Users can use it directly or implement their own.

mod openai;

pub use openai::OpenAICompatibleExtractor;
