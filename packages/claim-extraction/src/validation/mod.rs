//! Rule-based claim validation and classification.

pub mod classifier;
pub mod patterns;
pub mod validator;

pub use classifier::ClaimTypeClassifier;
pub use patterns::{PatternCategory, PatternLibrary, PatternLibrarySpec};
pub use validator::ClaimValidator;
