//! Property-pattern rules: loading and validation.

pub mod action;
pub mod model;
pub mod validator;

pub use action::{PatternAction, PayloadKind};
pub use model::{PatternPayload, PropertyPatternLists, PropertyPatterns};
pub use validator::{
    PatternValidator, RowSink, ValidationSummary, ValidatorOptions,
};
