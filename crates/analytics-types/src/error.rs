//! Validation failure shape: a list of
//! `{path, message, code}` violations, never an exception.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidationCode {
    MissingField,
    WrongType,
    Empty,
    InvalidUuid,
    InvalidTimestamp,
    InvalidEnumValue,
    InvalidLiteral,
    UnknownField,
}

impl ValidationCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationCode::MissingField => "missing_field",
            ValidationCode::WrongType => "wrong_type",
            ValidationCode::Empty => "empty",
            ValidationCode::InvalidUuid => "invalid_uuid",
            ValidationCode::InvalidTimestamp => "invalid_timestamp",
            ValidationCode::InvalidEnumValue => "invalid_enum_value",
            ValidationCode::InvalidLiteral => "invalid_literal",
            ValidationCode::UnknownField => "unknown_field",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[error("{path}: {message} ({code:?})")]
pub struct ValidationViolation {
    pub path: String,
    pub message: String,
    pub code: ValidationCode,
}

impl ValidationViolation {
    pub fn new(path: impl Into<String>, message: impl Into<String>, code: ValidationCode) -> Self {
        Self { path: path.into(), message: message.into(), code }
    }
}
