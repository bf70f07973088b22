// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: Apache-2.0

//! Contact submission validator.
//!
//! Checks the decoded request body field by field, in form order:
//! - `name`: required, bounded length
//! - `email`: required, address shape
//! - `company`: optional, bounded length
//! - `message`: required, bounded length
//!
//! Every failing field is reported; callers surface the first one.

use crate::config::ValidationConfig;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Longest address accepted, per RFC 5321 path limits.
const MAX_EMAIL_LEN: usize = 254;

/// Form field a validation error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Name,
    Email,
    Company,
    Message,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name => write!(f, "Name"),
            Self::Email => write!(f, "Email"),
            Self::Company => write!(f, "Company name"),
            Self::Message => write!(f, "Message"),
        }
    }
}

/// Validation error types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid request body")]
    NotAnObject,

    #[error("{0} is required")]
    Missing(Field),

    #[error("{0} must be text")]
    NotText(Field),

    #[error("{field} must be at least {min} characters")]
    TooShort { field: Field, min: usize },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: Field, max: usize },

    #[error("Please enter a valid email address")]
    InvalidEmail,
}

impl ValidationError {
    /// Field the error belongs to, if any.
    pub fn field(&self) -> Option<Field> {
        match self {
            Self::NotAnObject => None,
            Self::Missing(field) | Self::NotText(field) => Some(*field),
            Self::TooShort { field, .. } | Self::TooLong { field, .. } => Some(*field),
            Self::InvalidEmail => Some(Field::Email),
        }
    }
}

/// A submission that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContactSubmission {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub message: String,
}

/// Result of validation.
#[derive(Debug, Clone)]
pub enum ValidationResult {
    /// Submission is valid
    Valid(ContactSubmission),
    /// Submission is invalid; errors are in field order
    Invalid(Vec<ValidationError>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    /// First error in field order.
    pub fn error(&self) -> Option<&ValidationError> {
        match self {
            ValidationResult::Valid(_) => None,
            ValidationResult::Invalid(errors) => errors.first(),
        }
    }

    pub fn errors(&self) -> &[ValidationError] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(errors) => errors,
        }
    }
}

/// Contact form validator.
#[derive(Debug, Clone)]
pub struct ContactValidator {
    config: ValidationConfig,
}

impl ContactValidator {
    /// Create a new validator with the given configuration.
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a decoded request body.
    pub fn validate(&self, body: &Value) -> ValidationResult {
        let Some(fields) = body.as_object() else {
            debug!("Request body is not a JSON object");
            return ValidationResult::Invalid(vec![ValidationError::NotAnObject]);
        };

        let mut errors = Vec::new();

        let name = self
            .required_text(fields, Field::Name)
            .and_then(|name| {
                check_length(
                    Field::Name,
                    name,
                    self.config.name_min_chars,
                    self.config.name_max_chars,
                )
            })
            .map_err(|e| errors.push(e))
            .ok();

        let email = self
            .validate_email(fields.get("email"))
            .map_err(|e| errors.push(e))
            .ok();

        let company = optional_text(fields, Field::Company)
            .and_then(|company| match company {
                Some(c) => check_length(Field::Company, c, 0, self.config.company_max_chars).map(Some),
                None => Ok(None),
            })
            .map_err(|e| errors.push(e))
            .ok();

        let message = self
            .required_text(fields, Field::Message)
            .and_then(|message| {
                check_length(
                    Field::Message,
                    message,
                    self.config.message_min_chars,
                    self.config.message_max_chars,
                )
            })
            .map_err(|e| errors.push(e))
            .ok();

        match (name, email, company, message) {
            (Some(name), Some(email), Some(company), Some(message)) if errors.is_empty() => {
                ValidationResult::Valid(ContactSubmission {
                    name: name.to_string(),
                    email: email.to_string(),
                    company: company.map(str::to_string),
                    message: message.to_string(),
                })
            }
            _ => {
                debug!(errors = errors.len(), "Contact submission invalid");
                ValidationResult::Invalid(errors)
            }
        }
    }

    /// Validate an email field on its own (also used by newsletter signup).
    pub fn validate_email<'a>(&self, value: Option<&'a Value>) -> Result<&'a str, ValidationError> {
        let email = text_value(value, Field::Email)?.ok_or(ValidationError::Missing(Field::Email))?;
        if is_valid_email(email) {
            Ok(email)
        } else {
            debug!("Email address rejected");
            Err(ValidationError::InvalidEmail)
        }
    }

    fn required_text<'a>(
        &self,
        fields: &'a Map<String, Value>,
        field: Field,
    ) -> Result<&'a str, ValidationError> {
        optional_text(fields, field)?.ok_or(ValidationError::Missing(field))
    }
}

fn field_key(field: Field) -> &'static str {
    match field {
        Field::Name => "name",
        Field::Email => "email",
        Field::Company => "company",
        Field::Message => "message",
    }
}

/// Trimmed text for `field`; absent, null and blank all read as `None`.
fn optional_text<'a>(
    fields: &'a Map<String, Value>,
    field: Field,
) -> Result<Option<&'a str>, ValidationError> {
    text_value(fields.get(field_key(field)), field)
}

fn text_value(value: Option<&Value>, field: Field) -> Result<Option<&str>, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => {
            let trimmed = s.trim();
            Ok((!trimmed.is_empty()).then_some(trimmed))
        }
        Some(_) => Err(ValidationError::NotText(field)),
    }
}

fn check_length(field: Field, value: &str, min: usize, max: usize) -> Result<&str, ValidationError> {
    let chars = value.chars().count();
    if chars < min {
        Err(ValidationError::TooShort { field, min })
    } else if chars > max {
        Err(ValidationError::TooLong { field, max })
    } else {
        Ok(value)
    }
}

/// Structural address check: one `@`, non-empty local part, dotted domain
/// with non-empty labels that do not start or end with a hyphen.
fn is_valid_email(email: &str) -> bool {
    if email.len() > MAX_EMAIL_LEN || email.chars().any(char::is_whitespace) {
        return false;
    }

    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') || !domain.contains('.') {
        return false;
    }

    domain.split('.').all(|label| {
        !label.is_empty()
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_alphanumeric() || c == '-')
    })
}
