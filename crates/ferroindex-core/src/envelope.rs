use serde::{Deserialize, Serialize};

use crate::{ConfigError, UtcDateTime};

pub const SCHEMA_VERSION: &str = "v1.0.0";

/// Standard response envelope for all `ferroindex` machine-readable outputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub meta: EnvelopeMeta,
    pub data: T,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<EnvelopeError>,
}

impl<T> Envelope<T> {
    /// Wrap `data`, checking the meta block and every error payload.
    pub fn with_errors(
        meta: EnvelopeMeta,
        data: T,
        errors: Vec<EnvelopeError>,
    ) -> Result<Self, ConfigError> {
        meta.validate()?;
        errors.iter().try_for_each(EnvelopeError::validate)?;
        Ok(Self { meta, data, errors })
    }
}

/// Metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeMeta {
    pub request_id: String,
    pub schema_version: String,
    pub generated_at: UtcDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    pub latency_ms: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl EnvelopeMeta {
    /// Meta stamped with the current time and [`SCHEMA_VERSION`].
    pub fn new(request_id: impl Into<String>, latency_ms: u64) -> Result<Self, ConfigError> {
        let meta = Self {
            request_id: request_id.into(),
            schema_version: SCHEMA_VERSION.to_owned(),
            generated_at: UtcDateTime::now(),
            index: None,
            latency_ms,
            warnings: Vec::new(),
        };
        meta.validate()?;
        Ok(meta)
    }

    pub fn with_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn push_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.request_id.trim().len() {
            len if len < 8 => Err(ConfigError::InvalidRequestId),
            _ => Ok(()),
        }
    }
}

/// Structured error payload, one per blocking finding or failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl EnvelopeError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Result<Self, ConfigError> {
        let error = Self {
            code: code.into(),
            message: message.into(),
            field: None,
        };
        error.validate()?;
        Ok(error)
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.code.trim().is_empty() {
            Err(ConfigError::EmptyErrorCode)
        } else if self.message.trim().is_empty() {
            Err(ConfigError::EmptyErrorMessage)
        } else {
            Ok(())
        }
    }
}
