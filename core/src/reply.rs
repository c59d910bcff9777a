use serde::Deserialize;
use serde_json::Value;

use crate::errors::{ApiError, ApiResult, FieldErrors};

/// A response decoded once at the boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 2xx without `success: false`; carries the full body.
    Ok(Value),
    /// Anything else that still produced a response.
    Fail {
        status: u16,
        message: String,
        field_errors: FieldErrors,
    },
}

/// The parts of the backend's JSON envelope the pipeline looks at.
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    errors: Option<FieldErrors>,
}

impl Reply {
    /// Decode a status code and body into a tagged reply.
    pub fn decode(status: u16, body: Value) -> Self {
        let envelope = match &body {
            Value::Object(_) => Envelope::deserialize(&body).unwrap_or_default(),
            _ => Envelope::default(),
        };

        let is_success = (200..300).contains(&status) && envelope.success != Some(false);
        if is_success {
            return Reply::Ok(body);
        }

        let message = envelope
            .message
            .or(envelope.error)
            .or_else(|| match &body {
                Value::String(text) if !text.trim().is_empty() => Some(text.clone()),
                _ => None,
            })
            .unwrap_or_else(|| default_message(status).to_string());

        Reply::Fail {
            status,
            message,
            field_errors: envelope.errors.unwrap_or_default(),
        }
    }

    /// Collapse into the error taxonomy.
    pub fn into_result(self) -> ApiResult<Value> {
        match self {
            Reply::Ok(body) => Ok(body),
            Reply::Fail {
                status,
                message,
                field_errors,
            } => Err(ApiError::from_status(status, message, field_errors)),
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Reply::Ok(_))
    }
}

/// Extract the `data` member of an envelope, or the body itself when absent.
pub fn payload(body: Value) -> Value {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(data) => data,
            None => Value::Object(map),
        },
        other => other,
    }
}

fn default_message(status: u16) -> &'static str {
    match status {
        200..=299 => "Request was not successful",
        401 => "Unauthenticated",
        404 => "Resource not found",
        422 => "The given data was invalid",
        500..=599 => "Server error",
        _ => "Request failed",
    }
}
