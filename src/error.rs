use reqwest::StatusCode;
use thiserror::Error;
use validator::ValidationErrors;

/// Failures of a single REST call against the fleet backend.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("server responded with {status}{}", .detail.as_deref().map(|d| format!(": {}", d)).unwrap_or_default())]
    Server {
        status: StatusCode,
        detail: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl ApiError {
    /// Text to show the user: the server-provided detail when there is one,
    /// otherwise `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            ApiError::Server {
                detail: Some(detail),
                ..
            } if !detail.trim().is_empty() => format!("{}: {}", fallback, detail),
            _ => fallback.to_string(),
        }
    }

    /// Builds a `Server` error from a non-success response body.
    ///
    /// FastAPI reports `{"detail": ...}`, the spreadsheet endpoints report
    /// `{"error": ...}`; anything else falls back to the raw text when it is short.
    pub fn from_response_body(status: StatusCode, body: &str) -> Self {
        let detail = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|value| {
                ["detail", "error", "mensaje"]
                    .iter()
                    .find_map(|key| match value.get(*key) {
                        Some(serde_json::Value::String(s)) => Some(s.clone()),
                        Some(serde_json::Value::Null) | None => None,
                        Some(other) => Some(other.to_string()),
                    })
            })
            .or_else(|| {
                let trimmed = body.trim();
                (!trimmed.is_empty() && trimmed.len() <= 200).then(|| trimmed.to_string())
            });

        ApiError::Server { status, detail }
    }
}

/// Local failures of the bulk import flow, raised before any request goes out.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Solo se permiten archivos Excel (.xlsx o .xls): {name}")]
    UnsupportedExtension { name: String },

    #[error("No se pudo leer el archivo: {0}")]
    Io(#[from] std::io::Error),
}

/// Input errors on the CRUD forms.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("El campo '{field}' debe ser numérico")]
    InvalidNumber { field: &'static str },

    #[error("{}", describe(.0))]
    Invalid(#[from] ValidationErrors),
}

fn describe(errors: &ValidationErrors) -> String {
    let mut lines: Vec<String> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let message = errs
                .iter()
                .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .unwrap_or_else(|| "valor inválido".to_string());
            format!("{}: {}", field, message)
        })
        .collect();
    lines.sort();
    lines.join("\n")
}
