use serde::{Deserialize, Deserializer};
use tracing::debug;

/// Push-delivered status update for a running import.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "tipo")]
pub enum ProgressMessage {
    #[serde(rename = "progreso")]
    Progress {
        #[serde(rename = "progreso", default, deserialize_with = "null_as_zero")]
        percentage: f64,
        #[serde(rename = "mensaje", default)]
        text: Option<String>,
    },
    #[serde(rename = "completado")]
    Completed {
        #[serde(rename = "exitosos", default)]
        successes: usize,
        #[serde(rename = "fallidos", default)]
        failures: usize,
        #[serde(rename = "errores", default)]
        errors: Option<Vec<String>>,
    },
    /// Server-side failure report. Informational only.
    #[serde(rename = "error")]
    Error {
        #[serde(rename = "mensaje", default)]
        text: Option<String>,
    },
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

impl ProgressMessage {
    /// Decodes one channel frame; unknown or malformed frames yield `None`.
    pub fn parse(frame: &str) -> Option<Self> {
        match serde_json::from_str(frame) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!(error = %e, %frame, "ignoring unrecognised progress frame");
                None
            }
        }
    }
}

/// Percentage clamped to 0..=100.
pub fn clamp_percentage(value: f64) -> u8 {
    if value.is_nan() {
        0
    } else {
        value.round().clamp(0.0, 100.0) as u8
    }
}
