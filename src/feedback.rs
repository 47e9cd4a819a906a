// 🔔 Feedback - Outcome → message, severity, sound, badge
//
// Single mapping table for everything the kiosk shows or plays after a
// submission. Rendering and audio synthesis live outside the crate; they
// receive a `Severity` and, for audio, the `Tone` sequence to play.

use crate::rules::{Decision, Outcome};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success, // Access granted
    Warning, // Access granted, something needs attention
    Error,   // No access
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Warning => "warning",
            Severity::Error => "error",
        }
    }

    /// Beep pattern for this severity
    pub fn tones(&self) -> Vec<Tone> {
        match self {
            // Short rising "coin" chirp
            Severity::Success => vec![Tone {
                waveform: Waveform::Sine,
                start_hz: 880.0,
                end_hz: 1760.0,
                offset_secs: 0.0,
                duration_secs: 0.3,
                gain: 0.3,
            }],
            Severity::Warning => [0.0, 0.3]
                .iter()
                .map(|&offset_secs| Tone {
                    waveform: Waveform::Sine,
                    start_hz: 660.0,
                    end_hz: 660.0,
                    offset_secs,
                    duration_secs: 0.2,
                    gain: 0.4,
                })
                .collect(),
            // Three loud falling square beeps
            Severity::Error => [0.0, 0.2, 0.4]
                .iter()
                .map(|&offset_secs| Tone {
                    waveform: Waveform::Square,
                    start_hz: 600.0,
                    end_hz: 400.0,
                    offset_secs,
                    duration_secs: 0.15,
                    gain: 0.5,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    Sine,
    Square,
}

/// One beep: frequency sweep from `start_hz` to `end_hz`, decaying from `gain`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tone {
    pub waveform: Waveform,
    pub start_hz: f64,
    pub end_hz: f64,
    pub offset_secs: f64,
    pub duration_secs: f64,
    pub gain: f64,
}

/// What the kiosk renders for one decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub message: String,
    pub severity: Severity,

    /// Short label for the submit button ("Adelante", "Denegado", ...)
    pub badge: String,
}

pub fn feedback_for(decision: &Decision) -> Feedback {
    let nombre = decision.member_name().unwrap_or_default();

    let (message, severity, badge) = match &decision.outcome {
        Outcome::Allowed => (
            format!("¡Bienvenido/a {}! Acceso Permitido.", nombre),
            Severity::Success,
            "Adelante",
        ),
        Outcome::AllowedWithWarning => (
            format!(
                "¡Bienvenido/a {}! Acceso Permitido, pero tu último pago de Mensualidad está PENDIENTE.",
                nombre
            ),
            Severity::Warning,
            "Adelante (pendiente)",
        ),
        Outcome::Denied => {
            let parts: Vec<String> = decision.reasons.iter().map(|r| r.to_string()).collect();
            (
                format!("Hola {}, acceso denegado: {}.", nombre, parts.join(" y ")),
                Severity::Error,
                "Denegado",
            )
        }
        Outcome::NotFound => (
            "DNI no encontrado en el sistema.".to_string(),
            Severity::Error,
            "No Existe",
        ),
        Outcome::ValidationError(err) => (err.to_string(), Severity::Error, "Inválido"),
    };

    Feedback {
        message,
        severity,
        badge: badge.to_string(),
    }
}

// ============================================================================
// TESTS
// ============================================================================
