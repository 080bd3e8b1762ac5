// ─── Validation diagnostics ───────────────────────────────────

/// Severity of a validation diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic emitted by the schema or semantic validator.
///
/// `code` is stable (`"BPMN 0101"`, `"Style 0103"`, `"SCHEMA-CYCLE"`, …) so
/// callers and tests can match on it without parsing the message.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub message: String,
    /// Element id the issue was detected on, when there is one.
    pub element_id: Option<String>,
}

impl Diagnostic {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: Severity::Error,
            message: message.into(),
            element_id: None,
        }
    }

    pub fn warning(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            severity: Severity::Warning,
            message: message.into(),
            element_id: None,
        }
    }

    pub fn on(mut self, element_id: impl Into<String>) -> Self {
        self.element_id = Some(element_id.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARN",
        };
        if let Some(ref id) = self.element_id {
            write!(
                f,
                "[{}:{}] {} (element: {})",
                self.code, level, self.message, id
            )
        } else {
            write!(f, "[{}:{}] {}", self.code, level, self.message)
        }
    }
}
