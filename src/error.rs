//! Error taxonomy and the failure-observer contract
//!
//! Every foreign-facing operation that yields no result is funneled through
//! exactly one `FailureReport` before it surfaces as an [`Error`]. The
//! observer is notification-only; propagation always happens through
//! `Result`.

use std::sync::Arc;

/// Crate-wide result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// What kind of foreign-facing operation produced no result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A host value could not be turned into a foreign value.
    Conversion,
    /// A positional tuple or keyword dictionary could not be constructed.
    Build,
    /// Attribute lookup or the call itself produced no result.
    Call,
}

impl FailureKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Conversion => "conversion",
            Self::Build => "build",
            Self::Call => "call",
        }
    }
}

impl core::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of one failing foreign operation, handed to the observer.
#[derive(Debug, Clone)]
pub struct FailureReport {
    /// Failure category.
    pub kind: FailureKind,
    /// What was being converted or called (a type name or method name).
    pub context: String,
    /// Diagnostic text fetched from the foreign runtime, if any was pending.
    /// Fetching clears the runtime's sticky error state.
    pub diagnostic: Option<String>,
}

/// Swappable failure-notification hook.
///
/// `Arc` so that `swap` can return the previous hook and scoped overrides
/// can restore it on drop.
pub type Observer = Arc<dyn Fn(&FailureReport) + Send + Sync>;

/// Default observer: log the failure through `tracing`.
pub(crate) fn default_observer() -> Observer {
    Arc::new(|report: &FailureReport| {
        tracing::error!(
            event = "foreign_failure",
            kind = report.kind.as_str(),
            context = %report.context,
            diagnostic = report.diagnostic.as_deref().unwrap_or("<none>"),
            "foreign operation produced no result"
        );
    })
}

/// Binding-layer error.
#[derive(Debug, Clone)]
pub enum Error {
    /// A host value could not be converted to a foreign value.
    Conversion {
        /// Type or value description.
        what: String,
        /// Foreign diagnostic text, if any.
        diagnostic: Option<String>,
    },
    /// A call frame (tuple or keyword dict) could not be built.
    Build {
        what: String,
        diagnostic: Option<String>,
    },
    /// Attribute lookup or invocation produced no result.
    Call {
        /// Method or attribute name.
        target: String,
        diagnostic: Option<String>,
    },
}

impl Error {
    pub(crate) fn from_report(report: &FailureReport) -> Self {
        match report.kind {
            FailureKind::Conversion => Self::Conversion {
                what: report.context.clone(),
                diagnostic: report.diagnostic.clone(),
            },
            FailureKind::Build => Self::Build {
                what: report.context.clone(),
                diagnostic: report.diagnostic.clone(),
            },
            FailureKind::Call => Self::Call {
                target: report.context.clone(),
                diagnostic: report.diagnostic.clone(),
            },
        }
    }

    /// Diagnostic text fetched from the foreign runtime, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Self::Conversion { diagnostic, .. }
            | Self::Build { diagnostic, .. }
            | Self::Call { diagnostic, .. } => diagnostic.as_deref(),
        }
    }
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Conversion { what, diagnostic } => {
                write!(f, "conversion of {} to a foreign value failed", what)?;
                if let Some(text) = diagnostic {
                    write!(f, ": {}", text)?;
                }
                Ok(())
            }
            Self::Build { what, diagnostic } => {
                write!(f, "failed to build {}", what)?;
                if let Some(text) = diagnostic {
                    write!(f, ": {}", text)?;
                }
                Ok(())
            }
            Self::Call { target, diagnostic } => {
                write!(f, "call to '{}' produced no result", target)?;
                if let Some(text) = diagnostic {
                    write!(f, ": {}", text)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_carries_diagnostic() {
        let err = Error::Call {
            target: "plot".into(),
            diagnostic: Some("TypeError: shape mismatch".into()),
        };
        let text = err.to_string();
        assert!(text.contains("plot"));
        assert!(text.contains("shape mismatch"));
    }

    #[test]
    fn test_report_to_error_kind_mapping() {
        let report = FailureReport {
            kind: FailureKind::Conversion,
            context: "i64".into(),
            diagnostic: None,
        };
        assert!(matches!(
            Error::from_report(&report),
            Error::Conversion { .. }
        ));
    }
}
