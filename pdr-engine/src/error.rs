#![forbid(unsafe_code)]
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

use pdr_logic::SystemError;
use pdr_oracle::OracleError;

use crate::verdict::UnknownReason;

#[derive(Debug, Error, Diagnostic)]
pub enum PdrError {
    /// The oracle could not decide a query. Reported as an `Unknown` verdict.
    #[error("oracle returned unknown: {0}")]
    #[diagnostic(code(pdr::oracle_unknown))]
    OracleUnknown(String),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Oracle(#[from] OracleError),

    /// Reported as an `Unknown` verdict.
    #[error("obligation depth {depth} exceeds the configured bound {limit}")]
    #[diagnostic(
        code(pdr::depth),
        help("raise `max_obligation_depth` (or set PDR_MAX_DEPTH) if the system has long counterexamples")
    )]
    ObligationDepthExceeded { depth: usize, limit: usize },

    #[error(transparent)]
    #[diagnostic(transparent)]
    MalformedTransitionSystem(#[from] SystemError),

    /// A verdict failed independent re-checking. Always a bug in the engine or the oracle.
    #[error("unsound {what}: {message}")]
    #[diagnostic(code(pdr::unsound))]
    Unsound { what: &'static str, message: String },
}

impl PdrError {
    /// Reason for ending a run with `Verdict::Unknown`, for the errors that do
    /// so instead of aborting it. Any other error is handed back unchanged.
    pub fn into_unknown(self) -> Result<UnknownReason, PdrError> {
        match self {
            PdrError::OracleUnknown(why) => Ok(UnknownReason::Oracle(why)),
            PdrError::ObligationDepthExceeded { depth, limit } => {
                Ok(UnknownReason::ObligationDepthExceeded { depth, limit })
            }
            other => Err(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_failures_become_unknown_reasons() {
        let reason = PdrError::OracleUnknown("conflict budget".into()).into_unknown().unwrap();
        assert_eq!(reason, UnknownReason::Oracle("conflict budget".into()));

        let reason = PdrError::ObligationDepthExceeded { depth: 9, limit: 8 }
            .into_unknown()
            .unwrap();
        assert_eq!(reason, UnknownReason::ObligationDepthExceeded { depth: 9, limit: 8 });
    }

    #[test]
    fn faults_are_handed_back() {
        let err = PdrError::Oracle(OracleError::new("bad symbol")).into_unknown().unwrap_err();
        assert!(matches!(err, PdrError::Oracle(_)));

        let err = PdrError::Unsound { what: "trace", message: "x".into() }
            .into_unknown()
            .unwrap_err();
        assert!(matches!(err, PdrError::Unsound { what: "trace", .. }));
    }
}
