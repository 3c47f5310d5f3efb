use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::leave::{LeaveRequestId, LeaveStatus};
use crate::errors::DomainError;
use crate::oracle::{AuthorityVerdict, OracleError};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalReceipt {
    pub request_id: LeaveRequestId,
    pub message: String,
    pub previous_status: LeaveStatus,
    pub new_status: LeaveStatus,
    pub remaining_approvers: Vec<String>,
    pub validation: AuthorityVerdict,
}

/// Every variant leaves the stored request exactly as it was.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApprovalError {
    #[error("request `{request_id}` not found")]
    NotFound { request_id: LeaveRequestId },
    #[error("request is already {status}")]
    AlreadyTerminal { request_id: LeaveRequestId, status: LeaveStatus },
    #[error("approver does not have authority: {reason}")]
    AuthorityDenied { request_id: LeaveRequestId, reason: String },
    #[error("authority validation failed: {0}")]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Invariant(#[from] DomainError),
}

impl ApprovalError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyTerminal { .. } => "already_terminal",
            Self::AuthorityDenied { .. } => "authority_denied",
            Self::Oracle(_) => "oracle_failure",
            Self::Invariant(_) => "invariant_violation",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ApprovalError;
    use crate::domain::leave::{LeaveRequestId, LeaveStatus};
    use crate::oracle::OracleError;

    #[test]
    fn already_terminal_message_names_current_status() {
        let error = ApprovalError::AlreadyTerminal {
            request_id: LeaveRequestId::from_sequence(1),
            status: LeaveStatus::Approved,
        };
        assert_eq!(error.to_string(), "request is already approved");
        assert_eq!(error.kind(), "already_terminal");
    }

    #[test]
    fn oracle_failures_are_distinct_from_denials() {
        let failure = ApprovalError::from(OracleError::Transport("connection refused".into()));
        assert_eq!(failure.kind(), "oracle_failure");

        let denial = ApprovalError::AuthorityDenied {
            request_id: LeaveRequestId::from_sequence(1),
            reason: "duration exceeds limit".into(),
        };
        assert_eq!(denial.to_string(), "approver does not have authority: duration exceeds limit");
    }
}
