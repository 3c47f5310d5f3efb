//! Contracts for the external judgments the workflow depends on.
//!
//! The workflow never decides eligibility or approver authority itself. It assembles a query,
//! asks an oracle, and folds the verdict into the request's state. Implementations live here
//! (`rules`) and in the agent crate (model-backed).

pub mod rules;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::leave::LeaveRequestId;
use crate::domain::policy::{ApproverAuthority, PolicyRule};

pub use rules::RuleBasedOracle;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityQuery {
    pub employee_name: String,
    pub employee_id: String,
    pub employee_role: String,
    pub leave_type: String,
    pub policy_key: String,
    pub duration_days: i64,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    pub current_balance: i64,
    pub policy: PolicyRule,
    pub candidate_approvers: Vec<String>,
}

impl EligibilityQuery {
    /// Saturates: the balance comes straight from the caller.
    pub fn balance_after(&self) -> i64 {
        self.current_balance.saturating_sub(self.duration_days)
    }
}

/// Verdict fields all default so a partially filled model response still decodes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityVerdict {
    #[serde(default)]
    pub eligible: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub required_approvers: Option<Vec<String>>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityQuery {
    pub request_id: LeaveRequestId,
    pub employee_name: String,
    pub employee_role: String,
    pub leave_type: String,
    pub duration_days: i64,
    pub approver_name: String,
    pub approver_role: String,
    pub remaining_approvers: Vec<String>,
    pub approver_authority: Option<ApproverAuthority>,
    pub hierarchy: BTreeMap<String, ApproverAuthority>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorityVerdict {
    #[serde(default)]
    pub has_authority: bool,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub next_approver_required: bool,
}

/// Infrastructure failures, kept apart from a negative verdict.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum OracleError {
    #[error("oracle transport failure: {0}")]
    Transport(String),
    #[error("oracle returned a malformed verdict: {0}")]
    Malformed(String),
    #[error("oracle did not answer within {budget:?}")]
    Timeout { budget: Duration },
}

#[async_trait]
pub trait EligibilityOracle: Send + Sync {
    async fn evaluate(&self, query: &EligibilityQuery) -> Result<EligibilityVerdict, OracleError>;
}

#[async_trait]
pub trait AuthorityOracle: Send + Sync {
    async fn authorize(&self, query: &AuthorityQuery) -> Result<AuthorityVerdict, OracleError>;
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{AuthorityVerdict, EligibilityQuery, EligibilityVerdict, OracleError};
    use crate::domain::policy::{ApprovalChain, PolicyRule};

    fn query(current_balance: i64, duration_days: i64) -> EligibilityQuery {
        let policy = PolicyRule {
            name: "Casual Leave".to_string(),
            annual_quota: 12,
            max_consecutive_days: 3,
            advance_notice_days: 1,
            approval_required: ApprovalChain::Manager,
        };
        EligibilityQuery {
            employee_name: "John Doe".to_string(),
            employee_id: "EMP001".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "casual_leave".to_string(),
            policy_key: "casual_leave".to_string(),
            duration_days,
            start_date: "2025-11-01".to_string(),
            end_date: "2025-11-02".to_string(),
            reason: "Family function".to_string(),
            current_balance,
            candidate_approvers: policy.candidate_approvers(duration_days),
            policy,
        }
    }

    #[test]
    fn verdicts_default_missing_fields() {
        let eligibility: EligibilityVerdict =
            serde_json::from_str(r#"{"reason": "looks fine"}"#).expect("decode");
        assert!(!eligibility.eligible);
        assert_eq!(eligibility.required_approvers, None);
        assert!(eligibility.recommendations.is_empty());

        let authority: AuthorityVerdict =
            serde_json::from_str(r#"{"has_authority": true}"#).expect("decode");
        assert!(authority.has_authority);
        assert!(!authority.next_approver_required);
    }

    #[test]
    fn timeout_error_names_the_budget() {
        assert_eq!(
            OracleError::Timeout { budget: Duration::from_secs(30) }.to_string(),
            "oracle did not answer within 30s"
        );
        assert_eq!(
            OracleError::Timeout { budget: Duration::from_millis(250) }.to_string(),
            "oracle did not answer within 250ms"
        );
    }

    #[test]
    fn balance_after_saturates_on_extreme_balances() {
        assert_eq!(query(12, 2).balance_after(), 10);
        assert_eq!(query(i64::MIN, 2).balance_after(), i64::MIN);
        assert_eq!(query(i64::MAX, -3).balance_after(), i64::MAX);
    }
}
