use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::catalog::same_role;
use crate::domain::policy::PolicyRule;
use crate::errors::DomainError;
use crate::oracle::EligibilityVerdict;

pub const LEAVE_DATE_FORMAT: &str = "%Y-%m-%d";
pub const REQUEST_ID_PREFIX: &str = "LR";

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LeaveRequestId(pub String);

impl LeaveRequestId {
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("{REQUEST_ID_PREFIX}-{sequence:04}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaveRequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    PendingApproval,
    Approved,
    Rejected,
    Error,
}

impl LeaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }

    /// Statuses that still accept an approval submission.
    pub fn accepts_approvals(&self) -> bool {
        matches!(self, Self::Pending | Self::PendingApproval)
    }
}

impl fmt::Display for LeaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub approver_name: String,
    pub approver_role: String,
    pub decision: String,
    pub comments: String,
    pub timestamp: DateTime<Utc>,
}

/// Decisions are free text; only a case-insensitive `rejected` terminates the request.
pub fn is_rejection(decision: &str) -> bool {
    decision.trim().eq_ignore_ascii_case("rejected")
}

/// Caller-supplied fields for a new leave request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeaveRequest {
    pub employee_name: String,
    pub employee_id: String,
    pub employee_role: String,
    pub leave_type: String,
    pub start_date: String,
    pub end_date: String,
    pub reason: String,
    #[serde(default)]
    pub current_balance: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalSubmission {
    pub request_id: LeaveRequestId,
    pub approver_name: String,
    pub approver_role: String,
    pub decision: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveRequest {
    pub id: LeaveRequestId,
    pub employee_name: String,
    pub employee_id: String,
    pub employee_role: String,
    pub leave_type: String,
    pub policy_key: Option<String>,
    pub start_date: String,
    pub end_date: String,
    pub duration_days: Option<i64>,
    pub reason: String,
    pub current_balance: Option<i64>,
    pub status: LeaveStatus,
    pub required_approvers: Vec<String>,
    pub approvals: Vec<ApprovalRecord>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub error_message: Option<String>,
    pub eligibility: Option<EligibilityVerdict>,
    pub policy: Option<PolicyRule>,
}

impl LeaveRequest {
    /// A `pending` record carrying the caller's fields and nothing else.
    pub fn pending(id: LeaveRequestId, input: NewLeaveRequest, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            employee_name: input.employee_name,
            employee_id: input.employee_id,
            employee_role: input.employee_role,
            leave_type: input.leave_type,
            policy_key: None,
            start_date: input.start_date,
            end_date: input.end_date,
            duration_days: None,
            reason: input.reason,
            current_balance: input.current_balance,
            status: LeaveStatus::Pending,
            required_approvers: Vec::new(),
            approvals: Vec::new(),
            created_at,
            approved_at: None,
            rejection_reason: None,
            error_message: None,
            eligibility: None,
            policy: None,
        }
    }

    pub fn can_transition_to(&self, next: LeaveStatus) -> bool {
        use LeaveStatus::{Approved, Error, Pending, PendingApproval, Rejected};

        matches!(
            (self.status, next),
            (Pending, PendingApproval)
                | (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Error)
                | (PendingApproval, PendingApproval)
                | (PendingApproval, Approved)
                | (PendingApproval, Rejected)
        )
    }

    pub fn transition_to(&mut self, next: LeaveStatus) -> Result<(), DomainError> {
        if self.can_transition_to(next) {
            self.status = next;
            return Ok(());
        }

        Err(DomainError::InvalidLeaveTransition { from: self.status, to: next })
    }

    /// Removes `role` from the outstanding approvers, returning whether it was present.
    pub fn clear_required_approver(&mut self, role: &str) -> bool {
        let before = self.required_approvers.len();
        self.required_approvers.retain(|required| !same_role(required, role));
        self.required_approvers.len() != before
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LeavePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl LeavePeriod {
    pub fn parse(start: &str, end: &str) -> Result<Self, DomainError> {
        Ok(Self { start: parse_leave_date(start)?, end: parse_leave_date(end)? })
    }

    /// Inclusive of both endpoints; non-positive for reversed ranges.
    pub fn duration_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn is_reversed(&self) -> bool {
        self.end < self.start
    }
}

fn parse_leave_date(raw: &str) -> Result<NaiveDate, DomainError> {
    NaiveDate::parse_from_str(raw.trim(), LEAVE_DATE_FORMAT)
        .map_err(|_| DomainError::InvalidDate { value: raw.to_string() })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::{
        is_rejection, LeavePeriod, LeaveRequest, LeaveRequestId, LeaveStatus, NewLeaveRequest,
    };
    use crate::errors::DomainError;

    fn request() -> LeaveRequest {
        LeaveRequest::pending(
            LeaveRequestId::from_sequence(1),
            NewLeaveRequest {
                employee_name: "John Doe".to_string(),
                employee_id: "EMP001".to_string(),
                employee_role: "employee".to_string(),
                leave_type: "casual_leave".to_string(),
                start_date: "2025-11-01".to_string(),
                end_date: "2025-11-02".to_string(),
                reason: "Family function".to_string(),
                current_balance: Some(12),
            },
            Utc::now(),
        )
    }

    #[test]
    fn request_ids_are_zero_padded_with_prefix() {
        assert_eq!(LeaveRequestId::from_sequence(1).as_str(), "LR-0001");
        assert_eq!(LeaveRequestId::from_sequence(42).to_string(), "LR-0042");
        assert_eq!(LeaveRequestId::from_sequence(12345).as_str(), "LR-12345");
    }

    #[test]
    fn duration_is_inclusive_of_both_endpoints() {
        let same_day = LeavePeriod::parse("2025-11-03", "2025-11-03").expect("same day");
        assert_eq!(same_day.duration_days(), 1);

        let week = LeavePeriod::parse("2025-12-20", "2025-12-27").expect("week");
        assert_eq!(week.duration_days(), 8);

        let across_month = LeavePeriod::parse("2025-01-30", "2025-02-02").expect("month");
        assert_eq!(across_month.duration_days(), 4);
    }

    #[test]
    fn reversed_period_has_non_positive_duration() {
        let reversed = LeavePeriod::parse("2025-11-05", "2025-11-03").expect("parse");
        assert!(reversed.is_reversed());
        assert_eq!(reversed.duration_days(), -1);
    }

    #[test]
    fn unparsable_dates_are_rejected() {
        let error = LeavePeriod::parse("2025/11/05", "2025-11-06").expect_err("bad format");
        assert_eq!(error, DomainError::InvalidDate { value: "2025/11/05".to_string() });
    }

    #[test]
    fn terminal_statuses_refuse_every_transition() {
        for terminal in [LeaveStatus::Approved, LeaveStatus::Rejected, LeaveStatus::Error] {
            let mut record = request();
            record.status = terminal;
            assert!(!terminal.accepts_approvals());
            for next in [LeaveStatus::PendingApproval, LeaveStatus::Approved, LeaveStatus::Rejected]
            {
                assert!(record.transition_to(next).is_err(), "{terminal} -> {next} must fail");
            }
            assert_eq!(record.status, terminal);
        }
    }

    #[test]
    fn pending_approval_can_loop_and_close() {
        let mut record = request();
        record.transition_to(LeaveStatus::PendingApproval).expect("pending -> pending_approval");
        record.transition_to(LeaveStatus::PendingApproval).expect("self loop");
        record.transition_to(LeaveStatus::Approved).expect("pending_approval -> approved");
        assert_eq!(record.status, LeaveStatus::Approved);
    }

    #[test]
    fn error_status_is_only_reachable_from_pending() {
        let mut record = request();
        record.status = LeaveStatus::PendingApproval;
        assert!(!record.can_transition_to(LeaveStatus::Error));
    }

    #[test]
    fn clearing_required_approver_is_case_insensitive() {
        let mut record = request();
        record.required_approvers = vec!["manager".to_string(), "hr".to_string()];

        assert!(record.clear_required_approver("Manager"));
        assert_eq!(record.required_approvers, vec!["hr"]);
        assert!(!record.clear_required_approver("director"));
        assert_eq!(record.required_approvers, vec!["hr"]);

        record.required_approvers = vec!["ärztin".to_string()];
        assert!(record.clear_required_approver(" Ärztin "));
        assert!(record.required_approvers.is_empty());
    }

    #[test]
    fn rejection_match_ignores_case_and_padding() {
        assert!(is_rejection("rejected"));
        assert!(is_rejection(" REJECTED "));
        assert!(!is_rejection("approved"));
        assert!(!is_rejection("reject"));
    }

    #[test]
    fn status_serializes_to_snake_case() {
        let encoded = serde_json::to_string(&LeaveStatus::PendingApproval).expect("encode");
        assert_eq!(encoded, "\"pending_approval\"");
    }
}
