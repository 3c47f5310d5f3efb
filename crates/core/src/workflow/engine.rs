use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink};
use crate::catalog::{normalize_key, PolicyCatalog};
use crate::domain::leave::{
    is_rejection, ApprovalRecord, ApprovalSubmission, LeavePeriod, LeaveRequest, LeaveRequestId,
    LeaveStatus, NewLeaveRequest,
};
use crate::domain::policy::PolicyRule;
use crate::oracle::{
    AuthorityOracle, AuthorityQuery, EligibilityOracle, EligibilityQuery, EligibilityVerdict,
    OracleError,
};
use crate::store::LeaveStore;
use crate::summary::LeaveSummary;
use crate::workflow::outcome::{ApprovalError, ApprovalReceipt};

/// Used when an eligible verdict names no approvers.
pub const DEFAULT_APPROVER_ROLE: &str = "manager";
const DEFAULT_POLICY_VIOLATION: &str = "policy violation";
const DEFAULT_REJECTION_REASON: &str = "rejected by approver";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkflowSettings {
    pub oracle_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self { oracle_timeout: Duration::from_secs(90) }
    }
}

/// Drives leave requests from intake to a terminal status.
///
/// Creation always appends exactly one record, whatever the oracle says. Approvals hold the
/// record's write gate from the terminal-status check through the final commit, so two
/// approvers racing on one request are serialized and neither can act on a stale status.
/// Reads only copy the committed record and never wait on an approval in flight.
pub struct LeaveWorkflow {
    catalog: Arc<PolicyCatalog>,
    store: Arc<LeaveStore>,
    eligibility: Arc<dyn EligibilityOracle>,
    authority: Arc<dyn AuthorityOracle>,
    audit: Arc<dyn AuditSink>,
    settings: WorkflowSettings,
}

enum IntakeDecision {
    Rejected(String),
    Failed(String),
    AwaitingApproval(Vec<String>),
}

struct Intake {
    policy: Option<(String, PolicyRule)>,
    duration_days: Option<i64>,
    current_balance: Option<i64>,
    verdict: Option<EligibilityVerdict>,
    decision: IntakeDecision,
}

impl Intake {
    fn rejected(reason: impl Into<String>) -> Self {
        Self {
            policy: None,
            duration_days: None,
            current_balance: None,
            verdict: None,
            decision: IntakeDecision::Rejected(reason.into()),
        }
    }

    fn apply(self, mut record: LeaveRequest) -> LeaveRequest {
        if let Some((key, policy)) = self.policy {
            record.policy_key = Some(key);
            record.policy = Some(policy);
        }
        record.duration_days = self.duration_days;
        if self.current_balance.is_some() {
            record.current_balance = self.current_balance;
        }
        record.eligibility = self.verdict;

        // Fresh records are `pending`, from which every intake outcome is reachable.
        match self.decision {
            IntakeDecision::Rejected(reason) => {
                record.status = LeaveStatus::Rejected;
                record.rejection_reason = Some(reason);
            }
            IntakeDecision::Failed(message) => {
                record.status = LeaveStatus::Error;
                record.error_message = Some(message);
            }
            IntakeDecision::AwaitingApproval(approvers) => {
                record.status = LeaveStatus::PendingApproval;
                record.required_approvers = approvers;
            }
        }
        record
    }
}

impl LeaveWorkflow {
    pub fn new(
        catalog: Arc<PolicyCatalog>,
        store: Arc<LeaveStore>,
        eligibility: Arc<dyn EligibilityOracle>,
        authority: Arc<dyn AuthorityOracle>,
    ) -> Self {
        Self {
            catalog,
            store,
            eligibility,
            authority,
            audit: Arc::new(NoopAuditSink),
            settings: WorkflowSettings::default(),
        }
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn catalog(&self) -> &PolicyCatalog {
        &self.catalog
    }

    /// Records a new request and runs the eligibility check.
    ///
    /// Never fails: validation problems and negative verdicts end in `rejected`, oracle
    /// failures in `error`. The stored snapshot is returned.
    pub async fn create_leave_request(&self, input: NewLeaveRequest) -> LeaveRequest {
        let correlation_id = Uuid::new_v4().to_string();
        let created_at = Utc::now();
        let intake = self.assess(&input, &correlation_id).await;
        let record = self
            .store
            .append_with(|id| intake.apply(LeaveRequest::pending(id, input, created_at)))
            .await;

        tracing::info!(
            event_name = "leave.request_created",
            correlation_id = %correlation_id,
            request_id = %record.id,
            employee_id = %record.employee_id,
            leave_type = %record.leave_type,
            status = %record.status,
            "leave request recorded"
        );

        let (event_type, category, outcome) = match record.status {
            LeaveStatus::PendingApproval => {
                ("leave.request_created", AuditCategory::Request, AuditOutcome::Success)
            }
            LeaveStatus::Error => {
                ("leave.eligibility_failed", AuditCategory::Eligibility, AuditOutcome::Failed)
            }
            _ => ("leave.request_rejected", AuditCategory::Eligibility, AuditOutcome::Rejected),
        };
        let mut event = AuditEvent::new(
            Some(record.id.clone()),
            correlation_id,
            event_type,
            category,
            record.employee_id.clone(),
            outcome,
        )
        .with_metadata("status", record.status.as_str())
        .with_metadata("leave_type", record.leave_type.clone());
        if let Some(reason) = record.rejection_reason.as_ref().or(record.error_message.as_ref()) {
            event = event.with_metadata("reason", reason.clone());
        }
        if !record.required_approvers.is_empty() {
            event = event.with_metadata("required_approvers", record.required_approvers.join(","));
        }
        self.audit.emit(event);

        record
    }

    /// Applies one approver's decision to a request that still accepts approvals.
    ///
    /// On any `Err` the stored request is untouched.
    pub async fn process_approval(
        &self,
        submission: ApprovalSubmission,
    ) -> Result<ApprovalReceipt, ApprovalError> {
        let correlation_id = Uuid::new_v4().to_string();
        let request_id = submission.request_id.clone();

        let result = self.apply_approval(&submission, &correlation_id).await;
        match &result {
            Ok(receipt) => {
                tracing::info!(
                    event_name = "leave.approval_recorded",
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    approver_role = %submission.approver_role,
                    from = %receipt.previous_status,
                    to = %receipt.new_status,
                    "approval recorded"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(request_id),
                        correlation_id,
                        "leave.approval_recorded",
                        AuditCategory::Approval,
                        submission.approver_name.clone(),
                        AuditOutcome::Success,
                    )
                    .with_metadata("approver_role", submission.approver_role.clone())
                    .with_metadata("decision", submission.decision.clone())
                    .with_metadata("from", receipt.previous_status.as_str())
                    .with_metadata("to", receipt.new_status.as_str()),
                );
            }
            Err(error) => {
                let (event_type, outcome) = match error {
                    ApprovalError::AuthorityDenied { .. }
                    | ApprovalError::AlreadyTerminal { .. } => {
                        ("leave.approval_denied", AuditOutcome::Rejected)
                    }
                    _ => ("leave.approval_failed", AuditOutcome::Failed),
                };
                tracing::warn!(
                    event_name = event_type,
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    approver_role = %submission.approver_role,
                    error_kind = error.kind(),
                    error = %error,
                    "approval not applied"
                );
                self.audit.emit(
                    AuditEvent::new(
                        Some(request_id),
                        correlation_id,
                        event_type,
                        AuditCategory::Approval,
                        submission.approver_name.clone(),
                        outcome,
                    )
                    .with_metadata("approver_role", submission.approver_role.clone())
                    .with_metadata("error_kind", error.kind())
                    .with_metadata("reason", error.to_string()),
                );
            }
        }
        result
    }

    pub async fn find(&self, id: &LeaveRequestId) -> Option<LeaveRequest> {
        self.store.find_by_id(id).await
    }

    pub async fn all(&self) -> Vec<LeaveRequest> {
        self.store.all().await
    }

    pub async fn summarize(&self, employee_id: &str) -> LeaveSummary {
        LeaveSummary::from_requests(employee_id, self.store.all_for_employee(employee_id).await)
    }

    async fn assess(&self, input: &NewLeaveRequest, correlation_id: &str) -> Intake {
        let period = match LeavePeriod::parse(&input.start_date, &input.end_date) {
            Ok(period) => period,
            Err(error) => return Intake::rejected(error.to_string()),
        };
        let duration_days = period.duration_days();

        let Some((policy_key, policy)) = self.catalog.lookup(&input.leave_type) else {
            let mut intake = Intake::rejected(format!("invalid leave type: {}", input.leave_type));
            intake.duration_days = Some(duration_days);
            return intake;
        };
        let policy_key = policy_key.to_string();
        let policy = policy.clone();
        let current_balance =
            input.current_balance.unwrap_or_else(|| i64::from(policy.annual_quota));

        let mut intake = Intake {
            policy: Some((policy_key.clone(), policy.clone())),
            duration_days: Some(duration_days),
            current_balance: Some(current_balance),
            verdict: None,
            decision: IntakeDecision::Rejected(String::new()),
        };

        if period.is_reversed() {
            intake.decision = IntakeDecision::Rejected(format!(
                "end date {} is before start date {}",
                input.end_date.trim(),
                input.start_date.trim()
            ));
            return intake;
        }

        let query = EligibilityQuery {
            employee_name: input.employee_name.clone(),
            employee_id: input.employee_id.clone(),
            employee_role: input.employee_role.clone(),
            leave_type: input.leave_type.clone(),
            policy_key,
            duration_days,
            start_date: input.start_date.clone(),
            end_date: input.end_date.clone(),
            reason: input.reason.clone(),
            current_balance,
            candidate_approvers: policy.candidate_approvers(duration_days),
            policy,
        };

        match self.bounded(self.eligibility.evaluate(&query)).await {
            Ok(verdict) => {
                intake.decision = if verdict.eligible {
                    IntakeDecision::AwaitingApproval(normalize_approvers(
                        verdict.required_approvers.as_deref().unwrap_or_default(),
                    ))
                } else if verdict.reason.trim().is_empty() {
                    IntakeDecision::Rejected(DEFAULT_POLICY_VIOLATION.to_string())
                } else {
                    IntakeDecision::Rejected(verdict.reason.clone())
                };
                intake.verdict = Some(verdict);
            }
            Err(error) => {
                tracing::warn!(
                    event_name = "leave.eligibility_failed",
                    correlation_id = %correlation_id,
                    employee_id = %input.employee_id,
                    error = %error,
                    "eligibility oracle failed"
                );
                intake.decision = IntakeDecision::Failed(error.to_string());
            }
        }
        intake
    }

    async fn apply_approval(
        &self,
        submission: &ApprovalSubmission,
        correlation_id: &str,
    ) -> Result<ApprovalReceipt, ApprovalError> {
        let request_id = submission.request_id.clone();
        let Some(slot) = self.store.handle(&request_id).await else {
            return Err(ApprovalError::NotFound { request_id });
        };

        let writer = slot.writer().await;
        let mut record = writer.current().await;
        if !record.status.accepts_approvals() {
            return Err(ApprovalError::AlreadyTerminal { request_id, status: record.status });
        }

        let query = AuthorityQuery {
            request_id: request_id.clone(),
            employee_name: record.employee_name.clone(),
            employee_role: record.employee_role.clone(),
            leave_type: record.leave_type.clone(),
            duration_days: record.duration_days.unwrap_or_default(),
            approver_name: submission.approver_name.clone(),
            approver_role: submission.approver_role.clone(),
            remaining_approvers: record.required_approvers.clone(),
            approver_authority: self.catalog.authority(&submission.approver_role).cloned(),
            hierarchy: self.catalog.approval_hierarchy.clone(),
        };
        let verdict = self.bounded(self.authority.authorize(&query)).await?;
        if !verdict.has_authority {
            return Err(ApprovalError::AuthorityDenied { request_id, reason: verdict.reason });
        }

        // A rejection keeps the outstanding approvers as they were.
        let previous_status = record.status;
        let rejected = is_rejection(&submission.decision);
        let role_was_required =
            !rejected && record.clear_required_approver(&submission.approver_role);

        let next = if rejected {
            LeaveStatus::Rejected
        } else if record.required_approvers.is_empty() {
            LeaveStatus::Approved
        } else {
            LeaveStatus::PendingApproval
        };
        record.transition_to(next)?;

        let now = Utc::now();
        record.approvals.push(ApprovalRecord {
            approver_name: submission.approver_name.clone(),
            approver_role: submission.approver_role.clone(),
            decision: submission.decision.clone(),
            comments: submission.comments.clone(),
            timestamp: now,
        });
        match next {
            LeaveStatus::Rejected => {
                let reason = submission.comments.trim();
                let reason = if reason.is_empty() { DEFAULT_REJECTION_REASON } else { reason };
                record.rejection_reason = Some(reason.to_string());
            }
            LeaveStatus::Approved => record.approved_at = Some(now),
            _ => {}
        }

        if !rejected {
            if !role_was_required {
                tracing::warn!(
                    event_name = "leave.approver_not_required",
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    approver_role = %submission.approver_role,
                    "approver role was not among the remaining approvers"
                );
            }
            let still_waiting = next == LeaveStatus::PendingApproval;
            if still_waiting != verdict.next_approver_required {
                tracing::warn!(
                    event_name = "leave.oracle_disagreement",
                    correlation_id = %correlation_id,
                    request_id = %request_id,
                    oracle_next_approver_required = verdict.next_approver_required,
                    remaining_approvers = %record.required_approvers.join(","),
                    "authority oracle disagrees with tracked approvers"
                );
            }
        }

        let remaining_approvers = record.required_approvers.clone();
        writer.commit(record).await;

        Ok(ApprovalReceipt {
            request_id,
            message: format!("approval processed by {}", submission.approver_name),
            previous_status,
            new_status: next,
            remaining_approvers,
            validation: verdict,
        })
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, OracleError>
    where
        F: Future<Output = Result<T, OracleError>>,
    {
        let budget = self.settings.oracle_timeout;
        match tokio::time::timeout(budget, call).await {
            Ok(result) => result,
            Err(_) => Err(OracleError::Timeout { budget }),
        }
    }
}

/// Folds roles like catalog keys and de-duplicates them, falling back to a manager when none
/// remain.
fn normalize_approvers(raw: &[String]) -> Vec<String> {
    let mut approvers: Vec<String> = Vec::with_capacity(raw.len());
    for role in raw {
        let role = normalize_key(role);
        if !role.is_empty() && !approvers.contains(&role) {
            approvers.push(role);
        }
    }
    if approvers.is_empty() {
        approvers.push(DEFAULT_APPROVER_ROLE.to_string());
    }
    approvers
}

#[cfg(test)]
mod tests {
    use super::normalize_approvers;

    #[test]
    fn approvers_are_normalized_and_deduplicated() {
        let raw = vec![" Manager ".to_string(), "hr".to_string(), "MANAGER".to_string()];
        assert_eq!(normalize_approvers(&raw), vec!["manager", "hr"]);

        let unicode = vec!["Ärztin".to_string(), "ÄRZTIN".to_string()];
        assert_eq!(normalize_approvers(&unicode), vec!["ärztin"]);
    }

    #[test]
    fn missing_approvers_fall_back_to_manager() {
        assert_eq!(normalize_approvers(&[]), vec!["manager"]);
        assert_eq!(normalize_approvers(&["  ".to_string()]), vec!["manager"]);
    }
}
