use async_trait::async_trait;

use crate::catalog::same_role;

use super::{
    AuthorityOracle, AuthorityQuery, AuthorityVerdict, EligibilityOracle, EligibilityQuery,
    EligibilityVerdict, OracleError,
};

/// Deterministic stand-in for the model-backed oracles: straight policy arithmetic.
#[derive(Clone, Copy, Debug, Default)]
pub struct RuleBasedOracle;

impl RuleBasedOracle {
    pub fn eligibility(&self, query: &EligibilityQuery) -> EligibilityVerdict {
        let duration = query.duration_days;
        let balance = query.current_balance;
        let max_consecutive = i64::from(query.policy.max_consecutive_days);

        if balance <= 0 {
            return ineligible(
                format!(
                    "Insufficient leave balance. Current balance: {balance} days, Requested: {duration} days"
                ),
                vec!["Apply for unpaid leave or wait until the next quota refresh".to_string()],
            );
        }

        if duration > max_consecutive {
            return ineligible(
                format!(
                    "Request exceeds maximum consecutive days. Max allowed: {max_consecutive} days, Requested: {duration} days"
                ),
                vec![
                    format!(
                        "Split the request into multiple applications of at most {max_consecutive} days"
                    ),
                    "For medical emergencies, attach a medical certificate for exception approval"
                        .to_string(),
                ],
            );
        }

        if duration > balance {
            return ineligible(
                format!(
                    "Insufficient leave balance. Available: {balance} days, Requested: {duration} days"
                ),
                vec!["Reduce the number of days or check whether unpaid leave is an option"
                    .to_string()],
            );
        }

        EligibilityVerdict {
            eligible: true,
            reason: format!(
                "Request complies with {} policy. Duration: {duration} days, Balance after approval: {} days",
                query.policy.name,
                query.balance_after()
            ),
            required_approvers: Some(query.candidate_approvers.clone()),
            recommendations: vec![
                format!(
                    "Ensure {} days advance notice is provided",
                    query.policy.advance_notice_days
                ),
                "Hand over pending work before leave starts".to_string(),
            ],
        }
    }

    pub fn authority(&self, query: &AuthorityQuery) -> AuthorityVerdict {
        let role = query.approver_role.trim();

        let Some(authority) = &query.approver_authority else {
            return denied(format!("unknown approver role `{role}`"));
        };

        let is_required =
            query.remaining_approvers.iter().any(|required| same_role(required, role));
        if !is_required {
            return denied(format!(
                "approver role `{role}` is not among the remaining approvers {:?}",
                query.remaining_approvers
            ));
        }

        if query.duration_days > i64::from(authority.max_days_approval) {
            return denied(format!(
                "{} days exceeds the `{role}` approval limit of {} days",
                query.duration_days, authority.max_days_approval
            ));
        }

        let still_required = query
            .remaining_approvers
            .iter()
            .filter(|required| !same_role(required, role))
            .count();

        AuthorityVerdict {
            has_authority: true,
            reason: format!("{role} has authority to act on this request"),
            next_approver_required: still_required > 0,
        }
    }
}

fn ineligible(reason: String, recommendations: Vec<String>) -> EligibilityVerdict {
    EligibilityVerdict {
        eligible: false,
        reason,
        required_approvers: Some(Vec::new()),
        recommendations,
    }
}

fn denied(reason: String) -> AuthorityVerdict {
    AuthorityVerdict { has_authority: false, reason, next_approver_required: false }
}

#[async_trait]
impl EligibilityOracle for RuleBasedOracle {
    async fn evaluate(&self, query: &EligibilityQuery) -> Result<EligibilityVerdict, OracleError> {
        Ok(self.eligibility(query))
    }
}

#[async_trait]
impl AuthorityOracle for RuleBasedOracle {
    async fn authorize(&self, query: &AuthorityQuery) -> Result<AuthorityVerdict, OracleError> {
        Ok(self.authority(query))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::RuleBasedOracle;
    use crate::domain::leave::LeaveRequestId;
    use crate::domain::policy::{ApprovalChain, ApproverAuthority, PolicyRule};
    use crate::oracle::{AuthorityQuery, EligibilityQuery};

    fn eligibility_query(duration_days: i64, current_balance: i64) -> EligibilityQuery {
        let policy = PolicyRule {
            name: "Sick Leave".to_string(),
            annual_quota: 12,
            max_consecutive_days: 5,
            advance_notice_days: 0,
            approval_required: ApprovalChain::Manager,
        };
        EligibilityQuery {
            employee_name: "Jane Smith".to_string(),
            employee_id: "EMP002".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "sick_leave".to_string(),
            policy_key: "sick_leave".to_string(),
            duration_days,
            start_date: "2025-11-05".to_string(),
            end_date: "2025-11-12".to_string(),
            reason: "Recovering from surgery".to_string(),
            current_balance,
            candidate_approvers: policy.candidate_approvers(duration_days),
            policy,
        }
    }

    fn authority_query(role: &str, remaining: &[&str], duration_days: i64) -> AuthorityQuery {
        let manager = ApproverAuthority {
            level: 1,
            max_days_approval: 10,
            can_approve: vec!["employee".to_string()],
        };
        let mut hierarchy = BTreeMap::new();
        hierarchy.insert("manager".to_string(), manager.clone());

        AuthorityQuery {
            request_id: LeaveRequestId::from_sequence(3),
            employee_name: "Mike Johnson".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "annual_leave".to_string(),
            duration_days,
            approver_name: "David Senior".to_string(),
            approver_role: role.to_string(),
            remaining_approvers: remaining.iter().map(|r| r.to_string()).collect(),
            approver_authority: (role == "manager").then_some(manager),
            hierarchy,
        }
    }

    #[test]
    fn exceeding_max_consecutive_days_is_ineligible() {
        let verdict = RuleBasedOracle.eligibility(&eligibility_query(8, 12));
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("maximum consecutive days"));
        assert_eq!(verdict.recommendations.len(), 2);
    }

    #[test]
    fn empty_balance_is_ineligible_before_duration_checks() {
        let verdict = RuleBasedOracle.eligibility(&eligibility_query(1, 0));
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("Current balance: 0"));
    }

    #[test]
    fn duration_above_balance_is_ineligible() {
        let verdict = RuleBasedOracle.eligibility(&eligibility_query(4, 2));
        assert!(!verdict.eligible);
        assert!(verdict.reason.contains("Available: 2 days"));
    }

    #[test]
    fn compliant_request_carries_candidate_approvers() {
        let verdict = RuleBasedOracle.eligibility(&eligibility_query(2, 12));
        assert!(verdict.eligible);
        assert_eq!(verdict.required_approvers, Some(vec!["manager".to_string()]));
        assert!(verdict.reason.contains("Balance after approval: 10 days"));
    }

    #[test]
    fn required_approver_within_limit_has_authority() {
        let verdict = RuleBasedOracle.authority(&authority_query("manager", &["manager", "hr"], 8));
        assert!(verdict.has_authority);
        assert!(verdict.next_approver_required);

        let last = RuleBasedOracle.authority(&authority_query("manager", &["manager"], 8));
        assert!(last.has_authority);
        assert!(!last.next_approver_required);
    }

    #[test]
    fn unknown_or_unrequired_roles_are_denied() {
        let unknown = RuleBasedOracle.authority(&authority_query("intern", &["manager"], 2));
        assert!(!unknown.has_authority);
        assert!(unknown.reason.contains("unknown approver role"));

        let unrequired = RuleBasedOracle.authority(&authority_query("manager", &["hr"], 2));
        assert!(!unrequired.has_authority);
        assert!(unrequired.reason.contains("not among the remaining approvers"));
    }

    #[test]
    fn duration_above_approval_limit_is_denied() {
        let verdict = RuleBasedOracle.authority(&authority_query("manager", &["manager"], 12));
        assert!(!verdict.has_authority);
        assert!(verdict.reason.contains("approval limit of 10 days"));
    }
}
