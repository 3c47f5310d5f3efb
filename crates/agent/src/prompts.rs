use leaveflow_core::oracle::{AuthorityQuery, EligibilityQuery};

use crate::llm::CompletionRequest;

const ELIGIBILITY_SYSTEM: &str = "You are an expert HR policy analyst AI. Your role is to:
1. Strictly evaluate leave requests against company policies
2. Check ALL policy constraints (quota, duration, balance, advance notice)
3. Provide clear, actionable recommendations
4. Be conservative - reject if ANY policy violation exists

You must respond in EXACT JSON format with these keys:
- \"eligible\": boolean (true/false)
- \"reason\": string (detailed explanation)
- \"required_approvers\": array of strings (roles that must approve)
- \"recommendations\": array of strings (helpful suggestions)

Rules for analysis:
- If duration > max_consecutive_days -> REJECT with clear reason
- If duration > current_balance -> REJECT (insufficient quota)
- If balance < 0 after approval -> REJECT
- Consider the leave type when determining approvers
- For long durations (>7 days), typically need manager AND hr approval";

const AUTHORITY_SYSTEM: &str = "You are an HR authorization validator. Your job is to:
1. Verify if an approver has the authority to approve/reject leave requests
2. Check role matches, approval limits, and hierarchy levels
3. Determine if additional approvers are needed in the chain

Respond in EXACT JSON format with these keys:
- \"has_authority\": boolean (true/false)
- \"reason\": string (explanation of decision)
- \"next_approver_required\": boolean (true if more approvals needed)

Validation rules:
- Approver's role MUST be in required_approvers list
- Duration MUST be within approver's max_days_approval limit
- If duration > approver's limit, deny even if role matches
- If multiple approvers required, set next_approver_required = true after first approval";

pub fn eligibility_prompt(query: &EligibilityQuery) -> CompletionRequest {
    let policy = &query.policy;
    let user = format!(
        "Analyze this leave request:

=== EMPLOYEE ===
Name: {name}
ID: {id}
Role: {role}

=== LEAVE REQUEST ===
Type: {key} ({policy_name})
Duration: {duration} days
Dates: {start} to {end}
Reason: {reason}

=== CURRENT STATUS ===
Available Balance: {balance} days
Balance After Approval: {after} days

=== POLICY CONSTRAINTS ===
Annual Quota: {quota} days
Max Consecutive Days: {max} days
Advance Notice Required: {notice} days
Approval Chain: {chain}
Suggested Approvers: {candidates}

=== ANALYSIS CHECKLIST ===
[ ] Duration ({duration} days) <= Max Consecutive ({max} days)?
[ ] Duration ({duration} days) <= Current Balance ({balance} days)?
[ ] Balance after ({after} days) >= 0?
[ ] Appropriate approver chain for {chain}?

Perform strict policy compliance check. Respond with JSON only.",
        name = query.employee_name,
        id = query.employee_id,
        role = query.employee_role,
        key = query.policy_key,
        policy_name = policy.name,
        duration = query.duration_days,
        start = query.start_date,
        end = query.end_date,
        reason = query.reason,
        balance = query.current_balance,
        after = query.balance_after(),
        quota = policy.annual_quota,
        max = policy.max_consecutive_days,
        notice = policy.advance_notice_days,
        chain = policy.approval_required.as_str(),
        candidates = query.candidate_approvers.join(", "),
    );

    CompletionRequest { system: ELIGIBILITY_SYSTEM.to_string(), user }
}

pub fn authority_prompt(query: &AuthorityQuery) -> CompletionRequest {
    let (max_days, level, can_approve) = match &query.approver_authority {
        Some(authority) => (
            authority.max_days_approval.to_string(),
            authority.level.to_string(),
            format!("{:?}", authority.can_approve),
        ),
        None => ("N/A".to_string(), "N/A".to_string(), "[]".to_string()),
    };
    let hierarchy =
        serde_json::to_string_pretty(&query.hierarchy).unwrap_or_else(|_| "{}".to_string());
    let remaining = format!("{:?}", query.remaining_approvers);

    let user = format!(
        "Validate approver authority:

=== APPROVER ===
Name: {approver_name}
Role: {approver_role}
Max Days Approval: {max_days} days
Level: {level}
Can Approve: {can_approve}

=== LEAVE REQUEST ===
Request ID: {request_id}
Employee: {employee_name} ({employee_role})
Leave Type: {leave_type}
Duration: {duration} days
Required Approvers (remaining): {remaining}

=== APPROVAL HIERARCHY ===
{hierarchy}

=== VALIDATION CHECKLIST ===
[ ] Is \"{approver_role}\" in required approvers {remaining}?
[ ] Duration ({duration} days) <= Max approval limit ({max_days} days)?
[ ] Employee role \"{employee_role}\" in approver's can_approve list {can_approve}?
[ ] After this approval, are more approvers needed from {remaining}?

Perform strict validation. Respond with JSON only.",
        approver_name = query.approver_name,
        approver_role = query.approver_role,
        request_id = query.request_id,
        employee_name = query.employee_name,
        employee_role = query.employee_role,
        leave_type = query.leave_type,
        duration = query.duration_days,
    );

    CompletionRequest { system: AUTHORITY_SYSTEM.to_string(), user }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use leaveflow_core::domain::leave::LeaveRequestId;
    use leaveflow_core::domain::policy::{ApprovalChain, ApproverAuthority, PolicyRule};
    use leaveflow_core::oracle::{AuthorityQuery, EligibilityQuery};

    use super::{authority_prompt, eligibility_prompt};

    #[test]
    fn eligibility_prompt_states_balance_arithmetic() {
        let prompt = eligibility_prompt(&EligibilityQuery {
            employee_name: "Jane Smith".to_string(),
            employee_id: "EMP002".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "sick_leave".to_string(),
            policy_key: "sick_leave".to_string(),
            duration_days: 8,
            start_date: "2025-11-05".to_string(),
            end_date: "2025-11-12".to_string(),
            reason: "Medical treatment".to_string(),
            current_balance: 12,
            policy: PolicyRule {
                name: "Sick Leave".to_string(),
                annual_quota: 12,
                max_consecutive_days: 5,
                advance_notice_days: 0,
                approval_required: ApprovalChain::Manager,
            },
            candidate_approvers: vec!["manager".to_string()],
        });

        assert!(prompt.system.contains("\"required_approvers\""));
        assert!(prompt.user.contains("Type: sick_leave (Sick Leave)"));
        assert!(prompt.user.contains("Balance After Approval: 4 days"));
        assert!(prompt.user.contains("Duration (8 days) <= Max Consecutive (5 days)?"));
    }

    #[test]
    fn eligibility_prompt_survives_extreme_balances() {
        let prompt = eligibility_prompt(&EligibilityQuery {
            employee_name: "Tom Brown".to_string(),
            employee_id: "EMP004".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "casual_leave".to_string(),
            policy_key: "casual_leave".to_string(),
            duration_days: 2,
            start_date: "2025-11-03".to_string(),
            end_date: "2025-11-04".to_string(),
            reason: "Need day off".to_string(),
            current_balance: i64::MIN,
            policy: PolicyRule {
                name: "Casual Leave".to_string(),
                annual_quota: 12,
                max_consecutive_days: 3,
                advance_notice_days: 1,
                approval_required: ApprovalChain::Manager,
            },
            candidate_approvers: vec!["manager".to_string()],
        });

        assert!(prompt.user.contains(&format!("Balance After Approval: {} days", i64::MIN)));
    }

    #[test]
    fn authority_prompt_includes_hierarchy_and_remaining_roles() {
        let manager = ApproverAuthority {
            level: 1,
            max_days_approval: 10,
            can_approve: vec!["employee".to_string()],
        };
        let mut hierarchy = BTreeMap::new();
        hierarchy.insert("manager".to_string(), manager.clone());

        let prompt = authority_prompt(&AuthorityQuery {
            request_id: LeaveRequestId::from_sequence(3),
            employee_name: "Mike Johnson".to_string(),
            employee_role: "manager".to_string(),
            leave_type: "annual_leave".to_string(),
            duration_days: 8,
            approver_name: "David Senior".to_string(),
            approver_role: "manager".to_string(),
            remaining_approvers: vec!["manager".to_string(), "hr".to_string()],
            approver_authority: Some(manager),
            hierarchy,
        });

        assert!(prompt.user.contains("Request ID: LR-0003"));
        assert!(prompt.user.contains("Max Days Approval: 10 days"));
        assert!(prompt.user.contains("Required Approvers (remaining): [\"manager\", \"hr\"]"));
        assert!(prompt.user.contains("\"max_days_approval\": 10"));
    }

    #[test]
    fn unknown_approver_is_rendered_as_not_applicable() {
        let prompt = authority_prompt(&AuthorityQuery {
            request_id: LeaveRequestId::from_sequence(1),
            employee_name: "John Doe".to_string(),
            employee_role: "employee".to_string(),
            leave_type: "casual_leave".to_string(),
            duration_days: 2,
            approver_name: "Pat".to_string(),
            approver_role: "intern".to_string(),
            remaining_approvers: vec!["manager".to_string()],
            approver_authority: None,
            hierarchy: BTreeMap::new(),
        });

        assert!(prompt.user.contains("Max Days Approval: N/A days"));
        assert!(prompt.user.contains("Can Approve: []"));
    }
}
