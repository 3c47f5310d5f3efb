use serde::{Deserialize, Serialize};

/// Duration above which a `manager_and_hr` policy also routes to HR.
pub const HR_ESCALATION_THRESHOLD_DAYS: i64 = 7;

pub const MANAGER_ROLE: &str = "manager";
pub const HR_ROLE: &str = "hr";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalChain {
    Manager,
    ManagerAndHr,
}

impl ApprovalChain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manager => "manager",
            Self::ManagerAndHr => "manager_and_hr",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyRule {
    pub name: String,
    pub annual_quota: u32,
    pub max_consecutive_days: u32,
    /// Advisory only; surfaced to the oracle and in reports, never enforced by the workflow.
    pub advance_notice_days: u32,
    pub approval_required: ApprovalChain,
}

impl PolicyRule {
    /// Candidate approver roles for a request of `duration_days` under this policy.
    pub fn candidate_approvers(&self, duration_days: i64) -> Vec<String> {
        match self.approval_required {
            ApprovalChain::Manager => vec![MANAGER_ROLE.to_string()],
            ApprovalChain::ManagerAndHr if duration_days > HR_ESCALATION_THRESHOLD_DAYS => {
                vec![MANAGER_ROLE.to_string(), HR_ROLE.to_string()]
            }
            ApprovalChain::ManagerAndHr => vec![MANAGER_ROLE.to_string()],
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverAuthority {
    pub level: u8,
    pub max_days_approval: u32,
    #[serde(default)]
    pub can_approve: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::{ApprovalChain, PolicyRule};

    fn rule(chain: ApprovalChain) -> PolicyRule {
        PolicyRule {
            name: "Annual Leave".to_string(),
            annual_quota: 21,
            max_consecutive_days: 15,
            advance_notice_days: 7,
            approval_required: chain,
        }
    }

    #[test]
    fn manager_chain_always_routes_to_manager_only() {
        assert_eq!(rule(ApprovalChain::Manager).candidate_approvers(12), vec!["manager"]);
    }

    #[test]
    fn manager_and_hr_chain_adds_hr_above_threshold() {
        let policy = rule(ApprovalChain::ManagerAndHr);
        assert_eq!(policy.candidate_approvers(7), vec!["manager"]);
        assert_eq!(policy.candidate_approvers(8), vec!["manager", "hr"]);
    }

    #[test]
    fn approval_chain_uses_snake_case_wire_names() {
        let encoded = serde_json::to_string(&ApprovalChain::ManagerAndHr).expect("encode chain");
        assert_eq!(encoded, "\"manager_and_hr\"");
        assert_eq!(ApprovalChain::ManagerAndHr.as_str(), "manager_and_hr");
    }
}
