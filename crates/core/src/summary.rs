use serde::{Deserialize, Serialize};

use crate::domain::leave::{LeaveRequest, LeaveStatus};

/// Per-employee tally. `pending` counts `pending_approval` only; `pending` and `error`
/// records appear in `total_requests` without a bucket of their own.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveSummary {
    pub employee_id: String,
    pub total_requests: usize,
    pub approved: usize,
    pub pending: usize,
    pub rejected: usize,
    pub requests: Vec<LeaveRequest>,
}

impl LeaveSummary {
    pub fn from_requests(employee_id: impl Into<String>, requests: Vec<LeaveRequest>) -> Self {
        let count = |status: LeaveStatus| requests.iter().filter(|r| r.status == status).count();

        Self {
            employee_id: employee_id.into(),
            total_requests: requests.len(),
            approved: count(LeaveStatus::Approved),
            pending: count(LeaveStatus::PendingApproval),
            rejected: count(LeaveStatus::Rejected),
            requests,
        }
    }
}
