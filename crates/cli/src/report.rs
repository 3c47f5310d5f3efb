use std::fmt::Write as _;

use leaveflow_core::{LeaveRequest, LeaveStatus, LeaveSummary};

const RULE_WIDTH: usize = 80;

/// Plain-text rendering of one request for operator output.
pub fn render_report(request: &LeaveRequest) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut out = String::new();

    let _ = writeln!(out, "{rule}\nLEAVE REQUEST REPORT\n{rule}\n");
    let _ = writeln!(out, "Request ID: {}", request.id);
    let _ = writeln!(out, "Status: {}", request.status.as_str().to_uppercase());
    let _ = writeln!(out, "Created: {}", request.created_at.to_rfc3339());

    let _ = writeln!(out, "\nEMPLOYEE DETAILS:");
    let _ = writeln!(out, "  Name: {}", request.employee_name);
    let _ = writeln!(out, "  Employee ID: {}", request.employee_id);
    let _ = writeln!(out, "  Role: {}", request.employee_role);

    let _ = writeln!(out, "\nLEAVE DETAILS:");
    let _ = writeln!(out, "  Type: {}", request.leave_type);
    let _ = writeln!(out, "  Start Date: {}", request.start_date);
    let _ = writeln!(out, "  End Date: {}", request.end_date);
    let _ = writeln!(out, "  Duration: {} days", optional(request.duration_days));
    let _ = writeln!(out, "  Balance: {} days", optional(request.current_balance));
    let _ = writeln!(out, "  Reason: {}", request.reason);

    if let Some(policy) = &request.policy {
        let _ = writeln!(out, "\nPOLICY:");
        let _ = writeln!(out, "  Name: {}", policy.name);
        let _ = writeln!(out, "  Annual Quota: {} days", policy.annual_quota);
        let _ = writeln!(out, "  Max Consecutive Days: {}", policy.max_consecutive_days);
        let _ = writeln!(out, "  Approval Chain: {}", policy.approval_required.as_str());
    }

    let _ = writeln!(out, "\nAI ANALYSIS:");
    match &request.eligibility {
        Some(verdict) => {
            let _ = writeln!(out, "  Eligible: {}", verdict.eligible);
            let _ = writeln!(out, "  Reason: {}", verdict.reason);
            let approvers = verdict.required_approvers.as_deref().unwrap_or_default();
            let _ = writeln!(out, "  Required Approvers: {}", approvers.join(", "));
            if verdict.recommendations.is_empty() {
                let _ = writeln!(out, "  Recommendations: None");
            } else {
                let _ = writeln!(out, "  Recommendations:");
                for recommendation in &verdict.recommendations {
                    let _ = writeln!(out, "    - {recommendation}");
                }
            }
        }
        None => {
            let _ = writeln!(out, "  No analysis recorded");
        }
    }
    if !request.required_approvers.is_empty() {
        let _ = writeln!(out, "  Awaiting: {}", request.required_approvers.join(", "));
    }

    let _ = writeln!(out, "\nAPPROVALS:");
    if request.approvals.is_empty() {
        let _ = writeln!(out, "  No approvals yet");
    }
    for approval in &request.approvals {
        let _ = writeln!(out, "  - {} ({})", approval.approver_name, approval.approver_role);
        let _ = writeln!(out, "    Decision: {}", approval.decision);
        let _ = writeln!(out, "    Comments: {}", approval.comments);
        let _ = writeln!(out, "    Time: {}", approval.timestamp.to_rfc3339());
    }

    match request.status {
        LeaveStatus::Rejected => {
            let reason = request.rejection_reason.as_deref().unwrap_or("N/A");
            let _ = writeln!(out, "\nREJECTION REASON: {reason}");
        }
        LeaveStatus::Approved => {
            let approved_at = request
                .approved_at
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "N/A".to_string());
            let _ = writeln!(out, "\nAPPROVED AT: {approved_at}");
        }
        LeaveStatus::Error => {
            let message = request.error_message.as_deref().unwrap_or("N/A");
            let _ = writeln!(out, "\nERROR: {message}");
        }
        LeaveStatus::Pending | LeaveStatus::PendingApproval => {}
    }

    let _ = write!(out, "\n{rule}");
    out
}

pub fn render_summary(summary: &LeaveSummary) -> String {
    format!(
        "Employee ID: {}\n  Total Requests: {}\n  Approved: {}\n  Pending: {}\n  Rejected: {}",
        summary.employee_id,
        summary.total_requests,
        summary.approved,
        summary.pending,
        summary.rejected
    )
}

pub fn section(title: &str) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    format!("\n{rule}\n{title:^width$}\n{rule}\n", width = RULE_WIDTH)
}

fn optional(value: Option<i64>) -> String {
    value.map(|value| value.to_string()).unwrap_or_else(|| "N/A".to_string())
}
