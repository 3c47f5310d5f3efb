use anyhow::Context;
use clap::Args;
use leaveflow_core::config::{LoadOptions, OracleBackend};
use leaveflow_core::{
    ApprovalSubmission, LeaveRequest, LeaveRequestId, LeaveWorkflow, NewLeaveRequest,
};

use crate::bootstrap::build_application;
use crate::commands::{block_on, bootstrap_failure, load_config, CommandResult};
use crate::report::render_report;

const COMMAND: &str = "request";

#[derive(Debug, Clone, Args)]
pub struct RequestArgs {
    #[arg(long, help = "Employee display name")]
    pub name: String,
    #[arg(long = "employee-id", help = "Employee identifier, e.g. EMP001")]
    pub employee_id: String,
    #[arg(long, default_value = "employee", help = "Employee role")]
    pub role: String,
    #[arg(long = "type", help = "Leave type, e.g. casual_leave")]
    pub leave_type: String,
    #[arg(long, help = "First day of leave (YYYY-MM-DD)")]
    pub start: String,
    #[arg(long, help = "Last day of leave (YYYY-MM-DD), inclusive")]
    pub end: String,
    #[arg(long, default_value = "", help = "Reason given by the employee")]
    pub reason: String,
    #[arg(long, help = "Remaining balance in days; defaults to the policy's annual quota")]
    pub balance: Option<i64>,
    #[arg(
        long = "approve",
        value_name = "NAME:ROLE:DECISION[:COMMENTS]",
        value_parser = parse_step,
        help = "Apply an approval after intake; repeat for multi-stage chains"
    )]
    pub approvals: Vec<ApprovalStep>,
    #[arg(long, help = "Use the deterministic rule-based oracle instead of a model")]
    pub rules: bool,
    #[arg(long, help = "Emit the final request as JSON instead of a report")]
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalStep {
    pub approver_name: String,
    pub approver_role: String,
    pub decision: String,
    pub comments: String,
}

impl ApprovalStep {
    pub fn new(name: &str, role: &str, decision: &str, comments: &str) -> Self {
        Self {
            approver_name: name.to_string(),
            approver_role: role.to_string(),
            decision: decision.to_string(),
            comments: comments.to_string(),
        }
    }

    fn submission(&self, request_id: &LeaveRequestId) -> ApprovalSubmission {
        ApprovalSubmission {
            request_id: request_id.clone(),
            approver_name: self.approver_name.clone(),
            approver_role: self.approver_role.clone(),
            decision: self.decision.clone(),
            comments: self.comments.clone(),
        }
    }
}

pub fn parse_step(raw: &str) -> Result<ApprovalStep, String> {
    let mut parts = raw.splitn(4, ':');
    let mut next = |field: &str| {
        parts
            .next()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| format!("approval `{raw}` is missing {field}"))
    };
    let name = next("an approver name")?;
    let role = next("an approver role")?;
    let decision = next("a decision")?;
    let comments = parts.next().map(str::trim).unwrap_or_default();

    Ok(ApprovalStep::new(name, role, decision, comments))
}

pub fn run(mut options: LoadOptions, args: RequestArgs) -> CommandResult {
    if args.rules {
        options.overrides.oracle_backend = Some(OracleBackend::Rules);
    }
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let application = match build_application(&config) {
        Ok(application) => application,
        Err(error) => return bootstrap_failure(COMMAND, error),
    };

    let json = args.json;
    let outcome = block_on(COMMAND, async {
        let workflow = &application.workflow;
        let created = workflow.create_leave_request(new_request(&args)).await;
        let log = walk_approvals(workflow, &created.id, &args.approvals).await;
        let latest = workflow
            .find(&created.id)
            .await
            .with_context(|| format!("request {} is missing from the store", created.id))?;
        anyhow::Ok((latest, log))
    });

    match outcome {
        Ok(Ok((latest, log))) => render(&latest, &log, json),
        Ok(Err(error)) => CommandResult::failure(COMMAND, "workflow", format!("{error:#}"), 5),
        Err(result) => result,
    }
}

/// Applies each step in order, stopping once the request leaves the approval stage.
///
/// A refused step is reported and the walk continues; the store is unchanged by it.
pub(crate) async fn walk_approvals(
    workflow: &LeaveWorkflow,
    request_id: &LeaveRequestId,
    steps: &[ApprovalStep],
) -> Vec<String> {
    let mut lines = Vec::new();
    for step in steps {
        let who = format!("{} ({})", step.approver_name, step.approver_role);
        match workflow.process_approval(step.submission(request_id)).await {
            Ok(receipt) => {
                lines.push(format!("-> {who}: {}", receipt.message));
                lines.push(format!("   New Status: {}", receipt.new_status));
                if !receipt.new_status.accepts_approvals() {
                    break;
                }
            }
            Err(error) => {
                lines.push(format!("-> {who} not applied [{}]: {error}", error.kind()));
            }
        }
    }
    lines
}

fn new_request(args: &RequestArgs) -> NewLeaveRequest {
    NewLeaveRequest {
        employee_name: args.name.clone(),
        employee_id: args.employee_id.clone(),
        employee_role: args.role.clone(),
        leave_type: args.leave_type.clone(),
        start_date: args.start.clone(),
        end_date: args.end.clone(),
        reason: args.reason.clone(),
        current_balance: args.balance,
    }
}

fn render(request: &LeaveRequest, log: &[String], json: bool) -> CommandResult {
    if !json {
        let mut output = log.join("\n");
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str(&render_report(request));
        return CommandResult { exit_code: 0, output };
    }

    match serde_json::to_string_pretty(request) {
        Ok(output) => CommandResult { exit_code: 0, output },
        Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 6),
    }
}

#[cfg(test)]
mod tests {
    use super::parse_step;

    #[test]
    fn approval_step_accepts_optional_comments() {
        let step = parse_step("Sarah Manager:manager:approved:Enjoy: the break").expect("step");
        assert_eq!(step.approver_name, "Sarah Manager");
        assert_eq!(step.approver_role, "manager");
        assert_eq!(step.decision, "approved");
        assert_eq!(step.comments, "Enjoy: the break");

        let bare = parse_step("Lisa HR:hr:rejected").expect("step");
        assert_eq!(bare.comments, "");
    }

    #[test]
    fn approval_step_requires_name_role_and_decision() {
        let error = parse_step("Sarah Manager:manager").expect_err("missing decision");
        assert!(error.contains("missing a decision"));
        assert!(parse_step(":manager:approved").is_err());
    }
}
