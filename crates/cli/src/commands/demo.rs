use anyhow::Context;
use leaveflow_core::config::{LoadOptions, OracleBackend};
use leaveflow_core::NewLeaveRequest;

use crate::bootstrap::{build_application, Application};
use crate::commands::request::{walk_approvals, ApprovalStep};
use crate::commands::{block_on, bootstrap_failure, load_config, CommandResult};
use crate::report::{render_report, render_summary, section};

const COMMAND: &str = "demo";

struct Scenario {
    title: &'static str,
    request: NewLeaveRequest,
    approvals: Vec<ApprovalStep>,
}

pub fn run(mut options: LoadOptions, rules: bool) -> CommandResult {
    if rules {
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

    match block_on(COMMAND, run_scenarios(&application)) {
        Ok(Ok(output)) => CommandResult { exit_code: 0, output },
        Ok(Err(error)) => CommandResult::failure(COMMAND, "workflow", format!("{error:#}"), 5),
        Err(result) => result,
    }
}

async fn run_scenarios(application: &Application) -> anyhow::Result<String> {
    let workflow = &application.workflow;
    let mut out = Vec::new();
    out.push(section("LEAVE MANAGEMENT WORKFLOW DEMO"));
    out.push(format!("Oracle backend: {}", application.backend.as_str()));

    for scenario in scenarios() {
        out.push(section(scenario.title));
        let created = workflow.create_leave_request(scenario.request).await;
        out.push(render_report(&created));

        if !created.status.accepts_approvals() || scenario.approvals.is_empty() {
            continue;
        }
        out.extend(walk_approvals(workflow, &created.id, &scenario.approvals).await);

        let latest = workflow
            .find(&created.id)
            .await
            .with_context(|| format!("request {} is missing from the store", created.id))?;
        out.push(render_report(&latest));
    }

    out.push(section("EMPLOYEE LEAVE SUMMARY"));
    for employee_id in ["EMP001", "EMP002", "EMP003", "EMP004", "EMP005"] {
        out.push(render_summary(&workflow.summarize(employee_id).await));
    }

    out.push(format!("\nAudit events recorded: {}", application.audit.events().len()));
    Ok(out.join("\n"))
}

fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            title: "SCENARIO 1: Valid Casual Leave Request",
            request: leave(
                ("John Doe", "EMP001", "employee"),
                "casual_leave",
                ("2025-11-01", "2025-11-02"),
                "Family function to attend",
                12,
            ),
            approvals: vec![ApprovalStep::new(
                "Sarah Manager",
                "manager",
                "approved",
                "Approved. Enjoy your time off!",
            )],
        },
        Scenario {
            title: "SCENARIO 2: Sick Leave Exceeding Policy Limit",
            request: leave(
                ("Jane Smith", "EMP002", "employee"),
                "sick_leave",
                ("2025-11-05", "2025-11-12"),
                "Recovering from surgery",
                12,
            ),
            approvals: Vec::new(),
        },
        Scenario {
            title: "SCENARIO 3: Annual Leave - Multiple Approvals Required",
            request: leave(
                ("Mike Johnson", "EMP003", "manager"),
                "annual_leave",
                ("2025-12-20", "2025-12-27"),
                "Year-end vacation with family",
                21,
            ),
            approvals: vec![
                ApprovalStep::new(
                    "David Senior",
                    "manager",
                    "approved",
                    "Approved by senior management. Have a great vacation!",
                ),
                ApprovalStep::new(
                    "Lisa HR",
                    "hr",
                    "approved",
                    "HR approved. All documentation complete.",
                ),
            ],
        },
        Scenario {
            title: "SCENARIO 4: Leave Request Rejected",
            request: leave(
                ("Tom Brown", "EMP004", "employee"),
                "casual_leave",
                ("2025-11-03", "2025-11-03"),
                "Need day off",
                0,
            ),
            approvals: Vec::new(),
        },
        Scenario {
            title: "SCENARIO 5: Compensatory Leave Request",
            request: leave(
                ("Amy Wilson", "EMP005", "employee"),
                "compensatory_leave",
                ("2025-11-10", "2025-11-10"),
                "Worked during weekend for project delivery",
                2,
            ),
            approvals: vec![ApprovalStep::new(
                "Sarah Manager",
                "manager",
                "approved",
                "Approved. Thank you for your weekend work!",
            )],
        },
    ]
}

fn leave(
    (name, id, role): (&str, &str, &str),
    leave_type: &str,
    (start, end): (&str, &str),
    reason: &str,
    balance: i64,
) -> NewLeaveRequest {
    NewLeaveRequest {
        employee_name: name.to_string(),
        employee_id: id.to_string(),
        employee_role: role.to_string(),
        leave_type: leave_type.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
        reason: reason.to_string(),
        current_balance: Some(balance),
    }
}
