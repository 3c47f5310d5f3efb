use std::time::Duration;

use leaveflow_agent::OllamaClient;
use leaveflow_core::config::{AppConfig, LlmProvider, LoadOptions, OracleBackend};
use serde::Serialize;

use crate::commands::{block_on, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let report = build_report(options);
    let exit_code = if report.overall_status == CheckStatus::Fail { 1 } else { 0 };

    if json_output {
        let output = serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
        return CommandResult { exit_code, output };
    }

    CommandResult { exit_code, output: render_human(&report) }
}

fn build_report(options: LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (oracle backend: {})",
                    config.oracle.backend.as_str()
                ),
            });
            checks.push(check_catalog(&config));
            checks.push(check_model_endpoint(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["policy_catalog", "model_endpoint"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let any_failed = checks.iter().any(|check| check.status == CheckStatus::Fail);
    let overall_status = if any_failed { CheckStatus::Fail } else { CheckStatus::Pass };
    let summary = if any_failed {
        "doctor: one or more readiness checks failed".to_string()
    } else {
        "doctor: all readiness checks passed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_catalog(config: &AppConfig) -> DoctorCheck {
    match config.load_catalog() {
        Ok(catalog) => DoctorCheck {
            name: "policy_catalog",
            status: CheckStatus::Pass,
            details: format!(
                "{} leave policies, {} approver roles",
                catalog.leave_policies.len(),
                catalog.approval_hierarchy.len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "policy_catalog",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

fn check_model_endpoint(config: &AppConfig) -> DoctorCheck {
    if config.oracle.backend == OracleBackend::Rules {
        return DoctorCheck {
            name: "model_endpoint",
            status: CheckStatus::Skipped,
            details: "rule-based oracle selected; no model endpoint required".to_string(),
        };
    }

    match config.llm.provider {
        LlmProvider::OpenAi => DoctorCheck {
            name: "model_endpoint",
            status: CheckStatus::Pass,
            details: format!(
                "api key configured for model `{}`; remote endpoint is not probed",
                config.llm.model
            ),
        },
        LlmProvider::Ollama => check_ollama(config),
    }
}

fn check_ollama(config: &AppConfig) -> DoctorCheck {
    let fail = |details: String| DoctorCheck {
        name: "model_endpoint",
        status: CheckStatus::Fail,
        details,
    };

    let base_url = config.llm.base_url.as_deref().unwrap_or_default();
    let client = match OllamaClient::new(
        base_url,
        config.llm.model.clone(),
        Duration::from_secs(config.llm.timeout_secs),
    ) {
        Ok(client) => client,
        Err(error) => return fail(error.to_string()),
    };

    let status = match block_on("doctor", client.status()) {
        Ok(status) => status,
        Err(_) => return fail("failed to initialize async runtime".to_string()),
    };

    if !status.running {
        return fail(status.error.unwrap_or_else(|| format!("ollama at {base_url} is down")));
    }
    if !status.model_available {
        return fail(format!(
            "model `{}` is not pulled; available: [{}] (run `ollama pull {}`)",
            status.target_model,
            status.available_models.join(", "),
            status.target_model
        ));
    }

    DoctorCheck {
        name: "model_endpoint",
        status: CheckStatus::Pass,
        details: format!("ollama at {base_url} serves `{}`", status.target_model),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
