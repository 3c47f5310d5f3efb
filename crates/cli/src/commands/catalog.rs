use leaveflow_core::config::LoadOptions;
use leaveflow_core::PolicyCatalog;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "catalog";

pub fn run(options: LoadOptions, json_output: bool) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let catalog = match config.load_catalog() {
        Ok(catalog) => catalog,
        Err(error) => return CommandResult::failure(COMMAND, "catalog", error.to_string(), 4),
    };

    if json_output {
        return match serde_json::to_string_pretty(&catalog) {
            Ok(output) => CommandResult { exit_code: 0, output },
            Err(error) => CommandResult::failure(COMMAND, "serialization", error.to_string(), 6),
        };
    }

    let source = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "built-in".to_string());
    CommandResult { exit_code: 0, output: render(&catalog, &source) }
}

fn render(catalog: &PolicyCatalog, source: &str) -> String {
    let mut lines = vec![format!("leave policies (source: {source}):")];
    for (key, policy) in &catalog.leave_policies {
        lines.push(format!(
            "- {key}: {} | quota {} days | max {} consecutive | notice {} days | approval {}",
            policy.name,
            policy.annual_quota,
            policy.max_consecutive_days,
            policy.advance_notice_days,
            policy.approval_required.as_str()
        ));
    }

    lines.push("approval hierarchy:".to_string());
    for (role, authority) in &catalog.approval_hierarchy {
        lines.push(format!(
            "- {role}: level {} | up to {} days | approves {}",
            authority.level,
            authority.max_days_approval,
            authority.can_approve.join(", ")
        ));
    }

    lines.join("\n")
}
