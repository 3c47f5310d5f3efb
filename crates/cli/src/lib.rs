pub mod bootstrap;
pub mod commands;
pub mod report;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leaveflow_core::config::{AppConfig, ConfigOverrides, LoadOptions};

#[derive(Debug, Parser)]
#[command(
    name = "leaveflow",
    about = "Leaveflow operator CLI",
    long_about = "Evaluate leave requests against the policy catalog, walk approval chains, and check runtime readiness.",
    after_help = "Examples:\n  leaveflow demo --rules\n  leaveflow request --name \"John Doe\" --employee-id EMP001 --type casual_leave --start 2025-11-01 --end 2025-11-02 --approve \"Sarah Manager:manager:approved\"\n  leaveflow doctor --json"
)]
pub struct Cli {
    #[arg(
        long = "config",
        global = true,
        value_name = "PATH",
        help = "Read configuration from this file"
    )]
    config_path: Option<PathBuf>,
    #[arg(long = "log-level", global = true, help = "Override logging.level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run the five walkthrough scenarios and print reports and summaries")]
    Demo {
        #[arg(long, help = "Use the deterministic rule-based oracle instead of a model")]
        rules: bool,
    },
    #[command(about = "Evaluate one leave request and optionally apply approvals")]
    Request(commands::request::RequestArgs),
    #[command(about = "List leave policies and the approval hierarchy")]
    Catalog {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, the policy catalog, and model endpoint readiness")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

impl Cli {
    fn load_options(&self) -> LoadOptions {
        LoadOptions {
            config_path: self.config_path.clone(),
            require_file: self.config_path.is_some(),
            overrides: ConfigOverrides {
                log_level: self.log_level.clone(),
                ..ConfigOverrides::default()
            },
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = cli.load_options();

    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Demo { rules } => commands::demo::run(options, rules),
        Command::Request(args) => commands::request::run(options, args),
        Command::Catalog { json } => commands::catalog::run(options, json),
        Command::Config => commands::config::run(options),
        Command::Doctor { json } => commands::doctor::run(options, json),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}

/// Logs go to stderr so command output on stdout stays parseable.
fn init_logging(config: &AppConfig) {
    use leaveflow_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match config.logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn request_arguments_collect_repeated_approvals() {
        let cli = Cli::try_parse_from([
            "leaveflow",
            "request",
            "--name",
            "Mike Johnson",
            "--employee-id",
            "EMP003",
            "--role",
            "manager",
            "--type",
            "annual_leave",
            "--start",
            "2025-12-20",
            "--end",
            "2025-12-27",
            "--approve",
            "David Senior:manager:approved",
            "--approve",
            "Lisa HR:hr:approved:All documentation complete",
            "--rules",
        ])
        .expect("parse");

        let Command::Request(args) = cli.command else {
            panic!("expected request command");
        };
        assert_eq!(args.approvals.len(), 2);
        assert_eq!(args.approvals[1].comments, "All documentation complete");
        assert_eq!(args.balance, None);
        assert!(args.rules);
    }

    #[test]
    fn explicit_config_path_is_required_to_exist() {
        let cli = Cli::try_parse_from(["leaveflow", "--config", "ops/leaveflow.toml", "doctor"])
            .expect("parse");
        let options = cli.load_options();

        assert!(options.require_file);
        assert!(matches!(cli.command, Command::Doctor { json: false }));
    }

    #[test]
    fn malformed_approval_is_a_usage_error() {
        let error = Cli::try_parse_from([
            "leaveflow",
            "request",
            "--name",
            "John Doe",
            "--employee-id",
            "EMP001",
            "--type",
            "casual_leave",
            "--start",
            "2025-11-01",
            "--end",
            "2025-11-02",
            "--approve",
            "Sarah Manager",
        ])
        .expect_err("usage error");
        assert!(error.to_string().contains("missing an approver role"));
    }
}
