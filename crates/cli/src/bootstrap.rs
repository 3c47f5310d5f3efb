use std::sync::Arc;

use leaveflow_agent::{client_from_config, LlmError, LlmOracle, RetryPolicy};
use leaveflow_core::config::{AppConfig, OracleBackend};
use leaveflow_core::oracle::{AuthorityOracle, EligibilityOracle, RuleBasedOracle};
use leaveflow_core::{ApplicationError, CatalogError, InMemoryAuditSink, LeaveWorkflow};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("policy catalog could not be loaded: {0}")]
    Catalog(#[from] CatalogError),
    #[error("model client could not be built: {0}")]
    Llm(#[from] LlmError),
}

impl BootstrapError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Catalog(_) => "catalog",
            Self::Llm(_) => "llm_client",
        }
    }
}

impl From<BootstrapError> for ApplicationError {
    fn from(error: BootstrapError) -> Self {
        match error {
            BootstrapError::Catalog(error) => Self::Configuration(error.to_string()),
            BootstrapError::Llm(error) => Self::Integration(error.to_string()),
        }
    }
}

/// A wired workflow plus the audit sink it reports to.
pub struct Application {
    pub workflow: LeaveWorkflow,
    pub audit: Arc<InMemoryAuditSink>,
    pub backend: OracleBackend,
}

pub fn build_application(config: &AppConfig) -> Result<Application, BootstrapError> {
    let catalog = Arc::new(config.load_catalog()?);

    let (eligibility, authority): (Arc<dyn EligibilityOracle>, Arc<dyn AuthorityOracle>) =
        match config.oracle.backend {
            OracleBackend::Rules => {
                let oracle = Arc::new(RuleBasedOracle);
                (oracle.clone(), oracle)
            }
            OracleBackend::Llm => {
                let client = client_from_config(&config.llm)?;
                let retry = RetryPolicy::from_config(&config.llm);
                let oracle = Arc::new(LlmOracle::new(client, retry));
                (oracle.clone(), oracle)
            }
        };

    tracing::info!(
        event_name = "bootstrap.workflow_ready",
        oracle_backend = config.oracle.backend.as_str(),
        llm_provider = config.llm.provider.as_str(),
        llm_model = %config.llm.model,
        policies = catalog.leave_policies.len(),
        "leave workflow assembled"
    );

    let audit = Arc::new(InMemoryAuditSink::default());
    let workflow = LeaveWorkflow::new(catalog, Arc::default(), eligibility, authority)
        .with_audit_sink(audit.clone())
        .with_settings(config.workflow_settings());

    Ok(Application { workflow, audit, backend: config.oracle.backend })
}

#[cfg(test)]
mod tests {
    use leaveflow_core::config::{AppConfig, ConfigOverrides, LoadOptions, OracleBackend};

    use super::build_application;

    #[test]
    fn rules_backend_builds_without_model_settings() {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist.toml".into()),
            require_file: false,
            overrides: ConfigOverrides {
                oracle_backend: Some(OracleBackend::Rules),
                ..ConfigOverrides::default()
            },
        })
        .expect("config");

        let application = build_application(&config).expect("application");
        assert_eq!(application.backend, OracleBackend::Rules);
        assert!(application.workflow.catalog().lookup("casual_leave").is_some());
        assert!(application.audit.events().is_empty());
    }
}
