use std::env;
use std::fs;
use std::path::Path;

use leaveflow_core::config::{resolve_config_path, AppConfig, ConfigOverrides, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::{load_config, CommandResult};

const COMMAND: &str = "config";

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
    overridden: bool,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let config_file_path = resolve_config_path(options.config_path.as_deref());
    let overrides = options.overrides.clone();
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec![
        "effective config (source precedence: override > env > file > default):".to_string(),
    ];
    for field in fields(&config, &overrides) {
        let source = if field.overridden {
            "override (command line)".to_string()
        } else {
            field_source(
                field.key,
                field.env_keys,
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            )
        };
        lines.push(render_line(field.key, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

fn fields(config: &AppConfig, overrides: &ConfigOverrides) -> Vec<Field> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|key| redact_token(key.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let catalog_path = config
        .catalog
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<built-in>".to_string());

    vec![
        Field {
            key: "llm.provider",
            value: config.llm.provider.as_str().to_string(),
            env_keys: &["LEAVEFLOW_LLM_PROVIDER"],
            overridden: overrides.llm_provider.is_some(),
        },
        Field {
            key: "llm.model",
            value: config.llm.model.clone(),
            env_keys: &["LEAVEFLOW_LLM_MODEL"],
            overridden: overrides.llm_model.is_some(),
        },
        Field {
            key: "llm.base_url",
            value: config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            env_keys: &["LEAVEFLOW_LLM_BASE_URL"],
            overridden: overrides.llm_base_url.is_some(),
        },
        Field {
            key: "llm.api_key",
            value: api_key,
            env_keys: &["LEAVEFLOW_LLM_API_KEY"],
            overridden: false,
        },
        Field {
            key: "llm.timeout_secs",
            value: config.llm.timeout_secs.to_string(),
            env_keys: &["LEAVEFLOW_LLM_TIMEOUT_SECS"],
            overridden: false,
        },
        Field {
            key: "llm.max_retries",
            value: config.llm.max_retries.to_string(),
            env_keys: &["LEAVEFLOW_LLM_MAX_RETRIES"],
            overridden: false,
        },
        Field {
            key: "oracle.backend",
            value: config.oracle.backend.as_str().to_string(),
            env_keys: &["LEAVEFLOW_ORACLE_BACKEND"],
            overridden: overrides.oracle_backend.is_some(),
        },
        Field {
            key: "oracle.timeout_secs",
            value: config.oracle.timeout_secs.to_string(),
            env_keys: &["LEAVEFLOW_ORACLE_TIMEOUT_SECS"],
            overridden: false,
        },
        Field {
            key: "catalog.path",
            value: catalog_path,
            env_keys: &["LEAVEFLOW_CATALOG_PATH"],
            overridden: overrides.catalog_path.is_some(),
        },
        Field {
            key: "logging.level",
            value: config.logging.level.clone(),
            env_keys: &["LEAVEFLOW_LOGGING_LEVEL", "LEAVEFLOW_LOG_LEVEL"],
            overridden: overrides.log_level.is_some(),
        },
        Field {
            key: "logging.format",
            value: config.logging.format.as_str().to_string(),
            env_keys: &["LEAVEFLOW_LOGGING_FORMAT", "LEAVEFLOW_LOG_FORMAT"],
            overridden: false,
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_token(token: &str) -> String {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use super::{contains_path, redact_token};

    #[test]
    fn api_keys_keep_only_their_prefix() {
        assert_eq!(redact_token("sk-proj-abc123"), "sk-***");
        assert_eq!(redact_token("plainsecret"), "<redacted>");
        assert_eq!(redact_token("   "), "<empty>");
    }

    #[test]
    fn dotted_paths_walk_nested_tables() {
        let doc: toml::Value = "[llm]\nmodel = \"gpt-4o-mini\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "llm.model"));
        assert!(!contains_path(&doc, "llm.base_url"));
        assert!(!contains_path(&doc, "oracle.backend"));
    }
}
