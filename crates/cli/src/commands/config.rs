use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ecosim_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in effective_values(&config) {
        let source =
            field_source(key, env_keys, config_file_doc.as_ref(), config_file_path.as_deref());
        lines.push(render_line(key, &value, source));
    }

    lines.join("\n")
}

fn effective_values(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    let api_key = if config.advisor.api_key.is_some() { "<redacted>" } else { "<unset>" };

    vec![
        ("database.url", config.database.url.clone(), &["ECOSIM_DATABASE_URL"]),
        (
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["ECOSIM_DATABASE_MAX_CONNECTIONS"],
        ),
        (
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["ECOSIM_DATABASE_TIMEOUT_SECS"],
        ),
        ("engine.program", config.engine.program.clone(), &["ECOSIM_ENGINE_PROGRAM"]),
        ("engine.args", config.engine.args.join(" "), &["ECOSIM_ENGINE_ARGS"]),
        (
            "engine.timeout_secs",
            config.engine.timeout_secs.to_string(),
            &["ECOSIM_ENGINE_TIMEOUT_SECS"],
        ),
        (
            "engine.max_concurrency",
            config.engine.max_concurrency.to_string(),
            &["ECOSIM_ENGINE_MAX_CONCURRENCY"],
        ),
        ("advisor.enabled", config.advisor.enabled.to_string(), &["ECOSIM_ADVISOR_ENABLED"]),
        (
            "advisor.provider",
            format!("{:?}", config.advisor.provider),
            &["ECOSIM_ADVISOR_PROVIDER"],
        ),
        ("advisor.model", config.advisor.model.clone(), &["ECOSIM_ADVISOR_MODEL"]),
        (
            "advisor.base_url",
            config.advisor.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            &["ECOSIM_ADVISOR_BASE_URL"],
        ),
        ("advisor.api_key", api_key.to_string(), &["ECOSIM_ADVISOR_API_KEY"]),
        (
            "advisor.timeout_secs",
            config.advisor.timeout_secs.to_string(),
            &["ECOSIM_ADVISOR_TIMEOUT_SECS"],
        ),
        (
            "advisor.failure_threshold",
            config.advisor.failure_threshold.to_string(),
            &["ECOSIM_ADVISOR_FAILURE_THRESHOLD"],
        ),
        (
            "advisor.cooldown_secs",
            config.advisor.cooldown_secs.to_string(),
            &["ECOSIM_ADVISOR_COOLDOWN_SECS"],
        ),
        (
            "records.synthesize_on_read",
            config.records.synthesize_on_read.to_string(),
            &["ECOSIM_RECORDS_SYNTHESIZE_ON_READ"],
        ),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            &["ECOSIM_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), &["ECOSIM_SERVER_PORT"]),
        (
            "server.graceful_shutdown_secs",
            config.server.graceful_shutdown_secs.to_string(),
            &["ECOSIM_SERVER_GRACEFUL_SHUTDOWN_SECS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["ECOSIM_LOGGING_LEVEL", "ECOSIM_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format),
            &["ECOSIM_LOGGING_FORMAT", "ECOSIM_LOG_FORMAT"],
        ),
    ]
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("ecosim.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/ecosim.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
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
    if let Some(env_key) = env_keys.iter().find(|env_key| env::var_os(env_key).is_some()) {
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

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn nested_keys_are_found_in_config_documents() {
        let doc: toml::Value = "[engine]\nprogram = \"python3\"\n".parse().expect("toml");

        assert!(contains_path(&doc, "engine.program"));
        assert!(!contains_path(&doc, "engine.args"));
        assert!(!contains_path(&doc, "advisor.model"));
    }
}
