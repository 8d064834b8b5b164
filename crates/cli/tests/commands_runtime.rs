use std::env;
use std::sync::{Mutex, OnceLock};

use ecosim_cli::commands::{config, migrate, seed, simulate};
use serde_json::Value;

#[test]
fn migrate_returns_success_with_valid_env() {
    with_env(&[("ECOSIM_DATABASE_URL", "sqlite::memory:")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 0, "expected successful migrate run");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "migrate");
        assert_eq!(payload["status"], "ok");
    });
}

#[test]
fn migrate_returns_config_failure_for_non_sqlite_url() {
    with_env(&[("ECOSIM_DATABASE_URL", "postgres://localhost/ecosim")], || {
        let result = migrate::run();
        assert_eq!(result.exit_code, 2, "expected config validation failure code");

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

#[test]
fn seed_is_idempotent_across_runs() {
    let dir = tempfile::tempdir().expect("tempdir");
    let url = format!("sqlite://{}?mode=rwc", dir.path().join("seed.db").display());

    with_env(&[("ECOSIM_DATABASE_URL", &url), ("ECOSIM_DATABASE_MAX_CONNECTIONS", "1")], || {
        let first = seed::run();
        assert_eq!(first.exit_code, 0, "expected first seed invocation success");
        let first_payload = parse_payload(&first.output);
        let first_message = first_payload["message"].as_str().unwrap_or_default().to_string();
        assert!(first_message.starts_with("created default record REC-"), "{first_message}");
        assert!(first_message.contains("total 4500, score 65, period monthly"));

        let second = seed::run();
        assert_eq!(second.exit_code, 0, "expected second seed invocation success");
        let second_payload = parse_payload(&second.output);
        let second_message = second_payload["message"].as_str().unwrap_or_default();
        assert!(second_message.starts_with("record already present"), "{second_message}");

        let record_id = first_message
            .trim_start_matches("created default record ")
            .split_whitespace()
            .next()
            .unwrap_or_default();
        assert!(second_message.contains(record_id));
    });
}

#[test]
fn config_output_redacts_the_advisor_key() {
    with_env(
        &[("ECOSIM_ADVISOR_API_KEY", "sk-very-secret"), ("ECOSIM_ENGINE_TIMEOUT_SECS", "45")],
        || {
            let output = config::run();

            assert!(!output.contains("sk-very-secret"));
            assert!(output
                .contains("- advisor.api_key = <redacted> (source: env (ECOSIM_ADVISOR_API_KEY))"));
            assert!(output.contains(
                "- engine.timeout_secs = 45 (source: env (ECOSIM_ENGINE_TIMEOUT_SECS))"
            ));
            assert!(output.contains("- records.synthesize_on_read = true (source: default)"));
        },
    );
}

#[test]
fn simulate_rejects_unknown_domains() {
    with_env(&[], || {
        let result = simulate::run("water", "{}");
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "simulate");
        assert_eq!(payload["error_class"], "invalid_input");
    });
}

#[cfg(unix)]
#[test]
fn simulate_prints_the_normalized_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("engine.sh");
    std::fs::write(&script, "cat > /dev/null\necho '{\"co2\": 1.5, \"time\": 20, \"cost\": 2.5}'\n")
        .expect("write engine script");
    let script = script.display().to_string();

    with_env(&[("ECOSIM_ENGINE_PROGRAM", "sh"), ("ECOSIM_ENGINE_ARGS", &script)], || {
        let result = simulate::run("mobility", r#"{"mode":"metro","distance_km":10}"#);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["alternative_id"], "mobility");
        assert_eq!(payload["total"], 1.5);
        assert_eq!(payload["unit"], "kg CO2");
        assert_eq!(payload["details"]["time_minutes"], 20.0);
    });
}

#[cfg(unix)]
#[test]
fn simulate_reports_engine_failures_without_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = dir.path().join("engine.sh");
    std::fs::write(&script, "cat > /dev/null\necho 'Traceback: boom' >&2\nexit 3\n")
        .expect("write engine script");
    let script = script.display().to_string();

    with_env(&[("ECOSIM_ENGINE_PROGRAM", "sh"), ("ECOSIM_ENGINE_ARGS", &script)], || {
        let result = simulate::run("carbon", "{}");
        assert_eq!(result.exit_code, 7);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["status"], "error");
        assert_eq!(payload["error_class"], "computation_failed");
        assert!(!result.output.contains("Traceback"));
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard = ENV_LOCK
        .get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());

    let keys = [
        "ECOSIM_DATABASE_URL",
        "ECOSIM_DATABASE_MAX_CONNECTIONS",
        "ECOSIM_DATABASE_TIMEOUT_SECS",
        "ECOSIM_ENGINE_PROGRAM",
        "ECOSIM_ENGINE_ARGS",
        "ECOSIM_ENGINE_TIMEOUT_SECS",
        "ECOSIM_ENGINE_MAX_CONCURRENCY",
        "ECOSIM_ADVISOR_ENABLED",
        "ECOSIM_ADVISOR_PROVIDER",
        "ECOSIM_ADVISOR_API_KEY",
        "ECOSIM_ADVISOR_BASE_URL",
        "ECOSIM_ADVISOR_MODEL",
        "ECOSIM_ADVISOR_TIMEOUT_SECS",
        "ECOSIM_ADVISOR_FAILURE_THRESHOLD",
        "ECOSIM_ADVISOR_COOLDOWN_SECS",
        "ECOSIM_RECORDS_SYNTHESIZE_ON_READ",
        "ECOSIM_SERVER_BIND_ADDRESS",
        "ECOSIM_SERVER_PORT",
        "ECOSIM_SERVER_GRACEFUL_SHUTDOWN_SECS",
        "ECOSIM_LOGGING_LEVEL",
        "ECOSIM_LOGGING_FORMAT",
        "ECOSIM_LOG_LEVEL",
        "ECOSIM_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
