use covgrid_audit::{AuditPolicy, AuditRules};
use covgrid_canon::{Lexicon, Vocabulary};
use covgrid_kernel::Warning;
use covgrid_kernel::io::{read_json_file, read_toml_file};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "covgrid.toml";
const LOG_ENV: &str = "COVGRID_LOG";

/// `covgrid.toml`. Every table and field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub audit: AuditPolicy,
    pub canon: Vocabulary,
}

/// Log to stderr so stdout stays clean for `--json`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

pub fn read_json_file_or_exit<T>(path: &str, label: &str) -> T
where
    T: serde::de::DeserializeOwned,
{
    read_json_file(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load {label}: {e}");
        std::process::exit(1);
    })
}

/// Load `--config`, or `covgrid.toml` in the working directory when it
/// exists, or the built-in defaults.
pub fn load_config_or_exit(config: Option<&str>) -> Config {
    let path = match config {
        Some(path) => path,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => DEFAULT_CONFIG_PATH,
        None => {
            debug!("no config file; using defaults");
            return Config::default();
        }
    };
    debug!(path, "loading config");
    read_toml_file(path).unwrap_or_else(|e| {
        eprintln!("error: failed to load config: {e}");
        std::process::exit(1);
    })
}

pub fn audit_rules_or_exit(policy: AuditPolicy) -> AuditRules {
    policy.compile().unwrap_or_else(|e| {
        eprintln!("error: invalid audit policy: {e}");
        std::process::exit(1);
    })
}

pub fn lexicon_or_exit(vocabulary: Vocabulary) -> Lexicon {
    vocabulary.compile().unwrap_or_else(|e| {
        eprintln!("error: invalid canon vocabulary: {e}");
        std::process::exit(1);
    })
}

pub fn print_json_or_exit<T: Serialize>(value: &T, label: &str) {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("error: failed to render {label} JSON: {e}");
        std::process::exit(2);
    });
    println!("{rendered}");
}

pub fn print_warnings(warnings: &[Warning]) {
    if warnings.is_empty() {
        return;
    }
    println!("  Warnings:");
    for warning in warnings {
        let gate = warning
            .gate
            .as_deref()
            .map(|g| format!(" [{g}]"))
            .unwrap_or_default();
        println!(
            "    - {} {}{}: {}",
            severity_label(warning),
            warning.warning_type,
            gate,
            warning.message
        );
    }
}

fn severity_label(warning: &Warning) -> &'static str {
    match warning.severity {
        covgrid_kernel::Severity::Info => "INFO",
        covgrid_kernel::Severity::Warning => "WARNING",
        covgrid_kernel::Severity::Error => "ERROR",
    }
}
