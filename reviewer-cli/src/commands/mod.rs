//! CLI command implementations

pub mod pr;
pub mod stats;
pub mod team;
pub mod user;

use std::path::Path;

use reviewer_core::Config;
use reviewer_db::SqliteStore;
use serde::Serialize;

pub use pr::PrArgs;
pub use stats::StatsArgs;
pub use team::TeamArgs;
pub use user::UserArgs;

/// Engine wired against the SQLite store
pub type Engine = reviewer_core::Engine<SqliteStore>;

/// Print `value` as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Report a failed command on stderr
///
/// Engine errors are printed as a JSON object with a stable code; internal
/// failures never expose their details there and are logged instead.
pub fn report_error(err: &anyhow::Error) {
    if let Some(engine_err) = err.downcast_ref::<reviewer_core::Error>() {
        if engine_err.is_internal() {
            tracing::error!(error = %engine_err, "Command failed");
        }
        let body = serde_json::json!({
            "error": {
                "code": engine_err.kind().as_str(),
                "message": engine_err.public_message(),
            }
        });
        eprintln!("{}", body);
    } else {
        eprintln!("Error: {:#}", err);
    }
}

/// Print the effective configuration and where it came from
pub fn show_config(config: &Config, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path = explicit
        .map(Path::to_path_buf)
        .or_else(Config::default_config_path);
    let body = serde_json::json!({
        "config_file": path.as_ref().map(|p| p.display().to_string()),
        "config_file_exists": path.as_ref().is_some_and(|p| p.exists()),
        "effective": config,
    });
    print_json(&body)
}
