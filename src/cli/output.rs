use chrono::{DateTime, Utc};
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;

use crate::core::skill::Tier;
use crate::error::{HubError, Result, StructuredError};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable formatted output with colors (default)
    #[default]
    Human,
    /// JSON envelope on stdout
    Json,
}

#[derive(Serialize)]
pub struct JsonResponse<T> {
    pub status: JsonStatus,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonStatus {
    Ok,
    Error(StructuredError),
}

pub fn json_ok<T: Serialize>(data: T) -> JsonResponse<T> {
    JsonResponse {
        status: JsonStatus::Ok,
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data,
    }
}

pub fn json_error(err: &HubError) -> JsonResponse<serde_json::Value> {
    JsonResponse {
        status: JsonStatus::Error(err.to_structured()),
        timestamp: Utc::now(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        data: serde_json::Value::Null,
    }
}

/// Print `data` wrapped in the success envelope.
pub fn emit_json<T: Serialize>(data: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&json_ok(data))?);
    Ok(())
}

/// Report a failed command on the channel matching `format`.
pub fn report_error(err: &HubError, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json_error(err)).unwrap_or_default()
            );
        }
        OutputFormat::Human => {
            let structured = err.to_structured();
            eprintln!("{} {}", "error:".red().bold(), structured.message);
            if !structured.suggestion.is_empty() {
                eprintln!("{} {}", "hint:".yellow(), structured.suggestion);
            }
        }
    }
}

/// Tier name colored the same way everywhere.
#[must_use]
pub fn tier_label(tier: Tier) -> colored::ColoredString {
    let name = tier.as_str();
    match tier {
        Tier::Extra => name.magenta(),
        Tier::Bundled => name.blue(),
        Tier::Managed => name.green(),
        Tier::Workspace => name.yellow(),
        Tier::Unknown => name.normal(),
    }
}

/// `yes` in green or `no` in red.
#[must_use]
pub fn yes_no(value: bool) -> colored::ColoredString {
    if value { "yes".green() } else { "no".red() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_structured_error() {
        let err = HubError::NotFound("pdf".into());
        let value = serde_json::to_value(json_error(&err)).unwrap();
        let status = &value["status"]["error"];
        assert_eq!(status["code"], "SKILL_NOT_FOUND");
        assert!(status["message"].as_str().unwrap().contains("pdf"));
    }

    #[test]
    fn ok_envelope_wraps_data() {
        let value = serde_json::to_value(json_ok(vec![1, 2])).unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(value["data"], serde_json::json!([1, 2]));
    }
}
