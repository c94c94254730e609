//! Human-readable error descriptions and structured JSON error formatting.

use runout_core::error::{BuildError, RunoutError};

/// Exit code for config files that fail to load, parse or validate.
pub const EXIT_CONFIG: i32 = 3;
/// Exit code for a trace that does not fit the configured machine.
pub const EXIT_TRACE: i32 = 4;

fn find<T: std::error::Error + 'static>(err: &eyre::Report) -> Option<&T> {
    err.chain().find_map(|e| e.downcast_ref::<T>())
}

fn is_config_error(err: &eyre::Report) -> bool {
    find::<BuildError>(err).is_some()
        || err.chain().any(|e| {
            let msg = e.to_string();
            msg.starts_with("invalid configuration")
                || msg.starts_with("parse config")
                || msg.starts_with("read config")
        })
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    // Typed matches first
    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::MissingConfig => {
                "What happened: The runout monitor was assembled without a monitor config.\nLikely causes: The builder was not given with_config(...).\nHow to fix: Pass a MonitorConfig before building.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun `runout self-check`."
            ),
        };
    }

    if let Some(re) = find::<RunoutError>(err) {
        return match re {
            RunoutError::ExtruderOutOfRange { index, count } => format!(
                "What happened: The trace refers to extruder {index}, but only {count} are configured.\nLikely causes: The trace was recorded on a machine with more extruders.\nHow to fix: Raise monitor.extruder_count (and [[sensors]]) or trim the trace."
            ),
            RunoutError::SensorUnavailable(msg) => format!(
                "What happened: A filament sensor could not be read ({msg}).\nLikely causes: Loose wiring, wrong pin, or missing GPIO permissions.\nHow to fix: Check the [[sensors]] pins and wiring, then rerun `runout self-check`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let root = err.root_cause().to_string();
    let lower = format!("{msg} {root}").to_ascii_lowercase();

    if lower.contains("trace csv must have headers") {
        return "Invalid headers in trace CSV. Expected 'tick,extruder,present,pulses,distance_mm'.".to_string();
    }

    if lower.contains("read config") {
        return format!(
            "What happened: The config file could not be read ({root}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Point --config at an existing TOML file (default: etc/runout.toml)."
        );
    }

    if is_config_error(err) {
        return format!(
            "What happened: Configuration is invalid ({root}).\nLikely causes: A typo in a section or value, or an out-of-range setting.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.contains("open filament inputs") || lower.contains("gpio") {
        return "What happened: Failed to initialize the filament sensor pins.\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [[sensors]] pins in the config; ensure the process has permission to access GPIO.".to_string();
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: config problems and trace/machine mismatches are
/// distinguishable from generic failures (1). Clap usage errors keep 2.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if is_config_error(err) {
        return EXIT_CONFIG;
    }
    if find::<RunoutError>(err).is_some() {
        return EXIT_TRACE;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if is_config_error(err) {
        return "InvalidConfig";
    }
    match find::<RunoutError>(err) {
        Some(RunoutError::ExtruderOutOfRange { .. }) => "ExtruderOutOfRange",
        Some(RunoutError::SensorUnavailable(_)) => "SensorUnavailable",
        Some(RunoutError::Collaborator(_)) => "Collaborator",
        Some(RunoutError::Config(_)) => "InvalidConfig",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let message = humanize(err);
    if let Some(RunoutError::ExtruderOutOfRange { index, count }) = find::<RunoutError>(err) {
        return json!({
            "reason": reason_name(err),
            "details": { "extruder": index, "extruder_count": count },
            "message": message,
        })
        .to_string();
    }
    json!({ "reason": reason_name(err), "message": message }).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use eyre::WrapErr;

    #[test]
    fn out_of_range_maps_to_trace_exit_code() {
        let err: eyre::Result<()> = Err(RunoutError::ExtruderOutOfRange { index: 3, count: 1 })
            .wrap_err("trace tick 9");
        let err = err.unwrap_err();
        assert_eq!(exit_code_for_error(&err), EXIT_TRACE);
        assert!(humanize(&err).contains("extruder 3"));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).unwrap();
        assert_eq!(v["reason"], "ExtruderOutOfRange");
        assert_eq!(v["details"]["extruder_count"], 1);
    }

    #[test]
    fn validation_failure_is_a_config_error() {
        let err = eyre::eyre!("debounce.threshold must be >= 1").wrap_err("invalid configuration");
        assert_eq!(exit_code_for_error(&err), EXIT_CONFIG);
        assert!(humanize(&err).contains("debounce.threshold"));
    }

    #[test]
    fn unknown_errors_fall_back() {
        let err = eyre::eyre!("boom");
        assert_eq!(exit_code_for_error(&err), 1);
        assert!(humanize(&err).starts_with("Something went wrong."));
    }
}
