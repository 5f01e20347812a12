pub mod agents;
pub mod ask;
pub mod config;
pub mod doctor;

use serde::Serialize;

/// Command completed.
pub const EXIT_OK: u8 = 0;
/// Configuration failed to load or validate.
pub const EXIT_CONFIG: u8 = 2;
/// Runtime setup failed after configuration was accepted.
pub const EXIT_RUNTIME: u8 = 3;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

/// Structured failure envelope; success output is command-specific.
#[derive(Debug, Serialize)]
struct CommandOutcome<'a> {
    command: &'a str,
    status: &'a str,
    error_class: &'a str,
    message: String,
    exit_code: u8,
}

impl CommandResult {
    pub fn ok(output: String) -> Self {
        Self { exit_code: EXIT_OK, output }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command,
            status: "error",
            error_class,
            message: message.into(),
            exit_code,
        };
        let output = serde_json::to_string(&payload).unwrap_or_else(|error| {
            format!(
                "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\",\"exit_code\":{exit_code}}}",
                error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
            )
        });
        Self { exit_code, output }
    }
}
