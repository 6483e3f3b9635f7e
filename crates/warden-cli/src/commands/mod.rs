//! CLI command implementations

pub mod check_config;
pub mod groups;
pub mod login;
pub mod status;

use crate::OutputFormat;
use serde::Serialize;
use warden_auth::RealmsManager;

/// Context passed to realm commands
pub struct CommandContext {
    pub manager: RealmsManager,
    pub output_format: OutputFormat,
    pub quiet: bool,
}

impl CommandContext {
    /// Check if output should be JSON
    pub fn is_json(&self) -> bool {
        matches!(self.output_format, OutputFormat::Json)
    }

    /// Print info message if not quiet
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{}", msg);
        }
    }
}

#[derive(Serialize)]
pub struct GroupsResult<'a> {
    pub realm: &'a str,
    pub user: &'a str,
    pub groups: &'a [String],
}

pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
