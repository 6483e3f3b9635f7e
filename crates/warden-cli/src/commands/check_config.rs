//! check-config command - load every configured realm

use crate::OutputFormat;
use super::print_json;
use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;
use std::sync::Arc;
use warden_auth::{AliasStore, RealmsManager};
use warden_core::WardenConfig;

#[derive(Serialize)]
struct RealmCheck {
    name: String,
    class: String,
    ok: bool,
    error: Option<String>,
}

/// Realms are checked one by one so every broken realm is reported, not
/// only the first.
pub async fn execute(config: &WardenConfig, output_format: OutputFormat) -> Result<()> {
    let manager = RealmsManager::new(Arc::new(AliasStore::new(config.aliases.clone())));

    let checks: Vec<RealmCheck> = config
        .realms
        .iter()
        .map(|section| {
            let result = manager.instantiate(&section.name, &section.class, &section.properties);
            RealmCheck {
                name: section.name.clone(),
                class: section.class.clone(),
                ok: result.is_ok(),
                error: result.err().map(|e| e.to_string()),
            }
        })
        .collect();

    match output_format {
        OutputFormat::Json => print_json(&checks)?,
        OutputFormat::Text => {
            if checks.is_empty() {
                println!("No realms configured");
            }
            for check in &checks {
                match &check.error {
                    None => println!("{} {} ({})", "ok".green(), check.name, check.class),
                    Some(error) => println!("{} {} ({}): {}", "FAILED".red(), check.name, check.class, error),
                }
            }
            if let Some(default) = &config.default_realm {
                println!("Default realm: {}", default);
            }
        }
    }

    let failed = checks.iter().filter(|c| !c.ok).count();
    if failed > 0 {
        bail!("{} of {} realms failed to load", failed, checks.len());
    }
    Ok(())
}
