//! status command - directory reachability of a realm

use super::{print_json, CommandContext};
use anyhow::{anyhow, Result};
use colored::Colorize;
use warden_auth::LdapRealm;

pub async fn execute(ctx: &CommandContext, realm_name: &str) -> Result<()> {
    let realm = ctx.manager.get(realm_name)?;
    let ldap = realm
        .as_any()
        .downcast_ref::<LdapRealm>()
        .ok_or_else(|| anyhow!("Realm {} is not an LDAP realm", realm_name))?;

    let status = ldap.status().await;

    if ctx.is_json() {
        return print_json(&status);
    }

    let state = if status.connected {
        "connected".green()
    } else {
        "unreachable".red()
    };
    println!("Realm:        {}", status.name);
    println!("Directory:    {} ({})", status.directory, state);
    if let Some(vendor) = &status.vendor {
        println!("Vendor:       {}", vendor);
    }
    for context in &status.naming_contexts {
        println!("Context:      {}", context);
    }
    if status.pooled {
        println!("Pool:         enabled, max {}", status.pool_size);
    } else {
        println!("Pool:         disabled");
    }
    println!("Cached users: {}", status.cached_users);
    println!("Checked at:   {}", status.checked_at);
    if let Some(error) = &status.error {
        println!("Error:        {}", error.red());
    }
    Ok(())
}
