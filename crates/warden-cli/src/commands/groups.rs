//! groups command - groups of a user without credentials

use super::{print_json, CommandContext, GroupsResult};
use anyhow::Result;

pub async fn execute(ctx: &CommandContext, realm_name: &str, user: &str) -> Result<()> {
    let realm = ctx.manager.get(realm_name)?;
    let groups = realm.group_names(user).await?;

    if ctx.is_json() {
        return print_json(&GroupsResult {
            realm: realm_name,
            user,
            groups: &groups,
        });
    }

    if groups.is_empty() {
        ctx.info(&format!("No groups for {} in realm {}", user, realm_name));
    }
    for group in &groups {
        println!("{}", group);
    }
    Ok(())
}
