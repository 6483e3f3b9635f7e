//! login command - authenticate a user against a realm

use super::{print_json, CommandContext, GroupsResult};
use anyhow::{bail, Result};
use colored::Colorize;

pub async fn execute(
    ctx: &CommandContext,
    realm_name: &str,
    user: &str,
    password: Option<&str>,
) -> Result<()> {
    let Some(password) = password else {
        bail!("A password is required: pass --password or set WARDEN_PASSWORD");
    };

    let realm = ctx.manager.get(realm_name)?;

    match realm.authenticate(user, password).await {
        Ok(groups) => {
            if ctx.is_json() {
                return print_json(&GroupsResult {
                    realm: realm_name,
                    user,
                    groups: &groups,
                });
            }

            ctx.info(&format!("{} {} in realm {}", "Authenticated".green(), user, realm_name));
            for group in &groups {
                println!("{}", group);
            }
            Ok(())
        }
        Err(e) => {
            let code = e.code();
            Err(anyhow::Error::new(e).context(format!("Login failed for {} [{}]", user, code)))
        }
    }
}
