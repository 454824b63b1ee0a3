//! Administrator session commands.
//!
//! # Usage
//!
//! ```bash
//! bz admin login -e admin@example.com -p admin-pass
//! bz admin dashboard
//! bz admin logout
//! ```

use std::io::Write;

use bazaar_storefront::services::admin::AdminConsole;

use super::{CliError, Context, Result};

pub async fn login(ctx: &Context, out: &mut impl Write, email: &str, password: &str) -> Result<()> {
    let next = ctx.session().admin_login(email, password).await?;
    writeln!(out, "Admin signed in, continue at {}", next.path())?;
    Ok(())
}

pub async fn logout(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let next = ctx.session().admin_logout().await;
    writeln!(out, "Admin signed out, continue at {}", next.path())?;
    Ok(())
}

/// Print record counts. A rejected admin token is dropped from the state file.
pub async fn dashboard(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let mut auth = ctx.session();
    if !auth.resume_admin().await {
        return Err(CliError::NotAdmin);
    }

    let counts = AdminConsole::new(&mut auth).dashboard().await?;
    writeln!(out, "Products: {}", counts.products)?;
    writeln!(out, "Deals:    {}", counts.deals)?;
    writeln!(out, "Users:    {}", counts.users)?;
    Ok(())
}
