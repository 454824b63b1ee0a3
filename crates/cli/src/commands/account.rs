//! Customer session commands.
//!
//! # Usage
//!
//! ```bash
//! bz login -e ada@example.com -p correct-horse
//! bz register -n Ada -e ada@example.com -p correct-horse -c correct-horse
//! bz whoami
//! bz logout
//! ```

use std::io::Write;

use bazaar_storefront::services::auth::{AuthSession, AuthState};

use super::{Context, Result};
use crate::store::FileStore;

/// Sign in, merging any local cart into the account.
pub async fn login(ctx: &Context, out: &mut impl Write, email: &str, password: &str) -> Result<()> {
    let mut auth = ctx.session();
    let pending = auth.cart().local_cart().await.len();

    let next = auth.login(email, password).await?;

    if let Some(user) = auth.user() {
        writeln!(out, "Signed in as {} <{}>", user.name, user.email)?;
    }
    report_merge(&auth, out, pending).await?;
    writeln!(out, "Continue at {}", next.path())?;
    Ok(())
}

/// Create an account and sign it in.
pub async fn register(
    ctx: &Context,
    out: &mut impl Write,
    name: &str,
    email: &str,
    password: &str,
    password_confirmation: &str,
) -> Result<()> {
    let mut auth = ctx.session();
    let pending = auth.cart().local_cart().await.len();

    let user = auth
        .register(name, email, password, password_confirmation)
        .await?;

    writeln!(out, "Welcome, {}! Account #{} created", user.name, user.id)?;
    report_merge(&auth, out, pending).await?;
    Ok(())
}

/// Sign out. Always succeeds locally.
pub async fn logout(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let next = ctx.session().logout().await;
    writeln!(out, "Signed out, continue at {}", next.path())?;
    Ok(())
}

/// Show who the stored tokens belong to.
pub async fn whoami(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let mut auth = ctx.session();

    match auth.initialize().await {
        AuthState::Authenticated(user) => {
            writeln!(out, "{} <{}> (user #{})", user.name, user.email, user.id)?;
            if let Some(since) = user.created_at {
                writeln!(out, "Member since {}", since.format("%B %Y"))?;
            }
        }
        _ => writeln!(out, "Not signed in")?,
    }

    if auth.admin_token().await.is_some() {
        writeln!(out, "Admin session active")?;
    }
    Ok(())
}

async fn report_merge(auth: &AuthSession<FileStore>, out: &mut impl Write, pending: usize) -> Result<()> {
    if pending == 0 {
        return Ok(());
    }

    if auth.cart().local_cart().await.is_empty() {
        writeln!(out, "Moved {pending} cart line(s) into your account")?;
    } else {
        writeln!(out, "Your cart could not be synced yet, run `bz cart sync` to retry")?;
    }
    Ok(())
}
