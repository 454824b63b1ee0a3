//! Bazaar CLI - terminal client for the Bazaar store.
//!
//! Drives the same session, cart and admin flows as the web storefront, with
//! the client state (tokens and the anonymous cart) kept in a JSON file.
//!
//! # Usage
//!
//! ```bash
//! # Browse
//! bz products --category lighting
//! bz deals
//!
//! # Shop anonymously, then sign in (the local cart is merged)
//! bz cart add 7
//! bz login -e ada@example.com -p correct-horse
//! bz cart checkout
//!
//! # Administer
//! bz admin login -e admin@example.com -p admin-pass
//! bz admin dashboard
//! ```
//!
//! # Environment Variables
//!
//! - `BAZAAR_API_URL` - Backend API root (default `http://127.0.0.1:8000/api`)
//! - `BAZAAR_STATE_FILE` - Client state file (default `.bazaar-session.json`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;
use std::path::PathBuf;

use bazaar_core::{CartItemId, ProductId};
use bazaar_storefront::api::ApiClient;
use clap::{Parser, Subcommand};
use url::Url;

mod commands;
mod store;

use commands::{Context, account, admin, shop};
use store::FileStore;

#[derive(Parser)]
#[command(name = "bz")]
#[command(author, version, about = "Bazaar terminal client")]
struct Cli {
    /// Backend API root
    #[arg(long, env = "BAZAAR_API_URL", default_value = "http://127.0.0.1:8000/api")]
    api_url: Url,

    /// File holding tokens and the anonymous cart
    #[arg(long, env = "BAZAAR_STATE_FILE", default_value = ".bazaar-session.json")]
    state_file: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in as a customer
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a customer account
    Register {
        #[arg(short, long)]
        name: String,

        #[arg(short, long)]
        email: String,

        #[arg(short, long)]
        password: String,

        /// Must match the password
        #[arg(short = 'c', long)]
        password_confirmation: String,
    },
    /// Sign the customer out
    Logout,
    /// Show the signed-in customer
    Whoami,
    /// List products
    Products {
        /// Only this category (case-insensitive)
        #[arg(short, long)]
        category: Option<String>,

        /// Search names and descriptions
        #[arg(short, long)]
        search: Option<String>,
    },
    /// List deals
    Deals,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Administrator commands
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add one unit of a product
    Add { product_id: ProductId },
    /// Remove a server cart item
    Remove { item_id: CartItemId },
    /// Push the local cart into the account cart
    Sync,
    /// Order everything in the account cart
    Checkout,
}

#[derive(Subcommand)]
enum AdminAction {
    /// Sign in as an administrator
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "BAZAAR_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign the administrator out
    Logout,
    /// Show record counts
    Dashboard,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Quiet by default; command output goes to stdout, logs to stderr
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> commands::Result<()> {
    let ctx = Context::new(ApiClient::new(&cli.api_url), FileStore::new(cli.state_file));
    let mut out = std::io::stdout().lock();

    match cli.command {
        Commands::Login { email, password } => {
            account::login(&ctx, &mut out, &email, &password).await?;
        }
        Commands::Register {
            name,
            email,
            password,
            password_confirmation,
        } => {
            account::register(&ctx, &mut out, &name, &email, &password, &password_confirmation)
                .await?;
        }
        Commands::Logout => account::logout(&ctx, &mut out).await?,
        Commands::Whoami => account::whoami(&ctx, &mut out).await?,
        Commands::Products { category, search } => {
            shop::products(&ctx, &mut out, category.as_deref(), search.as_deref()).await?;
        }
        Commands::Deals => shop::deals(&ctx, &mut out).await?,
        Commands::Cart { action } => match action {
            CartAction::Show => shop::show_cart(&ctx, &mut out).await?,
            CartAction::Add { product_id } => shop::add_to_cart(&ctx, &mut out, product_id).await?,
            CartAction::Remove { item_id } => {
                shop::remove_from_cart(&ctx, &mut out, item_id).await?;
            }
            CartAction::Sync => shop::sync_cart(&ctx, &mut out).await?,
            CartAction::Checkout => shop::checkout(&ctx, &mut out).await?,
        },
        Commands::Admin { action } => match action {
            AdminAction::Login { email, password } => {
                admin::login(&ctx, &mut out, &email, &password).await?;
            }
            AdminAction::Logout => admin::logout(&ctx, &mut out).await?,
            AdminAction::Dashboard => admin::dashboard(&ctx, &mut out).await?,
        },
    }

    out.flush()?;
    Ok(())
}
