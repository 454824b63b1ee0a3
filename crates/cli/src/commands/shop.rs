//! Catalog and cart commands.
//!
//! # Usage
//!
//! ```bash
//! bz products --category lighting
//! bz deals
//! bz cart add 7
//! bz cart show
//! bz cart sync
//! bz cart remove 12
//! bz cart checkout
//! ```

use std::io::Write;

use bazaar_core::{CartItemId, LocalCart, ProductId};
use bazaar_storefront::api::types::Product;
use bazaar_storefront::services::auth::AuthState;
use bazaar_storefront::services::cart::ServerCart;
use bazaar_storefront::services::catalog;

use super::{CliError, Context, Result};

// =============================================================================
// Catalog
// =============================================================================

/// List products, optionally filtered by category and search text.
pub async fn products(
    ctx: &Context,
    out: &mut impl Write,
    category: Option<&str>,
    query: Option<&str>,
) -> Result<()> {
    let mut products = ctx.api.products().await?;
    if let Some(category) = category {
        products = catalog::in_category(products, category);
    }
    if let Some(query) = query {
        products = catalog::search(products, query);
    }

    if products.is_empty() {
        writeln!(out, "No products found")?;
        return Ok(());
    }
    for product in &products {
        write_product(out, product)?;
    }
    Ok(())
}

/// List deals with the products they promote.
pub async fn deals(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let token = ctx.session().admin_token().await;
    let (deals, products) = tokio::try_join!(ctx.api.deals(token.as_ref()), ctx.api.products())?;

    let listings = catalog::join_deals(deals, &products);
    if listings.is_empty() {
        writeln!(out, "No deals right now")?;
    }
    for listing in listings {
        match listing.product {
            Some(product) => writeln!(
                out,
                "{}  {} ({})",
                listing.deal.title,
                product.name,
                product.price.display()
            )?,
            None => writeln!(out, "{}  product #{}", listing.deal.title, listing.deal.product_id)?,
        }
    }
    Ok(())
}

fn write_product(out: &mut impl Write, product: &Product) -> std::io::Result<()> {
    writeln!(
        out,
        "{:>5}  {:<32} {:>10}  {}",
        product.id,
        product.name,
        product.price.display(),
        product.category.as_deref().unwrap_or(catalog::UNCATEGORIZED)
    )
}

// =============================================================================
// Cart
// =============================================================================

/// Show the server cart when signed in, the local cart otherwise.
pub async fn show_cart(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let mut auth = ctx.session();

    if matches!(auth.initialize().await, AuthState::Authenticated(_)) {
        let cart = auth.cart().server_cart().await?;
        write_server_cart(out, &cart)?;
    } else {
        let cart = auth.cart().local_cart().await;
        write_local_cart(out, &cart)?;
    }
    Ok(())
}

/// Add one unit of a product at its catalog price.
///
/// When signed in the local cart is merged right away, so the item lands in
/// the server cart.
pub async fn add_to_cart(ctx: &Context, out: &mut impl Write, product_id: ProductId) -> Result<()> {
    let product = catalog::find(ctx.api.products().await?, product_id)
        .ok_or(CliError::ProductNotFound(product_id))?;

    let mut auth = ctx.session();
    let item = auth.cart().add_local(product.id, product.price).await?;
    writeln!(out, "Added {} (quantity {})", product.name, item.quantity)?;

    if matches!(auth.initialize().await, AuthState::Authenticated(_))
        && let Some(token) = auth.user_token().await
    {
        auth.cart().merge_on_auth(&token).await?;
        writeln!(out, "Saved to your account cart")?;
    }
    Ok(())
}

/// Remove a server cart item.
pub async fn remove_from_cart(ctx: &Context, out: &mut impl Write, id: CartItemId) -> Result<()> {
    let auth = ctx.session();
    let mut cart = auth.cart().server_cart().await?;
    auth.cart().remove_server_item(&mut cart, id).await?;

    writeln!(out, "Removed item #{id}")?;
    write_server_cart(out, &cart)?;
    Ok(())
}

/// Retry pushing the local cart into the server cart.
pub async fn sync_cart(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let auth = ctx.session();
    let token = auth.user_token().await.ok_or(CliError::NotSignedIn)?;

    let lines = auth.cart().merge_on_auth(&token).await?;
    if lines == 0 {
        writeln!(out, "Nothing to sync")?;
    } else {
        writeln!(out, "Synced {lines} cart line(s)")?;
    }
    Ok(())
}

/// Order every server cart line.
pub async fn checkout(ctx: &Context, out: &mut impl Write) -> Result<()> {
    let mut auth = ctx.session();
    let user_id = match auth.initialize().await {
        AuthState::Authenticated(user) => user.id,
        _ => return Err(CliError::NotSignedIn),
    };

    let mut cart = auth.cart().server_cart().await?;
    if cart.is_empty() {
        writeln!(out, "Your cart is empty")?;
        return Ok(());
    }

    let total = cart.total();
    let orders = auth.cart().checkout(&mut cart, user_id).await?;
    writeln!(out, "Placed {orders} order(s) totalling {}", total.display())?;
    Ok(())
}

fn write_local_cart(out: &mut impl Write, cart: &LocalCart) -> std::io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty");
    }

    for item in cart.items() {
        writeln!(
            out,
            "product #{:<5} x{:<3} {:>10}",
            item.product_id,
            item.quantity,
            item.price.times(item.quantity).display()
        )?;
    }
    writeln!(out, "{} item(s), subtotal {}", cart.item_count(), cart.subtotal().display())?;
    writeln!(out, "Sign in to keep this cart on your account")
}

fn write_server_cart(out: &mut impl Write, cart: &ServerCart) -> std::io::Result<()> {
    if cart.is_empty() {
        return writeln!(out, "Your cart is empty");
    }

    for item in cart.items() {
        writeln!(
            out,
            "#{:<5} {:<32} x{:<3} {:>10}",
            item.id,
            item.product.name,
            item.quantity,
            item.line_total().display()
        )?;
    }
    writeln!(out, "{} item(s), total {}", cart.item_count(), cart.total().display())
}
