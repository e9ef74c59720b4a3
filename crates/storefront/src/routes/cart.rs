//! Cart route handlers.
//!
//! The cart lives in the visitor's session. Each handler runs one action
//! through the cart store and either redirects back (plain form posts) or,
//! for HTMX requests, returns the updated fragment with a `cart-updated`
//! trigger.

use std::num::NonZeroU32;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bhuvidevo_core::{CartAction, CartItem, CartState, OrderSummary, Price, ProductId};

use super::{Layout, is_htmx};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, safe_redirect};
use crate::services;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone, Debug)]
pub struct CartItemView {
    pub id: String,
    pub name: String,
    pub image_url: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.to_string(),
            name: item.name.clone(),
            image_url: item.image_url.clone(),
            quantity: item.quantity,
            price: Price::store(item.price).display(),
            line_total: Price::store(item.line_total()).display(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone, Debug)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub subtotal: String,
    pub tax: String,
    pub grand_total: String,
}

impl CartView {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<&CartState> for CartView {
    fn from(cart: &CartState) -> Self {
        let summary = OrderSummary::for_cart(cart);
        Self {
            items: cart.items().iter().map(CartItemView::from).collect(),
            item_count: cart.item_count(),
            subtotal: summary.subtotal_price().display(),
            tax: summary.tax_price().display(),
            grand_total: summary.grand_total_price().display(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub id: String,
    pub quantity: Option<String>,
    /// Local path to return to after a plain form post.
    pub return_to: Option<String>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub id: String,
    pub quantity: String,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub id: String,
}

/// Quantity requested by an add-to-cart form; a missing field means one.
fn requested_quantity(raw: Option<&str>) -> Result<NonZeroU32> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(NonZeroU32::MIN);
    };
    raw.parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| AppError::BadRequest("Quantity must be at least 1".to_string()))
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Respond to a cart change: the items fragment for HTMX, otherwise back to
/// the cart page.
fn cart_changed(headers: &HeaderMap, cart: &CartState) -> Response {
    if is_htmx(headers) {
        (
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartItemsTemplate {
                cart: CartView::from(cart),
            },
        )
            .into_response()
    } else {
        Redirect::to("/cart").into_response()
    }
}

/// Display cart page.
#[instrument(skip(session, nonce))]
pub async fn show(session: Session, nonce: CspNonce) -> impl IntoResponse {
    let cart = services::cart::load(&session).await;

    CartShowTemplate {
        layout: Layout::load(&session, nonce).await,
        cart: CartView::from(&cart),
    }
}

/// Add item to cart.
///
/// The product is looked up in the catalog so the cart always carries the
/// catalog's name and price. Out-of-stock products are refused.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = requested_quantity(form.quantity.as_deref())?;
    let id = ProductId::new(form.id);

    let product = state
        .catalog()
        .product(&id)
        .await
        .ok_or_else(|| AppError::NotFound("Product not found".to_string()))?;
    if !product.in_stock() {
        return Err(AppError::BadRequest("Product is out of stock".to_string()));
    }

    let cart = services::cart::dispatch(
        &session,
        CartAction::add(product.to_cart_product(), quantity),
    )
    .await?;
    add_breadcrumb("cart", "Added item", Some(&[("product_id", id.as_str())]));

    if is_htmx(&headers) {
        return Ok((
            AppendHeaders([("HX-Trigger", "cart-updated")]),
            CartCountTemplate {
                count: cart.item_count(),
            },
        )
            .into_response());
    }

    let target = form
        .return_to
        .as_deref()
        .map_or_else(|| "/cart".to_string(), |path| safe_redirect(Some(path)));
    Ok(Redirect::to(&target).into_response())
}

/// Set the quantity of a cart line; zero or less removes it.
#[instrument(skip(session, headers))]
pub async fn update(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    let quantity = form
        .quantity
        .trim()
        .parse::<i64>()
        .map_err(|_| AppError::BadRequest("Quantity must be a whole number".to_string()))?;

    let cart = services::cart::dispatch(&session, CartAction::update(form.id, quantity)).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Remove a line from the cart.
#[instrument(skip(session, headers))]
pub async fn remove(
    session: Session,
    headers: HeaderMap,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let cart = services::cart::dispatch(&session, CartAction::remove(form.id)).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Empty the cart.
#[instrument(skip(session, headers))]
pub async fn clear(session: Session, headers: HeaderMap) -> Result<Response> {
    let cart = services::cart::dispatch(&session, CartAction::Clear).await?;
    Ok(cart_changed(&headers, &cart))
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: services::cart::load(&session).await.item_count(),
    }
}
