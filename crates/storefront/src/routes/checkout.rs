//! Checkout route handlers.
//!
//! Checkout requires a signed-in user. The stored session is re-validated
//! with the auth backend before the order review is shown and again before
//! an order is placed.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bhuvidevo_core::CartAction;

use super::Layout;
use super::cart::CartView;
use crate::error::{Result, add_breadcrumb};
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth, sign_in_url};
use crate::services::{
    self,
    auth::AuthSession,
    checkout::{CheckoutError, place_order},
};
use crate::state::AppState;

/// Error passed back to the checkout page after a failed order.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutQuery {
    pub error: Option<String>,
}

/// Checkout review page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/show.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub email: String,
    pub cart: CartView,
    pub error: Option<String>,
}

/// Order confirmation page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/confirmation.html")]
pub struct ConfirmationTemplate {
    pub layout: Layout,
    pub order_id: String,
    pub status: String,
    pub item_count: u64,
    pub total: String,
}

/// Display the order review page.
#[instrument(skip(state, session, nonce, query), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<CheckoutQuery>,
) -> Result<Response> {
    let auth = AuthSession::new(state.remote(), &session);
    let Some(current) = auth.refresh().await? else {
        tracing::info!(user_id = %user.id, "Session expired before checkout");
        return Ok(Redirect::to(&sign_in_url("/checkout")).into_response());
    };

    let cart = services::cart::load(&session).await;
    if cart.is_empty() {
        return Ok(Redirect::to("/cart").into_response());
    }

    Ok(CheckoutTemplate {
        layout: Layout::load(&session, nonce).await,
        email: current.email.to_string(),
        cart: CartView::from(&cart),
        error: query.error,
    }
    .into_response())
}

/// Place the order for everything in the cart.
///
/// On success the cart is emptied and the confirmation page is rendered.
/// Failures send the visitor back to the review page with a message.
#[instrument(skip(state, session, nonce), fields(user_id = %user.id))]
pub async fn place(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    nonce: CspNonce,
) -> Result<Response> {
    let auth = AuthSession::new(state.remote(), &session);
    let Some(current) = auth.refresh().await? else {
        tracing::info!(user_id = %user.id, "Session expired before placing order");
        return Ok(Redirect::to(&sign_in_url("/checkout")).into_response());
    };
    let Some(token) = auth.access_token().await else {
        return Ok(Redirect::to(&sign_in_url("/checkout")).into_response());
    };

    let cart = services::cart::load(&session).await;
    let placed = match place_order(state.remote(), &token, &current, &cart).await {
        Ok(placed) => placed,
        Err(CheckoutError::EmptyCart) => return Ok(Redirect::to("/cart").into_response()),
        Err(e) => {
            tracing::warn!(error = %e, "Order placement failed");
            let target = format!(
                "/checkout?error={}",
                urlencoding::encode(e.user_message())
            );
            return Ok(Redirect::to(&target).into_response());
        }
    };

    services::cart::dispatch(&session, CartAction::Clear).await?;
    add_breadcrumb(
        "checkout",
        "Placed order",
        Some(&[("order_id", placed.order.id.as_str())]),
    );

    Ok(ConfirmationTemplate {
        layout: Layout::load(&session, nonce).await,
        order_id: placed.order.id.to_string(),
        status: placed.order.status.label().to_string(),
        item_count: placed.item_count,
        total: placed.summary.grand_total_price().display(),
    }
    .into_response())
}
