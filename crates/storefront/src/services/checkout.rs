//! Turning a cart into an order.

use thiserror::Error;
use tracing::instrument;

use bhuvidevo_core::{CartState, OrderStatus, OrderSummary};

use crate::models::CurrentUser;
use crate::remote::{NewOrder, NewOrderItem, Order, RemoteClient, RemoteError};

/// Errors that can occur while placing an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("ordering is not configured")]
    Unavailable,

    #[error("backend error: {0}")]
    Remote(#[from] RemoteError),
}

impl CheckoutError {
    /// Message safe to show on the checkout page.
    #[must_use]
    pub const fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyCart => "Your cart is empty",
            Self::Unavailable => "Ordering is not available right now",
            Self::Remote(_) => "We couldn't place your order, please try again",
        }
    }
}

/// A placed order and what was charged.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: Order,
    pub summary: OrderSummary,
    pub item_count: u64,
}

/// Record an order for `user` covering every line of `cart`.
///
/// The order total is the grand total of the order summary (tax included).
/// Each line keeps the unit price it had in the cart.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` for an empty cart and
/// `CheckoutError::Unavailable` without a backend; backend failures are
/// returned as-is. If the line insert fails after the header was written, the
/// header stays behind in `pending` status.
#[instrument(skip_all, fields(user_id = %user.id, items = cart.items().len()))]
pub async fn place_order(
    remote: Option<&RemoteClient>,
    access_token: &str,
    user: &CurrentUser,
    cart: &CartState,
) -> Result<PlacedOrder, CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    let remote = remote.ok_or(CheckoutError::Unavailable)?;
    let summary = OrderSummary::for_cart(cart);

    let order = remote
        .insert_order(
            access_token,
            &NewOrder {
                user_id: user.id.clone(),
                total_amount: summary.grand_total,
                status: OrderStatus::Pending,
            },
        )
        .await?;

    let lines: Vec<NewOrderItem> = cart
        .items()
        .iter()
        .map(|item| NewOrderItem {
            order_id: order.id.clone(),
            product_id: item.id.clone(),
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    if let Err(e) = remote.insert_order_items(access_token, &lines).await {
        tracing::error!(order_id = %order.id, error = %e, "Order lines failed after header was created");
        return Err(e.into());
    }

    tracing::info!(order_id = %order.id, total = %summary.grand_total, "Order placed");
    Ok(PlacedOrder {
        order,
        summary,
        item_count: cart.item_count(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bhuvidevo_core::{Email, UserId};

    use super::*;

    fn user() -> CurrentUser {
        CurrentUser {
            id: UserId::new("u1"),
            email: Email::parse("a@b.co").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_empty_cart_is_rejected_first() {
        let err = place_order(None, "t", &user(), &CartState::new())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_no_backend_is_unavailable() {
        let mut store = bhuvidevo_core::CartStore::new();
        store.dispatch(bhuvidevo_core::CartAction::add(
            bhuvidevo_core::CartProduct::new("1", "A", rust_decimal::Decimal::ONE, ""),
            std::num::NonZeroU32::MIN,
        ));
        let err = place_order(None, "t", &user(), store.state())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Unavailable));
        assert_eq!(err.user_message(), "Ordering is not available right now");
    }
}
