//! Session-backed cart.
//!
//! Each request loads the visitor's cart from the session, applies one action
//! through [`CartStore::dispatch`], and writes it back only if it changed.
//! Requests sharing a session are run one at a time by
//! [`session_lock_middleware`](crate::middleware::session_lock_middleware),
//! so a change is never computed from a cart another request is still saving.

use tower_sessions::Session;

use bhuvidevo_core::{CartAction, CartState, CartStore};

use crate::models::session_keys;

/// Load the visitor's cart; a missing or unreadable entry is an empty cart.
pub async fn load(session: &Session) -> CartState {
    match session.get::<CartState>(session_keys::CART).await {
        Ok(cart) => cart.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read cart from session, starting empty");
            CartState::new()
        }
    }
}

/// Apply one action to the visitor's cart and return the new state.
///
/// # Errors
///
/// Returns an error if the updated cart cannot be written to the session.
pub async fn dispatch(
    session: &Session,
    action: CartAction,
) -> Result<CartState, tower_sessions::session::Error> {
    let mut store = CartStore::from_state(load(session).await);
    if store.dispatch(action) {
        session.insert(session_keys::CART, store.state()).await?;
    }
    Ok(store.into_state())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::num::NonZeroU32;
    use std::sync::Arc;

    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    use bhuvidevo_core::CartProduct;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_cart_persists_between_dispatches() {
        let session = session();
        let mug = CartProduct::new("4", "Coffee Mug", Decimal::from(299), "");

        dispatch(&session, CartAction::add(mug.clone(), NonZeroU32::MIN))
            .await
            .unwrap();
        let cart = dispatch(&session, CartAction::add(mug, NonZeroU32::MIN))
            .await
            .unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(load(&session).await, cart);
    }

    #[tokio::test]
    async fn test_noop_does_not_write_session() {
        let session = session();
        let cart = dispatch(&session, CartAction::remove("missing"))
            .await
            .unwrap();
        assert!(cart.is_empty());
        assert!(session.is_empty().await);
    }

    #[tokio::test]
    async fn test_corrupt_entry_loads_as_empty() {
        let session = session();
        session.insert(session_keys::CART, 42).await.unwrap();
        assert!(load(&session).await.is_empty());
    }
}
