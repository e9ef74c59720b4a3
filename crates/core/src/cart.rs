//! Shopping cart state and its reducer.
//!
//! The cart is a small state container: an insertion-ordered list of line
//! items plus two derived aggregates (`total` and `item_count`). All mutation
//! goes through [`CartStore::dispatch`] with one of the four [`CartAction`]s,
//! and every transition recomputes the aggregates from the item list.
//!
//! Invariants held by every reachable [`CartState`]:
//! - at most one item per product ID
//! - every item has `quantity >= 1`
//! - `total == Σ price × quantity` and `item_count == Σ quantity`
//!
//! # Example
//!
//! ```rust
//! use std::num::NonZeroU32;
//!
//! use bhuvidevo_core::cart::{CartAction, CartProduct, CartStore};
//! use rust_decimal::Decimal;
//!
//! let mut store = CartStore::new();
//! let mug = CartProduct::new("4", "Coffee Mug", Decimal::from(299), "/mug.jpg");
//!
//! store.dispatch(CartAction::add(mug.clone(), NonZeroU32::MIN));
//! store.dispatch(CartAction::add(mug, NonZeroU32::new(2).unwrap()));
//!
//! assert_eq!(store.state().items().len(), 1);
//! assert_eq!(store.state().item_count(), 3);
//! assert_eq!(store.state().total(), Decimal::from(897));
//! ```

use std::num::NonZeroU32;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Goods and services tax applied on the order summary (18%).
pub const TAX_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Product snapshot carried by an add-to-cart action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartProduct {
    /// Product identifier; one cart entry exists per ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Unit price (non-negative).
    pub price: Decimal,
    /// Image URL shown next to the line.
    pub image_url: String,
}

impl CartProduct {
    /// Build a product snapshot.
    #[must_use]
    pub fn new(
        id: impl Into<ProductId>,
        name: impl Into<String>,
        price: Decimal,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            image_url: image_url.into(),
        }
    }
}

/// One line of the cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: ProductId,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub image_url: String,
}

impl CartItem {
    /// Unit price × quantity.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// The closed set of cart transitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartAction {
    /// Append the product, or merge into the existing line by adding
    /// `quantity` to it.
    AddItem {
        product: CartProduct,
        quantity: NonZeroU32,
    },
    /// Set a line's quantity exactly; `quantity <= 0` removes the line.
    UpdateQuantity { id: ProductId, quantity: i64 },
    /// Remove a line if present.
    RemoveItem { id: ProductId },
    /// Remove every line.
    Clear,
}

impl CartAction {
    /// Shorthand for [`CartAction::AddItem`].
    #[must_use]
    pub const fn add(product: CartProduct, quantity: NonZeroU32) -> Self {
        Self::AddItem { product, quantity }
    }

    /// Shorthand for [`CartAction::UpdateQuantity`].
    #[must_use]
    pub fn update(id: impl Into<ProductId>, quantity: i64) -> Self {
        Self::UpdateQuantity {
            id: id.into(),
            quantity,
        }
    }

    /// Shorthand for [`CartAction::RemoveItem`].
    #[must_use]
    pub fn remove(id: impl Into<ProductId>) -> Self {
        Self::RemoveItem { id: id.into() }
    }
}

/// Cart contents with derived aggregates.
///
/// Only the item list is serialized; the aggregates are rebuilt on load, and
/// loading also folds duplicate IDs together and drops empty lines so a
/// deserialized cart always satisfies the invariants.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "StoredCart", into = "StoredCart")]
pub struct CartState {
    items: Vec<CartItem>,
    total: Decimal,
    item_count: u64,
}

impl CartState {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Line items in insertion order.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    /// Σ unit price × quantity.
    #[must_use]
    pub const fn total(&self) -> Decimal {
        self.total
    }

    /// Σ quantity.
    #[must_use]
    pub const fn item_count(&self) -> u64 {
        self.item_count
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up a line by product ID.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| &item.id == id)
    }

    fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|item| &item.id == id)
    }

    fn recompute(&mut self) {
        self.total = self.items.iter().map(CartItem::line_total).sum();
        self.item_count = self.items.iter().map(|item| u64::from(item.quantity)).sum();
    }
}

#[derive(Serialize, Deserialize)]
struct StoredCart {
    items: Vec<CartItem>,
}

impl From<StoredCart> for CartState {
    fn from(stored: StoredCart) -> Self {
        let mut items: Vec<CartItem> = Vec::with_capacity(stored.items.len());
        for item in stored.items.into_iter().filter(|item| item.quantity > 0) {
            match items.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => {
                    existing.quantity = existing.quantity.saturating_add(item.quantity);
                }
                None => items.push(item),
            }
        }

        let mut state = Self {
            items,
            ..Self::default()
        };
        state.recompute();
        state
    }
}

impl From<CartState> for StoredCart {
    fn from(state: CartState) -> Self {
        Self { items: state.items }
    }
}

/// Owner of a [`CartState`] with a single mutation entry point.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartStore {
    state: CartState,
}

impl CartStore {
    /// A store holding an empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing cart (e.g. one loaded from the session).
    #[must_use]
    pub const fn from_state(state: CartState) -> Self {
        Self { state }
    }

    /// Current cart contents.
    #[must_use]
    pub const fn state(&self) -> &CartState {
        &self.state
    }

    /// Give up the store and return its cart.
    #[must_use]
    pub fn into_state(self) -> CartState {
        self.state
    }

    /// Apply one action.
    ///
    /// Returns `false` when the action was a no-op (unknown ID on update or
    /// remove, clearing an empty cart); the state is untouched in that case.
    pub fn dispatch(&mut self, action: CartAction) -> bool {
        let changed = match action {
            CartAction::AddItem { product, quantity } => {
                self.add_item(product, quantity);
                true
            }
            CartAction::UpdateQuantity { id, quantity } => self.update_quantity(&id, quantity),
            CartAction::RemoveItem { id } => self.remove_item(&id),
            CartAction::Clear => {
                let had_items = !self.state.items.is_empty();
                self.state.items.clear();
                had_items
            }
        };

        if changed {
            self.state.recompute();
        }
        changed
    }

    fn add_item(&mut self, product: CartProduct, quantity: NonZeroU32) {
        match self.state.position(&product.id) {
            Some(index) => {
                if let Some(existing) = self.state.items.get_mut(index) {
                    existing.quantity = existing.quantity.saturating_add(quantity.get());
                }
            }
            None => self.state.items.push(CartItem {
                id: product.id,
                name: product.name,
                price: product.price,
                quantity: quantity.get(),
                image_url: product.image_url,
            }),
        }
    }

    fn update_quantity(&mut self, id: &ProductId, quantity: i64) -> bool {
        if quantity <= 0 {
            return self.remove_item(id);
        }

        let Some(item) = self.state.items.iter_mut().find(|item| &item.id == id) else {
            return false;
        };
        item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        true
    }

    fn remove_item(&mut self, id: &ProductId) -> bool {
        match self.state.position(id) {
            Some(index) => {
                self.state.items.remove(index);
                true
            }
            None => false,
        }
    }
}

/// Totals shown on the cart and checkout pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderSummary {
    pub subtotal: Decimal,
    /// Shipping is free on every order.
    pub shipping: Decimal,
    /// `subtotal × 18%`, rounded to whole rupees.
    pub tax: Decimal,
    /// `subtotal × 1.18`, rounded to whole rupees.
    pub grand_total: Decimal,
}

impl OrderSummary {
    /// Derive the summary for a cart.
    #[must_use]
    pub fn for_cart(cart: &CartState) -> Self {
        let subtotal = cart.total();
        Self {
            subtotal,
            shipping: Decimal::ZERO,
            tax: round_whole(subtotal * TAX_RATE),
            grand_total: round_whole(subtotal * (Decimal::ONE + TAX_RATE)),
        }
    }

    #[must_use]
    pub fn subtotal_price(&self) -> Price {
        Price::store(self.subtotal)
    }

    #[must_use]
    pub fn tax_price(&self) -> Price {
        Price::store(self.tax)
    }

    #[must_use]
    pub fn grand_total_price(&self) -> Price {
        Price::store(self.grand_total)
    }
}

fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}
