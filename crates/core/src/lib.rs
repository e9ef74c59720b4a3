//! BhuviDevo Core - Shared types and cart logic.
//!
//! This crate provides the pieces of the storefront that have no I/O:
//! - [`types`] - Newtype wrappers for IDs, prices, emails, and order statuses
//! - [`cart`] - The cart state container and its reducer
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no
//! database, no HTTP clients, no sessions. The `storefront` crate loads a
//! [`cart::CartState`] from the visitor's session, runs one action through a
//! [`cart::CartStore`], and writes the result back.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod types;

pub use cart::{CartAction, CartItem, CartProduct, CartState, CartStore, OrderSummary};
pub use types::*;
