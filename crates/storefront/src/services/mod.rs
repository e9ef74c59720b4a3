//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Sign-in, sign-up and sign-out against the hosted auth backend
//! - `cart` - Session-backed cart built on the core cart store
//! - `checkout` - Placing an order from the cart

pub mod auth;
pub mod cart;
pub mod checkout;
