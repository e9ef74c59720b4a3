//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured products, categories)
//!
//! # Products
//! GET  /products               - Product listing (q, category, min_price, max_price, sort)
//! GET  /product/{id}           - Product detail with reviews
//! POST /product/{id}/reviews   - Submit a review (requires sign-in)
//!
//! # Cart (form posts; HTMX requests get fragments)
//! GET  /cart                   - Cart page with order summary
//! POST /cart/add               - Add to cart
//! POST /cart/update            - Set a line's quantity
//! POST /cart/remove            - Remove a line
//! POST /cart/clear             - Empty the cart
//! GET  /cart/count             - Cart count badge (fragment)
//!
//! # Checkout (requires sign-in)
//! GET  /checkout               - Order review
//! POST /checkout               - Place order
//!
//! # Auth
//! GET  /auth                   - Sign-in / sign-up page
//! POST /auth/sign-in           - Sign in
//! POST /auth/sign-up           - Create account
//! POST /auth/sign-out          - Sign out
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod home;
pub mod products;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing::{get, post},
};
use tower_sessions::Session;

use crate::filters;
use crate::middleware::{CspNonce, auth_rate_limiter, form_rate_limiter};
use crate::models::{CurrentUser, session_keys};
use crate::remote::Product;
use crate::services;
use crate::state::AppState;

/// Data every page layout needs: the CSP nonce, the signed-in user for the
/// header, and the cart badge count.
#[derive(Clone, Debug, Default)]
pub struct Layout {
    pub nonce: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u64,
}

impl Layout {
    /// Read the header state from the session.
    pub async fn load(session: &Session, CspNonce(nonce): CspNonce) -> Self {
        let user = session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten();
        let cart_count = services::cart::load(session).await.item_count();

        Self {
            nonce,
            user,
            cart_count,
        }
    }
}

/// Product display data for templates.
#[derive(Clone, Debug)]
pub struct ProductView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub image_url: String,
    pub stock: i64,
    pub in_stock: bool,
    /// Quantities offered by the selector on the detail page.
    pub quantities: Vec<u32>,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.clone(),
            price: product.price().display(),
            image_url: product.image_url.clone(),
            stock: product.stock_quantity,
            in_stock: product.in_stock(),
            quantities: (1..=product.max_orderable()).collect(),
        }
    }
}

/// Whether the request was issued by HTMX and expects a fragment back.
pub(crate) fn is_htmx(headers: &HeaderMap) -> bool {
    headers
        .get("hx-request")
        .is_some_and(|v| v.as_bytes() == b"true")
}

/// Not-found page template.
#[derive(Template, WebTemplate)]
#[template(path = "errors/not_found.html")]
pub struct NotFoundTemplate {
    pub layout: Layout,
    pub message: String,
}

/// Render the not-found page with `message`.
pub(crate) fn not_found(layout: Layout, message: impl Into<String>) -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        NotFoundTemplate {
            layout,
            message: message.into(),
        },
    )
}

/// Fallback for unknown paths.
pub async fn fallback(session: Session, nonce: CspNonce) -> impl IntoResponse {
    not_found(Layout::load(&session, nonce).await, "Page not found")
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    let reviews = Router::new()
        .route("/product/{id}/reviews", post(products::submit_review))
        .layer(form_rate_limiter());

    Router::new()
        .route("/products", get(products::index))
        .route("/product/{id}", get(products::show))
        .merge(reviews)
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
        .route("/count", get(cart::count))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    let place = Router::new()
        .route("/checkout", post(checkout::place))
        .layer(form_rate_limiter());

    Router::new()
        .route("/checkout", get(checkout::show))
        .merge(place)
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    let credentials = Router::new()
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/sign-up", post(auth::sign_up))
        .layer(auth_rate_limiter());

    Router::new()
        .route("/auth", get(auth::page))
        .route("/auth/sign-out", post(auth::sign_out))
        .merge(credentials)
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Home page
        .route("/", get(home::home))
        // Product listing, detail and reviews
        .merge(product_routes())
        // Cart routes
        .nest("/cart", cart_routes())
        // Checkout
        .merge(checkout_routes())
        // Auth routes
        .merge(auth_routes())
        .fallback(fallback)
}
