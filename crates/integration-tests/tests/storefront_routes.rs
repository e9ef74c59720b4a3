//! End-to-end tests for the storefront router without a backend.
//!
//! The catalog serves its placeholder products, and account features report
//! themselves unavailable.

#![allow(clippy::unwrap_used)]

use axum::http::StatusCode;

use bhuvidevo_integration_tests::TestClient;

fn position(haystack: &str, needle: &str) -> usize {
    haystack
        .find(needle)
        .unwrap_or_else(|| panic!("{needle:?} not found in page"))
}

// =============================================================================
// Health and headers
// =============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let mut client = TestClient::placeholder();

    let live = client.get("/health").await;
    assert_eq!(live.status, StatusCode::OK);
    assert_eq!(live.body, "ok");

    let ready = client.get("/health/ready").await;
    assert_eq!(ready.status, StatusCode::OK);
}

#[tokio::test]
async fn test_pages_carry_security_headers() {
    let mut client = TestClient::placeholder();
    let page = client.get("/").await;

    assert_eq!(page.status, StatusCode::OK);
    assert_eq!(page.header("x-frame-options"), Some("DENY"));
    assert_eq!(page.header("x-content-type-options"), Some("nosniff"));
    assert_eq!(page.header("cache-control"), Some("no-store, max-age=0"));
    assert!(page.header("x-request-id").is_some());

    let csp = page.header("content-security-policy").unwrap();
    assert!(csp.contains("script-src 'self' 'nonce-"));
    assert!(csp.contains("https://images.pexels.com"));
    assert!(csp.contains("frame-ancestors 'none'"));
}

#[tokio::test]
async fn test_static_assets_are_cacheable() {
    let mut client = TestClient::placeholder();
    let css = client.get("/static/css/main.css").await;

    assert_eq!(css.status, StatusCode::OK);
    assert_eq!(
        css.header("cache-control"),
        Some("public, max-age=31536000, immutable")
    );
}

// =============================================================================
// Browsing
// =============================================================================

#[tokio::test]
async fn test_home_shows_featured_products() {
    let mut client = TestClient::placeholder();
    let page = client.get("/").await;

    assert!(page.body.contains("Discover Amazing Products"));
    assert!(page.body.contains("Wireless Headphones"));
    assert!(page.body.contains("Shop by Category"));
    assert!(page.body.contains("Sign in"));
}

#[tokio::test]
async fn test_listing_filters_and_sorts() {
    let mut client = TestClient::placeholder();
    let page = client.get("/products?category=Fashion&sort=price-desc").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(!page.body.contains("Smart Watch"));
    assert!(position(&page.body, "Backpack") < position(&page.body, "Casual T-Shirt"));
}

#[tokio::test]
async fn test_listing_text_search() {
    let mut client = TestClient::placeholder();
    let page = client.get("/products?q=wireless").await;

    assert!(page.body.contains("Wireless Headphones"));
    assert!(page.body.contains("Bluetooth Speaker"));
    assert!(!page.body.contains("Coffee Mug"));
}

#[tokio::test]
async fn test_listing_ignores_unparseable_prices() {
    let mut client = TestClient::placeholder();
    let page = client.get("/products?min_price=abc&max_price=-5").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Coffee Mug"));
    assert!(page.body.contains("Smart Watch"));
}

#[tokio::test]
async fn test_product_detail_and_missing_product() {
    let mut client = TestClient::placeholder();

    let page = client.get("/product/6").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Running Shoes"));
    assert!(page.body.contains("Customer Reviews"));

    let missing = client.get("/product/does-not-exist").await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);
    assert!(missing.body.contains("Product not found"));
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let mut client = TestClient::placeholder();
    let page = client.get("/no/such/page").await;
    assert_eq!(page.status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Cart
// =============================================================================

#[tokio::test]
async fn test_cart_starts_empty() {
    let mut client = TestClient::placeholder();
    let page = client.get("/cart").await;

    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_cart_add_update_remove() {
    let mut client = TestClient::placeholder();

    let added = client
        .post_form("/cart/add", &[("id", "1"), ("quantity", "2")])
        .await;
    assert_eq!(added.status, StatusCode::SEE_OTHER);
    assert_eq!(added.location(), Some("/cart"));
    assert!(client.has_session());

    let cart = client.get("/cart").await;
    assert!(cart.body.contains("Wireless Headphones"));
    assert!(cart.body.contains("₹5,998"));
    assert!(cart.body.contains("₹1,080"));
    assert!(cart.body.contains("₹7,078"));
    assert!(cart.body.contains(r#"id="cart-count">2<"#));

    // A second add of the same product merges into the existing line.
    client.post_form("/cart/add", &[("id", "1")]).await;
    let cart = client.get("/cart").await;
    assert!(cart.body.contains("₹8,997"));
    assert!(cart.body.contains(r#"id="cart-count">3<"#));

    let updated = client
        .post_form("/cart/update", &[("id", "1"), ("quantity", "5")])
        .await;
    assert_eq!(updated.location(), Some("/cart"));
    let cart = client.get("/cart").await;
    assert!(cart.body.contains("₹14,995"));

    client.post_form("/cart/remove", &[("id", "1")]).await;
    let cart = client.get("/cart").await;
    assert!(cart.body.contains("Your cart is empty."));
}

#[tokio::test]
async fn test_cart_update_to_zero_removes_line() {
    let mut client = TestClient::placeholder();
    client.post_form("/cart/add", &[("id", "4")]).await;
    client.post_form("/cart/add", &[("id", "7")]).await;

    client
        .post_form("/cart/update", &[("id", "4"), ("quantity", "0")])
        .await;

    let cart = client.get("/cart").await;
    assert!(!cart.body.contains("Coffee Mug"));
    assert!(cart.body.contains("Desk Lamp"));
}

#[tokio::test]
async fn test_cart_clear() {
    let mut client = TestClient::placeholder();
    client.post_form("/cart/add", &[("id", "2")]).await;
    client.post_form("/cart/add", &[("id", "3")]).await;

    let cleared = client.post_form("/cart/clear", &[]).await;
    assert_eq!(cleared.location(), Some("/cart"));

    let count = client.get("/cart/count").await;
    assert!(count.body.contains(">0<"));
}

#[tokio::test]
async fn test_cart_rejects_bad_input() {
    let mut client = TestClient::placeholder();

    let zero = client
        .post_form("/cart/add", &[("id", "1"), ("quantity", "0")])
        .await;
    assert_eq!(zero.status, StatusCode::BAD_REQUEST);

    let garbage = client
        .post_form("/cart/add", &[("id", "1"), ("quantity", "lots")])
        .await;
    assert_eq!(garbage.status, StatusCode::BAD_REQUEST);

    let unknown = client.post_form("/cart/add", &[("id", "999")]).await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);

    let bad_update = client
        .post_form("/cart/update", &[("id", "1"), ("quantity", "1.5")])
        .await;
    assert_eq!(bad_update.status, StatusCode::BAD_REQUEST);

    let count = client.get("/cart/count").await;
    assert!(count.body.contains(">0<"));
}

#[tokio::test]
async fn test_cart_add_return_to_stays_local() {
    let mut client = TestClient::placeholder();

    let local = client
        .post_form("/cart/add", &[("id", "5"), ("return_to", "/product/5")])
        .await;
    assert_eq!(local.location(), Some("/product/5"));

    let offsite = client
        .post_form("/cart/add", &[("id", "5"), ("return_to", "//evil.example")])
        .await;
    assert_eq!(offsite.location(), Some("/"));
}

#[tokio::test]
async fn test_cart_htmx_fragments() {
    let mut client = TestClient::placeholder();

    let added = client
        .post_htmx("/cart/add", &[("id", "6"), ("quantity", "3")])
        .await;
    assert_eq!(added.status, StatusCode::OK);
    assert_eq!(added.header("hx-trigger"), Some("cart-updated"));
    assert!(added.body.contains(r#"id="cart-count">3<"#));

    let updated = client
        .post_htmx("/cart/update", &[("id", "6"), ("quantity", "1")])
        .await;
    assert_eq!(updated.status, StatusCode::OK);
    assert!(updated.body.contains("Running Shoes"));
    assert!(updated.body.contains("Order Summary"));
}

// =============================================================================
// Sign-in gates
// =============================================================================

#[tokio::test]
async fn test_checkout_requires_sign_in() {
    let mut client = TestClient::placeholder();
    client.post_form("/cart/add", &[("id", "1")]).await;

    let page = client.get("/checkout").await;
    assert_eq!(page.status, StatusCode::SEE_OTHER);
    assert_eq!(page.location(), Some("/auth?redirect=/checkout"));

    let place = client.post_form("/checkout", &[]).await;
    assert_eq!(place.location(), Some("/auth?redirect=/checkout"));
}

#[tokio::test]
async fn test_review_requires_sign_in() {
    let mut client = TestClient::placeholder();
    let posted = client
        .post_form("/product/1/reviews", &[("rating", "5"), ("comment", "Great")])
        .await;

    assert_eq!(posted.status, StatusCode::SEE_OTHER);
    assert_eq!(posted.location(), Some("/auth?redirect=/product/1"));
}

// =============================================================================
// Auth without a backend
// =============================================================================

#[tokio::test]
async fn test_auth_page_reports_unavailable() {
    let mut client = TestClient::placeholder();

    let page = client.get("/auth?redirect=/checkout").await;
    assert_eq!(page.status, StatusCode::OK);
    assert!(page.body.contains("Accounts are not available right now"));
    assert!(page.body.contains(r#"name="redirect" value="/checkout""#));

    let sign_up = client.get("/auth?mode=sign-up").await;
    assert!(sign_up.body.contains("Create your account"));
}

#[tokio::test]
async fn test_sign_in_without_backend_returns_to_form() {
    let mut client = TestClient::placeholder();

    let response = client
        .post_form(
            "/auth/sign-in",
            &[
                ("email", "shopper@example.com"),
                ("password", "secret123"),
                ("redirect", "/checkout"),
            ],
        )
        .await;

    assert_eq!(response.status, StatusCode::SEE_OTHER);
    let location = response.location().unwrap();
    assert!(location.starts_with("/auth?mode=sign-in&error=Accounts%20are%20not%20available"));
    assert!(location.ends_with("&redirect=%2Fcheckout"));
}

#[tokio::test]
async fn test_sign_up_validates_before_backend() {
    let mut client = TestClient::placeholder();

    let response = client
        .post_form(
            "/auth/sign-up",
            &[
                ("email", "shopper@example.com"),
                ("password", "secret123"),
                ("confirm_password", "secret124"),
            ],
        )
        .await;

    let location = response.location().unwrap();
    assert!(location.starts_with("/auth?mode=sign-up&error="));
    assert!(location.contains("match"));
}

#[tokio::test]
async fn test_sign_out_keeps_cart() {
    let mut client = TestClient::placeholder();
    client.post_form("/cart/add", &[("id", "8"), ("quantity", "2")]).await;

    let signed_out = client.post_form("/auth/sign-out", &[]).await;
    assert_eq!(signed_out.location(), Some("/"));

    let count = client.get("/cart/count").await;
    assert!(count.body.contains(">2<"));
}

#[tokio::test]
async fn test_auth_posts_are_rate_limited() {
    let mut client = TestClient::placeholder();
    let form = [("email", "bad"), ("password", "x")];

    let mut statuses = Vec::new();
    for _ in 0..8 {
        statuses.push(client.post_form("/auth/sign-in", &form).await.status);
    }

    assert_eq!(statuses[0], StatusCode::SEE_OTHER);
    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
}
