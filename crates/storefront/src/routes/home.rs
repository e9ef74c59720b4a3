//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tower_sessions::Session;
use tracing::instrument;

use super::{Layout, ProductView};
use crate::catalog::{FEATURED_CATEGORIES, FeaturedCategory};
use crate::filters;
use crate::middleware::CspNonce;
use crate::state::AppState;

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub featured: Vec<ProductView>,
    pub categories: &'static [FeaturedCategory],
}

/// Display the home page.
#[instrument(skip(state, session, nonce))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
) -> impl IntoResponse {
    let featured = state.catalog().featured().await;

    HomeTemplate {
        layout: Layout::load(&session, nonce).await,
        featured: featured.iter().map(ProductView::from).collect(),
        categories: FEATURED_CATEGORIES,
    }
}
