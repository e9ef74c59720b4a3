//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bhuvidevo_core::ProductId;

use super::{Layout, ProductView, not_found};
use crate::catalog::CATEGORIES;
use crate::error::add_breadcrumb;
use crate::filters;
use crate::middleware::{CspNonce, RequireAuth};
use crate::remote::{NewReview, ProductQuery, ProductSort, Review, average_rating};
use crate::services::auth::AuthSession;
use crate::state::AppState;

/// Longest review comment accepted.
const MAX_COMMENT_LENGTH: usize = 2000;

/// Listing filters. Every field mirrors a URL parameter so filtered views can
/// be shared as links.
#[derive(Debug, Default, Deserialize)]
pub struct ListingQuery {
    pub q: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<String>,
    pub max_price: Option<String>,
    pub sort: Option<String>,
}

impl ListingQuery {
    /// Build the backend query. Unparseable prices and sorts are ignored.
    fn to_product_query(&self) -> ProductQuery {
        let mut query = ProductQuery::new().sort(self.sort());
        if let Some(text) = &self.q {
            query = query.text(text.as_str());
        }
        if let Some(category) = &self.category {
            query = query.category(category.as_str());
        }
        if let Some(min) = parse_price(self.min_price.as_deref()) {
            query = query.min_price(min);
        }
        if let Some(max) = parse_price(self.max_price.as_deref()) {
            query = query.max_price(max);
        }
        query
    }

    fn sort(&self) -> ProductSort {
        self.sort
            .as_deref()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

fn parse_price(value: Option<&str>) -> Option<Decimal> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    value.parse::<Decimal>().ok().filter(|d| !d.is_sign_negative())
}

/// Sort option for the listing's select box.
#[derive(Clone, Debug)]
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Category option for the listing's filter.
#[derive(Clone, Debug)]
pub struct CategoryOption {
    pub name: &'static str,
    pub selected: bool,
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub layout: Layout,
    pub products: Vec<ProductView>,
    pub q: String,
    pub category: String,
    pub min_price: String,
    pub max_price: String,
    pub categories: Vec<CategoryOption>,
    pub sort_options: Vec<SortOption>,
}

/// Review display data for templates.
#[derive(Clone, Debug)]
pub struct ReviewView {
    pub rating: u8,
    pub stars: String,
    pub comment: String,
    pub date: String,
}

impl From<&Review> for ReviewView {
    fn from(review: &Review) -> Self {
        Self {
            rating: review.rating,
            stars: stars(review.rating),
            comment: review.comment.clone(),
            date: review.created_at.format("%b %-d, %Y").to_string(),
        }
    }
}

fn stars(rating: u8) -> String {
    let filled = usize::from(rating.min(5));
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}

/// Messages shown after a review post.
#[derive(Debug, Default, Deserialize)]
pub struct ShowQuery {
    pub review_error: Option<String>,
    pub reviewed: Option<String>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub layout: Layout,
    pub product: ProductView,
    pub reviews: Vec<ReviewView>,
    pub average_rating: String,
    pub review_error: Option<String>,
    pub reviewed: bool,
}

/// Review form data.
#[derive(Debug, Deserialize)]
pub struct ReviewForm {
    pub rating: String,
    pub comment: String,
}

impl ReviewForm {
    /// Validate the form into a rating and trimmed comment.
    fn validate(&self) -> Result<(u8, String), &'static str> {
        let rating = self
            .rating
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|r| (1..=5).contains(r))
            .ok_or("Please choose a rating from 1 to 5")?;
        let comment = self.comment.trim();
        if comment.is_empty() {
            return Err("Please write a comment");
        }
        if comment.chars().count() > MAX_COMMENT_LENGTH {
            return Err("Comments are limited to 2000 characters");
        }
        Ok((rating, comment.to_string()))
    }
}

/// Display product listing page.
#[instrument(skip(state, session, nonce))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Query(query): Query<ListingQuery>,
) -> impl IntoResponse {
    let sort = query.sort();
    let products = state.catalog().search(&query.to_product_query()).await;
    let selected_category = query.category.as_deref().map(str::trim).unwrap_or_default();
    let categories = CATEGORIES
        .iter()
        .map(|&name| CategoryOption {
            name,
            selected: name == selected_category,
        })
        .collect();

    ProductsIndexTemplate {
        layout: Layout::load(&session, nonce).await,
        products: products.iter().map(ProductView::from).collect(),
        q: query.q.unwrap_or_default(),
        category: query.category.unwrap_or_default(),
        min_price: query.min_price.unwrap_or_default(),
        max_price: query.max_price.unwrap_or_default(),
        categories,
        sort_options: ProductSort::ALL
            .iter()
            .map(|s| SortOption {
                value: s.as_str(),
                label: s.label(),
                selected: *s == sort,
            })
            .collect(),
    }
}

/// Display product detail page.
#[instrument(skip(state, session, nonce, query))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    nonce: CspNonce,
    Path(id): Path<String>,
    Query(query): Query<ShowQuery>,
) -> Response {
    let id = ProductId::new(id);
    let (product, reviews) = tokio::join!(
        state.catalog().product(&id),
        state.catalog().reviews(&id)
    );
    let layout = Layout::load(&session, nonce).await;

    let Some(product) = product else {
        return not_found(layout, "Product not found").into_response();
    };

    ProductShowTemplate {
        layout,
        product: ProductView::from(&product),
        average_rating: format!("{:.1}", average_rating(&reviews)),
        reviews: reviews.iter().map(ReviewView::from).collect(),
        review_error: query.review_error,
        reviewed: query.reviewed.is_some(),
    }
    .into_response()
}

/// Submit a review for a product.
///
/// Validation and backend failures are reported back on the product page.
#[instrument(skip(state, session, form), fields(user_id = %user.id))]
pub async fn submit_review(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    session: Session,
    Path(id): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Redirect {
    let product_url = format!("/product/{}", urlencoding::encode(&id));
    let fail = |message: &str| {
        Redirect::to(&format!(
            "{product_url}?review_error={}#reviews",
            urlencoding::encode(message)
        ))
    };

    let (rating, comment) = match form.validate() {
        Ok(valid) => valid,
        Err(message) => return fail(message),
    };

    let Some(remote) = state.remote() else {
        return fail("Reviews are not available right now");
    };
    let auth = AuthSession::new(Some(remote), &session);
    let Some(token) = auth.access_token().await else {
        return fail("Please sign in again to leave a review");
    };

    let review = NewReview {
        product_id: ProductId::new(id.as_str()),
        user_id: user.id.clone(),
        rating,
        comment,
    };

    match remote.insert_review(&token, &review).await {
        Ok(saved) => {
            add_breadcrumb("review", "Submitted review", Some(&[("product_id", id.as_str())]));
            tracing::info!(review_id = %saved.id, rating, "Review submitted");
            Redirect::to(&format!("{product_url}?reviewed=1#reviews"))
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to submit review");
            fail("We couldn't save your review, please try again")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(rating: &str, comment: &str) -> ReviewForm {
        ReviewForm {
            rating: rating.to_string(),
            comment: comment.to_string(),
        }
    }

    #[test]
    fn test_review_validation() {
        assert_eq!(form("5", "  Great  ").validate(), Ok((5, "Great".to_string())));
        assert!(form("0", "ok").validate().is_err());
        assert!(form("6", "ok").validate().is_err());
        assert!(form("four", "ok").validate().is_err());
        assert_eq!(form("3", "   ").validate(), Err("Please write a comment"));
    }

    #[test]
    fn test_listing_query_ignores_bad_input() {
        let query = ListingQuery {
            q: Some("  ".to_string()),
            category: Some("Electronics".to_string()),
            min_price: Some("abc".to_string()),
            max_price: Some("5000".to_string()),
            sort: Some("price-desc".to_string()),
        }
        .to_product_query();

        assert_eq!(query.text, None);
        assert_eq!(query.category.as_deref(), Some("Electronics"));
        assert_eq!(query.min_price, None);
        assert_eq!(query.max_price, Some(Decimal::from(5000)));
        assert_eq!(query.sort, Some(ProductSort::PriceDesc));
    }

    #[test]
    fn test_unknown_sort_falls_back_to_default() {
        let query = ListingQuery {
            sort: Some("random".to_string()),
            ..ListingQuery::default()
        };
        assert_eq!(query.sort(), ProductSort::NameAsc);
    }

    #[test]
    fn test_stars() {
        assert_eq!(stars(4), "★★★★☆");
        assert_eq!(stars(9), "★★★★★");
    }
}
