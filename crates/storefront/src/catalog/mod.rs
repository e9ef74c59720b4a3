//! Product and review reads with placeholder fallback.
//!
//! Reads go to the backend when one is configured. If the backend is absent
//! or a read fails, the failure is logged and the built-in placeholder
//! products are served instead (filtered with the same query), so browsing
//! keeps working. Reviews fall back to an empty list.

pub mod placeholder;

use tracing::instrument;

use bhuvidevo_core::ProductId;

use crate::remote::{Product, ProductQuery, RemoteClient, RemoteError, Review};

/// Products shown on the home page.
pub const FEATURED_LIMIT: u32 = 8;

/// Category filter values offered on the listing page.
pub const CATEGORIES: &[&str] = &[
    "Electronics",
    "Fashion",
    "Home & Living",
    "Sports",
    "Books",
    "Beauty",
];

/// A category tile on the home page.
#[derive(Debug, Clone, Copy)]
pub struct FeaturedCategory {
    pub name: &'static str,
    pub description: &'static str,
    pub image_url: &'static str,
}

pub const FEATURED_CATEGORIES: &[FeaturedCategory] = &[
    FeaturedCategory {
        name: "Electronics",
        description: "Latest gadgets and tech",
        image_url: "https://images.pexels.com/photos/356036/pexels-photo-356036.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    FeaturedCategory {
        name: "Fashion",
        description: "Trendy clothing and accessories",
        image_url: "https://images.pexels.com/photos/996329/pexels-photo-996329.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    FeaturedCategory {
        name: "Home & Living",
        description: "Furniture and home decor",
        image_url: "https://images.pexels.com/photos/1148955/pexels-photo-1148955.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
    FeaturedCategory {
        name: "Sports",
        description: "Sports equipment and gear",
        image_url: "https://images.pexels.com/photos/863988/pexels-photo-863988.jpeg?auto=compress&cs=tinysrgb&w=800",
    },
];

/// Read side of the store.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    remote: Option<RemoteClient>,
}

impl Catalog {
    #[must_use]
    pub const fn new(remote: Option<RemoteClient>) -> Self {
        Self { remote }
    }

    /// Products for the home page.
    pub async fn featured(&self) -> Vec<Product> {
        self.search(&ProductQuery::new().limit(FEATURED_LIMIT)).await
    }

    /// Products matching a listing query.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &ProductQuery) -> Vec<Product> {
        if let Some(remote) = &self.remote {
            match remote.list_products(query).await {
                Ok(products) => return products,
                Err(e) => log_fallback(&e, "product listing"),
            }
        }
        query.apply(placeholder::products())
    }

    /// A single product, `None` if it does not exist.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn product(&self, id: &ProductId) -> Option<Product> {
        if let Some(remote) = &self.remote {
            match remote.get_product(id).await {
                Ok(product) => return Some(product),
                Err(RemoteError::NotFound(_)) => return None,
                Err(e) => log_fallback(&e, "product lookup"),
            }
        }
        placeholder::product(id)
    }

    /// Latest reviews for a product.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn reviews(&self, id: &ProductId) -> Vec<Review> {
        let Some(remote) = &self.remote else {
            return Vec::new();
        };
        remote.list_reviews(id).await.unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to fetch reviews");
            Vec::new()
        })
    }
}

fn log_fallback(error: &RemoteError, what: &str) {
    tracing::warn!(error = %error, "{what} failed, serving placeholder products");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::remote::ProductSort;

    #[tokio::test]
    async fn test_featured_without_backend() {
        let featured = Catalog::default().featured().await;
        assert_eq!(featured.len(), 8);
        assert_eq!(featured[0].name, "Wireless Headphones");
    }

    #[tokio::test]
    async fn test_search_without_backend_applies_query() {
        let query = ProductQuery::new()
            .category("Fashion")
            .sort(ProductSort::PriceDesc);
        let names: Vec<String> = Catalog::default()
            .search(&query)
            .await
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, ["Backpack", "Casual T-Shirt"]);

        let query = ProductQuery::new().min_price(Decimal::from(4000));
        let found = Catalog::default().search(&query).await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id.as_str(), "2");
    }

    #[tokio::test]
    async fn test_product_and_reviews_without_backend() {
        let catalog = Catalog::default();
        assert!(catalog.product(&ProductId::new("6")).await.is_some());
        assert!(catalog.product(&ProductId::new("nope")).await.is_none());
        assert!(catalog.reviews(&ProductId::new("6")).await.is_empty());
    }
}
