//! Product listing query and its PostgREST encoding.
//!
//! The same query can also be evaluated locally against an in-memory product
//! list, which is how the placeholder catalog is filtered when the backend is
//! unreachable.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use super::types::Product;

/// Characters that PostgREST treats as syntax inside a filter value.
const RESERVED: &[char] = &[',', '.', ':', '(', ')', '"', '\\'];

/// Sort options offered on the listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSort {
    #[default]
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

impl ProductSort {
    pub const ALL: [Self; 4] = [Self::NameAsc, Self::NameDesc, Self::PriceAsc, Self::PriceDesc];

    /// Value used in the `sort` URL parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NameAsc => "name-asc",
            Self::NameDesc => "name-desc",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::NameAsc => "Name: A to Z",
            Self::NameDesc => "Name: Z to A",
            Self::PriceAsc => "Price: Low to High",
            Self::PriceDesc => "Price: High to Low",
        }
    }

    /// Column the backend sorts on.
    #[must_use]
    pub const fn field(self) -> &'static str {
        match self {
            Self::NameAsc | Self::NameDesc => "name",
            Self::PriceAsc | Self::PriceDesc => "price",
        }
    }

    #[must_use]
    pub const fn ascending(self) -> bool {
        matches!(self, Self::NameAsc | Self::PriceAsc)
    }

    fn compare(self, a: &Product, b: &Product) -> Ordering {
        let ordering = match self {
            Self::NameAsc | Self::NameDesc => a.name.cmp(&b.name),
            Self::PriceAsc | Self::PriceDesc => a.price.cmp(&b.price),
        };
        if self.ascending() {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

impl fmt::Display for ProductSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductSort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|sort| sort.as_str() == s)
            .ok_or_else(|| format!("invalid sort: {s}"))
    }
}

/// Filters, sort and limit for a product listing.
///
/// Empty strings are treated as "no filter" by the builder methods, so URL
/// parameters can be passed straight through.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductQuery {
    /// Case-insensitive substring match on name or description.
    pub text: Option<String>,
    /// Exact category match.
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    pub limit: Option<u32>,
}

impl ProductQuery {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = non_empty(text.into());
        self
    }

    #[must_use]
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = non_empty(category.into());
        self
    }

    #[must_use]
    pub const fn min_price(mut self, min: Decimal) -> Self {
        self.min_price = Some(min);
        self
    }

    #[must_use]
    pub const fn max_price(mut self, max: Decimal) -> Self {
        self.max_price = Some(max);
        self
    }

    #[must_use]
    pub const fn sort(mut self, sort: ProductSort) -> Self {
        self.sort = Some(sort);
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Encode as PostgREST query parameters for `GET /rest/v1/products`.
    #[must_use]
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("select", "*".to_string())];

        if let Some(text) = &self.text {
            let pattern = filter_value(&format!("*{text}*"));
            params.push((
                "or",
                format!("(name.ilike.{pattern},description.ilike.{pattern})"),
            ));
        }
        if let Some(category) = &self.category {
            params.push(("category", format!("eq.{category}")));
        }
        if let Some(min) = self.min_price {
            params.push(("price", format!("gte.{min}")));
        }
        if let Some(max) = self.max_price {
            params.push(("price", format!("lte.{max}")));
        }
        if let Some(sort) = self.sort {
            let direction = if sort.ascending() { "asc" } else { "desc" };
            params.push(("order", format!("{}.{direction}", sort.field())));
        }
        if let Some(limit) = self.limit {
            params.push(("limit", limit.to_string()));
        }

        params
    }

    /// Whether a product passes every filter of this query.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(text) = &self.text {
            let needle = text.to_lowercase();
            if !product.name.to_lowercase().contains(&needle)
                && !product.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        if let Some(category) = &self.category
            && product.category != *category
        {
            return false;
        }
        if self.min_price.is_some_and(|min| product.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| product.price > max) {
            return false;
        }
        true
    }

    /// Filter, sort and truncate a product list the way the backend would.
    #[must_use]
    pub fn apply(&self, products: Vec<Product>) -> Vec<Product> {
        let mut matched: Vec<Product> = products.into_iter().filter(|p| self.matches(p)).collect();
        if let Some(sort) = self.sort {
            matched.sort_by(|a, b| sort.compare(a, b));
        }
        if let Some(limit) = self.limit {
            matched.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        }
        matched
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Double-quote a filter value when it contains PostgREST syntax characters.
fn filter_value(value: &str) -> String {
    if !value.contains(RESERVED) {
        return value.to_string();
    }
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}
