//! Built-in product list used when the backend is missing or failing.

use rust_decimal::Decimal;

use bhuvidevo_core::ProductId;

use crate::remote::Product;

/// `(id, name, description, price, category, image, stock)`
type Row = (&'static str, &'static str, &'static str, i64, &'static str, &'static str, i64);

const PRODUCTS: &[Row] = &[
    (
        "1",
        "Wireless Headphones",
        "Premium quality wireless headphones with noise cancellation",
        2999,
        "Electronics",
        "https://images.pexels.com/photos/3394650/pexels-photo-3394650.jpeg?auto=compress&cs=tinysrgb&w=800",
        50,
    ),
    (
        "2",
        "Smart Watch",
        "Feature-rich smartwatch with health monitoring",
        4999,
        "Electronics",
        "https://images.pexels.com/photos/437037/pexels-photo-437037.jpeg?auto=compress&cs=tinysrgb&w=800",
        30,
    ),
    (
        "3",
        "Casual T-Shirt",
        "Comfortable cotton t-shirt for everyday wear",
        799,
        "Fashion",
        "https://images.pexels.com/photos/1040945/pexels-photo-1040945.jpeg?auto=compress&cs=tinysrgb&w=800",
        100,
    ),
    (
        "4",
        "Coffee Mug",
        "Ceramic coffee mug with elegant design",
        299,
        "Home & Living",
        "https://images.pexels.com/photos/302899/pexels-photo-302899.jpeg?auto=compress&cs=tinysrgb&w=800",
        75,
    ),
    (
        "5",
        "Bluetooth Speaker",
        "Portable wireless speaker with rich sound",
        1999,
        "Electronics",
        "https://images.pexels.com/photos/1649771/pexels-photo-1649771.jpeg?auto=compress&cs=tinysrgb&w=800",
        40,
    ),
    (
        "6",
        "Running Shoes",
        "Comfortable running shoes for daily workouts",
        3499,
        "Sports",
        "https://images.pexels.com/photos/2529148/pexels-photo-2529148.jpeg?auto=compress&cs=tinysrgb&w=800",
        60,
    ),
    (
        "7",
        "Desk Lamp",
        "Modern LED desk lamp with adjustable brightness",
        1299,
        "Home & Living",
        "https://images.pexels.com/photos/1112598/pexels-photo-1112598.jpeg?auto=compress&cs=tinysrgb&w=800",
        25,
    ),
    (
        "8",
        "Backpack",
        "Durable travel backpack with multiple compartments",
        2199,
        "Fashion",
        "https://images.pexels.com/photos/2905238/pexels-photo-2905238.jpeg?auto=compress&cs=tinysrgb&w=800",
        35,
    ),
];

/// All placeholder products, in catalog order.
#[must_use]
pub fn products() -> Vec<Product> {
    PRODUCTS.iter().map(to_product).collect()
}

/// Look up a placeholder product.
#[must_use]
pub fn product(id: &ProductId) -> Option<Product> {
    PRODUCTS
        .iter()
        .find(|row| row.0 == id.as_str())
        .map(to_product)
}

fn to_product(&(id, name, description, price, category, image_url, stock): &Row) -> Product {
    Product {
        id: ProductId::new(id),
        name: name.to_string(),
        description: description.to_string(),
        price: Decimal::from(price),
        category: category.to_string(),
        image_url: image_url.to_string(),
        stock_quantity: stock,
        created_at: None,
        updated_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let products = products();
        let mut ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), PRODUCTS.len());
    }

    #[test]
    fn test_lookup() {
        let mug = product(&ProductId::new("4")).map(|p| p.name);
        assert_eq!(mug.as_deref(), Some("Coffee Mug"));
        assert!(product(&ProductId::new("99")).is_none());
    }
}
