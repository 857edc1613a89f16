//! Product payload shared by both services.

use serde::{Deserialize, Serialize};

/// A catalog entry. Keys are PascalCase on the wire; camelCase is accepted
/// when decoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Id", alias = "id")]
    pub id: i32,
    #[serde(rename = "Name", alias = "name")]
    pub name: String,
    #[serde(rename = "Price", alias = "price")]
    pub price: f64,
    #[serde(rename = "Stock", alias = "stock")]
    pub stock: i32,
    #[serde(rename = "Category", alias = "category")]
    pub category: String,
}

impl Product {
    /// The fixed product ServiceB returns for every id.
    pub fn sample(id: i32) -> Self {
        Self {
            id,
            name: "Kalem".to_string(),
            price: 100.0,
            stock: 200,
            category: "Kalemler".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(Product::sample(42)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "Id": 42,
                "Name": "Kalem",
                "Price": 100.0,
                "Stock": 200,
                "Category": "Kalemler"
            })
        );
    }

    #[test]
    fn test_accepts_camel_case() {
        let product: Product = serde_json::from_str(
            r#"{"id":42,"name":"Kalem","price":100,"stock":200,"category":"Kalemler"}"#,
        )
        .unwrap();
        assert_eq!(product, Product::sample(42));
    }
}
