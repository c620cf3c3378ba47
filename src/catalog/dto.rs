use serde::Deserialize;

use super::repo_types::{NewCatalogItem, Nutrition};

#[derive(Debug, Deserialize)]
pub struct CreateCatalogItemRequest {
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub nutrition: Nutrition,
}

impl CreateCatalogItemRequest {
    /// Names are stored trimmed and lower-cased.
    pub fn validate(self) -> Result<NewCatalogItem, &'static str> {
        let name = self.name.trim().to_lowercase();
        if name.is_empty() {
            return Err("Item name is required");
        }
        if name.chars().count() > 100 {
            return Err("Item name cannot exceed 100 characters");
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err("Price cannot be negative");
        }
        Ok(NewCatalogItem {
            name,
            price: self.price,
            nutrition: self.nutrition,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_normalised() {
        let item = CreateCatalogItemRequest {
            name: "  Greek Yogurt ".into(),
            price: 3.5,
            nutrition: Nutrition::default(),
        }
        .validate()
        .unwrap();
        assert_eq!(item.name, "greek yogurt");
    }

    #[test]
    fn negative_price_rejected() {
        let err = CreateCatalogItemRequest {
            name: "eggs".into(),
            price: -1.0,
            nutrition: Nutrition::default(),
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, "Price cannot be negative");
    }
}
