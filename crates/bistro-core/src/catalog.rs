//! # Catalog Types
//!
//! Menu items and reviews. Read-mostly data; an initial catalog can be
//! seeded from a TOML file (`config/menu.toml`).

use crate::store::new_document_id;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A dish on the menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    #[serde(rename = "_id", default = "new_document_id")]
    pub id: String,

    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    /// Grouping key for order statistics (e.g. "salad", "pizza")
    pub category: String,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl MenuItem {
    pub fn new(name: impl Into<String>, category: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: new_document_id(),
            name: name.into(),
            recipe: None,
            image: None,
            category: category.into(),
            price,
        }
    }

    /// Builder: set a fixed id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// Body of `POST /menu`
#[derive(Debug, Clone, Deserialize)]
pub struct NewMenuItem {
    pub name: String,
    #[serde(default)]
    pub recipe: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    pub category: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl NewMenuItem {
    pub fn into_item(self) -> MenuItem {
        MenuItem {
            id: new_document_id(),
            name: self.name,
            recipe: self.recipe,
            image: self.image,
            category: self.category,
            price: self.price,
        }
    }
}

/// A customer review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    #[serde(rename = "_id", default = "new_document_id")]
    pub id: String,
    pub name: String,
    pub details: String,
    pub rating: f32,
}

/// Initial catalog content loaded at startup
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogSeed {
    #[serde(default)]
    pub menu: Vec<MenuItem>,
    #[serde(default)]
    pub reviews: Vec<Review>,
}

impl CatalogSeed {
    /// Load a seed from a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
