//! # Cart Types
//!
//! Per-user cart line items awaiting checkout.

use crate::catalog::MenuItem;
use crate::store::new_document_id;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A line item in a user's cart. Owned exclusively by `email`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owner
    pub email: String,

    pub menu_item_id: String,

    /// Menu item name (denormalized for display)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl CartItem {
    pub fn new(email: impl Into<String>, menu_item_id: impl Into<String>, price: Decimal) -> Self {
        Self {
            id: new_document_id(),
            email: email.into(),
            menu_item_id: menu_item_id.into(),
            name: None,
            image: None,
            price,
        }
    }

    /// Builder: set a fixed id
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Take price from the catalog entry; fill display fields the client left out.
    pub fn price_from(&mut self, menu: &MenuItem) {
        self.price = menu.price;
        if self.name.is_none() {
            self.name = Some(menu.name.clone());
        }
        if self.image.is_none() {
            self.image = menu.image.clone();
        }
    }
}

/// Body of `POST /carts`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCartItem {
    pub email: String,
    pub menu_item_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
}

impl NewCartItem {
    pub fn into_item(self) -> CartItem {
        CartItem {
            id: new_document_id(),
            email: self.email,
            menu_item_id: self.menu_item_id,
            name: self.name,
            image: self.image,
            price: self.price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cart_item_from_json() {
        let new_item: NewCartItem = serde_json::from_str(
            r#"{"email":"a@b.com","menuItemId":"m1","name":"Soup","price":6.5}"#,
        )
        .unwrap();
        let item = new_item.into_item();

        assert_eq!(item.menu_item_id, "m1");
        assert_eq!(item.price, Decimal::new(65, 1));
        assert_eq!(item.id.len(), 32);
    }

    #[test]
    fn test_cart_item_json_shape() {
        let item = CartItem::new("a@b.com", "m1", Decimal::new(650, 2)).with_id("c1");
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["_id"], "c1");
        assert_eq!(json["menuItemId"], "m1");
        assert_eq!(json["price"], 6.5);
    }

    #[test]
    fn test_price_from_catalog() {
        let menu = MenuItem::new("Soup", "soup", Decimal::new(650, 2)).with_id("m1");
        let mut item = CartItem::new("a@b.com", "m1", Decimal::new(1, 2));
        item.price_from(&menu);

        assert_eq!(item.price, Decimal::new(650, 2));
        assert_eq!(item.name.as_deref(), Some("Soup"));
    }
}
