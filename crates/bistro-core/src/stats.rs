//! # Statistics
//!
//! Dashboard rollups over recorded payments. Pending payments are excluded
//! until reconciliation records them.

use crate::error::BistroResult;
use crate::money::{round_money, rounded_sum};
use crate::payment::Payment;
use crate::store::{PaymentFilter, SharedStore};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::instrument;

/// Per-user dashboard totals
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserHome {
    /// Line items purchased (not distinct dishes)
    pub total_menu: usize,
    pub total_order: usize,
    /// Rendered as a two-decimal string, e.g. `"15.01"`
    pub total_payment: Decimal,
}

/// Admin dashboard counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminStats {
    /// Rendered as a two-decimal string
    pub revenue: Decimal,
    pub users: u64,
    pub products: u64,
    pub orders: u64,
}

/// Sales of one menu category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub count: u64,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

/// Computes rollups by joining payments against the menu catalog
#[derive(Clone)]
pub struct StatsAggregator {
    store: SharedStore,
}

impl StatsAggregator {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn user_home(&self, email: &str) -> BistroResult<UserHome> {
        let payments = self
            .store
            .find_payments(&PaymentFilter::recorded().with_email(email))
            .await?;

        Ok(UserHome {
            total_menu: payments.iter().map(Payment::line_count).sum(),
            total_order: payments.len(),
            total_payment: rounded_sum(payments.iter().map(|p| p.price)),
        })
    }

    #[instrument(skip(self))]
    pub async fn admin_stats(&self) -> BistroResult<AdminStats> {
        let users = self.store.count_users().await?;
        let products = self.store.count_menu().await?;
        let payments = self.store.find_payments(&PaymentFilter::recorded()).await?;

        Ok(AdminStats {
            revenue: rounded_sum(payments.iter().map(|p| p.price)),
            users,
            products,
            orders: payments.len() as u64,
        })
    }

    /// Group purchased dishes by category. Each payment counts a dish once
    /// however many times it lists it; dishes no longer on the menu are
    /// skipped; categories without sales are absent. Sorted by category.
    #[instrument(skip(self))]
    pub async fn order_stats(&self) -> BistroResult<Vec<CategoryStats>> {
        let payments = self.store.find_payments(&PaymentFilter::recorded()).await?;

        let wanted: Vec<String> = payments
            .iter()
            .flat_map(|p| p.menu_items.iter().cloned())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let menu: HashMap<String, _> = self
            .store
            .find_menu_items(&wanted)
            .await?
            .into_iter()
            .map(|m| (m.id.clone(), m))
            .collect();

        let mut groups: BTreeMap<String, (u64, Decimal)> = BTreeMap::new();
        for payment in &payments {
            let distinct: HashSet<&String> = payment.menu_items.iter().collect();
            for item in distinct.into_iter().filter_map(|id| menu.get(id)) {
                let entry = groups
                    .entry(item.category.clone())
                    .or_insert((0, Decimal::ZERO));
                entry.0 += 1;
                entry.1 += item.price;
            }
        }

        Ok(groups
            .into_iter()
            .map(|(category, (count, total))| CategoryStats {
                category,
                count,
                total: round_money(total),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MenuItem;
    use crate::payment::{PaymentStatus, PaymentSubmission};
    use crate::store::{new_document_id, MemoryStore, Store};

    const OWNER: &str = "alice@example.com";

    async fn record(store: &dyn Store, email: &str, price: Decimal, menu: &[&str]) {
        let mut payment = PaymentSubmission::new(email, price, vec![new_document_id()])
            .with_menu_items(menu.iter().map(|s| s.to_string()).collect())
            .into_pending();
        payment.status = PaymentStatus::Recorded;
        store.insert_payment(payment).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_home_rounds_half_up() {
        let store = MemoryStore::new().shared();
        record(store.as_ref(), OWNER, Decimal::new(10005, 3), &["a", "b"]).await;
        record(store.as_ref(), OWNER, Decimal::new(500, 2), &["c"]).await;
        record(store.as_ref(), "bob@example.com", Decimal::new(99, 0), &["a"]).await;

        let home = StatsAggregator::new(store).user_home(OWNER).await.unwrap();

        assert_eq!(home.total_menu, 3);
        assert_eq!(home.total_order, 2);
        assert_eq!(home.total_payment.to_string(), "15.01");

        let json = serde_json::to_value(&home).unwrap();
        assert_eq!(json["totalPayment"], "15.01");
        assert_eq!(json["totalMenu"], 3);
    }

    #[tokio::test]
    async fn test_user_home_ignores_pending_payments() {
        let store = MemoryStore::new().shared();
        record(store.as_ref(), OWNER, Decimal::new(500, 2), &["c"]).await;
        let pending = PaymentSubmission::new(OWNER, Decimal::new(700, 2), vec!["x".into()])
            .with_menu_items(vec!["d".into()])
            .into_pending();
        store.insert_payment(pending).await.unwrap();

        let home = StatsAggregator::new(store).user_home(OWNER).await.unwrap();
        assert_eq!(home.total_order, 1);
        assert_eq!(home.total_payment.to_string(), "5.00");
    }

    #[tokio::test]
    async fn test_user_home_empty() {
        let home = StatsAggregator::new(MemoryStore::new().shared())
            .user_home(OWNER)
            .await
            .unwrap();
        assert_eq!(home.total_order, 0);
        assert_eq!(home.total_payment.to_string(), "0.00");
    }

    #[tokio::test]
    async fn test_admin_stats() {
        let store = MemoryStore::new();
        store
            .insert_menu_item(MenuItem::new("Soup", "soup", Decimal::new(650, 2)))
            .await
            .unwrap();
        let store = store.shared();
        record(store.as_ref(), OWNER, Decimal::new(10005, 3), &["a"]).await;
        record(store.as_ref(), "bob@example.com", Decimal::new(5, 0), &["b"]).await;

        let stats = StatsAggregator::new(store).admin_stats().await.unwrap();

        assert_eq!(stats.revenue.to_string(), "15.01");
        assert_eq!(stats.products, 1);
        assert_eq!(stats.orders, 2);
        assert_eq!(stats.users, 0);
    }

    #[tokio::test]
    async fn test_order_stats_groups_and_rounds_per_category() {
        let store = MemoryStore::new();
        for item in [
            MenuItem::new("Caesar", "salad", Decimal::new(10005, 3)).with_id("s1"),
            MenuItem::new("Greek", "salad", Decimal::new(10005, 3)).with_id("s2"),
            MenuItem::new("Margherita", "pizza", Decimal::new(14, 0)).with_id("p1"),
            MenuItem::new("Lemonade", "drinks", Decimal::new(3, 0)).with_id("d1"),
        ] {
            store.insert_menu_item(item).await.unwrap();
        }
        let store = store.shared();
        // s1 listed twice in one payment counts once; "gone" is not on the menu
        record(store.as_ref(), OWNER, Decimal::new(20, 0), &["s1", "s1", "p1"]).await;
        record(store.as_ref(), OWNER, Decimal::new(10, 0), &["s2", "gone"]).await;

        let stats = StatsAggregator::new(store).order_stats().await.unwrap();

        assert_eq!(
            stats,
            vec![
                CategoryStats {
                    category: "pizza".to_string(),
                    count: 1,
                    total: Decimal::new(1400, 2),
                },
                CategoryStats {
                    category: "salad".to_string(),
                    count: 2,
                    // 10.005 + 10.005 = 20.010, not 10.01 + 10.01
                    total: Decimal::new(2001, 2),
                },
            ]
        );
        assert!(stats.iter().all(|s| s.category != "drinks"));

        let json = serde_json::to_value(&stats).unwrap();
        let total = json[1]["total"].as_f64().unwrap();
        assert!((total - 20.01).abs() < 1e-9);
    }
}
