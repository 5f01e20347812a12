use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stock status relative to the reorder point.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    Good,
    Low,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub sku: String,
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub cost_cents: i64,
    pub quantity: i64,
    pub reorder_point: i64,
    pub supplier: String,
}

impl Product {
    pub fn status(&self) -> StockStatus {
        if self.quantity <= self.reorder_point {
            StockStatus::Low
        } else {
            StockStatus::Good
        }
    }

    /// Margin in tenths of a percent, computed from price and cost.
    pub fn margin_tenths(&self) -> i64 {
        if self.price_cents <= 0 {
            return 0;
        }
        (self.price_cents - self.cost_cents) * 1000 / self.price_cents
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub name: String,
    pub tier: String,
    pub territory: String,
    pub contact: String,
    pub email: String,
    pub total_orders: u32,
    pub lifetime_value_cents: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub customer: String,
    pub total_cents: i64,
    pub status: String,
    pub order_date: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuantityUpdate {
    pub sku: String,
    pub name: String,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub status: StockStatus,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PriceUpdate {
    pub sku: String,
    pub name: String,
    pub old_price_cents: i64,
    pub new_price_cents: i64,
    pub margin_tenths: i64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscountBreakdown {
    pub tier: String,
    pub tier_discount_pct: u8,
    pub quantity: i64,
    pub volume_discount_pct: u8,
    pub total_discount_pct: u8,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("product not found: {0}")]
    ProductNotFound(String),
    #[error("cannot decrease {sku} by {requested}: only {available} in stock")]
    InsufficientStock { sku: String, requested: i64, available: i64 },
}

const VOLUME_TIERS: &[(i64, u8)] = &[(500, 20), (100, 15), (50, 10), (10, 5)];

fn tier_discount_pct(tier: &str) -> u8 {
    match tier {
        "Platinum" => 5,
        "Gold" => 3,
        _ => 0,
    }
}

#[derive(Debug)]
struct StoreInner {
    products: Vec<Product>,
    customers: Vec<CustomerRecord>,
    orders: Vec<OrderRecord>,
}

/// Externally-owned demo data shared across tool calls. Last-write-wins per
/// key; the orchestration core assumes nothing stronger about it.
#[derive(Clone, Debug)]
pub struct DemoStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl Default for DemoStore {
    fn default() -> Self {
        Self::seeded()
    }
}

impl DemoStore {
    pub fn seeded() -> Self {
        Self {
            inner: Arc::new(Mutex::new(StoreInner {
                products: seed_products(),
                customers: seed_customers(),
                orders: seed_orders(),
            })),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StoreInner> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Case-insensitive lookup by full or partial product name.
    pub fn product_by_name(&self, name: &str) -> Option<Product> {
        let needle = name.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.lock()
            .products
            .iter()
            .find(|product| product.name.to_ascii_lowercase().contains(&needle))
            .cloned()
    }

    /// Best product mention in free text: the product whose name shares the
    /// most words with the message, ties broken by catalog order.
    pub fn best_product_match(&self, message: &str) -> Option<Product> {
        let normalized = message.to_ascii_lowercase();
        let inner = self.lock();
        let mut best: Option<(usize, &Product)> = None;
        for product in &inner.products {
            let hits = product
                .name
                .to_ascii_lowercase()
                .split_whitespace()
                .filter(|word| word.len() > 3 && normalized.contains(*word))
                .count();
            if hits > 0 && best.map(|(score, _)| hits > score).unwrap_or(true) {
                best = Some((hits, product));
            }
        }
        best.map(|(_, product)| product.clone())
    }

    pub fn search_products(&self, query: &str) -> Vec<Product> {
        let needle = query.trim().to_ascii_lowercase();
        self.lock()
            .products
            .iter()
            .filter(|product| {
                product.name.to_ascii_lowercase().contains(&needle)
                    || product.category.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn products(&self) -> Vec<Product> {
        self.lock().products.clone()
    }

    pub fn low_stock(&self) -> Vec<Product> {
        self.lock()
            .products
            .iter()
            .filter(|product| product.status() == StockStatus::Low)
            .cloned()
            .collect()
    }

    pub fn update_quantity(&self, sku: &str, delta: i64) -> Result<QuantityUpdate, StoreError> {
        let mut inner = self.lock();
        let product = inner
            .products
            .iter_mut()
            .find(|product| product.sku == sku)
            .ok_or_else(|| StoreError::ProductNotFound(sku.to_string()))?;

        let previous = product.quantity;
        let updated = previous.saturating_add(delta);
        if updated < 0 {
            return Err(StoreError::InsufficientStock {
                sku: sku.to_string(),
                requested: delta.saturating_neg(),
                available: previous,
            });
        }
        product.quantity = updated;
        Ok(QuantityUpdate {
            sku: product.sku.clone(),
            name: product.name.clone(),
            previous_quantity: previous,
            new_quantity: updated,
            status: product.status(),
        })
    }

    pub fn update_price(&self, sku: &str, new_price_cents: i64) -> Result<PriceUpdate, StoreError> {
        let mut inner = self.lock();
        let product = inner
            .products
            .iter_mut()
            .find(|product| product.sku == sku)
            .ok_or_else(|| StoreError::ProductNotFound(sku.to_string()))?;

        let old_price_cents = product.price_cents;
        product.price_cents = new_price_cents;
        Ok(PriceUpdate {
            sku: product.sku.clone(),
            name: product.name.clone(),
            old_price_cents,
            new_price_cents,
            margin_tenths: product.margin_tenths(),
        })
    }

    pub fn customer_by_name(&self, name: &str) -> Option<CustomerRecord> {
        let needle = name.trim().to_ascii_lowercase();
        if needle.is_empty() {
            return None;
        }
        self.lock()
            .customers
            .iter()
            .find(|customer| customer.name.to_ascii_lowercase().contains(&needle))
            .cloned()
    }

    pub fn best_customer_match(&self, message: &str) -> Option<CustomerRecord> {
        let normalized = message.to_ascii_lowercase();
        let inner = self.lock();
        let mut best: Option<(usize, &CustomerRecord)> = None;
        for customer in &inner.customers {
            let hits = customer
                .name
                .to_ascii_lowercase()
                .split_whitespace()
                .filter(|word| word.len() > 3 && normalized.contains(*word))
                .count();
            if hits > 0 && best.map(|(score, _)| hits > score).unwrap_or(true) {
                best = Some((hits, customer));
            }
        }
        best.map(|(_, customer)| customer.clone())
    }

    pub fn search_customers(&self, query: &str) -> Vec<CustomerRecord> {
        let needle = query.trim().to_ascii_lowercase();
        self.lock()
            .customers
            .iter()
            .filter(|customer| {
                customer.name.to_ascii_lowercase().contains(&needle)
                    || customer.contact.to_ascii_lowercase().contains(&needle)
                    || customer.territory.to_ascii_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn customers_by_tier(&self, tier: &str) -> Vec<CustomerRecord> {
        let needle = tier.trim().to_ascii_lowercase();
        let mut matches = self
            .lock()
            .customers
            .iter()
            .filter(|customer| customer.tier.to_ascii_lowercase() == needle)
            .cloned()
            .collect::<Vec<_>>();
        matches.sort_by(|a, b| b.lifetime_value_cents.cmp(&a.lifetime_value_cents));
        matches
    }

    pub fn customers(&self) -> Vec<CustomerRecord> {
        self.lock().customers.clone()
    }

    pub fn recent_orders(&self) -> Vec<OrderRecord> {
        self.lock().orders.clone()
    }

    pub fn orders_for(&self, customer_name: &str) -> Vec<OrderRecord> {
        let needle = customer_name.trim().to_ascii_lowercase();
        self.lock()
            .orders
            .iter()
            .filter(|order| order.customer.to_ascii_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    pub fn discount_for(&self, tier: &str, quantity: i64) -> DiscountBreakdown {
        let tier_pct = tier_discount_pct(tier);
        let volume_pct = VOLUME_TIERS
            .iter()
            .find(|(min_qty, _)| quantity >= *min_qty)
            .map(|(_, pct)| *pct)
            .unwrap_or(0);
        DiscountBreakdown {
            tier: tier.to_string(),
            tier_discount_pct: tier_pct,
            quantity,
            volume_discount_pct: volume_pct,
            total_discount_pct: tier_pct + volume_pct,
        }
    }
}

pub fn format_dollars(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let absolute = cents.unsigned_abs();
    format!("{sign}${}.{:02}", absolute / 100, absolute % 100)
}

pub fn format_margin(tenths: i64) -> String {
    format!("{}.{}%", tenths / 10, (tenths % 10).abs())
}

fn product(
    sku: &str,
    name: &str,
    category: &str,
    price_cents: i64,
    cost_cents: i64,
    quantity: i64,
    reorder_point: i64,
    supplier: &str,
) -> Product {
    Product {
        sku: sku.to_string(),
        name: name.to_string(),
        category: category.to_string(),
        price_cents,
        cost_cents,
        quantity,
        reorder_point,
        supplier: supplier.to_string(),
    }
}

fn seed_products() -> Vec<Product> {
    vec![
        product("BB-ELT-001", "Elite Basketball", "Basketballs", 14_999, 6_200, 2_847, 500, "Wilson Sports"),
        product("BB-PRO-002", "Pro Composite Basketball", "Basketballs", 8_999, 3_800, 1_523, 300, "Spalding"),
        product("BB-YTH-001", "Youth Training Basketball", "Basketballs", 3_499, 1_400, 3_567, 800, "Champion Sports"),
        product("BB-TRN-001", "Heavy Training Basketball", "Basketballs", 7_999, 3_200, 892, 200, "Sklz"),
        product("HP-PRO-001", "Pro Arena Hoop System", "Hoops", 499_999, 210_000, 45, 10, "Spalding"),
        product("HP-COL-001", "Collegiate Breakaway Rim", "Hoops", 89_999, 38_000, 178, 30, "Goalsetter"),
        product("HP-PRT-001", "Portable Hoop System 54in", "Hoops", 64_999, 27_500, 234, 50, "Lifetime"),
        product("UNI-JRS-001", "Pro Team Jersey", "Uniforms", 8_999, 2_800, 5_420, 1_000, "Nike"),
        product("UNI-SHT-001", "Team Shorts", "Uniforms", 4_999, 1_600, 4_890, 900, "Nike"),
        product("UNI-WRM-001", "Warm-Up Jacket", "Uniforms", 12_999, 4_500, 1_876, 400, "Under Armour"),
        product("TRN-CON-001", "Agility Cone Set", "Training", 2_999, 900, 1_245, 300, "Sklz"),
        product("TRN-REB-001", "Rebound Trainer Net", "Training", 19_999, 7_500, 234, 250, "Dr. Dish"),
        product("CRT-SCR-001", "Digital LED Scoreboard", "Court Equipment", 249_999, 95_000, 67, 15, "Daktronics"),
        product("CRT-RCK-001", "Ball Storage Rack", "Court Equipment", 24_999, 9_500, 156, 40, "Gared Sports"),
    ]
}

fn customer(
    id: &str,
    name: &str,
    tier: &str,
    territory: &str,
    contact: &str,
    email: &str,
    total_orders: u32,
    lifetime_value_cents: i64,
) -> CustomerRecord {
    CustomerRecord {
        id: id.to_string(),
        name: name.to_string(),
        tier: tier.to_string(),
        territory: territory.to_string(),
        contact: contact.to_string(),
        email: email.to_string(),
        total_orders,
        lifetime_value_cents,
    }
}

fn seed_customers() -> Vec<CustomerRecord> {
    vec![
        customer("CUST-001", "State University Athletics", "Platinum", "West", "Coach Williams", "cwilliams@stateuniv.edu", 156, 8_950_000),
        customer("CUST-002", "City Pro Basketball Academy", "Platinum", "Central", "Director Martinez", "jmartinez@cityproacademy.com", 234, 6_780_000),
        customer("CUST-003", "Metro High School District", "Platinum", "East", "Athletic Director Johnson", "ajohnson@metrohsd.edu", 312, 12_450_000),
        customer("CUST-004", "Riverside Youth Basketball League", "Gold", "West", "League Director Chen", "dchen@riversideybl.org", 89, 2_340_000),
        customer("CUST-006", "Eastside High School", "Gold", "East", "Coach Davis", "cdavis@eastsidehs.edu", 78, 2_120_000),
        customer("CUST-007", "Downtown Recreation Center", "Silver", "Central", "Program Director Lee", "slee@downtownrec.org", 45, 870_000),
        customer("CUST-009", "Parks and Rec Basketball Program", "Bronze", "West", "Coordinator Wilson", "jwilson@parksrec.gov", 12, 280_000),
    ]
}

fn order(id: &str, customer: &str, total_cents: i64, status: &str, order_date: &str) -> OrderRecord {
    OrderRecord {
        id: id.to_string(),
        customer: customer.to_string(),
        total_cents,
        status: status.to_string(),
        order_date: order_date.to_string(),
    }
}

fn seed_orders() -> Vec<OrderRecord> {
    vec![
        order("ORD-2024-001", "State University Athletics", 710_953, "shipped", "2024-12-10"),
        order("ORD-2024-002", "Metro High School District", 2_379_660, "processing", "2024-12-12"),
        order("ORD-2024-003", "Riverside Youth Basketball League", 360_895, "pending", "2024-12-14"),
        order("ORD-2024-004", "City Pro Basketball Academy", 566_969, "shipped", "2024-12-08"),
        order("ORD-2024-005", "Eastside High School", 292_477, "delivered", "2024-12-01"),
    ]
}

#[cfg(test)]
mod tests {
    use super::{format_dollars, format_margin, DemoStore, StockStatus, StoreError};

    #[test]
    fn product_lookup_is_partial_and_case_insensitive() {
        let store = DemoStore::seeded();
        let product = store.product_by_name("elite basketball").expect("elite basketball");
        assert_eq!(product.sku, "BB-ELT-001");
    }

    #[test]
    fn quantity_update_is_last_write_wins() {
        let store = DemoStore::seeded();
        let first = store.update_quantity("BB-ELT-001", -2_000).expect("decrease");
        assert_eq!(first.new_quantity, 847);
        let second = store.update_quantity("BB-ELT-001", 100).expect("increase");
        assert_eq!(second.previous_quantity, 847);
        assert_eq!(second.new_quantity, 947);
    }

    #[test]
    fn quantity_update_saturates_on_huge_deltas() {
        let store = DemoStore::seeded();
        let update = store.update_quantity("BB-ELT-001", i64::MAX).expect("saturating increase");
        assert_eq!(update.new_quantity, i64::MAX);
    }

    #[test]
    fn stock_cannot_go_negative() {
        let store = DemoStore::seeded();
        let result = store.update_quantity("TRN-REB-001", -1_000);
        assert!(matches!(result, Err(StoreError::InsufficientStock { available: 234, .. })));
    }

    #[test]
    fn low_stock_tracks_reorder_point() {
        let store = DemoStore::seeded();
        // Rebound trainer seeds below its reorder point.
        assert!(store.low_stock().iter().any(|product| product.sku == "TRN-REB-001"));
        store.update_quantity("BB-ELT-001", -2_400).expect("drop below reorder point");
        let product = store.product_by_name("Elite Basketball").expect("product");
        assert_eq!(product.status(), StockStatus::Low);
    }

    #[test]
    fn discount_combines_tier_and_volume() {
        let store = DemoStore::seeded();
        let breakdown = store.discount_for("Platinum", 120);
        assert_eq!(breakdown.tier_discount_pct, 5);
        assert_eq!(breakdown.volume_discount_pct, 15);
        assert_eq!(breakdown.total_discount_pct, 20);

        let no_discount = store.discount_for("Bronze", 5);
        assert_eq!(no_discount.total_discount_pct, 0);
    }

    #[test]
    fn tier_listing_is_sorted_by_lifetime_value() {
        let store = DemoStore::seeded();
        let platinum = store.customers_by_tier("platinum");
        assert_eq!(platinum.len(), 3);
        assert_eq!(platinum[0].name, "Metro High School District");
    }

    #[test]
    fn money_formatting_uses_cents() {
        assert_eq!(format_dollars(14_999), "$149.99");
        assert_eq!(format_dollars(-50), "-$0.50");
        assert_eq!(format_margin(586), "58.6%");
    }
}
