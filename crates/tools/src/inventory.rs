//! Inventory tool functions. Each returns a formatted report string the
//! orchestrator can surface directly.

use std::fmt::Write as _;

use crate::store::{format_dollars, DemoStore, Product, StockStatus, StoreError};

fn status_label(status: StockStatus) -> &'static str {
    match status {
        StockStatus::Good => "in stock",
        StockStatus::Low => "LOW STOCK",
    }
}

fn product_line(product: &Product) -> String {
    format!(
        "- {} ({}): {} units, {} each [{}]",
        product.name,
        product.sku,
        product.quantity,
        format_dollars(product.price_cents),
        status_label(product.status()),
    )
}

pub fn stock_report(store: &DemoStore, product_name: &str) -> String {
    match store.product_by_name(product_name) {
        Some(product) => format!(
            "{} ({}) has {} units on hand. Reorder point is {}, status {}. Supplier: {}.",
            product.name,
            product.sku,
            product.quantity,
            product.reorder_point,
            status_label(product.status()),
            product.supplier,
        ),
        None => format!("No product matching \"{product_name}\" was found in inventory."),
    }
}

pub fn search_report(store: &DemoStore, query: &str) -> String {
    let matches = store.search_products(query);
    if matches.is_empty() {
        return format!("No inventory matches for \"{query}\".");
    }
    let mut report = format!("Found {} product(s) matching \"{query}\":\n", matches.len());
    for product in &matches {
        let _ = writeln!(report, "{}", product_line(product));
    }
    report.trim_end().to_string()
}

pub fn low_stock_report(store: &DemoStore) -> String {
    let low = store.low_stock();
    if low.is_empty() {
        return "All products are above their reorder points.".to_string();
    }
    let mut report = format!("{} product(s) are at or below their reorder point:\n", low.len());
    for product in &low {
        let _ = writeln!(
            report,
            "- {} ({}): {} units (reorder at {})",
            product.name, product.sku, product.quantity, product.reorder_point
        );
    }
    report.trim_end().to_string()
}

pub fn adjustment_report(store: &DemoStore, product_name: &str, delta: i64) -> String {
    let Some(product) = store.product_by_name(product_name) else {
        return format!("No product matching \"{product_name}\" was found in inventory.");
    };
    match store.update_quantity(&product.sku, delta) {
        Ok(update) => format!(
            "Updated {} ({}): {} -> {} units ({}).",
            update.name,
            update.sku,
            update.previous_quantity,
            update.new_quantity,
            status_label(update.status),
        ),
        Err(StoreError::InsufficientStock { requested, available, .. }) => format!(
            "Cannot remove {} units of {}: only {} in stock.",
            requested, product.name, available
        ),
        Err(err) => format!("Inventory update failed: {err}"),
    }
}

pub fn summary_report(store: &DemoStore) -> String {
    let products = store.products();
    let total_units: i64 = products.iter().map(|product| product.quantity).sum();
    let total_value = products
        .iter()
        .fold(0i64, |total, product| {
            total.saturating_add(product.quantity.saturating_mul(product.price_cents))
        });
    let low = products
        .iter()
        .filter(|product| product.status() == StockStatus::Low)
        .count();
    format!(
        "Inventory summary: {} SKUs, {} total units, {} retail value, {} SKU(s) below reorder point.",
        products.len(),
        total_units,
        format_dollars(total_value),
        low,
    )
}

#[cfg(test)]
mod tests {
    use super::{adjustment_report, low_stock_report, stock_report};
    use crate::store::DemoStore;

    #[test]
    fn stock_report_names_the_product() {
        let store = DemoStore::seeded();
        let report = stock_report(&store, "Elite Basketball");
        assert!(report.contains("BB-ELT-001"));
        assert!(report.contains("2847 units"));
    }

    #[test]
    fn unknown_product_is_reported_not_panicked() {
        let store = DemoStore::seeded();
        let report = stock_report(&store, "hockey stick");
        assert!(report.contains("No product matching"));
    }

    #[test]
    fn adjustment_report_shows_transition() {
        let store = DemoStore::seeded();
        let report = adjustment_report(&store, "Team Shorts", -90);
        assert!(report.contains("4890 -> 4800"));
    }

    #[test]
    fn low_stock_report_lists_seeded_shortages() {
        let store = DemoStore::seeded();
        assert!(low_stock_report(&store).contains("Rebound Trainer Net"));
    }
}
