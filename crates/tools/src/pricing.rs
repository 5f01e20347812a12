//! Pricing tool functions: price lookups, margin analysis, and the combined
//! tier-plus-volume discount calculation.

use std::fmt::Write as _;

use crate::store::{format_dollars, format_margin, DemoStore, StoreError};

pub fn price_report(store: &DemoStore, product_name: &str) -> String {
    match store.product_by_name(product_name) {
        Some(product) => format!(
            "{} ({}) is priced at {}. Cost is {}, for a margin of {}.",
            product.name,
            product.sku,
            format_dollars(product.price_cents),
            format_dollars(product.cost_cents),
            format_margin(product.margin_tenths()),
        ),
        None => format!("No product matching \"{product_name}\" was found in the price book."),
    }
}

pub fn category_report(store: &DemoStore, category: &str) -> String {
    let matches = store.search_products(category);
    if matches.is_empty() {
        return format!("No priced products in category \"{category}\".");
    }
    let mut report = format!("Pricing for \"{category}\" ({} product(s)):\n", matches.len());
    for product in &matches {
        let _ = writeln!(
            report,
            "- {}: {} (margin {})",
            product.name,
            format_dollars(product.price_cents),
            format_margin(product.margin_tenths()),
        );
    }
    report.trim_end().to_string()
}

pub fn price_change_report(store: &DemoStore, product_name: &str, new_price_cents: i64) -> String {
    let Some(product) = store.product_by_name(product_name) else {
        return format!("No product matching \"{product_name}\" was found in the price book.");
    };
    if new_price_cents <= 0 {
        return format!("Refusing to set a non-positive price for {}.", product.name);
    }
    match store.update_price(&product.sku, new_price_cents) {
        Ok(update) => format!(
            "Updated {} ({}): {} -> {}. Margin is now {}.",
            update.name,
            update.sku,
            format_dollars(update.old_price_cents),
            format_dollars(update.new_price_cents),
            format_margin(update.margin_tenths),
        ),
        Err(StoreError::ProductNotFound(sku)) => {
            format!("Product {sku} disappeared before the price update could apply.")
        }
        Err(err) => format!("Price update failed: {err}"),
    }
}

pub fn discount_report(store: &DemoStore, tier: &str, quantity: i64) -> String {
    let breakdown = store.discount_for(tier, quantity.max(0));
    if breakdown.total_discount_pct == 0 {
        return format!(
            "No discount applies for a {} customer ordering {} unit(s).",
            breakdown.tier, breakdown.quantity
        );
    }
    format!(
        "{} tier discount {}% + volume discount {}% for {} unit(s) = {}% total discount.",
        breakdown.tier,
        breakdown.tier_discount_pct,
        breakdown.volume_discount_pct,
        breakdown.quantity,
        breakdown.total_discount_pct,
    )
}

pub fn summary_report(store: &DemoStore) -> String {
    let products = store.products();
    if products.is_empty() {
        return "The price book is empty.".to_string();
    }
    let highest = products
        .iter()
        .max_by_key(|product| product.margin_tenths())
        .cloned();
    let average_tenths =
        products.iter().map(|product| product.margin_tenths()).sum::<i64>() / products.len() as i64;
    match highest {
        Some(best) => format!(
            "Price book covers {} SKUs with an average margin of {}. Best margin: {} at {}.",
            products.len(),
            format_margin(average_tenths),
            best.name,
            format_margin(best.margin_tenths()),
        ),
        None => "The price book is empty.".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::{discount_report, price_change_report, price_report};
    use crate::store::DemoStore;

    #[test]
    fn price_report_uses_dollar_formatting() {
        let store = DemoStore::seeded();
        let report = price_report(&store, "Elite Basketball");
        assert!(report.contains("$149.99"));
        assert!(report.contains("margin"));
    }

    #[test]
    fn discount_report_combines_components() {
        let store = DemoStore::seeded();
        let report = discount_report(&store, "Gold", 55);
        assert!(report.contains("3%"));
        assert!(report.contains("10%"));
        assert!(report.contains("13% total"));
    }

    #[test]
    fn non_positive_price_is_rejected() {
        let store = DemoStore::seeded();
        let report = price_change_report(&store, "Team Shorts", 0);
        assert!(report.contains("Refusing"));
        assert!(price_report(&store, "Team Shorts").contains("$49.99"));
    }
}
