//! Sales tool functions: order pipeline status and quotes that combine
//! product pricing with customer tier and volume discounts.

use std::fmt::Write as _;

use crate::store::{format_dollars, DemoStore};

pub fn orders_report(store: &DemoStore) -> String {
    let orders = store.recent_orders();
    if orders.is_empty() {
        return "There are no orders in the pipeline.".to_string();
    }
    let pipeline: i64 = orders.iter().map(|order| order.total_cents).sum();
    let mut report = format!(
        "{} order(s) in the pipeline worth {}:\n",
        orders.len(),
        format_dollars(pipeline),
    );
    for order in &orders {
        let _ = writeln!(
            report,
            "- {} for {}: {} ({})",
            order.id,
            order.customer,
            format_dollars(order.total_cents),
            order.status,
        );
    }
    report.trim_end().to_string()
}

pub fn order_status_report(store: &DemoStore, customer_name: &str) -> String {
    let orders = store.orders_for(customer_name);
    if orders.is_empty() {
        return format!("No orders on file for \"{customer_name}\".");
    }
    let mut report = format!("Order status for \"{customer_name}\":\n");
    for order in &orders {
        let _ = writeln!(
            report,
            "- {} placed {}: {}, {}",
            order.id,
            order.order_date,
            format_dollars(order.total_cents),
            order.status,
        );
    }
    report.trim_end().to_string()
}

/// Quote for one product at a quantity, with the customer's tier discount
/// applied when the account is known.
pub fn quote_report(
    store: &DemoStore,
    product_name: &str,
    customer_name: Option<&str>,
    quantity: i64,
) -> String {
    let Some(product) = store.product_by_name(product_name) else {
        return format!("Cannot quote \"{product_name}\": no such product.");
    };
    let quantity = quantity.max(1);
    let customer = customer_name.and_then(|name| store.customer_by_name(name));
    let tier = customer.as_ref().map(|account| account.tier.as_str()).unwrap_or("Bronze");
    let breakdown = store.discount_for(tier, quantity);

    let list_total = product.price_cents.saturating_mul(quantity);
    let discounted =
        list_total.saturating_mul(i64::from(100 - breakdown.total_discount_pct)) / 100;

    let mut report = format!(
        "Quote: {} x {} at {} each = {} list.",
        quantity,
        product.name,
        format_dollars(product.price_cents),
        format_dollars(list_total),
    );
    if breakdown.total_discount_pct > 0 {
        let _ = write!(
            report,
            " With a {}% discount ({}% tier + {}% volume) the total is {}.",
            breakdown.total_discount_pct,
            breakdown.tier_discount_pct,
            breakdown.volume_discount_pct,
            format_dollars(discounted),
        );
    } else {
        let _ = write!(report, " No discount applies at this tier and quantity.");
    }
    if let Some(account) = customer {
        let _ = write!(report, " Prepared for {} ({} tier).", account.name, account.tier);
    }
    report
}

pub fn summary_report(store: &DemoStore) -> String {
    let orders = store.recent_orders();
    let pipeline: i64 = orders.iter().map(|order| order.total_cents).sum();
    let open = orders
        .iter()
        .filter(|order| order.status == "pending" || order.status == "processing")
        .count();
    format!(
        "Sales pipeline: {} order(s) worth {}, {} still open.",
        orders.len(),
        format_dollars(pipeline),
        open,
    )
}
