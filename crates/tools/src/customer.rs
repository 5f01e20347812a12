//! Customer tool functions: account lookup, tier listings, and order history.

use std::fmt::Write as _;

use crate::store::{format_dollars, CustomerRecord, DemoStore};

fn account_block(customer: &CustomerRecord) -> String {
    format!(
        "{} ({}) is a {} tier account in the {} territory. Contact: {} <{}>. {} lifetime orders totalling {}.",
        customer.name,
        customer.id,
        customer.tier,
        customer.territory,
        customer.contact,
        customer.email,
        customer.total_orders,
        format_dollars(customer.lifetime_value_cents),
    )
}

pub fn lookup_report(store: &DemoStore, name: &str) -> String {
    match store.customer_by_name(name) {
        Some(customer) => account_block(&customer),
        None => format!("No customer account matching \"{name}\" was found."),
    }
}

pub fn search_report(store: &DemoStore, query: &str) -> String {
    let matches = store.search_customers(query);
    if matches.is_empty() {
        return format!("No customer accounts match \"{query}\".");
    }
    let mut report = format!("{} account(s) match \"{query}\":\n", matches.len());
    for customer in &matches {
        let _ = writeln!(
            report,
            "- {} [{}]: {} tier, {} territory",
            customer.name, customer.id, customer.tier, customer.territory
        );
    }
    report.trim_end().to_string()
}

pub fn tier_report(store: &DemoStore, tier: &str) -> String {
    let accounts = store.customers_by_tier(tier);
    if accounts.is_empty() {
        return format!("No accounts in the {tier} tier.");
    }
    let mut report = format!("{} account(s) in the {} tier:\n", accounts.len(), tier);
    for customer in &accounts {
        let _ = writeln!(
            report,
            "- {}: {} lifetime value over {} orders",
            customer.name,
            format_dollars(customer.lifetime_value_cents),
            customer.total_orders,
        );
    }
    report.trim_end().to_string()
}

pub fn history_report(store: &DemoStore, name: &str) -> String {
    let Some(customer) = store.customer_by_name(name) else {
        return format!("No customer account matching \"{name}\" was found.");
    };
    let orders = store.orders_for(&customer.name);
    if orders.is_empty() {
        return format!("{} has no recent orders on file.", customer.name);
    }
    let mut report = format!("Recent orders for {}:\n", customer.name);
    for order in &orders {
        let _ = writeln!(
            report,
            "- {} on {}: {} ({})",
            order.id,
            order.order_date,
            format_dollars(order.total_cents),
            order.status,
        );
    }
    report.trim_end().to_string()
}

pub fn summary_report(store: &DemoStore) -> String {
    let customers = store.customers();
    let lifetime: i64 = customers.iter().map(|customer| customer.lifetime_value_cents).sum();
    let platinum = customers.iter().filter(|customer| customer.tier == "Platinum").count();
    format!(
        "Customer base: {} accounts ({} Platinum) with {} combined lifetime value.",
        customers.len(),
        platinum,
        format_dollars(lifetime),
    )
}

#[cfg(test)]
mod tests {
    use super::{history_report, lookup_report, tier_report};
    use crate::store::DemoStore;

    #[test]
    fn lookup_report_includes_tier_and_contact() {
        let store = DemoStore::seeded();
        let report = lookup_report(&store, "state university");
        assert!(report.contains("Platinum"));
        assert!(report.contains("Coach Williams"));
    }

    #[test]
    fn tier_report_is_value_ordered() {
        let store = DemoStore::seeded();
        let report = tier_report(&store, "Platinum");
        let metro = report.find("Metro High School District").expect("metro listed");
        let state = report.find("State University Athletics").expect("state listed");
        assert!(metro < state);
    }

    #[test]
    fn history_report_lists_orders() {
        let store = DemoStore::seeded();
        let report = history_report(&store, "Eastside");
        assert!(report.contains("ORD-2024-005"));
        assert!(report.contains("delivered"));
    }
}
