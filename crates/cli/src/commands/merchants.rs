use kirana_core::{MerchantProfile, MerchantRegistry};

pub fn run() -> String {
    let registry = MerchantRegistry::with_fixtures();
    render(&registry)
}

fn render(registry: &MerchantRegistry) -> String {
    let mut sections = Vec::new();
    sections.push(format!("{} demo merchants", registry.len()));

    for merchant in registry.iter() {
        sections.push(render_merchant(merchant));
    }

    sections.join("\n\n")
}

/// One merchant block, shared with the chat REPL's `:catalog` directive.
pub(crate) fn render_merchant(merchant: &MerchantProfile) -> String {
    let mut lines = Vec::new();
    lines.push(format!("{} {} ({})", merchant.emoji, merchant.name, merchant.id));
    lines.push(format!("  {}", describe_hours(merchant)));
    for item in &merchant.catalog {
        let badge = if item.is_available { "" } else { " [out of stock]" };
        lines.push(format!(
            "  - {} ₹{}{} · {}",
            item.name, item.price_inr, badge, item.description
        ));
    }
    lines.push(format!("  Min order ₹{}", merchant.min_order_inr));
    lines.join("\n")
}

fn describe_hours(merchant: &MerchantProfile) -> String {
    let hours = &merchant.operating_hours;
    let days = hours.days.iter().map(|day| day.as_str()).collect::<Vec<_>>().join(" ");
    let cutoff = match &hours.order_cutoff {
        Some(cutoff) => format!(" · same-day orders until {cutoff}"),
        None => String::new(),
    };
    format!(
        "{} · {}–{} ({days}){cutoff}",
        merchant.delivery_area, hours.open_time, hours.close_time
    )
}
