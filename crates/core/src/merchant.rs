use serde::Serialize;

/// Weekdays on which a merchant accepts orders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum Weekday {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl Weekday {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mon => "Mon",
            Self::Tue => "Tue",
            Self::Wed => "Wed",
            Self::Thu => "Thu",
            Self::Fri => "Fri",
            Self::Sat => "Sat",
            Self::Sun => "Sun",
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct OperatingHours {
    /// "HH:MM", local merchant time.
    pub open_time: String,
    pub close_time: String,
    /// Last order accepted for same-day fulfilment. `None` means no cutoff.
    pub order_cutoff: Option<String>,
    pub days: Vec<Weekday>,
}

#[derive(Clone, Debug, Serialize)]
pub struct CatalogItem {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Whole rupees. Catalog prices never carry paise.
    pub price_inr: u32,
    pub image_url: Option<String>,
    pub category: String,
    pub is_available: bool,
}

/// Immutable merchant record as loaded by the registry.
#[derive(Clone, Debug, Serialize)]
pub struct MerchantProfile {
    pub id: String,
    pub name: String,
    /// Display marker for the demo client only.
    pub emoji: String,
    pub phone: String,
    pub delivery_area: String,
    pub min_order_inr: u32,
    pub commission_pct: f64,
    pub operating_hours: OperatingHours,
    pub catalog: Vec<CatalogItem>,
}

impl MerchantProfile {
    /// Context string injected into every outbound agent message.
    ///
    /// Recomputed on each call so it always reflects current item
    /// availability; only `is_available` items are listed.
    pub fn catalog_summary(&self) -> String {
        let items = self
            .catalog
            .iter()
            .filter(|item| item.is_available)
            .map(|item| format!("{} (₹{})", item.name, item.price_inr))
            .collect::<Vec<_>>()
            .join(", ");

        format!(
            "{}. Items: {}. Min order ₹{}. Delivery: {}. Hours: {}–{}.",
            self.name,
            items,
            self.min_order_inr,
            self.delivery_area,
            self.operating_hours.open_time,
            self.operating_hours.close_time
        )
    }
}
