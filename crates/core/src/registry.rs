use std::collections::BTreeMap;

use crate::merchant::{CatalogItem, MerchantProfile, OperatingHours, Weekday};

/// Read-only merchant directory, loaded once at process start.
///
/// Backed by static fixture data. A deployed system would hydrate this from
/// a datastore instead; nothing else in the workspace may mutate it.
pub struct MerchantRegistry {
    merchants: BTreeMap<String, MerchantProfile>,
}

impl MerchantRegistry {
    /// Registry seeded with the canonical demo merchants.
    pub fn with_fixtures() -> Self {
        Self::from_profiles(fixture_merchants())
    }

    pub fn from_profiles(profiles: Vec<MerchantProfile>) -> Self {
        let merchants =
            profiles.into_iter().map(|profile| (profile.id.clone(), profile)).collect();
        Self { merchants }
    }

    pub fn get(&self, merchant_id: &str) -> Option<&MerchantProfile> {
        self.merchants.get(merchant_id)
    }

    /// Profiles in stable id order, for operator-facing listings.
    pub fn iter(&self) -> impl Iterator<Item = &MerchantProfile> {
        self.merchants.values()
    }

    pub fn len(&self) -> usize {
        self.merchants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.merchants.is_empty()
    }
}

impl Default for MerchantRegistry {
    fn default() -> Self {
        Self::with_fixtures()
    }
}

fn fixture_merchants() -> Vec<MerchantProfile> {
    vec![
        MerchantProfile {
            id: "merchant_001".to_string(),
            name: "Amit's Cake Shop".to_string(),
            emoji: "🎂".to_string(),
            phone: "+911234567890".to_string(),
            delivery_area: "Pune".to_string(),
            min_order_inr: 300,
            commission_pct: 10.0,
            operating_hours: OperatingHours {
                open_time: "09:00".to_string(),
                close_time: "21:00".to_string(),
                order_cutoff: Some("18:00".to_string()),
                days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                    Weekday::Sun,
                ],
            },
            catalog: vec![
                CatalogItem {
                    id: "cake_choc_001".to_string(),
                    name: "Chocolate Cake".to_string(),
                    description: "Rich dark chocolate sponge with ganache frosting".to_string(),
                    price_inr: 500,
                    image_url: None,
                    category: "cake".to_string(),
                    is_available: true,
                },
                CatalogItem {
                    id: "cake_van_001".to_string(),
                    name: "Vanilla Cake".to_string(),
                    description: "Classic vanilla sponge with butter cream".to_string(),
                    price_inr: 400,
                    image_url: None,
                    category: "cake".to_string(),
                    is_available: true,
                },
                CatalogItem {
                    id: "cake_rv_001".to_string(),
                    name: "Red Velvet Cake".to_string(),
                    description: "Velvety red sponge with cream cheese frosting".to_string(),
                    price_inr: 600,
                    image_url: None,
                    category: "cake".to_string(),
                    is_available: true,
                },
            ],
        },
        MerchantProfile {
            id: "merchant_002".to_string(),
            name: "Priya's Thali House".to_string(),
            emoji: "🍱".to_string(),
            phone: "+919876500001".to_string(),
            delivery_area: "Local delivery".to_string(),
            min_order_inr: 240,
            commission_pct: 10.0,
            operating_hours: OperatingHours {
                open_time: "11:00".to_string(),
                close_time: "15:00".to_string(),
                order_cutoff: None,
                days: vec![
                    Weekday::Mon,
                    Weekday::Tue,
                    Weekday::Wed,
                    Weekday::Thu,
                    Weekday::Fri,
                    Weekday::Sat,
                ],
            },
            catalog: vec![
                CatalogItem {
                    id: "thali_veg_001".to_string(),
                    name: "Veg Thali".to_string(),
                    description: "Seasonal sabzi, dal, roti, rice, salad & pickle".to_string(),
                    price_inr: 120,
                    image_url: None,
                    category: "thali".to_string(),
                    is_available: true,
                },
                CatalogItem {
                    id: "thali_nveg_001".to_string(),
                    name: "Non-veg Thali".to_string(),
                    description: "Chicken curry, dal, roti, rice, salad & pickle".to_string(),
                    price_inr: 150,
                    image_url: None,
                    category: "thali".to_string(),
                    is_available: true,
                },
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use crate::registry::MerchantRegistry;

    #[test]
    fn known_merchants_resolve_to_fixture_profiles() {
        let registry = MerchantRegistry::with_fixtures();

        let cake_shop = registry.get("merchant_001").expect("merchant_001 should exist");
        assert_eq!(cake_shop.name, "Amit's Cake Shop");
        assert_eq!(cake_shop.delivery_area, "Pune");
        assert_eq!(cake_shop.min_order_inr, 300);
        assert_eq!(cake_shop.catalog.len(), 3);
        assert_eq!(cake_shop.catalog[0].name, "Chocolate Cake");
        assert_eq!(cake_shop.catalog[0].price_inr, 500);

        let thali_house = registry.get("merchant_002").expect("merchant_002 should exist");
        assert_eq!(thali_house.name, "Priya's Thali House");
        assert_eq!(thali_house.catalog.len(), 2);
        assert!(thali_house.operating_hours.order_cutoff.is_none());
    }

    #[test]
    fn unknown_merchant_resolves_to_none() {
        let registry = MerchantRegistry::with_fixtures();
        assert!(registry.get("ghost_merchant").is_none());
        assert!(registry.get("").is_none());
    }

    #[test]
    fn iteration_is_in_stable_id_order() {
        let registry = MerchantRegistry::with_fixtures();
        let ids: Vec<&str> = registry.iter().map(|profile| profile.id.as_str()).collect();
        assert_eq!(ids, vec!["merchant_001", "merchant_002"]);
        assert_eq!(registry.len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn fixture_summary_matches_catalog_contents() {
        let registry = MerchantRegistry::with_fixtures();
        let summary = registry.get("merchant_001").expect("merchant_001").catalog_summary();

        assert_eq!(
            summary,
            "Amit's Cake Shop. Items: Chocolate Cake (₹500), Vanilla Cake (₹400), \
             Red Velvet Cake (₹600). Min order ₹300. Delivery: Pune. Hours: 09:00–21:00."
        );
    }
}
