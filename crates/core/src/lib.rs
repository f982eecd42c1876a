pub mod config;
pub mod merchant;
pub mod registry;

pub use merchant::{CatalogItem, MerchantProfile, OperatingHours, Weekday};
pub use registry::MerchantRegistry;
