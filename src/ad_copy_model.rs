//! Data shapes persisted in the local store or received from the host.

use serde::{Deserialize, Serialize};

/// A unit of ad copy tied to a product and, optionally, a target country.
///
/// `id` is `<productSlug>` or `<productSlug>-<cc>`; see
/// [`crate::country::split_country_suffix`] for how the suffix is read.
/// Only `id` and `productName` are required in persisted JSON; every other
/// field defaults to empty so that older entries still load and can be
/// repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdCopyRecord {
    pub id: String,

    pub product_name: String,

    /// Localized or corrected title. Consumers fall back to `product_name`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default)]
    pub product_url: String,

    #[serde(default)]
    pub headline: String,

    #[serde(default)]
    pub product_image: String,

    #[serde(default)]
    pub original_language: String,
}

impl AdCopyRecord {
    /// The title to show: the display override when set, else the product name.
    pub fn display_title(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.product_name,
        }
    }
}

/// Product description handed to the generators.
///
/// Only `name` is checked; the rest is content the generators copy into
/// the record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub name: String,

    #[serde(default)]
    pub features: Vec<String>,

    #[serde(default)]
    pub images: Vec<String>,

    /// Price as typed in the source material, e.g. `"49.99"`.
    #[serde(default)]
    pub price: Option<String>,

    #[serde(default)]
    pub url: Option<String>,
}

/// One country -> redirect URL association of the link table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryLink {
    pub country_code: String,
    pub url: String,
}

impl CountryLink {
    pub fn new(country_code: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            country_code: country_code.into(),
            url: url.into(),
        }
    }
}

/// Outcome of a cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemovalReport {
    pub kept: Vec<AdCopyRecord>,
    pub removed_count: usize,
}
