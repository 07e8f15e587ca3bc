//! Site configuration.
//!
//! Every field has a default, so a host only needs to pass the values it
//! wants to override, e.g. `{"siteRoot": "https://shop.example/"}`.

use serde::{Deserialize, Serialize};

use crate::app_response::AppResponse;
use crate::country::{normalize_country_code, CountryConfig};
use crate::url_rules::{default_rules, UrlRule};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyDisplayName {
    /// Base slug of the legacy product, without country suffix.
    pub slug: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub catalog_key: String,
    pub country_key: String,
    pub links_key: String,

    /// Where product links point when nothing better is known.
    pub site_root: String,

    pub default_country: String,
    pub default_language: String,

    /// Redirect target when the link table has no entry for the country.
    pub default_fallback: String,

    pub url_rules: Vec<UrlRule>,
    pub legacy_display_names: Vec<LegacyDisplayName>,

    /// Replaces the built-in country table when non-empty.
    pub countries: Vec<CountryConfig>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            catalog_key: "fb_ad_copies".to_string(),
            country_key: "selected_country".to_string(),
            links_key: "global_links".to_string(),
            site_root: "/".to_string(),
            default_country: "us".to_string(),
            default_language: "en".to_string(),
            default_fallback: "/".to_string(),
            url_rules: default_rules(),
            legacy_display_names: vec![
                LegacyDisplayName {
                    slug: "keter-store-it-out".to_string(),
                    display_name: "Keter Store-It-Out Max Outdoor Storage Shed".to_string(),
                },
                LegacyDisplayName {
                    slug: "eden-bench".to_string(),
                    display_name: "Keter Eden Storage Bench".to_string(),
                },
            ],
            countries: Vec::new(),
        }
    }
}

impl SiteConfig {
    /// Parses an override document; blank input yields the defaults.
    pub fn from_json(json: &str) -> Result<Self, AppResponse> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: SiteConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AppResponse> {
        for (field, key) in [
            ("catalogKey", &self.catalog_key),
            ("countryKey", &self.country_key),
            ("linksKey", &self.links_key),
        ] {
            if key.trim().is_empty() {
                return Err(AppResponse::ValidationError(format!(
                    "{field} cannot be empty"
                )));
            }
        }
        if self.site_root.trim().is_empty() {
            return Err(AppResponse::ValidationError(
                "siteRoot cannot be empty".to_string(),
            ));
        }
        normalize_country_code(&self.default_country)?;
        Ok(())
    }

    /// Curated display name for a legacy product's base slug.
    pub fn legacy_display_name(&self, base_slug: &str) -> Option<&str> {
        self.legacy_display_names
            .iter()
            .find(|legacy| legacy.slug == base_slug)
            .map(|legacy| legacy.display_name.as_str())
    }
}
