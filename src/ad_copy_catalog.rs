//! The ad-copy catalog.
//!
//! The free functions are pure transformations over record slices; the
//! [`AdCopyCatalog`] handle reads the persisted catalog entry, applies them
//! and writes the result back. A missing or malformed catalog entry reads
//! as an empty catalog; a single malformed record inside a readable entry
//! is skipped and the rest of the catalog survives.

use std::rc::Rc;

use log::{debug, info, warn};
use serde_json::Value;

use crate::ad_copy_model::{AdCopyRecord, ProductData, RemovalReport};
use crate::app_response::AppResponse;
use crate::country::{
    normalize_country_code, split_country_suffix, split_known_country_suffix, CountryConfig,
    CountryDirectory,
};
use crate::local_db_state::{read_json, write_json, KeyValueStore};
use crate::site_config::SiteConfig;
use crate::url_rules::resolve_url;

/// Inserts `record`, replacing in place any record with the same id.
pub fn upsert(records: &mut Vec<AdCopyRecord>, record: AdCopyRecord) {
    match records.iter_mut().find(|existing| existing.id == record.id) {
        Some(existing) => *existing = record,
        None => records.push(record),
    }
}

/// Collapses duplicate ids, keeping the first position and the last value.
pub fn dedupe_by_id(records: Vec<AdCopyRecord>) -> Vec<AdCopyRecord> {
    let mut unique = Vec::with_capacity(records.len());
    for record in records {
        upsert(&mut unique, record);
    }
    unique
}

/// Product page for `product_name`, or the site root when no rule matches.
pub fn resolve_product_url(product_name: &str, config: &SiteConfig) -> String {
    resolve_url(&config.url_rules, product_name)
        .unwrap_or(config.site_root.as_str())
        .to_string()
}

/// Backfills one record. Only `display_name` and an empty `product_url`
/// change; both derive from `id` and `product_name` alone, so the result is
/// a fixed point.
pub fn repair_record(record: &AdCopyRecord, config: &SiteConfig) -> AdCopyRecord {
    let mut repaired = record.clone();

    if repaired.product_url.trim().is_empty() {
        repaired.product_url = resolve_product_url(&repaired.product_name, config);
        debug!("Resolved URL for '{}' to {}", repaired.id, repaired.product_url);
    }

    let (base, _) = split_country_suffix(&repaired.id);
    let display = config
        .legacy_display_name(base)
        .unwrap_or(repaired.product_name.as_str())
        .to_string();
    repaired.display_name = Some(display);

    repaired
}

pub fn repair_display_and_url(records: &[AdCopyRecord], config: &SiteConfig) -> Vec<AdCopyRecord> {
    records
        .iter()
        .map(|record| repair_record(record, config))
        .collect()
}

/// Drops every record whose `id` or `product_name` contains one of `terms`
/// (case-sensitive). Empty terms are ignored; with no usable term nothing
/// is removed.
pub fn remove_matching<S: AsRef<str>>(records: &[AdCopyRecord], terms: &[S]) -> RemovalReport {
    let terms: Vec<&str> = terms
        .iter()
        .map(|term| term.as_ref())
        .filter(|term| !term.is_empty())
        .collect();

    if terms.is_empty() {
        return RemovalReport {
            kept: records.to_vec(),
            removed_count: 0,
        };
    }

    let (removed, kept): (Vec<&AdCopyRecord>, Vec<&AdCopyRecord>) =
        records.iter().partition(|record| {
            terms
                .iter()
                .any(|term| record.id.contains(*term) || record.product_name.contains(*term))
        });

    RemovalReport {
        kept: kept.into_iter().cloned().collect(),
        removed_count: removed.len(),
    }
}

/// Records for `country_code`: its country-specific records plus every
/// locale-agnostic one, in catalog order. No precedence is applied, see
/// [`prefer_country_specific`].
///
/// A suffix only marks a record as country-specific when `countries` knows
/// the code, so `planter-xl` stays locale-agnostic.
pub fn filter_by_country(
    records: &[AdCopyRecord],
    country_code: &str,
    countries: &dyn CountryDirectory,
) -> Vec<AdCopyRecord> {
    let wanted = country_code.trim();
    records
        .iter()
        .filter(|record| match split_known_country_suffix(&record.id, countries) {
            (_, Some(code)) => code.eq_ignore_ascii_case(wanted),
            (_, None) => true,
        })
        .cloned()
        .collect()
}

/// Like [`filter_by_country`], but drops a locale-agnostic record when a
/// country-specific variant of the same base slug is present.
pub fn prefer_country_specific(
    records: &[AdCopyRecord],
    country_code: &str,
    countries: &dyn CountryDirectory,
) -> Vec<AdCopyRecord> {
    let matching = filter_by_country(records, country_code, countries);
    let localized: Vec<String> = matching
        .iter()
        .filter_map(|record| match split_known_country_suffix(&record.id, countries) {
            (base, Some(_)) => Some(base.to_string()),
            (_, None) => None,
        })
        .collect();

    matching
        .into_iter()
        .filter(|record| {
            let (base, code) = split_known_country_suffix(&record.id, countries);
            code.is_some() || !localized.iter().any(|slug| slug == base)
        })
        .collect()
}

fn validate_input(product: &ProductData, base_slug: &str) -> Result<(), AppResponse> {
    if product.name.trim().is_empty() {
        return Err(AppResponse::ValidationError(
            "Product data requires a name".to_string(),
        ));
    }
    if base_slug.trim().is_empty() {
        return Err(AppResponse::ValidationError(
            "Base slug cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn build_headline(product: &ProductData, price: Option<String>) -> String {
    let mut parts = vec![product.name.trim().to_string()];
    if let Some(feature) = product.features.iter().find(|f| !f.trim().is_empty()) {
        parts.push(feature.trim().to_string());
    }
    if let Some(price) = price.filter(|p| !p.is_empty()) {
        parts.push(price);
    }
    parts.join(" | ")
}

fn build_record(
    product: &ProductData,
    id: String,
    language: &str,
    country: Option<&CountryConfig>,
    config: &SiteConfig,
) -> AdCopyRecord {
    let price = product.price.as_deref().map(|raw| match country {
        Some(country) => country.format_price(raw),
        None => raw.trim().to_string(),
    });

    let product_url = match product.url.as_deref().map(str::trim) {
        Some(url) if !url.is_empty() => url.to_string(),
        _ => resolve_product_url(&product.name, config),
    };

    AdCopyRecord {
        id,
        product_name: product.name.trim().to_string(),
        display_name: None,
        product_url,
        headline: build_headline(product, price),
        product_image: product.images.first().cloned().unwrap_or_default(),
        original_language: language.to_string(),
    }
}

/// Store-backed catalog handle.
pub struct AdCopyCatalog {
    store: Rc<dyn KeyValueStore>,
    config: Rc<SiteConfig>,
    countries: Rc<dyn CountryDirectory>,
}

impl AdCopyCatalog {
    pub fn new(
        store: Rc<dyn KeyValueStore>,
        config: Rc<SiteConfig>,
        countries: Rc<dyn CountryDirectory>,
    ) -> Self {
        Self {
            store,
            config,
            countries,
        }
    }

    /// Every record, in stored order. Never fails: an unreadable entry
    /// reads as an empty catalog and records that do not decode are skipped.
    pub fn all(&self) -> Vec<AdCopyRecord> {
        let raw: Vec<Value> =
            read_json(self.store.as_ref(), &self.config.catalog_key).unwrap_or_default();
        let records = raw
            .into_iter()
            .enumerate()
            .filter_map(|(index, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping malformed ad copy at index {}: {}", index, e);
                    None
                }
            })
            .collect();
        dedupe_by_id(records)
    }

    pub fn get(&self, id: &str) -> Option<AdCopyRecord> {
        self.all().into_iter().find(|record| record.id == id)
    }

    fn save(&self, records: &[AdCopyRecord]) -> Result<(), AppResponse> {
        write_json(self.store.as_ref(), &self.config.catalog_key, records)
    }

    /// Builds the default-locale record `id = base_slug` and stores it,
    /// replacing any record with the same id.
    pub fn generate_for_product(
        &self,
        product: &ProductData,
        base_slug: &str,
    ) -> Result<AdCopyRecord, AppResponse> {
        validate_input(product, base_slug)?;

        let default_country = self.countries.lookup(&self.config.default_country);
        let record = build_record(
            product,
            base_slug.trim().to_string(),
            &self.config.default_language,
            default_country.as_ref(),
            &self.config,
        );

        let mut records = self.all();
        upsert(&mut records, record.clone());
        self.save(&records)?;

        info!("Generated ad copy '{}'", record.id);
        Ok(record)
    }

    /// Builds one `<base_slug>-<cc>` record per distinct country and stores
    /// them. Every code is validated and looked up before anything is
    /// written.
    pub fn generate_country_specific<S: AsRef<str>>(
        &self,
        product: &ProductData,
        base_slug: &str,
        country_codes: &[S],
    ) -> Result<Vec<AdCopyRecord>, AppResponse> {
        validate_input(product, base_slug)?;
        if country_codes.is_empty() {
            return Err(AppResponse::ValidationError(
                "At least one country code is required".to_string(),
            ));
        }

        let mut generated = Vec::with_capacity(country_codes.len());
        for raw in country_codes {
            let code = normalize_country_code(raw.as_ref())?;
            let country = self
                .countries
                .lookup(&code)
                .ok_or_else(|| AppResponse::NotFound(format!("Unknown country: '{code}'")))?;

            let id = format!("{}-{}", base_slug.trim(), code);
            let record = build_record(product, id, &country.language, Some(&country), &self.config);
            upsert(&mut generated, record);
        }

        let mut records = self.all();
        for record in &generated {
            upsert(&mut records, record.clone());
        }
        self.save(&records)?;

        info!(
            "Generated {} country-specific ad copies for '{}'",
            generated.len(),
            base_slug.trim()
        );
        Ok(generated)
    }

    /// Repairs the stored catalog and writes it back.
    pub fn repair(&self) -> Result<Vec<AdCopyRecord>, AppResponse> {
        let records = self.all();
        if records.is_empty() {
            return Ok(records);
        }
        let repaired = repair_display_and_url(&records, &self.config);
        self.save(&repaired)?;
        info!("Repaired {} ad copies", repaired.len());
        Ok(repaired)
    }

    /// Removes matching records from the stored catalog. The entry is only
    /// rewritten when something was removed.
    pub fn remove_matching<S: AsRef<str>>(
        &self,
        terms: &[S],
    ) -> Result<RemovalReport, AppResponse> {
        let report = remove_matching(&self.all(), terms);
        if report.removed_count > 0 {
            self.save(&report.kept)?;
        }
        info!(
            "Cleanup removed {} ad copies, {} kept",
            report.removed_count,
            report.kept.len()
        );
        Ok(report)
    }

    pub fn for_country(&self, country_code: &str) -> Vec<AdCopyRecord> {
        filter_by_country(&self.all(), country_code, self.countries.as_ref())
    }

    pub fn clear(&self) -> Result<(), AppResponse> {
        self.store.remove_item(&self.config.catalog_key)?;
        info!("Cleared ad-copy catalog");
        Ok(())
    }
}
