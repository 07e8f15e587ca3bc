//! # Ad-Copy Core
//!
//! Client-side state of a storefront marketing site: the catalog of
//! Facebook ad copy kept in local storage, and the currently selected
//! country with its outbound redirect links.
//!
//! ## Features
//!
//! - **Ad-copy catalog**: generation per product or per country, idempotent
//!   repair of product URLs and display names, cleanup by term, and
//!   country-filtered retrieval
//! - **Redirect broadcaster**: one current country snapshot with
//!   replay-on-subscribe notification and isolated observers
//! - **LMDB-backed storage**: the same persisted entries survive restarts of
//!   the host application
//! - **FFI-friendly**: every operation is reachable over a C ABI that speaks
//!   JSON, so a UI written in any language can drive it
//!
//! ## Quick Start
//!
//! ```no_run
//! use adcopy_core::ad_copy_model::ProductData;
//! use adcopy_core::site_config::SiteConfig;
//! use adcopy_core::site_context::SiteContext;
//!
//! let site = SiteContext::open("storefront", SiteConfig::default())?;
//!
//! let product = ProductData {
//!     name: "Keter Eden Storage Bench".to_string(),
//!     price: Some("129.99".to_string()),
//!     ..ProductData::default()
//! };
//! site.catalog.generate_country_specific(&product, "eden-bench", &["fr", "de"])?;
//!
//! let _subscription = site.redirects.subscribe(|state| {
//!     println!("redirecting to {}", state.resolved_url());
//! });
//! site.redirects.set_country("fr")?;
//! # Ok::<(), adcopy_core::app_response::AppResponse>(())
//! ```
//!
//! ## FFI Functions
//!
//! Every function returns a JSON-serialized [`AppResponse`] that must be
//! released with [`free_response`]:
//!
//! - [`create_context`] / [`create_memory_context`] - Build a site context
//! - [`close_context`] - Release a context
//! - [`generate_for_product`] / [`generate_country_specific`] - Create ad copy
//! - [`repair_catalog`] - Backfill URLs and display names
//! - [`remove_matching`] - Cleanup by term
//! - [`get_catalog`] / [`filter_by_country`] - Read ad copy
//! - [`get_redirect_state`] / [`set_country`] / [`store_links`] - Redirects
//! - [`subscribe_redirects`] / [`unsubscribe_redirects`] - Observers

pub mod ad_copy_catalog;
pub mod ad_copy_model;
pub mod app_response;
pub mod country;
pub mod local_db_state;
pub mod redirect_state;
pub mod service_model;
pub mod site_config;
pub mod site_context;
pub mod translations;
pub mod url_rules;

use std::cell::RefCell;
use std::collections::HashMap;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;

use log::{info, warn};
use serde::Serialize;

use crate::ad_copy_model::{CountryLink, ProductData};
use crate::app_response::AppResponse;
use crate::redirect_state::Subscription;
use crate::site_config::SiteConfig;
use crate::site_context::SiteContext;

/// Callback receiving a JSON-serialized `RedirectState`. The string is only
/// valid for the duration of the call.
pub type RedirectCallback = extern "C" fn(*const c_char);

/// A [`SiteContext`] plus the subscriptions opened through the C ABI.
pub struct HostContext {
    pub site: SiteContext,
    subscriptions: RefCell<HashMap<u64, Subscription>>,
}

impl HostContext {
    pub fn new(site: SiteContext) -> Self {
        Self {
            site,
            subscriptions: RefCell::new(HashMap::new()),
        }
    }
}

/// Creates a context backed by the LMDB store `<name>.lmdb`.
///
/// `config_json` may be null or empty for the default configuration.
///
/// # Returns
///
/// A pointer to the context, or null if the name is invalid, the
/// configuration does not parse, or the store cannot be opened.
///
/// # Examples
///
/// ```no_run
/// use std::ffi::CString;
/// use adcopy_core::create_context;
///
/// let name = CString::new("storefront").unwrap();
/// let ctx = create_context(name.as_ptr(), std::ptr::null());
/// assert!(!ctx.is_null());
/// ```
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_context(
    name: *const c_char,
    config_json: *const c_char,
) -> *mut HostContext {
    let name_str = match c_ptr_to_str(name) {
        Some(s) => s,
        None => {
            warn!("Invalid name pointer passed to create_context");
            return std::ptr::null_mut();
        }
    };

    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration: {}", e);
            return std::ptr::null_mut();
        }
    };

    match SiteContext::open(name_str, config) {
        Ok(site) => {
            info!("✅ Context created for '{}'", name_str);
            Box::into_raw(Box::new(HostContext::new(site)))
        }
        Err(e) => {
            warn!("❌ Failed to create context: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Creates a context whose entries live only in memory.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn create_memory_context(config_json: *const c_char) -> *mut HostContext {
    let config = match parse_config(config_json) {
        Ok(config) => config,
        Err(e) => {
            warn!("Invalid configuration: {}", e);
            return std::ptr::null_mut();
        }
    };

    match SiteContext::in_memory(config) {
        Ok(site) => Box::into_raw(Box::new(HostContext::new(site))),
        Err(e) => {
            warn!("❌ Failed to create memory context: {}", e);
            std::ptr::null_mut()
        }
    }
}

/// Releases a context. The pointer must not be used afterwards.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn close_context(ctx: *mut HostContext) -> *const c_char {
    if ctx.is_null() {
        let error =
            AppResponse::BadRequest("Null context pointer passed to close_context".to_string());
        return response_to_c_string(&error);
    }

    let host = unsafe { Box::from_raw(ctx) };
    for subscription in host.subscriptions.borrow().values() {
        subscription.unsubscribe();
    }
    drop(host);

    response_to_c_string(&AppResponse::success("Context closed successfully"))
}

/// Frees a string returned by any function of this library.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn free_response(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        drop(CString::from_raw(ptr as *mut c_char));
    }
}

/// Generates and stores the default-locale ad copy for a product.
///
/// # JSON Format
///
/// ```json
/// {
///   "name": "Keter Eden Storage Bench",
///   "features": ["Seats two adults"],
///   "images": ["https://cdn.example/bench.jpg"],
///   "price": "129.99",
///   "url": "/products/eden-bench"
/// }
/// ```
///
/// Only `name` is required.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_for_product(
    ctx: *mut HostContext,
    product_json: *const c_char,
    base_slug: *const c_char,
) -> *const c_char {
    let host = match context_ref(ctx, "generate_for_product") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let product: ProductData = match json_arg(product_json, "product") {
        Ok(product) => product,
        Err(err) => return err,
    };
    let slug = match c_ptr_to_string(base_slug, "base slug") {
        Ok(slug) => slug,
        Err(err) => return err,
    };

    respond(host.site.catalog.generate_for_product(&product, &slug))
}

/// Generates and stores one ad copy per country.
///
/// `codes_json` is a JSON array of two-letter codes, e.g. `["fr","de"]`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn generate_country_specific(
    ctx: *mut HostContext,
    product_json: *const c_char,
    base_slug: *const c_char,
    codes_json: *const c_char,
) -> *const c_char {
    let host = match context_ref(ctx, "generate_country_specific") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let product: ProductData = match json_arg(product_json, "product") {
        Ok(product) => product,
        Err(err) => return err,
    };
    let slug = match c_ptr_to_string(base_slug, "base slug") {
        Ok(slug) => slug,
        Err(err) => return err,
    };
    let codes: Vec<String> = match json_arg(codes_json, "country codes") {
        Ok(codes) => codes,
        Err(err) => return err,
    };

    respond(host.site.catalog.generate_country_specific(&product, &slug, codes.as_slice()))
}

/// Repairs every stored record and returns the repaired catalog.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn repair_catalog(ctx: *mut HostContext) -> *const c_char {
    let host = match context_ref(ctx, "repair_catalog") {
        Ok(host) => host,
        Err(err) => return err,
    };
    respond(host.site.catalog.repair())
}

/// Removes records matching any of the terms in `terms_json` (a JSON array
/// of strings) and returns `{ "kept": [...], "removedCount": n }`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn remove_matching(
    ctx: *mut HostContext,
    terms_json: *const c_char,
) -> *const c_char {
    let host = match context_ref(ctx, "remove_matching") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let terms: Vec<String> = match json_arg(terms_json, "terms") {
        Ok(terms) => terms,
        Err(err) => return err,
    };
    respond(host.site.catalog.remove_matching(terms.as_slice()))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_catalog(ctx: *mut HostContext) -> *const c_char {
    let host = match context_ref(ctx, "get_catalog") {
        Ok(host) => host,
        Err(err) => return err,
    };
    respond(Ok(host.site.catalog.all()))
}

/// Records for a country: its own plus the locale-agnostic ones.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn filter_by_country(ctx: *mut HostContext, code: *const c_char) -> *const c_char {
    let host = match context_ref(ctx, "filter_by_country") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let code = match c_ptr_to_string(code, "country code") {
        Ok(code) => code,
        Err(err) => return err,
    };
    respond(Ok(host.site.catalog.for_country(&code)))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn get_redirect_state(ctx: *mut HostContext) -> *const c_char {
    let host = match context_ref(ctx, "get_redirect_state") {
        Ok(host) => host,
        Err(err) => return err,
    };
    respond(Ok(host.site.redirects.get_current()))
}

/// Selects a country and notifies every subscriber.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn set_country(ctx: *mut HostContext, code: *const c_char) -> *const c_char {
    let host = match context_ref(ctx, "set_country") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let code = match c_ptr_to_string(code, "country code") {
        Ok(code) => code,
        Err(err) => return err,
    };
    respond(host.site.redirects.set_country(&code))
}

/// Persists a new link table, e.g.
/// `[{"countryCode":"fr","url":"https://fr.example"}]`.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn store_links(ctx: *mut HostContext, links_json: *const c_char) -> *const c_char {
    let host = match context_ref(ctx, "store_links") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let links: Vec<CountryLink> = match json_arg(links_json, "links") {
        Ok(links) => links,
        Err(err) => return err,
    };
    match host.site.redirects.store_links(&links) {
        Ok(()) => response_to_c_string(&AppResponse::success(format!(
            "Stored {} links",
            links.len()
        ))),
        Err(e) => response_to_c_string(&e),
    }
}

/// Registers `callback` for redirect state changes. It is called once
/// before this function returns. The `Ok` payload is the subscription id.
#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn subscribe_redirects(
    ctx: *mut HostContext,
    callback: Option<RedirectCallback>,
) -> *const c_char {
    let host = match context_ref(ctx, "subscribe_redirects") {
        Ok(host) => host,
        Err(err) => return err,
    };
    let callback = match callback {
        Some(callback) => callback,
        None => {
            let error =
                AppResponse::BadRequest("Null callback passed to subscribe_redirects".to_string());
            return response_to_c_string(&error);
        }
    };

    let subscription = host.site.redirects.subscribe(move |state| {
        let json = match serde_json::to_string(state) {
            Ok(json) => json,
            Err(e) => {
                warn!("Error serializing redirect state: {e}");
                return;
            }
        };
        match CString::new(json) {
            Ok(c_str) => callback(c_str.as_ptr()),
            Err(e) => warn!("Error creating CString: {e}"),
        }
    });

    let id = subscription.id();
    host.subscriptions.borrow_mut().insert(id, subscription);
    response_to_c_string(&AppResponse::Ok(id.to_string()))
}

#[no_mangle]
#[allow(clippy::not_unsafe_ptr_arg_deref)]
pub extern "C" fn unsubscribe_redirects(ctx: *mut HostContext, id: u64) -> *const c_char {
    let host = match context_ref(ctx, "unsubscribe_redirects") {
        Ok(host) => host,
        Err(err) => return err,
    };

    let removed = host.subscriptions.borrow_mut().remove(&id);
    match removed {
        Some(subscription) => {
            subscription.unsubscribe();
            response_to_c_string(&AppResponse::success("Unsubscribed"))
        }
        None => {
            let not_found = AppResponse::NotFound(format!("No subscription with id: {id}"));
            response_to_c_string(&not_found)
        }
    }
}

fn respond<T: Serialize>(result: Result<T, AppResponse>) -> *const c_char {
    match result {
        Ok(value) => response_to_c_string(&AppResponse::json(&value)),
        Err(e) => response_to_c_string(&e),
    }
}

fn parse_config(config_json: *const c_char) -> Result<SiteConfig, AppResponse> {
    if config_json.is_null() {
        return Ok(SiteConfig::default());
    }
    match unsafe { CStr::from_ptr(config_json).to_str() } {
        Ok(json) => SiteConfig::from_json(json),
        Err(e) => Err(AppResponse::BadRequest(format!("Invalid UTF-8 in config: {e}"))),
    }
}

fn context_ref<'a>(
    ctx: *mut HostContext,
    function: &str,
) -> Result<&'a HostContext, *const c_char> {
    match unsafe { ctx.as_ref() } {
        Some(host) => Ok(host),
        None => {
            let error =
                AppResponse::BadRequest(format!("Null context pointer passed to {function}"));
            Err(response_to_c_string(&error))
        }
    }
}

fn json_arg<T: serde::de::DeserializeOwned>(
    ptr: *const c_char,
    field_name: &str,
) -> Result<T, *const c_char> {
    let json = c_ptr_to_string(ptr, field_name)?;
    serde_json::from_str(&json).map_err(|e| {
        let error = AppResponse::SerializationError(format!("Invalid {field_name} JSON: {e}"));
        response_to_c_string(&error)
    })
}

fn c_ptr_to_str<'a>(ptr: *const c_char) -> Option<&'a str> {
    if ptr.is_null() {
        return None;
    }
    unsafe { CStr::from_ptr(ptr).to_str().ok() }
}

/// Converts an [`AppResponse`] to a C string owned by the caller, who must
/// release it with [`free_response`]. Returns null if serialization fails.
fn response_to_c_string(response: &AppResponse) -> *const c_char {
    let json = match serde_json::to_string(response) {
        Ok(j) => j,
        Err(e) => {
            warn!("Error serializing response: {e}");
            return std::ptr::null();
        }
    };

    match CString::new(json) {
        Ok(c_str) => c_str.into_raw(),
        Err(e) => {
            warn!("Error creating CString: {e}");
            std::ptr::null()
        }
    }
}

/// Converts a C string pointer to a `String`, turning a null pointer or
/// invalid UTF-8 into a `BadRequest` response.
fn c_ptr_to_string(ptr: *const c_char, field_name: &str) -> Result<String, *const c_char> {
    if ptr.is_null() {
        let error = AppResponse::BadRequest(format!("Null {field_name} pointer"));
        return Err(response_to_c_string(&error));
    }

    match unsafe { CStr::from_ptr(ptr).to_str() } {
        Ok(s) => Ok(s.to_string()),
        Err(e) => {
            let error = AppResponse::BadRequest(format!("Invalid UTF-8 in {field_name}: {e}"));
            Err(response_to_c_string(&error))
        }
    }
}
