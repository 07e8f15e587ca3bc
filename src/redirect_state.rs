//! Redirect state broadcaster.
//!
//! Holds the one current [`RedirectState`] snapshot and pushes it to
//! observers synchronously. Observers get the current snapshot as soon as
//! they subscribe and every replacement after that.
//!
//! # Failure modes
//!
//! - A panicking observer is caught and logged. The remaining observers are
//!   still notified and the failing one stays subscribed.
//! - Observers may call [`RedirectBroadcaster::set_country`], subscribe or
//!   unsubscribe from inside a notification; no borrow is held while they
//!   run. A nested `set_country` supersedes the round in progress: observers
//!   not yet reached only receive the newer snapshot, so every observer's
//!   last delivery is the current state.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::{Rc, Weak};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::ad_copy_model::CountryLink;
use crate::app_response::AppResponse;
use crate::country::normalize_country_code;
use crate::local_db_state::{read_json, write_json, KeyValueStore};
use crate::site_config::SiteConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectState {
    pub selected_country_code: String,
    pub global_links: Vec<CountryLink>,
    pub default_fallback: String,
}

impl RedirectState {
    /// The first link for the selected country, else the default fallback.
    pub fn resolved_url(&self) -> &str {
        self.global_links
            .iter()
            .find(|link| {
                link.country_code
                    .trim()
                    .eq_ignore_ascii_case(&self.selected_country_code)
            })
            .map(|link| link.url.as_str())
            .unwrap_or(self.default_fallback.as_str())
    }
}

type Observer = Rc<dyn Fn(&RedirectState)>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    observers: Vec<(u64, Observer)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.observers.iter().any(|(existing, _)| *existing == id)
    }
}

/// Handle returned by [`RedirectBroadcaster::subscribe`].
///
/// Dropping it does not unsubscribe; call [`Subscription::unsubscribe`].
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
    active: Cell<bool>,
}

impl Subscription {
    /// Deregisters the observer. Later calls do nothing.
    pub fn unsubscribe(&self) {
        if !self.active.replace(false) {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            registry
                .borrow_mut()
                .observers
                .retain(|(existing, _)| *existing != self.id);
            debug!("Redirect observer {} unsubscribed", self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

pub struct RedirectBroadcaster {
    store: Rc<dyn KeyValueStore>,
    config: Rc<SiteConfig>,
    state: RefCell<RedirectState>,
    // bumped on every replacement of `state`
    version: Cell<u64>,
    registry: Rc<RefCell<Registry>>,
}

impl RedirectBroadcaster {
    /// Builds the broadcaster with its state derived from the store.
    pub fn new(store: Rc<dyn KeyValueStore>, config: Rc<SiteConfig>) -> Self {
        let broadcaster = Self {
            store,
            config,
            state: RefCell::new(RedirectState {
                selected_country_code: String::new(),
                global_links: Vec::new(),
                default_fallback: String::new(),
            }),
            version: Cell::new(0),
            registry: Rc::new(RefCell::new(Registry::default())),
        };
        let initial = broadcaster.derive_state(broadcaster.read_selected_country());
        *broadcaster.state.borrow_mut() = initial;
        broadcaster
    }

    /// Re-derives the state from the persisted selection and link table.
    /// Observers hear about it only when the snapshot actually changed.
    pub fn initialize(&self) -> RedirectState {
        let derived = self.derive_state(self.read_selected_country());
        let changed = *self.state.borrow() != derived;
        if changed {
            let version = self.replace_state(derived.clone());
            self.notify(&derived, version);
        }
        derived
    }

    /// Selects `country_code`, re-reading the link table, and notifies
    /// every observer with the new snapshot.
    pub fn set_country(&self, country_code: &str) -> Result<RedirectState, AppResponse> {
        let code = normalize_country_code(country_code)?;

        if let Err(e) = self.store.set_item(&self.config.country_key, &code) {
            warn!("Could not persist country selection '{}': {}", code, e);
        }

        let state = self.derive_state(code);
        let version = self.replace_state(state.clone());
        info!(
            "Country set to '{}', redirecting to {}",
            state.selected_country_code,
            state.resolved_url()
        );
        self.notify(&state, version);
        Ok(state)
    }

    /// Replaces the persisted link table. Takes effect on the next
    /// `set_country` or `initialize`.
    pub fn store_links(&self, links: &[CountryLink]) -> Result<(), AppResponse> {
        for link in links {
            normalize_country_code(&link.country_code)?;
        }
        write_json(self.store.as_ref(), &self.config.links_key, links)?;
        info!("Stored {} redirect links", links.len());
        Ok(())
    }

    pub fn get_current(&self) -> RedirectState {
        self.state.borrow().clone()
    }

    /// Registers `observer` and immediately calls it with the current
    /// snapshot.
    pub fn subscribe(&self, observer: impl Fn(&RedirectState) + 'static) -> Subscription {
        let observer: Observer = Rc::new(observer);
        let id = {
            let mut registry = self.registry.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.observers.push((id, Rc::clone(&observer)));
            id
        };
        debug!("Redirect observer {} subscribed", id);

        let current = self.get_current();
        invoke(id, &observer, &current);

        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
            active: Cell::new(true),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().observers.len()
    }

    fn read_selected_country(&self) -> String {
        let fallback = || self.config.default_country.to_ascii_lowercase();
        match self.store.get_item(&self.config.country_key) {
            Ok(Some(raw)) => match normalize_country_code(raw.trim().trim_matches('"')) {
                Ok(code) => code,
                Err(e) => {
                    warn!("Ignoring stored country selection: {}", e);
                    fallback()
                }
            },
            Ok(None) => fallback(),
            Err(e) => {
                warn!("Could not read country selection: {}", e);
                fallback()
            }
        }
    }

    fn derive_state(&self, country_code: String) -> RedirectState {
        let global_links: Vec<CountryLink> =
            read_json(self.store.as_ref(), &self.config.links_key).unwrap_or_default();
        RedirectState {
            selected_country_code: country_code,
            global_links,
            default_fallback: self.config.default_fallback.clone(),
        }
    }

    fn replace_state(&self, state: RedirectState) -> u64 {
        *self.state.borrow_mut() = state;
        let version = self.version.get() + 1;
        self.version.set(version);
        version
    }

    fn notify(&self, state: &RedirectState, version: u64) {
        let observers: Vec<(u64, Observer)> = self
            .registry
            .borrow()
            .observers
            .iter()
            .map(|(id, observer)| (*id, Rc::clone(observer)))
            .collect();

        for (id, observer) in observers {
            if self.version.get() != version {
                debug!("Redirect state replaced during notification, stopping stale round");
                break;
            }
            // unsubscribed by an earlier observer in this round
            if !self.registry.borrow().contains(id) {
                continue;
            }
            invoke(id, &observer, state);
        }
    }
}

fn invoke(id: u64, observer: &Observer, state: &RedirectState) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| observer(state))) {
        warn!(
            "Redirect observer {} failed: {}",
            id,
            panic_message(payload.as_ref())
        );
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic"
    }
}
