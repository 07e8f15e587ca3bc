use std::rc::Rc;

use log::info;

use crate::ad_copy_catalog::AdCopyCatalog;
use crate::app_response::AppResponse;
use crate::country::{BuiltinCountries, CountryDirectory};
use crate::local_db_state::{KeyValueStore, LmdbStore, MemoryStore};
use crate::redirect_state::RedirectBroadcaster;
use crate::site_config::SiteConfig;

/// Everything a page needs, built once at startup and handed to consumers.
///
/// The catalog and the broadcaster share one store handle and one
/// configuration.
pub struct SiteContext {
    pub config: Rc<SiteConfig>,
    pub catalog: AdCopyCatalog,
    pub redirects: RedirectBroadcaster,
    store: Rc<dyn KeyValueStore>,
}

impl SiteContext {
    /// Opens the LMDB store `<name>.lmdb` and builds the context on it.
    pub fn open(name: &str, config: SiteConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        let store = LmdbStore::init(name)?;
        Ok(Self::with_store(Rc::new(store), config))
    }

    pub fn in_memory(config: SiteConfig) -> Result<Self, AppResponse> {
        config.validate()?;
        Ok(Self::with_store(Rc::new(MemoryStore::new()), config))
    }

    pub fn with_store(store: Rc<dyn KeyValueStore>, config: SiteConfig) -> Self {
        let countries: Rc<dyn CountryDirectory> = if config.countries.is_empty() {
            Rc::new(BuiltinCountries)
        } else {
            Rc::new(config.countries.clone())
        };
        let config = Rc::new(config);

        let catalog = AdCopyCatalog::new(Rc::clone(&store), Rc::clone(&config), countries);
        let redirects = RedirectBroadcaster::new(Rc::clone(&store), Rc::clone(&config));
        info!(
            "Site context ready, country '{}'",
            redirects.get_current().selected_country_code
        );

        Self {
            config,
            catalog,
            redirects,
            store,
        }
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }
}
