use once_cell::sync::Lazy;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ProviderError;
use crate::plugin::Plugin;
use crate::provider::Provider;
use crate::Result;

pub type Creator = dyn Fn() -> Provider + Send + Sync;

/// How the host finds and builds a provider by name.
#[derive(Clone)]
pub struct ProviderMeta {
    pub name: String,
    pub version: String,
    pub creator: Arc<Creator>,
}

impl ProviderMeta {
    pub fn new(name: &str, version: &str, creator: Arc<Creator>) -> Self {
        ProviderMeta {
            name: name.to_string(),
            version: version.to_string(),
            creator,
        }
    }

    pub fn create(&self) -> Provider {
        (self.creator)()
    }
}

impl fmt::Debug for ProviderMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderMeta")
            .field("name", &self.name)
            .field("version", &self.version)
            .finish()
    }
}

struct Global {
    plugins: BTreeMap<String, Box<dyn Plugin>>,
    provider_metas: BTreeMap<String, ProviderMeta>,
}

impl Global {
    fn new() -> Self {
        Self {
            plugins: BTreeMap::new(),
            provider_metas: BTreeMap::new(),
        }
    }
}

static GLOBAL: Lazy<Mutex<Global>> = Lazy::new(|| Mutex::new(Global::new()));

fn global() -> MutexGuard<'static, Global> {
    GLOBAL.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn init() {
    Lazy::force(&GLOBAL);
}

/// Registers the plugin and every provider it ships. Re-adding an id replaces it.
pub fn add_plugin(p: Box<dyn Plugin>) {
    let metas = p.provider_metas();
    let mut g = global();
    tracing::debug!(plugin = p.id(), providers = metas.len(), "add plugin");
    for meta in metas {
        g.provider_metas.insert(meta.name.clone(), meta);
    }
    g.plugins.insert(p.id().to_string(), p);
}

pub fn reg_provider_meta(meta: ProviderMeta) {
    tracing::debug!(provider = %meta.name, version = %meta.version, "register provider");
    global().provider_metas.insert(meta.name.clone(), meta);
}

pub fn provider_meta(name: &str) -> Option<ProviderMeta> {
    global().provider_metas.get(name).cloned()
}

pub fn provider_names() -> Vec<String> {
    global().provider_metas.keys().cloned().collect()
}

pub fn plugin_ids() -> Vec<String> {
    global().plugins.keys().cloned().collect()
}

pub fn create_provider(name: &str) -> Result<Provider> {
    provider_meta(name)
        .map(|meta| meta.create())
        .ok_or_else(|| ProviderError::UnknownProvider(name.to_string()))
}
