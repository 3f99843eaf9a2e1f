use std::sync::Arc;
use tfcp_core::global::ProviderMeta;
use tfcp_core::plugin::Plugin;
use tfcp_core::provider::Provider;

pub const NAME: &str = "custom";

/// The provider this plugin serves. It accepts no configuration and manages
/// no resource types yet; new types go into `resources_map`.
pub fn provider() -> Provider {
    Provider::new()
}

pub struct CustomPlugin {}

impl CustomPlugin {
    pub fn new() -> Self {
        Self {}
    }
}

impl Default for CustomPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for CustomPlugin {
    fn id(&self) -> &str {
        "tfcp.plugin.custom"
    }
    fn name(&self) -> &str {
        NAME
    }
    fn provider_metas(&self) -> Vec<ProviderMeta> {
        vec![ProviderMeta::new(
            NAME,
            env!("CARGO_PKG_VERSION"),
            Arc::new(provider),
        )]
    }
}
