use crate::global::ProviderMeta;

/// A bundle of providers shipped together; registered with [`crate::global::add_plugin`].
pub trait Plugin: Send {
    fn id(&self) -> &str;
    fn name(&self) -> &str;

    fn provider_metas(&self) -> Vec<ProviderMeta>;
}
