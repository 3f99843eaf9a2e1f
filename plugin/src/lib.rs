pub mod custom;

use tfcp_core::global as tg;

/// Registers every provider this crate ships. Safe to call more than once.
pub fn init() {
    tg::init();
    tg::add_plugin(Box::new(custom::CustomPlugin::new()));
    log::debug!("plugins: {:?}", tg::plugin_ids());
}
