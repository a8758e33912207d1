pub mod algo;
pub mod crm;
pub mod error;
pub mod ops;
pub mod pipeline;

pub use error::{Error, Result};

#[cfg(feature = "plugin")]
pub mod commands;

#[cfg(feature = "plugin")]
use nu_plugin::{Plugin, PluginCommand};

#[cfg(feature = "plugin")]
pub struct SectorsPlugin;

#[cfg(feature = "plugin")]
impl Plugin for SectorsPlugin {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").into()
    }

    fn commands(&self) -> Vec<Box<dyn PluginCommand<Plugin = Self>>> {
        vec![
            Box::new(commands::Explode),
            Box::new(commands::Classify),
            Box::new(commands::Rank),
            Box::new(commands::Rollup),
            Box::new(commands::Stages),
            Box::new(commands::Properties),
            Box::new(commands::Options),
        ]
    }
}
