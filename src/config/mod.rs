//! Configuration management
//!
//! Settings are merged from, in increasing priority:
//! 1. Type defaults
//! 2. File named by the `CONFIG_PATH` environment variable
//! 3. Environment variables with the `DONUT__` prefix (`__` separates levels,
//!    e.g. `DONUT__LEDGER__CLUSTER_NAME`)

mod ledger;
pub use ledger::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Where work records live in the coordination tree
    #[serde(default)]
    pub ledger: LedgerConfig,
}

impl Settings {
    /// Load defaults, `CONFIG_PATH` and `DONUT__` variables. Does not
    /// validate; call [`validate`](Self::validate) once all overrides are in.
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("DONUT")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Self = builder.build()?.try_deserialize()?;
        Ok(settings)
    }

    /// Layer another file on top of the current values. Environment
    /// variables still win.
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let settings: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("DONUT")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    pub fn validate(self) -> Result<Self> {
        self.ledger.validate()?;
        Ok(self)
    }
}
