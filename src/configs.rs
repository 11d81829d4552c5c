use crate::error::AppResult;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Directory holding certificate files; omit for a pure-memory store.
    pub certdir: Option<PathBuf>,

    /// Optional Z85 public key to look up before printing the listing.
    pub lookup: Option<String>,
}

impl GlobalConfig {
    pub fn load_config() -> AppResult<Self> {
        let cfg = Config::builder()
            .add_source(File::with_name("config").required(false))
            .add_source(Environment::with_prefix("CERTSTORE").separator("."))
            .build()?
            .try_deserialize()?;
        Ok(cfg)
    }
}
