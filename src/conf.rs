//! Configuration of slice encoding.

use serde::{Deserialize, Serialize};

use crate::codec::Selection;

/// Default width of the genomic window covered by one slice.
pub const DEFAULT_CHUNK_SIZE: u32 = 1000;

/// Configuration for the `encode` sub command, read from TOML.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone)]
#[serde(default, deny_unknown_fields)]
pub struct SliceConf {
    /// Width of the window grouping variants into one slice.
    pub chunk_size: u32,
    /// Identifier of the study the variants belong to.
    pub study_id: String,
    /// Identifier of the ingested file.
    pub file_id: String,
    /// INFO keys to keep, all if unset; list `QUAL` to keep the quality.
    pub include_info: Option<Vec<String>>,
    /// FORMAT keys to keep, all if unset.
    pub include_format: Option<Vec<String>>,
}

impl Default for SliceConf {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            study_id: "study".to_string(),
            file_id: "file".to_string(),
            include_info: None,
            include_format: None,
        }
    }
}

impl SliceConf {
    /// Load configuration from the TOML file at `path`.
    pub fn from_path<P>(path: P) -> Result<Self, anyhow::Error>
    where
        P: AsRef<std::path::Path>,
    {
        let toml_str = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            anyhow::anyhow!("could not read configuration {:?}: {}", path.as_ref(), e)
        })?;
        let conf: Self = toml::from_str(&toml_str)
            .map_err(|e| anyhow::anyhow!("problem parsing configuration: {}", e))?;
        if conf.chunk_size == 0 {
            anyhow::bail!("chunk_size must be positive");
        }
        Ok(conf)
    }

    /// The attribute selection described by this configuration.
    pub fn selection(&self) -> Selection {
        let mut selection = Selection::all();
        if let Some(keys) = &self.include_info {
            selection = selection.with_info(keys.iter().cloned());
        }
        if let Some(keys) = &self.include_format {
            selection = selection.with_format(keys.iter().cloned());
        }
        selection
    }
}
