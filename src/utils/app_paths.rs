use anyhow::{anyhow, Result};
use std::fs;
use std::path::PathBuf;

pub struct AppPaths;

impl AppPaths {
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow!("Cannot determine data directory"))?
            .join("logview");

        fs::create_dir_all(&data_dir)?;
        Ok(data_dir)
    }

    /// Persisted view settings
    pub fn storage_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("storage.json"))
    }

    pub fn history_file() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("history.txt"))
    }
}
