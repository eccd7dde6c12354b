//! Optional persistence of the watched set.
//!
//! Only the SSID list is stored; presence is rebuilt from the next scan.
//! Once a list has been saved it replaces the configured networks at
//! startup, so removals survive a restart.

use crate::Result;
use crate::traits::WatchStore;
use std::path::PathBuf;
use std::sync::Mutex;

/// Stores the watched set as a JSON array of strings.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl WatchStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<String>>> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No store at {}, nothing saved yet", self.path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let ssids: Vec<String> = serde_json::from_str(&content)?;
        Ok(Some(ssids))
    }

    fn save(&self, ssids: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        // 先写临时文件再 rename
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(ssids)?)?;
        std::fs::rename(&tmp, &self.path)?;
        tracing::debug!("Saved {} watched networks to {}", ssids.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    ssids: Mutex<Option<Vec<String>>>,
}

impl MemoryStore {
    /// A store that already holds a saved list.
    pub fn new(ssids: Vec<String>) -> Self {
        Self {
            ssids: Mutex::new(Some(ssids)),
        }
    }
}

impl WatchStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<String>>> {
        Ok(self.ssids.lock().unwrap_or_else(|p| p.into_inner()).clone())
    }

    fn save(&self, ssids: &[String]) -> Result<()> {
        *self.ssids.lock().unwrap_or_else(|p| p.into_inner()) = Some(ssids.to_vec());
        Ok(())
    }
}
