//! Watched-network registry with edge-triggered presence tracking.
//!
//! The registry answers one question per scan: which watched SSIDs went
//! from "not seen" to "seen". A network that stays in range across scans is
//! reported only once; it re-arms after a scan in which it is absent.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

/// Watched SSIDs and their last observed presence.
///
/// Invariant: every key of `presence` is also in `watched`.
#[derive(Debug, Default, Clone)]
pub struct WatchRegistry {
    watched: HashSet<String>,
    presence: HashMap<String, bool>,
}

impl WatchRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a registry from a list of SSIDs. Blank entries and duplicates
    /// are dropped the same way `add` drops them.
    pub fn with_networks<I, S>(ssids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for ssid in ssids {
            registry.add(ssid);
        }
        registry
    }

    /// Starts watching `ssid`. Returns `false` when nothing changed, either
    /// because it was already watched or because it is empty.
    pub fn add(&mut self, ssid: impl Into<String>) -> bool {
        let ssid = ssid.into();
        if ssid.is_empty() {
            return false;
        }
        self.watched.insert(ssid)
    }

    /// Stops watching `ssid` and forgets whether it was in range.
    pub fn remove(&mut self, ssid: &str) -> bool {
        self.presence.remove(ssid);
        self.watched.remove(ssid)
    }

    /// Applies one scan and returns the watched SSIDs that just came into
    /// range. Unwatched and duplicate entries in `scan` are ignored.
    pub fn process_scan<S: AsRef<str>>(&mut self, scan: &[S]) -> HashSet<String> {
        let seen: HashSet<&str> = scan.iter().map(AsRef::as_ref).collect();
        let mut appeared = HashSet::new();

        for ssid in &self.watched {
            let now_present = seen.contains(ssid.as_str());
            let was_present = self.presence.get(ssid).copied().unwrap_or(false);
            if now_present && !was_present {
                appeared.insert(ssid.clone());
            }
            self.presence.insert(ssid.clone(), now_present);
        }

        appeared
    }

    pub fn contains(&self, ssid: &str) -> bool {
        self.watched.contains(ssid)
    }

    /// Whether `ssid` was in range at the last scan. Unwatched SSIDs are
    /// never present.
    pub fn is_present(&self, ssid: &str) -> bool {
        self.presence.get(ssid).copied().unwrap_or(false)
    }

    /// Sorted snapshot of the watched set.
    pub fn watched(&self) -> Vec<String> {
        let mut list: Vec<String> = self.watched.iter().cloned().collect();
        list.sort();
        list
    }

    /// Sorted snapshot of the watched SSIDs currently latched in range.
    pub fn present(&self) -> Vec<String> {
        let mut list: Vec<String> = self
            .presence
            .iter()
            .filter(|(_, in_range)| **in_range)
            .map(|(ssid, _)| ssid.clone())
            .collect();
        list.sort();
        list
    }

    pub fn len(&self) -> usize {
        self.watched.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watched.is_empty()
    }
}

/// 扫描任务和 Web API 共享同一个 registry，用一把锁同时保护两份状态。
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<WatchRegistry>>,
}

impl SharedRegistry {
    pub fn new(registry: WatchRegistry) -> Self {
        Self {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Locks the registry. A poisoned lock is recovered: every mutation
    /// leaves the registry consistent, so the data is still valid.
    pub fn lock(&self) -> MutexGuard<'_, WatchRegistry> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add(&self, ssid: impl Into<String>) -> bool {
        self.lock().add(ssid)
    }

    pub fn remove(&self, ssid: &str) -> bool {
        self.lock().remove(ssid)
    }

    pub fn process_scan<S: AsRef<str>>(&self, scan: &[S]) -> HashSet<String> {
        self.lock().process_scan(scan)
    }

    pub fn watched(&self) -> Vec<String> {
        self.lock().watched()
    }

    pub fn present(&self) -> Vec<String> {
        self.lock().present()
    }
}
