use crate::traits::{Network, Scanner};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// A mock scanner for testing and local development.
/// It replays a scripted list of scans without touching any hardware; once
/// the script runs out the last scan is repeated.
#[derive(Debug, Default)]
pub struct MockScanner {
    script: Mutex<VecDeque<Vec<Network>>>,
    last: Mutex<Vec<Network>>,
    triggers: AtomicUsize,
    fail_next: Mutex<Option<String>>,
}

impl MockScanner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a scanner from lists of SSIDs, one list per scan.
    pub fn from_ssids<I, S>(scans: I) -> Self
    where
        I: IntoIterator<Item = Vec<S>>,
        S: Into<String>,
    {
        let scanner = Self::new();
        for scan in scans {
            scanner.push_scan(scan.into_iter().map(Network::named).collect());
        }
        scanner
    }

    /// Queues one more scan result.
    pub fn push_scan(&self, networks: Vec<Network>) {
        self.script
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .push_back(networks);
    }

    /// Makes the next `trigger_scan` fail with `CommandFailed`.
    pub fn fail_next_trigger(&self, message: impl Into<String>) {
        *self.fail_next.lock().unwrap_or_else(|p| p.into_inner()) = Some(message.into());
    }

    /// Number of scans triggered so far.
    pub fn trigger_count(&self) -> usize {
        self.triggers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scanner for MockScanner {
    async fn trigger_scan(&self) -> Result<()> {
        if let Some(message) = self.fail_next.lock().unwrap_or_else(|p| p.into_inner()).take() {
            tracing::debug!("🤖 [MockScanner] Simulated scan failure");
            return Err(Error::CommandFailed(message));
        }
        self.triggers.fetch_add(1, Ordering::SeqCst);

        let next = self.script.lock().unwrap_or_else(|p| p.into_inner()).pop_front();
        if let Some(networks) = next {
            *self.last.lock().unwrap_or_else(|p| p.into_inner()) = networks;
        }
        tracing::debug!("🤖 [MockScanner] Scan triggered (simulated).");
        Ok(())
    }

    async fn scan_results(&self) -> Result<Vec<Network>> {
        let networks = self.last.lock().unwrap_or_else(|p| p.into_inner()).clone();
        tracing::debug!("🤖 [MockScanner] Found {} networks.", networks.len());
        Ok(networks)
    }
}
