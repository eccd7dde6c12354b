use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// 在这里定义扫描器、通知器、权限检查和持久化的 trait，
// 由 backends/ 与 store.rs 提供具体实现。

/// Represents a single Wi-Fi network found during a scan.
/// Wi-Fi 扫描时单个网络的具体信息。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub ssid: String,
    pub signal: u8,       // 信号强度，0到100
    pub security: String, // 无线网络安全性 "WPA2", "WEP", "Open"
}

impl Network {
    /// Builds an entry with only an SSID, for scripted scans.
    pub fn named(ssid: impl Into<String>) -> Self {
        Self {
            ssid: ssid.into(),
            signal: 0,
            security: "Unknown".to_string(),
        }
    }
}

/// Flattens scanner output into the ordered list of observed SSIDs.
pub fn ssids_of(networks: &[Network]) -> Vec<String> {
    networks.iter().map(|n| n.ssid.clone()).collect()
}

/// 扫描器接口：触发扫描并读取结果。
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Asks the radio for a fresh scan. Returns once the request has been
    /// accepted, not when results are ready.
    async fn trigger_scan(&self) -> crate::Result<()>;

    /// Reads the networks currently known to the radio.
    async fn scan_results(&self) -> crate::Result<Vec<Network>>;

    /// Triggers a scan and reads its results.
    async fn scan(&self) -> crate::Result<Vec<Network>> {
        self.trigger_scan().await?;
        self.scan_results().await
    }
}

/// 通知接口：向用户展示“网络已出现”的提示。
///
/// 这应该是一个 "fire and forget" 操作，投递失败只记录日志。
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, ssid: &str);
}

/// 权限检查：扫描和通知之前都会先询问它。
pub trait PermissionGate: Send + Sync {
    fn has_required_access(&self) -> bool;
}

/// Persistence for the watched set. Presence state is never stored.
pub trait WatchStore: Send + Sync {
    /// `None` when nothing has been saved yet.
    fn load(&self) -> crate::Result<Option<Vec<String>>>;
    fn save(&self, ssids: &[String]) -> crate::Result<()>;
}
