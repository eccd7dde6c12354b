use super::utils::{parse_nmcli_list, run_command};
use crate::Result;
use crate::traits::{Network, Scanner};
use async_trait::async_trait;

// 通过调用nmcli命令行工具实现的扫描器，适用于使用NetworkManager管理网络连接的Linux系统

#[derive(Debug, Clone)]
pub struct NmcliScanner {
    interface: String,
}

impl NmcliScanner {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }
}

#[async_trait]
impl Scanner for NmcliScanner {
    async fn trigger_scan(&self) -> Result<()> {
        tracing::debug!(iface = %self.interface, "Requesting nmcli rescan");
        // NetworkManager 会限制扫描频率，rescan 失败时仍可读取缓存的结果
        if let Err(e) = run_command(
            "nmcli",
            &["device", "wifi", "rescan", "ifname", self.interface.as_str()],
        )
        .await
        {
            tracing::warn!("nmcli rescan rejected, using cached results: {}", e);
        }
        Ok(())
    }

    async fn scan_results(&self) -> Result<Vec<Network>> {
        let stdout = run_command(
            "nmcli",
            &[
                "-t",
                "-f",
                "SSID,SIGNAL,SECURITY",
                "device",
                "wifi",
                "list",
                "ifname",
                self.interface.as_str(),
            ],
        )
        .await?;
        let networks = parse_nmcli_list(&stdout);
        tracing::debug!("nmcli reported {} networks", networks.len());
        Ok(networks)
    }
}
