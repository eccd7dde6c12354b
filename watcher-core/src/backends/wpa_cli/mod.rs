use super::utils::{parse_wpa_scan_results, run_command};
use crate::traits::{Network, Scanner};
use crate::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// wpa_cli 扫描器：SCAN 之后等待一段时间再读取 SCAN_RESULTS
#[derive(Debug, Clone)]
pub struct WpaCliScanner {
    interface: String,
    settle: Duration,
}

impl WpaCliScanner {
    pub fn new(interface: impl Into<String>, settle: Duration) -> Self {
        Self {
            interface: interface.into(),
            settle,
        }
    }
}

#[async_trait]
impl Scanner for WpaCliScanner {
    async fn trigger_scan(&self) -> Result<()> {
        let reply = run_command("wpa_cli", &["-i", self.interface.as_str(), "scan"]).await?;
        // wpa_cli 即使命令失败也会返回 0，需要检查回复内容
        match reply.trim() {
            "OK" => {}
            // 上一次扫描尚未结束，直接读取结果即可
            "FAIL-BUSY" => tracing::debug!("wpa_supplicant scan already in progress"),
            other => {
                return Err(Error::CommandFailed(format!("wpa_cli scan failed: {}", other)));
            }
        }

        // 等待一会儿以获取结果
        tracing::debug!("Waiting {:?} for scan results...", self.settle);
        tokio::time::sleep(self.settle).await;
        Ok(())
    }

    async fn scan_results(&self) -> Result<Vec<Network>> {
        let stdout = run_command("wpa_cli", &["-i", self.interface.as_str(), "scan_results"]).await?;
        let networks = parse_wpa_scan_results(&stdout);
        tracing::debug!("wpa_cli reported {} networks", networks.len());
        Ok(networks)
    }
}
