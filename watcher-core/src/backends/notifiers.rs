use crate::config::NotifierConfig;
use crate::traits::Notifier;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;

/// 只写日志的通知器，适合无桌面环境的设备
#[derive(Debug, Clone)]
pub struct LogNotifier {
    config: Arc<NotifierConfig>,
}

impl LogNotifier {
    pub fn new(config: Arc<NotifierConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, ssid: &str) {
        tracing::info!(ssid = %ssid, "📶 {}: {}", self.config.title, self.config.render_body(ssid));
    }
}

/// 通过 `notify-send` 弹出桌面通知
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    config: Arc<NotifierConfig>,
}

impl DesktopNotifier {
    pub fn new(config: Arc<NotifierConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn notify(&self, ssid: &str) {
        let title = self.config.title.clone();
        let body = self.config.render_body(ssid);

        let mut cmd = Command::new("notify-send");
        cmd.arg("--app-name=wifi-watch")
            .arg(&title)
            .arg(&body)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn notify-send: {}", e);
                return;
            }
        };

        // 启动一个新的异步任务来等待进程结束，不阻塞扫描循环
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) if status.success() => tracing::debug!("Desktop notification shown."),
                Ok(status) => tracing::warn!("notify-send exited with {}", status),
                Err(e) => tracing::error!("notify-send process failed: {}", e),
            }
        });
    }
}
