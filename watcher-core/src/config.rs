use crate::{Error, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// 顶层应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub watch: WatchConfig,
    pub scanner: ScannerConfig,
    pub notifier: NotifierConfig,
    pub permission: PermissionConfig,
    pub server: ServerConfig,
}

// ============= [watch] =============

#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// 启动时预先关注的网络
    pub networks: Vec<String>,
    pub scan_interval: Duration,
    /// 设置后才会持久化关注列表
    pub store_path: Option<PathBuf>,
}

// ============= [scanner] =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScannerKind {
    Nmcli,
    WpaCli,
    Mock,
}

impl FromStr for ScannerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "nmcli" => Ok(Self::Nmcli),
            "wpa_cli" => Ok(Self::WpaCli),
            "mock" => Ok(Self::Mock),
            other => Err(Error::Config(format!("unknown scanner backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub kind: ScannerKind,
    pub interface: String,
    /// wpa_cli 触发扫描后等待结果的时间
    pub settle: Duration,
    /// mock 后端依次返回的扫描结果
    pub mock_scans: Vec<Vec<String>>,
}

// ============= [notifier] =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifierKind {
    Log,
    Desktop,
}

impl FromStr for NotifierKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "log" => Ok(Self::Log),
            "desktop" => Ok(Self::Desktop),
            other => Err(Error::Config(format!("unknown notifier backend: {}", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NotifierConfig {
    pub kind: NotifierKind,
    pub title: String,
    /// `{ssid}` is replaced with the network name.
    pub body: String,
}

impl NotifierConfig {
    pub fn render_body(&self, ssid: &str) -> String {
        self.body.replace("{ssid}", ssid)
    }
}

// ============= [permission] =============

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateKind {
    Allow,
    /// 扫描器依赖的命令行工具必须在 PATH 中
    Command,
    /// 标记文件存在时拒绝访问
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct PermissionConfig {
    pub gate: GateKind,
}

// ============= [server] =============

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

// ============= TOML 解析用的临时结构 =============

#[derive(Deserialize, Default)]
#[serde(default)]
struct AppConfigFile {
    watch: WatchToml,
    scanner: ScannerToml,
    notifier: NotifierToml,
    permission: PermissionToml,
    server: ServerToml,
}

#[derive(Deserialize)]
#[serde(default)]
struct WatchToml {
    networks: Vec<String>,
    scan_interval_secs: u64,
    store_path: Option<PathBuf>,
}

impl Default for WatchToml {
    fn default() -> Self {
        Self {
            networks: Vec::new(),
            scan_interval_secs: 30,
            store_path: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ScannerToml {
    backend: String,
    interface: String,
    settle_secs: u64,
    mock_scans: Vec<Vec<String>>,
}

impl Default for ScannerToml {
    fn default() -> Self {
        Self {
            backend: "nmcli".to_string(),
            interface: "wlan0".to_string(),
            settle_secs: 5,
            mock_scans: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct NotifierToml {
    backend: String,
    title: String,
    body: String,
}

impl Default for NotifierToml {
    fn default() -> Self {
        Self {
            backend: "log".to_string(),
            title: "WiFi Network Found".to_string(),
            body: "{ssid} is now in range".to_string(),
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct PermissionToml {
    gate: String,
    path: Option<PathBuf>,
}

impl Default for PermissionToml {
    fn default() -> Self {
        Self {
            gate: "command".to_string(),
            path: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct ServerToml {
    bind_addr: String,
}

impl Default for ServerToml {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl TryFrom<AppConfigFile> for AppConfig {
    type Error = Error;

    fn try_from(t: AppConfigFile) -> Result<Self> {
        if t.watch.scan_interval_secs == 0 {
            return Err(Error::Config("scan_interval_secs must be at least 1".into()));
        }

        let bind_addr = SocketAddr::from_str(&t.server.bind_addr)
            .map_err(|e| Error::Config(format!("invalid bind_addr {:?}: {}", t.server.bind_addr, e)))?;

        let gate = match t.permission.gate.as_str() {
            "allow" => GateKind::Allow,
            "command" => GateKind::Command,
            "file" => {
                let path = t.permission.path.ok_or_else(|| {
                    Error::Config("permission gate \"file\" requires `path`".into())
                })?;
                GateKind::File(path)
            }
            other => return Err(Error::Config(format!("unknown permission gate: {}", other))),
        };

        Ok(AppConfig {
            watch: WatchConfig {
                networks: t.watch.networks,
                scan_interval: Duration::from_secs(t.watch.scan_interval_secs),
                store_path: t.watch.store_path,
            },
            scanner: ScannerConfig {
                kind: t.scanner.backend.parse()?,
                interface: t.scanner.interface,
                settle: Duration::from_secs(t.scanner.settle_secs),
                mock_scans: t.scanner.mock_scans,
            },
            notifier: NotifierConfig {
                kind: t.notifier.backend.parse()?,
                title: t.notifier.title,
                body: t.notifier.body,
            },
            permission: PermissionConfig { gate },
            server: ServerConfig { bind_addr },
        })
    }
}

/// 没有配置文件时使用的内置默认值
pub fn default_config() -> Result<AppConfig> {
    AppConfig::try_from(AppConfigFile::default())
}

pub fn load_config_from_toml_str(s: &str) -> Result<AppConfig> {
    let parsed: AppConfigFile = toml::from_str(s)?;
    AppConfig::try_from(parsed)
}

pub fn load_config_from_path(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)?;
    tracing::info!("Loaded configuration from {}", path.display());
    load_config_from_toml_str(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let cfg = load_config_from_toml_str("").unwrap();
        assert!(cfg.watch.networks.is_empty());
        assert_eq!(cfg.watch.scan_interval, Duration::from_secs(30));
        assert!(cfg.watch.store_path.is_none());
        assert_eq!(cfg.scanner.kind, ScannerKind::Nmcli);
        assert_eq!(cfg.scanner.interface, "wlan0");
        assert_eq!(cfg.notifier.kind, NotifierKind::Log);
        assert_eq!(cfg.notifier.title, "WiFi Network Found");
        assert_eq!(cfg.permission.gate, GateKind::Command);
        assert_eq!(cfg.server.bind_addr, "127.0.0.1:8080".parse().unwrap());
    }

    #[test]
    fn full_file_parses() {
        let toml = r#"
            [watch]
            networks = ["Home", "Office"]
            scan_interval_secs = 10
            store_path = "/tmp/watched.json"

            [scanner]
            backend = "mock"
            mock_scans = [["Home"], []]

            [notifier]
            backend = "desktop"
            body = "{ssid} nearby"

            [permission]
            gate = "file"
            path = "/run/wifi-watch/deny"

            [server]
            bind_addr = "0.0.0.0:9000"
        "#;
        let cfg = load_config_from_toml_str(toml).unwrap();
        assert_eq!(cfg.watch.networks, vec!["Home", "Office"]);
        assert_eq!(cfg.watch.scan_interval, Duration::from_secs(10));
        assert_eq!(cfg.watch.store_path, Some(PathBuf::from("/tmp/watched.json")));
        assert_eq!(cfg.scanner.kind, ScannerKind::Mock);
        assert_eq!(cfg.scanner.mock_scans.len(), 2);
        assert_eq!(cfg.notifier.kind, NotifierKind::Desktop);
        assert_eq!(cfg.notifier.render_body("Cafe"), "Cafe nearby");
        assert_eq!(
            cfg.permission.gate,
            GateKind::File(PathBuf::from("/run/wifi-watch/deny"))
        );
        assert_eq!(cfg.server.bind_addr.port(), 9000);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let bad_addr = "[server]\nbind_addr = \"not-an-addr\"";
        assert!(matches!(load_config_from_toml_str(bad_addr), Err(Error::Config(_))));

        let bad_scanner = "[scanner]\nbackend = \"iwd\"";
        assert!(matches!(load_config_from_toml_str(bad_scanner), Err(Error::Config(_))));

        let file_without_path = "[permission]\ngate = \"file\"";
        assert!(matches!(
            load_config_from_toml_str(file_without_path),
            Err(Error::Config(_))
        ));

        let zero_interval = "[watch]\nscan_interval_secs = 0";
        assert!(matches!(load_config_from_toml_str(zero_interval), Err(Error::Config(_))));
    }

    #[test]
    fn shipped_example_config_parses() {
        const EXAMPLE: &str = include_str!("../../configs/wifi-watch.toml");
        let cfg = load_config_from_toml_str(EXAMPLE).unwrap();
        assert_eq!(cfg.watch.networks, vec!["Home", "Office"]);
        assert_eq!(cfg.scanner.kind, ScannerKind::Nmcli);
    }

    #[test]
    fn malformed_toml_is_parse_error() {
        assert!(matches!(
            load_config_from_toml_str("[watch"),
            Err(Error::TomlDe(_))
        ));
    }
}
