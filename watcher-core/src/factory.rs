use crate::backends::gates::{AllowAll, CommandGate, FileGate};
use crate::backends::mock::MockScanner;
use crate::backends::nmcli::NmcliScanner;
use crate::backends::notifiers::{DesktopNotifier, LogNotifier};
use crate::backends::wpa_cli::WpaCliScanner;
use crate::config::{
    GateKind, NotifierConfig, NotifierKind, PermissionConfig, ScannerConfig, ScannerKind,
    WatchConfig,
};
use crate::registry::WatchRegistry;
use crate::store::JsonFileStore;
use crate::traits::{Notifier, PermissionGate, Scanner, WatchStore};
use crate::Result;
use std::sync::Arc;

/// 根据配置在运行时选择扫描后端
pub fn create_scanner(config: &ScannerConfig) -> Arc<dyn Scanner> {
    match config.kind {
        ScannerKind::Nmcli => {
            tracing::info!("📡 Scanner: nmcli on {}", config.interface);
            Arc::new(NmcliScanner::new(&config.interface))
        }
        ScannerKind::WpaCli => {
            tracing::info!("📡 Scanner: wpa_cli on {}", config.interface);
            Arc::new(WpaCliScanner::new(&config.interface, config.settle))
        }
        ScannerKind::Mock => {
            tracing::info!("🤖 Scanner: mock ({} scripted scans)", config.mock_scans.len());
            Arc::new(MockScanner::from_ssids(config.mock_scans.clone()))
        }
    }
}

pub fn create_notifier(config: &NotifierConfig) -> Arc<dyn Notifier> {
    let shared = Arc::new(config.clone());
    match config.kind {
        NotifierKind::Log => Arc::new(LogNotifier::new(shared)),
        NotifierKind::Desktop => Arc::new(DesktopNotifier::new(shared)),
    }
}

/// The command gate checks for the tool the chosen scanner shells out to.
pub fn create_gate(permission: &PermissionConfig, scanner: &ScannerConfig) -> Arc<dyn PermissionGate> {
    match &permission.gate {
        GateKind::Allow => Arc::new(AllowAll),
        GateKind::File(path) => Arc::new(FileGate::new(path)),
        GateKind::Command => match scanner.kind {
            ScannerKind::Nmcli => Arc::new(CommandGate::new("nmcli")),
            ScannerKind::WpaCli => Arc::new(CommandGate::new("wpa_cli")),
            ScannerKind::Mock => Arc::new(AllowAll),
        },
    }
}

pub fn create_store(config: &WatchConfig) -> Option<Arc<dyn WatchStore>> {
    config.store_path.as_ref().map(|path| {
        tracing::info!("💾 Watch list persisted to {}", path.display());
        Arc::new(JsonFileStore::new(path)) as Arc<dyn WatchStore>
    })
}

/// Initial watched set. A saved list wins over `watch.networks`; the
/// configured networks only seed a store that has never been written.
pub fn build_registry(config: &WatchConfig, store: Option<&dyn WatchStore>) -> Result<WatchRegistry> {
    let saved = match store {
        Some(store) => store.load()?,
        None => None,
    };
    let registry = match saved {
        Some(ssids) => {
            tracing::info!("Restored {} watched networks from store", ssids.len());
            WatchRegistry::with_networks(ssids)
        }
        None => WatchRegistry::with_networks(config.networks.iter().cloned()),
    };
    tracing::info!("Watching {} networks", registry.len());
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_toml_str;
    use crate::store::MemoryStore;
    use crate::traits::ssids_of;

    #[tokio::test]
    async fn mock_config_builds_working_scanner() {
        let cfg = load_config_from_toml_str(
            "[scanner]\nbackend = \"mock\"\nmock_scans = [[\"Home\", \"Guest\"]]\n\
             [permission]\ngate = \"command\"",
        )
        .unwrap();

        let scanner = create_scanner(&cfg.scanner);
        assert_eq!(ssids_of(&scanner.scan().await.unwrap()), vec!["Home", "Guest"]);
        assert!(create_gate(&cfg.permission, &cfg.scanner).has_required_access());
    }

    #[test]
    fn saved_list_replaces_configured_networks() {
        let cfg = load_config_from_toml_str("[watch]\nnetworks = [\"Home\", \"\"]").unwrap();
        let store = MemoryStore::new(vec!["Office".into()]);

        let registry = build_registry(&cfg.watch, Some(&store as &dyn WatchStore)).unwrap();
        assert_eq!(registry.watched(), vec!["Office".to_string()]);

        let without_store = build_registry(&cfg.watch, None).unwrap();
        assert_eq!(without_store.watched(), vec!["Home".to_string()]);
    }

    #[test]
    fn removal_of_configured_network_survives_restart() {
        let cfg = load_config_from_toml_str("[watch]\nnetworks = [\"Home\", \"Office\"]").unwrap();
        let store = MemoryStore::default();

        // 首次启动：store 为空，使用配置中的网络
        let mut registry = build_registry(&cfg.watch, Some(&store as &dyn WatchStore)).unwrap();
        assert_eq!(registry.len(), 2);
        registry.remove("Home");
        store.save(&registry.watched()).unwrap();

        let restarted = build_registry(&cfg.watch, Some(&store as &dyn WatchStore)).unwrap();
        assert_eq!(restarted.watched(), vec!["Office".to_string()]);
    }

    #[test]
    fn store_only_when_path_configured() {
        let cfg = load_config_from_toml_str("").unwrap();
        assert!(create_store(&cfg.watch).is_none());

        let cfg = load_config_from_toml_str("[watch]\nstore_path = \"/tmp/w.json\"").unwrap();
        assert!(create_store(&cfg.watch).is_some());
    }
}
