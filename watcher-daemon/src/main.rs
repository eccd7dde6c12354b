use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use watcher_core::{
    config::{self, AppConfig},
    factory,
    monitor::{MonitorOptions, ScanMonitor},
    registry::SharedRegistry,
    web_server::{self, AppState},
};

const CONFIG_ENV: &str = "WIFI_WATCH_CONFIG";

/// 配置文件路径：命令行第一个参数优先，其次是环境变量
fn config_path() -> Option<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from))
}

fn load_config() -> Result<AppConfig> {
    match config_path() {
        Some(path) => config::load_config_from_path(&path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => {
            tracing::info!("No config file given, using built-in defaults");
            Ok(config::default_config()?)
        }
    }
}

async fn run() -> Result<()> {
    let cfg = load_config()?;

    // 1. 根据配置构建各个协作者，显式注入到 ScanMonitor 中
    let store = factory::create_store(&cfg.watch);
    let registry = SharedRegistry::new(
        factory::build_registry(&cfg.watch, store.as_deref())
            .context("Failed to load persisted watch list")?,
    );
    let scanner = factory::create_scanner(&cfg.scanner);
    let notifier = factory::create_notifier(&cfg.notifier);
    let gate = factory::create_gate(&cfg.permission, &cfg.scanner);

    if !gate.has_required_access() {
        // 不是致命错误：权限恢复后下一轮扫描会自动继续
        tracing::warn!("⚠️ Missing required permissions; scans will be skipped until granted");
    }

    let monitor = ScanMonitor::new(
        registry.clone(),
        scanner,
        notifier,
        gate,
        MonitorOptions {
            scan_interval: cfg.watch.scan_interval,
        },
    );

    // 2. 先绑定控制 API；端口被占用属于启动失败
    let listener = web_server::bind(cfg.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind control API on {}", cfg.server.bind_addr))?;

    // 3. 后台扫描循环
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scan_loop = {
        let monitor = monitor.clone();
        tokio::spawn(async move { monitor.run(shutdown_rx).await })
    };

    // 4. 控制 API，Ctrl-C 时优雅退出
    let state = Arc::new(AppState::new(registry, monitor, store));
    let mut server_shutdown = shutdown_tx.subscribe();
    let mut server = tokio::spawn(web_server::serve(listener, state, async move {
        let _ = server_shutdown.wait_for(|stop| *stop).await;
    }));

    let server_result = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl-C")?;
            tracing::info!("🛑 Shutdown requested.");
            let _ = shutdown_tx.send(true);
            server.await
        }
        // 服务器提前退出，扫描循环也随之停止
        finished = &mut server => {
            tracing::error!("❌ Control API stopped unexpectedly");
            let _ = shutdown_tx.send(true);
            finished
        }
    };

    scan_loop.await.context("Scan loop task panicked")?;
    server_result
        .context("Web server task panicked")?
        .context("Web server failed")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. 初始化日志（这是入口点的职责）
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // 2. 调用库的核心逻辑
    if let Err(e) = run().await {
        // 3. 处理顶层错误
        tracing::error!("❌ wifi-watch failed: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}
