//! Scan-event handler.
//!
//! `ScanMonitor` owns handles to the shared registry and its three
//! collaborators. One cycle is: check the gate, trigger a scan, read the
//! results, feed them to the registry, notify once per newly appeared
//! network.

use crate::registry::SharedRegistry;
use crate::traits::{Notifier, PermissionGate, Scanner, ssids_of};
use crate::{Error, Result};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub scan_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct ScanMonitor {
    registry: SharedRegistry,
    scanner: Arc<dyn Scanner>,
    notifier: Arc<dyn Notifier>,
    gate: Arc<dyn PermissionGate>,
    options: MonitorOptions,
    // 同一时间只跑一轮扫描（定时任务和 /api/scan 可能同时触发）
    cycle: Arc<tokio::sync::Mutex<()>>,
}

impl ScanMonitor {
    pub fn new(
        registry: SharedRegistry,
        scanner: Arc<dyn Scanner>,
        notifier: Arc<dyn Notifier>,
        gate: Arc<dyn PermissionGate>,
        options: MonitorOptions,
    ) -> Self {
        Self {
            registry,
            scanner,
            notifier,
            gate,
            options,
            cycle: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Requests a scan from the radio. A denied gate is reported as
    /// `Error::PermissionDenied` so the caller can surface it; watch state
    /// is untouched.
    pub async fn start_scan(&self) -> Result<()> {
        if !self.gate.has_required_access() {
            tracing::warn!("⚠️ Missing required permissions, scan not started");
            return Err(Error::PermissionDenied(
                "missing required permissions for scanning".into(),
            ));
        }
        self.scanner.trigger_scan().await
    }

    /// Consumes the scanner's current results and notifies for every
    /// watched network that just came into range. Without access the
    /// results are ignored.
    pub async fn handle_scan_results(&self) -> Result<HashSet<String>> {
        if !self.gate.has_required_access() {
            tracing::debug!("Scan results ignored: access not granted");
            return Ok(HashSet::new());
        }

        let networks = self.scanner.scan_results().await?;
        let observed = ssids_of(&networks);
        // 锁只在这一行内持有，通知时已经释放
        let appeared = self.registry.process_scan(&observed);

        tracing::debug!(
            "Scan saw {} networks, {} newly in range",
            observed.len(),
            appeared.len()
        );

        let mut ordered: Vec<&String> = appeared.iter().collect();
        ordered.sort();
        for ssid in ordered {
            // 通知之前再确认一次，权限可能在扫描期间被撤销
            if !self.gate.has_required_access() {
                tracing::warn!(ssid = %ssid, "⚠️ Notification suppressed: access revoked");
                continue;
            }
            tracing::info!(ssid = %ssid, "Watched network is now in range");
            self.notifier.notify(ssid).await;
        }

        Ok(appeared)
    }

    /// Runs one full cycle: trigger, read, notify.
    pub async fn scan_once(&self) -> Result<HashSet<String>> {
        let _guard = self.cycle.lock().await;
        self.start_scan().await?;
        self.handle_scan_results().await
    }

    /// Scans on a fixed interval until `shutdown` flips to `true` or its
    /// sender is dropped. Per-cycle errors are logged, never fatal.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "🚀 Scan loop started (every {:?})",
            self.options.scan_interval
        );
        let mut ticker = tokio::time::interval(self.options.scan_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        'scanning: loop {
            tokio::select! {
                _ = ticker.tick() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break 'scanning;
                    }
                    continue;
                }
            }

            // 扫描进行中也要响应退出信号，卡住的扫描器不能阻塞关闭
            let cycle = self.scan_once();
            tokio::pin!(cycle);
            loop {
                tokio::select! {
                    result = &mut cycle => {
                        log_cycle(result);
                        break;
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            tracing::debug!("Scan cycle abandoned on shutdown");
                            break 'scanning;
                        }
                    }
                }
            }
        }

        tracing::info!("🛑 Scan loop stopped.");
    }
}

fn log_cycle(result: Result<HashSet<String>>) {
    match result {
        Ok(_) => {}
        Err(Error::PermissionDenied(msg)) => tracing::warn!("⚠️ Scan skipped: {}", msg),
        Err(e) => tracing::error!("❌ Scan cycle failed: {}", e),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::backends::gates::{AllowAll, DenyAll};
    use crate::backends::mock::MockScanner;
    use crate::registry::WatchRegistry;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Records every notification in order.
    #[derive(Default)]
    pub(crate) struct RecordingNotifier {
        pub(crate) seen: Mutex<Vec<String>>,
    }

    impl RecordingNotifier {
        pub(crate) fn seen(&self) -> Vec<String> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn notify(&self, ssid: &str) {
            self.seen.lock().unwrap().push(ssid.to_string());
        }
    }

    /// A gate that can be flipped at runtime.
    pub(crate) struct SwitchGate(pub(crate) AtomicBool);

    impl PermissionGate for SwitchGate {
        fn has_required_access(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    /// Grants the first `allowed` checks, denies every one after.
    struct CountingGate {
        calls: AtomicUsize,
        allowed: usize,
    }

    impl PermissionGate for CountingGate {
        fn has_required_access(&self) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst) < self.allowed
        }
    }

    /// A radio that never finishes its scan.
    struct StuckScanner;

    #[async_trait]
    impl Scanner for StuckScanner {
        async fn trigger_scan(&self) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }

        async fn scan_results(&self) -> Result<Vec<crate::traits::Network>> {
            Ok(Vec::new())
        }
    }

    fn monitor_with(
        watched: &[&str],
        scans: Vec<Vec<&str>>,
        gate: Arc<dyn PermissionGate>,
    ) -> (ScanMonitor, Arc<MockScanner>, Arc<RecordingNotifier>) {
        let registry = SharedRegistry::new(WatchRegistry::with_networks(watched.iter().copied()));
        let scanner = Arc::new(MockScanner::from_ssids(scans));
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = ScanMonitor::new(
            registry,
            scanner.clone(),
            notifier.clone(),
            gate,
            MonitorOptions::default(),
        );
        (monitor, scanner, notifier)
    }

    #[tokio::test]
    async fn notifies_once_per_appearance() {
        let (monitor, _, notifier) = monitor_with(
            &["Home"],
            vec![vec!["Home"], vec!["Home"], vec![], vec!["Home"]],
            Arc::new(AllowAll),
        );

        for _ in 0..4 {
            monitor.scan_once().await.unwrap();
        }

        assert_eq!(notifier.seen(), vec!["Home", "Home"]);
    }

    #[tokio::test]
    async fn office_then_cafe_scenario() {
        let (monitor, _, notifier) = monitor_with(
            &["Office", "Cafe"],
            vec![vec!["Cafe", "Guest"], vec!["Office", "Cafe"]],
            Arc::new(AllowAll),
        );

        let first = monitor.scan_once().await.unwrap();
        assert_eq!(first, HashSet::from(["Cafe".to_string()]));
        let second = monitor.scan_once().await.unwrap();
        assert_eq!(second, HashSet::from(["Office".to_string()]));
        assert_eq!(notifier.seen(), vec!["Cafe", "Office"]);
    }

    #[tokio::test]
    async fn denied_gate_blocks_scan_and_keeps_state() {
        let (monitor, scanner, notifier) =
            monitor_with(&["Home"], vec![vec!["Home"]], Arc::new(DenyAll));

        let result = monitor.scan_once().await;
        assert!(matches!(result, Err(Error::PermissionDenied(_))));
        assert_eq!(scanner.trigger_count(), 0);
        assert!(notifier.seen().is_empty());

        assert!(monitor.handle_scan_results().await.unwrap().is_empty());
        assert_eq!(monitor.registry().watched(), vec!["Home".to_string()]);
        assert!(monitor.registry().present().is_empty());
    }

    #[tokio::test]
    async fn results_ignored_until_access_granted() {
        let gate = Arc::new(SwitchGate(AtomicBool::new(true)));
        let (monitor, _, notifier) = monitor_with(&["Home"], vec![vec!["Home"]], gate.clone());

        monitor.start_scan().await.unwrap();
        gate.0.store(false, Ordering::SeqCst);
        assert!(monitor.handle_scan_results().await.unwrap().is_empty());

        gate.0.store(true, Ordering::SeqCst);
        let appeared = monitor.handle_scan_results().await.unwrap();
        assert_eq!(appeared, HashSet::from(["Home".to_string()]));
        assert_eq!(notifier.seen(), vec!["Home"]);
    }

    #[tokio::test]
    async fn access_revoked_before_notify_keeps_presence() {
        // 第 1 次：start_scan，第 2 次：读取结果之前，第 3 次：通知之前
        let gate = Arc::new(CountingGate {
            calls: AtomicUsize::new(0),
            allowed: 2,
        });
        let (monitor, _, notifier) = monitor_with(&["Home"], vec![vec!["Home"]], gate.clone());

        let appeared = monitor.scan_once().await.unwrap();

        assert_eq!(appeared, HashSet::from(["Home".to_string()]));
        assert!(notifier.seen().is_empty());
        assert!(monitor.registry().lock().is_present("Home"));
        assert_eq!(gate.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn scanner_error_propagates() {
        let (monitor, scanner, notifier) =
            monitor_with(&["Home"], vec![vec!["Home"]], Arc::new(AllowAll));
        scanner.fail_next_trigger("interface down");

        assert!(matches!(monitor.scan_once().await, Err(Error::CommandFailed(_))));
        assert!(notifier.seen().is_empty());
        assert_eq!(monitor.scan_once().await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_loop_scans_until_shutdown() {
        let (monitor, scanner, notifier) =
            monitor_with(&["Home"], vec![vec![], vec!["Home"]], Arc::new(AllowAll));
        let (tx, rx) = watch::channel(false);

        let looping = monitor.clone();
        let handle = tokio::spawn(async move { looping.run(rx).await });

        // 第一次 tick 立即触发，之后每 30 秒一次
        tokio::time::sleep(Duration::from_secs(31)).await;
        tx.send(true).unwrap();
        handle.await.unwrap();

        assert_eq!(scanner.trigger_count(), 2);
        assert_eq!(notifier.seen(), vec!["Home"]);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_stuck_scan() {
        let registry = SharedRegistry::new(WatchRegistry::with_networks(["Home"]));
        let notifier = Arc::new(RecordingNotifier::default());
        let monitor = ScanMonitor::new(
            registry,
            Arc::new(StuckScanner),
            notifier.clone(),
            Arc::new(AllowAll),
            MonitorOptions::default(),
        );
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(async move { monitor.run(rx).await });
        tokio::time::sleep(Duration::from_secs(1)).await;
        tx.send(true).unwrap();

        let stopped = tokio::time::timeout(Duration::from_secs(5), handle).await;
        assert!(stopped.is_ok());
        assert!(notifier.seen().is_empty());
    }
}
