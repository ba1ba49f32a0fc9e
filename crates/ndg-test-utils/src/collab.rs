//! Scriptable fakes for the daemon's collaborators.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ndg_core::BoxFuture;
use ndg_core::comm::payload::{
    CtrlConn, CtrlConnPerm, CtrlConnType, LightningCtrlConn, LightningErrorCode,
    LightningReport, Mnemonic, NetworkReport, OnchainReport, Settings, SysupdatesChannel,
    SysupdatesSettings,
};
use ndg_core::daemon::collab::{
    ChainNode, CollabError, Collaborators, LightningNode, SettingsStore, SystemControl,
    WifiControl,
};

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().expect("fake state poisoned")
}

/// Wifi that reports a fixed address and records connect attempts.
#[derive(Debug, Default)]
pub struct FakeWifi {
    pub report: Mutex<NetworkReport>,
    pub scans: AtomicUsize,
    pub connected: Mutex<Vec<String>>,
}

impl FakeWifi {
    pub fn new() -> Self {
        Self {
            report: Mutex::new(NetworkReport {
                ipaddrs: vec!["192.168.1.20".into()],
                wifi_ssid: Some("home".into()),
                wifi_scan_networks: Vec::new(),
            }),
            ..Self::default()
        }
    }
}

impl WifiControl for FakeWifi {
    fn network_report(&self, scan: bool) -> BoxFuture<'_, Result<NetworkReport, CollabError>> {
        Box::pin(async move {
            let mut report = lock(&self.report).clone();
            if scan {
                self.scans.fetch_add(1, Ordering::SeqCst);
                report.wifi_scan_networks = vec!["home".into(), "cafe".into()];
            }
            Ok(report)
        })
    }

    fn connect<'a>(
        &'a self,
        ssid: &'a str,
        _password: &'a str,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.connected).push(ssid.to_owned());
            Ok(())
        })
    }
}

/// A chain node with a settable report.
#[derive(Debug, Default)]
pub struct FakeChain {
    pub report: Mutex<OnchainReport>,
}

impl ChainNode for FakeChain {
    fn onchain_report(&self) -> BoxFuture<'_, Result<OnchainReport, CollabError>> {
        Box::pin(async move { Ok(lock(&self.report).clone()) })
    }
}

/// A lightning node whose report result is scripted.
#[derive(Debug)]
pub struct FakeLightning {
    pub report: Mutex<Result<LightningReport, CollabError>>,
    pub genseed_calls: AtomicUsize,
    pub wallets: Mutex<Vec<Mnemonic>>,
    pub resets: AtomicUsize,
}

impl Default for FakeLightning {
    fn default() -> Self {
        Self {
            report: Mutex::new(Ok(LightningReport {
                version: "0.17.0-beta".into(),
                alias: "ndg-test".into(),
                ..LightningReport::default()
            })),
            genseed_calls: AtomicUsize::new(0),
            wallets: Mutex::new(Vec::new()),
            resets: AtomicUsize::new(0),
        }
    }
}

impl FakeLightning {
    /// A node without a wallet.
    pub fn uninitialized() -> Self {
        let node = Self::default();
        node.fail_report(CollabError::Lightning(LightningErrorCode::Uninitialized));
        node
    }

    pub fn fail_report(&self, err: CollabError) {
        *lock(&self.report) = Err(err);
    }

    pub fn genseed_calls(&self) -> usize {
        self.genseed_calls.load(Ordering::SeqCst)
    }
}

impl LightningNode for FakeLightning {
    fn report(&self) -> BoxFuture<'_, Result<LightningReport, CollabError>> {
        Box::pin(async move { lock(&self.report).clone() })
    }

    fn ctrlconn(&self) -> BoxFuture<'_, Result<LightningCtrlConn, CollabError>> {
        Box::pin(async move {
            Ok(LightningCtrlConn {
                conns: vec![CtrlConn {
                    url: "lndconnect://192.168.1.20:10009?macaroon=abc".into(),
                    typ: CtrlConnType::LndRpc,
                    perm: CtrlConnPerm::Admin,
                }],
            })
        })
    }

    fn genseed(&self) -> BoxFuture<'_, Result<Mnemonic, CollabError>> {
        Box::pin(async move {
            self.genseed_calls.fetch_add(1, Ordering::SeqCst);
            Ok(Mnemonic::new(
                (1..=24).map(|i| format!("word{i}")).collect(),
            ))
        })
    }

    fn init_wallet<'a>(&'a self, mnemonic: &'a Mnemonic) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.wallets).push(mnemonic.clone());
            *lock(&self.report) = Ok(LightningReport::default());
            Ok(())
        })
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), CollabError>> {
        Box::pin(async move {
            self.resets.fetch_add(1, Ordering::SeqCst);
            *lock(&self.report) = Err(CollabError::Lightning(LightningErrorCode::Uninitialized));
            Ok(())
        })
    }
}

/// Host control that records what it was asked to do.
#[derive(Debug, Default)]
pub struct FakeSystem {
    failing: Mutex<HashSet<String>>,
    hanging: Mutex<HashSet<String>>,
    pub stopped: Mutex<Vec<String>>,
    pub hostnames: Mutex<Vec<String>>,
    powered_off: AtomicBool,
}

impl FakeSystem {
    /// Make stopping `name` fail.
    pub fn fail_service(&self, name: &str) {
        lock(&self.failing).insert(name.to_owned());
    }

    /// Make stopping `name` never finish.
    pub fn hang_service(&self, name: &str) {
        lock(&self.hanging).insert(name.to_owned());
    }

    /// Services a stop was attempted for, in attempt order.
    pub fn stop_attempts(&self) -> Vec<String> {
        lock(&self.stopped).clone()
    }

    pub fn powered_off(&self) -> bool {
        self.powered_off.load(Ordering::SeqCst)
    }
}

impl SystemControl for FakeSystem {
    fn stop_service<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.stopped).push(name.to_owned());
            let hangs = lock(&self.hanging).contains(name);
            if hangs {
                tokio::time::sleep(timeout * 10).await;
            }
            if lock(&self.failing).contains(name) {
                return Err(CollabError::Failed(format!("{name}: unit not loaded")));
            }
            Ok(())
        })
    }

    fn power_off(&self) -> BoxFuture<'_, Result<(), CollabError>> {
        Box::pin(async move {
            self.powered_off.store(true, Ordering::SeqCst);
            Ok(())
        })
    }

    fn set_hostname<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.hostnames).push(name.to_owned());
            Ok(())
        })
    }
}

/// In-memory settings with an optional screen-lock pincode.
#[derive(Debug)]
pub struct FakeSettings {
    pub settings: Mutex<Settings>,
    pincode: Mutex<Option<String>>,
}

impl Default for FakeSettings {
    fn default() -> Self {
        Self {
            settings: Mutex::new(Settings {
                hostname: "nakamochi".into(),
                sysupdates: SysupdatesSettings {
                    channel: SysupdatesChannel::Master,
                },
                slock_enabled: false,
            }),
            pincode: Mutex::new(None),
        }
    }
}

impl FakeSettings {
    /// Settings with the screen lock enabled for `pincode`.
    pub fn locked(pincode: &str) -> Self {
        let store = Self::default();
        lock(&store.settings).slock_enabled = true;
        *lock(&store.pincode) = Some(pincode.to_owned());
        store
    }

    pub fn current(&self) -> Settings {
        lock(&self.settings).clone()
    }
}

impl SettingsStore for FakeSettings {
    fn settings(&self) -> BoxFuture<'_, Result<Settings, CollabError>> {
        Box::pin(async move { Ok(self.current()) })
    }

    fn switch_sysupdates(
        &self,
        channel: SysupdatesChannel,
    ) -> BoxFuture<'_, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.settings).sysupdates.channel = channel;
            Ok(())
        })
    }

    fn set_nodename<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            lock(&self.settings).hostname = name.to_owned();
            Ok(())
        })
    }

    fn unlock<'a>(&'a self, pincode: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            match lock(&self.pincode).as_deref() {
                Some(expected) if expected != pincode => Err(CollabError::IncorrectPincode),
                _ => Ok(()),
            }
        })
    }

    fn set_pincode<'a>(
        &'a self,
        pincode: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            *lock(&self.pincode) = pincode.map(str::to_owned);
            lock(&self.settings).slock_enabled = pincode.is_some();
            Ok(())
        })
    }
}

/// One of each fake, kept by the test to inspect after the daemon runs.
#[derive(Debug, Clone)]
pub struct Fakes {
    pub wifi: Arc<FakeWifi>,
    pub chain: Arc<FakeChain>,
    pub lightning: Arc<FakeLightning>,
    pub system: Arc<FakeSystem>,
    pub settings: Arc<FakeSettings>,
}

impl Default for Fakes {
    fn default() -> Self {
        Self {
            wifi: Arc::new(FakeWifi::new()),
            chain: Arc::new(FakeChain::default()),
            lightning: Arc::new(FakeLightning::default()),
            system: Arc::new(FakeSystem::default()),
            settings: Arc::new(FakeSettings::default()),
        }
    }
}

impl Fakes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lightning(mut self, lightning: FakeLightning) -> Self {
        self.lightning = Arc::new(lightning);
        self
    }

    pub fn with_settings(mut self, settings: FakeSettings) -> Self {
        self.settings = Arc::new(settings);
        self
    }

    /// The fakes as the daemon sees them.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            wifi: self.wifi.clone(),
            chain: self.chain.clone(),
            lightning: self.lightning.clone(),
            system: self.system.clone(),
            settings: self.settings.clone(),
        }
    }
}
