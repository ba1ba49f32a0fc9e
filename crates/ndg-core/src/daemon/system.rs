//! Built-in collaborators.
//!
//! [`CommandSystemControl`] runs the configured host commands and
//! [`ConfigSettings`] serves settings from the config file. Wifi, chain and
//! lightning access need device-specific clients; until one is wired in the
//! `Unavailable*` types answer every request with
//! [`CollabError::Unavailable`].

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ndg_config::{AppConfig, PowerOffConfig, SettingsConfig, SystemConfig};
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::collab::{
    ChainNode, CollabError, Collaborators, LightningNode, SettingsStore, SystemControl,
    WifiControl,
};
use crate::BoxFuture;
use crate::comm::payload::{
    LightningCtrlConn, LightningReport, Mnemonic, NetworkReport, OnchainReport, Settings,
    SysupdatesChannel, SysupdatesSettings,
};

/// Collaborators for a device without node clients: host commands and
/// settings from `config`, everything else unavailable.
pub fn default_collaborators(config: &AppConfig) -> Collaborators {
    Collaborators {
        wifi: Arc::new(UnavailableWifi),
        chain: Arc::new(UnavailableChain),
        lightning: Arc::new(UnavailableLightning),
        system: Arc::new(CommandSystemControl::from_config(
            &config.poweroff,
            &config.system,
        )),
        settings: Arc::new(ConfigSettings::from_config(&config.settings)),
    }
}

/// Substitute `{key}` placeholders in every argument.
fn render(template: &[String], vars: &[(&str, &str)]) -> Vec<String> {
    template
        .iter()
        .map(|arg| {
            vars.iter().fold(arg.clone(), |arg, (key, value)| {
                arg.replace(&format!("{{{key}}}"), value)
            })
        })
        .collect()
}

async fn run_command(argv: &[String]) -> Result<(), CollabError> {
    let Some((program, args)) = argv.split_first() else {
        return Err(CollabError::Failed("command must not be empty".to_string()));
    };
    debug!(command = ?argv, "Running host command");

    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| CollabError::Failed(format!("{program}: spawn failed: {e}")))?;

    if output.status.success() {
        Ok(())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(CollabError::Failed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )))
    }
}

/// System control through host commands.
///
/// Templates may use `{name}` (service or host name) and `{timeout}`
/// (whole seconds). A non-zero exit status is an error.
#[derive(Debug, Clone)]
pub struct CommandSystemControl {
    stop_command: Vec<String>,
    poweroff_command: Vec<String>,
    hostname_command: Vec<String>,
}

impl CommandSystemControl {
    pub fn from_config(poweroff: &PowerOffConfig, system: &SystemConfig) -> Self {
        Self {
            stop_command: poweroff.stop_command.clone(),
            poweroff_command: poweroff.poweroff_command.clone(),
            hostname_command: system.hostname_command.clone(),
        }
    }
}

impl SystemControl for CommandSystemControl {
    fn stop_service<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            let secs = timeout.as_secs().to_string();
            let argv = render(&self.stop_command, &[("name", name), ("timeout", &secs)]);
            run_command(&argv).await
        })
    }

    fn power_off(&self) -> BoxFuture<'_, Result<(), CollabError>> {
        Box::pin(async move {
            info!("Powering off host");
            run_command(&self.poweroff_command).await
        })
    }

    fn set_hostname<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move {
            let argv = render(&self.hostname_command, &[("name", name)]);
            run_command(&argv).await
        })
    }
}

/// Settings held in memory, seeded from the `[settings]` section.
///
/// The screen lock is never enabled: unlocking always succeeds and setting a
/// pincode is unavailable.
#[derive(Debug)]
pub struct ConfigSettings {
    current: Mutex<Settings>,
}

impl ConfigSettings {
    pub fn from_config(config: &SettingsConfig) -> Self {
        let channel = config.sysupdates.parse().unwrap_or_else(|e| {
            warn!(error = %e, "Falling back to master sysupdates channel");
            SysupdatesChannel::Master
        });
        Self {
            current: Mutex::new(Settings {
                hostname: config.hostname.clone(),
                sysupdates: SysupdatesSettings { channel },
                slock_enabled: false,
            }),
        }
    }

    fn update(&self, f: impl FnOnce(&mut Settings)) -> Result<(), CollabError> {
        let mut current = self
            .current
            .lock()
            .map_err(|_| CollabError::Failed("settings lock poisoned".to_string()))?;
        f(&mut current);
        Ok(())
    }
}

impl SettingsStore for ConfigSettings {
    fn settings(&self) -> BoxFuture<'_, Result<Settings, CollabError>> {
        Box::pin(async move {
            self.current
                .lock()
                .map(|s| s.clone())
                .map_err(|_| CollabError::Failed("settings lock poisoned".to_string()))
        })
    }

    fn switch_sysupdates(
        &self,
        channel: SysupdatesChannel,
    ) -> BoxFuture<'_, Result<(), CollabError>> {
        Box::pin(async move { self.update(|s| s.sysupdates.channel = channel) })
    }

    fn set_nodename<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move { self.update(|s| s.hostname = name.to_string()) })
    }

    fn unlock<'a>(&'a self, _pincode: &'a str) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move { Ok(()) })
    }

    fn set_pincode<'a>(
        &'a self,
        _pincode: Option<&'a str>,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move { Err(CollabError::Unavailable("screen lock")) })
    }
}

/// Wifi control for devices without a wifi client.
#[derive(Debug, Default)]
pub struct UnavailableWifi;

impl WifiControl for UnavailableWifi {
    fn network_report(&self, _scan: bool) -> BoxFuture<'_, Result<NetworkReport, CollabError>> {
        Box::pin(async move { Err(CollabError::Unavailable("wifi control")) })
    }

    fn connect<'a>(
        &'a self,
        _ssid: &'a str,
        _password: &'a str,
    ) -> BoxFuture<'a, Result<(), CollabError>> {
        Box::pin(async move { Err(CollabError::Unavailable("wifi control")) })
    }
}

/// Chain node for devices without a bitcoind client.
#[derive(Debug, Default)]
pub struct UnavailableChain;

impl ChainNode for UnavailableChain {
    fn onchain_report(&self) -> BoxFuture<'_, Result<OnchainReport, CollabError>> {
        Box::pin(async move { Err(CollabError::Unavailable("chain node")) })
    }
}

/// Lightning node for devices without an lnd client.
#[derive(Debug, Default)]
pub struct UnavailableLightning;

impl UnavailableLightning {
    fn unavailable<T>(&self) -> BoxFuture<'_, Result<T, CollabError>>
    where
        T: Send + 'static,
    {
        Box::pin(async move { Err(CollabError::Unavailable("lightning node")) })
    }
}

impl LightningNode for UnavailableLightning {
    fn report(&self) -> BoxFuture<'_, Result<LightningReport, CollabError>> {
        self.unavailable()
    }

    fn ctrlconn(&self) -> BoxFuture<'_, Result<LightningCtrlConn, CollabError>> {
        self.unavailable()
    }

    fn genseed(&self) -> BoxFuture<'_, Result<Mnemonic, CollabError>> {
        self.unavailable()
    }

    fn init_wallet<'a>(&'a self, _mnemonic: &'a Mnemonic) -> BoxFuture<'a, Result<(), CollabError>> {
        self.unavailable()
    }

    fn reset(&self) -> BoxFuture<'_, Result<(), CollabError>> {
        self.unavailable()
    }
}
