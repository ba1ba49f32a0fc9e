//! Interfaces to the subsystems the daemon drives on behalf of the UI.
//!
//! Each trait returns a [`BoxFuture`] so implementations can be held as
//! `Arc<dyn Trait>` and called from spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use crate::BoxFuture;
use crate::comm::payload::{
    LightningCtrlConn, LightningErrorCode, LightningReport, Mnemonic, NetworkReport,
    OnchainReport, Settings, SysupdatesChannel,
};

/// Errors reported by a collaborator.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CollabError {
    #[error("{0} is not available on this device")]
    Unavailable(&'static str),

    #[error("lightning node: {0:?}")]
    Lightning(LightningErrorCode),

    #[error("incorrect pincode")]
    IncorrectPincode,

    #[error("{0}")]
    Failed(String),
}

impl CollabError {
    /// The `lightning_error` code to show for this failure.
    pub fn lightning_code(&self) -> LightningErrorCode {
        match self {
            CollabError::Lightning(code) => *code,
            _ => LightningErrorCode::NotReady,
        }
    }
}

/// Wifi station control.
pub trait WifiControl: Send + Sync {
    /// Current network status, scanning for networks first if `scan`.
    fn network_report(&self, scan: bool) -> BoxFuture<'_, Result<NetworkReport, CollabError>>;

    /// Join a network.
    fn connect<'a>(
        &'a self,
        ssid: &'a str,
        password: &'a str,
    ) -> BoxFuture<'a, Result<(), CollabError>>;
}

/// Bitcoin chain node.
pub trait ChainNode: Send + Sync {
    fn onchain_report(&self) -> BoxFuture<'_, Result<OnchainReport, CollabError>>;
}

/// Lightning node.
pub trait LightningNode: Send + Sync {
    /// Node status. A node that cannot report fails with
    /// [`CollabError::Lightning`] carrying the reason.
    fn report(&self) -> BoxFuture<'_, Result<LightningReport, CollabError>>;

    /// Connection details for external wallet apps.
    fn ctrlconn(&self) -> BoxFuture<'_, Result<LightningCtrlConn, CollabError>>;

    /// Generate a fresh wallet seed.
    fn genseed(&self) -> BoxFuture<'_, Result<Mnemonic, CollabError>>;

    /// Create the wallet from a seed the user confirmed.
    fn init_wallet<'a>(&'a self, mnemonic: &'a Mnemonic) -> BoxFuture<'a, Result<(), CollabError>>;

    /// Wipe the wallet so a new one can be created.
    fn reset(&self) -> BoxFuture<'_, Result<(), CollabError>>;
}

/// Host-level control: services, power, hostname.
pub trait SystemControl: Send + Sync {
    /// Stop a system service, waiting up to `timeout` for it to exit.
    fn stop_service<'a>(
        &'a self,
        name: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<(), CollabError>>;

    /// Power the host off.
    fn power_off(&self) -> BoxFuture<'_, Result<(), CollabError>>;

    fn set_hostname<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>>;
}

/// Persistent node settings and the screen lock.
pub trait SettingsStore: Send + Sync {
    fn settings(&self) -> BoxFuture<'_, Result<Settings, CollabError>>;

    fn switch_sysupdates(&self, channel: SysupdatesChannel)
    -> BoxFuture<'_, Result<(), CollabError>>;

    fn set_nodename<'a>(&'a self, name: &'a str) -> BoxFuture<'a, Result<(), CollabError>>;

    /// Check a screen-unlock pincode.
    fn unlock<'a>(&'a self, pincode: &'a str) -> BoxFuture<'a, Result<(), CollabError>>;

    /// Set the screen-lock pincode, or disable the lock with `None`.
    fn set_pincode<'a>(&'a self, pincode: Option<&'a str>)
    -> BoxFuture<'a, Result<(), CollabError>>;
}

/// Every collaborator the daemon talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub wifi: Arc<dyn WifiControl>,
    pub chain: Arc<dyn ChainNode>,
    pub lightning: Arc<dyn LightningNode>,
    pub system: Arc<dyn SystemControl>,
    pub settings: Arc<dyn SettingsStore>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lightning_code_mapping() {
        assert_eq!(
            CollabError::Lightning(LightningErrorCode::Locked).lightning_code(),
            LightningErrorCode::Locked
        );
        assert_eq!(
            CollabError::Unavailable("lightning node").lightning_code(),
            LightningErrorCode::NotReady
        );
        assert_eq!(
            CollabError::Failed("rpc timeout".into()).lightning_code(),
            LightningErrorCode::NotReady
        );
    }
}
