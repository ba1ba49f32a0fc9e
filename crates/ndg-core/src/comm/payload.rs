//! Payload shapes carried as JSON documents inside frames.
//!
//! Decoding ignores unknown fields, and fields added after a payload first
//! shipped carry `#[serde(default)]`, so either side can be upgraded first.

use std::fmt;
use std::str::FromStr;

use ndg_macros::Sensitive;
use serde::{Deserialize, Serialize};

/// Join a wifi network. Sent by the UI.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct WifiConnect {
    pub ssid: String,
    #[sensitive]
    pub password: String,
}

impl WifiConnect {
    pub fn new(ssid: &str, password: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }
}

/// Network status. Sent by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkReport {
    #[serde(default)]
    pub ipaddrs: Vec<String>,
    /// SSID of the currently joined network, if any.
    #[serde(default)]
    pub wifi_ssid: Option<String>,
    /// SSIDs seen in the last scan.
    #[serde(default)]
    pub wifi_scan_networks: Vec<String>,
}

/// Request a fresh [`NetworkReport`], optionally scanning for networks first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetNetworkReport {
    #[serde(default)]
    pub scan: bool,
}

/// Progress of the power-off sequence. Sent by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PowerOffProgress {
    pub services: Vec<ServiceProgress>,
}

/// One service's state within [`PowerOffProgress`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceProgress {
    pub name: String,
    pub stopped: bool,
    #[serde(default)]
    pub err: Option<String>,
}

/// Bitcoin chain node status. Sent by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnchainReport {
    pub height: u64,
    pub hash: String,
    /// Unix time of the tip block.
    pub timestamp: u64,
    pub sync: OnchainSync,
    pub mempool: Mempool,
    #[serde(default)]
    pub balance: Option<OnchainBalance>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnchainSync {
    /// Verification progress in `[0.0, 1.0]`.
    pub progress: f64,
    pub verifying: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mempool {
    pub loaded: bool,
    pub txcount: u64,
    /// Bytes in use.
    pub usage: u64,
    /// Maximum bytes.
    pub max: u64,
}

/// On-chain wallet balance in satoshis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OnchainBalance {
    /// Which wallet produced the numbers, e.g. "lnd".
    pub source: String,
    pub total: i64,
    pub confirmed: i64,
    pub unconfirmed: i64,
    #[serde(default)]
    pub locked: i64,
    #[serde(default)]
    pub reserved_for_anchors: i64,
}

/// Lightning node status. Sent by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningReport {
    pub version: String,
    pub pubkey: String,
    pub alias: String,
    pub npeers: u32,
    pub height: u64,
    pub hash: String,
    pub sync: LightningSync,
    #[serde(default)]
    pub uris: Vec<String>,
    pub totalbal: LightningBalance,
    #[serde(default)]
    pub totalfees: LightningFees,
    #[serde(default)]
    pub channels: Vec<LightningChannel>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningSync {
    pub chain: bool,
    pub graph: bool,
}

/// Channel balances summed over all channels, in satoshis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningBalance {
    pub local: i64,
    pub remote: i64,
    pub unsettled: i64,
    pub pending: i64,
}

/// Forwarding fees earned, in satoshis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningFees {
    pub day: u64,
    pub week: u64,
    pub month: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightningChannel {
    /// Short channel id; absent while pending.
    #[serde(default)]
    pub id: Option<String>,
    pub state: ChannelState,
    pub private: bool,
    /// Funding outpoint.
    pub point: String,
    pub peer_pubkey: String,
    #[serde(default)]
    pub peer_alias: String,
    pub capacity: i64,
    pub local_balance: i64,
    pub remote_balance: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelState {
    Active,
    Inactive,
    PendingOpen,
    PendingClose,
}

/// Why a lightning report could not be produced. Sent by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightningError {
    pub code: LightningErrorCode,
}

impl LightningError {
    pub fn new(code: LightningErrorCode) -> Self {
        Self { code }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LightningErrorCode {
    /// The node is not reachable or still starting.
    NotReady,
    /// The wallet exists but is locked.
    Locked,
    /// No wallet has been created yet.
    Uninitialized,
}

/// A wallet seed. Used both for the generated seed shown to the user and
/// for the seed sent back to initialize the wallet.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct Mnemonic {
    #[sensitive]
    pub mnemonic: Vec<String>,
}

impl Mnemonic {
    pub fn new(words: Vec<String>) -> Self {
        Self { mnemonic: words }
    }
}

/// Connection details for external wallet apps. Sent by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LightningCtrlConn {
    pub conns: Vec<CtrlConn>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CtrlConn {
    pub url: String,
    pub typ: CtrlConnType,
    pub perm: CtrlConnPerm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtrlConnType {
    LndRpc,
    LndHttp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CtrlConnPerm {
    Admin,
}

/// Node settings as shown in the settings panel. Sent by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub hostname: String,
    pub sysupdates: SysupdatesSettings,
    #[serde(default)]
    pub slock_enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SysupdatesSettings {
    pub channel: SysupdatesChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SysupdatesChannel {
    Master,
    Dev,
}

impl SysupdatesChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            SysupdatesChannel::Master => "master",
            SysupdatesChannel::Dev => "dev",
        }
    }
}

impl FromStr for SysupdatesChannel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(SysupdatesChannel::Master),
            "dev" => Ok(SysupdatesChannel::Dev),
            other => Err(format!("unknown sysupdates channel {other:?}")),
        }
    }
}

impl fmt::Display for SysupdatesChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Switch the system updates channel. Sent by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwitchSysupdates {
    pub channel: SysupdatesChannel,
}

/// Rename the node. Sent by the UI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetNodename {
    pub name: String,
}

/// Attempt to unlock the screen. Sent by the UI.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct UnlockScreen {
    #[sensitive]
    pub pincode: String,
}

/// Outcome of an [`UnlockScreen`] attempt. Sent by the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenUnlockResult {
    pub ok: bool,
    #[serde(default)]
    pub err: Option<String>,
}

/// Set or clear (`None`) the screen lock pincode. Sent by the UI.
#[derive(Clone, PartialEq, Serialize, Deserialize, Sensitive)]
pub struct SlockSetPincode {
    #[sensitive]
    #[serde(default)]
    pub pincode: Option<String>,
}
