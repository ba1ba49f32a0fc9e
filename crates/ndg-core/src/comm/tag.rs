//! Stable wire identifiers for every message variant.

use std::fmt;

/// A message variant's identifier on the wire.
///
/// Ordinals are append-only: the daemon and the UI are built and deployed
/// independently, so an ordinal is never reassigned or reused once shipped.
/// New variants get the next free ordinal at the end of the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MessageTag {
    Ping = 0x01,
    Pong = 0x02,
    PowerOff = 0x03,
    WifiConnect = 0x04,
    NetworkReport = 0x05,
    GetNetworkReport = 0x06,
    Standby = 0x07,
    Wakeup = 0x08,
    PowerOffProgress = 0x09,
    OnchainReport = 0x0a,
    LightningReport = 0x0b,
    LightningError = 0x0c,
    LightningGenseedResult = 0x0d,
    LightningInitWallet = 0x0e,
    LightningGetCtrlConn = 0x0f,
    LightningCtrlConn = 0x10,
    LightningReset = 0x11,
    Settings = 0x12,
    SwitchSysupdates = 0x13,
    SetNodename = 0x14,
    GetSettings = 0x15,
    LockScreen = 0x16,
    UnlockScreen = 0x17,
    ScreenUnlockResult = 0x18,
    SlockSetPincode = 0x19,
}

impl MessageTag {
    /// Every known tag, in ordinal order.
    pub const ALL: [MessageTag; 25] = [
        MessageTag::Ping,
        MessageTag::Pong,
        MessageTag::PowerOff,
        MessageTag::WifiConnect,
        MessageTag::NetworkReport,
        MessageTag::GetNetworkReport,
        MessageTag::Standby,
        MessageTag::Wakeup,
        MessageTag::PowerOffProgress,
        MessageTag::OnchainReport,
        MessageTag::LightningReport,
        MessageTag::LightningError,
        MessageTag::LightningGenseedResult,
        MessageTag::LightningInitWallet,
        MessageTag::LightningGetCtrlConn,
        MessageTag::LightningCtrlConn,
        MessageTag::LightningReset,
        MessageTag::Settings,
        MessageTag::SwitchSysupdates,
        MessageTag::SetNodename,
        MessageTag::GetSettings,
        MessageTag::LockScreen,
        MessageTag::UnlockScreen,
        MessageTag::ScreenUnlockResult,
        MessageTag::SlockSetPincode,
    ];

    /// The wire ordinal.
    pub fn ordinal(self) -> u16 {
        self as u16
    }

    /// Look up a tag by its wire ordinal.
    pub fn from_ordinal(raw: u16) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.ordinal() == raw)
    }

    /// Whether the variant is a notification without payload.
    ///
    /// Payload-less variants are always framed with length zero, and length
    /// zero is only valid for them.
    pub fn is_void(self) -> bool {
        matches!(
            self,
            MessageTag::Ping
                | MessageTag::Pong
                | MessageTag::PowerOff
                | MessageTag::Standby
                | MessageTag::Wakeup
                | MessageTag::LightningGetCtrlConn
                | MessageTag::LightningReset
                | MessageTag::GetSettings
                | MessageTag::LockScreen
        )
    }

    /// The snake_case protocol name, as used in logs.
    pub fn name(self) -> &'static str {
        match self {
            MessageTag::Ping => "ping",
            MessageTag::Pong => "pong",
            MessageTag::PowerOff => "poweroff",
            MessageTag::WifiConnect => "wifi_connect",
            MessageTag::NetworkReport => "network_report",
            MessageTag::GetNetworkReport => "get_network_report",
            MessageTag::Standby => "standby",
            MessageTag::Wakeup => "wakeup",
            MessageTag::PowerOffProgress => "poweroff_progress",
            MessageTag::OnchainReport => "onchain_report",
            MessageTag::LightningReport => "lightning_report",
            MessageTag::LightningError => "lightning_error",
            MessageTag::LightningGenseedResult => "lightning_genseed_result",
            MessageTag::LightningInitWallet => "lightning_init_wallet",
            MessageTag::LightningGetCtrlConn => "lightning_get_ctrlconn",
            MessageTag::LightningCtrlConn => "lightning_ctrlconn",
            MessageTag::LightningReset => "lightning_reset",
            MessageTag::Settings => "settings",
            MessageTag::SwitchSysupdates => "switch_sysupdates",
            MessageTag::SetNodename => "set_nodename",
            MessageTag::GetSettings => "get_settings",
            MessageTag::LockScreen => "lock_screen",
            MessageTag::UnlockScreen => "unlock_screen",
            MessageTag::ScreenUnlockResult => "screen_unlock_result",
            MessageTag::SlockSetPincode => "slock_set_pincode",
        }
    }
}

impl TryFrom<u16> for MessageTag {
    type Error = u16;

    fn try_from(raw: u16) -> Result<Self, Self::Error> {
        Self::from_ordinal(raw).ok_or(raw)
    }
}

impl fmt::Display for MessageTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    // Shipped ordinals. Changing any of these breaks mixed-version devices.
    #[test]
    fn test_ordinals_are_frozen() {
        assert_eq!(MessageTag::Ping.ordinal(), 0x01);
        assert_eq!(MessageTag::Pong.ordinal(), 0x02);
        assert_eq!(MessageTag::PowerOff.ordinal(), 0x03);
        assert_eq!(MessageTag::WifiConnect.ordinal(), 0x04);
        assert_eq!(MessageTag::NetworkReport.ordinal(), 0x05);
        assert_eq!(MessageTag::GetNetworkReport.ordinal(), 0x06);
        assert_eq!(MessageTag::Standby.ordinal(), 0x07);
        assert_eq!(MessageTag::Wakeup.ordinal(), 0x08);
        assert_eq!(MessageTag::SlockSetPincode.ordinal(), 0x19);
    }

    #[test]
    fn test_ordinals_unique_and_dense() {
        let ordinals: HashSet<u16> = MessageTag::ALL.iter().map(|t| t.ordinal()).collect();
        assert_eq!(ordinals.len(), MessageTag::ALL.len());
        for (i, tag) in MessageTag::ALL.iter().enumerate() {
            assert_eq!(tag.ordinal() as usize, i + 1, "{tag} out of order");
        }
    }

    #[test]
    fn test_from_ordinal() {
        for tag in MessageTag::ALL {
            assert_eq!(MessageTag::try_from(tag.ordinal()), Ok(tag));
        }
        assert_eq!(MessageTag::try_from(0x0000), Err(0x0000));
        assert_eq!(MessageTag::try_from(0xFFFF), Err(0xFFFF));
    }

    #[test]
    fn test_void_tags() {
        assert!(MessageTag::Ping.is_void());
        assert!(MessageTag::Wakeup.is_void());
        assert!(!MessageTag::WifiConnect.is_void());
        assert!(!MessageTag::GetNetworkReport.is_void());
    }

    #[test]
    fn test_display_uses_protocol_name() {
        assert_eq!(MessageTag::PowerOffProgress.to_string(), "poweroff_progress");
    }
}
