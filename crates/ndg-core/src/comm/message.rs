//! The message union and the decoded-message ownership wrapper.

use super::payload::*;
use super::tag::MessageTag;

/// Every message that can travel between the daemon and the UI.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Ping,
    Pong,
    PowerOff,
    WifiConnect(WifiConnect),
    NetworkReport(NetworkReport),
    GetNetworkReport(GetNetworkReport),
    Standby,
    Wakeup,
    PowerOffProgress(PowerOffProgress),
    OnchainReport(OnchainReport),
    LightningReport(LightningReport),
    LightningError(LightningError),
    LightningGenseedResult(Mnemonic),
    LightningInitWallet(Mnemonic),
    LightningGetCtrlConn,
    LightningCtrlConn(LightningCtrlConn),
    LightningReset,
    Settings(Settings),
    SwitchSysupdates(SwitchSysupdates),
    SetNodename(SetNodename),
    GetSettings,
    LockScreen,
    UnlockScreen(UnlockScreen),
    ScreenUnlockResult(ScreenUnlockResult),
    SlockSetPincode(SlockSetPincode),
}

impl Message {
    /// The wire tag of this variant.
    pub fn tag(&self) -> MessageTag {
        match self {
            Message::Ping => MessageTag::Ping,
            Message::Pong => MessageTag::Pong,
            Message::PowerOff => MessageTag::PowerOff,
            Message::WifiConnect(_) => MessageTag::WifiConnect,
            Message::NetworkReport(_) => MessageTag::NetworkReport,
            Message::GetNetworkReport(_) => MessageTag::GetNetworkReport,
            Message::Standby => MessageTag::Standby,
            Message::Wakeup => MessageTag::Wakeup,
            Message::PowerOffProgress(_) => MessageTag::PowerOffProgress,
            Message::OnchainReport(_) => MessageTag::OnchainReport,
            Message::LightningReport(_) => MessageTag::LightningReport,
            Message::LightningError(_) => MessageTag::LightningError,
            Message::LightningGenseedResult(_) => MessageTag::LightningGenseedResult,
            Message::LightningInitWallet(_) => MessageTag::LightningInitWallet,
            Message::LightningGetCtrlConn => MessageTag::LightningGetCtrlConn,
            Message::LightningCtrlConn(_) => MessageTag::LightningCtrlConn,
            Message::LightningReset => MessageTag::LightningReset,
            Message::Settings(_) => MessageTag::Settings,
            Message::SwitchSysupdates(_) => MessageTag::SwitchSysupdates,
            Message::SetNodename(_) => MessageTag::SetNodename,
            Message::GetSettings => MessageTag::GetSettings,
            Message::LockScreen => MessageTag::LockScreen,
            Message::UnlockScreen(_) => MessageTag::UnlockScreen,
            Message::ScreenUnlockResult(_) => MessageTag::ScreenUnlockResult,
            Message::SlockSetPincode(_) => MessageTag::SlockSetPincode,
        }
    }

    /// The payload-less variant for `tag`, or `None` if the tag carries a payload.
    pub fn void(tag: MessageTag) -> Option<Message> {
        let msg = match tag {
            MessageTag::Ping => Message::Ping,
            MessageTag::Pong => Message::Pong,
            MessageTag::PowerOff => Message::PowerOff,
            MessageTag::Standby => Message::Standby,
            MessageTag::Wakeup => Message::Wakeup,
            MessageTag::LightningGetCtrlConn => Message::LightningGetCtrlConn,
            MessageTag::LightningReset => Message::LightningReset,
            MessageTag::GetSettings => Message::GetSettings,
            MessageTag::LockScreen => Message::LockScreen,
            _ => return None,
        };
        Some(msg)
    }
}

/// A decoded message together with everything the decoder allocated for it.
///
/// The payload is owned by the wrapper, so releasing it is a single drop no
/// matter how deeply nested the payload is. [`release`](Self::release)
/// consumes the value: releasing twice, or touching the message after
/// release, does not compile.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMessage {
    value: Message,
}

impl ParsedMessage {
    pub fn new(value: Message) -> Self {
        Self { value }
    }

    pub fn value(&self) -> &Message {
        &self.value
    }

    pub fn tag(&self) -> MessageTag {
        self.value.tag()
    }

    /// Whether this message owns a payload allocation.
    pub fn has_payload(&self) -> bool {
        !self.tag().is_void()
    }

    /// Take the message out of the wrapper.
    pub fn into_value(self) -> Message {
        self.value
    }

    /// Free the message and everything it owns. A no-op for payload-less
    /// messages.
    pub fn release(self) {
        drop(self);
    }
}

impl From<Message> for ParsedMessage {
    fn from(value: Message) -> Self {
        Self::new(value)
    }
}
