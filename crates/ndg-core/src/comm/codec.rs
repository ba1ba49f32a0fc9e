//! Byte-level framing: `tag (u16 LE) ‖ length (u64 LE) ‖ JSON payload`.
//!
//! Pure functions only; [`crate::transport`] decides when bytes are read or
//! written.

use serde::Serialize;
use serde::de::DeserializeOwned;

use super::CommError;
use super::message::{Message, ParsedMessage};
use super::tag::MessageTag;

/// Size of the fixed frame header: 2 bytes tag + 8 bytes length.
pub const HEADER_LEN: usize = 10;

/// Default cap on a frame's payload length. Real payloads are a few KiB.
pub const MAX_FRAME_LEN: u64 = 16 * 1024 * 1024;

/// A complete frame sliced out of a buffer, not yet interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawFrame<'a> {
    pub tag: u16,
    pub payload: &'a [u8],
}

/// Encode a message into a single frame.
pub fn encode(msg: &Message) -> Result<Vec<u8>, CommError> {
    let payload = payload_json(msg)?;
    let len = u64::try_from(payload.len()).map_err(|_| CommError::WriteTooLarge(payload.len()))?;

    let mut frame = Vec::with_capacity(HEADER_LEN + payload.len());
    frame.extend_from_slice(&msg.tag().ordinal().to_le_bytes());
    frame.extend_from_slice(&len.to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn to_json<T: Serialize>(tag: MessageTag, payload: &T) -> Result<Vec<u8>, CommError> {
    serde_json::to_vec(payload).map_err(|source| CommError::Encode { tag, source })
}

fn payload_json(msg: &Message) -> Result<Vec<u8>, CommError> {
    let tag = msg.tag();
    match msg {
        Message::Ping
        | Message::Pong
        | Message::PowerOff
        | Message::Standby
        | Message::Wakeup
        | Message::LightningGetCtrlConn
        | Message::LightningReset
        | Message::GetSettings
        | Message::LockScreen => Ok(Vec::new()),
        Message::WifiConnect(p) => to_json(tag, p),
        Message::NetworkReport(p) => to_json(tag, p),
        Message::GetNetworkReport(p) => to_json(tag, p),
        Message::PowerOffProgress(p) => to_json(tag, p),
        Message::OnchainReport(p) => to_json(tag, p),
        Message::LightningReport(p) => to_json(tag, p),
        Message::LightningError(p) => to_json(tag, p),
        Message::LightningGenseedResult(p) => to_json(tag, p),
        Message::LightningInitWallet(p) => to_json(tag, p),
        Message::LightningCtrlConn(p) => to_json(tag, p),
        Message::Settings(p) => to_json(tag, p),
        Message::SwitchSysupdates(p) => to_json(tag, p),
        Message::SetNodename(p) => to_json(tag, p),
        Message::UnlockScreen(p) => to_json(tag, p),
        Message::ScreenUnlockResult(p) => to_json(tag, p),
        Message::SlockSetPincode(p) => to_json(tag, p),
    }
}

/// Slice the first complete frame out of `buf`, allowing payloads up to
/// [`MAX_FRAME_LEN`].
///
/// Returns `Ok(None)` while `buf` holds less than one full frame, otherwise
/// the frame and the number of bytes it spans.
pub fn split_frame(buf: &[u8]) -> Result<Option<(RawFrame<'_>, usize)>, CommError> {
    split_frame_max(buf, MAX_FRAME_LEN)
}

/// [`split_frame`] with a caller-chosen payload cap. A header announcing more
/// than `max_len` fails with [`CommError::FrameTooLarge`] as soon as the
/// header is complete, without waiting for the payload.
pub fn split_frame_max(
    buf: &[u8],
    max_len: u64,
) -> Result<Option<(RawFrame<'_>, usize)>, CommError> {
    if buf.len() < HEADER_LEN {
        return Ok(None);
    }

    let tag = u16::from_le_bytes([buf[0], buf[1]]);
    let mut len_bytes = [0u8; 8];
    len_bytes.copy_from_slice(&buf[2..HEADER_LEN]);
    let len = u64::from_le_bytes(len_bytes);
    if len > max_len {
        return Err(CommError::FrameTooLarge(len));
    }

    let total = usize::try_from(len)
        .ok()
        .and_then(|len| len.checked_add(HEADER_LEN))
        .ok_or(CommError::FrameTooLarge(len))?;
    if buf.len() < total {
        return Ok(None);
    }

    let frame = RawFrame {
        tag,
        payload: &buf[HEADER_LEN..total],
    };
    Ok(Some((frame, total)))
}

fn parse<T: DeserializeOwned>(tag: MessageTag, payload: &[u8]) -> Result<T, CommError> {
    serde_json::from_slice(payload).map_err(|source| CommError::Payload { tag, source })
}

/// Interpret a raw frame as a typed message.
pub fn decode(frame: RawFrame<'_>) -> Result<ParsedMessage, CommError> {
    let tag = MessageTag::try_from(frame.tag).map_err(CommError::InvalidTag)?;
    let payload = frame.payload;

    if tag.is_void() {
        if !payload.is_empty() {
            tracing::debug!(%tag, len = payload.len(), "Ignoring payload on payload-less message");
        }
    } else if payload.is_empty() {
        return Err(CommError::ZeroLenInNonVoidTag(tag));
    }

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
        MessageTag::WifiConnect => Message::WifiConnect(parse(tag, payload)?),
        MessageTag::NetworkReport => Message::NetworkReport(parse(tag, payload)?),
        MessageTag::GetNetworkReport => Message::GetNetworkReport(parse(tag, payload)?),
        MessageTag::PowerOffProgress => Message::PowerOffProgress(parse(tag, payload)?),
        MessageTag::OnchainReport => Message::OnchainReport(parse(tag, payload)?),
        MessageTag::LightningReport => Message::LightningReport(parse(tag, payload)?),
        MessageTag::LightningError => Message::LightningError(parse(tag, payload)?),
        MessageTag::LightningGenseedResult => {
            Message::LightningGenseedResult(parse(tag, payload)?)
        }
        MessageTag::LightningInitWallet => Message::LightningInitWallet(parse(tag, payload)?),
        MessageTag::LightningCtrlConn => Message::LightningCtrlConn(parse(tag, payload)?),
        MessageTag::Settings => Message::Settings(parse(tag, payload)?),
        MessageTag::SwitchSysupdates => Message::SwitchSysupdates(parse(tag, payload)?),
        MessageTag::SetNodename => Message::SetNodename(parse(tag, payload)?),
        MessageTag::UnlockScreen => Message::UnlockScreen(parse(tag, payload)?),
        MessageTag::ScreenUnlockResult => Message::ScreenUnlockResult(parse(tag, payload)?),
        MessageTag::SlockSetPincode => Message::SlockSetPincode(parse(tag, payload)?),
    };
    Ok(ParsedMessage::new(msg))
}

/// Decode the single frame contained in `bytes`.
///
/// Trailing bytes after the frame are ignored; a truncated frame is
/// [`CommError::EndOfStream`].
pub fn decode_bytes(bytes: &[u8]) -> Result<ParsedMessage, CommError> {
    match split_frame(bytes)? {
        Some((frame, _)) => decode(frame),
        None => Err(CommError::EndOfStream),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::comm::payload::*;

    fn header(tag: u16, len: u64) -> Vec<u8> {
        let mut bytes = tag.to_le_bytes().to_vec();
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes
    }

    fn sample_messages() -> Vec<Message> {
        vec![
            Message::Ping,
            Message::Pong,
            Message::PowerOff,
            Message::WifiConnect(WifiConnect::new("home", "x")),
            Message::NetworkReport(NetworkReport {
                ipaddrs: vec!["192.168.1.10".into(), "fe80::1".into()],
                wifi_ssid: Some("home".into()),
                wifi_scan_networks: vec!["home".into(), "cafe".into()],
            }),
            Message::GetNetworkReport(GetNetworkReport { scan: true }),
            Message::Standby,
            Message::Wakeup,
            Message::PowerOffProgress(PowerOffProgress {
                services: vec![
                    ServiceProgress {
                        name: "lnd".into(),
                        stopped: true,
                        err: None,
                    },
                    ServiceProgress {
                        name: "bitcoind".into(),
                        stopped: false,
                        err: Some("timed out".into()),
                    },
                ],
            }),
            Message::OnchainReport(OnchainReport {
                height: 800_000,
                hash: "00000000000000000002a7c4".into(),
                timestamp: 1_690_000_000,
                sync: OnchainSync {
                    progress: 0.9999,
                    verifying: false,
                },
                mempool: Mempool {
                    loaded: true,
                    txcount: 42,
                    usage: 1024,
                    max: 300_000_000,
                },
                balance: Some(OnchainBalance {
                    source: "lnd".into(),
                    total: 150_000,
                    confirmed: 100_000,
                    unconfirmed: 50_000,
                    locked: 0,
                    reserved_for_anchors: 10_000,
                }),
            }),
            Message::LightningReport(LightningReport {
                version: "0.16.4-beta".into(),
                pubkey: "02abc".into(),
                alias: "nakamochi".into(),
                npeers: 3,
                height: 800_000,
                hash: "0000abc".into(),
                sync: LightningSync {
                    chain: true,
                    graph: false,
                },
                uris: vec!["02abc@1.2.3.4:9735".into()],
                totalbal: LightningBalance {
                    local: 500,
                    remote: 700,
                    unsettled: 0,
                    pending: 10,
                },
                totalfees: LightningFees {
                    day: 1,
                    week: 7,
                    month: 30,
                },
                channels: vec![LightningChannel {
                    id: Some("800000x1x0".into()),
                    state: ChannelState::Active,
                    private: false,
                    point: "txid:0".into(),
                    peer_pubkey: "03def".into(),
                    peer_alias: "peer".into(),
                    capacity: 1_200,
                    local_balance: 500,
                    remote_balance: 700,
                }],
            }),
            Message::LightningError(LightningError::new(LightningErrorCode::Locked)),
            Message::LightningGenseedResult(Mnemonic::new(vec!["abandon".into(); 24])),
            Message::LightningInitWallet(Mnemonic::new(vec!["zoo".into(); 24])),
            Message::LightningGetCtrlConn,
            Message::LightningCtrlConn(LightningCtrlConn {
                conns: vec![CtrlConn {
                    url: "lndconnect://10.0.0.2:10009".into(),
                    typ: CtrlConnType::LndRpc,
                    perm: CtrlConnPerm::Admin,
                }],
            }),
            Message::LightningReset,
            Message::Settings(Settings {
                hostname: "nakamochi".into(),
                sysupdates: SysupdatesSettings {
                    channel: SysupdatesChannel::Master,
                },
                slock_enabled: true,
            }),
            Message::SwitchSysupdates(SwitchSysupdates {
                channel: SysupdatesChannel::Dev,
            }),
            Message::SetNodename(SetNodename {
                name: "satoshi".into(),
            }),
            Message::GetSettings,
            Message::LockScreen,
            Message::UnlockScreen(UnlockScreen {
                pincode: "1234".into(),
            }),
            Message::ScreenUnlockResult(ScreenUnlockResult {
                ok: false,
                err: Some("incorrect pincode".into()),
            }),
            Message::SlockSetPincode(SlockSetPincode { pincode: None }),
        ]
    }

    #[test]
    fn test_round_trip_every_tag() {
        let samples = sample_messages();
        // One sample per known tag.
        let tags: Vec<MessageTag> = samples.iter().map(Message::tag).collect();
        assert_eq!(tags, MessageTag::ALL.to_vec());

        for msg in samples {
            let frame = encode(&msg).unwrap();
            let decoded = decode_bytes(&frame).unwrap();
            assert_eq!(decoded.value(), &msg);
        }
    }

    #[test]
    fn test_void_tags_encode_to_zero_length() {
        for tag in MessageTag::ALL.into_iter().filter(|t| t.is_void()) {
            let frame = encode(&Message::void(tag).unwrap()).unwrap();
            assert_eq!(frame, header(tag.ordinal(), 0));
        }
    }

    #[test]
    fn test_wifi_connect_wire_layout() {
        let frame = encode(&Message::WifiConnect(WifiConnect::new("home", "x"))).unwrap();
        let json = br#"{"ssid":"home","password":"x"}"#;

        assert_eq!(&frame[..2], &[0x04, 0x00]);
        assert_eq!(&frame[2..HEADER_LEN], &(json.len() as u64).to_le_bytes());
        assert_eq!(&frame[HEADER_LEN..], json);

        let decoded = decode_bytes(&frame).unwrap();
        match decoded.value() {
            Message::WifiConnect(wifi) => {
                assert_eq!(wifi.ssid, "home");
                assert_eq!(wifi.password, "x");
            }
            other => panic!("unexpected message {other:?}"),
        }
    }

    #[test]
    fn test_ping_wire_layout() {
        let frame = encode(&Message::Ping).unwrap();
        assert_eq!(frame, vec![0x01, 0x00, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_unknown_tag_is_invalid() {
        let err = decode_bytes(&header(0xFFFF, 0)).unwrap_err();
        assert!(matches!(err, CommError::InvalidTag(0xFFFF)));
    }

    #[test]
    fn test_zero_len_payload_tag_rejected() {
        let err = decode_bytes(&header(MessageTag::NetworkReport.ordinal(), 0)).unwrap_err();
        assert!(matches!(
            err,
            CommError::ZeroLenInNonVoidTag(MessageTag::NetworkReport)
        ));
    }

    #[test]
    fn test_zero_len_void_tag_accepted() {
        let msg = decode_bytes(&header(MessageTag::Standby.ordinal(), 0)).unwrap();
        assert_eq!(msg.value(), &Message::Standby);
        assert!(!msg.has_payload());
    }

    #[test]
    fn test_unknown_fields_ignored() {
        let json = br#"{"ssid":"home","password":"x","band":"5GHz","hidden":false}"#;
        let mut frame = header(MessageTag::WifiConnect.ordinal(), json.len() as u64);
        frame.extend_from_slice(json);

        let msg = decode_bytes(&frame).unwrap();
        assert_eq!(
            msg.into_value(),
            Message::WifiConnect(WifiConnect::new("home", "x"))
        );
    }

    #[test]
    fn test_malformed_payload() {
        let json = br#"{"ssid":42}"#;
        let mut frame = header(MessageTag::WifiConnect.ordinal(), json.len() as u64);
        frame.extend_from_slice(json);

        let err = decode_bytes(&frame).unwrap_err();
        assert!(matches!(
            err,
            CommError::Payload {
                tag: MessageTag::WifiConnect,
                ..
            }
        ));
    }

    #[test]
    fn test_split_frame_waits_for_full_frame() {
        let frame = encode(&Message::SetNodename(SetNodename {
            name: "node".into(),
        }))
        .unwrap();

        for cut in 0..frame.len() {
            assert!(split_frame(&frame[..cut]).unwrap().is_none(), "cut at {cut}");
        }
        let (raw, used) = split_frame(&frame).unwrap().unwrap();
        assert_eq!(used, frame.len());
        assert_eq!(raw.tag, MessageTag::SetNodename.ordinal());
    }

    #[test]
    fn test_oversized_length_rejected_from_header_alone() {
        let bytes = header(MessageTag::NetworkReport.ordinal(), 1 << 40);
        assert!(matches!(
            split_frame(&bytes).unwrap_err(),
            CommError::FrameTooLarge(len) if len == 1 << 40
        ));

        let bytes = header(MessageTag::NetworkReport.ordinal(), 65);
        assert!(split_frame_max(&bytes, 64).is_err());
        assert!(split_frame_max(&bytes, 65).unwrap().is_none());
    }

    #[test]
    fn test_split_frame_leaves_following_frames() {
        let mut bytes = encode(&Message::Ping).unwrap();
        bytes.extend(encode(&Message::Pong).unwrap());

        let (first, used) = split_frame(&bytes).unwrap().unwrap();
        assert_eq!(first.tag, 0x01);
        let (second, _) = split_frame(&bytes[used..]).unwrap().unwrap();
        assert_eq!(second.tag, 0x02);
    }

    #[test]
    fn test_truncated_frame_is_end_of_stream() {
        let frame = encode(&Message::WifiConnect(WifiConnect::new("home", "x"))).unwrap();
        let err = decode_bytes(&frame[..frame.len() - 1]).unwrap_err();
        assert!(err.is_end_of_stream());
    }
}
