//! The most recent report of each kind, replayed when the screen wakes.

use crate::comm::{MessageTag, ParsedMessage};

/// The report kinds the cache keeps one entry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    Network,
    Onchain,
    /// A lightning report or a lightning error; the newer one wins.
    Lightning,
}

impl ReportKind {
    pub fn of(tag: MessageTag) -> Option<ReportKind> {
        match tag {
            MessageTag::NetworkReport => Some(ReportKind::Network),
            MessageTag::OnchainReport => Some(ReportKind::Onchain),
            MessageTag::LightningReport | MessageTag::LightningError => {
                Some(ReportKind::Lightning)
            }
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct LastReportCache {
    network: Option<ParsedMessage>,
    onchain: Option<ParsedMessage>,
    lightning: Option<ParsedMessage>,
}

impl LastReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, kind: ReportKind) -> &mut Option<ParsedMessage> {
        match kind {
            ReportKind::Network => &mut self.network,
            ReportKind::Onchain => &mut self.onchain,
            ReportKind::Lightning => &mut self.lightning,
        }
    }

    /// Keep `msg` as the latest of its kind, releasing the entry it replaces.
    ///
    /// Messages that are not reports are handed back unchanged.
    pub fn store(&mut self, msg: ParsedMessage) -> Result<ReportKind, ParsedMessage> {
        let Some(kind) = ReportKind::of(msg.tag()) else {
            return Err(msg);
        };
        if let Some(previous) = self.slot(kind).replace(msg) {
            previous.release();
        }
        Ok(kind)
    }

    pub fn get(&self, kind: ReportKind) -> Option<&ParsedMessage> {
        match kind {
            ReportKind::Network => self.network.as_ref(),
            ReportKind::Onchain => self.onchain.as_ref(),
            ReportKind::Lightning => self.lightning.as_ref(),
        }
    }

    /// Cached reports in replay order: network, onchain, lightning.
    pub fn iter(&self) -> impl Iterator<Item = &ParsedMessage> {
        [&self.network, &self.onchain, &self.lightning]
            .into_iter()
            .flatten()
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Release every cached report.
    pub fn clear(&mut self) {
        for kind in [ReportKind::Network, ReportKind::Onchain, ReportKind::Lightning] {
            if let Some(msg) = self.slot(kind).take() {
                msg.release();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::comm::Message;
    use crate::comm::payload::{
        LightningError, LightningErrorCode, LightningReport, NetworkReport, OnchainReport,
    };

    fn network(ssid: &str) -> ParsedMessage {
        ParsedMessage::new(Message::NetworkReport(NetworkReport {
            wifi_ssid: Some(ssid.into()),
            ..Default::default()
        }))
    }

    #[test]
    fn test_replacing_only_touches_same_kind() {
        let mut cache = LastReportCache::new();
        cache.store(network("home")).unwrap();
        cache
            .store(ParsedMessage::new(Message::OnchainReport(OnchainReport {
                height: 1,
                ..Default::default()
            })))
            .unwrap();
        cache.store(network("cafe")).unwrap();

        assert_eq!(cache.len(), 2);
        match cache.get(ReportKind::Network).map(ParsedMessage::value) {
            Some(Message::NetworkReport(r)) => assert_eq!(r.wifi_ssid.as_deref(), Some("cafe")),
            other => panic!("unexpected {other:?}"),
        }
        match cache.get(ReportKind::Onchain).map(ParsedMessage::value) {
            Some(Message::OnchainReport(r)) => assert_eq!(r.height, 1),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_lightning_error_replaces_report() {
        let mut cache = LastReportCache::new();
        cache
            .store(ParsedMessage::new(Message::LightningReport(
                LightningReport::default(),
            )))
            .unwrap();
        let kind = cache
            .store(ParsedMessage::new(Message::LightningError(
                LightningError::new(LightningErrorCode::Locked),
            )))
            .unwrap();

        assert_eq!(kind, ReportKind::Lightning);
        assert_eq!(cache.len(), 1);
        assert_eq!(
            cache.get(ReportKind::Lightning).map(ParsedMessage::tag),
            Some(MessageTag::LightningError)
        );
    }

    #[test]
    fn test_non_report_handed_back() {
        let mut cache = LastReportCache::new();
        let msg = cache.store(ParsedMessage::new(Message::Ping)).unwrap_err();
        assert_eq!(msg.tag(), MessageTag::Ping);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replay_order_and_clear() {
        let mut cache = LastReportCache::new();
        cache
            .store(ParsedMessage::new(Message::LightningReport(
                LightningReport::default(),
            )))
            .unwrap();
        cache.store(network("home")).unwrap();

        let tags: Vec<MessageTag> = cache.iter().map(ParsedMessage::tag).collect();
        assert_eq!(tags, vec![MessageTag::NetworkReport, MessageTag::LightningReport]);

        cache.clear();
        assert!(cache.is_empty());
    }
}
