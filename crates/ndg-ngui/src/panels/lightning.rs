//! Lightning panel: node status, balances, channels, and wallet setup.

use ndg_core::comm::payload::{
    ChannelState, LightningCtrlConn, LightningErrorCode, LightningReport, Mnemonic,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
};

use super::{PanelState, format_sats};

/// Lightning node view with a scrollable channel list.
pub struct LightningPanel {
    pub report: Option<LightningReport>,
    pub error: Option<LightningErrorCode>,
    /// A seed offered for a new wallet, shown until used.
    pub seed: Option<Mnemonic>,
    pub ctrlconn: Option<LightningCtrlConn>,
    scroll_offset: usize,
}

impl LightningPanel {
    pub fn new() -> Self {
        Self {
            report: None,
            error: None,
            seed: None,
            ctrlconn: None,
            scroll_offset: 0,
        }
    }

    /// Hand over the offered seed, so it is sent at most once.
    pub fn take_seed(&mut self) -> Option<Mnemonic> {
        self.seed.take()
    }

    fn channel_count(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.channels.len())
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if let Some(seed) = &self.seed {
            self.render_seed(frame, area, seed);
            return;
        }
        if let Some(code) = self.error {
            let text = match code {
                LightningErrorCode::NotReady => "Lightning node is starting up...",
                LightningErrorCode::Locked => "Wallet is locked.",
                LightningErrorCode::Uninitialized => "No wallet yet. Waiting for a seed...",
            };
            let panel = Paragraph::new(text)
                .style(Style::default().fg(Color::Yellow))
                .block(Block::default().title(" Lightning ").borders(Borders::ALL));
            frame.render_widget(panel, area);
            return;
        }
        let Some(report) = &self.report else {
            let empty = Paragraph::new("  (no lightning report yet)")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(" Lightning ").borders(Borders::ALL));
            frame.render_widget(empty, area);
            return;
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(7), Constraint::Min(3)])
            .split(area);

        let mut summary = vec![
            Line::from(vec![
                Span::styled("Alias:   ", Style::default().fg(Color::Gray)),
                Span::raw(report.alias.as_str()),
                Span::styled(
                    format!("  lnd {}", report.version),
                    Style::default().fg(Color::DarkGray),
                ),
            ]),
            Line::from(vec![
                Span::styled("Peers:   ", Style::default().fg(Color::Gray)),
                Span::raw(report.npeers.to_string()),
                Span::styled("  synced: ", Style::default().fg(Color::Gray)),
                Span::raw(format!(
                    "chain {} graph {}",
                    yes_no(report.sync.chain),
                    yes_no(report.sync.graph)
                )),
            ]),
            Line::from(vec![
                Span::styled("Balance: ", Style::default().fg(Color::Gray)),
                Span::raw(format!(
                    "{} local / {} remote sat",
                    format_sats(report.totalbal.local),
                    format_sats(report.totalbal.remote)
                )),
            ]),
            Line::from(vec![
                Span::styled("Fees:    ", Style::default().fg(Color::Gray)),
                Span::raw(format!(
                    "{} day / {} week / {} month",
                    report.totalfees.day, report.totalfees.week, report.totalfees.month
                )),
            ]),
        ];
        if let Some(conns) = &self.ctrlconn {
            for conn in &conns.conns {
                summary.push(Line::from(Span::styled(
                    conn.url.as_str(),
                    Style::default().fg(Color::Cyan),
                )));
            }
        }
        let summary = Paragraph::new(summary)
            .wrap(Wrap { trim: true })
            .block(Block::default().title(" Lightning ").borders(Borders::ALL));
        frame.render_widget(summary, chunks[0]);

        let rows: Vec<Row> = report
            .channels
            .iter()
            .skip(self.scroll_offset)
            .map(|ch| {
                let state = match ch.state {
                    ChannelState::Active => Cell::from("active").style(Style::default().fg(Color::Green)),
                    ChannelState::Inactive => Cell::from("inactive").style(Style::default().fg(Color::Yellow)),
                    ChannelState::PendingOpen => Cell::from("opening"),
                    ChannelState::PendingClose => Cell::from("closing"),
                };
                let peer = if ch.peer_alias.is_empty() {
                    ch.peer_pubkey.chars().take(16).collect()
                } else {
                    ch.peer_alias.clone()
                };
                Row::new(vec![
                    state,
                    Cell::from(peer),
                    Cell::from(format_sats(ch.local_balance)),
                    Cell::from(format_sats(ch.remote_balance)),
                ])
            })
            .collect();
        let title = format!(" Channels ({}) ", report.channels.len());
        let table = Table::new(
            rows,
            [
                Constraint::Length(9),
                Constraint::Min(16),
                Constraint::Length(14),
                Constraint::Length(14),
            ],
        )
        .header(
            Row::new(vec!["State", "Peer", "Local", "Remote"])
                .style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(table, chunks[1]);
    }

    fn render_seed(&self, frame: &mut Frame, area: Rect, seed: &Mnemonic) {
        let mut lines = vec![
            Line::from(Span::styled(
                "Write down these words. They restore your wallet.",
                Style::default().fg(Color::Yellow),
            )),
            Line::raw(""),
        ];
        for (row, words) in seed.mnemonic.chunks(4).enumerate() {
            let cells: Vec<String> = words
                .iter()
                .enumerate()
                .map(|(i, w)| format!("{:>2}. {:<10}", row * 4 + i + 1, w))
                .collect();
            lines.push(Line::raw(cells.join(" ")));
        }
        lines.push(Line::raw(""));
        lines.push(Line::from(Span::styled(
            "[i] create the wallet",
            Style::default().fg(Color::DarkGray),
        )));
        let panel = Paragraph::new(lines)
            .block(Block::default().title(" New wallet ").borders(Borders::ALL));
        frame.render_widget(panel, area);
    }
}

fn yes_no(b: bool) -> &'static str {
    if b { "yes" } else { "no" }
}

impl Default for LightningPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl PanelState for LightningPanel {
    fn scroll_down(&mut self, n: usize) {
        let max_offset = self.channel_count().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + n).min(max_offset);
    }

    fn scroll_up(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
    }

    fn scroll_to_top(&mut self) {
        self.scroll_offset = 0;
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_offset = self.channel_count().saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use ndg_core::comm::payload::LightningChannel;

    use super::*;

    fn report_with_channels(n: usize) -> LightningReport {
        LightningReport {
            channels: (0..n)
                .map(|i| LightningChannel {
                    id: Some(i.to_string()),
                    state: ChannelState::Active,
                    private: false,
                    point: format!("txid:{i}"),
                    peer_pubkey: "02abcdef".into(),
                    peer_alias: String::new(),
                    capacity: 100_000,
                    local_balance: 60_000,
                    remote_balance: 40_000,
                })
                .collect(),
            ..LightningReport::default()
        }
    }

    #[test]
    fn test_scroll_clamped_to_channels() {
        let mut panel = LightningPanel::new();
        panel.scroll_down(3);
        assert_eq!(panel.scroll_offset, 0);

        panel.report = Some(report_with_channels(5));
        panel.scroll_down(10);
        assert_eq!(panel.scroll_offset, 4);
        panel.scroll_up(2);
        assert_eq!(panel.scroll_offset, 2);
        panel.scroll_to_top();
        assert_eq!(panel.scroll_offset, 0);
    }

    #[test]
    fn test_take_seed_once() {
        let mut panel = LightningPanel::new();
        panel.seed = Some(Mnemonic::new(vec!["zoo".into()]));
        assert!(panel.take_seed().is_some());
        assert!(panel.take_seed().is_none());
    }
}
