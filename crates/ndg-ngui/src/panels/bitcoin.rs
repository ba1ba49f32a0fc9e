//! Bitcoin panel: chain sync, mempool and on-chain balance.

use std::time::{SystemTime, UNIX_EPOCH};

use ndg_core::comm::payload::OnchainReport;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Gauge, Paragraph},
};

use super::format_sats;

pub fn render(frame: &mut Frame, area: Rect, onchain: Option<&OnchainReport>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(6)])
        .split(area);

    let progress = onchain.map(|r| r.sync.progress).unwrap_or(0.0);
    let label = match onchain {
        Some(r) if r.sync.verifying => format!("verifying {:.2}%", progress * 100.0),
        Some(_) => format!("{:.2}%", progress * 100.0),
        None => "waiting for node".to_string(),
    };
    let gauge = Gauge::default()
        .block(Block::default().title(" Sync ").borders(Borders::ALL))
        .gauge_style(Style::default().fg(Color::Yellow))
        .ratio(progress.clamp(0.0, 1.0))
        .label(label);
    frame.render_widget(gauge, chunks[0]);

    let chain = Paragraph::new(chain_lines(onchain))
        .block(Block::default().title(" Chain ").borders(Borders::ALL));
    frame.render_widget(chain, chunks[1]);
}

fn field<'a>(name: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::styled(name, Style::default().fg(Color::Gray)),
        Span::raw(value),
    ])
}

fn chain_lines(onchain: Option<&OnchainReport>) -> Vec<Line<'static>> {
    let Some(r) = onchain else {
        return vec![Line::from(Span::styled(
            "  (no chain report yet)",
            Style::default().fg(Color::DarkGray),
        ))];
    };
    let mut lines = vec![
        field("Height:   ", r.height.to_string()),
        field("Block:    ", r.hash.clone()),
        field("Age:      ", format_age(now_secs().saturating_sub(r.timestamp))),
        field(
            "Mempool:  ",
            format!(
                "{} tx, {} / {} bytes",
                r.mempool.txcount, r.mempool.usage, r.mempool.max
            ),
        ),
    ];
    match &r.balance {
        Some(b) => {
            lines.push(field("Balance:  ", format!("{} sat", format_sats(b.total))));
            lines.push(field(
                "          ",
                format!(
                    "{} confirmed, {} unconfirmed, {} locked",
                    format_sats(b.confirmed),
                    format_sats(b.unconfirmed),
                    format_sats(b.locked)
                ),
            ));
        }
        None => lines.push(field("Balance:  ", "n/a".to_string())),
    }
    lines
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Human-readable age of a block.
pub fn format_age(secs: u64) -> String {
    match secs {
        0..60 => format!("{secs}s"),
        60..3600 => format!("{}m", secs / 60),
        3600..86400 => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d", secs / 86400),
    }
}
