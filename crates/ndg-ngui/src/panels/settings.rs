//! Settings panel: node settings and the wifi network.

use ndg_core::comm::payload::{NetworkReport, Settings};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
};

fn hint(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::DarkGray))
}

fn label(text: &'static str) -> Span<'static> {
    Span::styled(text, Style::default().fg(Color::Gray))
}

pub fn render(
    frame: &mut Frame,
    area: Rect,
    settings: Option<&Settings>,
    network: Option<&NetworkReport>,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(7), Constraint::Min(4)])
        .split(area);

    let node = Paragraph::new(settings_lines(settings))
        .block(Block::default().title(" Settings ").borders(Borders::ALL));
    frame.render_widget(node, chunks[0]);

    let net = Paragraph::new(network_lines(network))
        .block(Block::default().title(" Network ").borders(Borders::ALL));
    frame.render_widget(net, chunks[1]);
}

fn settings_lines(settings: Option<&Settings>) -> Vec<Line<'static>> {
    let Some(s) = settings else {
        return vec![Line::from(hint("  (waiting for settings)"))];
    };
    vec![
        Line::from(vec![
            label("Node name:     "),
            Span::raw(s.hostname.clone()),
            hint("   [N] rename"),
        ]),
        Line::from(vec![
            label("Sysupdates:    "),
            Span::raw(s.sysupdates.channel.as_str()),
            hint("   [u] switch"),
        ]),
        Line::from(vec![
            label("Screen lock:   "),
            if s.slock_enabled {
                Span::styled("enabled", Style::default().fg(Color::Green))
            } else {
                hint("disabled")
            },
            hint("   [P] set pincode"),
        ]),
        Line::raw(""),
        Line::from(Span::styled(
            format!("ngui {}", ndg_core::build_info::version_string()),
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

fn network_lines(network: Option<&NetworkReport>) -> Vec<Line<'static>> {
    let Some(r) = network else {
        return vec![Line::from(hint("  (no network report yet)"))];
    };
    let mut lines = vec![
        Line::from(vec![
            label("Wifi:          "),
            Span::raw(r.wifi_ssid.clone().unwrap_or_else(|| "not connected".into())),
            hint("   [w] join  [s] scan"),
        ]),
        Line::from(vec![label("Address:       "), Span::raw(r.ipaddrs.join(", "))]),
    ];
    if !r.wifi_scan_networks.is_empty() {
        lines.push(Line::from(vec![
            label("Nearby:        "),
            Span::raw(r.wifi_scan_networks.join(", ")),
        ]));
    }
    lines
}
