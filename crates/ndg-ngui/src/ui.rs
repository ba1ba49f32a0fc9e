//! Drawing the whole screen from [`App`] state.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Tabs},
};

use crate::app::{ALL_PANELS, App, Panel};
use crate::panels::{bitcoin, settings};

pub fn draw(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // tabs
            Constraint::Min(1),    // panel
            Constraint::Length(2), // status bar
        ])
        .split(frame.area());

    let titles: Vec<&str> = ALL_PANELS.iter().map(|p| p.title()).collect();
    let tabs = Tabs::new(titles)
        .select(app.active_panel.index())
        .highlight_style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .block(Block::default().title(" ndg ").borders(Borders::ALL));
    frame.render_widget(tabs, chunks[0]);

    match app.active_panel {
        Panel::Bitcoin => bitcoin::render(frame, chunks[1], app.onchain.as_ref()),
        Panel::Lightning => app.lightning.render(frame, chunks[1]),
        Panel::Settings => settings::render(
            frame,
            chunks[1],
            app.settings.as_ref(),
            app.network.as_ref(),
        ),
        Panel::Logs => app.logs.render(frame, chunks[1]),
    }

    let status = Paragraph::new(app.status_line())
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(status, chunks[2]);

    if app.poweroff.is_some() {
        draw_poweroff(frame, app);
    } else if let Some(dialog) = app.dialog {
        let area = centered(frame.area(), 40, 5);
        frame.render_widget(Clear, area);
        let text = vec![
            Line::from(Span::styled(
                dialog.question(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::raw(""),
            Line::from(Span::styled(
                "[y] yes   [n] no",
                Style::default().fg(Color::DarkGray),
            )),
        ];
        let popup = Paragraph::new(text)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(popup, area);
    } else if let Some(prompt) = &app.prompt {
        let area = centered(frame.area(), 44, 3);
        frame.render_widget(Clear, area);
        let title = format!(" {} ", prompt.kind.label());
        let input = Paragraph::new(format!("{}_", prompt.display_input()))
            .block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(input, area);
    }
}

fn draw_poweroff(frame: &mut Frame, app: &App) {
    let Some(progress) = &app.poweroff else {
        return;
    };
    let height = progress.services.len() as u16 + 4;
    let area = centered(frame.area(), 50, height);
    frame.render_widget(Clear, area);

    let items: Vec<ListItem> = progress
        .services
        .iter()
        .map(|svc| {
            let (state, style) = match (&svc.err, svc.stopped) {
                (Some(err), _) => (err.clone(), Style::default().fg(Color::Red)),
                (None, true) => ("stopped".to_string(), Style::default().fg(Color::Green)),
                (None, false) => ("stopping...".to_string(), Style::default().fg(Color::Yellow)),
            };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{:<12}", svc.name)),
                Span::styled(state, style),
            ]))
        })
        .collect();
    let list = List::new(items).block(
        Block::default()
            .title(" Powering off ")
            .borders(Borders::ALL),
    );
    frame.render_widget(list, area);
}

/// A `width` x `height` rectangle centered in `area`, clipped to it.
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyCode;
    use ndg_core::comm::payload::{
        NetworkReport, PowerOffProgress, ServiceProgress, Settings, SysupdatesChannel,
        SysupdatesSettings,
    };
    use ratatui::backend::TestBackend;

    use super::*;

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| draw(frame, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn make_app() -> App {
        App::new(ndg_core::LogCollector::new(10).reader())
    }

    #[test]
    fn test_centered_clips_to_area() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered(area, 10, 4), Rect::new(5, 3, 10, 4));
        assert_eq!(centered(area, 50, 50), area);
    }

    #[test]
    fn test_settings_panel_shows_network() {
        let mut app = make_app();
        app.active_panel = Panel::Settings;
        app.set_network(&NetworkReport {
            ipaddrs: vec!["192.168.1.20".into()],
            wifi_ssid: Some("home".into()),
            wifi_scan_networks: Vec::new(),
        });
        let screen = render(&app);
        assert!(screen.contains("192.168.1.20"));
        assert!(screen.contains("home"));
    }

    #[test]
    fn test_settings_panel_shows_hostname() {
        let mut app = make_app();
        app.set_settings(&Settings {
            hostname: "nakamochi".into(),
            sysupdates: SysupdatesSettings {
                channel: SysupdatesChannel::Dev,
            },
            slock_enabled: true,
        });
        app.active_panel = Panel::Settings;
        let screen = render(&app);
        assert!(screen.contains("nakamochi"));
        assert!(screen.contains("dev"));
        assert!(screen.contains("enabled"));
    }

    #[test]
    fn test_poweroff_dialog_and_progress() {
        let mut app = make_app();
        app.handle_key(KeyCode::Char('p'));
        assert!(render(&app).contains("Power off the node?"));

        app.set_poweroff(&PowerOffProgress {
            services: vec![
                ServiceProgress {
                    name: "lnd".into(),
                    stopped: true,
                    err: None,
                },
                ServiceProgress {
                    name: "bitcoind".into(),
                    stopped: false,
                    err: None,
                },
            ],
        });
        let screen = render(&app);
        assert!(screen.contains("Powering off"));
        assert!(screen.contains("stopping..."));
    }

    #[test]
    fn test_secret_prompt_is_masked() {
        let mut app = make_app();
        app.lock();
        for c in "4321".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        let screen = render(&app);
        assert!(screen.contains("****_"));
        assert!(!screen.contains("4321"));
    }
}
