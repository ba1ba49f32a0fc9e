//! Logs panel: the UI's own recent log lines.

use ndg_core::LogReader;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use tracing::Level;

use super::PanelState;

/// Most lines kept on screen; older ones stay only in the collector.
const MAX_LINES: usize = 500;

/// Scrollable log viewer that follows new lines until scrolled up.
pub struct LogsPanel {
    reader: LogReader,
    lines: Vec<LogLine>,
    /// Lines above the newest one (0 = following).
    scroll_offset: usize,
    follow: bool,
}

struct LogLine {
    elapsed: String,
    level: Level,
    message: String,
}

fn level_style(level: Level) -> Style {
    match level {
        Level::ERROR => Style::default().fg(Color::Red),
        Level::WARN => Style::default().fg(Color::Yellow),
        Level::INFO => Style::default().fg(Color::Green),
        Level::DEBUG => Style::default().fg(Color::Blue),
        Level::TRACE => Style::default().fg(Color::DarkGray),
    }
}

impl LogsPanel {
    pub fn new(reader: LogReader) -> Self {
        Self {
            reader,
            lines: Vec::new(),
            scroll_offset: 0,
            follow: true,
        }
    }

    /// Re-read the newest lines from the collector.
    pub fn refresh(&mut self) {
        self.lines = self
            .reader
            .tail(MAX_LINES)
            .into_iter()
            .map(|e| LogLine {
                elapsed: format!("{:>8.2}s", e.elapsed_secs),
                level: e.level,
                message: e.message,
            })
            .collect();
        if self.follow {
            self.scroll_offset = 0;
        } else {
            self.scroll_offset = self.scroll_offset.min(self.lines.len().saturating_sub(1));
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        if self.lines.is_empty() {
            let empty = Paragraph::new("  (no log entries yet)")
                .style(Style::default().fg(Color::DarkGray))
                .block(Block::default().title(" Logs ").borders(Borders::ALL));
            frame.render_widget(empty, area);
            return;
        }

        let visible = area.height.saturating_sub(2) as usize;
        let end = self.lines.len() - self.scroll_offset;
        let start = end.saturating_sub(visible);

        let items: Vec<ListItem> = self.lines[start..end]
            .iter()
            .map(|line| {
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{} ", line.elapsed),
                        Style::default().fg(Color::DarkGray),
                    ),
                    Span::styled(format!("{:>5} ", line.level), level_style(line.level)),
                    Span::raw(line.message.as_str()),
                ]))
            })
            .collect();

        let follow = if self.follow { " [follow]" } else { "" };
        let title = format!(" Logs ({}){follow} ", self.lines.len());
        let list = List::new(items).block(Block::default().title(title).borders(Borders::ALL));
        frame.render_widget(list, area);
    }
}

impl PanelState for LogsPanel {
    fn scroll_down(&mut self, n: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(n);
        if self.scroll_offset == 0 {
            self.follow = true;
        }
    }

    fn scroll_up(&mut self, n: usize) {
        self.follow = false;
        let max_offset = self.lines.len().saturating_sub(1);
        self.scroll_offset = (self.scroll_offset + n).min(max_offset);
    }

    fn scroll_to_top(&mut self) {
        self.follow = false;
        self.scroll_offset = self.lines.len().saturating_sub(1);
    }

    fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
        self.follow = true;
    }
}
