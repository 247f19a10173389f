use ratatui::{
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

const SPINNER_FRAMES: [&str; 4] = ["◐", "◓", "◑", "◒"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Error,
}

#[derive(Debug)]
pub struct StatusIndicator {
    thinking: bool,
    status_text: String,
    kind: StatusKind,
    spinner_idx: usize,
}

impl Default for StatusIndicator {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusIndicator {
    pub fn new() -> Self {
        Self {
            thinking: false,
            status_text: String::new(),
            kind: StatusKind::Info,
            spinner_idx: 0,
        }
    }

    pub fn set_thinking(&mut self, thinking: bool) {
        self.thinking = thinking;
    }

    pub fn is_thinking(&self) -> bool {
        self.thinking
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status_text = status.into();
        self.kind = StatusKind::Info;
    }

    pub fn set_error(&mut self, status: impl Into<String>) {
        self.status_text = status.into();
        self.kind = StatusKind::Error;
    }

    pub fn clear_status(&mut self) {
        self.status_text.clear();
        self.kind = StatusKind::Info;
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn kind(&self) -> StatusKind {
        self.kind
    }

    pub fn update_spinner(&mut self) {
        if self.thinking {
            self.spinner_idx = self.spinner_idx.wrapping_add(1);
        }
    }

    pub fn line(&self) -> Line<'_> {
        let thinking_indicator = if self.thinking {
            SPINNER_FRAMES[self.spinner_idx % SPINNER_FRAMES.len()]
        } else {
            " "
        };

        // Explicit status text wins over the generic "thinking" label
        let status_text = if !self.status_text.is_empty() {
            self.status_text.as_str()
        } else if self.thinking {
            "Thinking... (Esc to cancel)"
        } else {
            ""
        };

        let status_color = match (self.kind, self.status_text.is_empty()) {
            (StatusKind::Error, false) => Color::Red,
            (StatusKind::Info, false) => Color::Yellow,
            _ => Color::DarkGray,
        };

        Line::from(vec![
            Span::styled(thinking_indicator, Style::default().fg(Color::Gray)),
            Span::raw(" "),
            Span::styled(status_text, Style::default().fg(status_color)),
        ])
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(Paragraph::new(self.line()), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(line: &Line<'_>) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    #[test]
    fn test_idle_is_blank() {
        let status = StatusIndicator::new();
        assert_eq!(text(&status.line()).trim(), "");
    }

    #[test]
    fn test_thinking_spins() {
        let mut status = StatusIndicator::new();
        status.set_thinking(true);
        assert!(text(&status.line()).starts_with("◐ Thinking"));
        status.update_spinner();
        assert!(text(&status.line()).starts_with("◓"));
    }

    #[test]
    fn test_error_is_red() {
        let mut status = StatusIndicator::new();
        status.set_error("Request failed");
        let line = status.line();
        assert_eq!(line.spans[2].style.fg, Some(Color::Red));
        status.clear_status();
        assert_eq!(status.kind(), StatusKind::Info);
    }
}
