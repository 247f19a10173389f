use crate::markdown::render_markdown;
use crate::models::{ChatMessage, Sender};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use textwrap::wrap;

const USER_INDENT: &str = "  ";

/// Terminal rendering of one conversation turn.
#[derive(Debug, Clone, Copy)]
pub struct MessageView<'a> {
    message: &'a ChatMessage,
}

impl<'a> MessageView<'a> {
    pub fn new(message: &'a ChatMessage) -> Self {
        Self { message }
    }

    pub fn render(&self, width: u16) -> Vec<Line<'static>> {
        let mut lines = Vec::new();
        let base_style = self.base_style();

        self.render_header(&mut lines, base_style);
        self.render_content(&mut lines, width, base_style);
        self.render_footer(&mut lines, base_style);

        lines
    }

    fn indent(&self) -> &'static str {
        if self.message.is_user() {
            USER_INDENT
        } else {
            ""
        }
    }

    fn base_style(&self) -> Style {
        Style::default().fg(match self.message.sender() {
            Sender::User => Color::Rgb(255, 223, 128),
            Sender::Ai => Color::Rgb(144, 238, 144),
        })
    }

    fn render_header(&self, lines: &mut Vec<Line<'static>>, style: Style) {
        let who = match self.message.sender() {
            Sender::User => "You",
            Sender::Ai => "MelChat",
        };
        lines.push(Line::from(vec![
            Span::styled(self.indent(), style),
            Span::styled("┌─ ", style),
            Span::styled(who, style.add_modifier(Modifier::BOLD)),
        ]));
    }

    fn render_content(&self, lines: &mut Vec<Line<'static>>, width: u16, style: Style) {
        let indent = self.indent();
        let wrap_width = (width as usize).saturating_sub(indent.len() + 2).max(1);

        let body: Vec<Line<'static>> = match self.message.sender() {
            // prompts are shown as typed
            Sender::User => self
                .message
                .text()
                .lines()
                .flat_map(|line| {
                    if line.is_empty() {
                        vec![String::new()]
                    } else {
                        wrap(line, wrap_width)
                            .into_iter()
                            .map(|w| w.into_owned())
                            .collect()
                    }
                })
                .map(|text| Line::from(Span::styled(text, style)))
                .collect(),
            Sender::Ai => render_markdown(self.message.text(), wrap_width, style),
        };

        for line in body {
            let mut spans = vec![Span::styled(indent, style), Span::styled("│ ", style)];
            spans.extend(line.spans);
            lines.push(Line::from(spans));
        }
    }

    fn render_footer(&self, lines: &mut Vec<Line<'static>>, style: Style) {
        let mut spans = vec![Span::styled(self.indent(), style), Span::styled("╰─", style)];
        if let Some(stats) = self.stats() {
            spans.push(Span::styled(
                format!(" {}", stats),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ));
        }
        lines.push(Line::from(spans));
    }

    /// "2s · 50 tok/s" for timed replies.
    pub fn stats(&self) -> Option<String> {
        match (self.message.duration(), self.message.tokens_per_sec()) {
            (Some(duration), Some(tps)) => Some(format!("{}s · {} tok/s", duration, tps)),
            (Some(duration), None) => Some(format!("{}s", duration)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InferenceResult;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_user_message_layout() {
        let msg = ChatMessage::user("Hello there");
        let lines = MessageView::new(&msg).render(40);
        assert_eq!(
            plain(&lines),
            vec!["  ┌─ You", "  │ Hello there", "  ╰─"]
        );
    }

    #[test]
    fn test_ai_message_shows_stats() {
        let msg = ChatMessage::ai(InferenceResult {
            text: "Hi!".into(),
            duration: 2,
            tokens_per_sec: 50,
        });
        let lines = MessageView::new(&msg).render(40);
        assert_eq!(
            plain(&lines),
            vec!["┌─ MelChat", "│ Hi!", "╰─ 2s · 50 tok/s"]
        );
    }

    #[test]
    fn test_restored_reply_has_no_stats() {
        let msg = ChatMessage::ai_untimed("**bold** answer");
        let view = MessageView::new(&msg);
        assert_eq!(view.stats(), None);
        assert_eq!(plain(&view.render(40))[1], "│ bold answer");
    }

    #[test]
    fn test_user_text_wraps() {
        let msg = ChatMessage::user("one two three four");
        let lines = MessageView::new(&msg).render(14);
        assert_eq!(
            plain(&lines)[1..3],
            ["  │ one two".to_string(), "  │ three four".to_string()]
        );
    }
}
