// src/markdown.rs

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use textwrap::{
    core::{break_words, Word},
    wrap_algorithms::wrap_first_fit,
    WordSeparator,
};
use unicode_width::UnicodeWidthStr;

const CODE_GUTTER: &str = "▎ ";
const CODE_CONTINUATION: &str = "┆ ";

/// Renders markdown into styled terminal lines no wider than `width` columns.
pub fn render_markdown(text: &str, width: usize, base: Style) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let mut renderer = Renderer::new(width.max(1), base);
    for event in Parser::new_ext(text, options) {
        renderer.handle(event);
    }
    renderer.finish()
}

struct Renderer {
    width: usize,
    base: Style,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    in_code_block: bool,
}

impl Renderer {
    fn new(width: usize, base: Style) -> Self {
        Self {
            width,
            base,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            in_code_block: false,
        }
    }

    fn style(&self) -> Style {
        self.styles.last().copied().unwrap_or(self.base)
    }

    fn push_style(&mut self, style: Style) {
        let next = self.style().patch(style);
        self.styles.push(next);
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.in_code_block => {
                for line in text.lines() {
                    let rows = wrap_code_line(line, self.width);
                    self.lines.extend(rows);
                }
            }
            Event::Text(text) => {
                let style = self.style();
                self.current.push(Span::styled(text.into_string(), style));
            }
            Event::Code(code) => {
                let style = self.style().fg(Color::Rgb(209, 154, 102));
                self.current.push(Span::styled(code.into_string(), style));
            }
            Event::SoftBreak => {
                let style = self.style();
                self.current.push(Span::styled(" ", style));
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(self.width.min(40)),
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank();
            }
            Event::TaskListMarker(done) => {
                let style = self.style();
                self.current
                    .push(Span::styled(if done { "[x] " } else { "[ ] " }, style));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush();
                let mut style = Style::default().add_modifier(Modifier::BOLD);
                if level == HeadingLevel::H1 {
                    style = style.add_modifier(Modifier::UNDERLINED);
                }
                self.push_style(style);
            }
            Tag::Emphasis => self.push_style(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => {
                self.push_style(Style::default().add_modifier(Modifier::CROSSED_OUT))
            }
            Tag::CodeBlock(_) => {
                self.flush();
                self.in_code_block = true;
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}. ", n);
                        *n += 1;
                        marker
                    }
                    _ => "• ".to_string(),
                };
                let style = self.base;
                self.current
                    .push(Span::styled(format!("{}{}", "  ".repeat(depth), marker), style));
            }
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush();
                self.blank();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Paragraph => {
                self.flush();
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.in_code_block = false;
                self.blank();
            }
            TagEnd::Item => self.flush(),
            TagEnd::List(_) => {
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            _ => {}
        }
    }

    fn flush(&mut self) {
        if self.current.is_empty() {
            return;
        }
        let spans = std::mem::take(&mut self.current);
        self.lines.extend(wrap_spans(spans, self.width));
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        self.lines
    }
}

/// Word-wraps styled spans to `width` columns. Words wider than a line are
/// broken. Adjacent pieces with the same style are merged.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize) -> Vec<Line<'static>> {
    let mut text = String::new();
    let mut runs: Vec<(usize, Style)> = Vec::with_capacity(spans.len());
    for span in &spans {
        text.push_str(&span.content);
        runs.push((text.len(), span.style));
    }

    let words = break_words(WordSeparator::AsciiSpace.find_words(&text), width);
    let mut starts = Vec::with_capacity(words.len());
    let mut offset = 0;
    for word in &words {
        starts.push(offset);
        offset += word.word.len() + word.whitespace.len() + word.penalty.len();
    }

    let mut lines = Vec::new();
    let mut first = 0;
    for line in wrap_first_fit(&words, &[width as f64]) {
        let Some(last) = line.last() else {
            continue;
        };
        let from = starts[first];
        let to = starts[first + line.len() - 1] + last.word.len();
        lines.push(Line::from(styled_slice(&text, &runs, from, to)));
        first += line.len();
    }
    lines
}

/// Cuts `text[from..to]` back into spans along the style runs it came from.
fn styled_slice(
    text: &str,
    runs: &[(usize, Style)],
    from: usize,
    to: usize,
) -> Vec<Span<'static>> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut run_start = 0;
    for &(run_end, style) in runs {
        let lo = from.max(run_start);
        let hi = to.min(run_end);
        run_start = run_end;
        if lo >= hi {
            continue;
        }
        match spans.last_mut() {
            Some(last) if last.style == style => last.content.to_mut().push_str(&text[lo..hi]),
            _ => spans.push(Span::styled(text[lo..hi].to_string(), style)),
        }
    }
    spans
}

/// Hard-wraps one code line. Continuation rows get their own gutter.
fn wrap_code_line(line: &str, width: usize) -> Vec<Line<'static>> {
    let gutter = Style::default().fg(Color::DarkGray);
    let code_style = Style::default().fg(Color::Rgb(209, 154, 102));
    let code_width = width.saturating_sub(CODE_GUTTER.width()).max(1);

    let word = Word::from(line);
    let mut rows: Vec<Line<'static>> = word
        .break_apart(code_width)
        .enumerate()
        .map(|(i, piece)| {
            let marker = if i == 0 { CODE_GUTTER } else { CODE_CONTINUATION };
            Line::from(vec![
                Span::styled(marker, gutter),
                Span::styled(piece.word.to_string(), code_style),
            ])
        })
        .collect();
    if rows.is_empty() {
        rows.push(Line::from(Span::styled(CODE_GUTTER, gutter)));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    #[test]
    fn test_heading_and_paragraph() {
        let lines = render_markdown("# Title\n\nSome *text*.", 80, Style::default());
        assert_eq!(plain(&lines), vec!["Title", "", "Some text."]);
        assert!(lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        let italic = &lines[2].spans[1];
        assert_eq!(italic.content, "text");
        assert!(italic.style.add_modifier.contains(Modifier::ITALIC));
    }

    #[test]
    fn test_lists() {
        let lines = render_markdown("- one\n- two\n\n1. a\n2. b", 80, Style::default());
        assert_eq!(plain(&lines), vec!["• one", "• two", "", "1. a", "2. b"]);
    }

    #[test]
    fn test_code_block_hard_wraps() {
        let src = "```\nlet x = call(1, 2);\n\n```";
        let lines = render_markdown(src, 10, Style::default());
        assert_eq!(
            plain(&lines),
            vec!["▎ let x = ", "┆ call(1, ", "┆ 2);", "▎ "]
        );
        assert!(lines.iter().all(|l| l.width() <= 10));
    }

    #[test]
    fn test_inline_code_styled() {
        let lines = render_markdown("use `cargo`", 80, Style::default());
        assert_eq!(plain(&lines), vec!["use cargo"]);
        assert_eq!(lines[0].spans[1].style.fg, Some(Color::Rgb(209, 154, 102)));
    }

    #[test]
    fn test_wraps_words_to_width() {
        let lines = render_markdown("alpha beta gamma", 11, Style::default());
        assert_eq!(plain(&lines), vec!["alpha beta", "gamma"]);
    }

    #[test]
    fn test_breaks_words_wider_than_line() {
        let url = format!("https://example.com/{}END", "a".repeat(80));
        let lines = render_markdown(&format!("see {}", url), 30, Style::default());

        assert!(lines.iter().all(|l| l.width() <= 30));
        let joined: String = plain(&lines).concat();
        assert_eq!(joined, format!("see{}", url));
        assert!(plain(&lines).last().unwrap().ends_with("END"));
    }

    #[test]
    fn test_wrapped_lines_keep_styles() {
        let lines = render_markdown("plain **bold words here** tail", 12, Style::default());
        assert_eq!(plain(&lines), vec!["plain bold", "words here", "tail"]);
        assert!(!lines[0].spans[0].style.add_modifier.contains(Modifier::BOLD));
        assert!(lines[0].spans[1].style.add_modifier.contains(Modifier::BOLD));
        assert!(lines[1].spans[0].style.add_modifier.contains(Modifier::BOLD));
    }
}
