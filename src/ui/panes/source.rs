//! Source code pane rendering with syntax highlighting
//!
//! Displays the Scheme program being evaluated, with the first line of the
//! most recently evaluated top-level form highlighted. When that form raised
//! an error, the line is drawn in the error style instead.
//!
//! Highlighting uses a small character scanner rather than the real lexer,
//! so half-written or invalid source still renders.

use crate::interpreter::ops::OPS;
use crate::parser::lexer::parse_number;
use crate::ui::theme::{border_style, DEFAULT_THEME};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | '"' | ';' | '\'')
}

/// Highlight one line of Scheme source
fn highlight_source_code(line: &str) -> Line<'_> {
    let mut spans = Vec::new();
    let chars: Vec<(usize, char)> = line.char_indices().collect();
    let mut i = 0;

    while i < chars.len() {
        let (start, c) = chars[i];

        if c == ';' {
            spans.push(Span::styled(
                &line[start..],
                Style::default().fg(DEFAULT_THEME.comment),
            ));
            break;
        }

        if c == '"' {
            let mut end = i + 1;
            while end < chars.len() && chars[end].1 != '"' {
                end += if chars[end].1 == '\\' { 2 } else { 1 };
            }
            end = (end + 1).min(chars.len());
            let stop = chars.get(end).map_or(line.len(), |&(offset, _)| offset);
            spans.push(Span::styled(
                &line[start..stop],
                Style::default().fg(DEFAULT_THEME.string),
            ));
            i = end;
            continue;
        }

        if is_delimiter(c) {
            let style = match c {
                '(' | ')' | '[' | ']' => Style::default().fg(DEFAULT_THEME.primary),
                '\'' => Style::default().fg(DEFAULT_THEME.secondary),
                _ => Style::default(),
            };
            spans.push(Span::styled(&line[start..start + c.len_utf8()], style));
            i += 1;
            continue;
        }

        // An atom runs to the next delimiter; `#\(` keeps its character
        let mut end = i + 1;
        if line[start..].starts_with("#\\") && i + 2 < chars.len() {
            end = i + 3;
        }
        while end < chars.len() && !is_delimiter(chars[end].1) {
            end += 1;
        }
        let stop = chars.get(end).map_or(line.len(), |&(offset, _)| offset);
        let word = &line[start..stop];
        let follows_paren = spans
            .last()
            .is_some_and(|span: &Span| span.content == "(" || span.content == "[");
        spans.push(Span::styled(word, get_word_style(word, follows_paren)));
        i = end;
    }

    Line::from(spans)
}

fn get_word_style(word: &str, in_operator_position: bool) -> Style {
    if word.starts_with('#') || parse_number(word).is_some() {
        return Style::default().fg(DEFAULT_THEME.number);
    }
    match OPS.iter().position(|entry| entry.name == word) {
        Some(id) if OPS[id].op.is_special_form() => Style::default()
            .fg(DEFAULT_THEME.keyword)
            .add_modifier(Modifier::BOLD),
        Some(_) => Style::default().fg(DEFAULT_THEME.builtin),
        None if in_operator_position => Style::default().fg(DEFAULT_THEME.symbol),
        None => Style::default().fg(DEFAULT_THEME.fg),
    }
}

/// Scroll state for the source pane
pub struct SourceScrollState {
    pub offset: usize,
    pub target_line_row: Option<usize>,
}

/// Render the source code pane
pub fn render_source_pane(
    frame: &mut Frame,
    area: Rect,
    source_code: &str,
    current_line: usize,
    is_error: bool,
    is_focused: bool,
    scroll_state: &mut SourceScrollState,
) {
    let block = Block::default()
        .title(" Source Code ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let lines: Vec<&str> = source_code.lines().collect();
    let total_lines = lines.len();

    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders (2), min 1

    // Keep the current line at a fixed visual row while stepping
    let target_row = scroll_state
        .target_line_row
        .unwrap_or(visible_height / 2)
        .min(visible_height.saturating_sub(1));
    scroll_state.target_line_row = Some(target_row);

    if current_line > 0 && current_line <= total_lines {
        scroll_state.offset = (current_line - 1).saturating_sub(target_row);
        if total_lines > visible_height {
            scroll_state.offset = scroll_state.offset.min(total_lines - visible_height);
        } else {
            scroll_state.offset = 0;
        }
    }

    let visible_lines: Vec<Line> = lines
        .iter()
        .enumerate()
        .skip(scroll_state.offset)
        .take(visible_height)
        .map(|(idx, line)| {
            let line_num = idx + 1;
            let is_current = line_num == current_line;
            let line_num_str = format!("{:4} ", line_num);

            let mut content_line = highlight_source_code(line);
            let num_style = if is_current && is_error {
                for span in &mut content_line.spans {
                    span.style = Style::default()
                        .bg(DEFAULT_THEME.error)
                        .fg(Color::White)
                        .add_modifier(Modifier::BOLD);
                }
                Style::default()
                    .fg(DEFAULT_THEME.error)
                    .add_modifier(Modifier::BOLD)
            } else if is_current {
                for span in &mut content_line.spans {
                    span.style = span
                        .style
                        .patch(Style::default().bg(DEFAULT_THEME.current_line_bg));
                }
                Style::default()
                    .fg(DEFAULT_THEME.secondary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(DEFAULT_THEME.comment)
            };

            let mut final_spans = vec![Span::styled(line_num_str, num_style)];
            final_spans.extend(content_line.spans);
            Line::from(final_spans)
        })
        .collect();

    let paragraph = Paragraph::new(visible_lines).block(block);
    frame.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(line: &str) -> Vec<String> {
        highlight_source_code(line)
            .spans
            .iter()
            .map(|span| span.content.to_string())
            .collect()
    }

    #[test]
    fn test_highlight_splits_atoms() {
        assert_eq!(
            words("(define x \"a b\") ; note"),
            vec!["(", "define", " ", "x", " ", "\"a b\"", ")", " ", "; note"]
        );
        assert_eq!(words("'#\\("), vec!["'", "#\\("]);
    }

    #[test]
    fn test_word_styles() {
        assert_eq!(
            get_word_style("lambda", true).fg,
            Some(DEFAULT_THEME.keyword)
        );
        assert_eq!(get_word_style("car", true).fg, Some(DEFAULT_THEME.builtin));
        assert_eq!(get_word_style("-2.5", false).fg, Some(DEFAULT_THEME.number));
        assert_eq!(get_word_style("foo", false).fg, Some(DEFAULT_THEME.fg));
    }
}
