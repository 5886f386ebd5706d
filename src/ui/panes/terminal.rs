//! Terminal output pane rendering
//!
//! Shows what `display`, `write` and `newline` printed up to the current
//! snapshot, followed by the value or error of the form just evaluated.

use crate::snapshot::Snapshot;
use crate::ui::theme::{border_style, DEFAULT_THEME};
use ratatui::{
    layout::Rect,
    style::Style,
    widgets::{Block, Borders, List, ListItem, Padding, Paragraph},
    Frame,
};

/// Render the terminal output pane
pub fn render_terminal_pane(
    frame: &mut Frame,
    area: Rect,
    snapshot: Option<&Snapshot>,
    is_focused: bool,
    scroll_offset: &mut usize,
) {
    let block = Block::default()
        .title(" Terminal Output ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let mut all_items: Vec<ListItem> = Vec::new();
    if let Some(snapshot) = snapshot {
        all_items.extend(
            snapshot
                .terminal
                .get_output()
                .into_iter()
                .map(|line| ListItem::new(line).style(Style::default().fg(DEFAULT_THEME.fg))),
        );
        if let Some(result) = &snapshot.result {
            all_items.push(
                ListItem::new(format!("=> {}", result))
                    .style(Style::default().fg(DEFAULT_THEME.result_value)),
            );
        }
        if let Some(error) = &snapshot.error {
            all_items.push(
                ListItem::new(format!("; error: {}", error))
                    .style(Style::default().fg(DEFAULT_THEME.error)),
            );
        }
    }

    if all_items.is_empty() {
        let paragraph = Paragraph::new("(no output)")
            .block(block)
            .style(Style::default().fg(DEFAULT_THEME.comment));
        frame.render_widget(paragraph, area);
        return;
    }

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1

    if total_items > visible_height {
        *scroll_offset = (*scroll_offset).min(total_items - visible_height);
    } else {
        *scroll_offset = 0;
    }

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(*scroll_offset)
        .take(visible_height)
        .collect();

    let list = List::new(visible_items).block(block.padding(Padding::new(1, 0, 0, 0)));
    frame.render_widget(list, area);
}
