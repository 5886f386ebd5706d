//! Global environment pane rendering
//!
//! Lists the interaction environment's bindings, oldest definition first,
//! with each value in its `write` form. Bindings introduced by the form just
//! evaluated are not tracked separately; the newest ones are simply last.

use crate::snapshot::Binding;
use crate::ui::theme::{border_style, DEFAULT_THEME};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

/// Scroll state for list panes that follow newly appended items
pub struct ListScrollState {
    pub offset: usize,
    pub prev_item_count: usize,
}

/// Render the environment pane
pub fn render_environment_pane(
    frame: &mut Frame,
    area: Rect,
    bindings: &[Binding],
    is_focused: bool,
    scroll_state: &mut ListScrollState,
) {
    let block = Block::default()
        .title(format!(" Global Environment ({}) ", bindings.len()))
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let content_width = area.width.saturating_sub(2) as usize;
    let name_width = bindings
        .iter()
        .map(|b| b.name.chars().count())
        .max()
        .unwrap_or(0)
        .min(content_width / 2);

    let all_items: Vec<ListItem> = if bindings.is_empty() {
        vec![ListItem::new("(no definitions)").style(Style::default().fg(DEFAULT_THEME.comment))]
    } else {
        bindings
            .iter()
            .map(|binding| {
                let budget = content_width.saturating_sub(name_width + 3);
                ListItem::new(Line::from(vec![
                    Span::styled(
                        format!("{:width$}", binding.name, width = name_width),
                        Style::default().fg(DEFAULT_THEME.symbol),
                    ),
                    Span::styled(" = ", Style::default().fg(DEFAULT_THEME.comment)),
                    Span::styled(
                        truncate(&binding.value, budget),
                        Style::default().fg(DEFAULT_THEME.fg),
                    ),
                ]))
            })
            .collect()
    };

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize;

    // Follow the newest definition when the list grows
    if total_items > scroll_state.prev_item_count {
        scroll_state.offset = usize::MAX;
    }
    scroll_state.prev_item_count = total_items;
    scroll_state.offset = scroll_state
        .offset
        .min(total_items.saturating_sub(visible_height));

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

/// Cut `text` to at most `width` characters, marking the cut with `…`
pub(super) fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let kept: String = text.chars().take(width.saturating_sub(1)).collect();
    format!("{}…", kept)
}
