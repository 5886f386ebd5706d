//! Heap pane rendering
//!
//! Shows the state of both pools in the snapshot's heap:
//!
//! - Occupancy of the cell arena and the string pool
//! - Collector counters
//! - Every live cell as `car | cdr`, with nested pairs and closures shown by
//!   index so each row stays one level deep
//! - Every live string slot (symbol names included)

use super::environment::{truncate, ListScrollState};
use crate::interpreter::printer::describe_shallow;
use crate::memory::heap::Heap;
use crate::ui::theme::{border_style, DEFAULT_THEME};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem},
    Frame,
};

fn usage_line(label: &'static str, used: usize, capacity: usize) -> Line<'static> {
    let ratio = if capacity == 0 {
        0.0
    } else {
        used as f64 / capacity as f64
    };
    let color = if ratio > 0.875 {
        DEFAULT_THEME.error
    } else if ratio > 0.5 {
        DEFAULT_THEME.secondary
    } else {
        DEFAULT_THEME.success
    };
    let filled = (ratio * 20.0).round() as usize;
    Line::from(vec![
        Span::styled(format!("{:8}", label), Style::default().fg(DEFAULT_THEME.comment)),
        Span::styled("█".repeat(filled), Style::default().fg(color)),
        Span::styled(
            "░".repeat(20 - filled.min(20)),
            Style::default().fg(DEFAULT_THEME.border_normal),
        ),
        Span::styled(
            format!(" {}/{}", used, capacity),
            Style::default().fg(DEFAULT_THEME.primary),
        ),
    ])
}

/// Build every row of the heap view; the pane scrolls over these
pub fn heap_lines(heap: &Heap, content_width: usize) -> Vec<Line<'static>> {
    let mut lines = vec![
        usage_line("cells", heap.cells_in_use(), heap.cell_capacity()),
        usage_line("strings", heap.strings_in_use(), heap.string_capacity()),
    ];

    let stats = heap.gc_stats();
    lines.push(Line::from(Span::styled(
        format!(
            "gc: {} runs, last freed {} cells / {} strings",
            stats.collections, stats.last_cells_freed, stats.last_strings_freed
        ),
        Style::default().fg(DEFAULT_THEME.comment),
    )));
    lines.push(Line::from(""));

    let header = Style::default()
        .fg(DEFAULT_THEME.fg)
        .add_modifier(Modifier::BOLD);
    lines.push(Line::from(Span::styled("Cells", header)));
    for (index, cell) in heap.live_cells() {
        let label = format!("  #{:<6}", index);
        let budget = content_width.saturating_sub(label.len() + 3) / 2;
        lines.push(Line::from(vec![
            Span::styled(label, Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(
                truncate(&describe_shallow(heap, cell.car), budget),
                Style::default().fg(DEFAULT_THEME.fg),
            ),
            Span::styled(" | ", Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(
                truncate(&describe_shallow(heap, cell.cdr), budget),
                Style::default().fg(DEFAULT_THEME.fg),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("Strings", header)));
    for (index, bytes) in heap.live_strings() {
        let label = format!("  s{:<6}", index);
        let text = String::from_utf8_lossy(bytes);
        lines.push(Line::from(vec![
            Span::styled(label.clone(), Style::default().fg(DEFAULT_THEME.comment)),
            Span::styled(
                truncate(&text, content_width.saturating_sub(label.len())),
                Style::default().fg(DEFAULT_THEME.string),
            ),
        ]));
    }

    lines
}

/// Render the heap pane
pub fn render_heap_pane(
    frame: &mut Frame,
    area: Rect,
    heap: Option<&Heap>,
    is_focused: bool,
    scroll_state: &mut ListScrollState,
) {
    let block = Block::default()
        .title(" Heap ")
        .borders(Borders::ALL)
        .border_style(border_style(is_focused));

    let content_width = area.width.saturating_sub(2) as usize; // borders
    let all_items: Vec<ListItem> = match heap {
        Some(heap) => heap_lines(heap, content_width)
            .into_iter()
            .map(ListItem::new)
            .collect(),
        None => vec![ListItem::new("(no snapshot)").style(Style::default().fg(DEFAULT_THEME.comment))],
    };

    let total_items = all_items.len();
    let visible_height = area.height.saturating_sub(2).max(1) as usize; // Account for borders, min 1
    let max_scroll = total_items.saturating_sub(visible_height);

    // Respect the user's position; only clamp when the view shrinks
    scroll_state.offset = scroll_state.offset.min(max_scroll);
    scroll_state.prev_item_count = total_items;

    let visible_items: Vec<ListItem> = all_items
        .into_iter()
        .skip(scroll_state.offset)
        .take(visible_height)
        .collect();

    frame.render_widget(List::new(visible_items).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::value::Value;

    fn text(line: &Line) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    #[test]
    fn test_heap_lines_list_live_cells_and_strings() {
        let mut heap = Heap::new(8, 4, 4);
        let inner = heap.cons(Value::number(2.0), Value::NIL).unwrap();
        heap.cons(Value::number(1.0), inner).unwrap();
        heap.make_string(b"hello").unwrap();

        let lines: Vec<String> = heap_lines(&heap, 80).iter().map(text).collect();
        assert!(lines[0].ends_with(" 2/8"));
        assert!(lines[1].ends_with(" 1/4"));
        assert!(lines.iter().any(|l| l.contains("#0") && l.contains("2 | ()")));
        assert!(lines.iter().any(|l| l.contains("1 | #<pair 0>")));
        assert!(lines.iter().any(|l| l.contains("hello")));
    }
}
