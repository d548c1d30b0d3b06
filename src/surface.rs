//! Clipped writes into a ratatui [`Buffer`].
//!
//! `Buffer::set_stringn` panics on coordinates outside its area, and a
//! widget handed a region by the partitioner may still be partially off
//! screen after a resize. Everything here silently drops what does not fit.

use ratatui::{
    buffer::Buffer,
    layout::{Position, Rect},
    style::Style,
    text::Line,
};

/// Display width of `text` in terminal columns.
pub fn text_width(text: &str) -> u16 {
    Line::from(text).width().try_into().unwrap_or(u16::MAX)
}

/// Write `text` at (`x`, `y`) using at most `max_width` columns.
/// Returns the column right after the last written cell.
pub fn put_str(buf: &mut Buffer, x: u16, y: u16, text: &str, max_width: u16, style: Style) -> u16 {
    if max_width == 0 || !buf.area.contains(Position::new(x, y)) {
        return x;
    }
    let room = buf.area.right().saturating_sub(x).min(max_width);
    buf.set_stringn(x, y, text, room as usize, style).0
}

/// Write `text` so that it ends at the right edge of the `width` columns
/// starting at `x`. Nothing is written if it does not fit.
pub fn put_str_right(buf: &mut Buffer, x: u16, y: u16, width: u16, text: &str, style: Style) {
    let len = text_width(text);
    if len > width {
        return;
    }
    put_str(buf, x.saturating_add(width - len), y, text, len, style);
}

pub fn put_cell(buf: &mut Buffer, x: u16, y: u16, symbol: &str, style: Style) {
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_symbol(symbol).set_style(style);
    }
}

pub fn fill(buf: &mut Buffer, area: Rect, symbol: &str, style: Style) {
    let area = area.intersection(buf.area);
    for y in area.top()..area.bottom() {
        for x in area.left()..area.right() {
            put_cell(buf, x, y, symbol, style);
        }
    }
}

/// Text of row `y` between columns `x` and `x + width`, for assertions.
pub fn row_text(buf: &Buffer, x: u16, y: u16, width: u16) -> String {
    (x..x.saturating_add(width))
        .filter_map(|col| buf.cell((col, y)))
        .map(|cell| cell.symbol())
        .collect()
}
