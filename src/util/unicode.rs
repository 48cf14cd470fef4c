use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

/// Cells a label occupies in the terminal. Measured per grapheme so task
/// badges like `✅🔗` and Turkish combining marks count correctly.
fn display_width(s: &str) -> usize {
    s.graphemes(true).map(cells).sum()
}

/// Emoji presentation sequences (a base plus VS16) take two cells even
/// when the base alone is narrow.
fn cells(grapheme: &str) -> usize {
    let width = grapheme.width();
    if grapheme.contains('\u{FE0F}') { width.max(2) } else { width }
}

/// Cut `s` to at most `max_cells`, ending in `…` when anything was dropped.
/// Wide graphemes are never split.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if display_width(s) <= max_cells {
        return s.to_string();
    }
    let Some(budget) = max_cells.checked_sub(1) else {
        return String::new();
    };
    let mut used = 0;
    let mut kept: String = s
        .graphemes(true)
        .take_while(|g| {
            used += cells(g);
            used <= budget
        })
        .collect();
    kept.push('…');
    kept
}

/// Pad with spaces on the right up to `width` cells. Wider strings are
/// returned unchanged.
pub fn pad_to_width(s: &str, width: usize) -> String {
    let missing = width.saturating_sub(display_width(s));
    format!("{s}{}", " ".repeat(missing))
}
