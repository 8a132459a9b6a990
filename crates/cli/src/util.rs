use unicode_width::UnicodeWidthStr;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate to `width` display columns, ending in ".." when cut.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if display_width(s) <= width {
        return s.to_string();
    }
    if width < 3 {
        return s
            .chars()
            .next()
            .filter(|ch| unicode_width::UnicodeWidthChar::width(*ch).unwrap_or(0) <= width)
            .map(String::from)
            .unwrap_or_default();
    }

    let budget = width - 2;
    let mut used = 0;
    let mut out = String::new();
    for ch in s.chars() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            break;
        }
        used += cw;
        out.push(ch);
    }
    out.push_str("..");
    out
}

/// Pad on the right (or truncate) to exactly `width` display columns.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let t = truncate_display(s, width);
    let w = display_width(&t);
    format!("{}{}", t, " ".repeat(width.saturating_sub(w)))
}

/// Pad on the left to `width` display columns. Numbers are never truncated.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let w = display_width(s);
    format!("{}{}", " ".repeat(width.saturating_sub(w)), s)
}

/// Fixed-point rendering used for quantities and money in terminal output.
pub(crate) fn fmt_amount(value: f64, decimals: u8) -> String {
    format!("{:.*}", decimals as usize, value)
}

#[derive(Clone, Copy, PartialEq)]
pub(crate) enum Align {
    Left,
    Right,
}

/// Plain-text table for terminal listings. Column widths fit the widest cell,
/// capped at `max_width` for left-aligned (text) columns.
pub(crate) struct TextTable {
    headers: Vec<(String, Align)>,
    rows: Vec<Vec<String>>,
    max_width: usize,
}

impl TextTable {
    pub(crate) fn new(headers: &[(&str, Align)]) -> Self {
        Self {
            headers: headers.iter().map(|(h, a)| (h.to_string(), *a)).collect(),
            rows: Vec::new(),
            max_width: 40,
        }
    }

    pub(crate) fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(c, (h, align))| {
                let widest = self
                    .rows
                    .iter()
                    .filter_map(|r| r.get(c))
                    .map(|s| display_width(s))
                    .chain(std::iter::once(display_width(h)))
                    .max()
                    .unwrap_or(0);
                if *align == Align::Left { widest.min(self.max_width) } else { widest }
            })
            .collect()
    }

    pub(crate) fn render(&self) -> String {
        let widths = self.widths();
        let line = |cells: &mut dyn Iterator<Item = &str>| -> String {
            cells
                .zip(&self.headers)
                .zip(&widths)
                .map(|((cell, (_, align)), w)| match align {
                    Align::Left => pad_right(cell, *w),
                    Align::Right => pad_left(cell, *w),
                })
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        };

        let mut out = String::new();
        out.push_str(&line(&mut self.headers.iter().map(|(h, _)| h.as_str())));
        out.push('\n');
        let rule: usize = widths.iter().sum::<usize>() + 2 * widths.len().saturating_sub(1);
        out.push_str(&"-".repeat(rule));
        out.push('\n');
        for row in &self.rows {
            out.push_str(&line(&mut row.iter().map(String::as_str)));
            out.push('\n');
        }
        out
    }
}
