// XLSX emission of a TabularArtifact
//
// Formula descriptions are resolved to A1 references here, once the sheet
// layout (optional title row, header row) is fixed. Formulas are written as
// live formulas with a cached result so viewers that do not recalculate still
// show correct totals.

use std::path::{Path, PathBuf};

use boqsheet_engine::eval::cell_value;
use boqsheet_engine::table::{Cell, CellRef, ColumnKind, Formula, NumberStyle, RowKind, TabularArtifact};
use boqsheet_engine::{BoqError, Result};
use rust_xlsxwriter::{
    Color, DocProperties, ExcelDateTime, Format, FormatAlign, FormatBorder, Formula as XlsxFormula,
    Workbook, Worksheet, XlsxError,
};
use serde::Serialize;

use crate::atomic::write_atomic;

/// Presentation settings for the emitted sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct SheetStyle {
    pub sheet_name: String,
    /// Optional merged title line above the header row.
    pub title: Option<String>,
    /// 0xRRGGBB
    pub header_color: u32,
    pub header_font_color: u32,
    pub total_color: u32,
    pub quantity_decimals: u8,
    pub price_decimals: u8,
    pub min_col_width: f64,
    pub max_col_width: f64,
}

impl Default for SheetStyle {
    fn default() -> Self {
        Self {
            sheet_name: "Combined BoQ".into(),
            title: None,
            header_color: 0x2196F3,
            header_font_color: 0xFFFFFF,
            total_color: 0x4CAF50,
            quantity_decimals: 2,
            price_decimals: 2,
            min_col_width: 8.0,
            max_col_width: 60.0,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EmitReport {
    pub path: PathBuf,
    pub data_rows: usize,
    pub formulas: usize,
    pub bytes: usize,
    /// blake3 of the written file.
    pub fingerprint: String,
}

/// Check a worksheet name against Excel's rules: 1-31 characters, none of
/// `[ ] : * ? / \`, and no leading or trailing apostrophe.
pub fn validate_sheet_name(name: &str) -> std::result::Result<(), String> {
    const FORBIDDEN: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

    let len = name.chars().count();
    if len == 0 {
        return Err("sheet name must not be empty".into());
    }
    if len > 31 {
        return Err(format!("sheet name '{name}' is {len} characters; Excel allows at most 31"));
    }
    if let Some(ch) = name.chars().find(|c| FORBIDDEN.contains(c)) {
        return Err(format!("sheet name '{name}' contains '{ch}', which Excel does not allow"));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(format!("sheet name '{name}' must not start or end with an apostrophe"));
    }
    Ok(())
}

/// Render and atomically write `artifact` to `dest`.
///
/// On any failure the destination keeps its previous state.
pub fn emit_with_style(artifact: &TabularArtifact, dest: &Path, style: &SheetStyle) -> Result<EmitReport> {
    let (bytes, formulas) = render(artifact, style).map_err(|e| BoqError::write(dest, e))?;
    write_atomic(dest, &bytes)?;

    let fingerprint = blake3::hash(&bytes).to_hex().to_string();
    tracing::info!(
        path = %dest.display(),
        rows = artifact.data_row_count(),
        bytes = bytes.len(),
        "wrote combined BoQ"
    );

    Ok(EmitReport {
        path: dest.to_path_buf(),
        data_rows: artifact.data_row_count(),
        formulas,
        bytes: bytes.len(),
        fingerprint,
    })
}

// ---------------------------------------------------------------------------
// Layout + references
// ---------------------------------------------------------------------------

/// Where artifact row 0 lands on the sheet.
#[derive(Debug, Clone, Copy)]
struct SheetOrigin {
    header_row: u32,
    first_data_row: u32,
}

impl SheetOrigin {
    fn new(style: &SheetStyle) -> Self {
        let header_row = if style.title.is_some() { 1 } else { 0 };
        Self { header_row, first_data_row: header_row + 1 }
    }

    fn sheet_row(&self, artifact_row: usize) -> u32 {
        self.first_data_row + artifact_row as u32
    }

    fn a1(&self, at: CellRef) -> String {
        format!("{}{}", col_to_letter(at.col), self.sheet_row(at.row) + 1)
    }
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Native formula text for a formula description.
fn formula_text(formula: &Formula, origin: SheetOrigin) -> String {
    match *formula {
        Formula::RowSum { row, first_col, last_col } => format!(
            "=SUM({}:{})",
            origin.a1(CellRef::new(row, first_col)),
            origin.a1(CellRef::new(row, last_col))
        ),
        Formula::Product { left, right } => format!("={}*{}", origin.a1(left), origin.a1(right)),
        Formula::ColumnSum { col, first_row, last_row } => format!(
            "=SUM({}:{})",
            origin.a1(CellRef::new(first_row, col)),
            origin.a1(CellRef::new(last_row, col))
        ),
    }
}

// ---------------------------------------------------------------------------
// Formats
// ---------------------------------------------------------------------------

fn build_number_pattern(decimals: u8, thousands: bool) -> String {
    let int_part = if thousands { "#,##0" } else { "0" };
    if decimals == 0 {
        int_part.to_string()
    } else {
        format!("{}.{}", int_part, "0".repeat(decimals as usize))
    }
}

struct Formats {
    title: Format,
    header: Format,
    text: Format,
    quantity: Format,
    money: Format,
    quantity_bold: Format,
    money_bold: Format,
    total_label: Format,
    total_fill: Format,
    total_value: Format,
}

impl Formats {
    fn new(style: &SheetStyle) -> Self {
        let bordered = Format::new().set_border(FormatBorder::Thin);
        let qty_pattern = build_number_pattern(style.quantity_decimals, false);
        let money_pattern = build_number_pattern(style.price_decimals, true);
        let total_fill = bordered
            .clone()
            .set_bold()
            .set_font_color(Color::RGB(style.header_font_color))
            .set_background_color(Color::RGB(style.total_color));

        Self {
            title: Format::new()
                .set_bold()
                .set_font_size(16)
                .set_font_color(Color::RGB(style.header_color))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter),
            header: bordered
                .clone()
                .set_bold()
                .set_font_color(Color::RGB(style.header_font_color))
                .set_background_color(Color::RGB(style.header_color))
                .set_align(FormatAlign::Center)
                .set_align(FormatAlign::VerticalCenter)
                .set_text_wrap(),
            text: bordered.clone(),
            quantity: bordered.clone().set_num_format(&qty_pattern),
            money: bordered.clone().set_num_format(&money_pattern),
            quantity_bold: bordered.clone().set_num_format(&qty_pattern).set_bold(),
            money_bold: bordered.clone().set_num_format(&money_pattern).set_bold(),
            total_label: total_fill.clone().set_align(FormatAlign::Right),
            total_value: total_fill.clone().set_num_format(&money_pattern),
            total_fill,
        }
    }

    fn for_data(&self, kind: ColumnKind) -> &Format {
        match (kind.number_style(), kind.is_computed()) {
            (NumberStyle::Text, _) => &self.text,
            (NumberStyle::Quantity, false) => &self.quantity,
            (NumberStyle::Quantity, true) => &self.quantity_bold,
            (NumberStyle::Money, false) => &self.money,
            (NumberStyle::Money, true) => &self.money_bold,
        }
    }

    fn for_total(&self, cell: &Cell) -> &Format {
        match cell {
            Cell::Text(_) => &self.total_label,
            Cell::Blank => &self.total_fill,
            Cell::Number(_) | Cell::Formula(_) => &self.total_value,
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render the artifact to XLSX bytes. Returns the bytes and the formula count.
///
/// Output is byte-for-byte reproducible for equal artifacts and styles: the
/// document creation time is pinned.
pub fn render(artifact: &TabularArtifact, style: &SheetStyle) -> std::result::Result<(Vec<u8>, usize), XlsxError> {
    let mut workbook = Workbook::new();
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let origin = SheetOrigin::new(style);
    let formats = Formats::new(style);
    let last_col = artifact.columns().len() - 1;

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(&style.sheet_name)?;

    if let Some(ref title) = style.title {
        worksheet.merge_range(0, 0, 0, last_col as u16, title, &formats.title)?;
        worksheet.set_row_height(0, 30)?;
    }

    for (col, column) in artifact.columns().iter().enumerate() {
        worksheet.write_string_with_format(origin.header_row, col as u16, &column.header, &formats.header)?;
    }

    let mut formulas = 0;
    for (r, row) in artifact.rows().iter().enumerate() {
        let sheet_row = origin.sheet_row(r);
        for (col, cell) in row.cells.iter().enumerate() {
            let format = match row.kind {
                RowKind::Data => formats.for_data(artifact.columns()[col].kind),
                RowKind::Total => formats.for_total(cell),
            };
            if write_cell(worksheet, artifact, origin, sheet_row, col as u16, cell, format)? {
                formulas += 1;
            }
        }
    }

    for (col, width) in column_widths(artifact, style).into_iter().enumerate() {
        worksheet.set_column_width(col as u16, width)?;
    }
    worksheet.set_freeze_panes(origin.first_data_row, 0)?;

    let bytes = workbook.save_to_buffer()?;
    Ok((bytes, formulas))
}

/// Write one cell. Returns true when a formula was written.
fn write_cell(
    worksheet: &mut Worksheet,
    artifact: &TabularArtifact,
    origin: SheetOrigin,
    row: u32,
    col: u16,
    cell: &Cell,
    format: &Format,
) -> std::result::Result<bool, XlsxError> {
    match cell {
        Cell::Blank => {
            worksheet.write_blank(row, col, format)?;
        }
        Cell::Text(s) => {
            worksheet.write_string_with_format(row, col, s, format)?;
        }
        Cell::Number(n) => {
            worksheet.write_number_with_format(row, col, *n, format)?;
        }
        Cell::Formula(f) => {
            let cached = cell_value(artifact, cell);
            let formula = XlsxFormula::new(formula_text(f, origin)).set_result(cached.to_string());
            worksheet.write_formula_with_format(row, col, formula, format)?;
            return Ok(true);
        }
    }
    Ok(false)
}

/// Width per column from the longest header line or displayed value.
fn column_widths(artifact: &TabularArtifact, style: &SheetStyle) -> Vec<f64> {
    artifact
        .columns()
        .iter()
        .enumerate()
        .map(|(col, column)| {
            let decimals = match column.kind.number_style() {
                NumberStyle::Money => style.price_decimals,
                _ => style.quantity_decimals,
            } as usize;

            let header_len = column.header.lines().map(|l| l.chars().count()).max().unwrap_or(0);
            let value_len = artifact
                .rows()
                .iter()
                .filter_map(|row| row.cells.get(col))
                .map(|cell| match cell {
                    Cell::Blank => 0,
                    Cell::Text(s) => s.chars().count(),
                    Cell::Number(_) | Cell::Formula(_) => {
                        // Thousands separators add roughly one char per three digits
                        let shown = format!("{:.*}", decimals, cell_value(artifact, cell));
                        shown.len() + shown.len() / 3
                    }
                })
                .max()
                .unwrap_or(0);

            ((header_len.max(value_len) + 2) as f64).clamp(style.min_col_width, style.max_col_width)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use boqsheet_engine::table::{boq_names, build};
    use boqsheet_engine::{reconcile, BoqDocument, LineItem};

    fn sample() -> TabularArtifact {
        let mut a = BoqDocument::new("A");
        a.items.push(LineItem::new("1", "Bolt", 5.0).with_price(2.0));
        let mut b = BoqDocument::new("B");
        b.items.push(LineItem::new("2", "A rather long product description", 1.0).with_price(4.0));
        let boqs = [a, b];
        build(&reconcile(&boqs).unwrap(), &boq_names(&boqs)).unwrap()
    }

    #[test]
    fn test_col_to_letter() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(701), "ZZ");
        assert_eq!(col_to_letter(702), "AAA");
    }

    #[test]
    fn formula_text_without_title() {
        let origin = SheetOrigin::new(&SheetStyle::default());
        // Header on sheet row 1, first data row on sheet row 2
        let sum = Formula::RowSum { row: 0, first_col: 3, last_col: 5 };
        assert_eq!(formula_text(&sum, origin), "=SUM(D2:F2)");

        let product = Formula::Product { left: CellRef::new(2, 6), right: CellRef::new(2, 2) };
        assert_eq!(formula_text(&product, origin), "=G4*C4");

        let total = Formula::ColumnSum { col: 7, first_row: 0, last_row: 9 };
        assert_eq!(formula_text(&total, origin), "=SUM(H2:H11)");
    }

    #[test]
    fn formula_text_with_title_shifts_rows() {
        let style = SheetStyle { title: Some("Combined".into()), ..SheetStyle::default() };
        let origin = SheetOrigin::new(&style);
        let sum = Formula::RowSum { row: 0, first_col: 3, last_col: 4 };
        assert_eq!(formula_text(&sum, origin), "=SUM(D3:E3)");
    }

    #[test]
    fn sheet_name_rules() {
        assert!(validate_sheet_name("Combined BoQ").is_ok());
        assert!(validate_sheet_name(&"x".repeat(31)).is_ok());
        assert!(validate_sheet_name("").is_err());
        assert!(validate_sheet_name(&"x".repeat(32)).unwrap_err().contains("31"));
        assert!(validate_sheet_name("Q1/Q2").unwrap_err().contains("'/'"));
        assert!(validate_sheet_name("'quoted'").is_err());
    }

    #[test]
    fn test_build_number_pattern() {
        assert_eq!(build_number_pattern(2, true), "#,##0.00");
        assert_eq!(build_number_pattern(0, false), "0");
        assert_eq!(build_number_pattern(3, false), "0.000");
    }

    #[test]
    fn widths_fit_longest_value_within_bounds() {
        let t = sample();
        let widths = column_widths(&t, &SheetStyle::default());
        assert_eq!(widths.len(), t.columns().len());
        // "A rather long product description" = 33 chars + 2
        assert_eq!(widths[0], 35.0);
        // Short columns get the minimum
        assert_eq!(widths[1], 8.0);

        let narrow = SheetStyle { max_col_width: 20.0, ..SheetStyle::default() };
        assert_eq!(column_widths(&t, &narrow)[0], 20.0);
    }

    #[test]
    fn render_counts_formulas() {
        let t = sample();
        let (bytes, formulas) = render(&t, &SheetStyle::default()).unwrap();
        // Two per data row plus the grand total
        assert_eq!(formulas, 2 * 2 + 1);
        assert!(bytes.len() > 100);
    }
}
