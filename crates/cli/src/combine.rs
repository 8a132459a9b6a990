// boq combine: merge BoQ files into one formula-driven spreadsheet

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use boqsheet_config::Settings;
use boqsheet_engine::{CancelToken, TableLabels};
use boqsheet_io::combine::SnapshotConflict;
use boqsheet_io::{combine_files, validate_sheet_name, CombineOptions, CombineReport, SheetStyle};

use crate::util::fmt_amount;
use crate::CliError;

pub const DEFAULT_OUTPUT: &str = "combined.xlsx";

/// Presentation overrides taken from the command line.
#[derive(Debug, Default)]
pub struct Overrides {
    pub sheet_name: Option<String>,
    pub title: Option<String>,
}

pub fn load_settings(config: Option<&Path>) -> Settings {
    match config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
}

/// Build combine options from persisted settings plus flag overrides.
pub fn options_from_settings(settings: &Settings, overrides: &Overrides) -> CombineOptions {
    let labels = TableLabels {
        name: settings.label_name.clone(),
        unit: settings.label_unit.clone(),
        unit_price: settings.label_unit_price.clone(),
        quantity_sum: settings.label_quantity_sum.clone(),
        total_price: settings.label_total_price.clone(),
        grand_total: settings.label_grand_total.clone(),
    };

    let (min_col_width, max_col_width) = settings.col_width_bounds();
    let style = SheetStyle {
        sheet_name: overrides
            .sheet_name
            .clone()
            .unwrap_or_else(|| settings.sheet_name.clone()),
        title: overrides.title.clone().or_else(|| settings.title.clone()),
        header_color: settings.header_color_rgb(),
        header_font_color: settings.header_font_color_rgb(),
        total_color: settings.total_color_rgb(),
        quantity_decimals: settings.quantity_decimals,
        price_decimals: settings.price_decimals,
        min_col_width,
        max_col_width,
    };

    CombineOptions { labels, style }
}

/// `-o` wins; otherwise `output.directory` from settings, otherwise the cwd.
pub fn resolve_output(output: Option<PathBuf>, settings: &Settings) -> PathBuf {
    output.unwrap_or_else(|| match &settings.output_directory {
        Some(dir) => dir.join(DEFAULT_OUTPUT),
        None => PathBuf::from(DEFAULT_OUTPUT),
    })
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_combine(
    files: Vec<PathBuf>,
    output: Option<PathBuf>,
    sheet_name: Option<String>,
    title: Option<String>,
    config: Option<PathBuf>,
    json: bool,
    quiet: bool,
) -> Result<(), CliError> {
    if sheet_name.as_deref().is_some_and(|s| s.trim().is_empty()) {
        return Err(CliError::args("--sheet-name must not be empty"));
    }
    if let Some(name) = sheet_name.as_deref() {
        validate_sheet_name(name).map_err(CliError::args)?;
    }

    let settings = load_settings(config.as_deref());
    let options = options_from_settings(&settings, &Overrides { sheet_name, title });
    validate_sheet_name(&options.style.sheet_name)
        .map_err(|e| CliError::args(e).with_hint("fix `sheet.name` in the settings file"))?;
    let dest = resolve_output(output, &settings);

    tracing::debug!(files = files.len(), dest = %dest.display(), "combining");
    let report = combine_files(&files, &dest, &options, &CancelToken::new())?;

    if !quiet {
        for conflict in &report.conflicts {
            eprintln!("warning: {}", describe_conflict(conflict));
        }
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let text = serde_json::to_string_pretty(&report).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(out, "{}", text).map_err(|e| CliError::io(e.to_string()))?;
    } else if !quiet {
        write_summary(&mut out, &report, settings.price_decimals).map_err(|e| CliError::io(e.to_string()))?;
    }
    Ok(())
}

pub fn describe_conflict(conflict: &SnapshotConflict) -> String {
    format!(
        "product '{}' ({}) differs in {}; kept the snapshot from '{}'",
        conflict.product,
        conflict.kept_name,
        conflict.differs_in.join(", "),
        conflict.kept_from,
    )
}

fn write_summary(out: &mut impl Write, report: &CombineReport, decimals: u8) -> io::Result<()> {
    writeln!(
        out,
        "Combined {} BoQ(s), {} unique item(s) -> {}",
        report.boqs.len(),
        report.unique_items,
        report.output.path.display()
    )?;
    writeln!(out, "Grand total: {}", fmt_amount(report.grand_total, decimals))?;
    if !report.conflicts.is_empty() {
        writeln!(out, "Conflicts:   {}", report.conflicts.len())?;
    }
    writeln!(out, "Fingerprint: blake3:{}", report.output.fingerprint)
}
