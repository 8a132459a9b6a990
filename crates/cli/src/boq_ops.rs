// BoQ document commands: create, edit, inspect, validate
//
// Every edit is load -> mutate -> atomic save. A failed edit leaves the file
// exactly as it was.

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use boqsheet_engine::{BoqDocument, LineItem, ProductId};
use boqsheet_io::store::{load, load_catalog, save};
use serde::Serialize;

use crate::exit_codes::exit_code;
use crate::util::{fmt_amount, Align, TextTable};
use crate::CliError;

/// What `add` should put into the document.
pub enum AddSource {
    Catalog(PathBuf),
    Manual {
        name: String,
        unit: Option<String>,
        price: Option<f64>,
        category: Option<String>,
    },
}

pub fn cmd_new(name: String, output: PathBuf, force: bool) -> Result<(), CliError> {
    if name.trim().is_empty() {
        return Err(CliError::args("BoQ name must not be empty"));
    }
    if output.exists() && !force {
        return Err(CliError::args(format!("{} already exists", output.display()))
            .with_hint("pass --force to overwrite"));
    }
    save(&BoqDocument::new(name), &output)?;
    Ok(())
}

pub fn cmd_add(file: PathBuf, id: String, qty: f64, source: AddSource) -> Result<(), CliError> {
    let id = ProductId::parse(id)?;
    let mut doc = load(&file)?;

    match source {
        AddSource::Catalog(path) => {
            let catalog = load_catalog(&path)?;
            doc.add_from_catalog(&catalog, &id, qty)?;
        }
        AddSource::Manual { name, unit, price, category } => {
            let mut item = LineItem::new(id.clone(), name, qty);
            // Stored files treat "" as absent; do the same here
            item.unit = unit.filter(|u| !u.is_empty());
            item.unit_price = price;
            item.category = category.filter(|c| !c.is_empty());
            doc.add_item(item)?;
        }
    }

    save(&doc, &file)?;
    if let Some(item) = doc.item(&id) {
        tracing::debug!(id = %id, quantity = item.quantity, "item added");
    }
    Ok(())
}

pub fn cmd_remove(file: PathBuf, id: String) -> Result<(), CliError> {
    let id = ProductId::parse(id)?;
    let mut doc = load(&file)?;
    let removed = doc.remove_item(&id)?;
    save(&doc, &file)?;
    tracing::debug!(id = %removed.id, name = %removed.name, "item removed");
    Ok(())
}

pub fn cmd_set_qty(file: PathBuf, id: String, qty: f64) -> Result<(), CliError> {
    let id = ProductId::parse(id)?;
    let mut doc = load(&file)?;
    doc.set_quantity(&id, qty)?;
    save(&doc, &file)?;
    Ok(())
}

pub fn cmd_move(file: PathBuf, id: String, up: bool) -> Result<(), CliError> {
    let id = ProductId::parse(id)?;
    let mut doc = load(&file)?;
    let index = doc
        .position(&id)
        .ok_or_else(|| boqsheet_engine::BoqError::MissingItem(id.clone()))?;

    let moved = if up { doc.move_up(index) } else { doc.move_down(index) };
    if moved {
        save(&doc, &file)?;
    } else {
        // Already at the edge; not an error
        tracing::debug!(id = %id, "item already at the {} of the list", if up { "top" } else { "bottom" });
    }
    Ok(())
}

pub fn cmd_refresh(file: PathBuf, catalog: PathBuf, quiet: bool) -> Result<(), CliError> {
    let mut doc = load(&file)?;
    let catalog = load_catalog(&catalog)?;
    let changed = doc.refresh_from_catalog(&catalog);
    save(&doc, &file)?;
    if !quiet {
        println!("{} price(s) updated", changed);
    }
    Ok(())
}

// ============================================================================
// show
// ============================================================================

#[derive(Serialize)]
struct ShowItem<'a> {
    #[serde(flatten)]
    item: &'a LineItem,
    line_total: f64,
}

#[derive(Serialize)]
struct ShowOutput<'a> {
    name: &'a str,
    next_id: u64,
    items: Vec<ShowItem<'a>>,
    total: f64,
}

pub fn cmd_show(file: PathBuf, json: bool) -> Result<(), CliError> {
    let doc = load(&file)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if json {
        let shown = ShowOutput {
            name: &doc.name,
            next_id: doc.next_id,
            items: doc
                .items
                .iter()
                .map(|item| ShowItem { item, line_total: item.line_total() })
                .collect(),
            total: doc.total(),
        };
        let text = serde_json::to_string_pretty(&shown).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(out, "{}", text).map_err(|e| CliError::io(e.to_string()))?;
        return Ok(());
    }

    write_listing(&mut out, &doc).map_err(|e| CliError::io(e.to_string()))
}

fn write_listing(out: &mut impl Write, doc: &BoqDocument) -> io::Result<()> {
    writeln!(out, "{} ({} item(s))", doc.name, doc.len())?;
    if doc.is_empty() {
        return Ok(());
    }
    writeln!(out)?;

    let mut table = TextTable::new(&[
        ("#", Align::Right),
        ("Id", Align::Left),
        ("Name", Align::Left),
        ("Qty", Align::Right),
        ("Unit", Align::Left),
        ("Price", Align::Right),
        ("Total", Align::Right),
    ]);
    for (i, item) in doc.items.iter().enumerate() {
        table.push(vec![
            (i + 1).to_string(),
            item.id.to_string(),
            item.name.clone(),
            fmt_amount(item.quantity, 2),
            item.unit.clone().unwrap_or_default(),
            item.unit_price.map(|p| fmt_amount(p, 2)).unwrap_or_else(|| "-".into()),
            fmt_amount(item.line_total(), 2),
        ]);
    }
    write!(out, "{}", table.render())?;
    writeln!(out)?;
    writeln!(out, "Total: {}", fmt_amount(doc.total(), 2))
}

// ============================================================================
// validate
// ============================================================================

#[derive(Serialize)]
struct ValidateEntry {
    path: PathBuf,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn validate_one(path: &Path) -> (ValidateEntry, Option<u8>) {
    match load(path) {
        Ok(doc) => (
            ValidateEntry {
                path: path.to_path_buf(),
                ok: true,
                name: Some(doc.name),
                items: Some(doc.items.len()),
                error: None,
            },
            None,
        ),
        Err(e) => (
            ValidateEntry {
                path: path.to_path_buf(),
                ok: false,
                name: None,
                items: None,
                error: Some(e.to_string()),
            },
            Some(exit_code(&e)),
        ),
    }
}

/// Check every file; report all of them, exit with the first failure's code.
pub fn cmd_validate(files: Vec<PathBuf>, json: bool) -> Result<(), CliError> {
    let mut entries = Vec::with_capacity(files.len());
    let mut first_failure = None;
    for path in &files {
        let (entry, code) = validate_one(path);
        if first_failure.is_none() {
            first_failure = code;
        }
        entries.push(entry);
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        let text = serde_json::to_string_pretty(&entries).map_err(|e| CliError::io(e.to_string()))?;
        writeln!(out, "{}", text).map_err(|e| CliError::io(e.to_string()))?;
    } else {
        for entry in &entries {
            let line = match (&entry.error, &entry.name) {
                (Some(err), _) => format!("FAIL  {}", err),
                (None, Some(name)) => format!(
                    "ok    {}  ({}, {} item(s))",
                    entry.path.display(),
                    name,
                    entry.items.unwrap_or(0)
                ),
                (None, None) => format!("ok    {}", entry.path.display()),
            };
            writeln!(out, "{}", line).map_err(|e| CliError::io(e.to_string()))?;
        }
    }

    match first_failure {
        None => Ok(()),
        // Details are already on stdout
        Some(code) => Err(CliError { code, message: String::new(), hint: None }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listing_shows_missing_price_as_dash() {
        let mut doc = BoqDocument::new("Site");
        doc.add_item(LineItem::new("1", "Bolt", 5.0).with_unit("pcs").with_price(2.0)).unwrap();
        doc.add_item(LineItem::new("2", "Gasket", 1.0)).unwrap();

        let mut buf = Vec::new();
        write_listing(&mut buf, &doc).unwrap();
        let text = String::from_utf8(buf).unwrap();

        assert!(text.starts_with("Site (2 item(s))"));
        let gasket = text.lines().find(|l| l.contains("Gasket")).unwrap();
        assert!(gasket.contains(" - "), "{gasket}");
        assert!(text.trim_end().ends_with("Total: 10.00"));
    }

    #[test]
    fn empty_listing_has_no_table() {
        let mut buf = Vec::new();
        write_listing(&mut buf, &BoqDocument::new("Empty")).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "Empty (0 item(s))\n");
    }
}
