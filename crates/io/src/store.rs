// BoQ document files (JSON)
//
// Load validates the loosely-typed file into a strict BoqDocument and rejects
// the whole document on any bad item. Save writes pretty JSON atomically.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use boqsheet_engine::{
    BoqDocument, BoqError, CancelToken, InMemoryCatalog, LineItem, Product, ProductId, Result,
};
use serde::Deserialize;
use serde_json::Value;

use crate::atomic::write_atomic;

/// File shape before validation. Everything is optional here so missing
/// fields can be reported by name.
#[derive(Debug, Deserialize)]
struct RawDocument {
    #[serde(default, alias = "boq_name")]
    name: Option<String>,
    #[serde(default)]
    items: Option<Vec<RawItem>>,
    #[serde(default)]
    next_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    #[serde(default)]
    id: Option<ProductId>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    quantity: Option<Value>,
    #[serde(default)]
    unit: Option<String>,
    #[serde(default)]
    unit_price: Option<f64>,
    #[serde(default)]
    category: Option<String>,
}

/// Read and validate a BoQ document.
pub fn load(path: &Path) -> Result<BoqDocument> {
    let text = fs::read_to_string(path).map_err(|e| BoqError::read(path, e))?;
    let doc = parse(&text, path)?;
    tracing::debug!(path = %path.display(), name = %doc.name, items = doc.len(), "loaded BoQ");
    Ok(doc)
}

/// Validate JSON text as a BoQ document. `path` is only used in error messages.
pub fn parse(text: &str, path: &Path) -> Result<BoqDocument> {
    let raw: RawDocument =
        serde_json::from_str(text).map_err(|e| BoqError::malformed(path, e.to_string()))?;

    let name = raw
        .name
        .ok_or_else(|| BoqError::malformed(path, "missing required field 'name'"))?;
    let raw_items = raw
        .items
        .ok_or_else(|| BoqError::malformed(path, "missing required field 'items'"))?;

    let mut items = Vec::with_capacity(raw_items.len());
    let mut first_index: HashMap<ProductId, usize> = HashMap::new();

    for (idx, raw_item) in raw_items.into_iter().enumerate() {
        let item = validate_item(raw_item, idx).map_err(|reason| BoqError::malformed(path, reason))?;
        if let Some(prev) = first_index.insert(item.id.clone(), idx) {
            return Err(BoqError::malformed(
                path,
                format!("duplicate product id '{}' (items {} and {})", item.id, prev + 1, idx + 1),
            ));
        }
        items.push(item);
    }

    let next_id = raw.next_id.unwrap_or(items.len() as u64 + 1);
    Ok(BoqDocument { name, items, next_id })
}

fn validate_item(raw: RawItem, idx: usize) -> std::result::Result<LineItem, String> {
    let n = idx + 1;
    let id = raw.id.ok_or_else(|| format!("item {n}: missing required field 'id'"))?;

    let quantity = match raw.quantity {
        None | Some(Value::Null) => {
            return Err(format!("item {n} ('{id}'): missing required field 'quantity'"));
        }
        Some(Value::Number(num)) => num
            .as_f64()
            .ok_or_else(|| format!("item {n} ('{id}'): quantity out of range"))?,
        Some(other) => {
            return Err(format!("item {n} ('{id}'): quantity must be a number, got {other}"));
        }
    };
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(format!("item {n} ('{id}'): quantity {quantity} is negative"));
    }
    if let Some(price) = raw.unit_price {
        if !price.is_finite() {
            return Err(format!("item {n} ('{id}'): unit_price is not a finite number"));
        }
    }

    let name = raw.name.unwrap_or_else(|| id.to_string());
    Ok(LineItem {
        id,
        name,
        quantity,
        unit: raw.unit.filter(|u| !u.is_empty()),
        unit_price: raw.unit_price,
        category: raw.category.filter(|c| !c.is_empty()),
    })
}

/// Write a document as pretty JSON, replacing `path` atomically.
pub fn save(doc: &BoqDocument, path: &Path) -> Result<()> {
    let json = serde_json::to_vec_pretty(doc).map_err(|e| BoqError::write(path, e))?;
    write_atomic(path, &json)?;
    tracing::debug!(path = %path.display(), items = doc.len(), "saved BoQ");
    Ok(())
}

/// Load several documents in order, checking `cancel` before each one.
pub fn load_all(paths: &[PathBuf], cancel: &CancelToken) -> Result<Vec<BoqDocument>> {
    let mut docs = Vec::with_capacity(paths.len());
    for path in paths {
        cancel.check()?;
        docs.push(load(path)?);
    }
    Ok(docs)
}

/// Read a catalog file: a JSON array of products.
pub fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let text = fs::read_to_string(path).map_err(|e| BoqError::read(path, e))?;
    let products: Vec<Product> =
        serde_json::from_str(&text).map_err(|e| BoqError::malformed(path, e.to_string()))?;

    let mut catalog = InMemoryCatalog::new();
    for product in products {
        let id = product.id.clone();
        if catalog.insert(product).is_some() {
            return Err(BoqError::malformed(path, format!("duplicate product id '{id}' in catalog")));
        }
    }
    tracing::debug!(path = %path.display(), products = catalog.len(), "loaded catalog");
    Ok(catalog)
}
