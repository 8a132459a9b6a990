use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::catalog::Catalog;
use crate::error::{BoqError, Result};

// ---------------------------------------------------------------------------
// Product identity
// ---------------------------------------------------------------------------

/// Opaque, stable product identifier.
///
/// Files may carry ids as JSON strings or integers; integers are normalised to
/// their decimal text so `7` and `"7"` name the same product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Checked constructor for ids typed by a user. Blank ids are rejected.
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(BoqError::EmptyProductId);
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ProductId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(s) => Self::parse(s).map_err(serde::de::Error::custom),
            RawId::Unsigned(n) => Ok(Self(n.to_string())),
            RawId::Signed(n) => Ok(Self(n.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Catalog record (read-only lookup)
// ---------------------------------------------------------------------------

/// A product as the external catalog knows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// `None` = no price set, which is not the same as a price of zero.
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

// ---------------------------------------------------------------------------
// BoQ line items
// ---------------------------------------------------------------------------

/// One product/quantity entry with the snapshot taken when it was added.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineItem {
    pub id: ProductId,
    pub name: String,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl LineItem {
    pub fn new(id: impl Into<ProductId>, name: impl Into<String>, quantity: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            quantity,
            unit: None,
            unit_price: None,
            category: None,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = Some(unit.into());
        self
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.unit_price = Some(price);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Snapshot a catalog product at the given quantity.
    pub fn from_product(product: &Product, quantity: f64) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            quantity,
            unit: product.unit.clone(),
            unit_price: product.price,
            category: product.category.clone(),
        }
    }

    /// Quantity times unit price; a missing price counts as zero.
    pub fn line_total(&self) -> f64 {
        self.quantity * self.unit_price.unwrap_or(0.0)
    }
}

/// Reject NaN and infinite prices. JSON cannot carry them.
pub fn check_price(price: Option<f64>) -> Result<Option<f64>> {
    match price {
        Some(p) if !p.is_finite() => Err(BoqError::InvalidPrice(p)),
        other => Ok(other),
    }
}

/// Reject negative, NaN and infinite quantities.
pub fn check_quantity(quantity: f64) -> Result<f64> {
    if quantity.is_finite() && quantity >= 0.0 {
        Ok(quantity)
    } else {
        Err(BoqError::InvalidQuantity(quantity))
    }
}

// ---------------------------------------------------------------------------
// BoQ document
// ---------------------------------------------------------------------------

/// A named, ordered list of line items. Each product id appears at most once.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoqDocument {
    pub name: String,
    pub items: Vec<LineItem>,
    /// Authoring-only counter; reconciliation never looks at it.
    pub next_id: u64,
}

impl BoqDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), items: Vec::new(), next_id: 1 }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item(&self, id: &ProductId) -> Option<&LineItem> {
        self.items.iter().find(|i| &i.id == id)
    }

    /// Index of the item for `id`, if present.
    pub fn position(&self, id: &ProductId) -> Option<usize> {
        self.items.iter().position(|i| &i.id == id)
    }

    /// Sum of every line total.
    pub fn total(&self) -> f64 {
        self.items.iter().map(LineItem::line_total).sum()
    }

    /// Add a line item. A product already present has its quantity increased
    /// and keeps its original snapshot.
    ///
    /// Anything the file format cannot represent (blank id, non-finite price,
    /// a merged quantity that overflows) is rejected and the document is left
    /// unchanged.
    pub fn add_item(&mut self, item: LineItem) -> Result<()> {
        if item.id.as_str().trim().is_empty() {
            return Err(BoqError::EmptyProductId);
        }
        check_quantity(item.quantity)?;
        check_price(item.unit_price)?;
        match self.position(&item.id) {
            Some(idx) => {
                self.items[idx].quantity = check_quantity(self.items[idx].quantity + item.quantity)?;
            }
            None => {
                self.items.push(item);
                self.next_id += 1;
            }
        }
        Ok(())
    }

    /// Look the product up in the catalog and add it with a fresh snapshot.
    pub fn add_from_catalog(
        &mut self,
        catalog: &dyn Catalog,
        id: &ProductId,
        quantity: f64,
    ) -> Result<()> {
        let product = catalog
            .find(id)
            .ok_or_else(|| BoqError::UnknownProduct(id.clone()))?;
        self.add_item(LineItem::from_product(&product, quantity))
    }

    pub fn remove_item(&mut self, id: &ProductId) -> Result<LineItem> {
        let idx = self
            .position(id)
            .ok_or_else(|| BoqError::MissingItem(id.clone()))?;
        Ok(self.items.remove(idx))
    }

    pub fn set_quantity(&mut self, id: &ProductId, quantity: f64) -> Result<()> {
        let quantity = check_quantity(quantity)?;
        let idx = self
            .position(id)
            .ok_or_else(|| BoqError::MissingItem(id.clone()))?;
        self.items[idx].quantity = quantity;
        Ok(())
    }

    /// Swap the item at `index` with its predecessor. Returns false at the top.
    pub fn move_up(&mut self, index: usize) -> bool {
        if index == 0 || index >= self.items.len() {
            return false;
        }
        self.items.swap(index - 1, index);
        true
    }

    /// Swap the item at `index` with its successor. Returns false at the bottom.
    pub fn move_down(&mut self, index: usize) -> bool {
        if index + 1 >= self.items.len() {
            return false;
        }
        self.items.swap(index, index + 1);
        true
    }

    /// Re-snapshot every item still present in the catalog.
    ///
    /// Items the catalog no longer knows keep their saved snapshot. Returns the
    /// number of items whose unit price changed.
    pub fn refresh_from_catalog(&mut self, catalog: &dyn Catalog) -> usize {
        let mut price_changes = 0;
        for item in &mut self.items {
            let Some(product) = catalog.find(&item.id) else {
                continue;
            };
            if item.unit_price != product.price {
                price_changes += 1;
            }
            item.name = product.name;
            item.unit_price = product.price;
            item.unit = product.unit;
            item.category = product.category;
        }
        price_changes
    }
}
