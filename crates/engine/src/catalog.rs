//! Catalog boundary.
//!
//! The product catalog lives outside this crate. Authoring consults it to
//! snapshot products into line items; reconciliation never does.

use rustc_hash::FxHashMap;

use crate::model::{Product, ProductId};

/// Lookup-by-identifier capability of an external product catalog.
pub trait Catalog {
    fn find(&self, id: &ProductId) -> Option<Product>;
}

/// Catalog held entirely in memory.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCatalog {
    products: FxHashMap<ProductId, Product>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_products(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::new();
        for product in products {
            catalog.insert(product);
        }
        catalog
    }

    /// Insert or replace a product. Returns the previous record, if any.
    pub fn insert(&mut self, product: Product) -> Option<Product> {
        self.products.insert(product.id.clone(), product)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl Catalog for InMemoryCatalog {
    fn find(&self, id: &ProductId) -> Option<Product> {
        self.products.get(id).cloned()
    }
}
