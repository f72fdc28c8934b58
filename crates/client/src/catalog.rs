//! Reconciled, categorized view of the catalog.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use catalog_core::{Entity, ProductId};
use catalog_products::{Category, Product, classify};

/// Products partitioned into display categories.
///
/// Derived data: rebuilt from a product list and a tombstone set, never
/// patched in place. Within a category, products keep the server's order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorizedCatalog {
    furniture: Vec<Product>,
    books: Vec<Product>,
    dvd: Vec<Product>,
}

impl CategorizedCatalog {
    pub fn furniture(&self) -> &[Product] {
        &self.furniture
    }

    pub fn books(&self) -> &[Product] {
        &self.books
    }

    pub fn dvd(&self) -> &[Product] {
        &self.dvd
    }

    pub fn category(&self, category: Category) -> &[Product] {
        match category {
            Category::Furniture => &self.furniture,
            Category::Books => &self.books,
            Category::Dvd => &self.dvd,
        }
    }

    /// Ids listed under `category`, in display order.
    pub fn ids(&self, category: Category) -> Vec<ProductId> {
        self.category(category).iter().map(Entity::id).collect()
    }

    pub fn len(&self) -> usize {
        self.furniture.len() + self.books.len() + self.dvd.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.iter().any(|(_, product)| product.id() == id)
    }

    /// Every listed product with its category, category by category.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &Product)> + '_ {
        Category::ALL
            .into_iter()
            .flat_map(move |category| self.category(category).iter().map(move |p| (category, p)))
    }

    fn bucket_mut(&mut self, category: Category) -> &mut Vec<Product> {
        match category {
            Category::Furniture => &mut self.furniture,
            Category::Books => &mut self.books,
            Category::Dvd => &mut self.dvd,
        }
    }
}

/// Drop tombstoned products, then partition the rest by category.
///
/// Products matching no category are left out of every list.
pub fn reconcile(products: &[Product], tombstones: &BTreeSet<ProductId>) -> CategorizedCatalog {
    let mut catalog = CategorizedCatalog::default();

    for product in products.iter().filter(|p| !tombstones.contains(&p.id())) {
        if let Some(category) = classify(product) {
            catalog.bucket_mut(category).push(product.clone());
        }
    }

    catalog
}

/// In-memory catalog as last loaded, minus everything deleted since.
#[derive(Debug, Clone)]
pub struct CatalogState {
    products: Vec<Product>,
    categorized: CategorizedCatalog,
    loaded_at: DateTime<Utc>,
}

impl CatalogState {
    /// Reconcile a fresh server listing against the tombstone set.
    pub fn from_server(products: Vec<Product>, tombstones: &BTreeSet<ProductId>) -> Self {
        let products: Vec<Product> = products
            .into_iter()
            .filter(|p| !tombstones.contains(&p.id()))
            .collect();
        let categorized = reconcile(&products, &BTreeSet::new());

        Self {
            products,
            categorized,
            loaded_at: Utc::now(),
        }
    }

    /// All non-tombstoned products, including uncategorized ones.
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn categorized(&self) -> &CategorizedCatalog {
        &self.categorized
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }

    pub fn contains(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id() == id)
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }

    /// Remove `ids` and re-derive the categories in one step.
    ///
    /// Returns how many products were actually removed.
    pub fn remove_all(&mut self, ids: &BTreeSet<ProductId>) -> usize {
        let before = self.products.len();
        self.products.retain(|p| !ids.contains(&p.id()));
        self.categorized = reconcile(&self.products, &BTreeSet::new());
        before - self.products.len()
    }
}
