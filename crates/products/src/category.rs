//! Display categories and the classifier that assigns them.

use serde::{Deserialize, Serialize};

use crate::product::Measured;

/// Display bucket a product is listed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Furniture,
    Books,
    Dvd,
}

impl Category {
    /// All categories, in the order the catalog lists them.
    pub const ALL: [Category; 3] = [Category::Furniture, Category::Books, Category::Dvd];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Furniture => "furniture",
            Category::Books => "books",
            Category::Dvd => "dvd",
        }
    }

    /// Heading shown above the category's list.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Furniture => "Furniture",
            Category::Books => "Books",
            Category::Dvd => "DVD",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Assign at most one category, by attribute presence.
///
/// Precedence is fixed: full dimensions → furniture, else weight → books,
/// else size → dvd, else nothing. A product carrying both `weight` and `size`
/// is a book and is never listed twice.
pub fn classify<T>(item: &T) -> Option<Category>
where
    T: Measured + ?Sized,
{
    if item.dimensions().is_some() {
        Some(Category::Furniture)
    } else if item.weight().is_some() {
        Some(Category::Books)
    } else if item.size().is_some() {
        Some(Category::Dvd)
    } else {
        None
    }
}
