use serde::{Deserialize, Serialize};

use catalog_core::{DomainError, DomainResult, Entity, ProductId};

use crate::wire;

/// Height/width/length group. Only meaningful when all three are known.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub height: f64,
    pub width: f64,
    pub length: f64,
}

/// Optional physical attributes shared by stored products and drafts.
///
/// Classification and validation only look at these, so both record kinds
/// go through the same rules.
pub trait Measured {
    fn height(&self) -> Option<f64>;
    fn width(&self) -> Option<f64>;
    fn length(&self) -> Option<f64>;
    fn size(&self) -> Option<f64>;
    fn weight(&self) -> Option<f64>;

    /// All three dimensions, or `None` if any of them is missing.
    fn dimensions(&self) -> Option<Dimensions> {
        Some(Dimensions {
            height: self.height()?,
            width: self.width()?,
            length: self.length()?,
        })
    }
}

/// A product as served by the product service.
///
/// Server-owned and read-only to the client; the field names follow the
/// service's JSON (`Id`, `Sku`, `name`, `Price`, ...). Lower-case spellings
/// are accepted on read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    #[serde(rename = "Id", alias = "id", deserialize_with = "wire::product_id")]
    pub id: ProductId,
    #[serde(rename = "Sku", alias = "sku")]
    pub sku: String,
    #[serde(alias = "Name")]
    pub name: String,
    #[serde(rename = "Price", alias = "price", deserialize_with = "wire::number")]
    pub price: f64,
    #[serde(rename = "Height", alias = "height", default, deserialize_with = "wire::optional_number")]
    pub height: Option<f64>,
    #[serde(rename = "Width", alias = "width", default, deserialize_with = "wire::optional_number")]
    pub width: Option<f64>,
    #[serde(rename = "Length", alias = "length", default, deserialize_with = "wire::optional_number")]
    pub length: Option<f64>,
    #[serde(rename = "Size", alias = "size", default, deserialize_with = "wire::optional_number")]
    pub size: Option<f64>,
    #[serde(rename = "Weight", alias = "weight", default, deserialize_with = "wire::optional_number")]
    pub weight: Option<f64>,
}

impl Product {
    /// A bare product with no physical attributes (belongs to no category).
    pub fn new(id: ProductId, sku: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            sku: sku.into(),
            name: name.into(),
            price,
            height: None,
            width: None,
            length: None,
            size: None,
            weight: None,
        }
    }

    pub fn with_dimensions(mut self, height: f64, width: f64, length: f64) -> Self {
        self.height = Some(height);
        self.width = Some(width);
        self.length = Some(length);
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// A candidate product, as filled in by the "add product" form.
///
/// Nothing here is trusted: [`ProductDraft::validate`] must pass before the
/// draft is sent to the service. Empty strings and `None` both mean "not
/// filled in".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductDraft {
    #[serde(rename = "Sku")]
    pub sku: String,
    pub name: String,
    #[serde(rename = "Price")]
    pub price: Option<f64>,
    #[serde(rename = "Height")]
    pub height: Option<f64>,
    #[serde(rename = "Width")]
    pub width: Option<f64>,
    #[serde(rename = "Length")]
    pub length: Option<f64>,
    #[serde(rename = "Size")]
    pub size: Option<f64>,
    #[serde(rename = "Weight")]
    pub weight: Option<f64>,
}

impl ProductDraft {
    pub fn new(sku: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            sku: sku.into(),
            name: name.into(),
            price: Some(price),
            ..Self::default()
        }
    }

    pub fn with_dimensions(mut self, height: f64, width: f64, length: f64) -> Self {
        self.height = Some(height);
        self.width = Some(width);
        self.length = Some(length);
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_weight(mut self, weight: f64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Check the draft at the creation boundary.
    ///
    /// Rules, in the order they are reported:
    /// 1. `sku`, `name` and `price` are required.
    /// 2. `price` is a finite, non-negative number.
    /// 3. Every measurement that is filled in is a finite number greater than zero.
    /// 4. Height, width and length come together or not at all.
    /// 5. At least one of {dimensions, size, weight} is present.
    pub fn validate(&self) -> DomainResult<()> {
        let price = match self.price {
            Some(price) if !self.sku.trim().is_empty() && !self.name.trim().is_empty() => price,
            _ => return Err(DomainError::validation("sku, name and price are required")),
        };

        if !price.is_finite() || price < 0.0 {
            return Err(DomainError::validation("price must be a non-negative number"));
        }

        let measurements = [
            ("height", self.height),
            ("width", self.width),
            ("length", self.length),
            ("size", self.size),
            ("weight", self.weight),
        ];
        for (field, value) in measurements {
            if let Some(v) = value
                && (!v.is_finite() || v <= 0.0)
            {
                return Err(DomainError::validation(format!(
                    "{field} must be a number greater than zero"
                )));
            }
        }

        let given = [self.height, self.width, self.length]
            .iter()
            .filter(|v| v.is_some())
            .count();
        if given != 0 && given != 3 {
            return Err(DomainError::validation(
                "height, width and length must be provided together",
            ));
        }

        if self.dimensions().is_none() && self.size.is_none() && self.weight.is_none() {
            return Err(DomainError::validation(
                "provide at least one of height/width/length, size or weight",
            ));
        }

        Ok(())
    }
}

macro_rules! impl_measured {
    ($t:ty) => {
        impl Measured for $t {
            fn height(&self) -> Option<f64> {
                self.height
            }

            fn width(&self) -> Option<f64> {
                self.width
            }

            fn length(&self) -> Option<f64> {
                self.length
            }

            fn size(&self) -> Option<f64> {
                self.size
            }

            fn weight(&self) -> Option<f64> {
                self.weight
            }
        }
    };
}

impl_measured!(Product);
impl_measured!(ProductDraft);
