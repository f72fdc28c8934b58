//! Lenient decoding for the product service's JSON.
//!
//! The service is fed straight from HTML forms, so numbers regularly come
//! back as strings (`"700"`) and cleared inputs as `""`.

use catalog_core::ProductId;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdOrText {
    Id(i64),
    Text(String),
}

pub(crate) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrText::deserialize(deserializer)? {
        NumberOrText::Number(n) => Ok(n),
        NumberOrText::Text(s) => parse_number(&s).map_err(D::Error::custom),
    }
}

pub(crate) fn optional_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<NumberOrText>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrText::Number(n)) => Ok(Some(n)),
        Some(NumberOrText::Text(s)) if s.trim().is_empty() => Ok(None),
        Some(NumberOrText::Text(s)) => parse_number(&s).map(Some).map_err(D::Error::custom),
    }
}

pub(crate) fn product_id<'de, D>(deserializer: D) -> Result<ProductId, D::Error>
where
    D: Deserializer<'de>,
{
    match IdOrText::deserialize(deserializer)? {
        IdOrText::Id(raw) => Ok(ProductId::new(raw)),
        IdOrText::Text(s) => s.parse().map_err(D::Error::custom),
    }
}

fn parse_number(s: &str) -> Result<f64, String> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| format!("expected a number, found {s:?}"))
}
