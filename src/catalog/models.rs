use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{
    error::BoxDynError,
    postgres::{PgTypeInfo, PgValueRef},
    Decode, FromRow, Postgres, Type,
};
use std::fmt;
use utoipa::ToSchema;

/// How a discount value attached to a product or variation is interpreted
///
/// Catalog management has written both spellings of each kind over time
/// (`percent`/`percentage`, `amount`/`flat`), so parsing accepts either and
/// anything unrecognised is treated as no discount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    None,
    #[serde(alias = "percentage")]
    Percent,
    #[serde(alias = "amount")]
    Flat,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::None => "none",
            DiscountType::Percent => "percent",
            DiscountType::Flat => "flat",
        }
    }
}

impl Default for DiscountType {
    fn default() -> Self {
        DiscountType::None
    }
}

impl From<&str> for DiscountType {
    fn from(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "percent" | "percentage" => DiscountType::Percent,
            "amount" | "flat" => DiscountType::Flat,
            _ => DiscountType::None,
        }
    }
}

impl fmt::Display for DiscountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Type<Postgres> for DiscountType {
    fn type_info() -> PgTypeInfo {
        <String as Type<Postgres>>::type_info()
    }

    fn compatible(ty: &PgTypeInfo) -> bool {
        <String as Type<Postgres>>::compatible(ty)
    }
}

impl<'r> Decode<'r, Postgres> for DiscountType {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let raw = <&str as Decode<Postgres>>::decode(value)?;
        Ok(DiscountType::from(raw))
    }
}

/// Product as exposed by catalog management (read-only here)
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub base_price: Decimal,
    /// Pre-computed sale price; wins over the discount fields when positive
    pub sale_price: Option<Decimal>,
    pub discount_amount: Decimal,
    pub discount_type: DiscountType,
    pub stock_quantity: i32,
}

/// A size/colour variant of a product
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ProductVariation {
    pub id: i32,
    pub product_id: i32,
    pub size: Option<String>,
    pub color: Option<String>,
    /// Absolute price; takes precedence over `price_modifier`
    pub price: Option<Decimal>,
    /// Price relative to the product's base price
    pub price_modifier: Option<Decimal>,
    pub discount_price: Option<Decimal>,
    pub discount_amount: Decimal,
    pub discount_type: DiscountType,
    pub stock_quantity: i32,
}

impl ProductVariation {
    /// Human-readable description snapshotted onto order items
    pub fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [("Size", &self.size), ("Color", &self.color)]
            .iter()
            .filter_map(|(label, value)| {
                value
                    .as_deref()
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .map(|v| format!("{}: {}", label, v))
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variation(size: Option<&str>, color: Option<&str>) -> ProductVariation {
        ProductVariation {
            id: 1,
            product_id: 1,
            size: size.map(String::from),
            color: color.map(String::from),
            price: None,
            price_modifier: None,
            discount_price: None,
            discount_amount: Decimal::ZERO,
            discount_type: DiscountType::None,
            stock_quantity: 5,
        }
    }

    #[test]
    fn test_discount_type_accepts_both_spellings() {
        assert_eq!(DiscountType::from("percent"), DiscountType::Percent);
        assert_eq!(DiscountType::from("Percentage"), DiscountType::Percent);
        assert_eq!(DiscountType::from("amount"), DiscountType::Flat);
        assert_eq!(DiscountType::from("flat"), DiscountType::Flat);
        assert_eq!(DiscountType::from("none"), DiscountType::None);
        assert_eq!(DiscountType::from("bogus"), DiscountType::None);
    }

    #[test]
    fn test_discount_type_deserializes_aliases() {
        let kind: DiscountType = serde_json::from_str("\"percentage\"").unwrap();
        assert_eq!(kind, DiscountType::Percent);
        let kind: DiscountType = serde_json::from_str("\"amount\"").unwrap();
        assert_eq!(kind, DiscountType::Flat);
    }

    #[test]
    fn test_describe_variation() {
        assert_eq!(
            variation(Some("M"), Some("Red")).describe(),
            Some("Size: M, Color: Red".to_string())
        );
        assert_eq!(variation(None, Some("Blue")).describe(), Some("Color: Blue".to_string()));
        assert_eq!(variation(Some("  "), None).describe(), None);
    }
}
