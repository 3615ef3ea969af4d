//! Input checks run before any store access.

use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::Value;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::models::{CreateProductRequest, NewProduct};

/// Width of the `name` column.
pub const NAME_MAX_CHARS: usize = 100;

/// Prices are stored as `DECIMAL(10,2)`.
pub const PRICE_SCALE: u32 = 2;

/// Largest value a `DECIMAL(10,2)` column holds: 99,999,999.99.
pub fn max_price() -> Decimal {
    Decimal::new(9_999_999_999, PRICE_SCALE)
}

pub fn validate_new_product(request: CreateProductRequest) -> Result<NewProduct, ValidationError> {
    let name = request
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    let price = request.price.as_ref().filter(|price| !is_blank(price));

    let (name, price) = match (name, price) {
        (Some(name), Some(price)) => (name, price),
        (None, _) => return Err(ValidationError::MissingField("name")),
        (_, None) => return Err(ValidationError::MissingField("price")),
    };

    let parsed = parse_price(price)?;
    let price = parsed.round_dp_with_strategy(PRICE_SCALE, RoundingStrategy::MidpointAwayFromZero);
    if price <= Decimal::ZERO {
        return Err(ValidationError::NonPositivePrice(parsed.to_string()));
    }
    if price > max_price() {
        return Err(ValidationError::PriceOutOfRange(parsed.to_string()));
    }

    let name_chars = name.chars().count();
    if name_chars > NAME_MAX_CHARS {
        return Err(ValidationError::NameTooLong(name_chars));
    }

    Ok(NewProduct {
        name: name.to_string(),
        price,
        description: request.description.unwrap_or_default(),
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Accepts JSON numbers and numeric strings, including exponent notation.
pub fn parse_price(value: &Value) -> Result<Decimal, ValidationError> {
    let raw = match value {
        Value::Number(number) => number.to_string(),
        Value::String(s) => s.trim().to_string(),
        other => return Err(ValidationError::InvalidPrice(other.to_string())),
    };

    Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| match raw.parse::<f64>() {
            // Numeric, but beyond what a Decimal holds in either direction.
            Ok(value) if value.is_finite() && value >= 1.0 => ValidationError::PriceOutOfRange(raw),
            Ok(value) if value.is_finite() => ValidationError::NonPositivePrice(raw),
            _ => ValidationError::InvalidPrice(raw),
        })
}

pub fn parse_product_id(value: Option<&Value>) -> Result<i64, ValidationError> {
    match value {
        None | Some(Value::Null) => Err(ValidationError::MissingId),
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| ValidationError::InvalidId(number.to_string())),
        Some(Value::String(s)) if s.trim().is_empty() => Err(ValidationError::MissingId),
        Some(Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::InvalidId(s.clone())),
        Some(other) => Err(ValidationError::InvalidId(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(name: Option<&str>, price: Option<Value>) -> CreateProductRequest {
        CreateProductRequest {
            name: name.map(str::to_string),
            price,
            description: None,
        }
    }

    #[test]
    fn accepts_number_and_string_prices() {
        let from_number = validate_new_product(request(Some("Widget"), Some(json!(9.99)))).unwrap();
        assert_eq!(from_number.price, Decimal::new(999, 2));
        assert_eq!(from_number.description, "");

        let from_string = validate_new_product(request(Some("Widget"), Some(json!(" 12.5 ")))).unwrap();
        assert_eq!(from_string.price, Decimal::new(125, 1));
    }

    #[test]
    fn name_is_checked_before_price() {
        assert_eq!(
            validate_new_product(request(None, None)),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(
            validate_new_product(request(Some("   "), Some(json!(3)))),
            Err(ValidationError::MissingField("name"))
        );
        assert_eq!(
            validate_new_product(request(Some("Widget"), Some(json!("")))),
            Err(ValidationError::MissingField("price"))
        );
    }

    #[test]
    fn presence_is_checked_before_parsing() {
        assert_eq!(
            validate_new_product(request(None, Some(json!("abc")))),
            Err(ValidationError::MissingField("name"))
        );
    }

    #[test]
    fn rejects_non_numeric_prices() {
        for price in [json!("abc"), json!(true), json!([1]), json!("NaN")] {
            assert!(matches!(
                validate_new_product(request(Some("Widget"), Some(price))),
                Err(ValidationError::InvalidPrice(_))
            ));
        }
    }

    #[test]
    fn rejects_non_positive_prices() {
        for price in [json!(0), json!(-1.5), json!("-0.01"), json!(0.004)] {
            assert!(matches!(
                validate_new_product(request(Some("Widget"), Some(price))),
                Err(ValidationError::NonPositivePrice(_))
            ));
        }
    }

    #[test]
    fn rounds_to_cents() {
        let product = validate_new_product(request(Some("Widget"), Some(json!("1.005")))).unwrap();
        assert_eq!(product.price, Decimal::new(101, 2));
    }

    #[test]
    fn enforces_column_limits() {
        assert!(matches!(
            validate_new_product(request(Some("Widget"), Some(json!(100_000_000)))),
            Err(ValidationError::PriceOutOfRange(_))
        ));

        let long_name = "x".repeat(NAME_MAX_CHARS + 1);
        assert_eq!(
            validate_new_product(request(Some(&long_name), Some(json!(1)))),
            Err(ValidationError::NameTooLong(NAME_MAX_CHARS + 1))
        );
    }

    #[test]
    fn numbers_beyond_decimal_are_range_errors() {
        assert!(matches!(
            parse_price(&json!(1e300)),
            Err(ValidationError::PriceOutOfRange(_))
        ));
        assert!(matches!(
            validate_new_product(request(Some("Widget"), Some(json!("1e40")))),
            Err(ValidationError::PriceOutOfRange(_))
        ));
        assert!(matches!(
            parse_price(&json!(-1e300)),
            Err(ValidationError::NonPositivePrice(_))
        ));
        assert!(matches!(
            parse_price(&json!("inf")),
            Err(ValidationError::InvalidPrice(_))
        ));
    }

    #[test]
    fn scientific_notation_is_numeric() {
        assert_eq!(parse_price(&json!("1e2")).unwrap(), Decimal::from(100));
    }

    #[test]
    fn product_id_parsing() {
        assert_eq!(parse_product_id(None), Err(ValidationError::MissingId));
        assert_eq!(parse_product_id(Some(&Value::Null)), Err(ValidationError::MissingId));
        assert_eq!(parse_product_id(Some(&json!(""))), Err(ValidationError::MissingId));
        assert_eq!(parse_product_id(Some(&json!(42))), Ok(42));
        assert_eq!(parse_product_id(Some(&json!(" 7 "))), Ok(7));
        assert!(matches!(
            parse_product_id(Some(&json!(1.5))),
            Err(ValidationError::InvalidId(_))
        ));
        assert!(matches!(
            parse_product_id(Some(&json!("seven"))),
            Err(ValidationError::InvalidId(_))
        ));
    }
}
