use rust_decimal::Decimal;

use super::{
    AddToCartRequest, CategoryRequest, GroupMembershipRequest, MenuItemRequest, OrderItemRequest,
    ValidationError, ValidationResult,
};

/// Trait for validating input models
pub trait Validate {
    fn validate(&self) -> ValidationResult<()>;
}

/// Validation constants
pub const MAX_TITLE_LENGTH: usize = 255;
pub const MAX_SLUG_LENGTH: usize = 255;
pub const MIN_PRICE: Decimal = Decimal::from_parts(1, 0, 0, false, 2); // 0.01
pub const MAX_PRICE: Decimal = Decimal::from_parts(999999, 0, 0, false, 2); // 9999.99
pub const MAX_PRICE_SCALE: u32 = 2;
pub const MIN_QUANTITY: u32 = 1;
pub const MAX_QUANTITY: u32 = 32767;

impl Validate for CategoryRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_title(&self.title)?;
        validate_slug(&self.slug)?;
        Ok(())
    }
}

impl Validate for MenuItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_title(&self.title)?;
        validate_price("price", &self.price)?;
        Ok(())
    }
}

impl Validate for AddToCartRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_quantity(self.quantity)
    }
}

impl Validate for OrderItemRequest {
    fn validate(&self) -> ValidationResult<()> {
        validate_quantity(self.quantity)?;
        validate_price("unit_price", &self.unit_price)?;
        Ok(())
    }
}

impl Validate for GroupMembershipRequest {
    fn validate(&self) -> ValidationResult<()> {
        if self.group.trim().is_empty() {
            return Err(ValidationError::RequiredField {
                field: "group".to_string(),
            });
        }
        Ok(())
    }
}

pub fn validate_title(title: &str) -> ValidationResult<()> {
    let trimmed = title.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "title".to_string(),
        });
    }

    if trimmed.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TooLong {
            field: "title".to_string(),
            max_length: MAX_TITLE_LENGTH,
            actual_length: trimmed.chars().count(),
        });
    }

    Ok(())
}

/// Slugs are limited to lowercase ASCII letters, digits, hyphens and underscores
pub fn validate_slug(slug: &str) -> ValidationResult<()> {
    let trimmed = slug.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::RequiredField {
            field: "slug".to_string(),
        });
    }

    if trimmed.len() > MAX_SLUG_LENGTH {
        return Err(ValidationError::TooLong {
            field: "slug".to_string(),
            max_length: MAX_SLUG_LENGTH,
            actual_length: trimmed.len(),
        });
    }

    if !trimmed
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "slug".to_string(),
            expected: "lowercase letters, numbers, underscores or hyphens".to_string(),
        });
    }

    Ok(())
}

pub fn validate_price(field: &str, price: &Decimal) -> ValidationResult<()> {
    if *price < MIN_PRICE || *price > MAX_PRICE {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: MIN_PRICE.to_string(),
            max: MAX_PRICE.to_string(),
            value: price.to_string(),
        });
    }

    if price.normalize().scale() > MAX_PRICE_SCALE {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            value: price.to_string(),
            reason: format!("at most {} decimal places", MAX_PRICE_SCALE),
        });
    }

    Ok(())
}

pub fn validate_quantity(quantity: u32) -> ValidationResult<()> {
    if !(MIN_QUANTITY..=MAX_QUANTITY).contains(&quantity) {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: MIN_QUANTITY.to_string(),
            max: MAX_QUANTITY.to_string(),
            value: quantity.to_string(),
        });
    }
    Ok(())
}

/// Parse the `status` query flag. Accepts true/false and 1/0.
pub fn parse_status_flag(raw: &str) -> ValidationResult<bool> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(ValidationError::InvalidValue {
            field: "status".to_string(),
            value: raw.to_string(),
            reason: "expected true, false, 1 or 0".to_string(),
        }),
    }
}
