//! Client-side checks that run before any request leaves the process.

use std::path::Path;

use crate::error::ValidationError;

pub const PIN_LENGTH: usize = 4;
pub const MAX_MISSION_LENGTH: usize = 100;
pub const MAX_NAME_LENGTH: usize = 30;
pub const MAX_DESCRIPTION_LENGTH: usize = 200;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    let len = pin.chars().count();
    if len != PIN_LENGTH {
        return Err(ValidationError::PinLength(len));
    }
    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::PinNotNumeric);
    }
    Ok(())
}

/// Trimmed, non-empty, at most `max_len` characters.
pub fn validate_required<'a>(
    field: &'static str,
    value: &'a str,
    max_len: usize,
) -> Result<&'a str, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if trimmed.chars().count() > max_len {
        return Err(ValidationError::TooLong { field, max: max_len });
    }
    Ok(trimmed)
}

pub fn validate_image(file_name: &str, size: u64, max: u64) -> Result<(), ValidationError> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        return Err(ValidationError::UnsupportedImageType(ext));
    }
    if size > max {
        return Err(ValidationError::ImageTooLarge { size, max });
    }
    Ok(())
}

pub fn validate_required_count(count: u32) -> Result<(), ValidationError> {
    if count == 0 {
        return Err(ValidationError::InvalidRequiredCount);
    }
    Ok(())
}
