//! Shared range-validation helpers.

/// Push an error if `value` is outside `[min, max]`.
pub(crate) fn validate_range(errors: &mut Vec<String>, name: &str, value: u32, min: u32, max: u32) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Like [`validate_range`], but `0` is also accepted (feature disabled).
pub(crate) fn validate_range_or_zero(
    errors: &mut Vec<String>,
    name: &str,
    value: u32,
    min: u32,
    max: u32,
) {
    if value != 0 {
        validate_range(errors, name, value, min, max);
    }
}
