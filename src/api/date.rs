// Date parameter validation

/// Check that `candidate` has the exact shape `YYYY-MM-DD`
///
/// Only the shape is checked: `2024-99-99` passes. Digits must be ASCII.
pub fn is_valid_date(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}
