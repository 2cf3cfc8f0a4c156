//! Splits a characteristics string into its `Label: value` segments.

/// Segment separator in the legacy encoding.
pub const SEGMENT_DELIMITER: char = '|';

/// Split on `|`, trim each piece and drop the blank ones.
///
/// Total: absent or empty input yields an empty sequence.
///
/// ```
/// use reconcile_core::parse::tokenize;
///
/// assert_eq!(tokenize(Some("A: 1 | B: 2 |  | C: 3")), vec!["A: 1", "B: 2", "C: 3"]);
/// assert!(tokenize(None).is_empty());
/// ```
pub fn tokenize(encoded: Option<&str>) -> Vec<&str> {
    let Some(encoded) = encoded else {
        return Vec::new();
    };
    encoded
        .split(SEGMENT_DELIMITER)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect()
}
