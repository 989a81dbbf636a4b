/// Canonicalize a contract code for key comparison.
///
/// Trims ASCII and non-breaking whitespace, collapses internal whitespace
/// runs to a single space, preserves case. Returns `None` when the code is
/// empty after normalization — such rows are invalid and dropped upstream.
pub fn normalize_code(raw: &str) -> Option<String> {
    let cleaned = raw.replace('\u{a0}', " ");
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}
