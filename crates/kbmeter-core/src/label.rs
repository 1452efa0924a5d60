//! KB store label derivation.
//!
//! Metric label values derived from KB store identifiers. Every distinct value
//! becomes a new time series, so callers should only feed identifiers that
//! came from a bounded set.

/// KB name that is never counted on upload.
pub const PERSONAL_KB: &str = "personal";

/// Separator used when a store list is flattened into one label value.
pub const STORE_SEPARATOR: &str = ",";

/// Join a store list into a single label value.
///
/// The order of the list is kept. An empty list yields an empty string.
pub fn join_kb_stores<S: AsRef<str>>(stores: &[S]) -> String {
    stores
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(STORE_SEPARATOR)
}

/// Normalize a KB store code for the per-code counter.
///
/// Codes are trimmed and lower-cased. Returns `None` when nothing is left.
pub fn normalize_store_code(code: &str) -> Option<String> {
    let c = code.trim();
    if c.is_empty() {
        None
    } else {
        Some(c.to_lowercase())
    }
}

/// Whether an upload into `kbname` should be counted.
pub fn counts_upload(kbname: Option<&str>, reserved: &str) -> bool {
    kbname != Some(reserved)
}
