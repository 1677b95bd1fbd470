//! Format allow-list helpers.

/// Formats whose encoders carry an alpha channel. JPEG does not; sources
/// with transparency are flattened to RGB before encoding to it.
const ALPHA_FORMATS: &[&str] = &["png", "gif", "webp"];

/// Extract the lowercase extension from a filename, without the dot.
///
/// Returns `None` when the filename has no extension at all.
pub fn source_extension(filename: &str) -> Option<String> {
    std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Whether `format` appears in the configured allow-list (case-insensitive).
pub fn is_allowed(format: &str, allowed: &[String]) -> bool {
    let format = format.to_ascii_lowercase();
    allowed.iter().any(|f| f.eq_ignore_ascii_case(&format))
}

/// Whether the target format can represent an alpha channel.
pub fn supports_alpha(format: &str) -> bool {
    let format = format.to_ascii_lowercase();
    ALPHA_FORMATS.contains(&format.as_str())
}
