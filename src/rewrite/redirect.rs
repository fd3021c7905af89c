//! Redirect `Location` rewriting.

/// Map an upstream `Location` value onto the public origin.
///
/// - absolute URL on the upstream origin: prefix swapped for `public_origin`
/// - root-relative path: prefixed with `public_origin`
/// - anything else (external redirect, relative path): unchanged
pub fn rewrite_location(location: &str, upstream_origin: &str, public_origin: &str) -> String {
    if let Some(rest) = location.strip_prefix(upstream_origin) {
        if rest.is_empty() || rest.starts_with(['/', '?', '#']) {
            return format!("{}{}", public_origin, rest);
        }
    }

    if location.starts_with('/') {
        return format!("{}{}", public_origin, location);
    }

    location.to_string()
}
