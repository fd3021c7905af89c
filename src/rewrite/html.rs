//! HTML body rewriting for the web console.

use std::sync::LazyLock;

use regex::{Captures, Regex};

static ROOT_RELATIVE_ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(src|href)="/([^"]*?)""#).expect("static regex is valid")
});

/// Point every upstream URL in `html` at `public_origin`.
///
/// Applied in order:
/// 1. literal `upstream_origin` occurrences become `public_origin`
/// 2. `src="/…"` and `href="/…"` attributes become absolute on `public_origin`
pub fn rewrite_html(html: &str, upstream_origin: &str, public_origin: &str) -> String {
    let html = if upstream_origin.is_empty() {
        html.to_string()
    } else {
        html.replace(upstream_origin, public_origin)
    };

    ROOT_RELATIVE_ATTR
        .replace_all(&html, |caps: &Captures| {
            format!("{}=\"{}/{}\"", &caps[1], public_origin, &caps[2])
        })
        .into_owned()
}
