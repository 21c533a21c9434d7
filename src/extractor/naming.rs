//! Display names for accepted images, from the best available source.

use std::borrow::Cow;

use url::Url;

use super::filter::collapse_whitespace;
use crate::config::NamingConfig;
use crate::traits::PageElement;

/// Produce a non-empty display name for an accepted candidate.
///
/// Tries the image label, then short text inside the container, then the
/// image file name, and finally `{positional_prefix}{position}`.
pub fn resolve_name<E: PageElement>(
    label: Option<&str>,
    container: Option<&E>,
    url: &str,
    position: usize,
    naming: &NamingConfig,
) -> String {
    if let Some(label) = label.map(str::trim).filter(|label| !label.is_empty()) {
        return label.to_string();
    }

    if let Some(text) = container.and_then(|container| container_text(container, naming)) {
        return text;
    }

    if let Some(stem) = file_stem(url) {
        return format!("{}{stem}", naming.url_name_prefix);
    }

    format!("{}{position}", naming.positional_prefix)
}

fn container_text<E: PageElement>(container: &E, naming: &NamingConfig) -> Option<String> {
    naming
        .text_patterns
        .iter()
        .filter_map(|pattern| container.query_first(pattern))
        .chain(std::iter::once(container.clone()))
        .map(|element| collapse_whitespace(&element.text()))
        .find(|text| !text.is_empty() && text.chars().count() < naming.max_text_chars)
}

/// Percent-decoded last path segment without its extension
fn file_stem(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let segment = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
    let decoded = urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment));

    let stem = match decoded.rsplit_once('.') {
        Some((stem, _)) if !stem.trim().is_empty() => stem,
        _ => decoded.as_ref(),
    }
    .trim();

    (!stem.is_empty()).then(|| stem.to_string())
}
