//! Image URL resolution across eager and lazy-load attributes

use url::Url;

use super::filter::Rejection;
use crate::config::ExtractorConfig;
use crate::traits::PageElement;

/// Resolve the effective absolute URL of an image element.
///
/// The first non-empty attribute in `config.url_attributes` wins. Extension
/// resources and data URIs are refused, relative paths are joined against
/// the page URL.
pub fn resolve_image_url<E: PageElement>(
    image: &E,
    page_url: Option<&Url>,
    config: &ExtractorConfig,
) -> Result<String, Rejection> {
    let raw = config
        .url_attributes
        .iter()
        .filter_map(|name| image.attr(name))
        .map(str::trim)
        .find(|value| !value.is_empty())
        .ok_or(Rejection::NoUrl)?;

    let lower = raw.to_ascii_lowercase();
    if config
        .internal_schemes
        .iter()
        .any(|scheme| lower.starts_with(&scheme.to_ascii_lowercase()))
    {
        return Err(Rejection::InternalResource);
    }
    if lower.starts_with("data:") {
        return Err(Rejection::DataUri);
    }

    absolutize(raw, page_url).ok_or(Rejection::NoUrl)
}

/// Turn `raw` into an absolute `http`/`https` URL
fn absolutize(raw: &str, page_url: Option<&Url>) -> Option<String> {
    let resolved = match Url::parse(raw) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => page_url?.join(raw).ok()?,
        Err(_) => return None,
    };

    match resolved.scheme() {
        "http" | "https" if resolved.host().is_some() => Some(resolved.to_string()),
        _ => None,
    }
}
