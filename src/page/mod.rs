//! Parsed HTML snapshots exposed through the page accessor traits

mod fetcher;

pub use fetcher::PageFetcher;

use scraper::{ElementRef, Html, Selector};
use tracing::warn;
use url::Url;

use crate::traits::{PageAccessor, PageElement};

/// A static HTML document plus the URL it was loaded from
pub struct HtmlPage {
    document: Html,
    url: Option<Url>,
}

impl HtmlPage {
    pub fn parse(html: &str, url: Option<Url>) -> Self {
        Self {
            document: Html::parse_document(html),
            url,
        }
    }
}

impl PageAccessor for HtmlPage {
    type Element<'a> = HtmlElement<'a>;

    fn query_all<'a>(&'a self, pattern: &str) -> Vec<HtmlElement<'a>> {
        match Selector::parse(pattern) {
            Ok(selector) => self.document.select(&selector).map(HtmlElement).collect(),
            Err(e) => {
                warn!("Invalid selector '{}': {:?}", pattern, e);
                Vec::new()
            }
        }
    }

    fn page_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }
}

/// Element of an [`HtmlPage`]
#[derive(Debug, Clone, Copy)]
pub struct HtmlElement<'a>(ElementRef<'a>);

impl PageElement for HtmlElement<'_> {
    fn tag_name(&self) -> &str {
        self.0.value().name()
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.0.value().attr(name)
    }

    fn parent(&self) -> Option<Self> {
        self.0.parent().and_then(ElementRef::wrap).map(HtmlElement)
    }

    fn query_first(&self, pattern: &str) -> Option<Self> {
        let selector = Selector::parse(pattern).ok()?;
        self.0.select(&selector).next().map(HtmlElement)
    }

    fn text(&self) -> String {
        self.0.text().collect()
    }

    /// Static markup has no layout. Inline style declarations win over the
    /// `width`/`height` attributes, as they do when a browser renders them.
    fn rendered_size(&self) -> Option<(u32, u32)> {
        Some((self.declared_px("width")?, self.declared_px("height")?))
    }
}

impl HtmlElement<'_> {
    fn declared_px(&self, dimension: &str) -> Option<u32> {
        self.style_px(dimension)
            .or_else(|| self.attr(dimension).and_then(parse_px))
    }

    fn style_px(&self, property: &str) -> Option<u32> {
        self.attr("style")?
            .split(';')
            .filter_map(|declaration| declaration.split_once(':'))
            .find(|(name, _)| name.trim().eq_ignore_ascii_case(property))
            .and_then(|(_, value)| parse_px(value))
    }
}

/// Positive pixel length such as `200`, `200px` or `199.6px`
fn parse_px(value: &str) -> Option<u32> {
    let number = value.trim();
    let number = number.strip_suffix("px").unwrap_or(number).trim();
    let px = number.parse::<f32>().ok()?;
    (px.is_finite() && px >= 0.5).then(|| px.round() as u32)
}
