//! FamilyMart "new products" page: selector tables and product source

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;
use url::Url;

use crate::config::{ExtractorConfig, LabelPolicy, NamingConfig};
use crate::extractor::{Extraction, Extractor, FilterRule, SelectorPattern, SelectorSpec};
use crate::page::{HtmlPage, PageFetcher};
use crate::traits::ProductSource;

/// Next week's new products
pub const DEFAULT_PAGE_URL: &str = "https://www.family.co.jp/goods/newgoods/nextweek.html";

/// Site-specific item patterns, most specific first
const SITE_PATTERNS: &[&str] = &[
    "ul.ly-mod-list4 li",
    ".ly-mod-list4 li",
    "ul.ly-mod-list li",
    "ul.product-list li",
    ".product-list li",
    "ul.goods-list li",
    ".goods-list li",
    "ul.item-list li",
    ".item-list li",
    "div.product-item",
    "li.item",
    "li.product",
    "li.goods",
    ".newgoods img",
    "div.goods img",
];

/// Generic patterns, only trusted up to [`BROAD_PATTERN_CAP`] matches
const BROAD_PATTERNS: &[&str] = &[
    "article",
    ".card",
    r#"li[class*="item"]"#,
    r#"li[class*="product"]"#,
    r#"div[class*="item"]"#,
    r#"div[class*="product"]"#,
];

const BROAD_PATTERN_CAP: usize = 50;

const URL_BLOCK_KEYWORDS: &[&str] = &[
    "icon",
    "logo",
    "banner",
    "button",
    "btn",
    "arrow",
    "navi",
    "header",
    "footer",
    "background",
    "bg_",
    "sprite",
    "common",
    "symbol",
    "mark",
    "badge",
    "stamp",
];

const ALT_BLOCK_KEYWORDS: &[&str] = &[
    "ファミリーマート",
    "familymart",
    "family mart",
    "logo",
    "ロゴ",
    "banner",
    "バナー",
    "icon",
    "アイコン",
    "button",
    "ボタン",
];

const CONTENT_PATHS: &[&str] = &["/content/dam/family/goods/"];
const SITE_DOMAIN: &str = "family.co.jp";
const CONTENT_PATH_TERMS: &[&str] = &["goods", "product", "item", "/img/"];

/// Classes the site puts on hoverable product thumbnails
const THUMBNAIL_CLASS_MARKERS: &[&str] = &["ly-mod-hover-img", "ly-mod-hover", "js-hover-img"];

pub(crate) const NAME_TEXT_PATTERNS: &[&str] = &[
    "p",
    "span",
    "div",
    "h3",
    "h4",
    "h5",
    ".name",
    ".title",
    ".product-name",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(ToString::to_string).collect()
}

/// Built-in extractor tables for the new products page
pub fn extractor_config() -> ExtractorConfig {
    let patterns = SITE_PATTERNS
        .iter()
        .map(|pattern| SelectorPattern::new(*pattern))
        .chain(
            BROAD_PATTERNS
                .iter()
                .map(|pattern| SelectorPattern::capped(*pattern, BROAD_PATTERN_CAP)),
        )
        .collect();

    ExtractorConfig {
        selectors: SelectorSpec { patterns },
        image_patterns: owned(&["img", "[src]", "[data-src]"]),
        url_attributes: owned(&["src", "data-src", "data-original", "data-lazy-src", "data-echo"]),
        internal_schemes: owned(&["chrome-extension:", "moz-extension:", "safari-web-extension:"]),
        container_tags: owned(&["li", "article", "figure", "div"]),
        rules: vec![
            FilterRule::UrlKeywordBlock {
                keywords: owned(URL_BLOCK_KEYWORDS),
            },
            FilterRule::AltKeywordBlock {
                keywords: owned(ALT_BLOCK_KEYWORDS),
            },
            FilterRule::SizeBounds {
                min_side: 100,
                max_side: Some(800),
            },
            FilterRule::AnyOf {
                rules: vec![
                    FilterRule::DomainPathAllow {
                        content_paths: owned(CONTENT_PATHS),
                        domain: SITE_DOMAIN.to_string(),
                        path_terms: owned(CONTENT_PATH_TERMS),
                    },
                    FilterRule::ClassAllow {
                        markers: owned(THUMBNAIL_CLASS_MARKERS),
                    },
                ],
            },
        ],
        label_policy: LabelPolicy::Fallback,
        naming: NamingConfig::default(),
        dedupe_urls: false,
    }
}

/// Product source reading the FamilyMart new products page
#[derive(Clone)]
pub struct FamimaSource {
    fetcher: PageFetcher,
    extractor: Extractor,
    page_url: Url,
}

impl FamimaSource {
    pub fn new(fetcher: PageFetcher, extractor: Extractor, page_url: &str) -> Result<Self> {
        let page_url = Url::parse(page_url)
            .map_err(|e| anyhow::anyhow!("Invalid page URL '{}': {}", page_url, e))?;

        Ok(Self {
            fetcher,
            extractor,
            page_url,
        })
    }

    /// Run the extractor over already downloaded HTML
    pub fn extract_html(&self, html: &str) -> Extraction {
        let page = HtmlPage::parse(html, Some(self.page_url.clone()));
        self.extractor.extract(&page)
    }
}

#[async_trait]
impl ProductSource for FamimaSource {
    fn name(&self) -> &str {
        "FamilyMart"
    }

    fn page_url(&self) -> &str {
        self.page_url.as_str()
    }

    async fn detect_products(&self) -> Result<Extraction> {
        info!("Detecting products on {} ({})", self.name(), self.page_url);

        let html = self.fetcher.fetch_html(self.page_url.as_str()).await?;

        // Parsed document is not Send, so it stays inside this synchronous call
        let extraction = self.extract_html(&html);

        info!(
            "Found {} products on {} via {:?}",
            extraction.products.len(),
            self.name(),
            extraction.source
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broad_patterns_come_last_and_are_capped() {
        let config = extractor_config();
        let patterns = &config.selectors.patterns;

        assert_eq!(patterns[0].pattern, "ul.ly-mod-list4 li");
        assert_eq!(patterns[0].max, None);
        let first_broad = patterns.iter().position(|p| p.pattern == "article").unwrap();
        assert!(patterns[first_broad..].iter().all(|p| p.max == Some(BROAD_PATTERN_CAP)));
        assert!(patterns[..first_broad].iter().all(|p| p.max.is_none()));
    }

    #[test]
    fn extracts_saved_page_against_page_origin() {
        let source = FamimaSource::new(
            PageFetcher::new().unwrap(),
            Extractor::default(),
            DEFAULT_PAGE_URL,
        )
        .unwrap();

        let extraction = source.extract_html(
            r#"<ul class="ly-mod-list4">
                 <li><img data-src="/content/dam/family/goods/0101.jpg" src="" alt="ごろっと果実ゼリー"></li>
               </ul>"#,
        );

        assert_eq!(extraction.products.len(), 1);
        assert_eq!(
            extraction.products[0].image_url,
            "https://www.family.co.jp/content/dam/family/goods/0101.jpg"
        );
    }

    #[test]
    fn rejects_malformed_page_url() {
        assert!(FamimaSource::new(PageFetcher::new().unwrap(), Extractor::default(), "not a url").is_err());
    }
}
