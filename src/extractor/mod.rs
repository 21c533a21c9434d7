//! Product image detection.
//!
//! One extraction pass runs selector resolution, URL resolution, the filter
//! chain and name resolution over a [`PageAccessor`], then numbers the
//! survivors. A pass never fails: unusable candidates are skipped and a page
//! with nothing recognizable yields an empty [`Extraction`].

pub mod filter;
pub mod image_url;
pub mod naming;
pub mod selector;

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::{ExtractorConfig, LabelPolicy};
use crate::models::{ProductRecord, ProductsResponse};
use crate::traits::{PageAccessor, PageElement};

pub use filter::{Candidate, FilterRule, Rejection};
pub use selector::{CandidateSource, SelectorPattern, SelectorSpec};

use filter::apply_rules;
use image_url::resolve_image_url;
use naming::resolve_name;
use selector::{RawCandidate, resolve_candidates};

/// Result of one extraction pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub products: Vec<ProductRecord>,
    pub source: CandidateSource,
    /// Candidates enumerated before filtering
    pub considered: usize,
}

impl Extraction {
    pub fn into_response(self) -> ProductsResponse {
        ProductsResponse {
            products: self.products,
        }
    }
}

/// Configured product image extractor
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Run one pass over the current state of `page`
    pub fn extract<P: PageAccessor>(&self, page: &P) -> Extraction {
        let (source, candidates) = resolve_candidates(page, &self.config);
        let considered = candidates.len();

        let mut products: Vec<ProductRecord> = Vec::new();
        let mut seen_urls = HashSet::new();

        for (item, candidate) in candidates.iter().enumerate() {
            let position = products.len() + 1;
            match self.evaluate(candidate, page.page_url(), position, &mut seen_urls) {
                Ok(record) => {
                    debug!("Product {}: {} ({})", record.position, record.name, record.image_url);
                    products.push(record);
                }
                Err(rejection) => debug!("Candidate {} rejected: {}", item + 1, rejection),
            }
        }

        if products.is_empty() {
            warn!(
                "No products detected among {} candidates (page: {})",
                considered,
                page.page_url().map_or("unknown", Url::as_str)
            );
        } else {
            info!("Detected {} products among {} candidates", products.len(), considered);
        }

        Extraction {
            products,
            source,
            considered,
        }
    }

    fn evaluate<E: PageElement>(
        &self,
        raw: &RawCandidate<E>,
        page_url: Option<&Url>,
        position: usize,
        seen_urls: &mut HashSet<String>,
    ) -> Result<ProductRecord, Rejection> {
        let url = resolve_image_url(&raw.image, page_url, &self.config)?;
        let candidate = Candidate::from_element(&raw.image, url);

        apply_rules(&self.config.rules, &candidate)?;

        if candidate.label.is_none() && self.config.label_policy == LabelPolicy::Reject {
            return Err(Rejection::MissingLabel);
        }
        if self.config.dedupe_urls && !seen_urls.insert(candidate.url.clone()) {
            return Err(Rejection::DuplicateUrl);
        }

        let name = resolve_name(
            candidate.label.as_deref(),
            raw.container.as_ref(),
            &candidate.url,
            position,
            &self.config.naming,
        );

        Ok(ProductRecord {
            name,
            image_url: candidate.url,
            position,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::HtmlPage;

    const PAGE: &str = "https://www.family.co.jp/goods/newgoods/nextweek.html";

    fn page(body: &str) -> HtmlPage {
        HtmlPage::parse(body, Some(Url::parse(PAGE).unwrap()))
    }

    fn item(file: &str, alt: &str) -> String {
        format!(
            r#"<li><img src="/content/dam/family/goods/{file}" alt="{alt}" width="200" height="200"></li>"#
        )
    }

    #[test]
    fn unlabeled_candidates_follow_label_policy() {
        let html = format!(
            r#"<ul class="ly-mod-list4">{}<li><img src="/content/dam/family/goods/2.jpg"><p>やきそばパン</p></li></ul>"#,
            item("1.jpg", "おにぎり")
        );
        let page = page(&html);

        let fallback = Extractor::default().extract(&page);
        assert_eq!(fallback.products.len(), 2);
        assert_eq!(fallback.products[1].name, "やきそばパン");

        let strict = Extractor::new(ExtractorConfig {
            label_policy: LabelPolicy::Reject,
            ..ExtractorConfig::default()
        })
        .extract(&page);
        assert_eq!(strict.products.len(), 1);
        assert_eq!(strict.products[0].name, "おにぎり");
    }

    #[test]
    fn title_attribute_labels_products_and_feeds_the_blocklist() {
        let html = r#"<ul class="ly-mod-list4">
            <li><img src="/content/dam/family/goods/1.jpg" title="たまご" width="200" height="200"></li>
            <li><img src="/content/dam/family/goods/2.jpg" alt=" " title="ツナマヨ" width="200" height="200"></li>
            <li><img src="/content/dam/family/goods/3.jpg" title="FamilyMart" width="200" height="200"></li>
          </ul>"#;

        let extraction = Extractor::default().extract(&page(html));

        let names: Vec<&str> = extraction.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["たまご", "ツナマヨ"]);
        assert_eq!(extraction.considered, 3);
    }

    #[test]
    fn duplicates_are_kept_unless_deduplication_is_enabled() {
        let html = format!(
            r#"<ul class="ly-mod-list4">{}{}{}</ul>"#,
            item("1.jpg", "A"),
            item("1.jpg", "A again"),
            item("2.jpg", "B")
        );
        let page = page(&html);

        let kept = Extractor::default().extract(&page);
        assert_eq!(kept.products.len(), 3);

        let deduped = Extractor::new(ExtractorConfig {
            dedupe_urls: true,
            ..ExtractorConfig::default()
        })
        .extract(&page);
        let positions: Vec<usize> = deduped.products.iter().map(|p| p.position).collect();
        assert_eq!(positions, vec![1, 2]);
        assert_eq!(deduped.products[1].name, "B");
    }

    #[test]
    fn rejected_candidates_do_not_consume_positions() {
        let html = format!(
            r#"<ul class="ly-mod-list4">{}<li><img src="/common/img/logo.png" alt="ロゴ"></li>{}</ul>"#,
            item("1.jpg", "A"),
            item("2.jpg", "B")
        );

        let extraction = Extractor::default().extract(&page(&html));

        assert_eq!(extraction.considered, 3);
        let summary: Vec<(usize, &str)> = extraction
            .products
            .iter()
            .map(|p| (p.position, p.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(1, "A"), (2, "B")]);
    }

    #[test]
    fn response_serializes_with_image_url_key() {
        let extraction = Extractor::default().extract(&page(&format!(
            r#"<ul class="ly-mod-list4">{}</ul>"#,
            item("1.jpg", "A")
        )));

        let json = serde_json::to_value(extraction.into_response()).unwrap();

        assert_eq!(
            json["products"][0]["imageUrl"],
            "https://www.family.co.jp/content/dam/family/goods/1.jpg"
        );
        assert_eq!(json["products"][0]["position"], 1);
    }
}
