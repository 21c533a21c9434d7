//! Selector resolution and candidate enumeration

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::ExtractorConfig;
use crate::traits::{PageAccessor, PageElement};

/// One selector pattern with the match counts it is trusted for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorPattern {
    pub pattern: String,
    /// Fewest matches accepted, values below 1 behave as 1
    #[serde(default = "default_min")]
    pub min: usize,
    /// Most matches accepted, `None` for unbounded
    #[serde(default)]
    pub max: Option<usize>,
}

fn default_min() -> usize {
    1
}

impl SelectorPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            min: 1,
            max: None,
        }
    }

    /// Pattern that stops being trusted above `max` matches
    pub fn capped(pattern: impl Into<String>, max: usize) -> Self {
        Self {
            max: Some(max),
            ..Self::new(pattern)
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min.max(1) && self.max.is_none_or(|max| count <= max)
    }
}

/// Selector patterns in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSpec {
    pub patterns: Vec<SelectorPattern>,
}

/// Where the candidate set of an extraction came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CandidateSource {
    /// The pattern at `index` of the selector table won
    Pattern { index: usize, pattern: String },
    /// No pattern was acceptable and every image on the page was scanned
    FullScan,
}

impl CandidateSource {
    pub fn is_full_scan(&self) -> bool {
        matches!(self, Self::FullScan)
    }
}

/// An image element together with the element used to look up its name
#[derive(Debug, Clone)]
pub struct RawCandidate<E> {
    pub image: E,
    pub container: Option<E>,
}

/// Pick the first acceptable pattern and enumerate its candidates.
///
/// Falls back to every `img` on the page when no pattern is acceptable.
pub fn resolve_candidates<'a, P: PageAccessor>(
    page: &'a P,
    config: &ExtractorConfig,
) -> (CandidateSource, Vec<RawCandidate<P::Element<'a>>>) {
    for (index, entry) in config.selectors.patterns.iter().enumerate() {
        let matches = page.query_all(&entry.pattern);

        if matches.is_empty() {
            debug!("Selector '{}' matched nothing", entry.pattern);
            continue;
        }
        if !entry.accepts(matches.len()) {
            debug!(
                "Selector '{}' matched {} elements, outside its accepted range",
                entry.pattern,
                matches.len()
            );
            continue;
        }

        info!("Selector '{}' matched {} elements", entry.pattern, matches.len());

        let candidates = matches
            .into_iter()
            .enumerate()
            .filter_map(|(item, node)| {
                let candidate = candidate_from_match(node, config);
                if candidate.is_none() {
                    debug!("Item {} has no image element", item + 1);
                }
                candidate
            })
            .collect();

        let source = CandidateSource::Pattern {
            index,
            pattern: entry.pattern.clone(),
        };
        return (source, candidates);
    }

    let images = page.query_all("img");
    warn!(
        "No selector pattern matched, scanning all {} images on the page",
        images.len()
    );

    let candidates = images
        .into_iter()
        .map(|image| RawCandidate {
            container: structural_container(&image, config),
            image,
        })
        .collect();

    (CandidateSource::FullScan, candidates)
}

fn candidate_from_match<E: PageElement>(node: E, config: &ExtractorConfig) -> Option<RawCandidate<E>> {
    if node.tag_name().eq_ignore_ascii_case("img") {
        return Some(RawCandidate {
            container: structural_container(&node, config),
            image: node,
        });
    }

    let image = config
        .image_patterns
        .iter()
        .find_map(|pattern| node.query_first(pattern))?;

    Some(RawCandidate {
        image,
        container: Some(node),
    })
}

/// Nearest ancestor whose tag is one of the configured container tags
fn structural_container<E: PageElement>(image: &E, config: &ExtractorConfig) -> Option<E> {
    let mut current = image.parent();
    while let Some(node) = current {
        let tag = node.tag_name();
        if config
            .container_tags
            .iter()
            .any(|container| container.eq_ignore_ascii_case(tag))
        {
            return Some(node);
        }
        current = node.parent();
    }
    None
}
