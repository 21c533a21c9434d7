//! Heuristic filter deciding which candidates are product photos.
//!
//! The chain runs cheap string checks first and page-specific signals last.
//! Every rule either passes the candidate on or rejects it with a reason, and
//! no rule after a rejection is evaluated.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ConfigError;
use crate::traits::PageElement;

/// Why a candidate was dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("no usable image URL")]
    NoUrl,
    #[error("URL points at extension resources")]
    InternalResource,
    #[error("inline data URI")]
    DataUri,
    #[error("URL contains blocked keyword `{0}`")]
    UrlKeyword(String),
    #[error("label contains blocked keyword `{0}`")]
    AltKeyword(String),
    #[error("rendered size {width}x{height} outside bounds")]
    OutOfBounds { width: u32, height: u32 },
    #[error("no product path or thumbnail marker")]
    NoContentSignal,
    #[error("no alt or title text")]
    MissingLabel,
    #[error("URL already extracted")]
    DuplicateUrl,
}

/// Snapshot of the facts the filter rules look at
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Candidate {
    /// Resolved absolute URL
    pub url: String,
    /// Alt text, else title, whitespace collapsed, `None` when blank
    pub label: Option<String>,
    pub size: Option<(u32, u32)>,
    /// Class names of the image and of its immediate parent
    pub class_names: Vec<String>,
}

impl Candidate {
    pub fn from_element<E: PageElement>(image: &E, url: String) -> Self {
        let label = ["alt", "title"]
            .iter()
            .filter_map(|name| image.attr(name))
            .map(collapse_whitespace)
            .find(|text| !text.is_empty());

        let parent = image.parent();
        let class_names = image
            .attr("class")
            .into_iter()
            .chain(parent.as_ref().and_then(|p| p.attr("class")))
            .flat_map(str::split_whitespace)
            .map(ToString::to_string)
            .collect();

        Self {
            url,
            label,
            size: image.rendered_size(),
            class_names,
        }
    }
}

pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// One inclusion or exclusion test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum FilterRule {
    /// Reject URLs containing any keyword, case-insensitive
    UrlKeywordBlock { keywords: Vec<String> },
    /// Reject labels containing any keyword, case-insensitive
    AltKeywordBlock { keywords: Vec<String> },
    /// Require both sides within bounds when the size is known
    SizeBounds { min_side: u32, max_side: Option<u32> },
    /// Accept URLs under a content path, or on `domain` with any of `path_terms`
    DomainPathAllow {
        content_paths: Vec<String>,
        domain: String,
        path_terms: Vec<String>,
    },
    /// Accept images whose own or parent class list carries a marker
    ClassAllow { markers: Vec<String> },
    /// Pass when at least one inner rule passes
    AnyOf { rules: Vec<FilterRule> },
}

impl FilterRule {
    pub fn test(&self, candidate: &Candidate) -> Result<(), Rejection> {
        match self {
            Self::UrlKeywordBlock { keywords } => {
                match find_keyword(&candidate.url, keywords) {
                    Some(keyword) => Err(Rejection::UrlKeyword(keyword.clone())),
                    None => Ok(()),
                }
            }
            Self::AltKeywordBlock { keywords } => {
                let hit = candidate
                    .label
                    .as_deref()
                    .and_then(|label| find_keyword(label, keywords));
                match hit {
                    Some(keyword) => Err(Rejection::AltKeyword(keyword.clone())),
                    None => Ok(()),
                }
            }
            Self::SizeBounds { min_side, max_side } => {
                // Unmeasured images pass
                let Some((width, height)) = candidate.size else {
                    return Ok(());
                };
                let within = |side: u32| side >= *min_side && max_side.is_none_or(|max| side <= max);
                if within(width) && within(height) {
                    Ok(())
                } else {
                    Err(Rejection::OutOfBounds { width, height })
                }
            }
            Self::DomainPathAllow {
                content_paths,
                domain,
                path_terms,
            } => {
                let url = candidate.url.to_lowercase();
                let on_content_path = content_paths
                    .iter()
                    .any(|path| url.contains(&path.to_lowercase()));
                let on_domain = !domain.is_empty()
                    && url.contains(&domain.to_lowercase())
                    && path_terms
                        .iter()
                        .any(|term| url.contains(&term.to_lowercase()));
                if on_content_path || on_domain {
                    Ok(())
                } else {
                    Err(Rejection::NoContentSignal)
                }
            }
            Self::ClassAllow { markers } => {
                let marked = candidate.class_names.iter().any(|class| {
                    markers
                        .iter()
                        .any(|marker| marker.eq_ignore_ascii_case(class))
                });
                if marked {
                    Ok(())
                } else {
                    Err(Rejection::NoContentSignal)
                }
            }
            Self::AnyOf { rules } => {
                let mut last = Rejection::NoContentSignal;
                for rule in rules {
                    match rule.test(candidate) {
                        Ok(()) => return Ok(()),
                        Err(rejection) => last = rejection,
                    }
                }
                Err(last)
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::SizeBounds {
                min_side,
                max_side: Some(max),
            } if min_side > max => Err(ConfigError::InvalidSizeBounds {
                min: *min_side,
                max: *max,
            }),
            Self::AnyOf { rules } if rules.is_empty() => Err(ConfigError::EmptyAnyOf),
            Self::AnyOf { rules } => rules.iter().try_for_each(FilterRule::validate),
            _ => Ok(()),
        }
    }
}

/// Run the chain in order, stopping at the first rejection
pub fn apply_rules(rules: &[FilterRule], candidate: &Candidate) -> Result<(), Rejection> {
    rules.iter().try_for_each(|rule| rule.test(candidate))
}

fn find_keyword<'k>(haystack: &str, keywords: &'k [String]) -> Option<&'k String> {
    let haystack = haystack.to_lowercase();
    keywords
        .iter()
        .find(|keyword| haystack.contains(&keyword.to_lowercase()))
}
