//! Extractor configuration: selector tables, filter rules and naming policy.
//!
//! Everything site-specific lives here as data. Adapting to a redesigned page
//! means editing these tables (or a JSON file with the same shape), not the
//! extraction control flow.

use std::path::Path;

use anyhow::{Context, Result};
use scraper::Selector;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extractor::filter::FilterRule;
use crate::extractor::selector::SelectorSpec;
use crate::scrapers::famima;

/// What to do with a candidate that has no alt or title text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelPolicy {
    /// Keep the candidate and derive a name from surrounding text or the URL
    #[default]
    Fallback,
    /// Drop the candidate
    Reject,
}

/// How display names are derived when the image carries no label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Patterns tried inside the candidate's container, in priority order
    pub text_patterns: Vec<String>,
    /// Texts with this many characters or more are not names
    pub max_text_chars: usize,
    /// Prefix for names synthesized from the image file name
    pub url_name_prefix: String,
    /// Prefix for positional names, followed by the 1-based position
    pub positional_prefix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            text_patterns: famima::NAME_TEXT_PATTERNS
                .iter()
                .map(ToString::to_string)
                .collect(),
            max_text_chars: 100,
            url_name_prefix: "image_".to_string(),
            positional_prefix: "product_".to_string(),
        }
    }
}

/// Complete configuration of one extraction pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Ordered selector patterns with acceptable match counts
    pub selectors: SelectorSpec,
    /// Patterns locating the image inside a matched item container
    pub image_patterns: Vec<String>,
    /// Attributes holding the image URL, eager `src` first then lazy-load placeholders
    pub url_attributes: Vec<String>,
    /// URL scheme prefixes of browser-extension bundled resources
    pub internal_schemes: Vec<String>,
    /// Tags treated as the structural container of a bare image match
    pub container_tags: Vec<String>,
    /// Filter chain, all rules must pass, evaluated in order
    pub rules: Vec<FilterRule>,
    pub label_policy: LabelPolicy,
    pub naming: NamingConfig,
    /// Drop candidates whose URL already produced a record
    pub dedupe_urls: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        famima::extractor_config()
    }
}

/// Problems found while validating an [`ExtractorConfig`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("selector table is empty")]
    EmptySelectorSpec,

    #[error("no image URL attributes configured")]
    NoUrlAttributes,

    #[error("invalid selector pattern `{pattern}`: {reason}")]
    InvalidSelector { pattern: String, reason: String },

    #[error("pattern `{pattern}` has an empty count range ({min}..={max})")]
    InvalidCountRange {
        pattern: String,
        min: usize,
        max: usize,
    },

    #[error("size bounds are inverted: min side {min} > max side {max}")]
    InvalidSizeBounds { min: u32, max: u32 },

    #[error("`any_of` rule has no alternatives")]
    EmptyAnyOf,
}

impl ExtractorConfig {
    /// Load a configuration from a JSON file. Missing fields take the built-in defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read extractor config {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse extractor config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every pattern parses and every range is satisfiable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.selectors.patterns.is_empty() {
            return Err(ConfigError::EmptySelectorSpec);
        }
        if self.url_attributes.is_empty() {
            return Err(ConfigError::NoUrlAttributes);
        }

        for entry in &self.selectors.patterns {
            check_pattern(&entry.pattern)?;
            if let Some(max) = entry.max
                && max < entry.min.max(1)
            {
                return Err(ConfigError::InvalidCountRange {
                    pattern: entry.pattern.clone(),
                    min: entry.min,
                    max,
                });
            }
        }

        for pattern in self.image_patterns.iter().chain(&self.naming.text_patterns) {
            check_pattern(pattern)?;
        }

        for rule in &self.rules {
            rule.validate()?;
        }

        Ok(())
    }
}

fn check_pattern(pattern: &str) -> Result<(), ConfigError> {
    Selector::parse(pattern)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector {
            pattern: pattern.to_string(),
            reason: format!("{e:?}"),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::selector::SelectorPattern;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(ExtractorConfig::default().validate(), Ok(()));
    }

    #[test]
    fn partial_json_keeps_default_tables() {
        let config: ExtractorConfig =
            serde_json::from_str(r#"{ "dedupe_urls": true, "label_policy": "reject" }"#).unwrap();

        assert!(config.dedupe_urls);
        assert_eq!(config.label_policy, LabelPolicy::Reject);
        assert_eq!(
            config.selectors.patterns.len(),
            ExtractorConfig::default().selectors.patterns.len()
        );
        assert_eq!(config.url_attributes[0], "src");
    }

    #[test]
    fn rejects_unparseable_pattern() {
        let mut config = ExtractorConfig::default();
        config.selectors.patterns.push(SelectorPattern::new("li["));

        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn rejects_empty_count_range() {
        let mut config = ExtractorConfig::default();
        config.selectors.patterns = vec![SelectorPattern {
            pattern: "li.item".to_string(),
            min: 10,
            max: Some(5),
        }];

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidCountRange {
                pattern: "li.item".to_string(),
                min: 10,
                max: 5,
            })
        );
    }

    #[test]
    fn rejects_inverted_size_bounds() {
        let mut config = ExtractorConfig::default();
        config.rules.push(FilterRule::SizeBounds {
            min_side: 300,
            max_side: Some(200),
        });

        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidSizeBounds { min: 300, max: 200 })
        );
    }

    #[test]
    fn loads_config_from_file() {
        let path = std::env::temp_dir().join(format!(
            "newgoods-finder-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{ "selectors": { "patterns": [ { "pattern": "li.goods" } ] } }"#)
            .unwrap();

        let config = ExtractorConfig::from_json_file(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.selectors.patterns.len(), 1);
        assert_eq!(config.selectors.patterns[0].min, 1);
        assert_eq!(config.selectors.patterns[0].max, None);
    }
}
