//! Traits and interfaces for page access, product sources and status notification

use anyhow::Result;
use async_trait::async_trait;
use url::Url;

use crate::extractor::Extraction;
use crate::models::CountNotification;

/// Read-only view of one loaded page.
///
/// The extractor only talks to the document through this trait, so it can run
/// against a parsed HTML snapshot, a live browser tab or a synthetic tree in tests.
pub trait PageAccessor {
    /// Element handle borrowed from the page
    type Element<'a>: PageElement
    where
        Self: 'a;

    /// All elements matching a CSS-like pattern, in document order.
    ///
    /// A pattern the page cannot evaluate yields an empty list.
    fn query_all<'a>(&'a self, pattern: &str) -> Vec<Self::Element<'a>>;

    /// URL the page was loaded from, used to absolutize relative image paths
    fn page_url(&self) -> Option<&Url>;
}

/// A single element of a page
pub trait PageElement: Clone {
    /// Lowercase tag name
    fn tag_name(&self) -> &str;

    fn attr(&self, name: &str) -> Option<&str>;

    fn parent(&self) -> Option<Self>;

    /// First descendant matching `pattern`, in document order
    fn query_first(&self, pattern: &str) -> Option<Self>;

    /// Concatenated text of all descendant text nodes
    fn text(&self) -> String;

    /// Rendered `(width, height)` in pixels.
    ///
    /// # Returns
    /// * `Some` only when both sides are known and positive
    fn rendered_size(&self) -> Option<(u32, u32)>;
}

/// Trait for a website page that yields product images
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// Display name for the source
    fn name(&self) -> &str;

    /// URL of the page this source reads
    fn page_url(&self) -> &str;

    /// Fetch the page and run the extractor over it
    ///
    /// # Returns
    /// * `Result<Extraction>` - Detected products, or a fetch error
    async fn detect_products(&self) -> Result<Extraction>;
}

/// Fire-and-forget receiver of per-extraction product counts
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, notification: &CountNotification) -> Result<()>;
}
