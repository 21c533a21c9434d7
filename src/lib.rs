//! Detects product thumbnails on a retailer's new products page and
//! downloads them.
//!
//! The [`extractor`] decides which images on a page are product photos. It
//! reads the page through [`traits::PageAccessor`], so it runs the same way on
//! a fetched HTML snapshot ([`page::HtmlPage`]) as on any other document
//! source. Everything around it (fetching, status notifications, the
//! minimum-count gate and downloading) lives in [`collector`] and friends.

pub mod collector;
pub mod config;
pub mod download;
pub mod extractor;
pub mod models;
pub mod notify;
pub mod page;
pub mod scrapers;
pub mod traits;

pub use config::{ExtractorConfig, LabelPolicy};
pub use extractor::{CandidateSource, Extraction, Extractor};
pub use models::ProductRecord;
