//! Site-specific product sources

pub mod famima;

pub use famima::FamimaSource;
