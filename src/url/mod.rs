//! URL handling module for Pagechain
//!
//! This module provides URL normalization for the visited set and next-link
//! resolution, plus page label derivation for the output document.

mod label;
mod normalize;

// Re-export main functions
pub use label::page_label;
pub use normalize::{normalize_url, resolve_and_normalize};
