//! Critical CSS extraction.
//!
//! Given an HTML document and its stylesheets, this crate computes the
//! minimal subset of style rules needed to render the document's current
//! structure, injects it as an inline `<style data-critical="true">`
//! element, and returns both the CSS and the rewritten HTML.
//!
//! ```no_run
//! # async fn run() -> Result<(), critcss_lib::ExtractError> {
//! use critcss_lib::{extract, ExtractOptions};
//!
//! let result = extract(ExtractOptions {
//!     html: Some("<!DOCTYPE html><html>...</html>".to_string()),
//!     ..Default::default()
//! })
//! .await?;
//! println!("{}", result.css);
//! # Ok(())
//! # }
//! ```
//!
//! Known fragility, inherited deliberately: a single unreachable remote
//! stylesheet aborts the whole extraction instead of being skipped, and
//! the minifier is a textual heuristic that can mangle punctuation inside
//! string literals or URLs.

pub mod acquire;
pub mod dom;
pub mod extract;
pub mod minify;
pub mod parser;
pub mod serialize;
pub mod style;

pub use extract::{extract, ExtractError, ExtractOptions, Extraction, Url, CRITICAL_ATTR};
