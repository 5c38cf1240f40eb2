//! The post-filter seam.
//!
//! The catalog only understands a few query parameters; everything else
//! is decided here, one record at a time, after a page has been parsed.

use catalog::MovieRecord;

/// A predicate over scraped records.
///
/// ## Rules
/// - `Send + Sync`: one pipeline is shared by every open result stream
/// - a filter only decides keep or drop; it never edits a record
/// - the decision depends on the record alone, so the outcome of a page
///   doesn't depend on which page came before it
pub trait Filter: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &str;

    /// Should `record` reach the user?
    fn keep(&self, record: &MovieRecord) -> bool;
}
