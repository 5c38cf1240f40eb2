//! Ordered composition of filters.

use catalog::MovieRecord;
use tracing::debug;

use crate::traits::Filter;

/// All filters a record must pass, checked in insertion order.
///
/// ```ignore
/// let filters = FilterPipeline::new()
///     .add_filter(MinimumVotesFilter::new(1000))
///     .add_filter(MinimumRatingFilter::new(6.0));
///
/// let kept = filters.apply(page);
/// ```
#[derive(Default)]
pub struct FilterPipeline {
    stages: Vec<Box<dyn Filter>>,
}

impl FilterPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stage (builder style)
    pub fn add_filter(mut self, filter: impl Filter + 'static) -> Self {
        self.stages.push(Box::new(filter));
        self
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// True when every stage keeps `record`
    pub fn keep(&self, record: &MovieRecord) -> bool {
        self.stages.iter().all(|stage| stage.keep(record))
    }

    /// Drop the records some stage rejects. Survivors keep their order.
    ///
    /// An empty result is a normal outcome: a whole page may consist of
    /// obscure titles.
    pub fn apply(&self, mut records: Vec<MovieRecord>) -> Vec<MovieRecord> {
        for stage in &self.stages {
            let before = records.len();
            records.retain(|record| stage.keep(record));
            if records.len() < before {
                debug!(
                    filter = stage.name(),
                    dropped = before - records.len(),
                    kept = records.len(),
                    "Filtered records"
                );
            }
        }
        records
    }
}

impl std::fmt::Debug for FilterPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.stages.iter().map(|stage| stage.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{MinimumRatingFilter, MinimumVotesFilter};
    use crate::test_support::record;

    #[test]
    fn test_no_stages_keeps_everything() {
        let filters = FilterPipeline::new();
        let page = vec![record("A", 7.0, 10), record("B", 3.0, 5)];

        assert!(filters.is_empty());
        assert_eq!(filters.apply(page.clone()), page);
    }

    #[test]
    fn test_record_must_pass_every_stage() {
        let filters = FilterPipeline::new()
            .add_filter(MinimumVotesFilter::new(100))
            .add_filter(MinimumRatingFilter::new(6.5));

        let page = vec![
            record("popular but weak", 5.0, 10_000),
            record("obscure gem", 9.0, 20),
            record("keeper", 7.5, 2_000),
        ];
        assert!(!filters.keep(&page[0]));
        assert!(!filters.keep(&page[1]));
        assert!(filters.keep(&page[2]));

        let kept = filters.apply(page);
        assert_eq!(filters.len(), 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].title, "keeper");
    }

    #[test]
    fn test_debug_lists_stage_names() {
        let filters = FilterPipeline::new().add_filter(MinimumVotesFilter::new(1));
        assert_eq!(format!("{:?}", filters), "[\"MinimumVotesFilter\"]");
    }
}
