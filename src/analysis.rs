//! Read-side queries over a built [`ChainTable`].
//!
//! Nothing here mutates the table; every result is an owned, serializable
//! copy so callers can hand it straight to `serde_json` or the reporter.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::chain::{BillingCodeChain, ChainTable};

/// Ceiling on any single page of results.
pub const MAX_PAGE_SIZE: usize = 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn new(offset: usize, limit: Option<usize>) -> Self {
        Self { offset, limit }
    }

    pub fn limit(&self) -> usize {
        self.limit.unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE)
    }

    fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        items.skip(self.offset).take(self.limit()).collect()
    }
}

/// One root and the shape of its chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootSummary {
    pub root_id: i64,
    pub root_code: String,
    pub root_title: String,
    pub length: usize,
    pub max_cumulative_day_range: i64,
}

/// A whole chain with its summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RootChain {
    #[serde(flatten)]
    pub summary: RootSummary,
    pub records: Vec<BillingCodeChain>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainStatistics {
    pub total_chains: usize,
    pub total_codes: usize,
    pub total_records: usize,
    pub average_chain_length: f64,
    pub max_cumulative_day_range: i64,
}

impl ChainTable {
    pub fn chain_by_root(&self, root_id: i64, page: Page) -> Vec<BillingCodeChain> {
        page.apply(self.records_for_root(root_id).cloned())
    }

    /// The record for `code_id`. When the code sits under several roots the
    /// lowest root wins.
    pub fn chain_by_code(&self, code_id: i64) -> Option<BillingCodeChain> {
        let roots = self.roots_of(code_id);
        if roots.len() > 1 {
            log::warn!(
                target: "analysis",
                "code {code_id} belongs to {} chains (roots {roots:?}), using root {}",
                roots.len(),
                roots[0]
            );
        }
        let root_id = *roots.first()?;
        self.record(root_id, code_id).cloned()
    }

    pub fn chains_containing_code(&self, code_id: i64) -> Vec<RootChain> {
        self.roots_of(code_id)
            .into_iter()
            .filter_map(|root_id| {
                let records: Vec<BillingCodeChain> = self.records_for_root(root_id).cloned().collect();
                Some(RootChain {
                    summary: summarize(&records)?,
                    records,
                })
            })
            .collect()
    }

    /// Roots ranked by how many codes their chain holds.
    pub fn longest_chains(&self, limit: usize) -> Vec<RootSummary> {
        let mut summaries = self.summaries();
        summaries.sort_by(|a, b| b.length.cmp(&a.length).then(a.root_id.cmp(&b.root_id)));
        summaries.truncate(limit.min(MAX_PAGE_SIZE));
        summaries
    }

    /// Roots ranked by the furthest day their chain reaches.
    pub fn chains_with_highest_day_ranges(&self, limit: usize) -> Vec<RootSummary> {
        let mut summaries = self.summaries();
        summaries.sort_by(|a, b| {
            b.max_cumulative_day_range
                .cmp(&a.max_cumulative_day_range)
                .then(a.root_id.cmp(&b.root_id))
        });
        summaries.truncate(limit.min(MAX_PAGE_SIZE));
        summaries
    }

    /// Records whose cumulative day range lies in `[min, max]`; a missing
    /// bound is open.
    pub fn day_range_analysis(
        &self,
        min_day_range: Option<i64>,
        max_day_range: Option<i64>,
        page: Page,
    ) -> Vec<BillingCodeChain> {
        let matches = self.records().iter().filter(|r| {
            min_day_range.is_none_or(|min| r.cumulative_day_range >= min)
                && max_day_range.is_none_or(|max| r.cumulative_day_range <= max)
        });
        page.apply(matches.cloned())
    }

    /// Case-insensitive substring match over code and title.
    pub fn search(&self, term: &str, page: Page) -> Vec<BillingCodeChain> {
        let needle = term.trim().to_lowercase();
        let matches = self.records().iter().filter(|r| {
            r.code.to_lowercase().contains(&needle) || r.title.to_lowercase().contains(&needle)
        });
        page.apply(matches.cloned())
    }

    pub fn statistics(&self) -> ChainStatistics {
        let total_chains = self.root_ids().len();
        let total_codes = self
            .records()
            .iter()
            .map(|r| r.code_id)
            .collect::<HashSet<_>>()
            .len();
        let average_chain_length = if total_chains == 0 {
            0.0
        } else {
            self.len() as f64 / total_chains as f64
        };
        ChainStatistics {
            total_chains,
            total_codes,
            total_records: self.len(),
            average_chain_length,
            max_cumulative_day_range: self
                .records()
                .iter()
                .map(|r| r.cumulative_day_range)
                .max()
                .unwrap_or(0),
        }
    }

    fn summaries(&self) -> Vec<RootSummary> {
        let mut by_root: BTreeMap<i64, Vec<BillingCodeChain>> = BTreeMap::new();
        for record in self.records() {
            by_root.entry(record.root_id).or_default().push(record.clone());
        }
        by_root.values().filter_map(|records| summarize(records)).collect()
    }
}

fn summarize(records: &[BillingCodeChain]) -> Option<RootSummary> {
    let root = records.iter().find(|r| r.is_root())?;
    Some(RootSummary {
        root_id: root.root_id,
        root_code: root.code.clone(),
        root_title: root.title.clone(),
        length: records.len(),
        max_cumulative_day_range: records.iter().map(|r| r.cumulative_day_range).max().unwrap_or(0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::build_all;
    use crate::schema::{BillingCode, Catalog, ChainEdge, RecordType};

    fn code(id: i64, title: &str, day_range: Option<i64>) -> BillingCode {
        BillingCode {
            id,
            code: format!("{:04}", id),
            title: title.to_string(),
            day_range,
            max_units: None,
            multiple_unit_indicator: false,
            billing_record_type: RecordType::PerDiem,
            fee_cents: None,
            section: None,
        }
    }

    /// Two roots, with 3 also hanging off 11:
    /// 1 (5) -> 2 (5) -> 3 (open)
    /// 10 (30) -> 11 (60)
    /// 20 (1) has no edges, so it is not a chain.
    fn table() -> ChainTable {
        let catalog = Catalog {
            codes: vec![
                code(1, "Hospital care day 1-5", Some(5)),
                code(2, "Hospital care day 6-10", Some(5)),
                code(3, "Hospital care subsequent", None),
                code(10, "Psychiatric care first month", Some(30)),
                code(11, "Psychiatric care months 2-3", Some(60)),
                code(20, "Detention", Some(1)),
            ],
            edges: [(1, 2), (2, 3), (10, 11), (11, 3)]
                .into_iter()
                .map(|(previous_code_id, code_id)| ChainEdge { code_id, previous_code_id })
                .collect(),
            preferred_sections: Vec::new(),
        };
        build_all(&catalog).table
    }

    #[test]
    fn test_chain_by_root_orders_by_cumulative_days() {
        let chain = table().chain_by_root(1, Page::default());
        let cumulative: Vec<i64> = chain.iter().map(|r| r.cumulative_day_range).collect();
        assert_eq!(cumulative, vec![5, 10, 10]);
        assert_eq!(chain.iter().map(|r| r.code_id).collect::<Vec<_>>(), vec![1, 2, 3]);

        let page = table().chain_by_root(1, Page::new(1, Some(1)));
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].code_id, 2);
    }

    #[test]
    fn test_code_in_two_roots() {
        let table = table();
        let record = table.chain_by_code(3).unwrap();
        assert_eq!(record.root_id, 1);
        assert_eq!(record.previous_day_range, 10);

        let chains = table.chains_containing_code(3);
        let roots: Vec<i64> = chains.iter().map(|c| c.summary.root_id).collect();
        assert_eq!(roots, vec![1, 10]);
        assert_eq!(chains[1].records.len(), 3);
        assert!(table.chain_by_code(404).is_none());
    }

    #[test]
    fn test_rankings() {
        let table = table();
        let longest: Vec<(i64, usize)> = table.longest_chains(2).iter().map(|s| (s.root_id, s.length)).collect();
        assert_eq!(longest, vec![(1, 3), (10, 3)]);

        let highest: Vec<(i64, i64)> = table
            .chains_with_highest_day_ranges(10)
            .iter()
            .map(|s| (s.root_id, s.max_cumulative_day_range))
            .collect();
        assert_eq!(highest, vec![(10, 90), (1, 10)]);
    }

    #[test]
    fn test_day_range_analysis_bounds() {
        let table = table();
        let ids = |records: Vec<BillingCodeChain>| records.iter().map(|r| r.code_id).collect::<Vec<_>>();

        assert_eq!(ids(table.day_range_analysis(Some(10), Some(30), Page::default())), vec![2, 3, 10]);
        assert_eq!(ids(table.day_range_analysis(None, Some(5), Page::default())), vec![1]);
        assert!(table.day_range_analysis(None, Some(1), Page::default()).is_empty());
        assert_eq!(ids(table.day_range_analysis(Some(90), None, Page::default())), vec![11, 3]);
        assert_eq!(table.day_range_analysis(None, None, Page::default()).len(), table.len());
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let table = table();
        let hits = table.search("PSYCHIATRIC", Page::default());
        assert_eq!(hits.len(), 2);
        let hits = table.search("0011", Page::default());
        assert_eq!(hits.len(), 1);
        assert!(table.search("detention", Page::default()).is_empty());
        assert!(table.search("dialysis", Page::default()).is_empty());
    }

    #[test]
    fn test_statistics() {
        let stats = table().statistics();
        assert_eq!(stats.total_chains, 2);
        assert_eq!(stats.total_codes, 5);
        assert_eq!(stats.total_records, 6);
        assert!((stats.average_chain_length - 3.0).abs() < 1e-9);
        assert_eq!(stats.max_cumulative_day_range, 90);

        let empty = ChainTable::default().statistics();
        assert_eq!(empty.total_chains, 0);
        assert_eq!(empty.average_chain_length, 0.0);
    }

    #[test]
    fn test_page_limit_is_capped() {
        assert_eq!(Page::default().limit(), MAX_PAGE_SIZE);
        assert_eq!(Page::new(0, Some(5_000)).limit(), MAX_PAGE_SIZE);
        assert_eq!(Page::new(0, Some(3)).limit(), 3);
    }
}
