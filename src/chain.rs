use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::ChainError;
use crate::schema::{BillingCode, Catalog};

/// One (root, code) pair of a billing code chain.
///
/// `previous_day_range` is the number of days elapsed from the root event
/// before this code becomes billable; `cumulative_day_range` is the number of
/// days through the end of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingCodeChain {
    pub code_id: i64,
    pub code: String,
    pub title: String,
    pub root_id: i64,
    pub previous_code_id: Option<i64>,
    pub previous_day_range: i64,
    pub day_range: i64,
    pub cumulative_day_range: i64,
    pub prev_plus_self: i64,
    pub is_last: bool,
    pub depth: usize,
}

impl BillingCodeChain {
    pub fn is_root(&self) -> bool {
        self.previous_code_id.is_none()
    }
}

/// Adjacency view of the catalog's codes and predecessor edges.
pub struct ChainGraph<'a> {
    codes: HashMap<i64, &'a BillingCode>,
    successors: HashMap<i64, Vec<i64>>,
    predecessors: HashMap<i64, Vec<i64>>,
}

impl<'a> ChainGraph<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        let mut successors: HashMap<i64, Vec<i64>> = HashMap::new();
        let mut predecessors: HashMap<i64, Vec<i64>> = HashMap::new();
        for edge in &catalog.edges {
            successors.entry(edge.previous_code_id).or_default().push(edge.code_id);
            predecessors.entry(edge.code_id).or_default().push(edge.previous_code_id);
        }
        for ids in successors.values_mut().chain(predecessors.values_mut()) {
            ids.sort_unstable();
            ids.dedup();
        }
        Self {
            codes: catalog.code_map(),
            successors,
            predecessors,
        }
    }

    /// Codes that start a chain: at least one successor and no predecessor,
    /// in id order. Codes no edge mentions are not chains.
    pub fn roots(&self) -> Vec<i64> {
        let mut roots: Vec<i64> = self
            .codes
            .keys()
            .copied()
            .filter(|id| self.successors.contains_key(id) && !self.predecessors.contains_key(id))
            .collect();
        roots.sort_unstable();
        roots
    }

    /// Walk the chain under `root_id`, one record per reachable code.
    pub fn build(&self, root_id: i64) -> Result<Vec<BillingCodeChain>, ChainError> {
        let root = self
            .codes
            .get(&root_id)
            .ok_or_else(|| ChainError::malformed(root_id, "root code is not in the catalog"))?;
        if let Some(preds) = self.predecessors.get(&root_id) {
            return Err(ChainError::malformed(
                root_id,
                format!("root has predecessor(s) {preds:?}"),
            ));
        }

        // Any path longer than the catalog must revisit a code.
        let max_depth = self.codes.len();
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut stack = vec![(*root, None::<i64>, 0_i64, 0_usize)];

        while let Some((code, previous_code_id, previous_day_range, depth)) = stack.pop() {
            if depth > max_depth {
                return Err(ChainError::malformed(
                    root_id,
                    format!("traversal exceeded {max_depth} levels at code {}", code.id),
                ));
            }
            if !seen.insert(code.id) {
                return Err(ChainError::malformed(
                    root_id,
                    format!("code {} is reached more than once", code.id),
                ));
            }

            let day_range = code.day_range.unwrap_or(0);
            let cumulative = previous_day_range + day_range;
            records.push(BillingCodeChain {
                code_id: code.id,
                code: code.code.clone(),
                title: code.title.clone(),
                root_id,
                previous_code_id,
                previous_day_range,
                day_range,
                cumulative_day_range: cumulative,
                prev_plus_self: cumulative,
                is_last: false,
                depth,
            });

            for next_id in self.successors.get(&code.id).into_iter().flatten().rev() {
                let next = self.codes.get(next_id).ok_or_else(|| {
                    ChainError::malformed(
                        root_id,
                        format!("successor {next_id} of code {} is not in the catalog", code.id),
                    )
                })?;
                stack.push((*next, Some(code.id), cumulative, depth + 1));
            }
        }

        let extended: HashSet<i64> = records.iter().filter_map(|r| r.previous_code_id).collect();
        for record in &mut records {
            record.is_last = !extended.contains(&record.code_id);
        }
        records.sort_by_key(|r| (r.cumulative_day_range, r.depth, r.code_id));
        Ok(records)
    }

    /// Follow first predecessors from `code_id` until a root, a missing code
    /// or a repeat.
    fn trace_to_root(&self, code_id: i64) -> Result<i64, String> {
        let mut seen = HashSet::new();
        let mut current = code_id;
        loop {
            if !seen.insert(current) {
                return Err(format!("predecessor cycle through code {current}"));
            }
            match self.predecessors.get(&current).and_then(|p| p.first()) {
                None => return Ok(current),
                Some(prev) if !self.codes.contains_key(prev) => {
                    return Err(format!("predecessor {prev} of code {current} is not in the catalog"));
                }
                Some(prev) => current = *prev,
            }
        }
    }
}

/// Build the chain for a single root.
pub fn build_chain(root_id: i64, catalog: &Catalog) -> Result<Vec<BillingCodeChain>, ChainError> {
    ChainGraph::new(catalog).build(root_id)
}

/// Result of building every root in a catalog.
#[derive(Debug, Default)]
pub struct ChainBuild {
    pub table: ChainTable,
    pub failures: Vec<ChainError>,
}

/// Build every root. A malformed root is reported and skipped, the rest
/// still land in the table.
pub fn build_all(catalog: &Catalog) -> ChainBuild {
    let graph = ChainGraph::new(catalog);
    let mut records = Vec::new();
    let mut failures: BTreeMap<(i64, String), ChainError> = BTreeMap::new();

    for root_id in graph.roots() {
        match graph.build(root_id) {
            Ok(chain) => records.extend(chain),
            Err(err) => {
                failures.insert((root_id, err.to_string()), err);
            }
        }
    }

    for edge in &catalog.edges {
        for id in [edge.code_id, edge.previous_code_id] {
            if !graph.codes.contains_key(&id) {
                let err = ChainError::malformed(
                    edge.code_id,
                    format!("edge {} -> {} names unknown code {id}", edge.previous_code_id, edge.code_id),
                );
                failures.insert((edge.code_id, err.to_string()), err);
            }
        }
    }

    // Codes with predecessors that no root reaches sit on a cycle.
    let reached: HashSet<i64> = records.iter().map(|r| r.code_id).collect();
    let mut unreached: Vec<i64> = graph
        .predecessors
        .keys()
        .copied()
        .filter(|id| graph.codes.contains_key(id) && !reached.contains(id))
        .collect();
    unreached.sort_unstable();
    for code_id in unreached {
        if let Err(reason) = graph.trace_to_root(code_id) {
            if reason.starts_with("predecessor cycle") {
                let err = ChainError::malformed(code_id, reason);
                failures.insert((code_id, err.to_string()), err);
            }
        }
    }

    let failures: Vec<ChainError> = failures.into_values().collect();
    for failure in &failures {
        log::warn!(target: "chain", "{failure}");
    }
    let table = ChainTable::new(records);
    log::debug!(
        target: "chain",
        "built {} chain records across {} roots ({} failures)",
        table.len(),
        table.root_ids().len(),
        failures.len()
    );
    ChainBuild { table, failures }
}

/// Every chain record of a catalog, ordered by root then cumulative days.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainTable {
    records: Vec<BillingCodeChain>,
}

impl ChainTable {
    pub fn new(mut records: Vec<BillingCodeChain>) -> Self {
        records.sort_by_key(|r| (r.root_id, r.cumulative_day_range, r.depth, r.code_id));
        Self { records }
    }

    pub fn records(&self) -> &[BillingCodeChain] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn root_ids(&self) -> Vec<i64> {
        let mut ids: Vec<i64> = self.records.iter().map(|r| r.root_id).collect();
        ids.dedup();
        ids
    }

    pub fn records_for_root(&self, root_id: i64) -> impl Iterator<Item = &BillingCodeChain> {
        self.records.iter().filter(move |r| r.root_id == root_id)
    }

    /// Roots whose chains include `code_id`, lowest first.
    pub fn roots_of(&self, code_id: i64) -> Vec<i64> {
        self.records
            .iter()
            .filter(|r| r.code_id == code_id)
            .map(|r| r.root_id)
            .collect()
    }

    pub fn record(&self, root_id: i64, code_id: i64) -> Option<&BillingCodeChain> {
        self.records_for_root(root_id).find(|r| r.code_id == code_id)
    }

    /// Records in `root_id`'s chain that directly extend `code_id`.
    pub fn successors(&self, root_id: i64, code_id: i64) -> Vec<&BillingCodeChain> {
        let mut next: Vec<&BillingCodeChain> = self
            .records_for_root(root_id)
            .filter(|r| r.previous_code_id == Some(code_id))
            .collect();
        next.sort_by_key(|r| r.code_id);
        next
    }

    /// Linear walk from `from_code` to a leaf. At a branch the first successor
    /// accepted by `prefer` wins, otherwise the lowest code id.
    pub fn path_from(
        &self,
        root_id: i64,
        from_code: i64,
        prefer: impl Fn(i64) -> bool,
    ) -> Vec<&BillingCodeChain> {
        let mut path = Vec::new();
        let mut current = self.record(root_id, from_code);
        // Records of one root never repeat a code, so the path is bounded.
        while let Some(record) = current {
            path.push(record);
            let next = self.successors(root_id, record.code_id);
            current = next
                .iter()
                .find(|r| prefer(r.code_id))
                .or_else(|| next.first())
                .copied();
        }
        path
    }
}
