
use coitrees::{COITree, Interval, IntervalTree};
use std::collections::BTreeMap;

use crate::data_types::variants::VariantRecord;

/// Queryable collection of expected (truth) haplotype records.
/// Built once per comparison run and never mutated; overlap queries go through
/// per-chromosome COITrees over indices into the record store.
pub struct HaplotypeIndex {
    /// Backing store for every expected record
    records: Vec<VariantRecord>,
    /// Lookup from a chromosome to a COITree of record indices, 1-based inclusive ranges
    lookup_trees: BTreeMap<String, COITree<usize, u32>>
}

impl std::fmt::Debug for HaplotypeIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // COITree does not have Debug, so lets just convert it to a length for simplicity
        let lookup_counts: BTreeMap<String, usize> = self.lookup_trees.iter()
            .map(|(s, c)| {
                (s.clone(), c.len())
            })
            .collect();
        f.debug_struct("HaplotypeIndex")
            .field("records_len", &self.records.len())
            .field("lookup_trees_len", &lookup_counts)
            .finish()
    }
}

impl HaplotypeIndex {
    /// Builds the index from the full expected record set.
    /// # Arguments
    /// * `records` - all expected records, any chromosome order
    pub fn from_records(records: Vec<VariantRecord>) -> Self {
        // bucket the record indices per chromosome
        let mut chrom_intervals: BTreeMap<String, Vec<Interval<usize>>> = Default::default();
        for (index, record) in records.iter().enumerate() {
            let interval = Interval::new(record.start() as i32, record.end() as i32, index);
            chrom_intervals.entry(record.chrom().to_string()).or_default().push(interval);
        }

        let lookup_trees = chrom_intervals.into_iter()
            .map(|(chrom, intervals)| (chrom, COITree::new(&intervals)))
            .collect();
        Self {
            records,
            lookup_trees
        }
    }

    /// Returns all expected records overlapping the query span, sorted by
    /// ascending start position (ties by end, then input order).
    /// # Arguments
    /// * `chrom` - the query chromosome
    /// * `start` - the first queried position, 1-based
    /// * `end` - the last queried position, 1-based inclusive
    pub fn overlap(&self, chrom: &str, start: u64, end: u64) -> Vec<&VariantRecord> {
        let coi_tree = match self.lookup_trees.get(chrom) {
            Some(ct) => ct,
            None => return vec![]
        };

        let mut hit_indices: Vec<usize> = vec![];
        coi_tree.query(start as i32, end as i32, |node| {
            hit_indices.push(node.metadata);
        });

        // tree traversal order is unspecified, sort for deterministic output
        hit_indices.sort_by_key(|&index| {
            let record = &self.records[index];
            (record.start(), record.end(), index)
        });
        hit_indices.into_iter()
            .map(|index| &self.records[index])
            .collect()
    }

    /// Returns all expected records starting strictly after the given position,
    /// sorted by ascending start. Used for gap and end-of-chromosome scans.
    /// # Arguments
    /// * `chrom` - the query chromosome
    /// * `position` - the exclusive lower bound, 1-based
    pub fn starting_after(&self, chrom: &str, position: u64) -> Vec<&VariantRecord> {
        self.overlap(chrom, position.saturating_add(1), i32::MAX as u64)
            .into_iter()
            .filter(|record| record.start() > position)
            .collect()
    }

    /// Chromosomes with at least one expected record, in sorted order.
    pub fn chromosomes(&self) -> Vec<&str> {
        self.lookup_trees.keys().map(|c| c.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(chrom: &str, start: u64, ref_allele: &[u8]) -> VariantRecord {
        VariantRecord::new(
            chrom.to_string(), start, None,
            ref_allele.to_vec(), vec![b"A".to_vec()], vec![]
        ).unwrap()
    }

    fn build_index() -> HaplotypeIndex {
        HaplotypeIndex::from_records(vec![
            record("chr1", 10, b"C"),
            record("chr1", 20, b"CTTT"), // spans 20-23
            record("chr1", 40, b"G"),
            record("chr2", 10, b"T")
        ])
    }

    #[test]
    fn test_overlap() {
        let index = build_index();
        assert_eq!(index.len(), 4);

        let hits = index.overlap("chr1", 5, 25);
        let starts: Vec<u64> = hits.iter().map(|r| r.start()).collect();
        assert_eq!(starts, vec![10, 20]);

        // interior hit on the multi-base record
        let hits = index.overlap("chr1", 23, 23);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].start(), 20);

        assert!(index.overlap("chr1", 24, 39).is_empty());
        assert!(index.overlap("chr3", 1, 100).is_empty());
    }

    #[test]
    fn test_starting_after() {
        let index = build_index();

        let hits = index.starting_after("chr1", 10);
        let starts: Vec<u64> = hits.iter().map(|r| r.start()).collect();
        assert_eq!(starts, vec![20, 40]);

        // a position inside the deletion span does not pull the deletion back in
        let hits = index.starting_after("chr1", 21);
        let starts: Vec<u64> = hits.iter().map(|r| r.start()).collect();
        assert_eq!(starts, vec![40]);

        assert!(index.starting_after("chr1", 40).is_empty());
    }

    #[test]
    fn test_chromosomes() {
        let index = build_index();
        assert_eq!(index.chromosomes(), vec!["chr1", "chr2"]);
    }
}
