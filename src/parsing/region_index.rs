
use anyhow::{anyhow, Context};
use coitrees::{COITree, Interval, IntervalTree};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::path::Path;

use crate::data_types::coordinates::Coordinates;
use crate::data_types::summary_metrics::BaseCoverage;
use crate::parsing::noodles_helper::LoadedBed;

/// Lookup over a set of genomic regions of interest (BED-like intervals).
/// Supports overlap tests, enclosing-interval resolution for the block
/// continuity rule, and per-chromosome coverage counting. Intervals within a
/// chromosome are assumed non-overlapping, the usual shape for confidence BEDs.
pub struct RegionIndex {
    /// Interval spans per chromosome, sorted, 1-based inclusive
    chrom_intervals: IndexMap<String, Vec<(u64, u64)>>,
    /// Lookup from a chromosome to a COITree over indices into the span list
    lookup_trees: BTreeMap<String, COITree<usize, u32>>
}

impl std::fmt::Debug for RegionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // COITree does not have Debug, so lets just convert it to a length for simplicity
        let lookup_counts: BTreeMap<String, usize> = self.lookup_trees.iter()
            .map(|(s, c)| {
                (s.clone(), c.len())
            })
            .collect();
        f.debug_struct("RegionIndex").field("lookup_trees_len", &lookup_counts).finish()
    }
}

impl RegionIndex {
    /// Builds the index from pre-sorted interval spans.
    /// # Arguments
    /// * `chrom_intervals` - sorted 1-based inclusive spans per chromosome
    pub fn from_intervals(chrom_intervals: IndexMap<String, Vec<(u64, u64)>>) -> Self {
        let mut lookup_trees: BTreeMap<String, COITree<usize, u32>> = Default::default();
        for (chrom, intervals) in chrom_intervals.iter() {
            let coi_intervals: Vec<Interval<usize>> = intervals.iter().enumerate()
                .map(|(index, &(start, end))| {
                    Interval::new(start as i32, end as i32, index)
                })
                .collect();
            let coi_tree = COITree::new(&coi_intervals);
            assert!(lookup_trees.insert(chrom.clone(), coi_tree).is_none());
        }

        Self {
            chrom_intervals,
            lookup_trees
        }
    }

    /// Loads a BED file and converts the entries into the lookup trees.
    /// # Arguments
    /// * `bed_fn` - path to the .bed(.gz) file
    /// # Errors
    /// * if the BED file fails to open or parse
    pub fn from_bed(bed_fn: &Path) -> anyhow::Result<Self> {
        let loaded_bed = LoadedBed::preload_bed_file(bed_fn)?;

        let mut chrom_intervals: IndexMap<String, Vec<(u64, u64)>> = Default::default();
        for (chrom, intervals) in loaded_bed.chrom_lookup().iter() {
            let spans: Vec<(u64, u64)> = intervals.iter()
                .map(|i| {
                    // noodles intervals here are 1-based inclusive already
                    let start = i.start().ok_or(anyhow!("Missing start"))?.get() as u64;
                    let end = i.end().ok_or(anyhow!("Missing end"))?.get() as u64;
                    Ok((start, end))
                })
                .collect::<anyhow::Result<_>>()
                .with_context(|| format!("Error while converting intervals for {chrom}:"))?;
            chrom_intervals.insert(chrom.clone(), spans);
        }

        Ok(Self::from_intervals(chrom_intervals))
    }

    /// Returns true if the query span overlaps at least one region.
    /// # Arguments
    /// * `chrom` - the query chromosome
    /// * `start` - first queried position, 1-based
    /// * `end` - last queried position, 1-based inclusive
    pub fn is_overlapping(&self, chrom: &str, start: u64, end: u64) -> bool {
        match self.lookup_trees.get(chrom) {
            Some(coi_tree) => {
                coi_tree.query_count(start as i32, end as i32) > 0
            },
            None => false
        }
    }

    /// Returns the first region overlapping the query span, if any.
    /// Two variant calls continue a haplotype block only when this resolves to
    /// the same region for both.
    /// # Arguments
    /// * `chrom` - the query chromosome
    /// * `start` - first queried position, 1-based
    /// * `end` - last queried position, 1-based inclusive
    pub fn enclosing_interval(&self, chrom: &str, start: u64, end: u64) -> Option<Coordinates> {
        let coi_tree = self.lookup_trees.get(chrom)?;

        let mut hit_indices: Vec<usize> = vec![];
        coi_tree.query(start as i32, end as i32, |node| {
            hit_indices.push(node.metadata);
        });
        let first_index = hit_indices.into_iter().min()?;

        let &(region_start, region_end) = &self.chrom_intervals.get(chrom)?[first_index];
        Some(Coordinates::new(chrom.to_string(), region_start, region_end))
    }

    /// Number of positions in the query span covered by this region set.
    /// Assumes non-overlapping intervals per chromosome.
    /// # Arguments
    /// * `chrom` - the query chromosome
    /// * `start` - first queried position, 1-based
    /// * `end` - last queried position, 1-based inclusive
    pub fn coverage_within(&self, chrom: &str, start: u64, end: u64) -> u64 {
        let coi_tree = match self.lookup_trees.get(chrom) {
            Some(ct) => ct,
            None => return 0
        };

        let mut covered = 0;
        coi_tree.query(start as i32, end as i32, |node| {
            let clipped_start = (node.first as u64).max(start);
            let clipped_end = (node.last as u64).min(end);
            covered += clipped_end - clipped_start + 1;
        });
        covered
    }

    /// The sorted interval spans for a chromosome, 1-based inclusive.
    pub fn intervals(&self, chrom: &str) -> &[(u64, u64)] {
        self.chrom_intervals.get(chrom)
            .map(|spans| spans.as_slice())
            .unwrap_or(&[])
    }

    /// Chromosomes in the order they appeared in the source.
    pub fn chromosomes(&self) -> Vec<&str> {
        self.chrom_intervals.keys().map(|c| c.as_str()).collect()
    }
}

/// Counts how many bases of the total region set are covered by the compared
/// region set, per the provided chromosome dictionary.
/// # Arguments
/// * `total_regions` - the full span of regions that could be compared
/// * `compared_regions` - the regions that actually were compared
/// * `chromosomes` - dictionary order of chromosomes to count over
pub fn count_comparison_bases(
    total_regions: &RegionIndex, compared_regions: &RegionIndex, chromosomes: &[String]
) -> BaseCoverage {
    let mut total = 0;
    let mut compared = 0;
    for chrom in chromosomes.iter() {
        for &(start, end) in total_regions.intervals(chrom) {
            total += end - start + 1;
            compared += compared_regions.coverage_within(chrom, start, end);
        }
    }
    BaseCoverage::new(compared, total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    fn build_index(spans: &[(&str, u64, u64)]) -> RegionIndex {
        let mut chrom_intervals: IndexMap<String, Vec<(u64, u64)>> = Default::default();
        for &(chrom, start, end) in spans.iter() {
            chrom_intervals.entry(chrom.to_string()).or_default().push((start, end));
        }
        RegionIndex::from_intervals(chrom_intervals)
    }

    #[test]
    fn test_overlap_and_enclosing() {
        let index = build_index(&[("chr1", 10, 20), ("chr1", 30, 40)]);

        assert!(index.is_overlapping("chr1", 15, 15));
        assert!(index.is_overlapping("chr1", 20, 30));
        assert!(!index.is_overlapping("chr1", 21, 29));
        assert!(!index.is_overlapping("chr2", 15, 15));

        assert_eq!(
            index.enclosing_interval("chr1", 12, 12),
            Some(Coordinates::new("chr1".to_string(), 10, 20))
        );
        assert_eq!(
            index.enclosing_interval("chr1", 35, 35),
            Some(Coordinates::new("chr1".to_string(), 30, 40))
        );
        assert_eq!(index.enclosing_interval("chr1", 25, 25), None);
    }

    #[test]
    fn test_coverage_within() {
        let index = build_index(&[("chr1", 10, 20), ("chr1", 30, 40)]);
        // fully inside one interval
        assert_eq!(index.coverage_within("chr1", 12, 15), 4);
        // spanning the gap between intervals
        assert_eq!(index.coverage_within("chr1", 15, 35), 6 + 6);
        // no coverage
        assert_eq!(index.coverage_within("chr1", 21, 29), 0);
        assert_eq!(index.coverage_within("chr2", 1, 100), 0);
    }

    /// An 18-base compared region against a 19-base total region.
    #[test]
    fn test_count_comparison_bases() {
        let total = build_index(&[("chr1", 1, 19)]);
        let compared = build_index(&[("chr1", 1, 18)]);
        let chromosomes = vec!["chr1".to_string()];

        let coverage = count_comparison_bases(&total, &compared, &chromosomes);
        assert_eq!(coverage.compared, 18);
        assert_eq!(coverage.total, 19);
        assert_approx_eq!(coverage.percent, 100.0 * 18.0 / 19.0);
    }
}
