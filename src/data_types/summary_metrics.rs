
use std::collections::BTreeMap;
use std::ops::AddAssign;

use crate::data_types::comparison::{ComparisonCategory, ComparisonRecord};
use crate::data_types::variants::VariantType;

/// Per-base error weight applied when reducing counts to an accuracy score.
/// Indels disturb more sequence than SNPs and are penalized accordingly.
pub fn error_penalty(variant_type: VariantType) -> u64 {
    match variant_type {
        VariantType::Snv => 1,
        VariantType::Indel => 2,
        VariantType::Unknown => 1
    }
}

/// Accumulated counts from a full comparison run
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ComparisonMetrics {
    /// Nested counts, keyed by classification then variant type
    counts: BTreeMap<ComparisonCategory, BTreeMap<VariantType, u64>>,
    /// Number of haplotype blocks scored
    haplotype_blocks: u64,
    /// Number of heterozygous calls whose unchosen allele was non-reference
    nomatch_het_alt: u64
}

impl AddAssign for ComparisonMetrics {
    // Enables += when merging per-chromosome results
    fn add_assign(&mut self, rhs: Self) {
        for (category, type_counts) in rhs.counts.into_iter() {
            let entry = self.counts.entry(category).or_default();
            for (variant_type, count) in type_counts.into_iter() {
                *entry.entry(variant_type).or_default() += count;
            }
        }
        self.haplotype_blocks += rhs.haplotype_blocks;
        self.nomatch_het_alt += rhs.nomatch_het_alt;
    }
}

impl ComparisonMetrics {
    /// Folds a single comparison result into the counts.
    pub fn add_comparison(&mut self, comparison: &ComparisonRecord) {
        let entry = self.counts.entry(comparison.category()).or_default();
        *entry.entry(comparison.variant_type()).or_default() += 1;
        if comparison.nomatch_het_alt() {
            self.nomatch_het_alt += 1;
        }
    }

    /// Bumps the scored haplotype block total.
    pub fn increment_blocks(&mut self) {
        self.haplotype_blocks += 1;
    }

    /// Count for one (classification, variant type) cell.
    pub fn count(&self, category: ComparisonCategory, variant_type: VariantType) -> u64 {
        self.counts.get(&category)
            .and_then(|tc| tc.get(&variant_type))
            .copied()
            .unwrap_or(0)
    }

    /// Total count for a classification across all variant types.
    pub fn category_total(&self, category: ComparisonCategory) -> u64 {
        self.counts.get(&category)
            .map(|tc| tc.values().sum())
            .unwrap_or(0)
    }

    /// Total number of comparison records folded in.
    pub fn total_comparisons(&self) -> u64 {
        self.counts.values()
            .flat_map(|tc| tc.values())
            .sum()
    }

    /// Reduces the counts in the caller-selected error categories to a single
    /// accuracy percentage over the number of compared bases:
    /// `100 * (1 - sum(count * penalty) / compared_bases)`.
    /// Returns None when no bases were compared.
    /// # Arguments
    /// * `compared_bases` - denominator, from `count_comparison_bases`
    /// * `error_categories` - which classifications count as errors
    pub fn calc_accuracy(&self, compared_bases: u64, error_categories: &[ComparisonCategory]) -> Option<f64> {
        if compared_bases == 0 {
            return None;
        }

        let error_sum: u64 = error_categories.iter()
            .filter_map(|cat| self.counts.get(cat))
            .flat_map(|tc| tc.iter())
            .map(|(&variant_type, &count)| count * error_penalty(variant_type))
            .sum();
        Some(100.0 * (1.0 - error_sum as f64 / compared_bases as f64))
    }

    /// Iterates all populated (classification, variant type, count) cells in order.
    pub fn iter_counts(&self) -> impl Iterator<Item = (ComparisonCategory, VariantType, u64)> + '_ {
        self.counts.iter()
            .flat_map(|(&category, tc)| {
                tc.iter().map(move |(&variant_type, &count)| (category, variant_type, count))
            })
    }

    // getters
    pub fn haplotype_blocks(&self) -> u64 {
        self.haplotype_blocks
    }

    pub fn nomatch_het_alt(&self) -> u64 {
        self.nomatch_het_alt
    }
}

/// Result of comparing the available region span against the scored span
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BaseCoverage {
    /// Percent of total bases that were compared
    pub percent: f64,
    /// Number of bases inside both region sets
    pub compared: u64,
    /// Number of bases in the total region set
    pub total: u64
}

impl BaseCoverage {
    /// Constructor from raw counts; percent is derived.
    pub fn new(compared: u64, total: u64) -> Self {
        let percent = if total > 0 {
            100.0 * compared as f64 / total as f64
        } else {
            0.0
        };
        Self {
            percent,
            compared,
            total
        }
    }
}

impl AddAssign for BaseCoverage {
    // Enables += when merging per-chromosome coverage
    fn add_assign(&mut self, rhs: Self) {
        *self = Self::new(self.compared + rhs.compared, self.total + rhs.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    use crate::data_types::variants::VariantRecord;

    fn comparison(category: ComparisonCategory, ref_allele: &[u8], alt: &[u8]) -> ComparisonRecord {
        let record = VariantRecord::new(
            "chr1".to_string(), 10, None,
            ref_allele.to_vec(), vec![alt.to_vec()], vec![]
        ).unwrap();
        ComparisonRecord::new(category, Some(record), None, false, vec![])
    }

    #[test]
    fn test_count_accumulation() {
        let mut metrics = ComparisonMetrics::default();
        metrics.add_comparison(&comparison(ComparisonCategory::Concordant, b"A", b"C"));
        metrics.add_comparison(&comparison(ComparisonCategory::Concordant, b"A", b"C"));
        metrics.add_comparison(&comparison(ComparisonCategory::Discordant, b"ACT", b"A"));
        metrics.increment_blocks();

        assert_eq!(metrics.count(ComparisonCategory::Concordant, VariantType::Snv), 2);
        assert_eq!(metrics.count(ComparisonCategory::Discordant, VariantType::Indel), 1);
        assert_eq!(metrics.count(ComparisonCategory::Discordant, VariantType::Snv), 0);
        assert_eq!(metrics.category_total(ComparisonCategory::Concordant), 2);
        assert_eq!(metrics.total_comparisons(), 3);
        assert_eq!(metrics.haplotype_blocks(), 1);
    }

    #[test]
    fn test_add_assign() {
        let mut first = ComparisonMetrics::default();
        first.add_comparison(&comparison(ComparisonCategory::Concordant, b"A", b"C"));
        first.increment_blocks();

        let mut second = ComparisonMetrics::default();
        second.add_comparison(&comparison(ComparisonCategory::Concordant, b"A", b"C"));
        second.add_comparison(&comparison(ComparisonCategory::PhasingError, b"A", b"C"));
        second.increment_blocks();

        first += second;
        assert_eq!(first.count(ComparisonCategory::Concordant, VariantType::Snv), 2);
        assert_eq!(first.count(ComparisonCategory::PhasingError, VariantType::Snv), 1);
        assert_eq!(first.haplotype_blocks(), 2);
    }

    /// Locks the penalty-weighted accuracy formula: one snp + one indel in each
    /// of two error categories over 10 compared bases must score 40.0.
    #[test]
    fn test_calc_accuracy_weighted_penalties() {
        let mut metrics = ComparisonMetrics::default();
        metrics.add_comparison(&comparison(ComparisonCategory::Discordant, b"ACT", b"A"));
        metrics.add_comparison(&comparison(ComparisonCategory::Discordant, b"A", b"C"));
        metrics.add_comparison(&comparison(ComparisonCategory::PhasingError, b"ACT", b"A"));
        metrics.add_comparison(&comparison(ComparisonCategory::PhasingError, b"A", b"C"));

        let error_categories = [ComparisonCategory::Discordant, ComparisonCategory::PhasingError];
        let accuracy = metrics.calc_accuracy(10, &error_categories).unwrap();
        assert_approx_eq!(accuracy, 40.0);

        // concordant counts never contribute to the error sum
        metrics.add_comparison(&comparison(ComparisonCategory::Concordant, b"A", b"C"));
        let accuracy = metrics.calc_accuracy(10, &error_categories).unwrap();
        assert_approx_eq!(accuracy, 40.0);

        assert!(metrics.calc_accuracy(0, &error_categories).is_none());
    }

    #[test]
    fn test_base_coverage() {
        let coverage = BaseCoverage::new(18, 19);
        assert_eq!(coverage.compared, 18);
        assert_eq!(coverage.total, 19);
        assert_approx_eq!(coverage.percent, 100.0 * 18.0 / 19.0);

        let mut merged = BaseCoverage::new(5, 10);
        merged += BaseCoverage::new(5, 10);
        assert_eq!(merged.compared, 10);
        assert_eq!(merged.total, 20);
        assert_approx_eq!(merged.percent, 50.0);
    }
}
