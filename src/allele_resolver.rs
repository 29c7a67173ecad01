
use std::collections::BTreeMap;

use crate::data_types::variants::VariantRecord;
use crate::haplotype_index::HaplotypeIndex;

/// Most frequent value in the input, with a deterministic tie-break: tied
/// values are compared as ordinary `Ord` items and the smallest wins.
pub fn highest_count<T: Ord>(values: impl IntoIterator<Item = T>) -> Option<T> {
    let mut frequencies: BTreeMap<T, usize> = Default::default();
    for value in values.into_iter() {
        *frequencies.entry(value).or_default() += 1;
    }

    let max_count = frequencies.values().copied().max()?;
    // ascending key order, so the first max hit is the smallest tied value
    frequencies.into_iter()
        .find(|&(_, count)| count == max_count)
        .map(|(value, _)| value)
}

/// Resolves which allele index of a diploid call lines up with the expected
/// haploid records overlapping it.
///
/// Homozygous calls trivially resolve to index 0. Otherwise each overlapping
/// expected record votes for the index of its allele within the call's allele
/// list; the majority wins, and ties go to the candidate whose allele sequence
/// sorts first (not the smallest index). Returns None when nothing overlaps a
/// heterozygous call, or when no expected allele appears in the call at all.
/// # Arguments
/// * `call` - the called record to resolve
/// * `expected` - the expected records overlapping the call's span
pub fn matching_allele(call: &VariantRecord, expected: &[&VariantRecord]) -> Option<usize> {
    let genotype = call.single_genotype()?;
    if genotype.is_single_allele() {
        return Some(0);
    }
    if expected.is_empty() {
        return None;
    }

    let candidates = expected.iter()
        .filter_map(|e| {
            let expected_allele = e.genotypes().first()?.alleles().first()?;
            let index = genotype.allele_index(expected_allele)?;
            Some((expected_allele.clone(), index))
        });
    highest_count(candidates).map(|(_allele, index)| index)
}

/// Resolves the single allele index applied to every call of a block.
/// Per-call votes are aggregated with the same majority rule; unresolvable
/// calls abstain.
/// # Arguments
/// * `records` - the block's called records, position-ascending
/// * `reference` - the expected haplotype source
pub fn block_allele_index(records: &[VariantRecord], reference: &HaplotypeIndex) -> Option<usize> {
    let votes = records.iter()
        .filter_map(|call| {
            let expected = reference.overlap(call.chrom(), call.start(), call.end());
            matching_allele(call, &expected)
        });
    highest_count(votes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data_types::variants::{Genotype, Zygosity};

    fn call(start: u64, called_alleles: &[&[u8]]) -> VariantRecord {
        let zygosity = if called_alleles.windows(2).all(|w| w[0] == w[1]) {
            Zygosity::HomozygousAlternate
        } else {
            Zygosity::Heterozygous
        };
        let genotype = Genotype::new(
            "sample1".to_string(),
            called_alleles.iter().map(|a| a.to_vec()).collect(),
            false, zygosity
        ).unwrap();
        VariantRecord::new(
            "chr1".to_string(), start, None,
            b"A".to_vec(),
            vec![b"C".to_vec(), b"G".to_vec(), b"T".to_vec()],
            vec![genotype]
        ).unwrap()
    }

    fn expected(start: u64, allele: &[u8]) -> VariantRecord {
        let genotype = Genotype::new(
            "truth".to_string(),
            vec![allele.to_vec()],
            false, Zygosity::HomozygousAlternate
        ).unwrap();
        VariantRecord::new(
            "chr1".to_string(), start, None,
            b"A".to_vec(), vec![allele.to_vec()],
            vec![genotype]
        ).unwrap()
    }

    #[test]
    fn test_highest_count() {
        assert_eq!(highest_count(vec![1usize, 2, 2, 3]), Some(2));
        assert_eq!(highest_count(Vec::<usize>::new()), None);
        // ties resolve to the smallest value
        assert_eq!(highest_count(vec![3usize, 1, 3, 1]), Some(1));
    }

    #[test]
    fn test_single_allele_call() {
        let hom = call(10, &[b"C", b"C"]);
        assert_eq!(matching_allele(&hom, &[]), Some(0));
        let truth = expected(10, b"G");
        assert_eq!(matching_allele(&hom, &[&truth]), Some(0));
    }

    #[test]
    fn test_heterozygous_majority() {
        let het = call(10, &[b"C", b"G"]);
        let t1 = expected(10, b"G");
        let t2 = expected(10, b"G");
        let t3 = expected(10, b"C");
        assert_eq!(matching_allele(&het, &[&t1, &t2, &t3]), Some(1));
    }

    /// With one vote each for index 0 ("C") and index 1 ("A"), the winner is
    /// the candidate whose allele sequence sorts first: "A", index 1.
    #[test]
    fn test_tie_breaks_on_allele_sequence() {
        let het = call(10, &[b"C", b"A"]);
        let t1 = expected(10, b"C");
        let t2 = expected(10, b"A");
        assert_eq!(matching_allele(&het, &[&t1, &t2]), Some(1));
    }

    #[test]
    fn test_unresolvable_calls() {
        let het = call(10, &[b"C", b"G"]);
        // no overlapping expectation
        assert_eq!(matching_allele(&het, &[]), None);
        // expectation allele absent from the call
        let t1 = expected(10, b"T");
        assert_eq!(matching_allele(&het, &[&t1]), None);
    }

    #[test]
    fn test_block_allele_index() {
        let calls = vec![
            call(10, &[b"C", b"G"]),
            call(20, &[b"C", b"G"]),
            call(30, &[b"G", b"C"])
        ];
        let reference = HaplotypeIndex::from_records(vec![
            expected(10, b"G"),
            expected(20, b"G"),
            expected(30, b"G")
        ]);
        // votes: 1, 1, 0 -> majority index 1
        assert_eq!(block_allele_index(&calls, &reference), Some(1));

        let empty_reference = HaplotypeIndex::from_records(vec![]);
        assert_eq!(block_allele_index(&calls, &empty_reference), None);
    }
}
