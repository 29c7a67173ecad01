
use log::trace;
use rustc_hash::FxHashSet;

use crate::block_gen::HaplotypeBlock;
use crate::call_index::CallIndex;
use crate::data_types::comparison::{ComparisonCategory, ComparisonRecord};
use crate::data_types::variants::{VariantRecord, Zygosity};
use crate::haplotype_index::HaplotypeIndex;

/// Scores one haplotype block against the expected haplotype records that
/// fall inside its span.
///
/// Expected records starting before the block's first call belong to the
/// previous block (or gap) and are excluded so nothing is counted twice.
/// Matched calls are removed from the working index; whatever remains after
/// the expected sweep is reported as extra calls, unless a matched deletion
/// already removed the underlying reference positions.
/// # Arguments
/// * `block` - the phase-linked calls to score
/// * `allele_index` - the haplotype allele index resolved for the whole block
/// * `reference` - the expected haplotype source
pub fn score_phased_region(
    block: &HaplotypeBlock,
    allele_index: Option<usize>,
    reference: &HaplotypeIndex
) -> Vec<ComparisonRecord> {
    let chrom = block.chrom().to_string();
    let mut call_index = CallIndex::from_records(chrom.clone(), block.records().to_vec());
    // blocks are non-empty, so the span always exists
    let (min_start, max_end) = call_index.span().unwrap_or((0, 0));

    let expected_records: Vec<VariantRecord> = reference.overlap(&chrom, min_start, max_end)
        .into_iter()
        .filter(|e| e.start() >= min_start)
        .cloned()
        .collect();
    trace!("Block {chrom}:{min_start}-{max_end} has {} expected records", expected_records.len());

    let mut deleted_positions: FxHashSet<u64> = Default::default();
    let mut comparisons: Vec<ComparisonRecord> = vec![];

    for expected in expected_records.into_iter() {
        // calls must sit at the exact expected position to pair up
        let matched_call = call_index.overlap(&chrom, expected.start(), expected.end())
            .into_iter()
            .find(|c| c.start() == expected.start())
            .cloned();

        match matched_call {
            None => {
                comparisons.push(ComparisonRecord::new(
                    ComparisonCategory::Discordant,
                    None, Some(expected),
                    false, vec![]
                ));
            },
            Some(call) => {
                let category = classify_pair(&call, &expected, allele_index);
                let nomatch_flag = nomatch_het_alt(&call, allele_index);

                // a matched deletion masks its reference span from the extra-call sweep
                let deleted: Vec<u64> = if call.is_deletion() {
                    call.spanned_positions().collect()
                } else {
                    vec![]
                };
                deleted_positions.extend(deleted.iter().copied());

                call_index.remove(&chrom, call.start(), call.end());
                comparisons.push(ComparisonRecord::new(
                    category,
                    Some(call), Some(expected),
                    nomatch_flag, deleted
                ));
            }
        }
    }

    // whatever survived the sweep was called without any expectation
    let leftovers: Vec<VariantRecord> = call_index.all_remaining()
        .into_iter()
        .cloned()
        .collect();
    for call in leftovers.into_iter() {
        let fully_masked = call.spanned_positions().all(|p| deleted_positions.contains(&p));
        if fully_masked {
            trace!("Suppressing extra call at {chrom}:{} inside a deleted span", call.start());
            continue;
        }

        let nomatch_flag = nomatch_het_alt(&call, allele_index);
        comparisons.push(ComparisonRecord::new(
            ComparisonCategory::Discordant,
            Some(call), None,
            nomatch_flag, vec![]
        ));
    }

    comparisons.sort_by_key(|c| (c.start(), c.end()));
    comparisons
}

/// Classifies one matched (call, expected) pair at the resolved allele index.
fn classify_pair(
    call: &VariantRecord,
    expected: &VariantRecord,
    allele_index: Option<usize>
) -> ComparisonCategory {
    let genotype = match call.single_genotype() {
        Some(g) => g,
        None => return ComparisonCategory::Discordant
    };

    // an unresolved or out-of-range index means there is no usable call
    let called_allele = match allele_index.and_then(|i| genotype.alleles().get(i)) {
        Some(allele) => allele.as_slice(),
        None => return ComparisonCategory::Discordant
    };

    let expected_allele: Option<&[u8]> = expected.genotypes().first()
        .and_then(|g| g.alleles().first())
        .map(|a| a.as_slice());

    if called_allele == call.reference_allele() {
        let expected_is_ref = match expected_allele {
            None => true,
            Some(ea) => ea == expected.reference_allele()
        };
        if expected_is_ref {
            return ComparisonCategory::RefConcordant;
        }
    }

    match expected_allele {
        None => ComparisonCategory::Discordant,
        Some(ea) => {
            if called_allele == ea {
                ComparisonCategory::Concordant
            } else if genotype.alleles().iter().any(|a| a.as_slice() == ea) {
                // the right allele was called, just on the other haplotype copy
                ComparisonCategory::PhasingError
            } else {
                ComparisonCategory::Discordant
            }
        }
    }
}

/// True for a heterozygous call where an allele other than the chosen one is
/// non-reference; these sites carry alternate evidence the haploid comparison
/// cannot see.
fn nomatch_het_alt(call: &VariantRecord, allele_index: Option<usize>) -> bool {
    let genotype = match call.single_genotype() {
        Some(g) => g,
        None => return false
    };
    if genotype.zygosity() != Zygosity::Heterozygous {
        return false;
    }

    let chosen = allele_index.unwrap_or(0);
    genotype.alleles().iter().enumerate()
        .any(|(index, allele)| index != chosen && allele.as_slice() != call.reference_allele())
}
