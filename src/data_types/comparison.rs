
use crate::data_types::variants::{VariantRecord, VariantType};

/// Classification assigned to each scored position
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, strum_macros::AsRefStr, strum_macros::Display)]
pub enum ComparisonCategory {
    /// The called allele matches the expected haplotype allele
    #[strum(serialize = "concordant")]
    Concordant=0,
    /// Both the call and the expectation agree the site is reference
    #[strum(serialize = "ref-concordant")]
    RefConcordant,
    /// The called and expected alleles disagree, or one side is absent
    #[strum(serialize = "discordant")]
    Discordant,
    /// Grade-only: an expected variant with no competing call at all
    #[strum(serialize = "discordant-missing")]
    DiscordantMissing,
    /// The expected allele was called, but on the wrong haplotype copy
    #[strum(serialize = "phasing-error")]
    PhasingError
}

/// All comparison categories in a stable reporting order
pub const ALL_CATEGORIES: [ComparisonCategory; 5] = [
    ComparisonCategory::Concordant,
    ComparisonCategory::RefConcordant,
    ComparisonCategory::Discordant,
    ComparisonCategory::DiscordantMissing,
    ComparisonCategory::PhasingError
];

#[derive(thiserror::Error, Debug)]
pub enum ComparisonError {
    #[error("record {id:?} at {chrom}:{position} must have exactly one genotype, found {genotype_count}")]
    MalformedInput {
        chrom: String,
        position: u64,
        id: String,
        genotype_count: usize
    },
    #[error("{approach} scoring requires exactly {expected} one-sample inputs, found {found}")]
    InconsistentModeArity {
        approach: String,
        expected: usize,
        found: usize
    }
}

/// The immutable per-position result of scoring one called/expected pair.
/// Produced once by the region scorer and never mutated afterward; the
/// grade-mode conversion builds a replacement value instead.
#[derive(Clone, Debug, PartialEq)]
pub struct ComparisonRecord {
    /// The assigned classification
    category: ComparisonCategory,
    /// Joint variant type of the pair
    variant_type: VariantType,
    /// True for a heterozygous call whose unchosen allele is non-reference
    nomatch_het_alt: bool,
    /// First scored position, 1-based
    start: u64,
    /// Last position covered by the called (or expected) record
    end: u64,
    /// Last position covered by the expected record, when one exists
    end_ref: Option<u64>,
    /// Reference positions removed by a matched deletion call
    deleted_positions: Vec<u64>,
    /// The called record; None when an expected variant had no call
    call: Option<VariantRecord>,
    /// The expected record; None for extra calls
    expected: Option<VariantRecord>
}

impl ComparisonRecord {
    /// Builds a comparison result from the scored pair.
    /// At least one of `call`/`expected` is always present; coordinates come
    /// from the called record when available, otherwise from the expected one.
    /// # Arguments
    /// * `category` - the assigned classification
    /// * `call` - the called record, if any
    /// * `expected` - the expected reference record, if any
    /// * `nomatch_het_alt` - the mismatched-heterozygous-alternate flag
    /// * `deleted_positions` - positions masked by a matched deletion call
    pub fn new(
        category: ComparisonCategory,
        call: Option<VariantRecord>,
        expected: Option<VariantRecord>,
        nomatch_het_alt: bool,
        deleted_positions: Vec<u64>
    ) -> Self {
        // scoring never produces a record without at least one side
        assert!(call.is_some() || expected.is_some());

        let anchor = call.as_ref().or(expected.as_ref()).unwrap();
        let start = anchor.start();
        let end = anchor.end();
        let end_ref = expected.as_ref().map(|e| e.end());
        let variant_type = comparison_variant_type(call.as_ref(), expected.as_ref());

        Self {
            category,
            variant_type,
            nomatch_het_alt,
            start,
            end,
            end_ref,
            deleted_positions,
            call,
            expected
        }
    }

    /// Returns a copy of this record carrying a different category.
    pub fn with_category(&self, category: ComparisonCategory) -> Self {
        Self {
            category,
            ..self.clone()
        }
    }

    /// The chromosome of the scored position, from whichever side is present.
    pub fn chrom(&self) -> &str {
        self.call.as_ref()
            .or(self.expected.as_ref())
            .map(|r| r.chrom())
            .unwrap_or("")
    }

    // getters
    pub fn category(&self) -> ComparisonCategory {
        self.category
    }

    pub fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    pub fn nomatch_het_alt(&self) -> bool {
        self.nomatch_het_alt
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn end_ref(&self) -> Option<u64> {
        self.end_ref
    }

    pub fn deleted_positions(&self) -> &[u64] {
        &self.deleted_positions
    }

    pub fn call(&self) -> Option<&VariantRecord> {
        self.call.as_ref()
    }

    pub fn expected(&self) -> Option<&VariantRecord> {
        self.expected.as_ref()
    }
}

/// Joint variant-type classification for a scored pair.
/// A multi-base allele on either present side makes the pair an indel; any
/// SNV on a present side makes it a SNP. Reference-assertion records carry no
/// ALT and contribute nothing, so a SNP call against one still counts as snp.
pub fn comparison_variant_type(call: Option<&VariantRecord>, expected: Option<&VariantRecord>) -> VariantType {
    let present: Vec<&VariantRecord> = [call, expected].into_iter().flatten().collect();

    if present.iter().any(|r| r.has_multibase_allele() || r.variant_type() == VariantType::Indel) {
        VariantType::Indel
    } else if present.iter().any(|r| r.variant_type() == VariantType::Snv) {
        VariantType::Snv
    } else {
        VariantType::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snv(start: u64, ref_allele: &[u8], alt: &[u8]) -> VariantRecord {
        VariantRecord::new(
            "chr1".to_string(), start, None,
            ref_allele.to_vec(), vec![alt.to_vec()], vec![]
        ).unwrap()
    }

    #[test]
    fn test_comparison_variant_type() {
        let call_snv = snv(10, b"A", b"C");
        let expected_snv = snv(10, b"A", b"G");
        let call_del = snv(10, b"ACG", b"A");
        // a reference assertion has no ALT alleles
        let ref_assertion = VariantRecord::new(
            "chr1".to_string(), 10, None,
            b"A".to_vec(), vec![], vec![]
        ).unwrap();

        assert_eq!(comparison_variant_type(Some(&call_snv), Some(&expected_snv)), VariantType::Snv);
        assert_eq!(comparison_variant_type(Some(&call_del), Some(&expected_snv)), VariantType::Indel);
        assert_eq!(comparison_variant_type(Some(&call_del), None), VariantType::Indel);
        assert_eq!(comparison_variant_type(None, Some(&expected_snv)), VariantType::Snv);
        assert_eq!(comparison_variant_type(Some(&call_snv), Some(&ref_assertion)), VariantType::Snv);
        assert_eq!(comparison_variant_type(None, None), VariantType::Unknown);
    }

    #[test]
    fn test_record_coordinates() {
        let call = snv(10, b"A", b"C");
        let expected = snv(10, b"A", b"C");
        let record = ComparisonRecord::new(
            ComparisonCategory::Concordant,
            Some(call), Some(expected),
            false, vec![]
        );
        assert_eq!(record.start(), 10);
        assert_eq!(record.end(), 10);
        assert_eq!(record.end_ref(), Some(10));
        assert_eq!(record.category(), ComparisonCategory::Concordant);

        // expected-only records anchor on the expected coordinates
        let missing = ComparisonRecord::new(
            ComparisonCategory::Discordant,
            None, Some(snv(25, b"ACT", b"A")),
            false, vec![]
        );
        assert_eq!(missing.start(), 25);
        assert_eq!(missing.end(), 27);
        assert_eq!(missing.end_ref(), Some(27));
        assert!(missing.call().is_none());
    }

    #[test]
    fn test_with_category() {
        let record = ComparisonRecord::new(
            ComparisonCategory::Discordant,
            None, Some(snv(10, b"A", b"C")),
            false, vec![]
        );
        let regraded = record.with_category(ComparisonCategory::DiscordantMissing);
        assert_eq!(regraded.category(), ComparisonCategory::DiscordantMissing);
        assert_eq!(regraded.start(), record.start());
        assert_eq!(regraded.expected(), record.expected());
    }

    #[test]
    fn test_category_strings() {
        assert_eq!(ComparisonCategory::Concordant.as_ref(), "concordant");
        assert_eq!(ComparisonCategory::RefConcordant.as_ref(), "ref-concordant");
        assert_eq!(ComparisonCategory::DiscordantMissing.as_ref(), "discordant-missing");
        assert_eq!(ComparisonCategory::PhasingError.to_string(), "phasing-error");
    }
}
