
use std::collections::BTreeMap;

/// Variant types that scoring distinguishes between
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord, strum_macros::AsRefStr, strum_macros::Display)]
pub enum VariantType {
    /// REF and all ALTs are length = 1
    #[strum(serialize = "snp")]
    Snv=0,
    /// Any allele with length != 1; includes complex substitutions
    #[strum(serialize = "indel")]
    Indel,
    /// Symbolic alleles, missing ALTs, or anything else unhandled
    #[strum(serialize = "unknown")]
    Unknown // make sure Unknown is always the last one in the list
}

/// Zygosity of a single diploid call
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Zygosity {
    HomozygousReference=0,
    Heterozygous,
    HomozygousAlternate,
    Unknown // make sure Unknown is always the last one in the list
}

#[derive(thiserror::Error, Debug)]
pub enum VariantError {
    #[error("reference allele is empty")]
    EmptyRefAllele,
    #[error("alternate allele {index} is empty")]
    EmptyAltAllele { index: usize },
    #[error("genotype for {sample:?} has no called alleles")]
    EmptyGenotype { sample: String },
    #[error("genotype allele {index} for {sample:?} is empty")]
    EmptyGenotypeAllele { sample: String, index: usize }
}

/// The called allele(s) for one sample at one variant position.
/// Alleles are stored as the full sequence strings in ploidy order, because
/// downstream allele resolution works on list indices.
#[derive(Clone, Debug, PartialEq)]
pub struct Genotype {
    /// Name of the sample this genotype belongs to
    sample: String,
    /// Called allele sequences, length = ploidy (normally 2, 1 for haploid)
    alleles: Vec<Vec<u8>>,
    /// True if this call is explicitly phase-linked to the previous variant
    phased: bool,
    /// Zygosity classification of the call
    zygosity: Zygosity,
    /// Numeric FORMAT attributes (GQ, DP, ...) when available
    attributes: BTreeMap<String, f64>
}

impl Genotype {
    /// Constructor with basic validity checks.
    /// # Arguments
    /// * `sample` - the sample name
    /// * `alleles` - called allele sequences in ploidy order
    /// * `phased` - true if the call is phase-linked to the previous variant
    /// * `zygosity` - zygosity classification
    /// # Errors
    /// * if no alleles are provided, or any allele is an empty sequence
    pub fn new(sample: String, alleles: Vec<Vec<u8>>, phased: bool, zygosity: Zygosity) -> Result<Self, VariantError> {
        if alleles.is_empty() {
            return Err(VariantError::EmptyGenotype { sample });
        }
        for (index, allele) in alleles.iter().enumerate() {
            if allele.is_empty() {
                return Err(VariantError::EmptyGenotypeAllele { sample, index });
            }
        }

        Ok(Self {
            sample,
            alleles,
            phased,
            zygosity,
            attributes: Default::default()
        })
    }

    /// Attaches a numeric attribute, overwriting any previous value for the key.
    pub fn set_attribute(&mut self, key: String, value: f64) {
        self.attributes.insert(key, value);
    }

    /// Number of distinct allele sequences in the call; 1 for homozygous calls.
    pub fn distinct_allele_count(&self) -> usize {
        let mut seen: Vec<&[u8]> = vec![];
        for allele in self.alleles.iter() {
            if !seen.contains(&allele.as_slice()) {
                seen.push(allele);
            }
        }
        seen.len()
    }

    /// True if the call reduces to a single allele sequence.
    pub fn is_single_allele(&self) -> bool {
        self.distinct_allele_count() == 1
    }

    /// Finds the first index of the given allele sequence in the call, if present.
    pub fn allele_index(&self, allele: &[u8]) -> Option<usize> {
        self.alleles.iter().position(|a| a == allele)
    }

    // getters
    pub fn sample(&self) -> &str {
        &self.sample
    }

    pub fn alleles(&self) -> &[Vec<u8>] {
        &self.alleles
    }

    pub fn is_phased(&self) -> bool {
        self.phased
    }

    pub fn zygosity(&self) -> Zygosity {
        self.zygosity
    }

    pub fn attributes(&self) -> &BTreeMap<String, f64> {
        &self.attributes
    }
}

/// One called genetic difference (or reference assertion) at a genomic position.
/// Coordinates are 1-based inclusive; `end` always equals `start + ref_len - 1`.
#[derive(Clone, Debug, PartialEq)]
pub struct VariantRecord {
    /// The chromosome / contig name
    chrom: String,
    /// First reference position covered, 1-based
    start: u64,
    /// Last reference position covered, 1-based inclusive
    end: u64,
    /// Optional external identifier (e.g. rsID)
    id: Option<String>,
    /// The reference allele sequence
    ref_allele: Vec<u8>,
    /// Ordered alternate allele sequences
    alt_alleles: Vec<Vec<u8>>,
    /// The type of variant represented by this entry
    variant_type: VariantType,
    /// Per-sample genotypes; scoring requires exactly one
    genotypes: Vec<Genotype>
}

impl VariantRecord {
    /// Constructor; derives `end` and the variant type from the alleles.
    /// # Arguments
    /// * `chrom` - the chromosome name
    /// * `start` - 1-based position of the first reference base
    /// * `id` - optional external identifier
    /// * `ref_allele` - the reference allele sequence
    /// * `alt_alleles` - ordered alternate allele sequences
    /// * `genotypes` - per-sample genotypes
    /// # Errors
    /// * if the reference allele or any alternate allele is empty
    pub fn new(
        chrom: String, start: u64, id: Option<String>,
        ref_allele: Vec<u8>, alt_alleles: Vec<Vec<u8>>,
        genotypes: Vec<Genotype>
    ) -> Result<Self, VariantError> {
        if ref_allele.is_empty() {
            return Err(VariantError::EmptyRefAllele);
        }
        for (index, alt) in alt_alleles.iter().enumerate() {
            if alt.is_empty() {
                return Err(VariantError::EmptyAltAllele { index });
            }
        }

        let end = start + ref_allele.len() as u64 - 1;
        let variant_type = derive_variant_type(&ref_allele, &alt_alleles);
        Ok(Self {
            chrom,
            start,
            end,
            id,
            ref_allele,
            alt_alleles,
            variant_type,
            genotypes
        })
    }

    /// Returns the single genotype if exactly one sample is present.
    pub fn single_genotype(&self) -> Option<&Genotype> {
        if self.genotypes.len() == 1 {
            self.genotypes.first()
        } else {
            None
        }
    }

    /// True if this record removes reference sequence: a multi-base REF with an indel type.
    pub fn is_deletion(&self) -> bool {
        self.variant_type == VariantType::Indel && self.ref_allele.len() > 1
    }

    /// The genomic positions spanned by the reference allele.
    pub fn spanned_positions(&self) -> impl Iterator<Item = u64> {
        self.start..=self.end
    }

    /// True if this record and `other` share at least one reference position.
    pub fn overlaps(&self, other: &VariantRecord) -> bool {
        self.chrom == other.chrom && self.start <= other.end && other.start <= self.end
    }

    /// True if any allele (REF or ALT) is longer than a single base.
    pub fn has_multibase_allele(&self) -> bool {
        self.ref_allele.len() > 1 || self.alt_alleles.iter().any(|a| a.len() > 1)
    }

    // getters
    pub fn chrom(&self) -> &str {
        &self.chrom
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn reference_allele(&self) -> &[u8] {
        &self.ref_allele
    }

    pub fn alternate_alleles(&self) -> &[Vec<u8>] {
        &self.alt_alleles
    }

    pub fn variant_type(&self) -> VariantType {
        self.variant_type
    }

    pub fn genotypes(&self) -> &[Genotype] {
        &self.genotypes
    }
}

/// Classifies a record from its allele shapes.
/// Symbolic alleles (e.g. `<DEL>`, breakends) and ALT-free records are Unknown.
fn derive_variant_type(ref_allele: &[u8], alt_alleles: &[Vec<u8>]) -> VariantType {
    if alt_alleles.is_empty() {
        return VariantType::Unknown;
    }

    let is_symbolic = |allele: &[u8]| {
        allele.iter().any(|&b| b == b'<' || b == b'[' || b == b']' || b == b'*')
    };
    if is_symbolic(ref_allele) || alt_alleles.iter().any(|a| is_symbolic(a)) {
        return VariantType::Unknown;
    }

    if ref_allele.len() == 1 && alt_alleles.iter().all(|a| a.len() == 1) {
        VariantType::Snv
    } else {
        VariantType::Indel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Test shorthand for a one-sample genotype
    fn genotype(alleles: &[&[u8]], phased: bool, zygosity: Zygosity) -> Genotype {
        Genotype::new(
            "sample1".to_string(),
            alleles.iter().map(|a| a.to_vec()).collect(),
            phased, zygosity
        ).unwrap()
    }

    #[test]
    fn test_basic_snv() {
        let record = VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"A".to_vec(), vec![b"C".to_vec()],
            vec![genotype(&[b"A", b"C"], false, Zygosity::Heterozygous)]
        ).unwrap();
        assert_eq!(record.variant_type(), VariantType::Snv);
        assert_eq!(record.start(), 100);
        assert_eq!(record.end(), 100);
        assert!(!record.is_deletion());
        assert!(!record.has_multibase_allele());
    }

    #[test]
    fn test_basic_deletion() {
        let record = VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"AGT".to_vec(), vec![b"A".to_vec()],
            vec![genotype(&[b"A", b"A"], false, Zygosity::HomozygousAlternate)]
        ).unwrap();
        assert_eq!(record.variant_type(), VariantType::Indel);
        assert_eq!(record.end(), 102);
        assert!(record.is_deletion());
        assert_eq!(record.spanned_positions().collect::<Vec<u64>>(), vec![100, 101, 102]);
    }

    #[test]
    fn test_symbolic_is_unknown() {
        let record = VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"A".to_vec(), vec![b"<DEL>".to_vec()],
            vec![]
        ).unwrap();
        assert_eq!(record.variant_type(), VariantType::Unknown);
    }

    #[test]
    fn test_overlaps() {
        let del = VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"AGTC".to_vec(), vec![b"A".to_vec()], vec![]
        ).unwrap();
        let snv = VariantRecord::new(
            "chr1".to_string(), 103, None,
            b"C".to_vec(), vec![b"T".to_vec()], vec![]
        ).unwrap();
        let later = VariantRecord::new(
            "chr1".to_string(), 104, None,
            b"G".to_vec(), vec![b"T".to_vec()], vec![]
        ).unwrap();

        assert!(del.overlaps(&snv));
        assert!(snv.overlaps(&del));
        assert!(!del.overlaps(&later));
    }

    #[test]
    fn test_genotype_helpers() {
        let het = genotype(&[b"A", b"C"], false, Zygosity::Heterozygous);
        assert_eq!(het.distinct_allele_count(), 2);
        assert!(!het.is_single_allele());
        assert_eq!(het.allele_index(b"A"), Some(0));
        assert_eq!(het.allele_index(b"C"), Some(1));
        assert_eq!(het.allele_index(b"G"), None);

        let hom = genotype(&[b"C", b"C"], false, Zygosity::HomozygousAlternate);
        assert_eq!(hom.distinct_allele_count(), 1);
        assert!(hom.is_single_allele());
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"".to_vec(), vec![b"A".to_vec()], vec![]
        ).is_err());
        assert!(VariantRecord::new(
            "chr1".to_string(), 100, None,
            b"A".to_vec(), vec![b"".to_vec()], vec![]
        ).is_err());
        assert!(Genotype::new("s".to_string(), vec![], false, Zygosity::Unknown).is_err());
    }
}
