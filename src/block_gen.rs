
use crate::data_types::comparison::ComparisonError;
use crate::data_types::coordinates::Coordinates;
use crate::data_types::variants::VariantRecord;
use crate::parsing::region_index::RegionIndex;

/// An ordered, non-empty run of phase-linked variant calls on one chromosome.
#[derive(Clone, Debug, PartialEq)]
pub struct HaplotypeBlock {
    /// The block's records, position-ascending
    records: Vec<VariantRecord>
}

impl HaplotypeBlock {
    /// Constructor.
    /// # Arguments
    /// * `records` - the block records, position-ascending, same chromosome
    /// # Panics
    /// * if `records` is empty; the partitioner never emits an empty block
    pub fn new(records: Vec<VariantRecord>) -> Self {
        assert!(!records.is_empty());
        Self {
            records
        }
    }

    /// The full genomic span of the block. A long deletion early in the block
    /// can extend past the start of later records, so the end is a max scan.
    pub fn coordinates(&self) -> Coordinates {
        let chrom = self.chrom().to_string();
        let start = self.records[0].start();
        let end = self.records.iter().map(|r| r.end()).max().unwrap_or(start);
        Coordinates::new(chrom, start, end)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        // blocks are non-empty by construction
        false
    }

    // getters
    pub fn chrom(&self) -> &str {
        self.records[0].chrom()
    }

    pub fn records(&self) -> &[VariantRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<VariantRecord> {
        self.records
    }
}

/// Fails fast on any record that has not been reduced to a single sample.
pub fn check_single_sample(record: &VariantRecord) -> Result<(), ComparisonError> {
    let genotype_count = record.genotypes().len();
    if genotype_count == 1 {
        Ok(())
    } else {
        Err(ComparisonError::MalformedInput {
            chrom: record.chrom().to_string(),
            position: record.start(),
            id: record.id().unwrap_or(".").to_string(),
            genotype_count
        })
    }
}

/// Returns true if `next` extends the block ending at `prev`.
/// Requires the same chromosome and, when a region source is configured, the
/// same enclosing region of interest; beyond that, any of a single-allele
/// call, an explicit phased flag, or genomic overlap with `prev` continues
/// the block.
/// # Arguments
/// * `prev` - the last record of the current block
/// * `next` - the candidate record
/// * `regions` - optional region-of-interest source
pub fn continues_block(prev: &VariantRecord, next: &VariantRecord, regions: Option<&RegionIndex>) -> bool {
    if prev.chrom() != next.chrom() {
        return false;
    }

    if let Some(region_index) = regions {
        let prev_interval = region_index.enclosing_interval(prev.chrom(), prev.start(), prev.end());
        let next_interval = region_index.enclosing_interval(next.chrom(), next.start(), next.end());
        if prev_interval != next_interval {
            return false;
        }
    }

    let genotype_link = match next.single_genotype() {
        Some(genotype) => genotype.is_single_allele() || genotype.is_phased(),
        None => false
    };
    genotype_link || prev.overlaps(next)
}

/// Lazily partitions an ordered single-sample call stream into maximal
/// haplotype blocks. Emits a `MalformedInput` error for any record carrying
/// more than one genotype, before the offending block is built.
pub struct BlockIterator<'a, I: Iterator<Item = VariantRecord>> {
    /// The ordered record source
    source: I,
    /// Optional region source bounding block continuity
    regions: Option<&'a RegionIndex>,
    /// First record of the next block, carried between `next` calls
    pending: Option<VariantRecord>,
    /// Set after an error or source exhaustion
    finished: bool
}

impl<'a, I: Iterator<Item = VariantRecord>> BlockIterator<'a, I> {
    /// Creates the partitioner over an ordered record stream.
    /// # Arguments
    /// * `source` - ordered, same-sample variant records
    /// * `regions` - optional region-of-interest source for the continuity rule
    pub fn new(source: I, regions: Option<&'a RegionIndex>) -> Self {
        Self {
            source,
            regions,
            pending: None,
            finished: false
        }
    }
}

impl<'a, I: Iterator<Item = VariantRecord>> Iterator for BlockIterator<'a, I> {
    type Item = Result<HaplotypeBlock, ComparisonError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        // the first record of this block is either carried over or freshly read
        let first = match self.pending.take() {
            Some(record) => record,
            None => match self.source.next() {
                Some(record) => {
                    if let Err(e) = check_single_sample(&record) {
                        self.finished = true;
                        return Some(Err(e));
                    }
                    record
                },
                None => {
                    self.finished = true;
                    return None;
                }
            }
        };

        let mut block_records = vec![first];
        for record in self.source.by_ref() {
            if let Err(e) = check_single_sample(&record) {
                self.finished = true;
                return Some(Err(e));
            }

            if continues_block(block_records.last().unwrap(), &record, self.regions) {
                block_records.push(record);
            } else {
                self.pending = Some(record);
                break;
            }
        }

        Some(Ok(HaplotypeBlock::new(block_records)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    use crate::data_types::variants::{Genotype, Zygosity};

    fn het_call(chrom: &str, start: u64, phased: bool) -> VariantRecord {
        let genotype = Genotype::new(
            "sample1".to_string(),
            vec![b"A".to_vec(), b"C".to_vec()],
            phased, Zygosity::Heterozygous
        ).unwrap();
        VariantRecord::new(
            chrom.to_string(), start, None,
            b"A".to_vec(), vec![b"C".to_vec()],
            vec![genotype]
        ).unwrap()
    }

    fn hom_call(chrom: &str, start: u64) -> VariantRecord {
        let genotype = Genotype::new(
            "sample1".to_string(),
            vec![b"C".to_vec(), b"C".to_vec()],
            false, Zygosity::HomozygousAlternate
        ).unwrap();
        VariantRecord::new(
            chrom.to_string(), start, None,
            b"A".to_vec(), vec![b"C".to_vec()],
            vec![genotype]
        ).unwrap()
    }

    fn del_call(chrom: &str, start: u64, ref_allele: &[u8]) -> VariantRecord {
        let genotype = Genotype::new(
            "sample1".to_string(),
            vec![ref_allele.to_vec(), b"A".to_vec()],
            false, Zygosity::Heterozygous
        ).unwrap();
        VariantRecord::new(
            chrom.to_string(), start, None,
            ref_allele.to_vec(), vec![b"A".to_vec()],
            vec![genotype]
        ).unwrap()
    }

    fn collect_blocks(records: Vec<VariantRecord>, regions: Option<&RegionIndex>) -> Vec<HaplotypeBlock> {
        BlockIterator::new(records.into_iter(), regions)
            .collect::<Result<Vec<HaplotypeBlock>, ComparisonError>>()
            .unwrap()
    }

    #[test]
    fn test_unphased_hets_split() {
        let blocks = collect_blocks(vec![
            het_call("chr1", 10, false),
            het_call("chr1", 20, false),
            het_call("chr1", 30, false)
        ], None);
        assert_eq!(blocks.len(), 3);
        assert!(blocks.iter().all(|b| b.len() == 1));
    }

    #[test]
    fn test_phased_chain() {
        let blocks = collect_blocks(vec![
            het_call("chr1", 10, false),
            het_call("chr1", 20, true),
            het_call("chr1", 30, true),
            het_call("chr1", 40, false)
        ], None);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 3);
        assert_eq!(blocks[1].len(), 1);
        assert_eq!(format!("{}", blocks[0].coordinates()), "chr1:10-30");
    }

    #[test]
    fn test_homozygous_chain() {
        // single-allele calls always continue the running block
        let blocks = collect_blocks(vec![
            het_call("chr1", 10, false),
            hom_call("chr1", 20),
            hom_call("chr1", 30)
        ], None);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 3);
    }

    #[test]
    fn test_overlap_chain() {
        // an unphased het overlapping the previous deletion stays in the block
        let blocks = collect_blocks(vec![
            del_call("chr1", 10, b"ACGTACGT"), // spans 10-17
            het_call("chr1", 15, false),
            het_call("chr1", 30, false)
        ], None);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(format!("{}", blocks[0].coordinates()), "chr1:10-17");
    }

    #[test]
    fn test_chromosome_split() {
        let blocks = collect_blocks(vec![
            het_call("chr1", 10, false),
            het_call("chr2", 11, true) // phased flag cannot cross chromosomes
        ], None);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].chrom(), "chr1");
        assert_eq!(blocks[1].chrom(), "chr2");
    }

    #[test]
    fn test_region_continuity() {
        let mut chrom_intervals: IndexMap<String, Vec<(u64, u64)>> = Default::default();
        chrom_intervals.insert("chr1".to_string(), vec![(1, 25), (26, 100)]);
        let regions = RegionIndex::from_intervals(chrom_intervals);

        // same records chain without a region source...
        let records = vec![
            hom_call("chr1", 10),
            hom_call("chr1", 20),
            hom_call("chr1", 30)
        ];
        let blocks = collect_blocks(records.clone(), None);
        assert_eq!(blocks.len(), 1);

        // ...but split where the enclosing region changes
        let blocks = collect_blocks(records, Some(&regions));
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[1].len(), 1);
    }

    #[test]
    fn test_multi_sample_errors() {
        let genotypes = vec![
            Genotype::new("s1".to_string(), vec![b"A".to_vec(), b"C".to_vec()], false, Zygosity::Heterozygous).unwrap(),
            Genotype::new("s2".to_string(), vec![b"A".to_vec(), b"A".to_vec()], false, Zygosity::HomozygousReference).unwrap()
        ];
        let bad_record = VariantRecord::new(
            "chr1".to_string(), 10, None,
            b"A".to_vec(), vec![b"C".to_vec()],
            genotypes
        ).unwrap();

        let mut iter = BlockIterator::new(vec![bad_record].into_iter(), None);
        let result = iter.next().unwrap();
        assert!(matches!(result, Err(ComparisonError::MalformedInput { genotype_count: 2, .. })));
        assert!(iter.next().is_none());
    }
}
