
use derive_builder::Builder;
use indexmap::IndexMap;
use log::debug;
use serde::Serialize;
use strum_macros::EnumString;

use crate::allele_resolver::block_allele_index;
use crate::block_gen::BlockIterator;
use crate::data_types::comparison::{ComparisonCategory, ComparisonError, ComparisonRecord};
use crate::data_types::coordinates::Coordinates;
use crate::data_types::summary_metrics::ComparisonMetrics;
use crate::data_types::variants::VariantRecord;
use crate::haplotype_index::HaplotypeIndex;
use crate::parsing::region_index::RegionIndex;
use crate::region_scorer::score_phased_region;

/// The supported comparison approaches
#[derive(Clone, Copy, Default, Debug, Eq, PartialEq, strum_macros::Display, EnumString, Serialize, clap::ValueEnum)]
pub enum ScoreApproach {
    /// One input is a fixed truth set grading the other; expected variants
    /// with no competing call become discordant-missing
    #[default]
    #[strum(ascii_case_insensitive, serialize = "grade")]
    Grade,
    /// Both inputs are treated symmetrically for bidirectional reporting
    #[strum(ascii_case_insensitive, serialize = "compare")]
    Compare
}

/// Number of one-sample inputs every approach consumes
const REQUIRED_INPUTS: usize = 2;

/// Fails fast when the number of inputs does not fit the approach.
/// Grade wants exactly one truth plus one contestant; compare wants exactly
/// two sides. Either way the arity is two one-sample inputs.
/// # Arguments
/// * `approach` - the selected comparison approach
/// * `input_count` - number of one-sample inputs provided
pub fn check_input_arity(approach: ScoreApproach, input_count: usize) -> Result<(), ComparisonError> {
    if input_count != REQUIRED_INPUTS {
        return Err(ComparisonError::InconsistentModeArity {
            approach: approach.to_string(),
            expected: REQUIRED_INPUTS,
            found: input_count
        });
    }
    Ok(())
}

/// Controls one scoring run
#[derive(Builder, Clone, Copy, Debug)]
#[builder(default)]
pub struct ScoreOptions<'a> {
    /// Selects grade or symmetric compare semantics
    pub approach: ScoreApproach,
    /// Optional region-of-interest source; bounds block continuity
    pub regions: Option<&'a RegionIndex>
}

impl Default for ScoreOptions<'_> {
    fn default() -> Self {
        // reasonable defaults for unit tests; main.rs sets these from user input
        Self {
            approach: ScoreApproach::Grade,
            regions: None
        }
    }
}

/// One element of the scan output: the gap records preceding a block followed
/// by the block's own scored records. The trailing unit of a chromosome has no
/// block and carries only the records expected after the final block.
#[derive(Debug)]
pub struct ScanUnit {
    /// Comparison results, position-ascending within the unit
    comparisons: Vec<ComparisonRecord>,
    /// Span of the scored block; None for the end-of-chromosome unit
    block_span: Option<Coordinates>
}

impl ScanUnit {
    /// True if this unit scored an actual haplotype block.
    pub fn scored_block(&self) -> bool {
        self.block_span.is_some()
    }

    // getters
    pub fn comparisons(&self) -> &[ComparisonRecord] {
        &self.comparisons
    }

    pub fn block_span(&self) -> Option<&Coordinates> {
        self.block_span.as_ref()
    }

    pub fn into_comparisons(self) -> Vec<ComparisonRecord> {
        self.comparisons
    }
}

/// Lazily walks one chromosome's call stream block by block, stitching block
/// scores together with the unphased gaps between them.
///
/// The rolling state is just the end of the previously scored span; each call
/// to `next` folds it forward, so early units can stream to a writer while
/// later blocks are still unread.
pub struct HaplotypeScanner<'a, I: Iterator<Item = VariantRecord>> {
    /// The chromosome this scanner covers
    chrom: String,
    /// Block partitioner over the chromosome's calls
    blocks: BlockIterator<'a, I>,
    /// The expected haplotype source
    reference: &'a HaplotypeIndex,
    /// The selected comparison approach
    approach: ScoreApproach,
    /// Last position covered by previously emitted units
    prev_end: u64,
    /// Set once the trailing unit has been emitted or an error occurred
    finished: bool
}

impl<'a, I: Iterator<Item = VariantRecord>> HaplotypeScanner<'a, I> {
    /// Creates a scanner over one chromosome's ordered call stream.
    /// # Arguments
    /// * `chrom` - the chromosome being scanned; also used when no call exists
    /// * `records` - ordered single-sample records, all on `chrom`
    /// * `reference` - the expected haplotype source
    /// * `options` - approach and optional region source
    pub fn new(chrom: String, records: I, reference: &'a HaplotypeIndex, options: ScoreOptions<'a>) -> Self {
        Self {
            chrom,
            blocks: BlockIterator::new(records, options.regions),
            reference,
            approach: options.approach,
            prev_end: 0,
            finished: false
        }
    }

    /// Expected records falling strictly between the previous span and
    /// `before` (exclusive); these were never called because they sit in an
    /// unphased gap.
    fn gap_comparisons(&self, before: Option<u64>) -> Vec<ComparisonRecord> {
        self.reference.starting_after(&self.chrom, self.prev_end)
            .into_iter()
            .filter(|e| match before {
                Some(bound) => e.start() < bound,
                None => true
            })
            .map(|e| {
                ComparisonRecord::new(
                    ComparisonCategory::Discordant,
                    None, Some(e.clone()),
                    false, vec![]
                )
            })
            .collect()
    }

    /// Applies the approach-specific category conversion.
    fn finalize(&self, comparisons: Vec<ComparisonRecord>) -> Vec<ComparisonRecord> {
        match self.approach {
            ScoreApproach::Grade => {
                // a discordant with no call at all had no competitor variant
                comparisons.into_iter()
                    .map(|c| {
                        if c.category() == ComparisonCategory::Discordant && c.call().is_none() {
                            c.with_category(ComparisonCategory::DiscordantMissing)
                        } else {
                            c
                        }
                    })
                    .collect()
            },
            ScoreApproach::Compare => comparisons
        }
    }
}

impl<'a, I: Iterator<Item = VariantRecord>> Iterator for HaplotypeScanner<'a, I> {
    type Item = Result<ScanUnit, ComparisonError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.blocks.next() {
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            },
            Some(Ok(block)) => {
                let span = block.coordinates();
                debug!("Scoring block {span} with {} calls", block.len());

                let mut comparisons = self.gap_comparisons(Some(span.start()));
                let allele_index = block_allele_index(block.records(), self.reference);
                comparisons.extend(score_phased_region(&block, allele_index, self.reference));

                self.prev_end = self.prev_end.max(span.end());
                Some(Ok(ScanUnit {
                    comparisons: self.finalize(comparisons),
                    block_span: Some(span)
                }))
            },
            None => {
                // sentinel unit covering everything after the final block
                self.finished = true;
                let comparisons = self.gap_comparisons(None);
                if comparisons.is_empty() {
                    None
                } else {
                    Some(Ok(ScanUnit {
                        comparisons: self.finalize(comparisons),
                        block_span: None
                    }))
                }
            }
        }
    }
}

/// Reduces a set of scan units into the summary counts: one tally per
/// (classification, variant type) cell, plus block and flag totals.
/// # Arguments
/// * `units` - the scan output to reduce
pub fn aggregate_units<'a>(units: impl IntoIterator<Item = &'a ScanUnit>) -> ComparisonMetrics {
    let mut metrics = ComparisonMetrics::default();
    for unit in units.into_iter() {
        if unit.scored_block() {
            metrics.increment_blocks();
        }
        for comparison in unit.comparisons().iter() {
            metrics.add_comparison(comparison);
        }
    }
    metrics
}

/// Scores a whole chromosome-grouped call set against the expected haplotype,
/// lazily, one chromosome at a time. Truth-only chromosomes are appended so
/// their expected records are still reported as missing. This is the
/// single-threaded entry point; callers wanting parallelism run one
/// `HaplotypeScanner` per chromosome instead.
/// # Arguments
/// * `call_records` - called records grouped by chromosome, in stream order
/// * `reference` - the expected haplotype source
/// * `options` - approach and optional region source
pub fn score_haplotypes<'a>(
    call_records: IndexMap<String, Vec<VariantRecord>>,
    reference: &'a HaplotypeIndex,
    options: ScoreOptions<'a>
) -> impl Iterator<Item = Result<ScanUnit, ComparisonError>> + 'a {
    let mut work_items: Vec<(String, Vec<VariantRecord>)> = call_records.into_iter().collect();
    for chrom in reference.chromosomes().into_iter() {
        if !work_items.iter().any(|(c, _records)| c == chrom) {
            work_items.push((chrom.to_string(), vec![]));
        }
    }

    work_items.into_iter()
        .flat_map(move |(chrom, records)| {
            HaplotypeScanner::new(chrom, records.into_iter(), reference, options)
        })
}
