
use itertools::Itertools;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use crate::data_types::comparison::{ALL_CATEGORIES, ComparisonCategory, ComparisonRecord};
use crate::data_types::variants::VariantRecord;

/// Streams comparison results into one TSV file per category.
/// Files are named `<label>-<category>.tsv` inside the output folder and are
/// opened upfront so empty categories still produce a headered file.
pub struct CategoryWriter {
    /// One open writer per comparison category
    writers: BTreeMap<ComparisonCategory, csv::Writer<File>>
}

/// Contains all the data written to each row of a category file
#[derive(Serialize)]
struct CategoryRow {
    /// Chromosome of the scored position
    chrom: String,
    /// First scored position, 1-based
    start: u64,
    /// Last position covered by the record pair
    end: u64,
    /// Last position of the expected record, when one exists
    end_ref: Option<u64>,
    /// Joint variant type of the pair
    variant_type: String,
    /// True when an unchosen heterozygous allele was non-reference
    nomatch_het_alt: bool,
    /// External identifier of the called record, "." if absent
    call_id: String,
    /// Called allele sequences, "/"-joined, "." when there is no call
    call_alleles: String,
    /// The expected haplotype allele, "." when there is no expectation
    expected_allele: String
}

impl CategoryRow {
    /// Flattens a comparison record into the writable row shape
    fn new(comparison: &ComparisonRecord) -> Self {
        let call_id = comparison.call()
            .and_then(|c| c.id())
            .unwrap_or(".")
            .to_string();
        let call_alleles = comparison.call()
            .map(format_called_alleles)
            .unwrap_or_else(|| ".".to_string());
        let expected_allele = comparison.expected()
            .and_then(|e| e.genotypes().first())
            .and_then(|g| g.alleles().first())
            .map(|a| String::from_utf8_lossy(a).to_string())
            .unwrap_or_else(|| ".".to_string());

        Self {
            chrom: comparison.chrom().to_string(),
            start: comparison.start(),
            end: comparison.end(),
            end_ref: comparison.end_ref(),
            variant_type: comparison.variant_type().to_string(),
            nomatch_het_alt: comparison.nomatch_het_alt(),
            call_id,
            call_alleles,
            expected_allele
        }
    }
}

/// Joins a call's genotype alleles for display, e.g. "A/C"
fn format_called_alleles(call: &VariantRecord) -> String {
    match call.genotypes().first() {
        Some(genotype) => {
            genotype.alleles().iter()
                .map(|a| String::from_utf8_lossy(a).to_string())
                .join("/")
        },
        None => ".".to_string()
    }
}

impl CategoryWriter {
    /// Opens one output file per category inside the output folder.
    /// # Arguments
    /// * `output_folder` - destination folder, must already exist
    /// * `label` - filename prefix, usually the comparison label
    pub fn new(output_folder: &Path, label: &str) -> csv::Result<Self> {
        let mut writers: BTreeMap<ComparisonCategory, csv::Writer<File>> = Default::default();
        for category in ALL_CATEGORIES.iter() {
            let filename = output_folder.join(format!("{label}-{category}.tsv"));
            let csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
                .delimiter(b'\t')
                .from_path(filename)?;
            writers.insert(*category, csv_writer);
        }

        Ok(Self {
            writers
        })
    }

    /// Routes one comparison record to its category file.
    /// # Arguments
    /// * `comparison` - the record to persist
    pub fn write_comparison(&mut self, comparison: &ComparisonRecord) -> csv::Result<()> {
        let row = CategoryRow::new(comparison);
        // all categories were opened in the constructor
        let csv_writer = self.writers.get_mut(&comparison.category()).unwrap();
        csv_writer.serialize(&row)?;
        Ok(())
    }

    /// Flushes every category file.
    pub fn finish(&mut self) -> csv::Result<()> {
        for csv_writer in self.writers.values_mut() {
            csv_writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::data_types::variants::{Genotype, Zygosity};

    fn call_record(start: u64) -> VariantRecord {
        let genotype = Genotype::new(
            "sample1".to_string(),
            vec![b"A".to_vec(), b"C".to_vec()],
            false, Zygosity::Heterozygous
        ).unwrap();
        VariantRecord::new(
            "chr1".to_string(), start, Some("var1".to_string()),
            b"A".to_vec(), vec![b"C".to_vec()],
            vec![genotype]
        ).unwrap()
    }

    #[test]
    fn test_category_row() {
        let comparison = ComparisonRecord::new(
            ComparisonCategory::Discordant,
            Some(call_record(10)), None,
            true, vec![]
        );
        let row = CategoryRow::new(&comparison);
        assert_eq!(row.chrom, "chr1");
        assert_eq!(row.start, 10);
        assert_eq!(row.end_ref, None);
        assert_eq!(row.variant_type, "snp");
        assert!(row.nomatch_het_alt);
        assert_eq!(row.call_id, "var1");
        assert_eq!(row.call_alleles, "A/C");
        assert_eq!(row.expected_allele, ".");
    }

    #[test]
    fn test_writes_per_category_files() {
        let out_dir = std::env::temp_dir().join("hapscore_category_writer_test");
        std::fs::create_dir_all(&out_dir).unwrap();

        let mut writer = CategoryWriter::new(&out_dir, "unittest").unwrap();
        let comparison = ComparisonRecord::new(
            ComparisonCategory::Concordant,
            Some(call_record(10)), None,
            false, vec![]
        );
        writer.write_comparison(&comparison).unwrap();
        writer.finish().unwrap();

        // every category file exists, the written one has a data row
        for category in ALL_CATEGORIES.iter() {
            let filename = out_dir.join(format!("unittest-{category}.tsv"));
            assert!(filename.exists());
        }
        let concordant = std::fs::read_to_string(out_dir.join("unittest-concordant.tsv")).unwrap();
        assert_eq!(concordant.lines().count(), 2); // header + row
        assert!(concordant.contains("chr1\t10"));

        std::fs::remove_dir_all(&out_dir).unwrap();
    }
}
