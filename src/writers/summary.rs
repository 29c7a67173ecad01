
use serde::Serialize;
use std::fs::File;
use std::path::Path;

use crate::data_types::comparison::ComparisonCategory;
use crate::data_types::summary_metrics::{BaseCoverage, ComparisonMetrics};
use crate::haplotype_scan::{ScanUnit, aggregate_units};

/// This is a wrapper for accumulating run metrics and writing them to a file
#[derive(Default)]
pub struct SummaryWriter {
    /// Comparison label to go on each row
    score_label: String,
    /// Categories the accuracy reduction treats as errors
    error_categories: Vec<ComparisonCategory>,
    /// The accumulated counts across every scanned chromosome
    metrics: ComparisonMetrics,
    /// Base counts from the region files, when provided
    base_coverage: Option<BaseCoverage>
}

/// Contains all the data written to each row of our stats file
#[derive(Serialize)]
struct SummaryRow {
    /// User provided label
    score_label: String,
    /// Name of the reported metric; comparison categories use their own name
    metric: String,
    /// The type of variant represented by this row, or "ALL"
    variant_type: String,
    /// Count value for integer metrics
    count: Option<u64>,
    /// Value for fractional metrics (accuracy, percent covered)
    value: Option<f64>
}

impl SummaryRow {
    /// Creates an integer-count row
    fn new_count(score_label: String, metric: String, variant_type: String, count: u64) -> Self {
        Self {
            score_label,
            metric,
            variant_type,
            count: Some(count),
            value: None
        }
    }

    /// Creates a fractional-value row
    fn new_value(score_label: String, metric: String, value: f64) -> Self {
        Self {
            score_label,
            metric,
            variant_type: "ALL".to_string(),
            count: None,
            value: Some(value)
        }
    }
}

impl SummaryWriter {
    /// Creates a new writer to accumulate stats
    /// # Arguments
    /// * `score_label` - label attached to every output row
    /// * `error_categories` - categories the accuracy score counts as errors
    pub fn new(score_label: String, error_categories: Vec<ComparisonCategory>) -> Self {
        Self {
            score_label,
            error_categories,
            ..Default::default()
        }
    }

    /// Folds one scan unit into the accumulated metrics.
    /// # Arguments
    /// * `unit` - the scan output for one block (or chromosome tail)
    pub fn add_scan_unit(&mut self, unit: &ScanUnit) {
        self.metrics += aggregate_units(std::iter::once(unit));
    }

    /// Merges pre-accumulated metrics, e.g. from a parallel chromosome run.
    pub fn add_metrics(&mut self, metrics: ComparisonMetrics) {
        self.metrics += metrics;
    }

    /// Attaches the base counts used for the accuracy denominator.
    pub fn set_base_coverage(&mut self, base_coverage: BaseCoverage) {
        self.base_coverage = Some(base_coverage);
    }

    /// The accuracy score over the configured error categories, when base
    /// counts are available.
    pub fn accuracy(&self) -> Option<f64> {
        let base_coverage = self.base_coverage.as_ref()?;
        self.metrics.calc_accuracy(base_coverage.compared, &self.error_categories)
    }

    /// Will write the summary out to the given file path
    /// # Arguments
    /// * `filename` - the filename for the output (tsv/csv)
    pub fn write_summary(&self, filename: &Path) -> csv::Result<()> {
        // modify the delimiter to "," if it ends with .csv
        let is_csv: bool = filename.extension().unwrap_or_default() == "csv";
        let delimiter: u8 = if is_csv { b',' } else { b'\t' };
        let mut csv_writer: csv::Writer<File> = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_path(filename)?;

        // one row per populated category/type cell
        for (category, variant_type, count) in self.metrics.iter_counts() {
            let row = SummaryRow::new_count(
                self.score_label.clone(),
                category.to_string(),
                variant_type.to_string(),
                count
            );
            csv_writer.serialize(&row)?;
        }

        // run-level totals
        let totals = [
            ("haplotype-blocks", self.metrics.haplotype_blocks()),
            ("nomatch-het-alt", self.metrics.nomatch_het_alt())
        ];
        for (metric, count) in totals.into_iter() {
            let row = SummaryRow::new_count(
                self.score_label.clone(),
                metric.to_string(),
                "ALL".to_string(),
                count
            );
            csv_writer.serialize(&row)?;
        }

        // base counts and accuracy only exist when region files were provided
        if let Some(base_coverage) = self.base_coverage.as_ref() {
            let base_counts = [
                ("bases-compared", base_coverage.compared),
                ("bases-total", base_coverage.total)
            ];
            for (metric, count) in base_counts.into_iter() {
                let row = SummaryRow::new_count(
                    self.score_label.clone(),
                    metric.to_string(),
                    "ALL".to_string(),
                    count
                );
                csv_writer.serialize(&row)?;
            }

            let percent_row = SummaryRow::new_value(
                self.score_label.clone(),
                "percent-compared".to_string(),
                base_coverage.percent
            );
            csv_writer.serialize(&percent_row)?;
        }
        if let Some(accuracy) = self.accuracy() {
            let accuracy_row = SummaryRow::new_value(
                self.score_label.clone(),
                "accuracy".to_string(),
                accuracy
            );
            csv_writer.serialize(&accuracy_row)?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    // getters
    pub fn metrics(&self) -> &ComparisonMetrics {
        &self.metrics
    }

    pub fn base_coverage(&self) -> Option<&BaseCoverage> {
        self.base_coverage.as_ref()
    }
}
