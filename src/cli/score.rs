
use anyhow::bail;
use clap::Args;
use log::info;
use serde::Serialize;
use std::path::PathBuf;

use crate::cli::core::{check_optional_filename, check_required_filename, AFTER_HELP, FULL_VERSION};
use crate::haplotype_scan::ScoreApproach;
use crate::parsing::noodles_helper::resolve_vcf_sample_name;

#[derive(Args, Clone, Default, Serialize)]
#[clap(author, about,
    after_help = &**AFTER_HELP
)]
pub struct ScoreSettings {
    #[clap(default_value = "")]
    #[clap(hide = true)]
    hapscore_version: String,

    /// Truth variant call file containing the haploid reference haplotype (VCF)
    #[clap(required = true)]
    #[clap(short = 't')]
    #[clap(long = "truth-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub truth_vcf_filename: PathBuf,

    /// Contestant variant call file (VCF)
    #[clap(required = true)]
    #[clap(short = 'c')]
    #[clap(long = "call-vcf")]
    #[clap(value_name = "VCF")]
    #[clap(help_heading = Some("Input/Output"))]
    pub call_vcf_filename: PathBuf,

    /// Regions of interest bounding block continuity (BED)
    #[clap(short = 'b')]
    #[clap(long = "regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Input/Output"))]
    pub regions: Option<PathBuf>,

    /// Output directory containing the summary and per-category files
    #[clap(required = true)]
    #[clap(short = 'o')]
    #[clap(long = "output-dir")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub output_folder: PathBuf,

    /// Optional output debug folder
    #[clap(long = "output-debug")]
    #[clap(value_name = "DIR")]
    #[clap(help_heading = Some("Input/Output"))]
    pub debug_folder: Option<PathBuf>,

    /// Optional label for the summary and per-category outputs
    #[clap(long = "score-label")]
    #[clap(value_name = "LABEL")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "score")]
    pub score_label: String,

    /// The sample name to use in the truth VCF [default: first sample]
    #[clap(long = "truth-sample")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub truth_sample: String,

    /// The sample name to use in the call VCF [default: first sample]
    #[clap(long = "call-sample")]
    #[clap(value_name = "SAMPLE")]
    #[clap(help_heading = Some("Input/Output"))]
    #[clap(default_value = "", hide_default_value = true)]
    pub call_sample: String,

    /// Comparison approach: grade against a fixed truth, or symmetric compare
    #[clap(long = "approach")]
    #[clap(value_name = "APPROACH")]
    #[clap(help_heading = Some("Score parameters"))]
    #[clap(value_enum, default_value_t = ScoreApproach::Grade)]
    pub approach: ScoreApproach,

    /// Total assessable regions for base counting (BED)
    #[clap(long = "total-regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Base counting"))]
    pub total_regions: Option<PathBuf>,

    /// Regions actually compared, for base counting (BED)
    #[clap(long = "compared-regions")]
    #[clap(value_name = "BED")]
    #[clap(help_heading = Some("Base counting"))]
    pub compared_regions: Option<PathBuf>,

    /// Reference sequence dictionary (.fai), required for base counting
    #[clap(long = "reference-index")]
    #[clap(value_name = "FAI")]
    #[clap(help_heading = Some("Base counting"))]
    pub reference_index: Option<PathBuf>,

    /// Number of threads to use for per-chromosome scoring
    #[clap(long = "threads")]
    #[clap(value_name = "THREADS")]
    #[clap(default_value = "1")]
    pub threads: usize,

    /// Enable verbose output.
    #[clap(short = 'v')]
    #[clap(long = "verbose")]
    #[clap(action = clap::ArgAction::Count)]
    pub verbosity: u8
}

pub fn check_score_settings(mut settings: ScoreSettings) -> anyhow::Result<ScoreSettings> {
    // hard code the version in
    settings.hapscore_version = FULL_VERSION.clone();
    info!("Hapscore version: {:?}", &settings.hapscore_version);
    info!("Sub-command: score");
    info!("Inputs:");

    // check for all the required input files
    check_required_filename(&settings.truth_vcf_filename, "Truth VCF")?;
    check_required_filename(&settings.call_vcf_filename, "Call VCF")?;
    check_optional_filename(settings.regions.as_deref(), "Regions")?;
    check_optional_filename(settings.total_regions.as_deref(), "Total regions")?;
    check_optional_filename(settings.compared_regions.as_deref(), "Compared regions")?;
    check_optional_filename(settings.reference_index.as_deref(), "Reference index")?;

    // dump stuff to the logger
    info!("\tTruth VCF: {:?}", &settings.truth_vcf_filename);
    if settings.truth_sample.is_empty() {
        settings.truth_sample = resolve_vcf_sample_name(&settings.truth_vcf_filename, "")?;
    } else {
        settings.truth_sample = resolve_vcf_sample_name(&settings.truth_vcf_filename, &settings.truth_sample)?;
    }
    info!("\tTruth sample: {:?}", &settings.truth_sample);
    info!("\tCall VCF: {:?}", &settings.call_vcf_filename);
    if settings.call_sample.is_empty() {
        settings.call_sample = resolve_vcf_sample_name(&settings.call_vcf_filename, "")?;
    } else {
        settings.call_sample = resolve_vcf_sample_name(&settings.call_vcf_filename, &settings.call_sample)?;
    }
    info!("\tCall sample: {:?}", &settings.call_sample);
    if let Some(bed_fn) = settings.regions.as_deref() {
        info!("\tRegions: {bed_fn:?}");
    } else {
        info!("\tRegions: None");
    }

    // the base counting inputs only work as a full set
    let base_count_files = [
        settings.total_regions.as_deref(),
        settings.compared_regions.as_deref(),
        settings.reference_index.as_deref()
    ];
    let provided_count = base_count_files.iter().filter(|f| f.is_some()).count();
    if provided_count > 0 && provided_count < base_count_files.len() {
        bail!("--total-regions, --compared-regions, and --reference-index must be provided together");
    }
    if provided_count == base_count_files.len() {
        info!("Base counting:");
        info!("\tTotal regions: {:?}", settings.total_regions.as_deref().unwrap());
        info!("\tCompared regions: {:?}", settings.compared_regions.as_deref().unwrap());
        info!("\tReference index: {:?}", settings.reference_index.as_deref().unwrap());
    }

    // outputs
    info!("Outputs:");
    info!("\tScore label: {:?}", &settings.score_label);
    info!("\tOutput folder: {:?}", &settings.output_folder);
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("\tDebug folder: {debug_folder:?}");
    }

    info!("Score parameters:");
    info!("\tApproach: {}", settings.approach);

    if settings.threads == 0 {
        settings.threads = 1;
    }
    info!("Processing threads: {}", settings.threads);

    Ok(settings)
}
