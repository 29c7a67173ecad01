
use indicatif::ParallelProgressIterator;
use log::{LevelFilter, error, info};
use rayon::prelude::*;
use std::time::Instant;

use hapscore::cli::core::{Commands, get_cli};
use hapscore::cli::score::{ScoreSettings, check_score_settings};
use hapscore::data_types::comparison::{ALL_CATEGORIES, ComparisonCategory, ComparisonError};
use hapscore::data_types::variants::VariantRecord;
use hapscore::haplotype_index::HaplotypeIndex;
use hapscore::haplotype_scan::{HaplotypeScanner, ScanUnit, ScoreApproach, ScoreOptionsBuilder, check_input_arity};
use hapscore::parsing::region_index::{RegionIndex, count_comparison_bases};
use hapscore::parsing::sequence_dict::load_sequence_dictionary;
use hapscore::parsing::vcf_records::load_variant_records;
use hapscore::util::json_io::save_json;
use hapscore::util::progress_bar::get_progress_style;
use hapscore::writers::category_writer::CategoryWriter;
use hapscore::writers::summary::SummaryWriter;

fn run_score(settings: ScoreSettings) {
    // start the timer
    let start_time = Instant::now();

    // set up logging before we check the other settings
    let filter_level: LevelFilter = match settings.verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace
    };
    env_logger::builder()
        .format_timestamp_millis()
        .filter_level(filter_level)
        .init();

    let settings = match check_score_settings(settings) {
        Ok(s) => s,
        Err(e) => {
            error!("Error while verifying settings: {e:#}");
            std::process::exit(exitcode::CONFIG);
        }
    };

    // the approach arity precondition; the CLI always supplies one truth and one call VCF
    if let Err(e) = check_input_arity(settings.approach, 2) {
        error!("Error while verifying inputs: {e}");
        std::process::exit(exitcode::USAGE);
    }

    // set up the number of threads for rayon
    match rayon::ThreadPoolBuilder::new().num_threads(settings.threads).build_global() {
        Ok(()) => {},
        Err(e) => {
            error!("Error while building thread pool: {e}");
            std::process::exit(exitcode::OSERR);
        }
    };

    // create the primary output folder
    info!("Creating output folder at {:?}...", settings.output_folder);
    match std::fs::create_dir_all(&settings.output_folder) {
        Ok(()) => {},
        Err(e) => {
            error!("Error while creating output folder: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // create a debug folder if specified, files might get created in sub-routines
    if let Some(debug_folder) = settings.debug_folder.as_ref() {
        info!("Creating debug folder at {debug_folder:?}...");
        match std::fs::create_dir_all(debug_folder) {
            Ok(()) => {},
            Err(e) => {
                error!("Error while creating debug folder: {e}");
                std::process::exit(exitcode::IOERR);
            }
        }

        // save the CLI options
        let cli_json = debug_folder.join("cli_settings.json");
        info!("Saving CLI options to {cli_json:?}...");
        if let Err(e) = save_json(&settings, &cli_json) {
            error!("Error while saving CLI options: {e}");
            std::process::exit(exitcode::IOERR);
        }
    }

    // load the optional regions of interest
    let regions = settings.regions.as_deref().map(|bed_fn| {
        info!("Pre-loading regions of interest into memory...");
        match RegionIndex::from_bed(bed_fn) {
            Ok(ri) => ri,
            Err(e) => {
                error!("Error while loading regions: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        }
    });

    // load the truth haplotype into the queryable index
    info!("Pre-loading truth haplotype into memory...");
    let truth_records = match load_variant_records(&settings.truth_vcf_filename, &settings.truth_sample) {
        Ok(tr) => tr,
        Err(e) => {
            error!("Error while loading truth VCF: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let reference = HaplotypeIndex::from_records(
        truth_records.into_values().flatten().collect()
    );
    info!("Loaded {} truth records.", reference.len());

    // load the contestant calls, grouped by chromosome in file order
    info!("Pre-loading call records into memory...");
    let call_records = match load_variant_records(&settings.call_vcf_filename, &settings.call_sample) {
        Ok(cr) => cr,
        Err(e) => {
            error!("Error while loading call VCF: {e:#}");
            std::process::exit(exitcode::IOERR);
        }
    };
    let call_count: usize = call_records.values().map(|records| records.len()).sum();
    info!("Loaded {call_count} call records.");

    // chromosome work list: call chromosomes in file order, then any truth-only
    // chromosomes so their expected records still get reported
    let mut work_items: Vec<(String, Vec<VariantRecord>)> = call_records.into_iter().collect();
    for chrom in reference.chromosomes().into_iter() {
        if !work_items.iter().any(|(c, _records)| c == chrom) {
            work_items.push((chrom.to_string(), vec![]));
        }
    }

    let score_options = match ScoreOptionsBuilder::default()
        .approach(settings.approach)
        .regions(regions.as_ref())
        .build() {
        Ok(so) => so,
        Err(e) => {
            error!("Error while building score options: {e:?}");
            std::process::exit(exitcode::SOFTWARE);
        }
    };

    // run the parallel iterator to score each chromosome independently
    let style = get_progress_style();
    info!("Scoring chromosomes...");
    let scan_results: Vec<(String, Result<Vec<ScanUnit>, ComparisonError>)> = work_items.into_par_iter()
        .map(|(chrom, records)| {
            let scanner = HaplotypeScanner::new(chrom.clone(), records.into_iter(), &reference, score_options);
            let units = scanner.collect::<Result<Vec<ScanUnit>, ComparisonError>>();
            (chrom, units)
        })
        .progress_with_style(style)
        .collect();
    info!("Chromosome scans complete, saving all outputs...");

    // the accuracy denominators differ by approach: grade counts missed truth
    // variants as errors, symmetric compare does not have that category
    let error_categories: Vec<ComparisonCategory> = match settings.approach {
        ScoreApproach::Grade => vec![
            ComparisonCategory::Discordant,
            ComparisonCategory::DiscordantMissing,
            ComparisonCategory::PhasingError
        ],
        ScoreApproach::Compare => vec![
            ComparisonCategory::Discordant,
            ComparisonCategory::PhasingError
        ]
    };
    let mut summary_writer = SummaryWriter::new(settings.score_label.clone(), error_categories);
    let mut category_writer = match CategoryWriter::new(&settings.output_folder, &settings.score_label) {
        Ok(cw) => cw,
        Err(e) => {
            error!("Error while opening category output files: {e}");
            std::process::exit(exitcode::IOERR);
        }
    };

    // write everything back out in the deterministic work-list order
    for (chrom, result) in scan_results.into_iter() {
        let units = match result {
            Ok(u) => u,
            Err(e) => {
                error!("Error while scanning {chrom}: {e}");
                std::process::exit(exitcode::DATAERR);
            }
        };

        for unit in units.into_iter() {
            summary_writer.add_scan_unit(&unit);
            for comparison in unit.comparisons().iter() {
                if let Err(e) = category_writer.write_comparison(comparison) {
                    error!("Error while writing comparison outputs: {e}");
                    std::process::exit(exitcode::IOERR);
                }
            }
        }
    }
    if let Err(e) = category_writer.finish() {
        error!("Error while flushing comparison outputs: {e}");
        std::process::exit(exitcode::IOERR);
    }

    // base counting requires all three inputs; the settings check enforces that
    if let (Some(total_fn), Some(compared_fn), Some(fai_fn)) = (
        settings.total_regions.as_deref(),
        settings.compared_regions.as_deref(),
        settings.reference_index.as_deref()
    ) {
        info!("Counting comparison bases...");
        let loaded_beds = RegionIndex::from_bed(total_fn)
            .and_then(|total| Ok((total, RegionIndex::from_bed(compared_fn)?)));
        let (total_regions, compared_regions) = match loaded_beds {
            Ok(lb) => lb,
            Err(e) => {
                error!("Error while loading base counting regions: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        };
        let dictionary = match load_sequence_dictionary(fai_fn) {
            Ok(d) => d,
            Err(e) => {
                error!("Error while loading sequence dictionary: {e:#}");
                std::process::exit(exitcode::IOERR);
            }
        };

        let chromosomes: Vec<String> = dictionary.keys().cloned().collect();
        let coverage = count_comparison_bases(&total_regions, &compared_regions, &chromosomes);
        info!("Bases compared: {} / {} ({:.2}%)", coverage.compared, coverage.total, coverage.percent);
        summary_writer.set_base_coverage(coverage);
    }

    // dump the joint stats to the log
    let metrics = summary_writer.metrics();
    info!("Haplotype blocks: {}", metrics.haplotype_blocks());
    for category in ALL_CATEGORIES.iter() {
        info!("\t{category}: {}", metrics.category_total(*category));
    }
    info!("Nonmatching het alts: {}", metrics.nomatch_het_alt());
    if let Some(accuracy) = summary_writer.accuracy() {
        info!("Accuracy: {accuracy:.1}");
    }

    // now write things
    let summary_fn = settings.output_folder.join("summary.tsv");
    info!("Saving output summary to {summary_fn:?}...");
    if let Err(e) = summary_writer.write_summary(&summary_fn) {
        error!("Error while saving summary file: {e:#}");
        std::process::exit(exitcode::IOERR);
    }

    info!("Scoring completed in {} seconds.", start_time.elapsed().as_secs_f64());
}

fn main() {
    let cli = get_cli();
    match cli.command {
        Commands::Score(settings) => {
            run_score(*settings);
        }
    }

    info!("Process finished successfully.");
}
