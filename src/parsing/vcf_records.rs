
use anyhow::{Context, anyhow};
use indexmap::IndexMap;
use log::{debug, warn};
use noodles::vcf;
use noodles::vcf::variant::record::samples::keys::key as vcf_key;
use std::path::Path;

use crate::data_types::variants::{Genotype, VariantRecord, Zygosity};

/// Numeric FORMAT attributes carried onto each genotype when present
const CARRIED_ATTRIBUTES: [&str; 2] = ["GQ", "DP"];

/// Loads an entire VCF into single-sample variant records, grouped by
/// chromosome in file order. Records whose genotype carries a missing allele
/// ("./.") cannot be compared against a haplotype and are skipped with a
/// warning.
/// # Arguments
/// * `vcf_fn` - the VCF filename to open, plain or compressed
/// * `sample_name` - the sample to extract; must exist in the header
/// # Errors
/// * if the file, header, or any record fails to parse
/// * if the sample is not present in the header
pub fn load_variant_records(vcf_fn: &Path, sample_name: &str) -> anyhow::Result<IndexMap<String, Vec<VariantRecord>>> {
    let mut vcf_reader = noodles_util::variant::io::reader::Builder::default()
        .build_from_path(vcf_fn)
        .with_context(|| format!("Error while opening {vcf_fn:?}:"))?;
    let vcf_header = vcf_reader.read_header()
        .with_context(|| format!("Error while reading header of {vcf_fn:?}:"))?;

    let sample_index = vcf_header.sample_names().get_index_of(sample_name)
        .ok_or(anyhow!("Sample name {sample_name:?} was not found in {vcf_fn:?}"))?;

    let mut chrom_records: IndexMap<String, Vec<VariantRecord>> = Default::default();
    let mut skipped_records: usize = 0;
    for result in vcf_reader.records(&vcf_header) {
        let record: Box<dyn vcf::variant::Record> = result
            .with_context(|| format!("Error while reading records from {vcf_fn:?}:"))?;
        let record_buf = vcf::variant::RecordBuf::try_from_variant_record(&vcf_header, record.as_ref())
            .with_context(|| format!("Error while buffering record from {vcf_fn:?}:"))?;

        match parse_variant_record(&record_buf, sample_name, sample_index)
            .with_context(|| format!("Error while parsing record {record_buf:?}:"))? {
            Some(variant_record) => {
                let entry = chrom_records.entry(variant_record.chrom().to_string()).or_default();
                entry.push(variant_record);
            },
            None => {
                skipped_records += 1;
            }
        };
    }

    if skipped_records > 0 {
        warn!("Skipped {skipped_records} records with missing allele calls in {vcf_fn:?}.");
    }
    for (chrom, records) in chrom_records.iter() {
        debug!("Loaded {} records on {chrom} from {vcf_fn:?}.", records.len());
    }

    Ok(chrom_records)
}

/// Converts one pre-buffered VCF record into a single-sample `VariantRecord`.
/// Returns None when the genotype includes a missing allele.
/// # Arguments
/// * `record` - the buffered record to convert
/// * `sample_name` - name attached to the extracted genotype
/// * `sample_index` - index of the sample in the record
fn parse_variant_record(
    record: &vcf::variant::RecordBuf,
    sample_name: &str,
    sample_index: usize
) -> anyhow::Result<Option<VariantRecord>> {
    let chrom = record.reference_sequence_name().to_string();
    let start = record.variant_start().ok_or(anyhow!("Missing POS"))?.get() as u64;
    let ref_allele = record.reference_bases().as_bytes().to_vec();
    let alt_alleles: Vec<Vec<u8>> = record.alternate_bases().as_ref().iter()
        .map(|alt| alt.as_bytes().to_vec())
        .collect();
    let id = record.ids().as_ref().iter().next().cloned();

    // sample specific information
    let all_samples = record.samples();
    let sample = all_samples.get_index(sample_index)
        .ok_or(anyhow!("Sample index {sample_index} does not exist"))?;
    let gt = sample.get(vcf_key::GENOTYPE)
        .ok_or(anyhow!("Missing GT"))?
        .ok_or(anyhow!("Sample missing GT"))?;

    let parsed = match parse_genotype_value(gt)? {
        Some(pg) => pg,
        None => return Ok(None)
    };

    // map the GT indices onto the actual allele sequences
    let mut called_alleles: Vec<Vec<u8>> = Vec::with_capacity(parsed.allele_indices.len());
    for &allele_index in parsed.allele_indices.iter() {
        let sequence = if allele_index == 0 {
            ref_allele.clone()
        } else {
            record.alternate_bases().as_ref().get(allele_index - 1)
                .ok_or(anyhow!("GT allele index {allele_index} exceeds ALT count"))?
                .as_bytes().to_vec()
        };
        called_alleles.push(sequence);
    }

    let zygosity = derive_zygosity(&parsed.allele_indices);
    let mut genotype = Genotype::new(sample_name.to_string(), called_alleles, parsed.phased, zygosity)?;
    for key in CARRIED_ATTRIBUTES.iter() {
        use vcf::variant::record_buf::samples::sample::Value;

        let numeric_value = match sample.get(*key).flatten() {
            Some(Value::Integer(value)) => Some(*value as f64),
            Some(Value::Float(value)) => Some(*value as f64),
            _ => None
        };
        if let Some(value) = numeric_value {
            genotype.set_attribute(key.to_string(), value);
        }
    }

    let variant_record = VariantRecord::new(
        chrom, start, id,
        ref_allele, alt_alleles,
        vec![genotype]
    )?;
    Ok(Some(variant_record))
}

/// The usable pieces of a parsed GT value
struct ParsedGenotype {
    /// Allele indices into the REF+ALT list, ploidy order
    allele_indices: Vec<usize>,
    /// True if any allele separator was the phased bar
    phased: bool
}

/// Unpacks a GT FORMAT value into indices and the phasing flag.
/// Returns None when any allele is missing.
fn parse_genotype_value(gt: &vcf::variant::record_buf::samples::sample::Value) -> anyhow::Result<Option<ParsedGenotype>> {
    use vcf::variant::record::samples::series::value::genotype::Phasing;

    let genotype = match gt {
        vcf::variant::record_buf::samples::sample::Value::Genotype(genotype) => genotype,
        _ => return Err(anyhow!("GT value is not a genotype"))
    };

    let alleles = genotype.as_ref();
    let mut allele_indices: Vec<usize> = Vec::with_capacity(alleles.len());
    let mut phased = false;
    for allele in alleles.iter() {
        match allele.position() {
            Some(index) => allele_indices.push(index),
            None => return Ok(None) // missing allele, e.g. "./."
        };
        if allele.phasing() == Phasing::Phased {
            phased = true;
        }
    }

    if allele_indices.is_empty() {
        return Err(anyhow!("GT value has no alleles"));
    }
    Ok(Some(ParsedGenotype {
        allele_indices,
        phased
    }))
}

/// Zygosity from the GT allele indices; haploid calls count as homozygous.
fn derive_zygosity(allele_indices: &[usize]) -> Zygosity {
    let first = allele_indices[0];
    if allele_indices.iter().all(|&i| i == first) {
        if first == 0 {
            Zygosity::HomozygousReference
        } else {
            Zygosity::HomozygousAlternate
        }
    } else {
        Zygosity::Heterozygous
    }
}
