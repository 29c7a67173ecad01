
use anyhow::{Context, anyhow, bail};
use indexmap::IndexMap;
use std::path::Path;

/// Loads a FASTA index (.fai) as an ordered chromosome dictionary.
/// The file is headerless and tab-delimited; only the name and length columns
/// are used, the byte-offset columns are ignored.
/// # Arguments
/// * `fai_fn` - path to the .fai file
/// # Errors
/// * if the file fails to open or parse
/// * if a length fails to parse, or a chromosome appears twice
pub fn load_sequence_dictionary(fai_fn: &Path) -> anyhow::Result<IndexMap<String, u64>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(false) // no headers in the file, disable so we do not skip first row
        .flexible(true)
        .from_path(fai_fn)
        .with_context(|| format!("Error while opening {fai_fn:?}:"))?;

    let mut dictionary: IndexMap<String, u64> = Default::default();
    for result in csv_reader.records() {
        let row = result.with_context(|| format!("Error while reading {fai_fn:?}"))?;

        let chrom = row.get(0).ok_or(anyhow!("Missing chromosome on row: {row:?}"))?;
        let length: u64 = row.get(1)
            .ok_or(anyhow!("Missing length on row: {row:?}"))?
            .parse()
            .with_context(|| format!("Error while parsing length for {chrom}:"))?;

        if dictionary.insert(chrom.to_string(), length).is_some() {
            bail!("Duplicate chromosome found: {chrom}");
        }
    }

    Ok(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_sequence_dictionary() {
        let temp = std::env::temp_dir().join("hapscore_dict_test.fai");
        {
            let mut handle = std::fs::File::create(&temp).unwrap();
            writeln!(handle, "chr1\t248956422\t112\t70\t71").unwrap();
            writeln!(handle, "chr2\t242193529\t252513167\t70\t71").unwrap();
        }

        let dictionary = load_sequence_dictionary(&temp).unwrap();
        assert_eq!(dictionary.len(), 2);
        assert_eq!(dictionary.get_index(0), Some((&"chr1".to_string(), &248956422)));
        assert_eq!(dictionary.get_index(1), Some((&"chr2".to_string(), &242193529)));

        std::fs::remove_file(&temp).unwrap();
    }
}
