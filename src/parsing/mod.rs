/*!
# Parsing module
Contains the logic for parsing input files into meaningful structs / data.
*/
/// Helper functions for noodles
pub mod noodles_helper;
/// Region-of-interest lookups and base counting over BED intervals
pub mod region_index;
/// Reader for sequence dictionaries (.fai) used for base counting
pub mod sequence_dict;
/// Converts VCF records into the variant record stream for scoring
pub mod vcf_records;
