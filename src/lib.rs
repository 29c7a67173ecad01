
/// Resolves which haplotype allele index a call or block is compared at
pub mod allele_resolver;
/// Partitions ordered call streams into phase-linked haplotype blocks
pub mod block_gen;
/// Per-block mutable range index over called records
pub mod call_index;
/// Command line interface functionality
pub mod cli;
/// Contains various shared data types
pub mod data_types;
/// Queryable index over the expected haplotype records
pub mod haplotype_index;
/// Walks blocks and gaps per chromosome and stitches their results
pub mod haplotype_scan;
/// Tooling for parsing input files into meaningful structs / data
pub mod parsing;
/// Core scoring of one haplotype block against the expected records
pub mod region_scorer;
/// Various utility functions that tend to be very generic
pub mod util;
/// All output writers
pub mod writers;
