/*!
# Writers module
Contains the logic for writing the output files for the score command.
*/
/// Generates the per-category comparison files
pub mod category_writer;
/// Generates the summary file
pub mod summary;
