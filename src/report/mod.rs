pub mod writer;

pub use writer::{BatchReport, TableWriter, EXTENDED_COLUMNS, STANDARD_COLUMNS};
