pub mod package_scanner;

pub use package_scanner::{format_bytes, PackageFile, PackageScanner};
