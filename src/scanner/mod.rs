pub mod archive_scanner;
pub mod category;
pub mod file_filter;

pub use archive_scanner::{open_archive, ArchiveEntry, ArchiveScanner, ScanResult, ScanStatistics, SkippedEntry};
pub use category::FileTypeCategory;
pub use file_filter::{FileFilter, Rejection};
