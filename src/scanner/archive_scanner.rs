use crate::error::{format_bytes, OfficeExtractError, Result};
use crate::scanner::file_filter::{base_name, folder_path, FileFilter, Rejection};
use std::collections::BTreeMap;
use std::io::{Cursor, Read, Seek};
use zip::ZipArchive;

/// A selected entry of the source archive. Content is read later, once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub index: usize,
    pub path: String,
    pub folder: String,
    pub file_name: String,
    pub extension: String,
    pub size: u64,
}

impl ArchiveEntry {
    pub fn new(index: usize, path: &str, size: u64) -> Self {
        let file_name = base_name(path).to_string();
        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default();

        Self {
            index,
            path: path.to_string(),
            folder: folder_path(path).to_string(),
            file_name,
            extension,
            size,
        }
    }

    /// Base name of the enclosing folder, empty for root entries.
    pub fn folder_name(&self) -> &str {
        base_name(&self.folder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SkippedEntry {
    pub path: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct ScanResult {
    pub entries: Vec<ArchiveEntry>,
    pub skipped: Vec<SkippedEntry>,
    pub total_entries: usize,
}

impl ScanResult {
    /// Selected entries keyed by their folder path inside the archive.
    pub fn folder_groups(&self) -> BTreeMap<&str, Vec<&ArchiveEntry>> {
        let mut groups: BTreeMap<&str, Vec<&ArchiveEntry>> = BTreeMap::new();
        for entry in &self.entries {
            groups.entry(entry.folder.as_str()).or_default().push(entry);
        }
        groups
    }
}

pub fn open_archive(bytes: &[u8]) -> Result<ZipArchive<Cursor<&[u8]>>> {
    ZipArchive::new(Cursor::new(bytes)).map_err(|e| OfficeExtractError::InvalidArchive {
        message: e.to_string(),
        source: Some(e),
    })
}

pub struct ArchiveScanner {
    filter: FileFilter,
}

impl ArchiveScanner {
    pub fn new(filter: FileFilter) -> Self {
        Self { filter }
    }

    /// Lists every entry in archive order and keeps the ones the filter selects.
    pub fn scan<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<ScanResult> {
        let mut result = ScanResult {
            total_entries: archive.len(),
            ..ScanResult::default()
        };

        for index in 0..archive.len() {
            let entry = archive.by_index_raw(index)?;
            let path = entry.name().to_string();

            if entry.is_dir() {
                continue;
            }

            match self.filter.check(&path, entry.size()) {
                Ok(()) => {}
                Err(Rejection::WrongType) | Err(Rejection::DirectoryMarker) => continue,
                Err(Rejection::Excluded) => {
                    log::debug!("Skipping excluded entry {}", path);
                    result.skipped.push(SkippedEntry {
                        path,
                        reason: "matches an exclude pattern".to_string(),
                    });
                    continue;
                }
                Err(Rejection::TooLarge) => {
                    log::warn!(
                        "Skipping {}: {} exceeds the {} limit",
                        path,
                        format_bytes(entry.size()),
                        format_bytes(self.filter.get_max_file_size())
                    );
                    result.skipped.push(SkippedEntry {
                        path,
                        reason: format!("larger than {}", format_bytes(self.filter.get_max_file_size())),
                    });
                    continue;
                }
            }

            if entry.enclosed_name().is_none() {
                log::warn!("Skipping entry with unsafe path: {}", path);
                result.skipped.push(SkippedEntry {
                    path,
                    reason: "unsafe path".to_string(),
                });
                continue;
            }

            result.entries.push(ArchiveEntry::new(index, &path, entry.size()));
        }

        Ok(result)
    }

    pub fn get_statistics(&self, entries: &[ArchiveEntry]) -> ScanStatistics {
        let total_files = entries.len();
        let total_size = entries.iter().map(|e| e.size).sum();

        let mut files_by_extension = BTreeMap::new();
        for entry in entries {
            *files_by_extension.entry(entry.extension.clone()).or_insert(0) += 1;
        }

        let folders = entries
            .iter()
            .map(|e| e.folder.as_str())
            .collect::<std::collections::BTreeSet<_>>()
            .len();

        let (largest_file_size, largest_file_path) = entries
            .iter()
            .max_by_key(|e| e.size)
            .map(|e| (e.size, e.path.clone()))
            .unwrap_or((0, String::new()));

        ScanStatistics {
            total_files,
            total_size,
            folders,
            files_by_extension,
            largest_file_size,
            largest_file_path,
        }
    }
}

#[derive(Debug, Default)]
pub struct ScanStatistics {
    pub total_files: usize,
    pub total_size: u64,
    pub folders: usize,
    pub files_by_extension: BTreeMap<String, usize>,
    pub largest_file_size: u64,
    pub largest_file_path: String,
}

impl ScanStatistics {
    pub fn display_summary(&self) -> String {
        let mut summary = format!(
            "Scan Results:\n  Selected files: {}\n  Total size: {}\n  Folders: {}\n",
            self.total_files,
            format_bytes(self.total_size),
            self.folders
        );

        if !self.files_by_extension.is_empty() {
            summary.push_str("  Files by type:\n");
            for (ext, count) in &self.files_by_extension {
                summary.push_str(&format!("    {}: {} files\n", ext, count));
            }
        }

        if self.largest_file_size > 0 {
            summary.push_str(&format!(
                "  Largest file: {} ({})\n",
                self.largest_file_path,
                format_bytes(self.largest_file_size)
            ));
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::scanner::FileTypeCategory;
    use crate::test_support::build_zip;

    fn scanner_for(category: FileTypeCategory) -> ArchiveScanner {
        scanner_with(category, FilterConfig::default())
    }

    fn scanner_with(category: FileTypeCategory, config: FilterConfig) -> ArchiveScanner {
        ArchiveScanner::new(FileFilter::new(category, &config).unwrap())
    }

    #[test]
    fn test_archive_entry_creation() {
        let entry = ArchiveEntry::new(3, "Course/Abigail Miller_1/Report.XLSX", 100);

        assert_eq!(entry.file_name, "Report.XLSX");
        assert_eq!(entry.extension, "xlsx");
        assert_eq!(entry.folder, "Course/Abigail Miller_1");
        assert_eq!(entry.folder_name(), "Abigail Miller_1");
        assert_eq!(entry.size, 100);
    }

    #[test]
    fn test_scan_selects_matching_entries_in_order() {
        let data = build_zip(&[
            ("Abigail Miller_1/", b""),
            ("Abigail Miller_1/assignsubmission_file_report.xlsx", b"xlsx-a"),
            ("Abigail Miller_1/notes.pdf", b"pdf"),
            ("Ben Ode_2/grades.XLS", b"xls-b"),
            ("top.xlsx", b"root"),
        ]);
        let mut archive = open_archive(&data).unwrap();

        let result = scanner_for(FileTypeCategory::Excel).scan(&mut archive).unwrap();

        assert_eq!(result.total_entries, 5);
        let paths: Vec<_> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            vec![
                "Abigail Miller_1/assignsubmission_file_report.xlsx",
                "Ben Ode_2/grades.XLS",
                "top.xlsx"
            ]
        );
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_scan_reports_excluded_entries() {
        let data = build_zip(&[
            ("__MACOSX/A B_1/._report.docx", b"fork"),
            ("A B_1/report.docx", b"doc"),
        ]);
        let mut archive = open_archive(&data).unwrap();
        let config = FilterConfig {
            exclude_patterns: vec![r"(^|/)__MACOSX/".to_string()],
            ..FilterConfig::default()
        };

        let result = scanner_with(FileTypeCategory::Word, config)
            .scan(&mut archive)
            .unwrap();

        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].path, "__MACOSX/A B_1/._report.docx");
        assert_eq!(result.skipped[0].reason, "matches an exclude pattern");
    }

    #[test]
    fn test_default_scan_keeps_platform_junk() {
        let data = build_zip(&[
            ("Ann Lee_1/~$grades.xlsx", b"lock"),
            ("__MACOSX/notes.xlsx", b"notes"),
        ]);
        let mut archive = open_archive(&data).unwrap();

        let result = scanner_for(FileTypeCategory::Excel).scan(&mut archive).unwrap();

        let paths: Vec<_> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["Ann Lee_1/~$grades.xlsx", "__MACOSX/notes.xlsx"]);
        assert!(result.skipped.is_empty());
    }

    #[test]
    fn test_scan_skips_unsafe_paths() {
        let data = build_zip(&[
            ("../evil.xlsx", b"evil"),
            ("Ann Lee_1/../../evil2.xlsx", b"evil"),
            ("Ann Lee_1/grades.xlsx", b"ok"),
        ]);
        let mut archive = open_archive(&data).unwrap();

        let result = scanner_for(FileTypeCategory::Excel).scan(&mut archive).unwrap();

        let paths: Vec<_> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["Ann Lee_1/grades.xlsx"]);

        let skipped: Vec<_> = result.skipped.iter().map(|s| s.path.as_str()).collect();
        assert_eq!(skipped, vec!["../evil.xlsx", "Ann Lee_1/../../evil2.xlsx"]);
        assert!(result.skipped.iter().all(|s| s.reason == "unsafe path"));
    }

    #[test]
    fn test_scan_skips_entries_over_the_declared_size_limit() {
        let big = vec![b'x'; 4096];
        let data = build_zip(&[
            ("Ann Lee_1/big.xlsx", big.as_slice()),
            ("Ann Lee_1/small.xlsx", b"small"),
        ]);
        let mut archive = open_archive(&data).unwrap();
        let config = FilterConfig {
            max_file_size: 1024,
            ..FilterConfig::default()
        };

        let result = scanner_with(FileTypeCategory::Excel, config)
            .scan(&mut archive)
            .unwrap();

        let paths: Vec<_> = result.entries.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, vec!["Ann Lee_1/small.xlsx"]);
        assert_eq!(result.skipped.len(), 1);
        assert_eq!(result.skipped[0].path, "Ann Lee_1/big.xlsx");
        assert!(result.skipped[0].reason.starts_with("larger than"));
    }

    #[test]
    fn test_folder_groups() {
        let data = build_zip(&[
            ("A B_1/one.pptx", b"1"),
            ("C D_2/two.pptx", b"2"),
            ("A B_1/three.ppt", b"3"),
            ("root.pptx", b"4"),
        ]);
        let mut archive = open_archive(&data).unwrap();
        let result = scanner_for(FileTypeCategory::PowerPoint).scan(&mut archive).unwrap();

        let groups = result.folder_groups();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups["A B_1"].len(), 2);
        assert_eq!(groups["C D_2"].len(), 1);
        assert_eq!(groups[""].len(), 1);
    }

    #[test]
    fn test_invalid_archive() {
        let result = open_archive(b"this is not a zip file");
        assert!(matches!(result, Err(OfficeExtractError::InvalidArchive { .. })));
    }

    #[test]
    fn test_scan_statistics() {
        let entries = vec![
            ArchiveEntry::new(0, "A B_1/a.docx", 100),
            ArchiveEntry::new(1, "A B_1/b.doc", 300),
            ArchiveEntry::new(2, "C D_2/c.docx", 200),
        ];

        let stats = scanner_for(FileTypeCategory::Word).get_statistics(&entries);

        assert_eq!(stats.total_files, 3);
        assert_eq!(stats.total_size, 600);
        assert_eq!(stats.folders, 2);
        assert_eq!(stats.files_by_extension["docx"], 2);
        assert_eq!(stats.largest_file_path, "A B_1/b.doc");
        assert!(stats.display_summary().contains("Selected files: 3"));
    }
}
