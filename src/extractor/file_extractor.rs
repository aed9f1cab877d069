use crate::error::{OfficeExtractError, Result};
use crate::extractor::workspace::ScratchSpace;
use crate::scanner::file_filter::base_name;
use crate::scanner::ArchiveEntry;
use std::fs;
use std::io::{BufWriter, Read, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use zip::ZipArchive;

#[derive(Debug, Clone)]
pub struct ExtractionProgress {
    pub files_processed: usize,
    pub total_files: usize,
    pub bytes_processed: u64,
    pub total_bytes: u64,
    pub current_file: Option<String>,
    pub start_time: Instant,
}

impl ExtractionProgress {
    pub fn new(total_files: usize, total_bytes: u64) -> Self {
        Self {
            files_processed: 0,
            total_files,
            bytes_processed: 0,
            total_bytes,
            current_file: None,
            start_time: Instant::now(),
        }
    }

    pub fn update_file(&mut self, filename: String, bytes: u64) {
        self.files_processed += 1;
        self.bytes_processed += bytes;
        self.current_file = Some(filename);
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn estimated_remaining(&self) -> Duration {
        if self.files_processed == 0 {
            return Duration::from_secs(0);
        }

        let elapsed = self.elapsed();
        let rate = self.files_processed as f64 / elapsed.as_secs_f64();
        let remaining_files = self.total_files.saturating_sub(self.files_processed);

        if rate > 0.0 {
            Duration::from_secs_f64(remaining_files as f64 / rate)
        } else {
            Duration::from_secs(0)
        }
    }
}

/// A selected entry after it has been written to the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedFile {
    pub archive_path: String,
    pub scratch_path: PathBuf,
    pub folder: String,
    pub file_name: String,
    pub size: u64,
}

impl ExtractedFile {
    pub fn folder_name(&self) -> &str {
        base_name(&self.folder)
    }
}

pub struct FileOperations {
    buffer_size: usize,
    max_file_size: u64,
}

impl FileOperations {
    pub fn new() -> Self {
        Self {
            buffer_size: 64 * 1024, // 64KB buffer
            max_file_size: u64::MAX,
        }
    }

    pub fn with_max_file_size(mut self, max_size: u64) -> Self {
        self.max_file_size = max_size;
        self
    }

    /// Materializes every selected entry under `scratch`. The first failure aborts.
    pub fn extract_entries<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entries: &[ArchiveEntry],
        scratch: &ScratchSpace,
        progress_callback: Option<&dyn Fn(&ExtractionProgress)>,
    ) -> Result<(Vec<ExtractedFile>, ExtractionProgress)> {
        let total_bytes = entries.iter().map(|e| e.size).sum();
        let mut progress = ExtractionProgress::new(entries.len(), total_bytes);
        let mut extracted = Vec::with_capacity(entries.len());

        for entry in entries {
            if let Some(callback) = progress_callback {
                callback(&progress);
            }

            let file = self.extract_entry(archive, entry, scratch)?;
            progress.update_file(entry.file_name.clone(), file.size);
            extracted.push(file);
        }

        if let Some(callback) = progress_callback {
            callback(&progress);
        }

        Ok((extracted, progress))
    }

    fn extract_entry<R: Read + Seek>(
        &self,
        archive: &mut ZipArchive<R>,
        entry: &ArchiveEntry,
        scratch: &ScratchSpace,
    ) -> Result<ExtractedFile> {
        let mut zip_file = archive.by_index(entry.index)?;

        if zip_file.enclosed_name().is_none() || entry.file_name.is_empty() {
            return Err(OfficeExtractError::InvalidPath {
                path: format!("Unsafe entry path: {}", entry.path),
            });
        }

        // One directory per entry index, so a file can never shadow another entry's folder.
        let dest = scratch.resolve(&Path::new(&entry.index.to_string()).join(&entry.file_name))?;

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let size = self.copy_limited(&mut zip_file, &dest)?;
        log::debug!("Extracted {} ({} bytes) to {}", entry.path, size, dest.display());

        Ok(ExtractedFile {
            archive_path: entry.path.clone(),
            scratch_path: dest,
            folder: entry.folder.clone(),
            file_name: entry.file_name.clone(),
            size,
        })
    }

    /// Copies at most `max_file_size` bytes; declared sizes in the archive are not trusted.
    fn copy_limited<R: Read>(&self, reader: &mut R, dest: &Path) -> Result<u64> {
        let dest_file = fs::File::create(dest)?;
        let mut writer = BufWriter::with_capacity(self.buffer_size, dest_file);

        let mut total_bytes = 0u64;
        let mut buffer = vec![0u8; 8192]; // 8KB chunks

        loop {
            let bytes_read = reader
                .read(&mut buffer)
                .map_err(OfficeExtractError::from_archive_read)?;
            if bytes_read == 0 {
                break;
            }

            total_bytes += bytes_read as u64;
            if total_bytes > self.max_file_size {
                return Err(OfficeExtractError::FileTooLarge {
                    size: total_bytes,
                    max_size: self.max_file_size,
                });
            }

            writer.write_all(&buffer[..bytes_read])?;
        }

        writer.flush()?;
        Ok(total_bytes)
    }
}

impl Default for FileOperations {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::scanner::{open_archive, ArchiveScanner, FileFilter, FileTypeCategory};
    use crate::test_support::build_zip;

    fn scan(data: &[u8], category: FileTypeCategory) -> Vec<ArchiveEntry> {
        let mut archive = open_archive(data).unwrap();
        let scanner = ArchiveScanner::new(FileFilter::new(category, &FilterConfig::default()).unwrap());
        scanner.scan(&mut archive).unwrap().entries
    }

    #[test]
    fn test_entries_are_materialized_with_original_content() {
        let data = build_zip(&[
            ("Abigail Miller_1/assignsubmission_file_report.xlsx", b"sheet-bytes"),
            ("Abigail Miller_1/readme.txt", b"ignored"),
            ("root.xls", b"legacy"),
        ]);
        let entries = scan(&data, FileTypeCategory::Excel);
        let scratch = ScratchSpace::acquire(None).unwrap();
        let mut archive = open_archive(&data).unwrap();

        let (extracted, progress) = FileOperations::new()
            .extract_entries(&mut archive, &entries, &scratch, None)
            .unwrap();

        assert_eq!(extracted.len(), 2);
        assert_eq!(progress.files_processed, 2);
        assert_eq!(progress.bytes_processed, 17);

        assert_eq!(extracted[0].folder_name(), "Abigail Miller_1");
        assert_eq!(fs::read(&extracted[0].scratch_path).unwrap(), b"sheet-bytes");
        assert!(extracted[0].scratch_path.starts_with(scratch.path()));

        assert_eq!(extracted[1].folder_name(), "");
        assert_eq!(fs::read(&extracted[1].scratch_path).unwrap(), b"legacy");
    }

    #[test]
    fn test_oversized_entry_aborts() {
        let data = build_zip(&[("big.docx", &[7u8; 4096])]);
        let entries = scan(&data, FileTypeCategory::Word);
        let scratch = ScratchSpace::acquire(None).unwrap();
        let mut archive = open_archive(&data).unwrap();

        let result = FileOperations::new()
            .with_max_file_size(1024)
            .extract_entries(&mut archive, &entries, &scratch, None);

        assert!(matches!(result, Err(OfficeExtractError::FileTooLarge { max_size: 1024, .. })));
    }

    #[test]
    fn test_progress_callback_is_invoked() {
        let data = build_zip(&[("a.pptx", b"a"), ("b.pptx", b"b")]);
        let entries = scan(&data, FileTypeCategory::PowerPoint);
        let scratch = ScratchSpace::acquire(None).unwrap();
        let mut archive = open_archive(&data).unwrap();

        let calls = std::cell::Cell::new(0);
        let callback = |_: &ExtractionProgress| calls.set(calls.get() + 1);

        FileOperations::new()
            .extract_entries(&mut archive, &entries, &scratch, Some(&callback))
            .unwrap();

        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_progress_tracking() {
        let mut progress = ExtractionProgress::new(10, 1000);

        assert_eq!(progress.estimated_remaining(), Duration::from_secs(0));

        progress.update_file("file1.xlsx".to_string(), 100);
        assert_eq!(progress.bytes_processed, 100);
        assert_eq!(progress.files_processed, 1);
        assert_eq!(progress.current_file.as_deref(), Some("file1.xlsx"));
    }

    #[test]
    fn test_file_and_folder_with_the_same_path() {
        let data = build_zip(&[
            ("Ann Lee_1/a.xlsx", b"one"),
            ("Ann Lee_1/a.xlsx/b.xlsx", b"two"),
        ]);
        let entries = scan(&data, FileTypeCategory::Excel);
        assert_eq!(entries.len(), 2);
        let scratch = ScratchSpace::acquire(None).unwrap();
        let mut archive = open_archive(&data).unwrap();

        let (extracted, _) = FileOperations::new()
            .extract_entries(&mut archive, &entries, &scratch, None)
            .unwrap();

        assert_eq!(extracted.len(), 2);
        assert_eq!(fs::read(&extracted[0].scratch_path).unwrap(), b"one");
        assert_eq!(fs::read(&extracted[1].scratch_path).unwrap(), b"two");
        assert_eq!(extracted[1].folder_name(), "a.xlsx");
    }

    #[test]
    fn test_corrupt_entry_data_is_an_invalid_archive() {
        let content: Vec<u8> = (0..400)
            .flat_map(|i| format!("row {} value {}\n", i, i * 37 % 101).into_bytes())
            .collect();
        let mut data = build_zip(&[("Ann Lee_1/grades.xlsx", content.as_slice())]);

        // Local file header: fixed 30 bytes, then name and extra field, then the data.
        let le16 = |at: usize| u16::from_le_bytes([data[at], data[at + 1]]) as usize;
        let compressed_size =
            u32::from_le_bytes([data[18], data[19], data[20], data[21]]) as usize;
        let data_start = 30 + le16(26) + le16(28);
        data[data_start + compressed_size / 2] ^= 0xFF;

        let entries = scan(&data, FileTypeCategory::Excel);
        let scratch = ScratchSpace::acquire(None).unwrap();
        let mut archive = open_archive(&data).unwrap();

        let result = FileOperations::new().extract_entries(&mut archive, &entries, &scratch, None);

        assert!(matches!(result, Err(OfficeExtractError::InvalidArchive { .. })));
    }
}
