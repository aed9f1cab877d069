use crate::config::FilterConfig;
use crate::error::Result;
use crate::scanner::category::FileTypeCategory;
use regex::Regex;

/// Why an entry was left out of the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    DirectoryMarker,
    WrongType,
    Excluded,
    TooLarge,
}

pub struct FileFilter {
    category: FileTypeCategory,
    max_file_size: u64,
    exclude_patterns: Vec<Regex>,
}

impl FileFilter {
    pub fn new(category: FileTypeCategory, config: &FilterConfig) -> Result<Self> {
        let exclude_patterns = config
            .exclude_patterns
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(Self {
            category,
            max_file_size: config.max_file_size,
            exclude_patterns,
        })
    }

    /// Core selection rule: the lowercased path ends with one of the
    /// category's extensions and the entry has a non-empty base name.
    /// Excludes and the size limit are applied after that.
    pub fn check(&self, path: &str, size: u64) -> std::result::Result<(), Rejection> {
        if base_name(path).is_empty() {
            return Err(Rejection::DirectoryMarker);
        }

        if !self.category.matches(path) {
            return Err(Rejection::WrongType);
        }

        if self.matches_any_pattern(path) {
            return Err(Rejection::Excluded);
        }

        if !self.is_size_allowed(size) {
            return Err(Rejection::TooLarge);
        }

        Ok(())
    }

    fn is_size_allowed(&self, size: u64) -> bool {
        size <= self.max_file_size
    }

    fn matches_any_pattern(&self, text: &str) -> bool {
        self.exclude_patterns
            .iter()
            .any(|pattern| pattern.is_match(text))
    }

    pub fn get_max_file_size(&self) -> u64 {
        self.max_file_size
    }
}

/// Last component of a `/`-separated archive path; empty for directory markers.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or("")
}

/// Everything before the last separator; empty for root-level entries.
pub fn folder_path(path: &str) -> &str {
    match path.rfind(['/', '\\']) {
        Some(idx) => &path[..idx],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PLATFORM_JUNK_PATTERNS;

    fn create_test_config() -> FilterConfig {
        FilterConfig {
            max_file_size: 1024 * 1024, // 1MB
            exclude_patterns: PLATFORM_JUNK_PATTERNS.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn default_filter(category: FileTypeCategory) -> FileFilter {
        FileFilter::new(category, &FilterConfig::default()).unwrap()
    }

    #[test]
    fn test_selection_by_extension() {
        let filter = FileFilter::new(FileTypeCategory::Word, &create_test_config()).unwrap();

        let paths = [
            "Abigail Miller_1/essay.docx",
            "Abigail Miller_1/essay.pdf",
            "Ben Ode_2/OLD.DOC",
            "notes.txt",
            "root.Docx",
        ];
        let selected: Vec<&str> = paths
            .iter()
            .copied()
            .filter(|path| filter.check(path, 1).is_ok())
            .collect();

        assert_eq!(
            selected,
            vec!["Abigail Miller_1/essay.docx", "Ben Ode_2/OLD.DOC", "root.Docx"]
        );
    }

    #[test]
    fn test_directory_markers_are_rejected() {
        let filter = default_filter(FileTypeCategory::Excel);

        assert_eq!(filter.check("folder.xlsx/", 0), Err(Rejection::DirectoryMarker));
        assert_eq!(filter.check("folder/", 0), Err(Rejection::DirectoryMarker));
        assert_eq!(filter.check("", 0), Err(Rejection::DirectoryMarker));
    }

    #[test]
    fn test_excluded_patterns() {
        let filter = FileFilter::new(FileTypeCategory::Excel, &create_test_config()).unwrap();

        assert_eq!(filter.check("__MACOSX/A B_1/._grades.xlsx", 10), Err(Rejection::Excluded));
        assert_eq!(filter.check("A B_1/~$grades.xlsx", 10), Err(Rejection::Excluded));
        assert_eq!(filter.check("A B_1/._grades.xlsx", 10), Err(Rejection::Excluded));
        assert_eq!(filter.check("A B_1/grades.xlsx", 10), Ok(()));
    }

    #[test]
    fn test_default_filter_excludes_nothing() {
        let filter = default_filter(FileTypeCategory::Excel);

        assert_eq!(filter.check("Ann Lee_1/~$grades.xlsx", 10), Ok(()));
        assert_eq!(filter.check("__MACOSX/notes.xlsx", 10), Ok(()));
        assert_eq!(filter.check("A B_1/._grades.xlsx", 10), Ok(()));
    }

    #[test]
    fn test_size_limits() {
        let filter = FileFilter::new(FileTypeCategory::Excel, &create_test_config()).unwrap();

        assert!(filter.is_size_allowed(1024));
        assert!(filter.is_size_allowed(1024 * 1024));
        assert_eq!(filter.check("big.xlsx", 2 * 1024 * 1024), Err(Rejection::TooLarge));
    }

    #[test]
    fn test_wrong_type() {
        let filter = default_filter(FileTypeCategory::PowerPoint);
        assert_eq!(filter.check("slides.key", 1), Err(Rejection::WrongType));
        assert_eq!(filter.check("slides.PPTX", 1), Ok(()));
    }

    #[test]
    fn test_invalid_pattern_is_an_error() {
        let config = FilterConfig {
            max_file_size: 1,
            exclude_patterns: vec!["[".to_string()],
        };
        assert!(FileFilter::new(FileTypeCategory::Word, &config).is_err());
    }

    #[test]
    fn test_path_helpers() {
        assert_eq!(base_name("a/b/c.xlsx"), "c.xlsx");
        assert_eq!(base_name("c.xlsx"), "c.xlsx");
        assert_eq!(base_name("a/b/"), "");
        assert_eq!(folder_path("a/b/c.xlsx"), "a/b");
        assert_eq!(folder_path("c.xlsx"), "");
    }
}
