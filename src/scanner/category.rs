use crate::error::{OfficeExtractError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The office document families that can be pulled out of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FileTypeCategory {
    /// Spreadsheets (.xlsx, .xls)
    Excel,
    /// Word-processor documents (.docx, .doc)
    Word,
    /// Presentations (.pptx, .ppt)
    #[value(name = "powerpoint", alias = "ppt")]
    PowerPoint,
}

impl FileTypeCategory {
    pub const ALL: [FileTypeCategory; 3] = [
        FileTypeCategory::Excel,
        FileTypeCategory::Word,
        FileTypeCategory::PowerPoint,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            FileTypeCategory::Excel => "Excel Files",
            FileTypeCategory::Word => "Word Files",
            FileTypeCategory::PowerPoint => "PowerPoint Files",
        }
    }

    /// Dot-prefixed, lowercase extensions accepted for this category.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            FileTypeCategory::Excel => &[".xlsx", ".xls"],
            FileTypeCategory::Word => &[".docx", ".doc"],
            FileTypeCategory::PowerPoint => &[".pptx", ".ppt"],
        }
    }

    /// Case-insensitive suffix match against the full entry path.
    pub fn matches(&self, path: &str) -> bool {
        let lowered = path.to_lowercase();
        self.extensions().iter().any(|ext| lowered.ends_with(ext))
    }

    /// `extracted_excel_files.zip` and friends.
    pub fn default_output_name(&self) -> String {
        format!("extracted_{}.zip", self.label().to_lowercase().replace(' ', "_"))
    }

    pub fn success_message(&self) -> String {
        format!("{} have been extracted successfully!", self.label())
    }
}

impl fmt::Display for FileTypeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FileTypeCategory {
    type Err = OfficeExtractError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase();
        match normalized.as_str() {
            "excel" | "excel files" | "xlsx" | "xls" => Ok(FileTypeCategory::Excel),
            "word" | "word files" | "docx" | "doc" => Ok(FileTypeCategory::Word),
            "powerpoint" | "powerpoint files" | "ppt" | "pptx" => Ok(FileTypeCategory::PowerPoint),
            _ => Err(OfficeExtractError::UnknownCategory {
                name: s.to_string(),
            }),
        }
    }
}
