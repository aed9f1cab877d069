use crate::config::{NamingConfig, DEFAULT_SUBMISSION_INFIX};
use crate::naming::student_name::StudentName;
use crate::scanner::file_filter::base_name;

/// Maps (folder name, original file name) to the name stored in the output archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenameRule {
    enabled: bool,
    infix: String,
}

impl RenameRule {
    pub fn new(config: &NamingConfig) -> Self {
        if !config.rename {
            return Self::disabled();
        }

        Self {
            enabled: config.rename,
            infix: config.submission_infix.clone(),
        }
    }

    /// Rule that keeps base names untouched.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            infix: String::new(),
        }
    }

    /// Removes every occurrence of the submission infix.
    pub fn clean_file_name(&self, file_name: &str) -> String {
        if self.infix.is_empty() {
            file_name.to_string()
        } else {
            file_name.replace(&self.infix, "")
        }
    }

    /// `{student}_{cleaned file name}`; root entries have an empty student part.
    pub fn final_name(&self, folder_name: &str, file_name: &str) -> String {
        if !self.enabled {
            return file_name.to_string();
        }

        let student = StudentName::parse(folder_name);
        if !student.is_matched() && !folder_name.is_empty() {
            log::debug!("Folder '{}' does not look like a student name; using it as is", folder_name);
        }
        format!("{}_{}", student.as_str(), self.clean_file_name(file_name))
    }

    /// Applies the rule to a full archive path.
    pub fn final_name_for_path(&self, archive_path: &str) -> String {
        let folder = crate::scanner::file_filter::folder_path(archive_path);
        self.final_name(base_name(folder), base_name(archive_path))
    }
}

impl Default for RenameRule {
    fn default() -> Self {
        Self {
            enabled: true,
            infix: DEFAULT_SUBMISSION_INFIX.to_string(),
        }
    }
}
