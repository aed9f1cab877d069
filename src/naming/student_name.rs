//! Folder-name to student-name derivation.
//!
//! Submission systems name each student's folder like
//! `Abigail Miller_12345_assignsubmission_file_`. The student name is the
//! first two word tokens of that folder name.

use std::fmt;

/// Outcome of tokenizing a folder name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StudentName {
    /// Two tokens were found; holds them joined by `_`.
    Matched(String),
    /// No two-token prefix; holds the folder name unchanged.
    Unmatched(String),
}

impl StudentName {
    pub fn parse(folder_name: &str) -> Self {
        match leading_two_tokens(folder_name) {
            Some((first, second)) => {
                StudentName::Matched(format!("{}_{}", first, second).replace(' ', "_"))
            }
            None => StudentName::Unmatched(folder_name.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            StudentName::Matched(name) | StudentName::Unmatched(name) => name,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, StudentName::Matched(_))
    }
}

impl fmt::Display for StudentName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_token_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '\''
}

fn is_separator(c: char) -> bool {
    c == '_' || c.is_whitespace()
}

/// Splits `input` into `first SEP+ second ...` and returns both tokens.
fn leading_two_tokens(input: &str) -> Option<(&str, &str)> {
    let first_len = token_len(input);
    if first_len == 0 {
        return None;
    }
    let rest = &input[first_len..];

    let sep_len: usize = rest
        .chars()
        .take_while(|c| is_separator(*c))
        .map(char::len_utf8)
        .sum();
    if sep_len == 0 {
        return None;
    }
    let rest = &rest[sep_len..];

    let second_len = token_len(rest);
    if second_len == 0 {
        return None;
    }

    Some((&input[..first_len], &rest[..second_len]))
}

fn token_len(input: &str) -> usize {
    input
        .chars()
        .take_while(|c| is_token_char(*c))
        .map(char::len_utf8)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_submission_folder() {
        let name = StudentName::parse("Abigail Miller_assignsubmission_file_12345");
        assert_eq!(name, StudentName::Matched("Abigail_Miller".to_string()));
    }

    #[test]
    fn test_underscore_separated() {
        assert_eq!(StudentName::parse("Abigail_Miller_12345").as_str(), "Abigail_Miller");
        assert_eq!(StudentName::parse("Abigail Miller").as_str(), "Abigail_Miller");
        assert_eq!(StudentName::parse("Abigail  Miller").as_str(), "Abigail_Miller");
    }

    #[test]
    fn test_names_with_punctuation_and_accents() {
        assert_eq!(
            StudentName::parse("Jean-Luc O'Brien_991_assignsubmission_file_").as_str(),
            "Jean-Luc_O'Brien"
        );
        assert_eq!(StudentName::parse("José Núñez_7").as_str(), "José_Núñez");
    }

    #[test]
    fn test_unmatched_folder_names() {
        assert_eq!(
            StudentName::parse("Submissions"),
            StudentName::Unmatched("Submissions".to_string())
        );
        assert_eq!(
            StudentName::parse("_leading"),
            StudentName::Unmatched("_leading".to_string())
        );
        assert_eq!(
            StudentName::parse("trailing_"),
            StudentName::Unmatched("trailing_".to_string())
        );
        assert!(!StudentName::parse("week.1").is_matched());
    }

    #[test]
    fn test_empty_folder_name() {
        let name = StudentName::parse("");
        assert_eq!(name, StudentName::Unmatched(String::new()));
        assert_eq!(name.as_str(), "");
    }
}
