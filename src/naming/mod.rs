pub mod rename_rule;
pub mod student_name;

pub use rename_rule::RenameRule;
pub use student_name::StudentName;
