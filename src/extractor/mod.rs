pub mod file_extractor;
pub mod output_manager;
pub mod repackager;
pub mod workspace;

pub use file_extractor::{ExtractedFile, ExtractionProgress, FileOperations};
pub use output_manager::{ConfigSnapshot, ExtractionPlan, ExtractionReport, FileInfo, OutputManager, RunRecord};
pub use repackager::{CollisionPolicy, NameCollision, PlannedEntry, RepackagedArchive, Repackager};
pub use workspace::ScratchSpace;
