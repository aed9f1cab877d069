//! Writes renamed entries into a fresh, flat ZIP archive.

use crate::error::{OfficeExtractError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Seek, Write};
use std::path::PathBuf;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

/// What happens when two entries resolve to the same output name.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionPolicy {
    /// The later entry replaces the earlier one
    #[default]
    LastWriteWins,
    /// Abort the run
    FailFast,
    /// Keep both, numbering the later one `name (2).ext`
    Number,
}

impl fmt::Display for CollisionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollisionPolicy::LastWriteWins => f.write_str("last-write-wins"),
            CollisionPolicy::FailFast => f.write_str("fail-fast"),
            CollisionPolicy::Number => f.write_str("number"),
        }
    }
}

/// One (extracted-entry-path, final-name) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
    pub source: PathBuf,
    pub final_name: String,
    pub archive_path: String,
}

impl PlannedEntry {
    pub fn new(source: PathBuf, final_name: String, archive_path: String) -> Self {
        Self {
            source,
            final_name,
            archive_path,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameCollision {
    pub name: String,
    pub first: String,
    pub second: String,
    /// Name the second entry was stored under, if it was kept.
    pub stored_as: Option<String>,
}

#[derive(Debug)]
pub struct RepackagedArchive {
    pub bytes: Vec<u8>,
    pub entries: Vec<PlannedEntry>,
    pub collisions: Vec<NameCollision>,
    pub bytes_written: u64,
}

pub struct Repackager {
    policy: CollisionPolicy,
    compression_level: u8,
}

impl Repackager {
    pub fn new(policy: CollisionPolicy, compression_level: u8) -> Self {
        Self {
            policy,
            compression_level: compression_level.min(9),
        }
    }

    /// Makes final names unique according to the collision policy, keeping input order.
    pub fn resolve_names(
        &self,
        planned: Vec<PlannedEntry>,
    ) -> Result<(Vec<PlannedEntry>, Vec<NameCollision>)> {
        let mut resolved: Vec<PlannedEntry> = Vec::with_capacity(planned.len());
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut collisions = Vec::new();

        for entry in planned {
            let existing = positions.get(&entry.final_name).copied();
            let Some(existing) = existing else {
                positions.insert(entry.final_name.clone(), resolved.len());
                resolved.push(entry);
                continue;
            };

            let first = resolved[existing].archive_path.clone();
            match self.policy {
                CollisionPolicy::FailFast => {
                    return Err(OfficeExtractError::NameCollision {
                        name: entry.final_name,
                        first,
                        second: entry.archive_path,
                    });
                }
                CollisionPolicy::LastWriteWins => {
                    log::warn!(
                        "'{}' and '{}' both resolve to '{}'; keeping the later entry",
                        first,
                        entry.archive_path,
                        entry.final_name
                    );
                    collisions.push(NameCollision {
                        name: entry.final_name.clone(),
                        first,
                        second: entry.archive_path.clone(),
                        stored_as: Some(entry.final_name.clone()),
                    });
                    resolved[existing] = entry;
                }
                CollisionPolicy::Number => {
                    let numbered = next_free_name(&entry.final_name, &positions);
                    log::warn!(
                        "'{}' and '{}' both resolve to '{}'; storing the later entry as '{}'",
                        first,
                        entry.archive_path,
                        entry.final_name,
                        numbered
                    );
                    collisions.push(NameCollision {
                        name: entry.final_name.clone(),
                        first,
                        second: entry.archive_path.clone(),
                        stored_as: Some(numbered.clone()),
                    });
                    positions.insert(numbered.clone(), resolved.len());
                    resolved.push(PlannedEntry {
                        final_name: numbered,
                        ..entry
                    });
                }
            }
        }

        Ok((resolved, collisions))
    }

    /// Resolves names and builds the output archive in memory.
    pub fn repackage(&self, planned: Vec<PlannedEntry>) -> Result<RepackagedArchive> {
        let (entries, collisions) = self.resolve_names(planned)?;
        let (cursor, bytes_written) = self.write_archive(Cursor::new(Vec::new()), &entries)?;

        Ok(RepackagedArchive {
            bytes: cursor.into_inner(),
            entries,
            collisions,
            bytes_written,
        })
    }

    /// Writes already-unique entries to `writer`; returns it with the content byte count.
    pub fn write_archive<W: Write + Seek>(
        &self,
        writer: W,
        entries: &[PlannedEntry],
    ) -> Result<(W, u64)> {
        let mut zip = ZipWriter::new(writer);
        let options = self.file_options();
        let mut buffer = vec![0u8; 64 * 1024]; // 64 KB
        let mut bytes_written = 0u64;

        for entry in entries {
            let mut source = File::open(&entry.source)?;
            zip.start_file(entry.final_name.as_str(), options)?;

            loop {
                let bytes_read = source.read(&mut buffer)?;
                if bytes_read == 0 {
                    break;
                }
                zip.write_all(&buffer[..bytes_read])?;
                bytes_written += bytes_read as u64;
            }

            log::debug!("Stored {} as {}", entry.archive_path, entry.final_name);
        }

        let writer = zip.finish()?;
        Ok((writer, bytes_written))
    }

    /// Fixed timestamp and permissions so identical input gives identical bytes.
    fn file_options(&self) -> SimpleFileOptions {
        let options = SimpleFileOptions::default()
            .last_modified_time(DateTime::default())
            .unix_permissions(0o644);

        if self.compression_level == 0 {
            options.compression_method(CompressionMethod::Stored)
        } else {
            options
                .compression_method(CompressionMethod::Deflated)
                .compression_level(Some(i64::from(self.compression_level)))
        }
    }
}

impl Default for Repackager {
    fn default() -> Self {
        Self::new(CollisionPolicy::default(), 6)
    }
}

fn next_free_name(name: &str, taken: &HashMap<String, usize>) -> String {
    let (stem, ext) = match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    };

    let mut counter = 2;
    loop {
        let candidate = format!("{} ({}){}", stem, counter, ext);
        if !taken.contains_key(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}
