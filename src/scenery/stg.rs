//! Placement index files (`.stg`): one per bucket, one line per object.
//!
//! A run owns the block between `# BEGIN <prefix>` and `# END <prefix>` in
//! every file it touches. Lines outside that block belong to other tools and
//! are kept as they are.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

use anyhow::{Context, anyhow};
use tracing::{debug, info};

use super::bucket::Bucket;

/// Top-level folder below the scenery root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SceneryKind {
    Objects,
    #[default]
    Roads,
}

impl SceneryKind {
    pub fn folder(self) -> &'static str {
        match self {
            SceneryKind::Objects => "Objects",
            SceneryKind::Roads => "Roads",
        }
    }
}

/// One placement line bound for a specific `.stg` file
#[derive(Debug, Clone, PartialEq)]
pub struct StgRecord {
    pub stg_path: PathBuf,
    pub line: String,
}

/// Collects placements for a scenery root and writes them out
#[derive(Debug)]
pub struct StgManager {
    root: PathBuf,
    prefix: String,
    pending: Vec<StgRecord>,
}

impl StgManager {
    pub fn new(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            prefix: prefix.into(),
            pending: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Register a static object and return the directory its file goes in
    ///
    /// The directory is created if needed. `position` is (lon, lat) in
    /// degrees, `elev` meters above sea level.
    pub fn add_object_static(
        &mut self,
        file: &str,
        position: (f64, f64),
        elev: f64,
        heading: f64,
        kind: SceneryKind,
    ) -> anyhow::Result<PathBuf> {
        let (lon, lat) = position;
        let bucket = Bucket::for_point(lon, lat);
        let dir = bucket.directory(&self.root, kind.folder());
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;

        self.pending.push(StgRecord {
            stg_path: bucket.stg_path(&self.root, kind.folder()),
            line: format!("OBJECT_STATIC {file} {lon:.7} {lat:.7} {elev:.2} {heading:.1}"),
        });
        debug!("placed {file} in bucket {bucket}");
        Ok(dir)
    }

    pub fn add(&mut self, record: StgRecord) {
        self.pending.push(record);
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn take_records(&mut self) -> Vec<StgRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Rewrite this run's block in every touched `.stg` file
    ///
    /// Returns the number of files written. Pending records are consumed.
    pub fn write(&mut self) -> anyhow::Result<usize> {
        let mut by_file: BTreeMap<PathBuf, Vec<String>> = BTreeMap::new();
        for record in self.take_records() {
            by_file.entry(record.stg_path).or_default().push(record.line);
        }

        for (path, lines) in &by_file {
            let existing = match fs::read_to_string(path) {
                Ok(s) => s,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
                Err(e) => return Err(e).with_context(|| format!("Failed to read {}", path.display())),
            };
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            fs::write(path, rewrite_block(&existing, &self.prefix, lines))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            debug!("wrote {} placements to {}", lines.len(), path.display());
        }
        Ok(by_file.len())
    }
}

/// Replace the `prefix` block of an `.stg` file with `lines`
pub fn rewrite_block(existing: &str, prefix: &str, lines: &[String]) -> String {
    let begin = format!("# BEGIN {prefix}");
    let end = format!("# END {prefix}");

    let mut out = String::new();
    let mut inside = false;
    for line in existing.lines() {
        let trimmed = line.trim();
        if trimmed == begin {
            inside = true;
        } else if trimmed == end {
            inside = false;
        } else if !inside {
            out.push_str(line);
            out.push('\n');
        }
    }

    out.push_str(&begin);
    out.push('\n');
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out.push_str(&end);
    out.push('\n');
    out
}

/// Single owner of the `.stg` files, fed by any number of producer threads
///
/// Records are gathered until every sender is dropped, then written once so
/// tiles sharing a bucket never overwrite each other's placements.
pub struct StgWriter {
    sender: Sender<StgRecord>,
    handle: JoinHandle<anyhow::Result<usize>>,
}

impl StgWriter {
    pub fn spawn(root: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
        let mut manager = StgManager::new(root, prefix);
        let (sender, receiver) = mpsc::channel::<StgRecord>();
        let handle = thread::spawn(move || {
            for record in receiver {
                manager.add(record);
            }
            let placements = manager.len();
            let files = manager.write()?;
            info!("Wrote {placements} placements to {files} stg files");
            Ok(files)
        });
        Self { sender, handle }
    }

    pub fn sender(&self) -> Sender<StgRecord> {
        self.sender.clone()
    }

    /// Close the channel and wait for the files to be written
    pub fn finish(self) -> anyhow::Result<usize> {
        drop(self.sender);
        self.handle
            .join()
            .map_err(|_| anyhow!("stg writer thread panicked"))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_rewrite_keeps_foreign_lines() {
        let existing = "OBJECT_SHARED tower.xml 7.1 47.1 400 0\n# BEGIN roads_\nOBJECT_STATIC old.ac 7 47 1 0\n# END roads_\n";
        let out = rewrite_block(existing, "roads_", &["OBJECT_STATIC new.ac 7 47 2 0".to_string()]);
        assert_eq!(
            out,
            "OBJECT_SHARED tower.xml 7.1 47.1 400 0\n# BEGIN roads_\nOBJECT_STATIC new.ac 7 47 2 0\n# END roads_\n"
        );
    }

    #[test]
    fn test_rewrite_other_prefix_untouched() {
        let existing = "# BEGIN buildings_\nOBJECT_STATIC b.ac 7 47 1 0\n# END buildings_\n";
        let out = rewrite_block(existing, "roads_", &[]);
        assert!(out.starts_with(existing));
        assert!(out.ends_with("# BEGIN roads_\n# END roads_\n"));
    }

    #[test]
    fn test_add_object_static() {
        let dir = tempdir().unwrap();
        let mut stg = StgManager::new(dir.path(), "roads_");
        let out = stg
            .add_object_static("roads_0.ac", (7.6, 47.55), 420.5, 0.0, SceneryKind::Roads)
            .unwrap();
        assert_eq!(out, dir.path().join("Roads/e000n40/e007n47"));
        assert!(out.is_dir());

        let records = stg.take_records();
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].line,
            "OBJECT_STATIC roads_0.ac 7.6000000 47.5500000 420.50 0.0"
        );
        assert!(stg.is_empty());
    }

    #[test]
    fn test_write_twice_replaces_block() {
        let dir = tempdir().unwrap();
        let mut stg = StgManager::new(dir.path(), "roads_");
        stg.add_object_static("a.ac", (7.6, 47.55), 1.0, 0.0, SceneryKind::Roads)
            .unwrap();
        assert_eq!(stg.write().unwrap(), 1);
        stg.add_object_static("b.ac", (7.6, 47.55), 1.0, 0.0, SceneryKind::Roads)
            .unwrap();
        stg.write().unwrap();

        let path = Bucket::for_point(7.6, 47.55).stg_path(dir.path(), "Roads");
        let text = fs::read_to_string(path).unwrap();
        assert!(!text.contains("a.ac"));
        assert!(text.contains("b.ac"));
        assert_eq!(text.matches("# BEGIN roads_").count(), 1);
    }

    #[test]
    fn test_writer_thread_merges_producers() {
        let dir = tempdir().unwrap();
        let writer = StgWriter::spawn(dir.path(), "roads_");

        let mut a = StgManager::new(dir.path(), "roads_");
        a.add_object_static("a.ac", (7.6, 47.55), 1.0, 0.0, SceneryKind::Roads)
            .unwrap();
        let mut b = StgManager::new(dir.path(), "roads_");
        b.add_object_static("b.ac", (7.61, 47.56), 1.0, 0.0, SceneryKind::Roads)
            .unwrap();

        thread::scope(|s| {
            for records in [a.take_records(), b.take_records()] {
                let tx = writer.sender();
                s.spawn(move || {
                    for r in records {
                        tx.send(r).unwrap();
                    }
                });
            }
        });
        assert_eq!(writer.finish().unwrap(), 1);

        let path = Bucket::for_point(7.6, 47.55).stg_path(dir.path(), "Roads");
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("a.ac"));
        assert!(text.contains("b.ac"));
    }
}
