//! Atomic Markdown file writer.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::error::{HarvesterError, Result};
use crate::types::EnactmentId;

/// What a write did to the target file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The file did not exist before.
    Created,
    /// The file existed with different content.
    Updated,
    /// The file existed with identical content (it is still rewritten).
    Unchanged,
}

/// Writes rendered enactments to `<output_dir>/[<year>/]<file-stem>.md`.
#[derive(Debug, Clone)]
pub struct MarkdownWriter {
    output_dir: PathBuf,
    year_folders: bool,
}

impl MarkdownWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            year_folders: false,
        }
    }

    /// Place each file in a subdirectory named after the enactment year.
    #[must_use]
    pub fn with_year_folders(mut self, year_folders: bool) -> Self {
        self.year_folders = year_folders;
        self
    }

    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Target path for an enactment.
    ///
    /// # Examples
    /// ```
    /// use std::path::Path;
    /// use sfs_harvester::types::EnactmentId;
    /// use sfs_harvester::writer::MarkdownWriter;
    ///
    /// let id = EnactmentId::parse("2025:764").unwrap();
    /// let flat = MarkdownWriter::new("out");
    /// assert_eq!(flat.path_for(&id), Path::new("out/sfs-2025-764.md"));
    ///
    /// let nested = MarkdownWriter::new("out").with_year_folders(true);
    /// assert_eq!(nested.path_for(&id), Path::new("out/2025/sfs-2025-764.md"));
    /// ```
    #[must_use]
    pub fn path_for(&self, id: &EnactmentId) -> PathBuf {
        let file_name = format!("{}.md", id.file_stem());
        if self.year_folders {
            self.output_dir.join(id.year().to_string()).join(file_name)
        } else {
            self.output_dir.join(file_name)
        }
    }

    /// Create the output directory, failing with
    /// [`HarvesterError::OutputUnwritable`] if that is impossible.
    pub fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).map_err(|e| unwritable(&self.output_dir, &e))?;
        if !self.output_dir.is_dir() {
            return Err(HarvesterError::OutputUnwritable {
                path: self.output_dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }
        Ok(())
    }

    /// Write `content` for `id`, fully replacing any previous file.
    ///
    /// The content goes to a hidden temp file in the target directory first,
    /// is synced, and then renamed over the final path. A failed write leaves
    /// any previous file untouched.
    pub fn write(&self, id: &EnactmentId, content: &str) -> Result<WriteOutcome> {
        let path = self.path_for(id);
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| unwritable(dir, &e))?;
        }

        let outcome = match fs::read(&path) {
            Ok(previous) if previous == content.as_bytes() => WriteOutcome::Unchanged,
            Ok(_) => WriteOutcome::Updated,
            Err(e) if e.kind() == io::ErrorKind::NotFound => WriteOutcome::Created,
            Err(e) => return Err(unwritable(&path, &e)),
        };

        atomic_write_with(&path, |file| file.write_all(content.as_bytes()))
            .map_err(|e| unwritable(&path, &e))?;

        tracing::debug!(path = %path.display(), ?outcome, "Wrote file");
        Ok(outcome)
    }
}

fn unwritable(path: &Path, error: &io::Error) -> HarvesterError {
    HarvesterError::OutputUnwritable {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}

/// Hidden temp file next to `path`: `.<name>.<pid>.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", std::process::id()))
}

/// Write through a temp file and rename it over `path`.
///
/// `fill` writes the content. If it or any later step fails, the temp file
/// is removed and `path` is left as it was.
pub(crate) fn atomic_write_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let temp = temp_path(path);
    let result = write_and_rename(&temp, path, fill);
    if result.is_err() {
        let _ = fs::remove_file(&temp);
    }
    result
}

fn write_and_rename<F>(temp: &Path, path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut file = File::create(temp)?;
    fill(&mut file)?;
    file.sync_all()?;
    drop(file);

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(temp, path)
}
