//! # File Management Module
//!
//! Operazioni sui file usate dall'executor.
//!
//! ## Responsabilità:
//! - Lettura delle dimensioni dei file (input mancante → `InputNotFound`)
//! - Creazione della directory di output
//! - File temporanei per il resize (nella temp dir di sistema)
//! - File di staging accanto all'output, rinominati atomicamente sul path
//!   finale solo a successo
//!
//! ## Sicurezza operazioni:
//! Tutti i file temporanei sono `TempPath`: vengono cancellati al drop, quindi
//! su ogni percorso di uscita (successo, errore, interruzione). Il path di
//! output non contiene mai un file parziale.

use crate::error::PipelineError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tokio::fs;
use tracing::debug;

const TEMP_PREFIX: &str = ".png-minify-";

/// Manages file operations for the pipeline
pub struct FileManager;

impl FileManager {
    /// Size of the input file, distinguishing a missing file from other failures
    pub async fn input_size(path: &Path) -> Result<u64, PipelineError> {
        match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => Ok(metadata.len()),
            Ok(_) => Err(PipelineError::io(
                format!("reading {}", path.display()),
                std::io::Error::new(ErrorKind::InvalidInput, "not a regular file"),
            )),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(PipelineError::InputNotFound(path.to_path_buf())),
            Err(e) => Err(PipelineError::io(format!("reading {}", path.display()), e)),
        }
    }

    /// Size of a file produced along the way
    pub async fn file_size(path: &Path) -> Result<u64, PipelineError> {
        fs::metadata(path)
            .await
            .map(|metadata| metadata.len())
            .map_err(|e| PipelineError::io(format!("reading size of {}", path.display()), e))
    }

    /// Directory that will hold the output, created if missing
    pub async fn prepare_output_dir(output: &Path) -> Result<PathBuf, PipelineError> {
        let dir = match output.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| PipelineError::io(format!("creating output directory {}", dir.display()), e))?;
        Ok(dir)
    }

    /// Fresh `.png` path in the system temp directory, removed on drop
    pub fn temp_png() -> Result<TempPath, PipelineError> {
        let path = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".png")
            .tempfile()
            .map_err(|e| PipelineError::io("creating temporary file", e))?
            .into_temp_path();
        debug!("Created temporary file {}", path.display());
        Ok(path)
    }

    /// Fresh `.png` path next to the output, removed on drop unless delivered
    pub fn staging_png(output_dir: &Path) -> Result<TempPath, PipelineError> {
        let path = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .suffix(".png")
            .tempfile_in(output_dir)
            .map_err(|e| PipelineError::io(format!("writing to {}", output_dir.display()), e))?
            .into_temp_path();
        Ok(path)
    }

    /// Byte-for-byte copy of `source` into an existing staging path
    pub async fn copy_into(source: &Path, staging: &TempPath) -> Result<(), PipelineError> {
        fs::copy(source, staging)
            .await
            .map(|_| ())
            .map_err(|e| PipelineError::io(format!("copying {}", source.display()), e))
    }

    /// Atomically move a staging file onto the output path
    pub fn deliver(staging: TempPath, output: &Path) -> Result<(), PipelineError> {
        staging
            .persist(output)
            .map_err(|e| PipelineError::io(format!("writing {}", output.display()), e.error))?;
        debug!("Delivered {}", output.display());
        Ok(())
    }
}

/// The file the next step reads from. Reassigned as steps transform it.
#[derive(Debug)]
pub enum WorkingFile {
    /// The user's input, never modified
    Source(PathBuf),
    /// A resized intermediate, deleted when dropped
    Resized(TempPath),
}

impl WorkingFile {
    pub fn path(&self) -> &Path {
        match self {
            WorkingFile::Source(path) => path,
            WorkingFile::Resized(temp) => temp,
        }
    }

    pub fn is_resized(&self) -> bool {
        matches!(self, WorkingFile::Resized(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_input_size_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.png");
        let err = FileManager::input_size(&missing).await.unwrap_err();
        assert!(matches!(err, PipelineError::InputNotFound(_)));

        let err = FileManager::input_size(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io { .. }));
    }

    #[tokio::test]
    async fn test_prepare_output_dir_creates_parents() {
        let temp_dir = TempDir::new().unwrap();
        let output = temp_dir.path().join("a").join("b").join("out.png");
        let dir = FileManager::prepare_output_dir(&output).await.unwrap();
        assert!(dir.is_dir());
        assert_eq!(dir, temp_dir.path().join("a").join("b"));

        let bare = FileManager::prepare_output_dir(Path::new("out.png")).await.unwrap();
        assert_eq!(bare, PathBuf::from("."));
    }

    #[tokio::test]
    async fn test_staging_is_removed_unless_delivered() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.png");
        std::fs::write(&source, b"pixels").unwrap();
        let output = temp_dir.path().join("out.png");

        let abandoned = FileManager::staging_png(temp_dir.path()).unwrap();
        let abandoned_path = abandoned.to_path_buf();
        FileManager::copy_into(&source, &abandoned).await.unwrap();
        drop(abandoned);
        assert!(!abandoned_path.exists());

        let staging = FileManager::staging_png(temp_dir.path()).unwrap();
        FileManager::copy_into(&source, &staging).await.unwrap();
        FileManager::deliver(staging, &output).unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"pixels");

        // Only the source and the delivered output remain
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_resized_working_file_is_cleaned_up() {
        let temp = FileManager::temp_png().unwrap();
        let path = temp.to_path_buf();
        let working = WorkingFile::Resized(temp);
        assert!(working.is_resized());
        assert!(working.path().exists());
        drop(working);
        assert!(!path.exists());

        let source = WorkingFile::Source(PathBuf::from("in.png"));
        assert_eq!(source.path(), Path::new("in.png"));
        assert!(!source.is_resized());
    }
}
