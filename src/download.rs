//! Download delivery: where converted files go.
//!
//! On success the controller hands a [`Download`] to a [`DownloadSink`].
//! [`FsDownloadSink`] saves it into a directory. The file is written to a
//! temporary file next to the target and renamed into place, so a reader
//! never sees half a file. [`MemoryDownloadSink`] keeps downloads in memory
//! for hosts that want the bytes themselves.

use crate::error::ConvertError;
use async_trait::async_trait;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

/// A converted file ready to be saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// What a sink did with a download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadReceipt {
    pub file_name: String,
    /// Where the file was saved, for sinks that write to disk.
    pub location: Option<PathBuf>,
    pub bytes: usize,
}

/// Receives the converted file of a successful submission.
#[async_trait]
pub trait DownloadSink: Send + Sync {
    async fn deliver(&self, download: Download) -> Result<DownloadReceipt, ConvertError>;
}

/// Saves downloads into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FsDownloadSink {
    dir: PathBuf,
}

impl FsDownloadSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Target path for a download name inside this sink's directory.
    pub fn target_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(disk_safe_name(file_name))
    }
}

#[async_trait]
impl DownloadSink for FsDownloadSink {
    async fn deliver(&self, download: Download) -> Result<DownloadReceipt, ConvertError> {
        let target = self.target_path(&download.file_name);
        let bytes = download.data.len();
        let dir = self.dir.clone();
        let path = target.clone();

        tokio::task::spawn_blocking(move || write_atomic(&dir, &path, &download.data))
            .await
            .map_err(|e| ConvertError::Internal(format!("download writer panicked: {e}")))?
            .map_err(|source| ConvertError::DownloadFailed {
                path: target.clone(),
                source,
            })?;

        info!("Saved {} ({} bytes)", target.display(), bytes);

        Ok(DownloadReceipt {
            file_name: target
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            location: Some(target),
            bytes,
        })
    }
}

/// Temp file in `dir`, then rename over `target`.
fn write_atomic(dir: &Path, target: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut tmp = tempfile::Builder::new()
        .prefix(".audio-producer-")
        .suffix(".part")
        .tempfile_in(dir)?;
    tmp.write_all(data)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

/// Replace characters a file system would treat as structure.
///
/// Browsers do the same to a suggested download name; without it a title
/// such as `AC/DC` would point outside the output directory.
fn disk_safe_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

/// Keeps every delivered download in memory.
#[derive(Debug, Default)]
pub struct MemoryDownloadSink {
    downloads: Mutex<Vec<Download>>,
}

impl MemoryDownloadSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything delivered so far, oldest first.
    pub fn downloads(&self) -> Vec<Download> {
        self.downloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Remove and return everything delivered so far.
    pub fn take(&self) -> Vec<Download> {
        std::mem::take(&mut *self.downloads.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloadSink {
    async fn deliver(&self, download: Download) -> Result<DownloadReceipt, ConvertError> {
        let receipt = DownloadReceipt {
            file_name: download.file_name.clone(),
            location: None,
            bytes: download.data.len(),
        };
        self.downloads
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(download);
        Ok(receipt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn download(name: &str, data: &[u8]) -> Download {
        Download {
            file_name: name.into(),
            content_type: Some("audio/mpeg".into()),
            data: data.to_vec(),
        }
    }

    #[test]
    fn disk_safe_name_rules() {
        assert_eq!(disk_safe_name("Song.mp3"), "Song.mp3");
        assert_eq!(disk_safe_name("AC/DC.mp3"), "AC_DC.mp3");
        assert_eq!(disk_safe_name("..\\up.mp3"), ".._up.mp3");
        assert_eq!(disk_safe_name("a\nb.mp3"), "a_b.mp3");
        assert_eq!(disk_safe_name(".."), "_");
    }

    #[tokio::test]
    async fn fs_sink_writes_into_dir() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("nested/out");
        let sink = FsDownloadSink::new(&out);

        let receipt = sink.deliver(download("Song.mp3", b"ID3data")).await.unwrap();

        assert_eq!(receipt.file_name, "Song.mp3");
        assert_eq!(receipt.bytes, 7);
        let path = receipt.location.unwrap();
        assert_eq!(path, out.join("Song.mp3"));
        assert_eq!(std::fs::read(&path).unwrap(), b"ID3data");

        // No temp files left behind.
        let leftovers: Vec<_> = std::fs::read_dir(&out)
            .unwrap()
            .filter_map(Result::ok)
            .filter(|e| e.file_name().to_string_lossy().ends_with(".part"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn fs_sink_overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());
        sink.deliver(download("x.mp3", b"old")).await.unwrap();
        sink.deliver(download("x.mp3", b"new")).await.unwrap();
        assert_eq!(std::fs::read(dir.path().join("x.mp3")).unwrap(), b"new");
    }

    #[tokio::test]
    async fn fs_sink_keeps_slashes_inside_dir() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FsDownloadSink::new(dir.path());
        let receipt = sink.deliver(download("../escape.mp3", b"x")).await.unwrap();
        assert_eq!(receipt.location.unwrap(), dir.path().join(".._escape.mp3"));
    }

    #[test]
    fn memory_sink_collects() {
        let sink = MemoryDownloadSink::new();
        tokio_test::block_on(sink.deliver(download("a.mp3", b"1"))).unwrap();
        tokio_test::block_on(sink.deliver(download("b.mp3", b"22"))).unwrap();

        assert_eq!(sink.downloads().len(), 2);
        let taken = sink.take();
        assert_eq!(taken[1].file_name, "b.mp3");
        assert!(sink.downloads().is_empty());
    }
}
