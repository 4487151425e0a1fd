//! File intake: turning paths, dropped buffers and folders into decoded queue entries.

use anyhow::{Context, Result};
use base64::{Engine, engine::general_purpose};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

/// MIME types accepted when the picker filter is enforced.
pub const ACCEPTED_MIME_TYPES: [&str; 5] = [
    "image/jpeg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/jfif",
];

/// File extensions matching [`ACCEPTED_MIME_TYPES`], used for picker filters and folder scans.
pub const ACCEPTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "webp", "heic", "jfif"];

const FALLBACK_MIME: &str = "application/octet-stream";

/// Where a file's bytes come from.
#[derive(Debug, Clone)]
pub enum FileContent {
    /// Read lazily from disk when the file is decoded.
    Path(PathBuf),
    /// Already in memory, e.g. a drop that carried bytes instead of a path.
    Bytes(Arc<[u8]>),
}

/// A file offered to the queue, before decoding.
#[derive(Debug, Clone)]
pub struct ImageFile {
    pub name: String,
    pub size_bytes: u64,
    pub mime: String,
    pub content: FileContent,
}

impl ImageFile {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)
            .with_context(|| format!("cannot read file metadata: {}", path.display()))?;
        if !metadata.is_file() {
            anyhow::bail!("Not a file: {}", path.display());
        }
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            mime: mime_for_name(&name).to_string(),
            name,
            size_bytes: metadata.len(),
            content: FileContent::Path(path.to_path_buf()),
        })
    }

    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Arc<[u8]>>) -> Self {
        let name = name.into();
        let bytes = bytes.into();
        Self {
            mime: mime_for_name(&name).to_string(),
            size_bytes: bytes.len() as u64,
            name,
            content: FileContent::Bytes(bytes),
        }
    }

    /// Overrides the extension-derived MIME type with one reported by the file source.
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        let mime = mime.into();
        if !mime.trim().is_empty() {
            self.mime = mime;
        }
        self
    }

    /// Whether the picker filter lets this file through.
    pub fn is_accepted_image(&self) -> bool {
        ACCEPTED_MIME_TYPES.contains(&self.mime.as_str())
    }
}

/// Shared read-only handle to the original bytes of a queued image.
#[derive(Clone)]
pub struct SourceHandle(Arc<[u8]>);

impl SourceHandle {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        Self(bytes.into())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn shared(&self) -> Arc<[u8]> {
        Arc::clone(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SourceHandle({} bytes)", self.0.len())
    }
}

/// A file whose bytes have been read and turned into a displayable URI.
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pub name: String,
    pub size_bytes: u64,
    pub mime: String,
    /// `data:<mime>;base64,<payload>`, shared with the queue entry without re-encoding.
    pub display_url: Arc<str>,
    pub source: SourceHandle,
}

/// Options controlling how folder scanning behaves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanOptions {
    /// When true, scan subdirectories recursively.
    pub recursive: bool,
}

/// List the accepted images in a folder.
pub fn scan_folder(path: impl AsRef<Path>, opts: ScanOptions) -> Result<Vec<ImageFile>> {
    let root = path.as_ref();
    if !root.exists() {
        anyhow::bail!("Path does not exist: {}", root.display());
    }
    if !root.is_dir() {
        anyhow::bail!("Path is not a directory: {}", root.display());
    }

    let walker = if opts.recursive {
        WalkDir::new(root).sort_by_file_name().into_iter()
    } else {
        WalkDir::new(root).max_depth(1).sort_by_file_name().into_iter()
    };

    let mut files = Vec::new();
    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::warn!("walkdir error: {}", e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || !has_accepted_extension(path) {
            continue;
        }
        match ImageFile::from_path(path) {
            Ok(file) => files.push(file),
            Err(e) => tracing::warn!("Skipping {}: {e:#}", path.display()),
        }
    }
    Ok(files)
}

fn has_accepted_extension(path: &Path) -> bool {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) => ACCEPTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// MIME type for a file name, based on its extension.
pub fn mime_for_name(name: &str) -> &'static str {
    let ext = Path::new(name)
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());
    match ext.as_deref() {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        Some("jfif") => "image/jfif",
        Some("gif") => "image/gif",
        _ => FALLBACK_MIME,
    }
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

/// Read one file and build its preview URI.
pub async fn decode(file: ImageFile) -> Result<DecodedImage> {
    let bytes: Arc<[u8]> = match file.content {
        FileContent::Bytes(bytes) => bytes,
        FileContent::Path(path) => tokio::fs::read(&path)
            .await
            .with_context(|| format!("cannot read {}", path.display()))?
            .into(),
    };
    Ok(DecodedImage {
        display_url: data_uri(&file.mime, &bytes).into(),
        source: SourceHandle::new(bytes),
        name: file.name,
        size_bytes: file.size_bytes,
        mime: file.mime,
    })
}

/// Decode a batch concurrently. The result keeps input order; files that fail are
/// logged and left out.
pub async fn decode_batch(files: Vec<ImageFile>) -> Vec<DecodedImage> {
    decode_all_with(files, decode).await
}

pub(crate) async fn decode_all_with<F, Fut>(files: Vec<ImageFile>, decoder: F) -> Vec<DecodedImage>
where
    F: Fn(ImageFile) -> Fut,
    Fut: Future<Output = Result<DecodedImage>>,
{
    join_all(files.into_iter().map(|file| {
        let name = file.name.clone();
        let pending = decoder(file);
        async move { (name, pending.await) }
    }))
    .await
    .into_iter()
    .filter_map(|(name, result)| match result {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            tracing::warn!("Dropping {name} from batch: {e:#}");
            None
        }
    })
    .collect()
}

/// Human readable size, e.g. `48.8 KB`.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes < 1024 {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}
