//! The upload queue: ordered, position-addressed entries and their classification status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::QueueError;
use crate::intake::{DecodedImage, SourceHandle};

/// Stable identity of a queued image, assigned at insertion and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ImageId(u64);

impl ImageId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Waste category returned by the classification service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Organic,
    Recycle,
    /// Any label the service returns besides the two known ones.
    Other(String),
}

impl Category {
    pub fn parse(label: &str) -> Self {
        let label = label.trim();
        if label.eq_ignore_ascii_case("organic") {
            Category::Organic
        } else if label.eq_ignore_ascii_case("recycle") {
            Category::Recycle
        } else {
            Category::Other(label.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Organic => "Organic",
            Category::Recycle => "Recycle",
            Category::Other(label) => label,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Lifecycle of one queued image. The label only exists once classification is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageStatus {
    Ready,
    Processing,
    Done(Category),
}

impl ImageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageStatus::Ready => "ready",
            ImageStatus::Processing => "processing",
            ImageStatus::Done(_) => "done",
        }
    }
}

#[derive(Debug, Clone)]
pub struct QueuedImage {
    id: ImageId,
    name: String,
    size_bytes: u64,
    mime: String,
    display_url: Arc<str>,
    source: SourceHandle,
    status: ImageStatus,
}

impl QueuedImage {
    pub fn id(&self) -> ImageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Self-contained `data:` URI for hosts that render previews by URL, such as a web view.
    /// Built once at insertion. Hosts that can draw raw bytes, like the egui shell, read
    /// [`QueuedImage::source`] instead.
    pub fn display_url(&self) -> &str {
        &self.display_url
    }

    pub fn source(&self) -> &SourceHandle {
        &self.source
    }

    pub fn status(&self) -> &ImageStatus {
        &self.status
    }

    /// The classification result; `Some` exactly when the status is `Done`.
    pub fn result_label(&self) -> Option<&Category> {
        match &self.status {
            ImageStatus::Done(category) => Some(category),
            _ => None,
        }
    }
}

/// Everything the classifier needs to submit one queued image.
#[derive(Debug, Clone)]
pub struct Upload {
    pub id: ImageId,
    pub name: String,
    pub mime: String,
    pub source: SourceHandle,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub ready: usize,
    pub processing: usize,
    pub done: usize,
}

/// Ordered image queue. `None` entries means the queue is absent, which the UI shows as
/// "no file selected" rather than an empty list.
#[derive(Debug, Default)]
pub struct ImageQueue {
    entries: Option<Vec<QueuedImage>>,
    next_id: u64,
}

impl ImageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_absent(&self) -> bool {
        self.entries.is_none()
    }

    pub fn entries(&self) -> &[QueuedImage] {
        self.entries.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn get(&self, id: ImageId) -> Option<&QueuedImage> {
        self.entries().iter().find(|e| e.id == id)
    }

    pub fn position(&self, id: ImageId) -> Option<usize> {
        self.entries().iter().position(|e| e.id == id)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for entry in self.entries() {
            match entry.status {
                ImageStatus::Ready => counts.ready += 1,
                ImageStatus::Processing => counts.processing += 1,
                ImageStatus::Done(_) => counts.done += 1,
            }
        }
        counts
    }

    /// Append a decoded batch in one step, keeping its order. An empty batch leaves the
    /// queue untouched.
    pub fn append_batch(&mut self, batch: Vec<DecodedImage>) -> Vec<ImageId> {
        if batch.is_empty() {
            return Vec::new();
        }
        let mut ids = Vec::with_capacity(batch.len());
        let mut appended = Vec::with_capacity(batch.len());
        for decoded in batch {
            let id = ImageId(self.next_id);
            self.next_id += 1;
            ids.push(id);
            appended.push(QueuedImage {
                id,
                name: decoded.name,
                size_bytes: decoded.size_bytes,
                mime: decoded.mime,
                display_url: decoded.display_url,
                source: decoded.source,
                status: ImageStatus::Ready,
            });
        }
        self.entries.get_or_insert_with(Vec::new).extend(appended);
        ids
    }

    /// Mark every entry as processing and hand out what is needed to classify them.
    pub fn begin_round(&mut self) -> Result<Vec<Upload>, QueueError> {
        let entries = match self.entries.as_mut() {
            Some(entries) if !entries.is_empty() => entries,
            _ => return Err(QueueError::Empty),
        };
        Ok(entries
            .iter_mut()
            .map(|entry| {
                entry.status = ImageStatus::Processing;
                Upload {
                    id: entry.id,
                    name: entry.name.clone(),
                    mime: entry.mime.clone(),
                    source: entry.source.clone(),
                }
            })
            .collect())
    }

    /// Attach a result. Only a processing entry that still exists accepts it.
    pub fn complete(&mut self, id: ImageId, category: Category) -> bool {
        let Some(entries) = self.entries.as_mut() else {
            return false;
        };
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) if entry.status == ImageStatus::Processing => {
                entry.status = ImageStatus::Done(category);
                true
            }
            _ => false,
        }
    }

    pub fn remove_at(&mut self, index: usize) -> Result<QueuedImage, QueueError> {
        let len = self.len();
        let Some(entries) = self.entries.as_mut().filter(|_| index < len) else {
            return Err(QueueError::OutOfRange { index, len });
        };
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.entries = None;
        }
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.entries = None;
    }
}
