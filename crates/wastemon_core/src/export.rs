use anyhow::{Context, Result};
use std::path::Path;

use crate::queue::QueuedImage;

/// Export the queue to CSV with headers:
/// name,size_bytes,status,category
pub fn export_csv(entries: &[QueuedImage], path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("cannot create {}", path.display()))?;
    wtr.write_record(["name", "size_bytes", "status", "category"])?;

    for entry in entries {
        let category = entry
            .result_label()
            .map(|c| c.as_str().to_string())
            .unwrap_or_default();
        wtr.write_record([
            entry.name(),
            entry.size_bytes().to_string().as_str(),
            entry.status().as_str(),
            category.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::{DecodedImage, SourceHandle};
    use crate::queue::{Category, ImageQueue};
    use tempfile::tempdir;

    fn decoded(name: &str, size_bytes: u64) -> DecodedImage {
        DecodedImage {
            name: name.to_string(),
            size_bytes,
            mime: "image/jpeg".to_string(),
            display_url: "data:image/jpeg;base64,".into(),
            source: SourceHandle::new(Vec::<u8>::new()),
        }
    }

    #[test]
    fn export_csv_writes_expected_headers_and_rows() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out.csv");
        let mut queue = ImageQueue::new();
        let ids = queue.append_batch(vec![
            decoded("a.jpg", 50_000),
            decoded("b.png", 120_000),
            decoded("c.webp", 10),
        ]);
        queue.begin_round()?;
        queue.complete(ids[0], Category::Organic);
        queue.complete(ids[2], Category::Recycle);

        export_csv(queue.entries(), &path)?;

        let mut rdr = csv::Reader::from_path(&path)?;
        let headers = rdr.headers()?.clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec!["name", "size_bytes", "status", "category"]
        );

        let mut recs = rdr.records();
        let r1 = recs.next().unwrap()?;
        assert_eq!(&r1[0], "a.jpg");
        assert_eq!(&r1[1], "50000");
        assert_eq!(&r1[2], "done");
        assert_eq!(&r1[3], "Organic");

        let r2 = recs.next().unwrap()?;
        assert_eq!(&r2[0], "b.png");
        assert_eq!(&r2[2], "processing");
        assert_eq!(&r2[3], "");

        let r3 = recs.next().unwrap()?;
        assert_eq!(&r3[3], "Recycle");

        assert!(recs.next().is_none());
        Ok(())
    }

    #[test]
    fn export_of_absent_queue_writes_only_headers() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("empty.csv");
        export_csv(ImageQueue::new().entries(), &path)?;
        let mut rdr = csv::Reader::from_path(&path)?;
        assert_eq!(rdr.records().count(), 0);
        Ok(())
    }
}
