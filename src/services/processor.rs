use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tokio::time::{sleep, timeout, Duration};

use crate::models::{UploadItem, UploadStatus};
use crate::services::extraction::{ExtractionError, ExtractionProvider, EXTRACTION_TIMEOUT_SECS};
use crate::utils::sha256_bytes;

/// Session-scoped upload queue. Each item owns its own status/progress/result
/// and is replaced whole on every update, so items never share mutable state.
pub type UploadQueue = Arc<Mutex<HashMap<String, UploadItem>>>;

pub fn new_item(path: &Path) -> UploadItem {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.to_string_lossy().to_string());
    UploadItem {
        id: uuid::Uuid::new_v4().to_string(),
        file_name,
        file_path: path.to_string_lossy().to_string(),
        mime_type: mime_for_path(path).to_string(),
        file_hash: None,
        status: UploadStatus::Uploading,
        progress: 0,
        error: None,
        extracted: None,
        saved_entry_id: None,
    }
}

pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Reset an errored item so its pipeline can restart from the beginning.
/// There is no partial resume.
pub fn reset_for_retry(item: &mut UploadItem) {
    item.status = UploadStatus::Uploading;
    item.progress = 0;
    item.error = None;
    item.extracted = None;
}

/// Run one item's pipeline: uploading -> parsing -> ready | error.
///
/// Failures only ever touch this item; other queued items keep running.
/// `notify` is called after every visible state change (the state layer wires
/// it to a frontend event).
pub async fn run_pipeline(
    queue: &UploadQueue,
    item_id: &str,
    provider: &dyn ExtractionProvider,
    notify: &(dyn Fn(&UploadItem) + Send + Sync),
) -> Result<()> {
    let file_path = {
        let items = queue.lock().map_err(|_| anyhow!("Upload queue lock"))?;
        let item = items
            .get(item_id)
            .ok_or_else(|| anyhow!("Unknown upload item: {}", item_id))?;
        item.file_path.clone()
    };

    // Simulated upload progress; the read itself is local and fast.
    for progress in [15u8, 40, 65, 90] {
        sleep(Duration::from_millis(120)).await;
        update_item(queue, item_id, notify, |item| {
            item.status = UploadStatus::Uploading;
            item.progress = progress;
        })?;
    }

    let bytes = match tokio::fs::read(&file_path).await {
        Ok(bytes) => bytes,
        Err(err) => {
            mark_failed(queue, item_id, notify, &format!("Could not read file: {}", err))?;
            return Ok(());
        }
    };

    let mime_type = update_item(queue, item_id, notify, |item| {
        item.file_hash = Some(sha256_bytes(&bytes));
        item.status = UploadStatus::Parsing;
        item.progress = 95;
    })?
    .mime_type;

    let extraction = timeout(
        Duration::from_secs(EXTRACTION_TIMEOUT_SECS),
        provider.extract(&bytes, &mime_type),
    )
    .await;

    match extraction {
        Ok(Ok(data)) => {
            let item = update_item(queue, item_id, notify, |item| {
                item.status = UploadStatus::Ready;
                item.progress = 100;
                item.extracted = Some(data.clone());
            })?;
            tracing::info!(file = %item.file_name, "extraction ready");
        }
        Ok(Err(err)) => {
            mark_failed(queue, item_id, notify, &err.to_string())?;
        }
        Err(_) => {
            mark_failed(
                queue,
                item_id,
                notify,
                &ExtractionError::Timeout(EXTRACTION_TIMEOUT_SECS).to_string(),
            )?;
        }
    }

    Ok(())
}

fn update_item(
    queue: &UploadQueue,
    item_id: &str,
    notify: &(dyn Fn(&UploadItem) + Send + Sync),
    apply: impl FnOnce(&mut UploadItem),
) -> Result<UploadItem> {
    let updated = {
        let mut items = queue.lock().map_err(|_| anyhow!("Upload queue lock"))?;
        let item = items
            .get_mut(item_id)
            .ok_or_else(|| anyhow!("Unknown upload item: {}", item_id))?;
        apply(item);
        item.clone()
    };
    notify(&updated);
    Ok(updated)
}

pub fn mark_failed(
    queue: &UploadQueue,
    item_id: &str,
    notify: &(dyn Fn(&UploadItem) + Send + Sync),
    reason: &str,
) -> Result<()> {
    let item = update_item(queue, item_id, notify, |item| {
        item.status = UploadStatus::Error;
        item.error = Some(reason.to_string());
    })?;
    tracing::warn!(file = %item.file_name, reason, "extraction failed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtractedInvoiceData;
    use async_trait::async_trait;
    use std::io::Write;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn sample_data() -> ExtractedInvoiceData {
        ExtractedInvoiceData {
            invoice_number: Some("INV-1".to_string()),
            receipt_number: None,
            customer: Some("Acme".to_string()),
            amount_before_vat: Some(100.0),
            currency_code: None,
            invoice_date: Some("2023-11-15".to_string()),
            project_description: None,
        }
    }

    struct FixedExtractor;

    #[async_trait]
    impl ExtractionProvider for FixedExtractor {
        async fn extract(
            &self,
            _content: &[u8],
            _mime_type: &str,
        ) -> Result<ExtractedInvoiceData, ExtractionError> {
            Ok(sample_data())
        }
    }

    struct FailingExtractor;

    #[async_trait]
    impl ExtractionProvider for FailingExtractor {
        async fn extract(
            &self,
            _content: &[u8],
            _mime_type: &str,
        ) -> Result<ExtractedInvoiceData, ExtractionError> {
            Err(ExtractionError::InvalidResponse("no invoice number found".to_string()))
        }
    }

    struct StalledExtractor;

    #[async_trait]
    impl ExtractionProvider for StalledExtractor {
        async fn extract(
            &self,
            _content: &[u8],
            _mime_type: &str,
        ) -> Result<ExtractedInvoiceData, ExtractionError> {
            std::future::pending().await
        }
    }

    /// Fails on the first call, succeeds afterwards.
    struct FlakyExtractor {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ExtractionProvider for FlakyExtractor {
        async fn extract(
            &self,
            _content: &[u8],
            _mime_type: &str,
        ) -> Result<ExtractedInvoiceData, ExtractionError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(ExtractionError::Service {
                    status: 500,
                    body: "boom".to_string(),
                })
            } else {
                Ok(sample_data())
            }
        }
    }

    fn queued_file(dir: &tempfile::TempDir, name: &str) -> (UploadQueue, String) {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"%PDF-1.4 test").unwrap();

        let item = new_item(&path);
        let id = item.id.clone();
        let queue: UploadQueue = Arc::new(Mutex::new(HashMap::from([(id.clone(), item)])));
        (queue, id)
    }

    fn item(queue: &UploadQueue, id: &str) -> UploadItem {
        queue.lock().unwrap().get(id).unwrap().clone()
    }

    #[tokio::test(start_paused = true)]
    async fn successful_pipeline_ends_ready() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, id) = queued_file(&dir, "invoice.pdf");

        run_pipeline(&queue, &id, &FixedExtractor, &|_| {}).await.unwrap();

        let item = item(&queue, &id);
        assert_eq!(item.status, UploadStatus::Ready);
        assert_eq!(item.progress, 100);
        assert!(item.file_hash.is_some());
        assert_eq!(
            item.extracted.unwrap().invoice_number.as_deref(),
            Some("INV-1")
        );
    }

    #[tokio::test(start_paused = true)]
    async fn extraction_failure_marks_only_that_item() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, failing_id) = queued_file(&dir, "bad.pdf");

        let other_path = dir.path().join("good.pdf");
        std::fs::write(&other_path, b"%PDF-1.4").unwrap();
        let other = new_item(&other_path);
        let other_id = other.id.clone();
        queue.lock().unwrap().insert(other_id.clone(), other);

        run_pipeline(&queue, &failing_id, &FailingExtractor, &|_| {})
            .await
            .unwrap();

        let failed = item(&queue, &failing_id);
        assert_eq!(failed.status, UploadStatus::Error);
        assert!(failed.error.unwrap().contains("no invoice number"));

        let untouched = item(&queue, &other_id);
        assert_eq!(untouched.status, UploadStatus::Uploading);
        assert!(untouched.error.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_extraction_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, id) = queued_file(&dir, "slow.pdf");

        run_pipeline(&queue, &id, &StalledExtractor, &|_| {}).await.unwrap();

        let item = item(&queue, &id);
        assert_eq!(item.status, UploadStatus::Error);
        assert!(item.error.unwrap().contains("timed out"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_file_reports_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.pdf");
        let item = new_item(&path);
        let id = item.id.clone();
        let queue: UploadQueue = Arc::new(Mutex::new(HashMap::from([(id.clone(), item)])));

        run_pipeline(&queue, &id, &FixedExtractor, &|_| {}).await.unwrap();

        let failed = queue.lock().unwrap().get(&id).unwrap().clone();
        assert_eq!(failed.status, UploadStatus::Error);
        assert!(failed.error.unwrap().contains("Could not read file"));
    }

    #[tokio::test(start_paused = true)]
    async fn retry_restarts_from_the_beginning() {
        let dir = tempfile::tempdir().unwrap();
        let (queue, id) = queued_file(&dir, "flaky.pdf");
        let provider = FlakyExtractor {
            calls: AtomicUsize::new(0),
        };

        run_pipeline(&queue, &id, &provider, &|_| {}).await.unwrap();
        assert_eq!(item(&queue, &id).status, UploadStatus::Error);

        {
            let mut items = queue.lock().unwrap();
            reset_for_retry(items.get_mut(&id).unwrap());
        }
        let reset = item(&queue, &id);
        assert_eq!(reset.status, UploadStatus::Uploading);
        assert_eq!(reset.progress, 0);
        assert!(reset.error.is_none());

        run_pipeline(&queue, &id, &provider, &|_| {}).await.unwrap();
        assert_eq!(item(&queue, &id).status, UploadStatus::Ready);
    }

    #[test]
    fn mime_follows_extension() {
        assert_eq!(mime_for_path(Path::new("a.PDF")), "application/pdf");
        assert_eq!(mime_for_path(Path::new("a.jpeg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("a.bin")), "application/octet-stream");
    }
}
