//! Batch driver - documents in, grouped and extracted listings out.
//!
//! Documents are stored and scanned for candidates first (bounded file
//! concurrency, input order kept), then grouped across the whole batch.
//! Extraction of each group and classification of each rendered page then
//! run side by side. Every item is its own service call, spaced by its
//! service's throttle, so a call that never returns holds up only its own
//! item. Results are put back in group and page order.

use futures::{
    stream::{self, FuturesUnordered},
    Stream, StreamExt,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{MaisokuError, Result};
use crate::pipeline::{
    classify::ImageClassifier,
    dedup::ListingGrouper,
    detect::CandidateDetector,
    extract::{ExtractionOrchestrator, ExtractionOutcome},
    throttle::Throttle,
};
use crate::traits::{
    ai::{ListingExtractor, VisionClassifier},
    matcher::{DedupKeyMatcher, ListingMatcher},
    store::{ObjectStore, PutOptions},
};
use crate::types::{
    config::PipelineConfig,
    document::{BatchRequest, BatchResult, DocumentInput, ListingRecord, ProcessedFile},
    group::ListingGroup,
    image::ExtractedImage,
    progress::{ProgressReporter, ProgressSender, Stage},
};

/// Runs batches of documents through the pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let processor = BatchProcessor::new(extractor, classifier, store)
///     .with_config(PipelineConfig::default().with_file_concurrency(2));
///
/// let result = processor.process_batch(BatchRequest::new(documents)).await?;
/// for record in &result.listings {
///     println!("{:?}", record.listing.get(ListingField::PropertyName));
/// }
/// ```
pub struct BatchProcessor<E: ListingExtractor, C: VisionClassifier, S: ObjectStore> {
    orchestrator: ExtractionOrchestrator<E>,
    classifier: ImageClassifier<C>,
    store: S,
    matcher: Arc<dyn ListingMatcher>,
    config: PipelineConfig,
    progress: ProgressReporter,
    cancel: CancellationToken,
}

impl<E: ListingExtractor, C: VisionClassifier, S: ObjectStore> BatchProcessor<E, C, S> {
    /// Create a processor with the default configuration.
    pub fn new(extractor: E, classifier: C, store: S) -> Self {
        let config = PipelineConfig::default();
        Self {
            orchestrator: ExtractionOrchestrator::new(extractor)
                .with_throttle(Throttle::new(config.extraction_delay)),
            classifier: ImageClassifier::new(classifier)
                .with_throttle(Throttle::new(config.classification_delay)),
            store,
            matcher: Arc::new(DedupKeyMatcher),
            config,
            progress: ProgressReporter::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the configuration.
    pub fn with_config(self, config: PipelineConfig) -> Self {
        Self {
            orchestrator: self
                .orchestrator
                .with_throttle(Throttle::new(config.extraction_delay)),
            classifier: self
                .classifier
                .with_throttle(Throttle::new(config.classification_delay)),
            config,
            ..self
        }
    }

    /// Group candidates with a custom matcher instead of dedup-key equality.
    pub fn with_matcher(mut self, matcher: impl ListingMatcher + 'static) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Emit progress events on a channel.
    pub fn with_progress(mut self, sender: ProgressSender) -> Self {
        self.progress = ProgressReporter::new(Some(sender));
        self
    }

    /// Abandon the batch when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Process one batch.
    ///
    /// Per-item failures degrade (placeholder URLs, pattern fallback,
    /// `other` image labels) and never abort the batch. Errors are limited
    /// to a malformed request and cancellation.
    pub async fn process_batch(&self, request: BatchRequest) -> Result<BatchResult> {
        validate_request(&request)?;

        let started_at = chrono::Utc::now();
        let session_id = request.session_id.as_str();
        info!(
            session_id = %session_id,
            documents = request.documents.len(),
            "Processing batch"
        );

        // 1. Store and detect
        let mut files = self.process_documents(session_id, &request.documents).await?;
        info!(
            session_id = %session_id,
            candidates = files.iter().map(|f| f.candidates.len()).sum::<usize>(),
            "Detection complete"
        );

        // 2. Group across the whole batch
        let mut grouper = ListingGrouper::with_matcher(self.matcher.clone());
        grouper.extend(files.iter().flat_map(|f| f.candidates.iter().cloned()));
        let groups = grouper.finish();
        self.progress.report(Stage::Group, 1, 1);
        info!(session_id = %session_id, groups = groups.len(), "Grouping complete");

        // 3. One extraction per group, alongside page classification
        let (outcomes, images) = tokio::try_join!(
            self.extract_groups(&groups),
            self.classify_pages(session_id, &request.documents),
        )?;
        for (file, images) in files.iter_mut().zip(images) {
            file.images = images;
        }

        let listings = assemble_listings(&groups, outcomes, &files);
        let fallbacks = listings.iter().filter(|l| l.from_fallback).count();
        info!(
            session_id = %session_id,
            listings = listings.len(),
            fallbacks,
            "Batch complete"
        );

        Ok(BatchResult {
            session_id: request.session_id.clone(),
            started_at,
            completed_at: chrono::Utc::now(),
            files,
            groups,
            listings,
        })
    }

    async fn process_documents(
        &self,
        session_id: &str,
        documents: &[DocumentInput],
    ) -> Result<Vec<ProcessedFile>> {
        let detector = CandidateDetector::new(self.config.preview_chars);
        let total = documents.len();
        let stored = AtomicUsize::new(0);

        let mut pending = stream::iter(documents)
            .map(|document| {
                let detector = &detector;
                let stored = &stored;
                async move {
                    let url = self
                        .store_or_placeholder(
                            session_id,
                            &document.name,
                            &document.bytes,
                            "application/pdf",
                        )
                        .await;
                    let done = stored.fetch_add(1, Ordering::SeqCst) + 1;
                    self.progress.report(Stage::Upload, done, total);

                    detect_document(detector, document, url)
                }
            })
            .buffered(self.config.file_concurrency.max(1));

        let mut files = Vec::with_capacity(total);
        while let Some(file) = pending.next().await {
            self.ensure_active()?;
            files.push(file);
            self.progress.report(Stage::Detect, files.len(), total);
        }

        Ok(files)
    }

    async fn extract_groups(&self, groups: &[ListingGroup]) -> Result<Vec<ExtractionOutcome>> {
        let total = groups.len();
        let mut pending: FuturesUnordered<_> = groups
            .iter()
            .enumerate()
            .map(|(index, group)| async move {
                let outcome = self
                    .orchestrator
                    .extract_candidate(&group.primary_candidate)
                    .await;
                (index, outcome)
            })
            .collect();

        let mut outcomes: Vec<Option<ExtractionOutcome>> = vec![None; total];
        let mut done = 0;
        while let Some((index, outcome)) = self.next_active(&mut pending).await? {
            outcomes[index] = Some(outcome);
            done += 1;
            self.progress.report(Stage::Extract, done, total);
        }

        Ok(outcomes.into_iter().flatten().collect())
    }

    /// Store and classify every rendered page, grouped per document.
    async fn classify_pages(
        &self,
        session_id: &str,
        documents: &[DocumentInput],
    ) -> Result<Vec<Vec<ExtractedImage>>> {
        let total: usize = documents.iter().map(|d| d.page_images.len()).sum();
        let mut pending: FuturesUnordered<_> = documents
            .iter()
            .enumerate()
            .flat_map(move |(document_index, document)| {
                document
                    .page_images
                    .iter()
                    .enumerate()
                    .map(move |(page_index, png)| async move {
                        let image = self
                            .classify_page(session_id, document, page_index, png)
                            .await;
                        (document_index, image)
                    })
            })
            .collect();

        let mut images: Vec<Vec<ExtractedImage>> = vec![Vec::new(); documents.len()];
        let mut done = 0;
        while let Some((document_index, image)) = self.next_active(&mut pending).await? {
            images[document_index].push(image);
            done += 1;
            self.progress.report(Stage::Images, done, total);
        }

        for page_images in &mut images {
            page_images.sort_by_key(|image| image.page_index);
        }
        Ok(images)
    }

    async fn classify_page(
        &self,
        session_id: &str,
        document: &DocumentInput,
        page_index: usize,
        png: &[u8],
    ) -> ExtractedImage {
        let page_name = format!("{}_page_{}.png", document.name, page_index + 1);
        let url = self
            .store_or_placeholder(
                session_id,
                &format!("images/{}", page_name),
                png,
                "image/png",
            )
            .await;
        let classification = self.classifier.classify(png).await;

        debug!(
            file = %document.name,
            page_index,
            label = classification.image_type.as_str(),
            "Classified page image"
        );

        ExtractedImage {
            id: format!("{}_{}_page_{}", session_id, document.name, page_index + 1),
            url,
            page_index,
            image_type: classification.image_type,
            confidence: classification.confidence,
            bounds: None,
        }
    }

    /// Store an object under the session, falling back to a placeholder URL.
    async fn store_or_placeholder(
        &self,
        session_id: &str,
        name: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> String {
        let path = format!("{}/{}", session_id, name);
        match self
            .store
            .put(&path, bytes, PutOptions::public(content_type))
            .await
        {
            Ok(stored) => stored.url,
            Err(e) => {
                warn!(path = %path, error = %e, "Storage failed, using placeholder URL");
                self.config.placeholder_url(session_id, name)
            }
        }
    }

    fn ensure_active(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(MaisokuError::Cancelled);
        }
        Ok(())
    }

    /// Next finished item, or `Cancelled` once the session is abandoned.
    ///
    /// Items still in flight at cancellation are dropped unfinished.
    async fn next_active<St>(&self, pending: &mut St) -> Result<Option<St::Item>>
    where
        St: Stream + Unpin,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(MaisokuError::Cancelled),
            next = pending.next() => {
                self.ensure_active()?;
                Ok(next)
            }
        }
    }
}

fn validate_request(request: &BatchRequest) -> Result<()> {
    if request.session_id.trim().is_empty() {
        return Err(MaisokuError::InvalidBatch {
            reason: "session id is empty".to_string(),
        });
    }
    if request.documents.is_empty() {
        return Err(MaisokuError::InvalidBatch {
            reason: "batch has no documents".to_string(),
        });
    }
    Ok(())
}

fn detect_document(
    detector: &CandidateDetector,
    document: &DocumentInput,
    url: String,
) -> ProcessedFile {
    let id = Uuid::new_v4();
    let pages = document.page_count.max(1);

    let (candidates, error) = if document.text.trim().is_empty() {
        warn!(file = %document.name, "Document has no text content");
        (Vec::new(), Some("no text content".to_string()))
    } else {
        (
            detector.detect(&document.text, pages, id, &document.name),
            None,
        )
    };

    ProcessedFile {
        id,
        name: document.name.clone(),
        url,
        pages,
        candidates,
        images: Vec::new(),
        error,
    }
}

/// Pair each group with its extraction and the images of the pages it covers.
fn assemble_listings(
    groups: &[ListingGroup],
    outcomes: Vec<ExtractionOutcome>,
    files: &[ProcessedFile],
) -> Vec<ListingRecord> {
    groups
        .iter()
        .zip(outcomes)
        .map(|(group, outcome)| {
            let images = files
                .iter()
                .flat_map(|file| {
                    file.images
                        .iter()
                        .filter(move |image| group.covers_page(file.id, image.page_index))
                })
                .cloned()
                .collect();

            ListingRecord {
                group_id: group.id,
                listing: outcome.listing,
                images,
                from_fallback: outcome.from_fallback,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryObjectStore;
    use crate::testing::{MockClassifier, MockExtractor};
    use crate::types::candidate::ListingCandidate;
    use std::time::Duration;

    fn processor(
        store: MemoryObjectStore,
    ) -> BatchProcessor<MockExtractor, MockClassifier, MemoryObjectStore> {
        BatchProcessor::new(MockExtractor::failing(), MockClassifier::new(), store)
            .with_config(PipelineConfig::default().with_call_delay(Duration::ZERO))
    }

    #[tokio::test]
    async fn test_rejects_empty_batch() {
        let result = processor(MemoryObjectStore::new())
            .process_batch(BatchRequest::new(vec![]))
            .await;
        assert!(matches!(result, Err(MaisokuError::InvalidBatch { .. })));
    }

    #[tokio::test]
    async fn test_rejects_empty_session() {
        let request = BatchRequest::for_session("  ", vec![DocumentInput::new("a.pdf", "x")]);
        let result = processor(MemoryObjectStore::new()).process_batch(request).await;
        assert!(matches!(result, Err(MaisokuError::InvalidBatch { .. })));
    }

    #[tokio::test]
    async fn test_storage_failure_uses_placeholder() {
        let request = BatchRequest::for_session(
            "s1",
            vec![DocumentInput::new("a.pdf", "物件名: A\n").with_page_image(vec![1, 2, 3])],
        );
        let result = processor(MemoryObjectStore::failing())
            .process_batch(request)
            .await
            .unwrap();

        let file = &result.files[0];
        assert_eq!(file.url, "https://example.com/mock-s1/a.pdf");
        assert_eq!(
            file.images[0].url,
            "https://example.com/mock-s1/images/a.pdf_page_1.png"
        );
    }

    #[tokio::test]
    async fn test_documents_are_stored_under_session() {
        let store = MemoryObjectStore::new();
        let request = BatchRequest::for_session(
            "s2",
            vec![DocumentInput::new("a.pdf", "物件名: A\n").with_bytes(b"%PDF".to_vec())],
        );
        let processor = processor(store);
        let result = processor.process_batch(request).await.unwrap();

        assert_eq!(result.files[0].url, "memory://s2/a.pdf");
        assert_eq!(processor.store().paths(), vec!["s2/a.pdf".to_string()]);
    }

    #[tokio::test]
    async fn test_empty_text_is_recorded_on_file() {
        let request = BatchRequest::for_session(
            "s3",
            vec![DocumentInput::new("blank.pdf", "  "), DocumentInput::new("b.pdf", "賃料: 80,000円")],
        );
        let result = processor(MemoryObjectStore::new())
            .process_batch(request)
            .await
            .unwrap();

        assert_eq!(result.files[0].error.as_deref(), Some("no text content"));
        assert!(result.files[0].candidates.is_empty());
        assert_eq!(result.files[1].candidates.len(), 1);
        assert_eq!(result.listings.len(), 1);
    }

    /// Groups by property name alone, ignoring address and rent.
    struct NameMatcher;

    impl ListingMatcher for NameMatcher {
        fn group_key(&self, candidate: &ListingCandidate) -> String {
            candidate.raw_name.clone()
        }
    }

    #[tokio::test]
    async fn test_custom_matcher_groups_batch() {
        let documents = vec![
            DocumentInput::new("a.pdf", "物件名: コーポ桜\n賃料: 55,000円\n"),
            DocumentInput::new("b.pdf", "物件名: コーポ桜\n賃料: 62,000円\n"),
        ];

        let by_key = processor(MemoryObjectStore::new())
            .process_batch(BatchRequest::new(documents.clone()))
            .await
            .unwrap();
        assert_eq!(by_key.groups.len(), 2);

        let by_name = processor(MemoryObjectStore::new())
            .with_matcher(NameMatcher)
            .process_batch(BatchRequest::new(documents))
            .await
            .unwrap();
        assert_eq!(by_name.groups.len(), 1);
        assert_eq!(by_name.groups[0].member_count(), 2);
        assert_eq!(by_name.listings.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_batch_returns_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        let request = BatchRequest::new(vec![DocumentInput::new("a.pdf", "物件名: A\n")]);

        let result = processor(MemoryObjectStore::new())
            .with_cancellation(token)
            .process_batch(request)
            .await;

        assert!(matches!(result, Err(MaisokuError::Cancelled)));
    }
}
