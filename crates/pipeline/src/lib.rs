mod error;
pub mod extract;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use lectern_core::{
    ChatAnswer, ChatMessage, ChatRole, ChunkingConfig, ConceptExplanation, Document,
    DocumentStatus, DocumentSummary, GeneratedSummary, RetrievalConfig, ScoredChunk,
};
use lectern_generation::GeneratorStack;
use lectern_observability::AppMetrics;
use lectern_retrieval::{chunk_text, find_relevant_chunks, normalize_text, snippet, PromptContext};
use lectern_storage::{ChatRepository, DocumentRepository};
use tracing::{info, instrument, warn};
use uuid::Uuid;

pub use error::PipelineError;
pub use extract::{ExtractError, FileExtractor, TextExtractor};

const PREVIEW_CHARS: usize = 160;

/// Where a document's text comes from.
#[derive(Debug, Clone)]
pub enum DocumentSource {
    Text(String),
    File(PathBuf),
}

impl DocumentSource {
    fn byte_len(&self) -> u64 {
        match self {
            Self::Text(text) => text.len() as u64,
            Self::File(path) => std::fs::metadata(path).map(|meta| meta.len()).unwrap_or(0),
        }
    }
}

#[derive(Clone)]
pub struct DocumentPipeline<S>
where
    S: DocumentRepository + ChatRepository,
{
    store: Arc<S>,
    generator: GeneratorStack,
    extractor: Arc<dyn TextExtractor>,
    metrics: Arc<AppMetrics>,
    chunking: ChunkingConfig,
    retrieval: RetrievalConfig,
}

impl<S> DocumentPipeline<S>
where
    S: DocumentRepository + ChatRepository,
{
    pub fn new(
        store: Arc<S>,
        generator: GeneratorStack,
        metrics: Arc<AppMetrics>,
        chunking: ChunkingConfig,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            store,
            generator,
            extractor: Arc::new(FileExtractor),
            metrics,
            chunking,
            retrieval,
        }
    }

    pub fn with_extractor(mut self, extractor: Arc<dyn TextExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    pub fn metrics(&self) -> &Arc<AppMetrics> {
        &self.metrics
    }

    pub fn generator_name(&self) -> &'static str {
        self.generator.model_name()
    }

    /// Records a new upload in the `processing` state.
    pub async fn register(
        &self,
        title: &str,
        file_name: &str,
        file_size: u64,
    ) -> Result<Document, PipelineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::EmptyInput("title"));
        }

        let document = Document {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            file_name: file_name.trim().to_string(),
            file_size,
            status: DocumentStatus::Processing,
            error: None,
            extracted_text: String::new(),
            chunks: Vec::new(),
            uploaded_at: Utc::now(),
        };

        self.store.insert_document(&document).await?;
        Ok(document)
    }

    /// Extracts and chunks a registered document, leaving it `ready` or
    /// `failed`. Extraction problems are recorded on the document rather
    /// than returned. A storage failure while saving the chunks is recorded
    /// as well and then returned.
    #[instrument(skip(self, source))]
    pub async fn process(
        &self,
        document_id: &str,
        source: DocumentSource,
    ) -> Result<Document, PipelineError> {
        match self.extract(source).await {
            Ok(text) => {
                let chunks = chunk_text(&text, &self.chunking);
                match self.store.mark_ready(document_id, &text, &chunks).await {
                    Ok(true) => {}
                    Ok(false) => return Err(PipelineError::NotFound(document_id.to_string())),
                    Err(err) => {
                        warn!(
                            document_id = %document_id,
                            error = %format!("{err:#}"),
                            "storing processed document failed"
                        );
                        self.store
                            .mark_failed(document_id, &format!("{err:#}"))
                            .await?;
                        self.metrics.inc_document_failed();
                        return Err(PipelineError::Storage(err));
                    }
                }

                self.metrics.inc_document_processed(chunks.len());
                info!(
                    document_id = %document_id,
                    chars = text.len(),
                    chunks = chunks.len(),
                    "document ready"
                );
            }
            Err(err) => {
                warn!(document_id = %document_id, error = %err, "document processing failed");
                if !self.store.mark_failed(document_id, &err.to_string()).await? {
                    return Err(PipelineError::NotFound(document_id.to_string()));
                }
                self.metrics.inc_document_failed();
            }
        }

        self.document(document_id).await
    }

    /// Registers and processes in one step.
    pub async fn ingest(
        &self,
        title: &str,
        file_name: &str,
        source: DocumentSource,
    ) -> Result<Document, PipelineError> {
        let document = self.register(title, file_name, source.byte_len()).await?;
        self.process(&document.id, source).await
    }

    pub async fn document(&self, document_id: &str) -> Result<Document, PipelineError> {
        self.store
            .load_document(document_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(document_id.to_string()))
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, PipelineError> {
        let documents = self.store.list_documents().await?;
        Ok(documents.iter().map(summarize).collect())
    }

    pub async fn rename(&self, document_id: &str, title: &str) -> Result<Document, PipelineError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(PipelineError::EmptyInput("title"));
        }

        if !self.store.update_title(document_id, title).await? {
            return Err(PipelineError::NotFound(document_id.to_string()));
        }

        info!(document_id = %document_id, title = %title, "document renamed");
        self.document(document_id).await
    }

    pub async fn delete(&self, document_id: &str) -> Result<(), PipelineError> {
        if self.store.delete_document(document_id).await? {
            info!(document_id = %document_id, "document deleted");
            Ok(())
        } else {
            Err(PipelineError::NotFound(document_id.to_string()))
        }
    }

    #[instrument(skip(self, query))]
    pub async fn relevant_chunks(
        &self,
        document_id: &str,
        query: &str,
        max_chunks: usize,
    ) -> Result<Vec<ScoredChunk>, PipelineError> {
        let started = Instant::now();
        let document = self.ready_document(document_id).await?;
        let ranked = self.rank(&document, query, max_chunks);
        self.metrics.observe_query_latency(started.elapsed());
        Ok(ranked)
    }

    #[instrument(skip(self, question))]
    pub async fn chat(
        &self,
        document_id: &str,
        question: &str,
    ) -> Result<ChatAnswer, PipelineError> {
        let started = Instant::now();
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyInput("question"));
        }

        let document = self.ready_document(document_id).await?;
        let ranked = self.rank(&document, question, self.retrieval.max_chunks);
        let context = PromptContext::from_ranked(&ranked);

        let answer = self
            .generator
            .generator
            .answer(question, &context)
            .map_err(|err| PipelineError::Generation(format!("{err:#}")))?;

        let now = Utc::now();
        self.store
            .append_messages(
                &document.id,
                &[
                    ChatMessage {
                        role: ChatRole::User,
                        content: question.to_string(),
                        timestamp: now,
                        relevant_chunks: Vec::new(),
                    },
                    ChatMessage {
                        role: ChatRole::Assistant,
                        content: answer.clone(),
                        timestamp: now,
                        relevant_chunks: context.chunk_indices.clone(),
                    },
                ],
            )
            .await?;

        self.metrics.observe_query_latency(started.elapsed());
        info!(
            document_id = %document.id,
            generator = self.generator.model_name(),
            relevant = ?context.chunk_indices,
            "chat answered"
        );

        Ok(ChatAnswer {
            document_id: document.id,
            question: question.to_string(),
            answer,
            relevant_chunks: context.chunk_indices,
        })
    }

    #[instrument(skip(self, concept))]
    pub async fn explain_concept(
        &self,
        document_id: &str,
        concept: &str,
    ) -> Result<ConceptExplanation, PipelineError> {
        let started = Instant::now();
        let concept = concept.trim();
        if concept.is_empty() {
            return Err(PipelineError::EmptyInput("concept"));
        }

        let document = self.ready_document(document_id).await?;
        let ranked = self.rank(&document, concept, self.retrieval.max_chunks);
        let context = PromptContext::from_ranked(&ranked);

        let explanation = self
            .generator
            .generator
            .explain(concept, &context)
            .map_err(|err| PipelineError::Generation(format!("{err:#}")))?;

        self.metrics.observe_query_latency(started.elapsed());

        Ok(ConceptExplanation {
            document_id: document.id,
            concept: concept.to_string(),
            explanation,
            relevant_chunks: context.chunk_indices,
        })
    }

    #[instrument(skip(self))]
    pub async fn summary(&self, document_id: &str) -> Result<GeneratedSummary, PipelineError> {
        let document = self.ready_document(document_id).await?;

        let summary = self
            .generator
            .generator
            .summarize(&normalize_text(&document.extracted_text))
            .map_err(|err| PipelineError::Generation(format!("{err:#}")))?;

        Ok(GeneratedSummary {
            document_id: document.id,
            title: document.title,
            summary,
        })
    }

    pub async fn chat_history(&self, document_id: &str) -> Result<Vec<ChatMessage>, PipelineError> {
        self.document(document_id).await?;
        Ok(self.store.load_history(document_id).await?)
    }

    async fn ready_document(&self, document_id: &str) -> Result<Document, PipelineError> {
        let document = self.document(document_id).await?;
        if !document.is_ready() {
            return Err(PipelineError::NotReady(document_id.to_string()));
        }
        Ok(document)
    }

    fn rank(&self, document: &Document, query: &str, max_chunks: usize) -> Vec<ScoredChunk> {
        let ranked = find_relevant_chunks(&document.chunks, query, max_chunks);
        self.metrics.inc_query();
        self.metrics.add_retrieval_hits(ranked.len());
        ranked
    }

    async fn extract(&self, source: DocumentSource) -> Result<String, ExtractError> {
        match source {
            DocumentSource::Text(text) => Ok(text),
            DocumentSource::File(path) => {
                let extractor = self.extractor.clone();
                tokio::task::spawn_blocking(move || extractor.extract(&path))
                    .await
                    .map_err(|err| ExtractError::Task(err.to_string()))?
            }
        }
    }
}

pub fn summarize(document: &Document) -> DocumentSummary {
    DocumentSummary {
        id: document.id.clone(),
        title: document.title.clone(),
        file_name: document.file_name.clone(),
        file_size: document.file_size,
        status: document.status,
        error: document.error.clone(),
        chunk_count: document.chunks.len(),
        preview: snippet(&document.extracted_text, PREVIEW_CHARS),
        uploaded_at: document.uploaded_at,
    }
}
