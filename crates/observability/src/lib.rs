use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceCell<()> = OnceCell::new();

#[derive(Debug, Default)]
pub struct AppMetrics {
    documents_processed_total: AtomicU64,
    documents_failed_total: AtomicU64,
    chunks_created_total: AtomicU64,
    queries_total: AtomicU64,
    retrieval_hits_total: AtomicU64,
    total_query_latency_millis: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub documents_processed_total: u64,
    pub documents_failed_total: u64,
    pub chunks_created_total: u64,
    pub queries_total: u64,
    pub retrieval_hits_total: u64,
    pub avg_query_latency_millis: f64,
}

impl AppMetrics {
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_document_processed(&self, chunks: usize) {
        self.documents_processed_total
            .fetch_add(1, Ordering::Relaxed);
        self.chunks_created_total
            .fetch_add(chunks as u64, Ordering::Relaxed);
        metrics::counter!("lectern_documents_processed_total").increment(1);
        metrics::counter!("lectern_chunks_created_total").increment(chunks as u64);
    }

    pub fn inc_document_failed(&self) {
        self.documents_failed_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lectern_documents_failed_total").increment(1);
    }

    pub fn inc_query(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("lectern_queries_total").increment(1);
    }

    pub fn add_retrieval_hits(&self, hits: usize) {
        self.retrieval_hits_total
            .fetch_add(hits as u64, Ordering::Relaxed);
        metrics::counter!("lectern_retrieval_hits_total").increment(hits as u64);
    }

    pub fn observe_query_latency(&self, duration: Duration) {
        self.total_query_latency_millis
            .fetch_add(duration.as_millis() as u64, Ordering::Relaxed);
        metrics::histogram!("lectern_query_latency_seconds").record(duration.as_secs_f64());
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let queries = self.queries_total.load(Ordering::Relaxed);
        let latency = self.total_query_latency_millis.load(Ordering::Relaxed);

        MetricsSnapshot {
            documents_processed_total: self.documents_processed_total.load(Ordering::Relaxed),
            documents_failed_total: self.documents_failed_total.load(Ordering::Relaxed),
            chunks_created_total: self.chunks_created_total.load(Ordering::Relaxed),
            queries_total: queries,
            retrieval_hits_total: self.retrieval_hits_total.load(Ordering::Relaxed),
            avg_query_latency_millis: if queries == 0 {
                0.0
            } else {
                latency as f64 / queries as f64
            },
        }
    }
}

pub fn init_tracing(service_name: &str) {
    TRACING_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "{}=info,lectern_api=info,lectern_pipeline=info",
                service_name
            ))
        });

        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .init();
    });
}
