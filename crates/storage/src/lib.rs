use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use lectern_core::{ChatMessage, ChatRole, Chunk, Document, DocumentStatus};
use parking_lot::RwLock;
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};

pub trait DocumentRepository: Send + Sync {
    async fn insert_document(&self, document: &Document) -> Result<()>;
    async fn load_document(&self, id: &str) -> Result<Option<Document>>;
    /// Newest upload first.
    async fn list_documents(&self) -> Result<Vec<Document>>;
    /// Stores the extracted text and chunks and flips the status to ready.
    /// Returns `false` when the document no longer exists.
    async fn mark_ready(&self, id: &str, extracted_text: &str, chunks: &[Chunk]) -> Result<bool>;
    async fn mark_failed(&self, id: &str, message: &str) -> Result<bool>;
    /// Returns `false` when the document no longer exists.
    async fn update_title(&self, id: &str, title: &str) -> Result<bool>;
    /// Removes the document together with its chunks and chat history.
    async fn delete_document(&self, id: &str) -> Result<bool>;
}

pub trait ChatRepository: Send + Sync {
    async fn append_messages(&self, document_id: &str, messages: &[ChatMessage]) -> Result<()>;
    async fn load_history(&self, document_id: &str) -> Result<Vec<ChatMessage>>;
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    documents: Arc<RwLock<HashMap<String, Document>>>,
    chats: Arc<RwLock<HashMap<String, Vec<ChatMessage>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentRepository for MemoryStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        self.documents
            .write()
            .insert(document.id.clone(), document.clone());
        Ok(())
    }

    async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        Ok(self.documents.read().get(id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let mut documents = self.documents.read().values().cloned().collect::<Vec<_>>();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    async fn mark_ready(&self, id: &str, extracted_text: &str, chunks: &[Chunk]) -> Result<bool> {
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(id) else {
            return Ok(false);
        };

        document.extracted_text = extracted_text.to_string();
        document.chunks = chunks.to_vec();
        document.status = DocumentStatus::Ready;
        document.error = None;
        Ok(true)
    }

    async fn mark_failed(&self, id: &str, message: &str) -> Result<bool> {
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(id) else {
            return Ok(false);
        };

        document.status = DocumentStatus::Failed;
        document.error = Some(message.to_string());
        Ok(true)
    }

    async fn update_title(&self, id: &str, title: &str) -> Result<bool> {
        let mut documents = self.documents.write();
        let Some(document) = documents.get_mut(id) else {
            return Ok(false);
        };

        document.title = title.to_string();
        Ok(true)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let removed = self.documents.write().remove(id).is_some();
        self.chats.write().remove(id);
        Ok(removed)
    }
}

impl ChatRepository for MemoryStore {
    async fn append_messages(&self, document_id: &str, messages: &[ChatMessage]) -> Result<()> {
        self.chats
            .write()
            .entry(document_id.to_string())
            .or_default()
            .extend_from_slice(messages);
        Ok(())
    }

    async fn load_history(&self, document_id: &str) -> Result<Vec<ChatMessage>> {
        Ok(self
            .chats
            .read()
            .get(document_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        // every connection to an in-memory database opens a fresh one
        let max_connections = if database_url.contains(":memory:") { 1 } else { 5 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .with_context(|| format!("failed connecting to sqlite at {}", database_url))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              file_name TEXT NOT NULL,
              file_size INTEGER NOT NULL,
              status TEXT NOT NULL,
              error TEXT,
              extracted_text TEXT NOT NULL,
              uploaded_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
              document_id TEXT NOT NULL,
              chunk_index INTEGER NOT NULL,
              page_number INTEGER NOT NULL,
              content TEXT NOT NULL,
              PRIMARY KEY (document_id, chunk_index)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chat_messages (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              document_id TEXT NOT NULL,
              role TEXT NOT NULL,
              content TEXT NOT NULL,
              timestamp TEXT NOT NULL,
              relevant_chunks_json TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn load_chunks(&self, document_id: &str) -> Result<Vec<Chunk>> {
        let rows = sqlx::query(
            r#"
            SELECT chunk_index, page_number, content
            FROM chunks
            WHERE document_id = ?1
            ORDER BY chunk_index
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Chunk {
                content: row.get("content"),
                chunk_index: row.get::<i64, _>("chunk_index") as usize,
                page_number: row.get::<i64, _>("page_number") as u32,
            })
            .collect())
    }

    async fn document_from_row(&self, row: SqliteRow) -> Result<Document> {
        let id: String = row.get("id");
        let status_code: String = row.get("status");
        let status = DocumentStatus::parse(&status_code)
            .ok_or_else(|| anyhow!("unknown status {status_code:?} for document {id}"))?;
        let uploaded_at = row
            .get::<String, _>("uploaded_at")
            .parse::<DateTime<Utc>>()
            .with_context(|| format!("invalid upload timestamp for document {id}"))?;
        let chunks = self.load_chunks(&id).await?;

        Ok(Document {
            title: row.get("title"),
            file_name: row.get("file_name"),
            file_size: row.get::<i64, _>("file_size") as u64,
            status,
            error: row.get("error"),
            extracted_text: row.get("extracted_text"),
            chunks,
            uploaded_at,
            id,
        })
    }
}

impl DocumentRepository for SqliteStore {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO documents (id, title, file_name, file_size, status, error, extracted_text, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&document.id)
        .bind(&document.title)
        .bind(&document.file_name)
        .bind(document.file_size as i64)
        .bind(document.status.as_code())
        .bind(&document.error)
        .bind(&document.extracted_text)
        .bind(
            document
                .uploaded_at
                .to_rfc3339_opts(SecondsFormat::Micros, true),
        )
        .execute(&mut *tx)
        .await?;

        insert_chunks(&mut tx, &document.id, &document.chunks).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(
            r#"
            SELECT id, title, file_name, file_size, status, error, extracted_text, uploaded_at
            FROM documents
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        self.document_from_row(row).await.map(Some)
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let rows = sqlx::query(
            r#"
            SELECT id, title, file_name, file_size, status, error, extracted_text, uploaded_at
            FROM documents
            ORDER BY uploaded_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut documents = Vec::with_capacity(rows.len());
        for row in rows {
            documents.push(self.document_from_row(row).await?);
        }
        Ok(documents)
    }

    async fn mark_ready(&self, id: &str, extracted_text: &str, chunks: &[Chunk]) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE documents
            SET status = ?2, error = NULL, extracted_text = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(DocumentStatus::Ready.as_code())
        .bind(extracted_text)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_chunks(&mut tx, id, chunks).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn mark_failed(&self, id: &str, message: &str) -> Result<bool> {
        let updated = sqlx::query("UPDATE documents SET status = ?2, error = ?3 WHERE id = ?1")
            .bind(id)
            .bind(DocumentStatus::Failed.as_code())
            .bind(message)
            .execute(&self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }

    async fn update_title(&self, id: &str, title: &str) -> Result<bool> {
        let updated = sqlx::query("UPDATE documents SET title = ?2 WHERE id = ?1")
            .bind(id)
            .bind(title)
            .execute(&self.pool)
            .await?;

        Ok(updated.rows_affected() > 0)
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM chunks WHERE document_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM chat_messages WHERE document_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM documents WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(removed.rows_affected() > 0)
    }
}

impl ChatRepository for SqliteStore {
    async fn append_messages(&self, document_id: &str, messages: &[ChatMessage]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for message in messages {
            sqlx::query(
                r#"
                INSERT INTO chat_messages (document_id, role, content, timestamp, relevant_chunks_json)
                VALUES (?1, ?2, ?3, ?4, ?5)
                "#,
            )
            .bind(document_id)
            .bind(message.role.as_code())
            .bind(&message.content)
            .bind(message.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true))
            .bind(serde_json::to_string(&message.relevant_chunks)?)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn load_history(&self, document_id: &str) -> Result<Vec<ChatMessage>> {
        let rows = sqlx::query(
            r#"
            SELECT role, content, timestamp, relevant_chunks_json
            FROM chat_messages
            WHERE document_id = ?1
            ORDER BY id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| -> Result<ChatMessage> {
                let role_code: String = row.get("role");
                let role = ChatRole::parse(&role_code)
                    .ok_or_else(|| anyhow!("unknown chat role {role_code:?}"))?;
                let relevant_json: String = row.get("relevant_chunks_json");

                Ok(ChatMessage {
                    role,
                    content: row.get("content"),
                    timestamp: row
                        .get::<String, _>("timestamp")
                        .parse::<DateTime<Utc>>()
                        .context("invalid chat message timestamp")?,
                    relevant_chunks: serde_json::from_str(&relevant_json)
                        .context("invalid relevant_chunks_json")?,
                })
            })
            .collect()
    }
}

async fn insert_chunks(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    document_id: &str,
    chunks: &[Chunk],
) -> Result<()> {
    for chunk in chunks {
        sqlx::query(
            r#"
            INSERT INTO chunks (document_id, chunk_index, page_number, content)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(document_id)
        .bind(chunk.chunk_index as i64)
        .bind(chunk.page_number as i64)
        .bind(&chunk.content)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    pub fn memory() -> Self {
        Self::Memory(MemoryStore::new())
    }

    pub async fn sqlite(database_url: &str) -> Result<Self> {
        let sqlite = SqliteStore::connect(database_url).await?;
        Ok(Self::Sqlite(sqlite))
    }

    pub async fn from_database_url(database_url: Option<&str>) -> Result<Self> {
        match database_url {
            Some(url) => Self::sqlite(url).await,
            None => Ok(Self::memory()),
        }
    }
}

impl DocumentRepository for Store {
    async fn insert_document(&self, document: &Document) -> Result<()> {
        match self {
            Store::Memory(store) => store.insert_document(document).await,
            Store::Sqlite(store) => store.insert_document(document).await,
        }
    }

    async fn load_document(&self, id: &str) -> Result<Option<Document>> {
        match self {
            Store::Memory(store) => store.load_document(id).await,
            Store::Sqlite(store) => store.load_document(id).await,
        }
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        match self {
            Store::Memory(store) => store.list_documents().await,
            Store::Sqlite(store) => store.list_documents().await,
        }
    }

    async fn mark_ready(&self, id: &str, extracted_text: &str, chunks: &[Chunk]) -> Result<bool> {
        match self {
            Store::Memory(store) => store.mark_ready(id, extracted_text, chunks).await,
            Store::Sqlite(store) => store.mark_ready(id, extracted_text, chunks).await,
        }
    }

    async fn mark_failed(&self, id: &str, message: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.mark_failed(id, message).await,
            Store::Sqlite(store) => store.mark_failed(id, message).await,
        }
    }

    async fn update_title(&self, id: &str, title: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.update_title(id, title).await,
            Store::Sqlite(store) => store.update_title(id, title).await,
        }
    }

    async fn delete_document(&self, id: &str) -> Result<bool> {
        match self {
            Store::Memory(store) => store.delete_document(id).await,
            Store::Sqlite(store) => store.delete_document(id).await,
        }
    }
}

impl ChatRepository for Store {
    async fn append_messages(&self, document_id: &str, messages: &[ChatMessage]) -> Result<()> {
        match self {
            Store::Memory(store) => store.append_messages(document_id, messages).await,
            Store::Sqlite(store) => store.append_messages(document_id, messages).await,
        }
    }

    async fn load_history(&self, document_id: &str) -> Result<Vec<ChatMessage>> {
        match self {
            Store::Memory(store) => store.load_history(document_id).await,
            Store::Sqlite(store) => store.load_history(document_id).await,
        }
    }
}
