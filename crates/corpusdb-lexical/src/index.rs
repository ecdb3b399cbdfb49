use corpusdb_core::error::{Error, Result};
use corpusdb_core::types::{Document, SearchHit, SourceKind};
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::{Schema, Value, STORED, STRING, TEXT};
use tantivy::{doc, Index, TantivyDocument, Term};

const WRITER_HEAP_BYTES: usize = 50_000_000;

fn build_schema() -> Schema {
    let mut builder = Schema::builder();
    builder.add_text_field("id", STRING | STORED);
    builder.add_text_field("content", TEXT | STORED);
    builder.build()
}

/// BM25 inverted index over raw document text.
///
/// Scoring uses tantivy's built-in BM25 (k1 = 1.2, b = 0.75). The index is
/// RAM-backed; the hybrid snapshot rebuilds it deterministically from the
/// document store on load, which keeps save/load scores bit-identical.
pub struct LexicalIndex {
    index: Index,
    id_field: tantivy::schema::Field,
    content_field: tantivy::schema::Field,
}

impl LexicalIndex {
    pub fn new() -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        let id_field = schema.get_field("id").map_err(storage)?;
        let content_field = schema.get_field("content").map_err(storage)?;
        Ok(Self {
            index,
            id_field,
            content_field,
        })
    }

    /// Rebuild a fresh index from an iterator of live documents.
    pub fn from_documents<'a>(documents: impl Iterator<Item = &'a Document>) -> Result<Self> {
        let idx = Self::new()?;
        let docs: Vec<Document> = documents.cloned().collect();
        idx.add(&docs)?;
        Ok(idx)
    }

    /// Upsert a batch: any existing posting for an incoming id is removed
    /// before the new content is indexed.
    pub fn add(&self, documents: &[Document]) -> Result<()> {
        let mut writer = self.index.writer(WRITER_HEAP_BYTES).map_err(storage)?;
        for d in documents {
            writer.delete_term(Term::from_field_text(self.id_field, &d.id));
            writer
                .add_document(doc!(
                    self.id_field => d.id.clone(),
                    self.content_field => d.content.clone(),
                ))
                .map_err(storage)?;
        }
        writer.commit().map_err(storage)?;
        Ok(())
    }

    pub fn update(&self, id: &str, document: &Document) -> Result<()> {
        if id != document.id {
            return Err(Error::Validation(format!(
                "update id {id} does not match document id {}",
                document.id
            )));
        }
        self.add(std::slice::from_ref(document))
    }

    pub fn delete(&self, id: &str) -> Result<()> {
        let mut writer = self
            .index
            .writer::<TantivyDocument>(WRITER_HEAP_BYTES)
            .map_err(storage)?;
        writer.delete_term(Term::from_field_text(self.id_field, id));
        writer.commit().map_err(storage)?;
        Ok(())
    }

    /// Top-k BM25 hits, descending score. An empty or unparseable query
    /// yields an empty list rather than an error.
    pub fn search(&self, query_text: &str, k: usize) -> Result<Vec<SearchHit>> {
        if query_text.trim().is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let reader = self.index.reader().map_err(storage)?;
        let searcher = reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.content_field]);
        let (query, parse_errors) = parser.parse_query_lenient(query_text);
        if !parse_errors.is_empty() {
            tracing::debug!(?parse_errors, "lenient query parse dropped clauses");
        }
        let top_docs = searcher
            .search(&query, &TopDocs::with_limit(k))
            .map_err(storage)?;
        let mut hits = Vec::with_capacity(top_docs.len());
        for (score, addr) in top_docs {
            let stored: TantivyDocument = searcher.doc(addr).map_err(storage)?;
            let id = stored
                .get_first(self.id_field)
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string();
            hits.push(SearchHit {
                id,
                score,
                source: SourceKind::Lexical,
            });
        }
        Ok(hits)
    }

    pub fn doc_count(&self) -> Result<usize> {
        let reader = self.index.reader().map_err(storage)?;
        Ok(reader.searcher().num_docs() as usize)
    }
}

fn storage(e: impl std::fmt::Display) -> Error {
    Error::Storage(e.to_string())
}
