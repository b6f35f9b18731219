use anyhow::Result;
use tantivy::collector::TopDocs;
use tantivy::query::QueryParser;
use tantivy::schema::Value;
use tantivy::{doc, Index, TantivyDocument};

use kbase_core::types::Passage;

use crate::analyzer::{build_schema, register_analyzer};

/// A RAM-backed term-frequency index over one collection's passages.
/// Immutable once built; the catalog swaps whole indexes on rebuild.
pub struct LexicalIndex {
    index: Index,
    id_field: tantivy::schema::Field,
    text_field: tantivy::schema::Field,
    source_field: tantivy::schema::Field,
    sequence_field: tantivy::schema::Field,
    len: usize,
}

impl LexicalIndex {
    pub fn build(passages: &[Passage]) -> Result<Self> {
        let schema = build_schema();
        let index = Index::create_in_ram(schema.clone());
        register_analyzer(&index);
        let id_field = schema.get_field("id")?;
        let text_field = schema.get_field("text")?;
        let source_field = schema.get_field("source")?;
        let sequence_field = schema.get_field("sequence")?;

        let mut writer = index.writer(50_000_000)?;
        for p in passages {
            let doc = doc!(
                id_field => p.id.clone(),
                text_field => p.text.clone(),
                source_field => p.source.clone(),
                sequence_field => p.sequence_index as u64,
            );
            writer.add_document(doc)?;
        }
        writer.commit()?;

        Ok(Self { index, id_field, text_field, source_field, sequence_field, len: passages.len() })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Keyword search over passage texts. Malformed queries are parsed
    /// leniently; an unparsable or empty query yields an empty list.
    pub fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>> {
        if k == 0 || self.len == 0 {
            return Ok(Vec::new());
        }
        let reader = self.index.reader()?;
        let searcher = reader.searcher();
        let parser = QueryParser::for_index(&self.index, vec![self.text_field]);
        let (parsed, _lenient_errors) = parser.parse_query_lenient(query);
        let top_docs = searcher.search(&parsed, &TopDocs::with_limit(k))?;

        let mut hits = Vec::new();
        for (score, addr) in top_docs {
            let doc: TantivyDocument = searcher.doc(addr)?;
            let id = doc.get_first(self.id_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
            let text = doc.get_first(self.text_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
            let source = doc.get_first(self.source_field).and_then(|v| v.as_str()).unwrap_or("").to_string();
            let sequence = doc.get_first(self.sequence_field).and_then(|v| v.as_u64()).unwrap_or(0);
            let mut passage = Passage::new(id, text, source, sequence as usize);
            passage.score_metadata.insert("lexical_score".to_string(), score);
            hits.push(passage);
        }
        Ok(hits)
    }
}
