use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

use kbase_core::chunk::Chunker;
use kbase_core::config::Config;
use kbase_core::error::Error;
use kbase_core::traits::{DocumentLoader, Tokenizer};
use kbase_core::types::{Segment, DEFAULT_COLLECTION};
use kbase_embed::{HashEmbedder, HfTokenizer, WhitespaceTokenizer};
use kbase_hybrid::{AnswerEngine, KnowledgeBase, Reranker};
use kbase_text::LexicalCatalog;
use kbase_vector::MemoryVectorStore;

/// Plain-text loader for the CLI. PDF and DOCX parsing belongs to the
/// external loader services and is reported as unsupported here.
struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn load(&self, path: &Path) -> kbase_core::error::Result<Vec<Segment>> {
        match path.extension().and_then(|s| s.to_str()) {
            Some("txt") => {}
            Some(ext @ ("pdf" | "docx")) => {
                return Err(Error::UnsupportedFormat(format!(
                    ".{ext} needs an external document loader; this build reads plain text only"
                )));
            }
            other => {
                return Err(Error::UnsupportedFormat(format!(
                    ".{} (supported: .pdf, .docx, .txt)",
                    other.unwrap_or("?")
                )));
            }
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::LoadFailed(format!("{}: {e}", path.display())))?;
        let source = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        // Form feeds are page breaks in text dumps of paginated formats.
        Ok(content
            .split('\u{c}')
            .enumerate()
            .filter(|(_, text)| !text.trim().is_empty())
            .map(|(i, text)| Segment { text: text.to_string(), source: source.clone(), page: i + 1 })
            .collect())
    }
}

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().collect();
    let prog = args.remove(0);
    if args.is_empty() {
        eprintln!("Usage: {prog} <ingest|ask> [args...]");
        std::process::exit(1);
    }
    let cmd = args.remove(0);
    (cmd, args)
}

fn tokenizer_handle() -> anyhow::Result<Arc<dyn Tokenizer>> {
    match env::var("APP_TOKENIZER_JSON") {
        Ok(path) => {
            tracing::info!(path, "loading encoder tokenizer");
            Ok(Arc::new(HfTokenizer::from_file(Path::new(&path))?))
        }
        Err(_) => {
            tracing::info!("no encoder tokenizer configured; counting whitespace tokens");
            Ok(Arc::new(WhitespaceTokenizer))
        }
    }
}

fn build_knowledge_base(config: &Config) -> anyhow::Result<(KnowledgeBase, AnswerEngine)> {
    let store = Arc::new(MemoryVectorStore::new());
    let encoder = Arc::new(HashEmbedder::default());
    let lexical = Arc::new(LexicalCatalog::new());
    let chunker = Chunker::new(tokenizer_handle()?, config.chunking());

    let kb = KnowledgeBase::new(chunker, encoder.clone(), store.clone(), lexical.clone());
    // No completion service or pairwise scorer is wired in this build:
    // answers use the extractive path and fused candidate order.
    let engine = AnswerEngine::hybrid(
        store,
        encoder,
        lexical,
        Reranker::disabled(),
        None,
        config.retrieval(),
        config.generation(),
    );
    Ok((kb, engine))
}

fn text_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().and_then(|s| s.to_str()) == Some("txt"))
        .map(|e| e.path().to_path_buf())
        .collect();
    files.sort();
    files
}

async fn ingest_dir(kb: &KnowledgeBase, dir: &Path, collection: &str) -> anyhow::Result<usize> {
    let loader = PlainTextLoader;
    let files = text_files(dir);
    if files.is_empty() {
        anyhow::bail!("no .txt files under {}", dir.display());
    }
    let bar = ProgressBar::new(files.len() as u64);
    bar.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")?);
    let mut total = 0;
    for file in &files {
        bar.set_message(file.display().to_string());
        let segments = loader.load(file)?;
        total += kb.ingest(&segments, collection).await?;
        bar.inc(1);
    }
    bar.finish_and_clear();
    Ok(total)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = Config::load()?;
    let (cmd, args) = parse_args();
    match cmd.as_str() {
        "ingest" => {
            let dir = args.first().map(PathBuf::from).unwrap_or_else(|| {
                let dir: String = config.get("data.txt_dir").unwrap_or_else(|_| "./data".to_string());
                PathBuf::from(dir)
            });
            let collection = args.get(1).cloned().unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
            let (kb, _engine) = build_knowledge_base(&config)?;
            let chunks_count = ingest_dir(&kb, &dir, &collection).await?;
            println!("Ingested {chunks_count} passages into '{collection}'");
            for doc in kb.documents(&collection).await? {
                println!("  {}: {} passages", doc.source, doc.passages);
            }
        }
        "ask" => {
            let dir = args.first().map(PathBuf::from).unwrap_or_else(|| {
                eprintln!("Usage: kbase ask <data_dir> \"<question>\" [collection]");
                std::process::exit(1);
            });
            let question = args.get(1).cloned().unwrap_or_else(|| {
                eprintln!("Usage: kbase ask <data_dir> \"<question>\" [collection]");
                std::process::exit(1);
            });
            let collection = args.get(2).cloned().unwrap_or_else(|| DEFAULT_COLLECTION.to_string());
            let (kb, engine) = build_knowledge_base(&config)?;
            ingest_dir(&kb, &dir, &collection).await?;
            let result = engine.answer(&question, &collection).await?;
            println!("{}", result.answer);
            if !result.sources.is_empty() {
                println!("\nSources:");
                for source in &result.sources {
                    println!("  - {source}");
                }
            }
        }
        _ => {
            eprintln!("Unknown command: {cmd}");
            std::process::exit(1);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loader_splits_form_feed_pages() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path = tmp.path().join("manual.txt");
        let mut f = std::fs::File::create(&path).expect("create");
        write!(f, "page one text\u{c}page two text").expect("write");

        let segments = PlainTextLoader.load(&path).expect("load");
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].page, 1);
        assert_eq!(segments[1].page, 2);
        assert_eq!(segments[0].source, "manual.txt");
        assert!(segments[1].text.contains("page two"));
    }

    #[test]
    fn loader_rejects_unsupported_extensions() {
        let tmp = tempfile::TempDir::new().expect("tempdir");
        let path = tmp.path().join("image.png");
        std::fs::write(&path, b"not text").expect("write");
        let err = PlainTextLoader.load(&path).expect_err("unsupported");
        assert!(matches!(err, Error::UnsupportedFormat(_)));

        let pdf = tmp.path().join("doc.pdf");
        std::fs::write(&pdf, b"%PDF-").expect("write");
        let err = PlainTextLoader.load(&pdf).expect_err("external loader");
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn loader_reports_missing_file_as_load_failure() {
        let err = PlainTextLoader.load(Path::new("/definitely/missing.txt")).expect_err("missing");
        assert!(matches!(err, Error::LoadFailed(_)));
    }
}
