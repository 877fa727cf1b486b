//! End-to-end tests of the retrieval pipeline with in-process capabilities.
//!
//! A keyword-count embedder and a scripted completer stand in for the
//! network providers so every score and prompt is predictable.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;

use docchat_core::cache::IndexCache;
use docchat_core::chat::{ChatEngine, ChatSettings};
use docchat_core::chunk::ChunkingParams;
use docchat_core::citation::CitationMode;
use docchat_core::completion::{ChatMessage, Completer, Role, SYSTEM_PROMPT};
use docchat_core::embedding::Embedder;
use docchat_core::retrieve::retrieve;
use docchat_core::source::LoadedDocument;

// ─── Test capabilities ──────────────────────────────────────────────

const VOCABULARY: [&str; 4] = ["refund", "shipping", "warranty", "privacy"];

/// One dimension per vocabulary word, counting occurrences.
struct KeywordEmbedder {
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model_name(&self) -> &str {
        "keywords"
    }

    fn dims(&self) -> usize {
        VOCABULARY.len()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts
            .iter()
            .map(|t| {
                let lower = t.to_lowercase();
                VOCABULARY
                    .iter()
                    .map(|w| lower.matches(w).count() as f32)
                    .collect()
            })
            .collect())
    }
}

/// Replies with a fixed answer and records every prompt it receives.
struct ScriptedCompleter {
    reply: String,
    prompts: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedCompleter {
    fn new(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn last_prompt(&self) -> Vec<ChatMessage> {
        self.prompts.lock().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Completer for ScriptedCompleter {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        self.prompts.lock().push(messages.to_vec());
        Ok(self.reply.clone())
    }
}

struct FailingCompleter;

#[async_trait]
impl Completer for FailingCompleter {
    fn model_name(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _messages: &[ChatMessage]) -> Result<String> {
        anyhow::bail!("model overloaded")
    }
}

// ─── Fixtures ───────────────────────────────────────────────────────

const HANDBOOK: &str = "# Refunds\nA refund is issued within 30 days of purchase.\x0C\
# Shipping\nShipping takes five business days worldwide.\x0C\
# Warranty\nThe warranty covers defects for two years.";

fn handbook(version: &str, text: &str) -> LoadedDocument {
    LoadedDocument {
        id: "handbook".to_string(),
        name: "handbook.pdf".to_string(),
        mime_type: "application/pdf".to_string(),
        modified_time: "2024-05-01T10:00:00Z".to_string(),
        version: version.to_string(),
        text: Some(text.to_string()),
    }
}

fn small_chunks() -> ChunkingParams {
    ChunkingParams {
        target_chars: 40,
        overlap_chars: 10,
        max_chunks: 1000,
    }
}

fn cache(embedder: Arc<KeywordEmbedder>) -> Arc<IndexCache> {
    Arc::new(
        IndexCache::new(embedder, NonZeroUsize::new(8).unwrap()).with_chunking(small_chunks()),
    )
}

fn engine(
    embedder: Arc<KeywordEmbedder>,
    completer: Arc<dyn Completer>,
    mode: CitationMode,
) -> ChatEngine {
    ChatEngine::new(
        cache(embedder),
        completer,
        ChatSettings {
            top_k: 3,
            citation_mode: mode,
        },
    )
}

// ─── Retrieval ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_retrieval_ranks_matching_section_first() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let cache = cache(embedder.clone());
    let index = cache
        .build_or_load("handbook", "v1", HANDBOOK)
        .await
        .unwrap();
    assert_eq!(index.len(), 6);

    for (query, keyword) in [
        ("How do refunds work?", "refund"),
        ("What about shipping?", "shipping"),
        ("Is there a warranty?", "warranty"),
    ] {
        let hits = retrieve(&index, query, 3, embedder.as_ref()).await.unwrap();
        assert_eq!(hits.len(), 3);
        assert!(hits[0].score > 0.99, "{}: {}", query, hits[0].score);
        assert!(hits[0].text().to_lowercase().contains(keyword));
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
    }
}

#[tokio::test]
async fn test_retrieval_k_larger_than_index() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let cache = cache(embedder.clone());
    let index = cache
        .build_or_load("handbook", "v1", HANDBOOK)
        .await
        .unwrap();
    let hits = retrieve(&index, "refund", 50, embedder.as_ref())
        .await
        .unwrap();
    assert_eq!(hits.len(), index.len());
}

// ─── Chat turns ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_answer_rewrites_citations() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("Refunds take 30 days [CHUNK 1]."));
    let engine = engine(embedder, completer.clone(), CitationMode::PageOrTitle);
    let doc = handbook("v1", HANDBOOK);

    let answer = engine
        .answer(&[ChatMessage::user("How do refunds work?")], Some(&doc))
        .await
        .unwrap();

    assert_eq!(answer.text, "Refunds take 30 days (p. 1).");
    assert_eq!(answer.excerpts.len(), 3);
    assert_eq!(answer.excerpts[0].rank, 1);
    assert_eq!(answer.excerpts[0].id, "c0");

    let prompt = completer.last_prompt();
    assert_eq!(prompt.len(), 3);
    assert_eq!(prompt[0], ChatMessage::system(SYSTEM_PROMPT));
    assert_eq!(prompt[1].role, Role::User);
    assert!(prompt[1]
        .content
        .starts_with("You have access to an attached document (freshest version).\n"));
    assert!(prompt[1]
        .content
        .contains("File: handbook.pdf (mime=application/pdf, modified=2024-05-01T10:00:00Z)"));
    assert!(prompt[1]
        .content
        .contains("BEGIN_EXCERPTS\n[CHUNK 1 id=c0 start=0 end=40 page=1]\n# Refunds"));
    assert!(prompt[1].content.ends_with("END_EXCERPTS\n"));
    assert_eq!(prompt[2], ChatMessage::user("How do refunds work?"));
}

#[tokio::test]
async fn test_answer_mode_none_strips_markers() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("Refunds take 30 days [CHUNK 1, 2]."));
    let engine = engine(embedder, completer, CitationMode::None);
    let doc = handbook("v1", HANDBOOK);

    let answer = engine
        .answer(&[ChatMessage::user("refund?")], Some(&doc))
        .await
        .unwrap();
    assert_eq!(answer.text, "Refunds take 30 days.");
}

#[tokio::test]
async fn test_non_text_attachment_gets_notice() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("I cannot read it [CHUNK 1]."));
    let engine = engine(embedder.clone(), completer.clone(), CitationMode::PageOrTitle);
    let doc = LoadedDocument {
        id: "img-0001".to_string(),
        name: "diagram.png".to_string(),
        mime_type: "image/png".to_string(),
        modified_time: "2024-05-01T10:00:00Z".to_string(),
        version: "abc".to_string(),
        text: None,
    };

    let answer = engine
        .answer(&[ChatMessage::user("What does it show?")], Some(&doc))
        .await
        .unwrap();

    // No excerpts, so the model text is returned verbatim.
    assert_eq!(answer.text, "I cannot read it [CHUNK 1].");
    assert!(answer.excerpts.is_empty());
    assert_eq!(embedder.calls(), 0);

    let prompt = completer.last_prompt();
    assert_eq!(prompt.len(), 3);
    assert!(prompt[1].content.contains("id=img-0001"));
    assert!(prompt[1].content.contains("mime=image/png"));
    assert!(prompt[1].content.contains("not text-readable"));
}

#[tokio::test]
async fn test_no_attachment_has_no_context_block() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("Hello!"));
    let engine = engine(embedder.clone(), completer.clone(), CitationMode::PageOrTitle);
    let conversation = vec![
        ChatMessage::user("hi"),
        ChatMessage::assistant("hello"),
        ChatMessage::user("how are you?"),
    ];

    let answer = engine.answer(&conversation, None).await.unwrap();
    assert_eq!(answer.text, "Hello!");

    let prompt = completer.last_prompt();
    assert_eq!(prompt.len(), 4);
    assert_eq!(&prompt[1..], &conversation[..]);
    assert_eq!(embedder.calls(), 0);
}

#[tokio::test]
async fn test_no_user_message_retrieves_nothing() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("Ask me something [CHUNK 1]."));
    let engine = engine(embedder.clone(), completer.clone(), CitationMode::PageOrTitle);
    let doc = handbook("v1", HANDBOOK);

    let answer = engine
        .answer(&[ChatMessage::assistant("Welcome")], Some(&doc))
        .await
        .unwrap();

    assert!(answer.excerpts.is_empty());
    assert_eq!(answer.text, "Ask me something [CHUNK 1].");
    // The index is still built; only the query embedding is skipped.
    assert_eq!(embedder.calls(), 1);
    assert!(completer.last_prompt()[1]
        .content
        .contains("BEGIN_EXCERPTS\n\nEND_EXCERPTS"));
}

// ─── Cache behaviour through the engine ─────────────────────────────

#[tokio::test]
async fn test_repeated_turns_reuse_index() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("ok"));
    let engine = engine(embedder.clone(), completer, CitationMode::PageOrTitle);
    let doc = handbook("v1", HANDBOOK);

    engine
        .answer(&[ChatMessage::user("refund?")], Some(&doc))
        .await
        .unwrap();
    // One build batch plus one query.
    assert_eq!(embedder.calls(), 2);

    engine
        .answer(&[ChatMessage::user("shipping?")], Some(&doc))
        .await
        .unwrap();
    assert_eq!(embedder.calls(), 3);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn test_edited_document_rebuilds() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("See [CHUNK 1]."));
    let engine = engine(embedder.clone(), completer, CitationMode::Page);

    let v1 = handbook("v1", HANDBOOK);
    engine
        .answer(&[ChatMessage::user("privacy?")], Some(&v1))
        .await
        .unwrap();

    let edited = format!("{}\x0C# Privacy\nWe never sell privacy data.", HANDBOOK);
    let v2 = handbook("v2", &edited);
    let answer = engine
        .answer(&[ChatMessage::user("privacy?")], Some(&v2))
        .await
        .unwrap();

    assert_eq!(embedder.calls(), 4);
    assert_eq!(engine.cache().len(), 2);
    // The best chunk straddles the break before the new fourth page.
    assert!(answer.excerpts[0].text.contains("# Privacy"));
    assert_eq!(answer.excerpts[0].page, Some(3));
    assert_eq!(answer.excerpts[1].page, Some(4));
    assert_eq!(answer.text, "See (p. 3).");
}

#[tokio::test]
async fn test_concurrent_turns_build_once() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let completer = Arc::new(ScriptedCompleter::new("ok"));
    let engine = engine(embedder.clone(), completer, CitationMode::PageOrTitle);
    let doc = handbook("v1", HANDBOOK);
    let first = [ChatMessage::user("refund?")];
    let second = [ChatMessage::user("warranty?")];

    let (a, b) = tokio::join!(
        engine.answer(&first, Some(&doc)),
        engine.answer(&second, Some(&doc)),
    );
    a.unwrap();
    b.unwrap();

    // One build batch plus two queries.
    assert_eq!(embedder.calls(), 3);
    assert_eq!(engine.cache().len(), 1);
}

#[tokio::test]
async fn test_completion_failure_is_upstream() {
    let embedder = Arc::new(KeywordEmbedder::new());
    let engine = engine(embedder, Arc::new(FailingCompleter), CitationMode::PageOrTitle);
    let doc = handbook("v1", HANDBOOK);

    let err = engine
        .answer(&[ChatMessage::user("refund?")], Some(&doc))
        .await
        .unwrap_err();
    assert!(err.is_upstream());
    assert!(err.to_string().starts_with("completion capability failed"));
}
