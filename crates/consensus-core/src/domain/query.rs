//! Query input and the retrieval context bundle.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const BANNER_WIDTH: usize = 80;
const MAX_COMPLETE_FILES: usize = 2;
const MAX_CHUNKS: usize = 8;

/// Kind of retrieved snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnippetKind {
    /// A whole reference file, used as a structural template.
    CompleteFile,
    /// A syntactic node or semantic chunk.
    Chunk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub kind: SnippetKind,
    pub text: String,
}

impl Snippet {
    pub fn complete_file(text: impl Into<String>) -> Self {
        Self {
            kind: SnippetKind::CompleteFile,
            text: text.into(),
        }
    }

    pub fn chunk(text: impl Into<String>) -> Self {
        Self {
            kind: SnippetKind::Chunk,
            text: text.into(),
        }
    }
}

/// Ranked snippets supplied by the retrieval layer. Treated as prompt
/// material only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub snippets: Vec<Snippet>,
}

impl ContextBundle {
    pub fn new(snippets: Vec<Snippet>) -> Self {
        Self { snippets }
    }

    pub fn is_empty(&self) -> bool {
        self.snippets.is_empty()
    }

    /// Render the bundle into the prompt layout: the top complete files
    /// first, then the top chunks, each section under a banner.
    pub fn render(&self) -> String {
        let banner = "=".repeat(BANNER_WIDTH);
        let mut parts: Vec<String> = Vec::new();

        let files: Vec<&Snippet> = self
            .snippets
            .iter()
            .filter(|s| s.kind == SnippetKind::CompleteFile)
            .take(MAX_COMPLETE_FILES)
            .collect();
        if !files.is_empty() {
            parts.push(banner.clone());
            parts.push("COMPLETE REFERENCE FILES (USE AS TEMPLATES)".to_string());
            parts.push(banner.clone());
            for file in files {
                parts.push(file.text.clone());
                parts.push(format!("\n{}\n", "-".repeat(BANNER_WIDTH)));
            }
        }

        let chunks: Vec<&Snippet> = self
            .snippets
            .iter()
            .filter(|s| s.kind == SnippetKind::Chunk)
            .take(MAX_CHUNKS)
            .collect();
        if !chunks.is_empty() {
            parts.push(banner.clone());
            parts.push("ADDITIONAL DETAILED CONTEXT".to_string());
            parts.push(banner);
            for chunk in chunks {
                parts.push(chunk.text.clone());
                parts.push("\n".to_string());
            }
        }

        parts.join("\n")
    }
}

/// One end-user request. Read-only for the whole pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: Uuid,
    pub text: String,
    pub context: ContextBundle,
}

impl Query {
    pub fn new(text: impl Into<String>, context: ContextBundle) -> Self {
        Self {
            id: Uuid::new_v4(),
            text: text.into(),
            context,
        }
    }
}
