use std::collections::BTreeMap;

use serde::Serialize;

/// Metadata attached to a `Document`, keyed by `source`, `title`, `description`, `language`.
pub type Metadata = BTreeMap<String, String>;

/// Metadata key holding the URL a document was produced from.
pub const SOURCE_KEY: &str = "source";

/// Text of one fetched page plus its metadata.
///
/// Immutable once produced: `source` always equals the URL that was fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    content: String,
    metadata: Metadata,
}

impl Document {
    /// Builds a document for `source`; any `source` entry in `metadata` is overwritten.
    pub fn new(source: &str, content: String, mut metadata: Metadata) -> Self {
        metadata.insert(SOURCE_KEY.to_string(), source.to_string());
        Self { content, metadata }
    }

    /// A document whose only metadata is its source.
    pub fn with_source(source: &str, content: String) -> Self {
        Self::new(source, content, Metadata::new())
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn source(&self) -> &str {
        self.metadata
            .get(SOURCE_KEY)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn into_parts(self) -> (String, Metadata) {
        (self.content, self.metadata)
    }
}

/// How a loader waits: by blocking the calling thread or by suspending the task.
///
/// Both modes run the same fetch code and produce the same documents and
/// errors; only rate-limit waits differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    /// Blocking iteration (`WebLoader::lazy_load`)
    Blocking,
    /// Asynchronous iteration (`WebLoader::alazy_load`)
    Suspend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_source_overrides_metadata() {
        let mut metadata = Metadata::new();
        metadata.insert(SOURCE_KEY.to_string(), "http://spoofed.test".to_string());
        metadata.insert("title".to_string(), "T".to_string());

        let doc = Document::new("https://example.com", "body".to_string(), metadata);
        assert_eq!(doc.source(), "https://example.com");
        assert_eq!(doc.metadata().get("title").map(String::as_str), Some("T"));
        assert_eq!(doc.content(), "body");
    }

    #[test]
    fn test_document_serializes_as_content_and_metadata() {
        let doc = Document::with_source("https://example.com", "hello".to_string());
        let json = serde_json::to_value(&doc).expect("document should serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "content": "hello",
                "metadata": { "source": "https://example.com" }
            })
        );
    }
}
