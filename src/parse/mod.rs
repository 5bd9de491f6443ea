//! Page parsing and document production.
//!
//! Every fetch path ends here: the raw markup is parsed (XML when the URL path
//! ends in `.xml`, HTML otherwise) and turned into a `Document` whose metadata
//! follows the same rules whichever strategy fetched the page:
//!
//! - `title`: text of the first `<title>`
//! - `description`: `content` of `<meta name="description">`, or
//!   `DEFAULT_DESCRIPTION` when the attribute is missing
//! - `language`: `lang` of `<html>`, or `DEFAULT_LANGUAGE`
//!
//! Each key is absent when its element is absent. All parsing is done with the
//! `scraper` crate, except XML which goes through `quick-xml`.

mod html;
mod selector;
mod xml;

pub use html::{parse_html, parse_html_without};
pub use selector::{parse_selector, parse_selectors};
pub use xml::parse_xml;

use url::Url;

use crate::config::{DEFAULT_DESCRIPTION, DEFAULT_LANGUAGE};
use crate::error_handling::LoaderError;
use crate::models::{Document, Metadata};

/// Raw extraction result before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    pub text: String,
    /// Text of the first `<title>`, if there is one.
    pub title: Option<String>,
    /// `None` without a description tag; `Some(None)` when the tag has no `content`.
    pub description: Option<Option<String>>,
    /// `None` without an `<html>` tag; `Some(None)` when it has no `lang`.
    pub language: Option<Option<String>>,
}

impl ParsedPage {
    /// Metadata for this page, without `source`.
    pub fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(title) = &self.title {
            metadata.insert("title".to_string(), title.clone());
        }
        if let Some(description) = &self.description {
            metadata.insert(
                "description".to_string(),
                description
                    .clone()
                    .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            );
        }
        if let Some(language) = &self.language {
            metadata.insert(
                "language".to_string(),
                language
                    .clone()
                    .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            );
        }
        metadata
    }

    pub fn into_document(self, source: &str) -> Document {
        let metadata = self.metadata();
        Document::new(source, self.text, metadata)
    }
}

/// Whether `url` should be parsed as XML.
pub fn is_xml_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().ends_with(".xml"),
        Err(_) => url.ends_with(".xml"),
    }
}

/// Parses `body` fetched from `url` and builds its document.
pub fn document_from_markup(url: &str, body: &str) -> Result<Document, LoaderError> {
    let page = if is_xml_url(url) {
        parse_xml(body).map_err(|e| LoaderError::Parse {
            url: url.to_string(),
            message: e.to_string(),
        })?
    } else {
        parse_html(body)
    };
    Ok(page.into_document(url))
}
