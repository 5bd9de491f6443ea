//! HTML extraction: visible text, `<title>`, meta description and `<html lang>`.

use std::cell::Cell;
use std::collections::HashSet;
use std::sync::LazyLock;

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::states::RawKind;
use html5ever::tokenizer::{
    BufferQueue, TagKind, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};
use scraper::{ElementRef, Html, Node, Selector};

use super::selector::parse_selector;
use super::ParsedPage;

// CSS selector strings
const TITLE_SELECTOR_STR: &str = "title";
const META_DESCRIPTION_SELECTOR_STR: &str = "meta[name='description']";
const HTML_SELECTOR_STR: &str = "html";

static TITLE_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| parse_selector(TITLE_SELECTOR_STR, "page title"));

static META_DESCRIPTION_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| parse_selector(META_DESCRIPTION_SELECTOR_STR, "meta description"));

static HTML_SELECTOR: LazyLock<Option<Selector>> =
    LazyLock::new(|| parse_selector(HTML_SELECTOR_STR, "document language"));

/// Elements whose text never reaches the extracted content.
const NON_CONTENT_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

/// Parses an HTML page.
pub fn parse_html(body: &str) -> ParsedPage {
    parse_html_without(body, &[])
}

/// Parses an HTML page, dropping the subtrees matched by `remove` from the text.
///
/// Metadata is read from the whole document regardless of `remove`.
pub fn parse_html_without(body: &str, remove: &[Selector]) -> ParsedPage {
    let document = Html::parse_document(body);

    let title = first_match(&document, &TITLE_SELECTOR).map(|el| el.text().collect::<String>());
    let description = first_match(&document, &META_DESCRIPTION_SELECTOR)
        .map(|el| el.value().attr("content").map(str::to_string));
    let language = if has_html_start_tag(body) {
        first_match(&document, &HTML_SELECTOR).map(|el| el.value().attr("lang").map(str::to_string))
    } else {
        None
    };

    log::debug!(
        "Parsed HTML: title={:?}, description present={}, language present={}",
        title,
        description.is_some(),
        language.is_some()
    );

    ParsedPage {
        text: visible_text(&document, remove),
        title,
        description,
        language,
    }
}

fn first_match<'a>(document: &'a Html, selector: &Option<Selector>) -> Option<ElementRef<'a>> {
    selector.as_ref().and_then(|s| document.select(s).next())
}

/// Whether the markup contains a real `<html>` start tag.
///
/// The tree builder always synthesises an `<html>` root, so the raw token
/// stream is checked instead. Tags inside comments, scripts, styles and
/// attribute values are not tags and do not count.
fn has_html_start_tag(body: &str) -> bool {
    let input = BufferQueue::default();
    input.push_back(StrTendril::from_slice(body));
    let tokenizer = Tokenizer::new(HtmlTagSink::default(), TokenizerOpts::default());
    let _ = tokenizer.feed(&input);
    tokenizer.end();
    tokenizer.sink.found.get()
}

#[derive(Default)]
struct HtmlTagSink {
    found: Cell<bool>,
}

impl TokenSink for HtmlTagSink {
    type Handle = ();

    fn process_token(&self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        let Token::TagToken(tag) = token else {
            return TokenSinkResult::Continue;
        };
        if tag.kind != TagKind::StartTag {
            return TokenSinkResult::Continue;
        }
        // the tokenizer needs to be told which elements hold raw text
        match &*tag.name {
            "html" => {
                self.found.set(true);
                TokenSinkResult::Continue
            }
            "script" => TokenSinkResult::RawData(RawKind::ScriptData),
            "style" | "xmp" | "iframe" | "noembed" | "noframes" | "noscript" => {
                TokenSinkResult::RawData(RawKind::Rawtext)
            }
            "title" | "textarea" => TokenSinkResult::RawData(RawKind::Rcdata),
            "plaintext" => TokenSinkResult::Plaintext,
            _ => TokenSinkResult::Continue,
        }
    }
}

/// Concatenates the document's text nodes in order, skipping scripts, styles
/// and anything under an element matched by `remove`.
fn visible_text(document: &Html, remove: &[Selector]) -> String {
    let removed: HashSet<_> = remove
        .iter()
        .flat_map(|selector| document.select(selector).map(|el| el.id()))
        .collect();

    let mut text = String::new();
    for node in document.tree.root().descendants() {
        let Node::Text(fragment) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            removed.contains(&ancestor.id())
                || ancestor
                    .value()
                    .as_element()
                    .is_some_and(|el| NON_CONTENT_ELEMENTS.contains(&el.name()))
        });
        if !hidden {
            text.push_str(fragment);
        }
    }
    text
}
