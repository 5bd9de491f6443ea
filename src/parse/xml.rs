//! XML extraction for feeds, sitemaps and XHTML served as `.xml`.
//!
//! Mirrors the HTML rules on an event stream: all character data becomes the
//! text, and the first `title`, `meta name="description"` and `html` elements
//! supply the metadata.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::ParsedPage;

/// Parses an XML document. Fails on malformed input.
pub fn parse_xml(body: &str) -> Result<ParsedPage, quick_xml::Error> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().check_end_names = false;

    let mut page = ParsedPage::default();
    let mut depth = 0usize;
    // depth of the <title> element being captured
    let mut title_depth: Option<usize> = None;
    let mut title = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(element) => {
                depth += 1;
                if title_depth.is_none()
                    && page.title.is_none()
                    && element.local_name().as_ref() == b"title"
                {
                    title_depth = Some(depth);
                }
                inspect_element(&element, &mut page)?;
            }
            Event::Empty(element) => inspect_element(&element, &mut page)?,
            Event::End(_) => {
                if title_depth == Some(depth) {
                    page.title = Some(std::mem::take(&mut title));
                    title_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(fragment) => {
                let fragment = fragment.unescape()?;
                if title_depth.is_some() {
                    title.push_str(&fragment);
                }
                page.text.push_str(&fragment);
            }
            Event::CData(fragment) => {
                let fragment = String::from_utf8_lossy(&fragment);
                if title_depth.is_some() {
                    title.push_str(&fragment);
                }
                page.text.push_str(&fragment);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    // unterminated <title> at end of input
    if title_depth.is_some() {
        page.title = Some(title);
    }
    Ok(page)
}

fn inspect_element(element: &BytesStart<'_>, page: &mut ParsedPage) -> Result<(), quick_xml::Error> {
    match element.local_name().as_ref() {
        b"html" if page.language.is_none() => {
            page.language = Some(attribute(element, b"lang")?);
        }
        b"meta" if page.description.is_none() => {
            if attribute(element, b"name")?.as_deref() == Some("description") {
                page.description = Some(attribute(element, b"content")?);
            }
        }
        _ => {}
    }
    Ok(())
}

fn attribute(element: &BytesStart<'_>, name: &[u8]) -> Result<Option<String>, quick_xml::Error> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}
