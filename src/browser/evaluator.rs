use anyhow::Result;
use async_trait::async_trait;
use scraper::Selector;

use super::{BrowserPage, NavigationResponse, PageEvaluator};
use crate::parse::{parse_html_without, parse_selectors, ParsedPage};

/// Default evaluator: reads the rendered markup and extracts text and
/// metadata the same way as for fetched HTML, minus the subtrees matched by
/// the configured remove selectors.
pub struct HtmlTextEvaluator {
    remove: Vec<Selector>,
}

impl HtmlTextEvaluator {
    /// Invalid selectors are logged and ignored.
    pub fn new<S: AsRef<str>>(remove_selectors: &[S]) -> Self {
        Self {
            remove: parse_selectors(remove_selectors, "remove_selectors"),
        }
    }
}

#[async_trait]
impl PageEvaluator for HtmlTextEvaluator {
    async fn evaluate(
        &self,
        page: &dyn BrowserPage,
        _response: &NavigationResponse,
    ) -> Result<ParsedPage> {
        let markup = page.content().await?;
        Ok(parse_html_without(&markup, &self.remove))
    }
}
