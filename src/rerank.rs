//! Remote reranking through a Jina-compatible `/v1/rerank` endpoint.

use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_RERANK_URL, HTTP_REQUEST_TIMEOUT, NEUTRAL_RERANK_SCORE};

#[derive(Debug, Serialize)]
struct RerankRequest<'a> {
    model: &'a str,
    query: &'a str,
    documents: Vec<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_n: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct RerankResponse {
    results: Vec<RerankResult>,
}

#[derive(Debug, Deserialize)]
struct RerankResult {
    index: Option<usize>,
    relevance_score: f64,
}

/// Scores (query, document) pairs with a hosted reranking model.
#[derive(Debug, Clone)]
pub struct RemoteReranker {
    client: reqwest::Client,
    model: String,
    api_key: String,
    url: String,
}

impl RemoteReranker {
    /// Reranker for `model` at the default endpoint.
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            model: model.into(),
            api_key: api_key.into(),
            url: DEFAULT_RERANK_URL.to_string(),
        })
    }

    /// Points the reranker at another endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Relevance scores, one per pair, in input order.
    ///
    /// All pairs are scored against the query of the first pair. Documents
    /// the service leaves out (because of `top_n`) score `0.0`. Never fails:
    /// empty input gives an empty list, and any request or decoding failure
    /// gives `NEUTRAL_RERANK_SCORE` for every document.
    pub async fn predict<Q, D>(&self, pairs: &[(Q, D)], top_n: Option<usize>) -> Vec<f64>
    where
        Q: AsRef<str>,
        D: AsRef<str>,
    {
        let Some((query, _)) = pairs.first() else {
            warn!("No pairs provided to the reranker");
            return Vec::new();
        };
        let request = RerankRequest {
            model: &self.model,
            query: query.as_ref(),
            documents: pairs.iter().map(|(_, doc)| doc.as_ref()).collect(),
            top_n,
        };

        match self.rerank(&request).await {
            Ok(scores) => scores,
            Err(e) => {
                error!("Remote reranking failed: {e:#}");
                vec![NEUTRAL_RERANK_SCORE; pairs.len()]
            }
        }
    }

    async fn rerank(&self, request: &RerankRequest<'_>) -> anyhow::Result<Vec<f64>> {
        let response: RerankResponse = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        scores_in_input_order(response.results, request.documents.len())
    }
}

/// Places each score at its document's index; results without an index keep
/// their position.
fn scores_in_input_order(results: Vec<RerankResult>, documents: usize) -> anyhow::Result<Vec<f64>> {
    let mut scores = vec![0.0; documents];
    let mut seen = vec![false; documents];
    for (position, result) in results.into_iter().enumerate() {
        let index = result.index.unwrap_or(position);
        match seen.get(index).copied() {
            Some(false) => {
                seen[index] = true;
                scores[index] = result.relevance_score;
            }
            Some(true) => anyhow::bail!("duplicate result for document {index}"),
            None => anyhow::bail!("result index {index} out of range for {documents} document(s)"),
        }
    }
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(index: Option<usize>, relevance_score: f64) -> RerankResult {
        RerankResult {
            index,
            relevance_score,
        }
    }

    #[test]
    fn test_scores_follow_result_indices() {
        let results = vec![result(Some(2), 0.9), result(Some(0), 0.4), result(Some(1), 0.1)];
        assert_eq!(scores_in_input_order(results, 3).unwrap(), vec![0.4, 0.1, 0.9]);
    }

    #[test]
    fn test_missing_indices_use_position_and_top_n_gaps_score_zero() {
        let results = vec![result(None, 0.7)];
        assert_eq!(scores_in_input_order(results, 2).unwrap(), vec![0.7, 0.0]);
    }

    #[test]
    fn test_inconsistent_results_are_errors() {
        assert!(scores_in_input_order(vec![result(Some(5), 0.1)], 2).is_err());
        assert!(scores_in_input_order(vec![result(Some(0), 0.1), result(Some(0), 0.2)], 2).is_err());
    }

    #[test]
    fn test_request_omits_absent_top_n() {
        let request = RerankRequest {
            model: "m",
            query: "q",
            documents: vec!["a"],
            top_n: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"model": "m", "query": "q", "documents": ["a"]})
        );
    }
}
