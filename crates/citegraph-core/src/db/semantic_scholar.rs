use super::{LookupResult, MAX_QUERY_CHARS, MetadataSource};
use crate::citation::{Author, Citation};
use crate::matching::{reference_mentions_title, search_query};
use crate::rate_limit::{LookupError, check_rate_limit_response};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const FIELDS: &str = "title,authors,year,venue,abstract,citationCount,referenceCount,externalIds,url";

pub struct SemanticScholar {
    pub api_key: Option<String>,
}

impl MetadataSource for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn lookup<'a>(
        &'a self,
        reference: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            let query = search_query(reference, MAX_QUERY_CHARS);
            if query.is_empty() {
                return Ok(None);
            }
            let url = format!(
                "https://api.semanticscholar.org/graph/v1/paper/search?query={}&limit=5&fields={}",
                urlencoding::encode(&query),
                FIELDS
            );

            let mut req = client
                .get(&url)
                .header("User-Agent", "citegraph")
                .timeout(timeout);

            if let Some(ref key) = self.api_key {
                req = req.header("x-api-key", key);
            }

            let resp = req.send().await?;
            check_rate_limit_response(&resp)?;

            let status = resp.status();
            if !status.is_success() {
                return Err(LookupError::Status(status.as_u16()));
            }

            let data: serde_json::Value = resp
                .json()
                .await
                .map_err(|e| LookupError::Decode(e.to_string()))?;

            Ok(select_match(reference, &data))
        })
    }
}

/// Pick the first search hit whose title appears in the reference text.
pub(crate) fn select_match(reference: &str, data: &serde_json::Value) -> Option<Citation> {
    data["data"]
        .as_array()?
        .iter()
        .map(parse_paper)
        .find(|c| c.has_title() && reference_mentions_title(reference, c.title()))
}

/// Convert one Graph API paper object into a [`Citation`].
pub(crate) fn parse_paper(item: &serde_json::Value) -> Citation {
    let authors = item["authors"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| a["name"].as_str())
                .map(Author::new)
                .collect()
        })
        .unwrap_or_default();

    Citation {
        title: item["title"].as_str().map(String::from),
        authors,
        year: item["year"].as_i64().map(|y| y as i32),
        venue: item["venue"]
            .as_str()
            .filter(|v| !v.is_empty())
            .map(String::from),
        doi: item["externalIds"]["DOI"].as_str().map(String::from),
        url: item["url"].as_str().map(String::from),
        abstract_text: item["abstract"].as_str().map(String::from),
        citation_count: item["citationCount"].as_u64(),
        reference_count: item["referenceCount"].as_u64(),
        ..Default::default()
    }
}
