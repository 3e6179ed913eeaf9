use super::{LookupResult, MAX_QUERY_CHARS, MetadataSource};
use crate::citation::{Author, Citation};
use crate::matching::{reference_mentions_title, search_query};
use crate::rate_limit::{LookupError, check_rate_limit_response};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub struct CrossRef {
    pub mailto: Option<String>,
}

impl MetadataSource for CrossRef {
    fn name(&self) -> &str {
        "CrossRef"
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
            let mut url = format!(
                "https://api.crossref.org/works?query.bibliographic={}&rows=5",
                urlencoding::encode(&query)
            );

            let user_agent = if let Some(ref email) = self.mailto {
                url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
                format!("citegraph/0.1 (mailto:{})", email)
            } else {
                "citegraph/0.1".to_string()
            };

            let resp = client
                .get(&url)
                .header("User-Agent", user_agent)
                .timeout(timeout)
                .send()
                .await?;
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

pub(crate) fn select_match(reference: &str, data: &serde_json::Value) -> Option<Citation> {
    data["message"]["items"]
        .as_array()?
        .iter()
        .map(parse_work)
        .find(|c| c.has_title() && reference_mentions_title(reference, c.title()))
}

/// Convert one CrossRef `work` item into a [`Citation`].
pub(crate) fn parse_work(item: &serde_json::Value) -> Citation {
    let first_str = |v: &serde_json::Value| v.as_array().and_then(|a| a.first()).and_then(|v| v.as_str()).map(String::from);

    let authors = item["author"]
        .as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|a| {
                    let given = a["given"].as_str().unwrap_or("");
                    let family = a["family"].as_str().unwrap_or("");
                    let name = format!("{} {}", given, family).trim().to_string();
                    if name.is_empty() {
                        a["name"].as_str().map(Author::new)
                    } else {
                        Some(Author::new(name))
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    let year = ["issued", "published-print", "published-online", "created"]
        .iter()
        .find_map(|field| item[*field]["date-parts"][0][0].as_i64())
        .map(|y| y as i32);

    Citation {
        title: first_str(&item["title"]),
        authors,
        year,
        venue: first_str(&item["container-title"]),
        doi: item["DOI"].as_str().map(String::from),
        url: item["URL"].as_str().map(String::from),
        abstract_text: item["abstract"].as_str().map(String::from),
        citation_count: item["is-referenced-by-count"].as_u64(),
        reference_count: item["references-count"].as_u64(),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn work() -> serde_json::Value {
        json!({
            "DOI": "10.1038/nature14539",
            "URL": "https://doi.org/10.1038/nature14539",
            "title": ["Deep learning"],
            "container-title": ["Nature"],
            "author": [
                {"given": "Yann", "family": "LeCun"},
                {"given": "Yoshua", "family": "Bengio"},
                {"name": "Deep Learning Consortium"}
            ],
            "issued": {"date-parts": [[2015, 5, 27]]},
            "is-referenced-by-count": 60000,
            "references-count": 103
        })
    }

    #[test]
    fn parses_work_fields() {
        let c = parse_work(&work());
        assert_eq!(c.title.as_deref(), Some("Deep learning"));
        assert_eq!(c.venue.as_deref(), Some("Nature"));
        assert_eq!(c.year, Some(2015));
        assert_eq!(c.authors.len(), 3);
        assert_eq!(c.authors[0].name, "Yann LeCun");
        assert_eq!(c.authors[2].name, "Deep Learning Consortium");
        assert_eq!(c.citation_count, Some(60000));
        assert_eq!(c.doi.as_deref(), Some("10.1038/nature14539"));
    }

    #[test]
    fn year_falls_back_to_print_date() {
        let c = parse_work(&json!({
            "title": ["X"],
            "published-print": {"date-parts": [[2009]]}
        }));
        assert_eq!(c.year, Some(2009));
    }

    #[test]
    fn title_must_appear_in_reference() {
        // "Deep learning" normalizes to 12 chars and is contained
        let data = json!({"message": {"items": [work()]}});
        let raw = "LeCun, Y., Bengio, Y., Hinton, G. (2015). Deep learning. Nature 521.";
        assert!(select_match(raw, &data).is_some());
        assert!(select_match("Smith, J. (2020). Graph methods. Science.", &data).is_none());
    }
}
