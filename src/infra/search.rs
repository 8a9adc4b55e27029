//! HTTP adapter over an Elasticsearch-compatible search backend.
//!
//! The index holds one disposable document per live post. Updates go through
//! `_update_by_query` with a parameter-bound script, and removal through
//! `_delete_by_query` matching the `id` field, so a document whose key drifted
//! from the post id is still reachable.

use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

use crate::application::pagination::PageRequest;
use crate::application::search::{DocumentPatch, SearchError, SearchIndex, SearchPage};
use crate::config::SearchSettings;
use crate::domain::posts::SearchDocument;
use crate::infra::error::InfraError;

const SEARCH_FIELDS: [&str; 2] = ["title", "content"];

pub struct HttpSearchIndex {
    http: reqwest::Client,
    base: Url,
    index: String,
}

impl HttpSearchIndex {
    pub fn new(settings: &SearchSettings) -> Result<Self, InfraError> {
        let base = Url::parse(&settings.url).map_err(|err| {
            InfraError::configuration(format!("invalid search backend url: {err}"))
        })?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
            index: settings.index.clone(),
        })
    }

    pub async fn ping(&self) -> Result<(), SearchError> {
        let response = self
            .http
            .get(self.base.clone())
            .send()
            .await
            .map_err(SearchError::transport)?;

        if !response.status().is_success() {
            return Err(SearchError::Rejected {
                status: response.status().as_u16(),
                message: "search backend health check failed".to_string(),
            });
        }
        Ok(())
    }

    fn endpoint(&self, operation: &str) -> Result<Url, SearchError> {
        self.base
            .join(&format!("{}/{}", self.index, operation))
            .map_err(SearchError::transport)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        url: Url,
        body: &Value,
    ) -> Result<T, SearchError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(SearchError::transport)?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SearchError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        response.json::<T>().await.map_err(SearchError::decode)
    }
}

#[async_trait]
impl SearchIndex for HttpSearchIndex {
    async fn index_post(&self, document: &SearchDocument) -> Result<(), SearchError> {
        let body = serde_json::to_value(document).map_err(SearchError::decode)?;
        let _: Value = self.post_json(self.endpoint("_doc")?, &body).await?;
        Ok(())
    }

    async fn update_post(&self, id: Uuid, patch: &DocumentPatch) -> Result<(), SearchError> {
        let body = json!({
            "query": { "match": { "id": id } },
            "script": update_script(patch),
        });
        let _: Value = self
            .post_json(self.endpoint("_update_by_query")?, &body)
            .await?;
        Ok(())
    }

    async fn search(&self, text: &str, page: PageRequest) -> Result<SearchPage, SearchError> {
        let body = search_body(text, &page);
        let response: EsSearchResponse =
            self.post_json(self.endpoint("_search")?, &body).await?;

        // Dual-mode count rule: a cursor call reports the unfiltered hit
        // total from a separate _count, not the post-cursor remainder.
        let total = if page.cursor.is_some() {
            let count: EsCountResponse = self
                .post_json(self.endpoint("_count")?, &count_body(text))
                .await?;
            count.count
        } else {
            response.hits.total.value
        };

        let ids = response
            .hits
            .hits
            .into_iter()
            .map(|hit| hit.source.id)
            .collect();

        Ok(SearchPage { ids, total })
    }

    async fn remove(&self, id: Uuid) -> Result<(), SearchError> {
        let body = json!({ "query": { "match": { "id": id } } });
        let _: Value = self
            .post_json(self.endpoint("_delete_by_query")?, &body)
            .await?;
        Ok(())
    }
}

/// Compile a typed patch into a painless script with bound `params`.
///
/// Field values never appear in the script source, so quotes or script
/// metacharacters in a title cannot malform the update.
fn update_script(patch: &DocumentPatch) -> Value {
    let mut assignments = Vec::new();
    let mut params = serde_json::Map::new();

    if let Some(title) = &patch.title {
        assignments.push("ctx._source.title = params.title");
        params.insert("title".to_string(), json!(title));
    }
    if let Some(content) = &patch.content {
        assignments.push("ctx._source.content = params.content");
        params.insert("content".to_string(), json!(content));
    }

    json!({
        "source": assignments.join("; "),
        "lang": "painless",
        "params": params,
    })
}

fn count_body(text: &str) -> Value {
    json!({
        "query": {
            "multi_match": { "query": text, "fields": SEARCH_FIELDS },
        },
    })
}

fn search_body(text: &str, page: &PageRequest) -> Value {
    let mut query = json!({
        "bool": {
            "should": {
                "multi_match": { "query": text, "fields": SEARCH_FIELDS },
            },
        },
    });
    if let Some(cursor) = page.cursor {
        query["bool"]["filter"] = json!({ "range": { "id": { "gt": cursor } } });
        // A bool query with a filter treats should clauses as optional; the
        // text match must stay mandatory in cursor mode too.
        query["bool"]["minimum_should_match"] = json!(1);
    }

    json!({
        "from": page.effective_offset(),
        "size": page.effective_limit(),
        "query": query,
        "sort": { "createdAt": { "order": "asc" } },
    })
}

#[derive(Debug, Deserialize)]
struct EsSearchResponse {
    hits: EsHits,
}

#[derive(Debug, Deserialize)]
struct EsHits {
    total: EsTotal,
    hits: Vec<EsHit>,
}

#[derive(Debug, Deserialize)]
struct EsTotal {
    value: u64,
}

#[derive(Debug, Deserialize)]
struct EsHit {
    #[serde(rename = "_source")]
    source: EsSource,
}

#[derive(Debug, Deserialize)]
struct EsSource {
    id: Uuid,
}

#[derive(Debug, Deserialize)]
struct EsCountResponse {
    count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_script_binds_values_as_params() {
        let patch = DocumentPatch {
            title: Some("it's; quoted".to_string()),
            content: None,
        };
        let script = update_script(&patch);

        assert_eq!(script["source"], "ctx._source.title = params.title");
        assert_eq!(script["params"]["title"], "it's; quoted");
        // The value must never leak into the script source.
        assert!(!script["source"].as_str().unwrap().contains("quoted"));
    }

    #[test]
    fn update_script_joins_multiple_assignments() {
        let patch = DocumentPatch {
            title: Some("a".to_string()),
            content: Some("b".to_string()),
        };
        let script = update_script(&patch);
        assert_eq!(
            script["source"],
            "ctx._source.title = params.title; ctx._source.content = params.content"
        );
    }

    #[test]
    fn search_body_without_cursor_has_no_filter() {
        let body = search_body("rust", &PageRequest::offset(3).with_limit(7));
        assert_eq!(body["from"], 3);
        assert_eq!(body["size"], 7);
        assert!(body["query"]["bool"].get("filter").is_none());
        assert!(body["query"]["bool"].get("minimum_should_match").is_none());
        assert_eq!(body["sort"]["createdAt"]["order"], "asc");
    }

    #[test]
    fn search_body_with_cursor_filters_greater_ids() {
        let cursor = Uuid::new_v4();
        let body = search_body("rust", &PageRequest::keyset(cursor));
        assert_eq!(
            body["query"]["bool"]["filter"]["range"]["id"]["gt"],
            cursor.to_string()
        );
        // The filter alone must not satisfy the query.
        assert_eq!(body["query"]["bool"]["minimum_should_match"], 1);
    }

    #[test]
    fn search_response_shape_parses() {
        let raw = json!({
            "hits": {
                "total": { "value": 42, "relation": "eq" },
                "hits": [
                    { "_source": { "id": "7f2c1a9e-9e1b-4f3a-8a76-0d9df31cf102",
                                   "title": "Go", "content": "systems" } }
                ],
            },
        });
        let parsed: EsSearchResponse = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.hits.total.value, 42);
        assert_eq!(parsed.hits.hits.len(), 1);
    }
}
