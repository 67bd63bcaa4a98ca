//! MediaWiki API client.
//!
//! One [`MediaWiki`] client serves the three sources (knowledge graph,
//! media repository, encyclopedia) over a shared [`Transport`].
//!
//! # Continuation
//!
//! Every query starts with `continue=` (empty). When a response carries a
//! `continue` object, its entries replace the continuation parameters of
//! the next request, on top of the base parameters; the loop stops when a
//! response has none. Each response is folded into an [`Accumulator`].
//!
//! # Errors
//!
//! Any transport, HTTP status or decode problem, and any API-level
//! `{"error": {...}}` body, is a [`FetchError`] and is fatal for the run.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::config::MediawikiConfig;

/// Hard limit of identifiers per `ids=` / `titles=` request.
pub const MAX_IDS_PER_REQUEST: usize = 50;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("mediawiki.user_agent is not configured; MediaWiki APIs require a User-Agent")]
    MissingUserAgent,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("invalid response from {endpoint}: {message}")]
    Decode { endpoint: String, message: String },

    #[error("{count} identifiers exceed the limit of {limit} per request")]
    TooManyIds { count: usize, limit: usize },
}

/// Request parameters, sorted so requests are reproducible in logs.
pub type Params = BTreeMap<String, String>;

/// Sends one GET request and decodes the JSON body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, endpoint: &str, params: &Params) -> Result<Value, FetchError>;
}

/// `reqwest` transport with the mandatory User-Agent and a timeout.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &MediawikiConfig) -> Result<Self, FetchError> {
        let user_agent = config
            .user_agent
            .as_deref()
            .filter(|ua| !ua.trim().is_empty())
            .ok_or(FetchError::MissingUserAgent)?;
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, endpoint: &str, params: &Params) -> Result<Value, FetchError> {
        let transport_error = |source| FetchError::Transport {
            endpoint: endpoint.to_string(),
            source,
        };

        let resp = self
            .client
            .get(endpoint)
            .query(params)
            .send()
            .await
            .map_err(transport_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_default();
            return Err(FetchError::Status {
                endpoint: endpoint.to_string(),
                status,
                body: body.chars().take(500).collect(),
            });
        }

        let body = resp.text().await.map_err(transport_error)?;
        let value: Value = serde_json::from_str(&body).map_err(|e| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: e.to_string(),
        })?;
        check_api_error(endpoint, value)
    }
}

/// Turn an API-level `{"error": {"code", "info"}}` body into a decode error.
pub fn check_api_error(endpoint: &str, value: Value) -> Result<Value, FetchError> {
    if let Some(error) = value.get("error") {
        let field = |k: &str| error.get(k).and_then(Value::as_str).unwrap_or("").to_string();
        return Err(FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: format!("API error {}: {}", field("code"), field("info")),
        });
    }
    Ok(value)
}

/// Continuation parameters of an in-progress query.
#[derive(Debug, Clone, PartialEq)]
pub struct Continuation {
    params: Params,
    done: bool,
}

impl Default for Continuation {
    fn default() -> Self {
        Self::new()
    }
}

impl Continuation {
    pub fn new() -> Self {
        let mut params = Params::new();
        params.insert("continue".to_string(), String::new());
        Self {
            params,
            done: false,
        }
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Base parameters with the current continuation applied on top.
    pub fn apply(&self, base: &Params) -> Params {
        let mut merged = base.clone();
        merged.extend(self.params.clone());
        merged
    }

    /// Read the `continue` object of a response.
    pub fn advance(&mut self, endpoint: &str, response: &Value) -> Result<(), FetchError> {
        let Some(next) = response.get("continue") else {
            self.done = true;
            return Ok(());
        };
        let next = next.as_object().ok_or_else(|| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: "continue is not an object".to_string(),
        })?;
        self.params = next
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect();
        Ok(())
    }
}

/// Folds the responses of a continued query into one result.
pub trait Accumulator: Default {
    type Output;

    fn absorb(&mut self, endpoint: &str, response: &Value) -> Result<(), FetchError>;

    fn finish(self) -> Self::Output;
}

fn object_at<'v>(
    endpoint: &str,
    value: &'v Value,
    key: &str,
) -> Result<Option<&'v Map<String, Value>>, FetchError> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => v.as_object().map(Some).ok_or_else(|| FetchError::Decode {
            endpoint: endpoint.to_string(),
            message: format!("{key} is not an object"),
        }),
    }
}

/// `wbgetentities` entities by id. Entities reported missing are dropped.
#[derive(Default)]
pub struct EntityMap(BTreeMap<String, Value>);

impl Accumulator for EntityMap {
    type Output = BTreeMap<String, Value>;

    fn absorb(&mut self, endpoint: &str, response: &Value) -> Result<(), FetchError> {
        if let Some(entities) = object_at(endpoint, response, "entities")? {
            for (id, entity) in entities {
                if entity.get("missing").is_none() {
                    self.0.insert(id.clone(), entity.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Self::Output {
        self.0
    }
}

/// `query.pages` keyed by the title that was requested.
///
/// Titles rewritten by the API (`query.normalized`) are mapped back, and a
/// page split across continued responses is merged key by key.
#[derive(Default)]
pub struct PageMap {
    pages: BTreeMap<String, Map<String, Value>>,
    normalized: BTreeMap<String, String>,
}

impl Accumulator for PageMap {
    type Output = BTreeMap<String, Value>;

    fn absorb(&mut self, endpoint: &str, response: &Value) -> Result<(), FetchError> {
        let Some(query) = response.get("query") else {
            return Ok(());
        };
        if let Some(normalized) = query.get("normalized").and_then(Value::as_array) {
            for n in normalized {
                if let (Some(from), Some(to)) = (
                    n.get("from").and_then(Value::as_str),
                    n.get("to").and_then(Value::as_str),
                ) {
                    self.normalized.insert(to.to_string(), from.to_string());
                }
            }
        }
        if let Some(pages) = object_at(endpoint, query, "pages")? {
            for page in pages.values() {
                let Some(page) = page.as_object() else {
                    continue;
                };
                let Some(title) = page.get("title").and_then(Value::as_str) else {
                    continue;
                };
                let stored = self.pages.entry(title.to_string()).or_default();
                for (k, v) in page {
                    stored.insert(k.clone(), v.clone());
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Self::Output {
        let PageMap { pages, normalized } = self;
        pages
            .into_iter()
            .map(|(title, page)| {
                let requested = normalized.get(&title).cloned().unwrap_or(title);
                (requested, Value::Object(page))
            })
            .collect()
    }
}

/// Titles from `list=categorymembers`, in API order.
#[derive(Default)]
pub struct MemberList(Vec<String>);

impl Accumulator for MemberList {
    type Output = Vec<String>;

    fn absorb(&mut self, _endpoint: &str, response: &Value) -> Result<(), FetchError> {
        if let Some(members) = response
            .pointer("/query/categorymembers")
            .and_then(Value::as_array)
        {
            self.0.extend(
                members
                    .iter()
                    .filter_map(|m| m.get("title").and_then(Value::as_str))
                    .map(str::to_string),
            );
        }
        Ok(())
    }

    fn finish(self) -> Self::Output {
        self.0
    }
}

fn params(pairs: &[(&str, &str)]) -> Params {
    let mut p: Params = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    p.insert("format".to_string(), "json".to_string());
    p
}

fn check_batch(ids: &[String]) -> Result<(), FetchError> {
    if ids.len() > MAX_IDS_PER_REQUEST {
        return Err(FetchError::TooManyIds {
            count: ids.len(),
            limit: MAX_IDS_PER_REQUEST,
        });
    }
    Ok(())
}

/// Client for the three MediaWiki sources.
pub struct MediaWiki<'a> {
    transport: &'a dyn Transport,
    config: &'a MediawikiConfig,
}

impl<'a> MediaWiki<'a> {
    pub fn new(transport: &'a dyn Transport, config: &'a MediawikiConfig) -> Self {
        Self { transport, config }
    }

    /// Run a continued query to completion.
    pub async fn query<A: Accumulator>(
        &self,
        endpoint: &str,
        base: &Params,
    ) -> Result<A::Output, FetchError> {
        let mut continuation = Continuation::new();
        let mut acc = A::default();
        let mut requests = 0usize;
        while !continuation.is_done() {
            let response = self
                .transport
                .get_json(endpoint, &continuation.apply(base))
                .await?;
            acc.absorb(endpoint, &response)?;
            continuation.advance(endpoint, &response)?;
            requests += 1;
        }
        debug!(endpoint, requests, "query complete");
        Ok(acc.finish())
    }

    /// Knowledge-graph entities. `props` and `languages` are `|`-joined.
    pub async fn wikidata_entities(
        &self,
        ids: &[String],
        props: &str,
        languages: &[String],
    ) -> Result<BTreeMap<String, Value>, FetchError> {
        check_batch(ids)?;
        let base = params(&[
            ("action", "wbgetentities"),
            ("ids", &ids.join("|")),
            ("props", props),
            ("languages", &languages.join("|")),
        ]);
        self.query::<EntityMap>(&self.config.wikidata_endpoint, &base)
            .await
    }

    /// Media-repository pages with their current wikitext.
    pub async fn commons_pages(
        &self,
        titles: &[String],
    ) -> Result<BTreeMap<String, Value>, FetchError> {
        check_batch(titles)?;
        let base = params(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content"),
            ("titles", &titles.join("|")),
        ]);
        self.query::<PageMap>(&self.config.commons_endpoint, &base)
            .await
    }

    /// File members of a media-repository category.
    pub async fn category_members(&self, category: &str) -> Result<Vec<String>, FetchError> {
        let base = params(&[
            ("action", "query"),
            ("list", "categorymembers"),
            ("cmtype", "file"),
            ("cmtitle", category),
        ]);
        self.query::<MemberList>(&self.config.commons_endpoint, &base)
            .await
    }

    /// Image info of media files, with a thumbnail URL at `width` pixels.
    pub async fn image_info(
        &self,
        titles: &[String],
        width: u32,
    ) -> Result<BTreeMap<String, Value>, FetchError> {
        check_batch(titles)?;
        let base = params(&[
            ("action", "query"),
            ("prop", "imageinfo"),
            ("iiprop", "url"),
            ("iiurlwidth", &width.to_string()),
            ("titles", &titles.join("|")),
        ]);
        self.query::<PageMap>(&self.config.commons_endpoint, &base)
            .await
    }

    /// Encyclopedia pages with their current wikitext.
    pub async fn wikipedia_pages(
        &self,
        language: &str,
        titles: &[String],
    ) -> Result<BTreeMap<String, Value>, FetchError> {
        check_batch(titles)?;
        let base = params(&[
            ("action", "query"),
            ("prop", "revisions"),
            ("rvprop", "content"),
            ("titles", &titles.join("|")),
        ]);
        let endpoint = self.config.wikipedia_endpoint_for(language);
        self.query::<PageMap>(&endpoint, &base).await
    }

    /// Rendered HTML of section 0 of an encyclopedia page.
    pub async fn wikipedia_lead_html(
        &self,
        language: &str,
        title: &str,
    ) -> Result<String, FetchError> {
        let endpoint = self.config.wikipedia_endpoint_for(language);
        let base = params(&[
            ("action", "parse"),
            ("prop", "text"),
            ("section", "0"),
            ("page", title),
        ]);
        let response = self.transport.get_json(&endpoint, &base).await?;
        response
            .pointer("/parse/text/*")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| FetchError::Decode {
                endpoint,
                message: format!("no parse.text for '{title}'"),
            })
    }
}

#[cfg(test)]
pub mod testing {
    //! Scripted transport for unit tests.

    use std::sync::Mutex;

    use super::*;

    type Handler = dyn Fn(&str, &Params) -> Result<Value, FetchError> + Send + Sync;

    /// Answers every request with a closure and records what was asked.
    pub struct FakeTransport {
        handler: Box<Handler>,
        requests: Mutex<Vec<(String, Params)>>,
    }

    impl FakeTransport {
        pub fn new<F>(handler: F) -> Self
        where
            F: Fn(&str, &Params) -> Result<Value, FetchError> + Send + Sync + 'static,
        {
            Self {
                handler: Box::new(handler),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn requests(&self) -> Vec<(String, Params)> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn get_json(&self, endpoint: &str, params: &Params) -> Result<Value, FetchError> {
            self.requests
                .lock()
                .unwrap()
                .push((endpoint.to_string(), params.clone()));
            (self.handler)(endpoint, params).and_then(|v| check_api_error(endpoint, v))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::FakeTransport;
    use super::*;
    use serde_json::json;

    fn config() -> MediawikiConfig {
        MediawikiConfig {
            user_agent: Some("lachaise-sync-tests".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_http_transport_requires_user_agent() {
        let config = MediawikiConfig::default();
        assert!(matches!(
            HttpTransport::new(&config),
            Err(FetchError::MissingUserAgent)
        ));
    }

    #[test]
    fn test_continuation_replaces_params() {
        let mut c = Continuation::new();
        let base = params(&[("action", "query")]);
        assert_eq!(c.apply(&base).get("continue").map(String::as_str), Some(""));

        c.advance("e", &json!({"continue": {"continue": "-||", "cmcontinue": "file|42"}}))
            .unwrap();
        let next = c.apply(&base);
        assert_eq!(next["cmcontinue"], "file|42");
        assert_eq!(next["continue"], "-||");
        assert!(!c.is_done());

        c.advance("e", &json!({"query": {}})).unwrap();
        assert!(c.is_done());
    }

    #[tokio::test]
    async fn test_query_follows_continuation() {
        let transport = FakeTransport::new(|_, p| {
            Ok(match p.get("cmcontinue").map(String::as_str) {
                None => json!({
                    "continue": {"continue": "-||", "cmcontinue": "page2"},
                    "query": {"categorymembers": [{"title": "File:A.jpg"}]}
                }),
                Some("page2") => json!({
                    "query": {"categorymembers": [{"title": "File:B.jpg"}]}
                }),
                Some(other) => panic!("unexpected token {other}"),
            })
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let members = wiki.category_members("Category:X").await.unwrap();
        assert_eq!(members, vec!["File:A.jpg", "File:B.jpg"]);
        assert_eq!(transport.requests().len(), 2);
        assert_eq!(transport.requests()[0].1["continue"], "");
    }

    #[tokio::test]
    async fn test_page_map_maps_normalized_titles_back() {
        let transport = FakeTransport::new(|_, _| {
            Ok(json!({"query": {
                "normalized": [{"from": "Category:grave_of_X", "to": "Category:Grave of X"}],
                "pages": {"12": {"title": "Category:Grave of X", "revisions": [{"*": "t"}]}}
            }}))
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let pages = wiki
            .commons_pages(&["Category:grave_of_X".to_string()])
            .await
            .unwrap();
        assert!(pages.contains_key("Category:grave_of_X"));
    }

    #[tokio::test]
    async fn test_page_map_merges_continued_pages() {
        let transport = FakeTransport::new(|_, p| {
            Ok(match p.get("rvcontinue").map(String::as_str) {
                None => json!({
                    "continue": {"continue": "||", "rvcontinue": "7|42"},
                    "query": {"pages": {
                        "7": {"pageid": 7, "title": "File:Tomb.jpg", "revisions": [{"*": "wikitext"}]}
                    }}
                }),
                Some(_) => json!({
                    "query": {"pages": {
                        "7": {"pageid": 7, "title": "File:Tomb.jpg",
                              "imageinfo": [{"url": "https://upload.example/Tomb.jpg"}]}
                    }}
                }),
            })
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let base = params(&[("action", "query"), ("titles", "File:Tomb.jpg")]);
        let pages = wiki
            .query::<PageMap>(&config.commons_endpoint, &base)
            .await
            .unwrap();

        assert_eq!(transport.requests().len(), 2);
        assert_eq!(pages.len(), 1);
        let page = &pages["File:Tomb.jpg"];
        assert_eq!(page["pageid"], 7);
        assert_eq!(page["revisions"][0]["*"], "wikitext");
        assert_eq!(page["imageinfo"][0]["url"], "https://upload.example/Tomb.jpg");
    }

    #[tokio::test]
    async fn test_entity_map_drops_missing() {
        let transport = FakeTransport::new(|_, _| {
            Ok(json!({"entities": {
                "Q1": {"id": "Q1", "claims": {}},
                "Q999999999": {"id": "Q999999999", "missing": ""}
            }}))
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let entities = wiki
            .wikidata_entities(
                &["Q1".to_string(), "Q999999999".to_string()],
                "claims",
                &["fr".to_string()],
            )
            .await
            .unwrap();
        assert_eq!(entities.keys().collect::<Vec<_>>(), vec!["Q1"]);
    }

    #[tokio::test]
    async fn test_api_error_is_fatal() {
        let transport = FakeTransport::new(|_, _| {
            Ok(json!({"error": {"code": "toomanyvalues", "info": "Too many values"}}))
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let err = wiki
            .wikidata_entities(&["Q1".to_string()], "claims", &[])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("toomanyvalues"));
    }

    #[tokio::test]
    async fn test_oversized_batch_is_refused() {
        let transport = FakeTransport::new(|_, _| Ok(json!({})));
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        let ids: Vec<String> = (0..51).map(|i| format!("Q{i}")).collect();
        let err = wiki.wikidata_entities(&ids, "claims", &[]).await.unwrap_err();
        assert!(matches!(err, FetchError::TooManyIds { count: 51, .. }));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_lead_html() {
        let transport = FakeTransport::new(|endpoint, p| {
            assert_eq!(endpoint, "https://fr.wikipedia.org/w/api.php");
            assert_eq!(p["section"], "0");
            Ok(json!({"parse": {"text": {"*": "<p>Intro</p>"}}}))
        });
        let config = config();
        let wiki = MediaWiki::new(&transport, &config);
        assert_eq!(
            wiki.wikipedia_lead_html("fr", "Jim Morrison").await.unwrap(),
            "<p>Intro</p>"
        );
    }
}
