//! Title/artist suggestions for the guess field.
//!
//! Requests are debounced and only the newest query's answer is ever
//! surfaced. A lookup that fails behaves like one that found nothing.

use std::env;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use guess_core::guess::format_guess;

use crate::error::AutocompleteError;

pub const DEFAULT_SEARCH_URL: &str = "https://itunes.apple.com/search";
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;

/// Quiet period after the last keystroke before a lookup is issued.
pub const DEBOUNCE: Duration = Duration::from_millis(400);

/// Upper bound on a single lookup, connect included.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Shorter queries are never sent.
pub const MIN_QUERY_CHARS: usize = 3;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutocompleteConfig {
    pub search_url: String,
    pub limit: usize,
}

impl Default for AutocompleteConfig {
    fn default() -> Self {
        Self {
            search_url: DEFAULT_SEARCH_URL.into(),
            limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl AutocompleteConfig {
    /// Read `GUESS_AUTOCOMPLETE_*` variables. `None` when explicitly disabled.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let disabled = env::var("GUESS_AUTOCOMPLETE_DISABLED")
            .is_ok_and(|v| matches!(v.trim(), "1" | "true" | "yes"));
        if disabled {
            return None;
        }
        let search_url = env::var("GUESS_AUTOCOMPLETE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SEARCH_URL.into());
        let limit = env::var("GUESS_AUTOCOMPLETE_LIMIT")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .filter(|n| *n > 0)
            .unwrap_or(DEFAULT_SUGGESTION_LIMIT);
        Some(Self { search_url, limit })
    }
}

/// One candidate answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    pub artist: String,
}

impl Suggestion {
    /// Text placed into the guess field when this suggestion is chosen.
    #[must_use]
    pub fn guess_text(&self) -> String {
        format_guess(&self.title, &self.artist)
    }
}

/// Backend that turns a query into suggestions.
#[async_trait]
pub trait SuggestionProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns `AutocompleteError` when the lookup fails.
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>, AutocompleteError>;
}

/// Public music search API.
#[derive(Clone)]
pub struct ItunesProvider {
    client: Client,
    config: AutocompleteConfig,
}

impl ItunesProvider {
    /// # Errors
    ///
    /// Returns `AutocompleteError::Http` if the HTTP client cannot be built.
    pub fn new(config: AutocompleteConfig) -> Result<Self, AutocompleteError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SuggestionProvider for ItunesProvider {
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>, AutocompleteError> {
        let limit = self.config.limit.to_string();
        let response = self
            .client
            .get(&self.config.search_url)
            .query(&[("term", query), ("entity", "song"), ("limit", limit.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AutocompleteError::HttpStatus(response.status()));
        }

        let body: SearchResponse = response.json().await?;
        Ok(body.into_suggestions(self.config.limit))
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResult {
    track_name: Option<String>,
    artist_name: Option<String>,
}

impl SearchResponse {
    fn into_suggestions(self, limit: usize) -> Vec<Suggestion> {
        self.results
            .into_iter()
            .filter_map(|r| match (r.track_name, r.artist_name) {
                (Some(title), Some(artist)) => Some(Suggestion { title, artist }),
                _ => None,
            })
            .take(limit)
            .collect()
    }
}

/// What a call to `Autocomplete::suggest` produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestOutcome {
    /// Query under `MIN_QUERY_CHARS`; any list shown should be cleared.
    TooShort,
    /// A newer query arrived; keep whatever the newer call produces.
    Superseded,
    Suggestions(Vec<Suggestion>),
}

/// Debounced, last-query-wins front for a `SuggestionProvider`.
#[derive(Clone)]
pub struct Autocomplete {
    provider: Option<Arc<dyn SuggestionProvider>>,
    latest: Arc<AtomicU64>,
    debounce: Duration,
}

impl Autocomplete {
    /// iTunes-backed autocomplete, or a disabled one when configured off or
    /// when the HTTP client cannot be set up.
    #[must_use]
    pub fn from_env() -> Self {
        let provider = AutocompleteConfig::from_env().and_then(|config| {
            match ItunesProvider::new(config) {
                Ok(provider) => Some(Arc::new(provider) as Arc<dyn SuggestionProvider>),
                Err(err) => {
                    warn!(error = %err, "autocomplete disabled");
                    None
                }
            }
        });
        Self::new(provider)
    }

    #[must_use]
    pub fn new(provider: Option<Arc<dyn SuggestionProvider>>) -> Self {
        Self {
            provider,
            latest: Arc::new(AtomicU64::new(0)),
            debounce: DEBOUNCE,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// Suggestions for the text currently in the guess field.
    ///
    /// Each call supersedes every earlier one, including calls still waiting
    /// out the debounce or awaiting the provider.
    pub async fn suggest(&self, query: &str) -> SuggestOutcome {
        let request = self.latest.fetch_add(1, Ordering::SeqCst) + 1;
        let query = query.trim();
        if query.chars().count() < MIN_QUERY_CHARS {
            return SuggestOutcome::TooShort;
        }
        let Some(provider) = self.provider.as_ref() else {
            return SuggestOutcome::Suggestions(Vec::new());
        };

        tokio::time::sleep(self.debounce).await;
        if !self.is_latest(request) {
            return SuggestOutcome::Superseded;
        }

        debug!(query, "autocomplete lookup");
        let found = match provider.search(query).await {
            Ok(found) => found,
            Err(err) => {
                warn!(query, error = %err, "autocomplete lookup failed");
                Vec::new()
            }
        };

        if !self.is_latest(request) {
            return SuggestOutcome::Superseded;
        }
        SuggestOutcome::Suggestions(found)
    }

    fn is_latest(&self, request: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == request
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct FakeProvider {
        queries: Mutex<Vec<String>>,
        fail: bool,
        latency: Duration,
    }

    impl FakeProvider {
        fn queries(&self) -> Vec<String> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SuggestionProvider for FakeProvider {
        async fn search(&self, query: &str) -> Result<Vec<Suggestion>, AutocompleteError> {
            self.queries.lock().unwrap().push(query.to_string());
            tokio::time::sleep(self.latency).await;
            if self.fail {
                return Err(AutocompleteError::HttpStatus(
                    reqwest::StatusCode::SERVICE_UNAVAILABLE,
                ));
            }
            Ok(vec![Suggestion {
                title: format!("{query} song"),
                artist: "Someone".into(),
            }])
        }
    }

    #[test]
    fn guess_text_uses_separator() {
        let s = Suggestion {
            title: "Billie Jean".into(),
            artist: "Michael Jackson".into(),
        };
        assert_eq!(s.guess_text(), "Billie Jean - Michael Jackson");
    }

    #[test]
    fn search_results_need_both_names() {
        let body: SearchResponse = serde_json::from_str(
            r#"{"resultCount":3,"results":[
                {"trackName":"Yesterday","artistName":"The Beatles"},
                {"artistName":"Nameless"},
                {"trackName":"Help!","artistName":"The Beatles","collectionName":"Help!"}
            ]}"#,
        )
        .unwrap();
        let suggestions = body.into_suggestions(5);
        assert_eq!(suggestions.len(), 2);
        assert_eq!(suggestions[1].title, "Help!");
    }

    #[tokio::test(start_paused = true)]
    async fn short_queries_are_never_sent() {
        let provider = Arc::new(FakeProvider::default());
        let autocomplete = Autocomplete::new(Some(provider.clone() as Arc<dyn SuggestionProvider>));
        assert_eq!(autocomplete.suggest("ab").await, SuggestOutcome::TooShort);
        assert_eq!(autocomplete.suggest("  ab  ").await, SuggestOutcome::TooShort);
        assert!(provider.queries().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn only_latest_query_is_looked_up() {
        let provider = Arc::new(FakeProvider::default());
        let autocomplete = Autocomplete::new(Some(provider.clone() as Arc<dyn SuggestionProvider>));

        let first = autocomplete.suggest("bea");
        let second = async {
            tokio::time::sleep(Duration::from_millis(150)).await;
            autocomplete.suggest("beat").await
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SuggestOutcome::Superseded);
        match second {
            SuggestOutcome::Suggestions(found) => assert_eq!(found[0].title, "beat song"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(provider.queries(), vec!["beat".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn response_overtaken_by_newer_query_is_discarded() {
        let provider = Arc::new(FakeProvider {
            latency: Duration::from_secs(2),
            ..FakeProvider::default()
        });
        let autocomplete = Autocomplete::new(Some(provider.clone() as Arc<dyn SuggestionProvider>));

        let first = autocomplete.suggest("abc");
        let second = async {
            // Past the first debounce, while its lookup is still outstanding.
            tokio::time::sleep(DEBOUNCE + Duration::from_millis(500)).await;
            autocomplete.suggest("abcde").await
        };
        let (first, second) = tokio::join!(first, second);

        assert_eq!(first, SuggestOutcome::Superseded);
        match second {
            SuggestOutcome::Suggestions(found) => assert_eq!(found[0].title, "abcde song"),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(
            provider.queries(),
            vec!["abc".to_string(), "abcde".to_string()]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn failed_lookup_yields_empty_list() {
        let provider = Arc::new(FakeProvider {
            fail: true,
            ..FakeProvider::default()
        });
        let autocomplete = Autocomplete::new(Some(provider as Arc<dyn SuggestionProvider>));
        assert_eq!(
            autocomplete.suggest("yesterday").await,
            SuggestOutcome::Suggestions(Vec::new())
        );
    }

    #[tokio::test]
    async fn disabled_autocomplete_suggests_nothing() {
        let autocomplete = Autocomplete::new(None);
        assert!(!autocomplete.enabled());
        assert_eq!(
            autocomplete.suggest("queen").await,
            SuggestOutcome::Suggestions(Vec::new())
        );
    }
}
