//! The word search service: request and response bodies, text cleanup and request handling.
//!
//! Every request gets its own [`SearchEngine`] built from the configured settings, so requests
//! never observe each other's collections.

use serde::{Deserialize, Serialize};

use crate::backend::{Backend, RemoteBackend, StatevectorBackend};
use crate::config::{BackendKind, Config};
use crate::engine::{SearchEngine, SearchOutcome};
use crate::errors::{BackendError, SearchError};

/// Strip ASCII punctuation and split on single spaces. Runs of spaces yield empty tokens, which
/// still occupy a position.
///
/// ```
/// use qsearch::service::tokenize;
///
/// assert_eq!(tokenize("Gallia est, omnis!"), vec!["Gallia", "est", "omnis"]);
/// assert_eq!(tokenize("a  b"), vec!["a", "", "b"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    let clean: String = text.chars().filter(|c| !c.is_ascii_punctuation()).collect();
    clean.split(' ').map(str::to_string).collect()
}

/// Body of `POST /search_word`. Both fields are required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// The word to look for.
    pub word: Option<String>,
    /// Text whose tokens form the collection.
    pub string: Option<String>,
}

impl SearchRequest {
    /// Request with both fields present.
    pub fn new<W: Into<String>, S: Into<String>>(word: W, string: S) -> Self {
        Self {
            word: Some(word.into()),
            string: Some(string.into()),
        }
    }

    /// Parse a raw JSON body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ServiceError> {
        serde_json::from_slice(body).map_err(|_| missing_fields())
    }
}

/// Body of a successful `POST /search_word` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchResponse {
    /// The word sits at `position` among the tokens of `string`.
    Found {
        /// The word searched for.
        word: String,
        /// The text searched, as submitted.
        string: String,
        /// Token index of the word.
        position: usize,
    },
    /// The word is not among the searched tokens.
    NotFound {
        /// Explanation for the client.
        message: String,
        /// Always `-1`.
        position: i64,
    },
}

impl SearchResponse {
    /// The response for a word that was not found.
    pub fn not_found(word: &str) -> Self {
        SearchResponse::NotFound {
            message: format!("'{}' not found in the given string.", word),
            position: -1,
        }
    }

    /// The position, or `-1` when not found.
    pub fn position(&self) -> i64 {
        match self {
            SearchResponse::Found { position, .. } => *position as i64,
            SearchResponse::NotFound { position, .. } => *position,
        }
    }
}

/// Why a request failed.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The request body is not usable. Reported to the client as a 400.
    #[error("{0}")]
    MalformedInput(String),
    /// The search itself failed.
    #[error(transparent)]
    Search(#[from] SearchError),
}

impl ServiceError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            ServiceError::MalformedInput(_) => 400,
            ServiceError::Search(SearchError::Backend(_)) => 502,
            ServiceError::Search(_) => 500,
        }
    }
}

impl From<BackendError> for ServiceError {
    fn from(err: BackendError) -> Self {
        ServiceError::Search(SearchError::Backend(err))
    }
}

fn missing_fields() -> ServiceError {
    ServiceError::MalformedInput(
        "JSON body must include both \"word\" and \"string\" keys.".to_string(),
    )
}

/// Handles word searches with the configured engine settings and backend.
#[derive(Debug, Clone, Default)]
pub struct SearchService {
    config: Config,
}

impl SearchService {
    /// Service answering with `config`.
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Settings every request is handled with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Backend for a single request.
    ///
    /// Remote backends use a blocking HTTP client, so call this off the async runtime.
    pub fn make_backend(&self) -> Result<Box<dyn Backend>, BackendError> {
        let cfg = &self.config.backend;
        Ok(match cfg.kind {
            BackendKind::Local => {
                let backend = match cfg.rng_seed {
                    Some(seed) => StatevectorBackend::<f64>::seeded(seed),
                    None => StatevectorBackend::<f64>::new(),
                };
                Box::new(backend.with_max_qubits(cfg.max_qubits))
            }
            BackendKind::Remote => Box::new(RemoteBackend::new(&cfg.endpoint, cfg.timeout())?),
        })
    }

    /// Find `request.word` among the first `2^index_width` tokens of `request.string`.
    pub fn handle(&self, request: SearchRequest) -> Result<SearchResponse, ServiceError> {
        let (word, string) = match (request.word, request.string) {
            (Some(word), Some(string)) => (word, string),
            _ => return Err(missing_fields()),
        };
        let tokens = tokenize(&string);
        let backend = self.make_backend()?;
        let mut engine = SearchEngine::new(self.config.search, backend);
        engine.update_collection(&tokens)?;
        let response = match engine.locate(&word)? {
            SearchOutcome::Found(position) => SearchResponse::Found {
                word,
                string,
                position,
            },
            SearchOutcome::NotFound { sampled } => {
                tracing::debug!(sampled, "Sampled index does not hold the query.");
                SearchResponse::not_found(&word)
            }
        };
        Ok(response)
    }

    /// Parse and handle a raw JSON body.
    pub fn handle_body(&self, body: &[u8]) -> Result<SearchResponse, ServiceError> {
        self.handle(SearchRequest::from_slice(body)?)
    }
}

#[cfg(test)]
mod service_tests {
    use super::*;

    fn service() -> SearchService {
        let mut config = Config::default();
        config.backend.rng_seed = Some(11);
        SearchService::new(config)
    }

    #[test]
    fn test_tokenize_strips_punctuation() {
        let tokens = tokenize("Gallia est omnis divisa in partes tres, quarum unam incolunt.");
        assert_eq!(tokens.len(), 10);
        assert_eq!(tokens[6], "tres");
        assert_eq!(tokens[9], "incolunt");
    }

    #[test]
    fn test_found() -> Result<(), ServiceError> {
        let text = "Gallia est omnis divisa in partes tres, quarum unam incolunt Belgae.";
        let response = service().handle(SearchRequest::new("partes", text))?;
        assert_eq!(
            response,
            SearchResponse::Found {
                word: "partes".to_string(),
                string: text.to_string(),
                position: 5,
            }
        );
        Ok(())
    }

    #[test]
    fn test_label_twin_is_not_found() -> Result<(), ServiceError> {
        // "w7" is absent but labels like "omnis".
        let text = "Gallia est omnis divisa in partes tres quarum";
        let response = service().handle(SearchRequest::new("w7", text))?;
        assert_eq!(response, SearchResponse::not_found("w7"));
        assert_eq!(response.position(), -1);
        Ok(())
    }

    #[test]
    fn test_missing_fields() {
        let err = service()
            .handle(SearchRequest {
                word: Some("est".to_string()),
                string: None,
            })
            .unwrap_err();
        assert_eq!(err.status_code(), 400);
        let err = service().handle_body(b"not json").unwrap_err();
        assert!(matches!(err, ServiceError::MalformedInput(_)));
    }

    #[test]
    fn test_not_found_shape() {
        let body = serde_json::to_value(SearchResponse::not_found("zebra")).unwrap();
        assert_eq!(body["position"], -1);
        assert_eq!(body["message"], "'zebra' not found in the given string.");
    }

    #[test]
    fn test_remote_backend_down_is_bad_gateway() {
        let mut config = Config::default();
        config.backend.kind = BackendKind::Remote;
        config.backend.endpoint = "127.0.0.1:9".to_string();
        config.backend.timeout_ms = 200;
        let err = SearchService::new(config)
            .handle(SearchRequest::new("est", "Gallia est omnis"))
            .unwrap_err();
        assert_eq!(err.status_code(), 502);
    }
}
