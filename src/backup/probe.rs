//! Reachability checks.
//!
//! A device is reachable on an address when a plain request to
//! `<scheme>://<address>` gets any HTTP response in time, whatever the status.
//! Addresses are tried strictly in order and the first one that answers wins.

use async_trait::async_trait;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use super::appliance_url;

/// Why an address did not count as reachable
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// No response within the probe timeout
    Timeout,
    /// Connection refused, host unreachable or name resolution failed
    Connect(String),
    /// TLS handshake or certificate verification failed
    Tls(String),
    /// Address does not form a valid URL
    InvalidAddress(String),
    /// Anything else
    Other(String),
}

impl ProbeFailure {
    /// Short machine-readable cause, used as a log field
    pub fn kind(&self) -> &'static str {
        match self {
            ProbeFailure::Timeout => "timeout",
            ProbeFailure::Connect(_) => "connect",
            ProbeFailure::Tls(_) => "tls",
            ProbeFailure::InvalidAddress(_) => "invalid_address",
            ProbeFailure::Other(_) => "other",
        }
    }

    /// Sort a client error into a failure kind
    pub fn classify(error: &reqwest::Error) -> Self {
        let chain = error_chain(error);
        let lowered = chain.to_lowercase();
        if error.is_timeout() {
            ProbeFailure::Timeout
        } else if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            ProbeFailure::Tls(chain)
        } else if error.is_connect() {
            ProbeFailure::Connect(chain)
        } else {
            ProbeFailure::Other(chain)
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeFailure::Timeout => write!(f, "timed out"),
            ProbeFailure::Connect(detail)
            | ProbeFailure::Tls(detail)
            | ProbeFailure::InvalidAddress(detail)
            | ProbeFailure::Other(detail) => write!(f, "{}: {detail}", self.kind()),
        }
    }
}

/// Flatten an error and its sources into one line
fn error_chain(error: &dyn StdError) -> String {
    let mut parts = vec![error.to_string()];
    let mut source = error.source();
    while let Some(cause) = source {
        parts.push(cause.to_string());
        source = cause.source();
    }
    parts.join(": ")
}

/// Connectivity check for a single address
#[async_trait]
pub trait Prober: Send + Sync {
    /// Return `Ok` when `address` answers within the prober's timeout
    async fn check(&self, address: &str) -> Result<(), ProbeFailure>;
}

/// Pick the first candidate that answers
///
/// Later candidates are never contacted once one succeeds. Failures are
/// logged with their cause and otherwise only mean "try the next one".
pub async fn probe(prober: &dyn Prober, candidates: &[&str]) -> Option<String> {
    for address in candidates {
        tracing::debug!(address = %address, "probing");
        match prober.check(address).await {
            Ok(()) => {
                tracing::info!(address = %address, "address is online");
                return Some((*address).to_string());
            }
            Err(failure) => {
                tracing::warn!(address = %address, cause = failure.kind(), "address is offline");
                tracing::debug!(address = %address, detail = %failure, "probe failure detail");
            }
        }
    }
    None
}

/// Prober that issues a bare GET to the appliance root
pub struct HttpsProber {
    client: reqwest::Client,
    scheme: String,
    timeout: Duration,
}

impl HttpsProber {
    /// Create a prober sharing `client`
    pub fn new(client: reqwest::Client, scheme: &str, timeout: Duration) -> Self {
        Self {
            client,
            scheme: scheme.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Prober for HttpsProber {
    async fn check(&self, address: &str) -> Result<(), ProbeFailure> {
        let url = appliance_url(&self.scheme, address, "/")
            .map_err(|e| ProbeFailure::InvalidAddress(format!("{address}: {e}")))?;

        let request = self.client.get(url).timeout(self.timeout).send();
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(response)) => {
                tracing::debug!(address = %address, status = %response.status(), "probe answered");
                Ok(())
            }
            Ok(Err(e)) => Err(ProbeFailure::classify(&e)),
            Err(_) => Err(ProbeFailure::Timeout),
        }
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Prober answering from a fixed set of reachable addresses
    struct SetProber {
        reachable: Vec<&'static str>,
        calls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Prober for SetProber {
        async fn check(&self, address: &str) -> Result<(), ProbeFailure> {
            self.calls.lock().unwrap().push(address.to_string());
            if self.reachable.iter().any(|a| *a == address) {
                Ok(())
            } else {
                Err(ProbeFailure::Connect("refused".into()))
            }
        }
    }

    fn set_prober(reachable: Vec<&'static str>) -> SetProber {
        SetProber {
            reachable,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Address of a local port with nothing listening on it
    fn closed_address() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        addr.to_string()
    }

    #[tokio::test]
    async fn first_reachable_candidate_wins_and_stops_probing() {
        let prober = set_prober(vec!["10.0.0.1", "10.0.0.2"]);
        let selected = probe(&prober, &["10.0.0.1", "10.0.0.2"]).await;

        assert_eq!(selected.as_deref(), Some("10.0.0.1"));
        assert_eq!(*prober.calls.lock().unwrap(), vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn falls_back_to_secondary() {
        let prober = set_prober(vec!["10.0.0.2"]);
        let selected = probe(&prober, &["10.0.0.1", "10.0.0.2"]).await;

        assert_eq!(selected.as_deref(), Some("10.0.0.2"));
        assert_eq!(*prober.calls.lock().unwrap(), vec!["10.0.0.1", "10.0.0.2"]);
    }

    #[tokio::test]
    async fn none_when_nothing_answers_or_nothing_configured() {
        let prober = set_prober(vec![]);
        assert_eq!(probe(&prober, &["10.0.0.1", "10.0.0.2"]).await, None);
        assert_eq!(probe(&prober, &[]).await, None);
    }

    #[tokio::test]
    async fn any_status_counts_as_reachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .expect(1)
            .mount(&server)
            .await;

        let prober = HttpsProber::new(reqwest::Client::new(), "http", Duration::from_secs(3));
        let address = server.address().to_string();
        assert_eq!(prober.check(&address).await, Ok(()));
    }

    #[tokio::test]
    async fn refused_connection_is_a_connect_failure() {
        let prober = HttpsProber::new(reqwest::Client::new(), "http", Duration::from_secs(3));
        let failure = prober.check(&closed_address()).await.unwrap_err();
        assert_eq!(failure.kind(), "connect");
    }

    #[tokio::test]
    async fn slow_answer_is_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let prober = HttpsProber::new(reqwest::Client::new(), "http", Duration::from_millis(200));
        let address = server.address().to_string();
        assert_eq!(prober.check(&address).await, Err(ProbeFailure::Timeout));
    }

    #[tokio::test]
    async fn unparsable_address_is_rejected_without_network() {
        let prober = HttpsProber::new(reqwest::Client::new(), "http", Duration::from_secs(1));
        let failure = prober.check("bad host name").await.unwrap_err();
        assert_eq!(failure.kind(), "invalid_address");
    }
}
