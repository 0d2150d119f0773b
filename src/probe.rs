//! Domain Reputation Prober: registration age (WHOIS), DNS resolvability,
//! and TLS reachability for a registrable domain, plus the lexical entropy
//! signal.
//!
//! Every probe is individually fault-tolerant: each returns an explicit
//! `Result` and the caller degrades the error branch to its safe default
//! (unknown age, not resolvable, not reachable). A probe failure is logged
//! and counted, never surfaced to the caller, and a single slow domain is
//! bounded by per-probe timeouts. No retries.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::TokioAsyncResolver;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::ScoringConfig;
use crate::domain;
use crate::entropy::shannon_entropy;

/// Reputation signals for one request. Produced fresh per request, never
/// cached or persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ReputationSignals {
    pub registration_age_days: Option<u32>,
    pub dns_resolvable: bool,
    pub tls_reachable: bool,
    pub label_entropy: f64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("empty WHOIS response")]
    EmptyWhois,
    #[error("no creation date in WHOIS response")]
    MissingCreationDate,
    #[error("dns resolution failed: {0}")]
    Dns(String),
    #[error("tls endpoint unreachable: {0}")]
    Tls(String),
}

/// Seam for the network probes so the pipeline is testable without sockets.
#[async_trait]
pub trait ReputationProber: Send + Sync {
    /// Probe a registrable domain. Infallible by design: failed probes
    /// degrade to their safe defaults inside.
    async fn probe(&self, registrable_domain: &str) -> ReputationSignals;
}

/// The real prober: WHOIS over TCP 43, DNS A lookup, HTTPS reachability.
pub struct DomainProber {
    whois_timeout: Duration,
    dns_timeout: Duration,
    tls_timeout: Duration,
    resolver: TokioAsyncResolver,
    http: reqwest::Client,
}

impl DomainProber {
    pub fn new(cfg: &ScoringConfig) -> Result<Self, ProbeError> {
        let resolver = match TokioAsyncResolver::tokio_from_system_conf() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "system resolver config unavailable, using defaults");
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            }
        };

        let tls_timeout = Duration::from_secs(cfg.tls_timeout_secs);
        let http = reqwest::Client::builder()
            .connect_timeout(tls_timeout)
            .timeout(tls_timeout * 2)
            .build()
            .map_err(|e| ProbeError::Tls(e.to_string()))?;

        Ok(Self {
            whois_timeout: Duration::from_secs(cfg.whois_timeout_secs),
            dns_timeout: Duration::from_secs(cfg.dns_timeout_secs),
            tls_timeout,
            resolver,
            http,
        })
    }

    async fn registration_age_days(&self, domain: &str) -> Result<u32, ProbeError> {
        let server = whois_server_for(domain);
        let text = self.query_whois(&format!("{server}:43"), domain).await?;
        let created = parse_creation_date(&text).ok_or(ProbeError::MissingCreationDate)?;
        let age = (Utc::now().date_naive() - created).num_days();
        Ok(age.max(0) as u32)
    }

    /// Raw WHOIS query over TCP port 43.
    async fn query_whois(&self, addr: &str, domain: &str) -> Result<String, ProbeError> {
        let mut stream = timeout(self.whois_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| ProbeError::Timeout(self.whois_timeout))??;

        stream.write_all(format!("{domain}\r\n").as_bytes()).await?;

        let mut response = String::new();
        timeout(self.whois_timeout, stream.read_to_string(&mut response))
            .await
            .map_err(|_| ProbeError::Timeout(self.whois_timeout))??;

        if response.is_empty() {
            return Err(ProbeError::EmptyWhois);
        }
        Ok(response)
    }

    async fn resolve_a(&self, domain: &str) -> Result<(), ProbeError> {
        let lookup = timeout(self.dns_timeout, self.resolver.ipv4_lookup(domain))
            .await
            .map_err(|_| ProbeError::Timeout(self.dns_timeout))?
            .map_err(|e| ProbeError::Dns(e.to_string()))?;

        if lookup.iter().next().is_some() {
            Ok(())
        } else {
            Err(ProbeError::Dns("no A records".to_string()))
        }
    }

    /// TLS handshake against port 443 with default trust roots. Any HTTP
    /// status counts as reachable; only transport-level failures do not.
    async fn tls_reachable(&self, domain: &str) -> Result<(), ProbeError> {
        self.http
            .head(format!("https://{domain}/"))
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                if e.is_timeout() {
                    ProbeError::Timeout(self.tls_timeout)
                } else {
                    ProbeError::Tls(e.to_string())
                }
            })
    }
}

#[async_trait]
impl ReputationProber for DomainProber {
    async fn probe(&self, registrable_domain: &str) -> ReputationSignals {
        let registration_age_days = match self.registration_age_days(registrable_domain).await {
            Ok(days) => Some(days),
            Err(e) => {
                counter!("probe_failures_total", "probe" => "whois").increment(1);
                debug!(domain = registrable_domain, error = %e, "whois probe degraded");
                None
            }
        };

        let dns_resolvable = match self.resolve_a(registrable_domain).await {
            Ok(()) => true,
            Err(e) => {
                counter!("probe_failures_total", "probe" => "dns").increment(1);
                debug!(domain = registrable_domain, error = %e, "dns probe degraded");
                false
            }
        };

        let tls_reachable = match self.tls_reachable(registrable_domain).await {
            Ok(()) => true,
            Err(e) => {
                counter!("probe_failures_total", "probe" => "tls").increment(1);
                debug!(domain = registrable_domain, error = %e, "tls probe degraded");
                false
            }
        };

        ReputationSignals {
            registration_age_days,
            dns_resolvable,
            tls_reachable,
            label_entropy: shannon_entropy(domain::label(registrable_domain)),
        }
    }
}

/// WHOIS server by TLD; IANA catches everything else.
fn whois_server_for(domain: &str) -> &'static str {
    match domain.split('.').next_back().unwrap_or_default() {
        "com" | "net" => "whois.verisign-grs.com",
        "org" => "whois.pir.org",
        "info" => "whois.afilias.net",
        "biz" => "whois.neulevel.biz",
        "us" => "whois.nic.us",
        "uk" => "whois.nic.uk",
        "de" => "whois.denic.de",
        "fr" => "whois.afnic.fr",
        "it" => "whois.nic.it",
        "nl" => "whois.domain-registry.nl",
        "au" => "whois.auda.org.au",
        "ca" => "whois.cira.ca",
        "jp" => "whois.jprs.jp",
        "cn" => "whois.cnnic.cn",
        "ru" => "whois.tcinet.ru",
        "br" => "whois.registro.br",
        _ => "whois.iana.org",
    }
}

// Creation-date lines as registries actually print them.
static CREATION_DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)creation\s*date[:\s]+([^\r\n]+)",
        r"(?i)created\s*on[:\s]+([^\r\n]+)",
        r"(?i)registered\s*on[:\s]+([^\r\n]+)",
        r"(?i)domain\s*created[:\s]+([^\r\n]+)",
        r"(?i)registration\s*date[:\s]+([^\r\n]+)",
        r"(?i)created[:\s]+([^\r\n]+)",
        r"(?i)registered[:\s]+([^\r\n]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("creation date regex"))
    .collect()
});

/// First parseable creation date in a WHOIS response. Registries that list
/// several dates put the original registration first, so the first match
/// wins.
fn parse_creation_date(text: &str) -> Option<NaiveDate> {
    for pattern in CREATION_DATE_PATTERNS.iter() {
        if let Some(captures) = pattern.captures(text) {
            if let Some(date) = captures.get(1).and_then(|m| parse_whois_date(m.as_str())) {
                return Some(date);
            }
        }
    }
    None
}

fn parse_whois_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }
    for fmt in ["%Y-%m-%dT%H:%M:%SZ", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }
    for fmt in ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y", "%d.%m.%Y", "%d-%b-%Y", "%Y.%m.%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }

    // Dates often trail extra tokens ("1997-09-15 04:00:00 (UTC)"); retry on
    // the first token alone.
    let first = s.split_whitespace().next()?;
    if first != s {
        return parse_whois_date(first);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;
    use tokio::net::TcpListener;

    fn test_prober(whois_timeout: Duration) -> DomainProber {
        DomainProber {
            whois_timeout,
            dns_timeout: Duration::from_millis(200),
            tls_timeout: Duration::from_millis(200),
            resolver: TokioAsyncResolver::tokio(
                ResolverConfig::default(),
                ResolverOpts::default(),
            ),
            http: reqwest::Client::new(),
        }
    }

    #[test]
    fn parses_common_whois_date_formats() {
        let expect = NaiveDate::from_ymd_opt(1997, 9, 15).unwrap();
        for raw in [
            "1997-09-15",
            "1997-09-15T04:00:00Z",
            "1997-09-15T04:00:00+00:00",
            "1997-09-15 04:00:00",
            "1997-09-15 04:00:00 (UTC)",
            "15-09-1997",
            "15-sep-1997",
            "15.09.1997",
        ] {
            assert_eq!(parse_whois_date(raw), Some(expect), "format: {raw}");
        }
        assert_eq!(parse_whois_date("not a date"), None);
    }

    #[test]
    fn first_creation_date_line_wins() {
        let text = "\
Domain Name: EXAMPLE.COM
Creation Date: 1995-08-14T04:00:00Z
Updated Date: 2024-08-01T04:00:00Z
Created: 2001-01-01
";
        assert_eq!(
            parse_creation_date(text),
            NaiveDate::from_ymd_opt(1995, 8, 14)
        );
    }

    #[test]
    fn missing_creation_date_is_none() {
        assert_eq!(parse_creation_date("Domain Name: EXAMPLE.COM\n"), None);
    }

    #[test]
    fn whois_server_mapping_falls_back_to_iana() {
        assert_eq!(whois_server_for("example.com"), "whois.verisign-grs.com");
        assert_eq!(whois_server_for("example.org"), "whois.pir.org");
        assert_eq!(whois_server_for("example.dev"), "whois.iana.org");
    }

    #[tokio::test]
    async fn whois_query_reads_a_full_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = [0u8; 256];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"Creation Date: 2024-10-10\r\n")
                .await
                .unwrap();
            // Closing the socket ends the read.
        });

        let prober = test_prober(Duration::from_secs(2));
        let text = prober
            .query_whois(&addr.to_string(), "example.com")
            .await
            .unwrap();
        assert_eq!(
            parse_creation_date(&text),
            NaiveDate::from_ymd_opt(2024, 10, 10)
        );
    }

    #[tokio::test]
    async fn whois_timeout_is_bounded() {
        // A listener that accepts and never answers: the probe must give up
        // within its configured bound instead of stalling the request.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hold = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let bound = Duration::from_millis(200);
        let prober = test_prober(bound);
        let started = Instant::now();
        let result = prober.query_whois(&addr.to_string(), "example.com").await;

        assert!(matches!(result, Err(ProbeError::Timeout(_))));
        assert!(
            started.elapsed() < bound * 5,
            "timeout took {:?}, bound was {:?}",
            started.elapsed(),
            bound
        );
        hold.abort();
    }
}
