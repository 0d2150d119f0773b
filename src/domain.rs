//! Registrable-domain extraction from raw URL input.
//!
//! The prober and rule scorer only ever see the registrable domain (one level
//! above the public suffix, e.g. "example.co.uk" from
//! "https://www.example.co.uk/login"). Bare domains without a scheme are
//! accepted, matching what clients actually send.

use thiserror::Error;
use url::Url;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DomainParseError {
    #[error("input has no usable host")]
    NoHost,
}

/// Common two-part public suffixes. Not a full public-suffix list, but covers
/// the registries that matter for reputation lookups.
const TWO_PART_TLDS: &[&str] = &[
    "co.uk", "com.au", "co.jp", "co.kr", "com.br", "co.za", "com.mx", "co.in",
    "com.sg", "co.nz", "com.ar", "co.il", "org.uk", "net.au", "gov.uk", "ac.uk",
    "edu.au",
];

/// Extract the host component from a raw URL string.
///
/// Accepts full URLs ("https://a.b.c/path") as well as bare hosts ("a.b.c");
/// rejects input that yields no plausible DNS name.
pub fn extract_host(raw: &str) -> Result<String, DomainParseError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainParseError::NoHost);
    }

    let host = match Url::parse(trimmed) {
        Ok(parsed) if parsed.host_str().is_some() => {
            parsed.host_str().map(str::to_owned)
        }
        // No scheme (or an opaque one): retry with an explicit scheme so the
        // parser applies its normal authority rules.
        _ => Url::parse(&format!("http://{trimmed}"))
            .ok()
            .and_then(|p| p.host_str().map(str::to_owned)),
    };

    let host = host.ok_or(DomainParseError::NoHost)?.to_lowercase();
    if is_plausible_host(&host) {
        Ok(host)
    } else {
        Err(DomainParseError::NoHost)
    }
}

fn is_plausible_host(host: &str) -> bool {
    host.contains('.')
        && host.len() < 255
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Strip subdomains down to the registrable domain,
/// e.g. "mail.example.co.uk" -> "example.co.uk".
pub fn registrable_domain(host: &str) -> String {
    let parts: Vec<&str> = host.split('.').collect();
    if parts.len() < 2 {
        return host.to_string();
    }

    if parts.len() >= 3 {
        let suffix = format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1]);
        if TWO_PART_TLDS.contains(&suffix.as_str()) {
            return format!("{}.{}", parts[parts.len() - 3], suffix);
        }
    }

    format!("{}.{}", parts[parts.len() - 2], parts[parts.len() - 1])
}

/// Registrable domain straight from a raw URL string.
pub fn registrable_from_url(raw: &str) -> Result<String, DomainParseError> {
    Ok(registrable_domain(&extract_host(raw)?))
}

/// The label the entropy check looks at: the first dot-separated component.
pub fn label(registrable: &str) -> &str {
    registrable.split('.').next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_from_full_url() {
        assert_eq!(
            extract_host("https://www.example.com/login?next=/"),
            Ok("www.example.com".to_string())
        );
    }

    #[test]
    fn host_from_bare_domain() {
        assert_eq!(extract_host("example.com"), Ok("example.com".to_string()));
        assert_eq!(
            extract_host("sub.example.org/path"),
            Ok("sub.example.org".to_string())
        );
    }

    #[test]
    fn host_is_lowercased() {
        assert_eq!(
            extract_host("HTTP://WWW.Example.COM"),
            Ok("www.example.com".to_string())
        );
    }

    #[test]
    fn rejects_empty_and_hostless_input() {
        assert_eq!(extract_host(""), Err(DomainParseError::NoHost));
        assert_eq!(extract_host("   "), Err(DomainParseError::NoHost));
        assert_eq!(extract_host("not a url"), Err(DomainParseError::NoHost));
        assert_eq!(extract_host("nodots"), Err(DomainParseError::NoHost));
    }

    #[test]
    fn strips_subdomains() {
        assert_eq!(registrable_domain("example.com"), "example.com");
        assert_eq!(registrable_domain("mail.google.com"), "google.com");
        assert_eq!(
            registrable_domain("email.nationalgeographic.com"),
            "nationalgeographic.com"
        );
        assert_eq!(registrable_domain("sub.domain.example.org"), "example.org");
    }

    #[test]
    fn keeps_two_part_tlds() {
        assert_eq!(registrable_domain("example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("www.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("test.company.com.au"), "company.com.au");
    }

    #[test]
    fn registrable_from_raw_url() {
        assert_eq!(
            registrable_from_url("https://login.paypa1-secure.com/verify"),
            Ok("paypa1-secure.com".to_string())
        );
    }

    #[test]
    fn label_is_first_component() {
        assert_eq!(label("example.co.uk"), "example");
        assert_eq!(label("xk29fq.net"), "xk29fq");
    }
}
