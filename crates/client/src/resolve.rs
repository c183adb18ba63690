//! Domain resolution from link targets.
//!
//! The resolved domain is the cache key and the fetch parameter, so
//! normalization has to be stable: default scheme, lowercase host,
//! leading `www.` stripped.

/// Error type for domain resolution failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DomainError {
    #[error("empty URL")]
    Empty,

    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    #[error("URL has no host: {0}")]
    NoHost(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

/// Resolve a link target into its normalized domain.
///
/// Normalization steps:
/// 1. Trim leading/trailing whitespace
/// 2. Default scheme to https:// if missing
/// 3. Parse; require http/https and a named host
/// 4. Strip one leading `www.` label
///
/// Pure and synchronous. Failure is non-fatal to callers: the link is
/// skipped and processing continues.
pub fn resolve_domain(input: &str) -> Result<String, DomainError> {
    let trimmed = input.trim();

    if trimmed.is_empty() {
        return Err(DomainError::Empty);
    }

    let url_str = if trimmed.contains("://") { trimmed.to_string() } else { format!("https://{trimmed}") };

    let parsed = url::Url::parse(&url_str).map_err(|e| DomainError::InvalidUrl(e.to_string()))?;

    match parsed.scheme() {
        "http" | "https" => {}
        scheme => return Err(DomainError::UnsupportedScheme(scheme.to_string())),
    }

    let host = parsed
        .host_str()
        .ok_or_else(|| DomainError::NoHost(trimmed.to_string()))?;

    let domain = host.strip_prefix("www.").unwrap_or(host);

    if domain.is_empty() {
        return Err(DomainError::NoHost(trimmed.to_string()));
    }

    Ok(domain.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_basic() {
        assert_eq!(resolve_domain("https://example.com/page").unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_default_scheme() {
        assert_eq!(resolve_domain("example.com").unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_strips_www() {
        assert_eq!(resolve_domain("www.example.com/x").unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_case_normalized() {
        // The url crate lowercases registrable domains.
        assert_eq!(resolve_domain("www.Example.com/x").unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_keeps_inner_www() {
        assert_eq!(resolve_domain("https://docs.www-archive.org").unwrap(), "docs.www-archive.org");
    }

    #[test]
    fn test_resolve_not_a_url() {
        let result = resolve_domain("not a url");
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_empty() {
        assert!(matches!(resolve_domain(""), Err(DomainError::Empty)));
        assert!(matches!(resolve_domain("   "), Err(DomainError::Empty)));
    }

    #[test]
    fn test_resolve_unsupported_scheme() {
        let result = resolve_domain("file:///etc/passwd");
        assert!(matches!(result, Err(DomainError::UnsupportedScheme(_))));
    }

    #[test]
    fn test_resolve_trims_whitespace() {
        assert_eq!(resolve_domain("  https://example.com  ").unwrap(), "example.com");
    }

    #[test]
    fn test_resolve_subdomain_kept() {
        assert_eq!(resolve_domain("https://blog.example.com").unwrap(), "blog.example.com");
    }
}
