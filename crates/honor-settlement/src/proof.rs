use honor_types::{Platform, Result, SettlementError};
use url::Url;

fn reject(reason: impl Into<String>) -> SettlementError {
    SettlementError::Validation(reason.into())
}

fn normalize_handle(handle: &str) -> &str {
    handle.trim_start_matches('@')
}

/// Structural validation of a review proof link. The URL must match the
/// platform's post shape and the handle embedded in the path must equal the
/// reviewer's on-file handle, case-insensitively. A mismatch is a policy
/// failure the caller must not retry.
pub fn validate_proof_link(
    platform: Platform,
    proof_link: &str,
    expected_handle: &str,
) -> Result<()> {
    let parsed =
        Url::parse(proof_link).map_err(|e| reject(format!("malformed proof link: {}", e)))?;
    if parsed.scheme() != "https" {
        return Err(reject("proof link must use https"));
    }
    let host = parsed
        .host_str()
        .ok_or_else(|| reject("proof link has no host"))?
        .to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    let segments: Vec<&str> = parsed
        .path_segments()
        .map(|parts| parts.filter(|part| !part.is_empty()).collect())
        .unwrap_or_default();

    let handle = match platform {
        Platform::Twitter => parse_twitter(host, &segments)?,
        Platform::Instagram => parse_instagram(host, &segments)?,
        Platform::Tiktok => parse_tiktok(host, &segments)?,
    };

    if !normalize_handle(handle).eq_ignore_ascii_case(normalize_handle(expected_handle)) {
        return Err(reject(format!(
            "proof link handle '{}' does not match on-file handle '{}'",
            handle, expected_handle
        )));
    }
    Ok(())
}

// twitter.com/<handle>/status/<id> or x.com/<handle>/status/<id>, with
// trailing segments (photo pages etc.) tolerated.
fn parse_twitter<'a>(host: &str, segments: &[&'a str]) -> Result<&'a str> {
    if host != "twitter.com" && host != "x.com" {
        return Err(reject(format!("'{}' is not a twitter/x host", host)));
    }
    match segments {
        [handle, "status", id, ..] if id.chars().all(|c| c.is_ascii_digit()) && !id.is_empty() => {
            Ok(handle)
        }
        _ => Err(reject("proof link is not a tweet status URL")),
    }
}

// instagram.com/<handle>/p/<code> or instagram.com/<handle>/reel/<code>
fn parse_instagram<'a>(host: &str, segments: &[&'a str]) -> Result<&'a str> {
    if host != "instagram.com" {
        return Err(reject(format!("'{}' is not an instagram host", host)));
    }
    match segments {
        [handle, kind, code, ..] if (*kind == "p" || *kind == "reel") && !code.is_empty() => {
            Ok(handle)
        }
        _ => Err(reject("proof link is not an instagram post URL")),
    }
}

// tiktok.com/@<handle>/video/<id>
fn parse_tiktok<'a>(host: &str, segments: &[&'a str]) -> Result<&'a str> {
    if host != "tiktok.com" {
        return Err(reject(format!("'{}' is not a tiktok host", host)));
    }
    match segments {
        [handle, "video", id, ..]
            if handle.starts_with('@')
                && !id.is_empty()
                && id.chars().all(|c| c.is_ascii_digit()) =>
        {
            Ok(handle)
        }
        _ => Err(reject("proof link is not a tiktok video URL")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_twitter_links() {
        validate_proof_link(
            Platform::Twitter,
            "https://twitter.com/Alice/status/1234567890",
            "alice",
        )
        .unwrap();
        validate_proof_link(
            Platform::Twitter,
            "https://x.com/alice/status/1234567890/photo/1",
            "Alice",
        )
        .unwrap();
        validate_proof_link(
            Platform::Twitter,
            "https://www.twitter.com/alice/status/99?s=20",
            "alice",
        )
        .unwrap();
    }

    #[test]
    fn test_twitter_rejections() {
        assert!(validate_proof_link(
            Platform::Twitter,
            "https://twitter.com/alice/status/not-digits",
            "alice"
        )
        .is_err());
        assert!(
            validate_proof_link(Platform::Twitter, "https://twitter.com/alice", "alice").is_err()
        );
        assert!(validate_proof_link(
            Platform::Twitter,
            "http://twitter.com/alice/status/1",
            "alice"
        )
        .is_err());
        assert!(validate_proof_link(
            Platform::Twitter,
            "https://twitt3r.example.com/alice/status/1",
            "alice"
        )
        .is_err());
        assert!(validate_proof_link(Platform::Twitter, "not a url", "alice").is_err());
    }

    #[test]
    fn test_handle_mismatch_is_policy_failure() {
        let err = validate_proof_link(
            Platform::Twitter,
            "https://x.com/mallory/status/1234567890",
            "alice",
        )
        .unwrap_err();
        assert!(matches!(err, SettlementError::Validation(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_instagram_links() {
        validate_proof_link(
            Platform::Instagram,
            "https://instagram.com/bob/p/Cxyz123/",
            "bob",
        )
        .unwrap();
        validate_proof_link(
            Platform::Instagram,
            "https://www.instagram.com/bob/reel/Cxyz123",
            "BOB",
        )
        .unwrap();
        assert!(validate_proof_link(
            Platform::Instagram,
            "https://instagram.com/p/Cxyz123",
            "bob"
        )
        .is_err());
    }

    #[test]
    fn test_tiktok_links() {
        validate_proof_link(
            Platform::Tiktok,
            "https://tiktok.com/@carol/video/7000000000",
            "carol",
        )
        .unwrap();
        // On-file handles may carry the @ prefix.
        validate_proof_link(
            Platform::Tiktok,
            "https://www.tiktok.com/@carol/video/7000000000",
            "@Carol",
        )
        .unwrap();
        assert!(validate_proof_link(
            Platform::Tiktok,
            "https://tiktok.com/carol/video/7000000000",
            "carol"
        )
        .is_err());
    }

    #[test]
    fn test_cross_platform_link_rejected() {
        assert!(validate_proof_link(
            Platform::Instagram,
            "https://x.com/alice/status/1234567890",
            "alice"
        )
        .is_err());
    }
}
