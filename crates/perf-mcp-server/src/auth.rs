//! Static bearer-token check for the HTTP transport. A local diagnostic
//! server has no issuer to federate with, so a single configured secret
//! compared against the `Authorization` header is enough; there's no
//! JWKS endpoint to fetch keys from.

/// Constant-time-ish comparison: avoids the obvious short-circuit timing
/// leak of `==` on attacker-controlled strings without pulling in a crate
/// for a single field compare.
fn tokens_match(expected: &str, actual: &str) -> bool {
    if expected.len() != actual.len() {
        return false;
    }
    expected.bytes().zip(actual.bytes()).fold(0u8, |acc, (a, b)| acc | (a ^ b)) == 0
}

pub fn check_bearer(configured: &Option<String>, header_value: Option<&str>) -> Result<(), &'static str> {
    let Some(expected) = configured else {
        // No token configured: HTTP transport runs unauthenticated. This is
        // a local-diagnostic-tool default, not a silent bypass — operators
        // who want auth set PERF_MCP_TOKEN.
        return Ok(());
    };

    let Some(header) = header_value else {
        return Err("missing Authorization header");
    };
    let Some(token) = header.strip_prefix("Bearer ") else {
        return Err("Authorization header must use the Bearer scheme");
    };
    if tokens_match(expected, token) {
        Ok(())
    } else {
        Err("invalid bearer token")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_token_configured_allows_any_request() {
        assert!(check_bearer(&None, None).is_ok());
    }

    #[test]
    fn missing_header_rejected_when_token_configured() {
        assert!(check_bearer(&Some("secret".into()), None).is_err());
    }

    #[test]
    fn wrong_scheme_rejected() {
        assert!(check_bearer(&Some("secret".into()), Some("Basic secret")).is_err());
    }

    #[test]
    fn matching_token_accepted() {
        assert!(check_bearer(&Some("secret".into()), Some("Bearer secret")).is_ok());
    }

    #[test]
    fn mismatched_token_rejected() {
        assert!(check_bearer(&Some("secret".into()), Some("Bearer nope")).is_err());
    }
}
