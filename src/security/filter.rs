use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::AppState;

use super::identity::Identity;

/// authenticate_request
///
/// The per-request authentication filter, applied once to every inbound
/// request ahead of routing. Single pass, no retries:
///
/// 1. If an identity is already established (re-entrant call), pass through.
/// 2. Extract the bearer token from the configured header. Absence is not an
///    error — the request proceeds unauthenticated and the access layer
///    decides later whether that is acceptable.
/// 3. Verify the token. On failure, log at warn and proceed unauthenticated:
///    a garbled token must not abort the request, or public endpoints behind
///    the same filter chain would break.
/// 4. On success, attach the identity to the request scope. When the token's
///    remaining lifetime is below the configured threshold, issue a
///    replacement and echo it on the response under the same header name;
///    issuance failure only skips the refresh.
pub async fn authenticate_request(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.extensions().get::<Identity>().is_some() {
        return next.run(request).await;
    }

    let Some(token) = extract_bearer_token(request.headers(), &state.config.token_header) else {
        return next.run(request).await;
    };

    let claims = match state.jwt.verify(&token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("token processing failed: {e}");
            return next.run(request).await;
        }
    };

    let Some(identity) = Identity::from_claims(&claims) else {
        tracing::warn!("token verified but claims are incomplete; proceeding unauthenticated");
        return next.run(request).await;
    };

    // Decide on refresh *before* the handler runs; the replacement token is a
    // pure in-memory signing operation and must never delay or fail the
    // primary response path.
    let threshold = state.config.token_refresh_threshold.as_secs() as i64;
    let refreshed = if state.jwt.remaining_lifetime(&claims) < threshold {
        match state.jwt.refresh(&claims) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!("token refresh skipped: {e}");
                None
            }
        }
    } else {
        None
    };

    tracing::debug!(user_seq = identity.user_seq, "request authenticated");
    request.extensions_mut().insert(identity);

    let mut response = next.run(request).await;

    if let Some(refreshed) = refreshed {
        match (
            HeaderName::try_from(state.config.token_header.as_str()),
            HeaderValue::from_str(&refreshed),
        ) {
            (Ok(name), Ok(value)) => {
                response.headers_mut().insert(name, value);
            }
            _ => tracing::warn!("refreshed token could not be attached to the response"),
        }
    }

    response
}

/// extract_bearer_token
///
/// Pulls the credential out of a `Scheme Credentials` header value. Anything
/// irregular — no header, more than one header value, a value that is not
/// exactly two space-separated parts, or a scheme that is not (case
/// insensitively) "Bearer" — means "no token", never a hard error.
pub(crate) fn extract_bearer_token(headers: &HeaderMap, header: &str) -> Option<String> {
    let mut values = headers.get_all(header).iter();
    let value = values.next()?;
    if values.next().is_some() {
        // Ambiguous: several values under the token header.
        return None;
    }

    let value = value.to_str().ok()?;
    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, credentials] if scheme.eq_ignore_ascii_case("bearer") => {
            Some((*credentials).to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(values: &[&str]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for value in values {
            map.append("Authorization", HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn extracts_well_formed_bearer() {
        let map = headers(&["Bearer abc.def.ghi"]);
        assert_eq!(
            extract_bearer_token(&map, "Authorization").as_deref(),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let map = headers(&["bEaReR abc"]);
        assert_eq!(
            extract_bearer_token(&map, "Authorization").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn wrong_scheme_means_no_token() {
        let map = headers(&["Basic abc"]);
        assert!(extract_bearer_token(&map, "Authorization").is_none());
    }

    #[test]
    fn wrong_part_count_means_no_token() {
        assert!(extract_bearer_token(&headers(&["Bearer"]), "Authorization").is_none());
        assert!(extract_bearer_token(&headers(&["Bearer a b"]), "Authorization").is_none());
        assert!(extract_bearer_token(&headers(&["Bearer  a"]), "Authorization").is_none());
    }

    #[test]
    fn multiple_header_values_mean_no_token() {
        let map = headers(&["Bearer one", "Bearer two"]);
        assert!(extract_bearer_token(&map, "Authorization").is_none());
    }

    #[test]
    fn absent_header_means_no_token() {
        assert!(extract_bearer_token(&HeaderMap::new(), "Authorization").is_none());
    }
}
