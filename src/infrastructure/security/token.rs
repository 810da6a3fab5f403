use subtle::ConstantTimeEq;

/// Header carrying the shared secret on regular HTTP requests.
pub const AUTH_HEADER: &str = "x-auth-token";

/// Query parameter fallback, needed for the push-channel upgrade handshake
/// where custom headers are not portable across client stacks.
pub const AUTH_QUERY_PARAM: &str = "token";

/// Constant-time comparison of the configured secret against a provided
/// token. Equal-length inputs never short-circuit; mismatched lengths fail
/// fast, which only leaks the token length. Empty tokens on either side
/// always fail: an empty expected token means auth is misconfigured.
pub fn validate_token(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || provided.is_empty() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Single front door for request authentication: header first, query
/// parameter second. A present-but-wrong header fails without consulting
/// the query parameter.
pub fn authenticate(expected: &str, header: Option<&str>, query: Option<&str>) -> bool {
    if let Some(token) = header.filter(|t| !t.is_empty()) {
        return validate_token(expected, token);
    }
    if let Some(token) = query.filter(|t| !t.is_empty()) {
        return validate_token(expected, token);
    }
    false
}
