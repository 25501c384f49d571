// Cookie helpers for the OAuth state and browser access token

use axum::http::{header, HeaderMap};

pub const OAUTH_STATE_COOKIE: &str = "oauth_state";
pub const ACCESS_TOKEN_COOKIE: &str = "access_token";

/// State cookie lifetime in seconds
pub const OAUTH_STATE_MAX_AGE: i64 = 600;

/// Builds a `Set-Cookie` value scoped to `/`, HttpOnly and SameSite=Lax.
pub fn build_cookie(name: &str, value: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        name,
        value,
        max_age.max(0)
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that deletes `name` in the browser.
pub fn expired_cookie(name: &str, secure: bool) -> String {
    build_cookie(name, "", 0, secure)
}

/// Reads a cookie value from the request's `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// True when the request reached us over HTTPS, directly or via a proxy.
pub fn is_secure_request(headers: &HeaderMap, force_secure: bool) -> bool {
    if force_secure {
        return true;
    }

    headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
        .unwrap_or(false)
}
