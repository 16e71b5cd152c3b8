//! Session cookies and token extraction.

use axum::http::{
    HeaderMap, HeaderValue,
    header::{AUTHORIZATION, COOKIE},
};

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Build an `HttpOnly` session cookie
pub fn session_cookie(name: &str, value: &str, max_age_secs: i64, secure: bool) -> Option<HeaderValue> {
    let mut cookie =
        format!("{name}={value}; HttpOnly; SameSite=Lax; Path=/; Max-Age={max_age_secs}");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

/// Expire a session cookie
pub fn clear_cookie(name: &str, secure: bool) -> Option<HeaderValue> {
    session_cookie(name, "", 0, secure)
}

/// Value of the named cookie, if sent
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Token from `Authorization: Bearer`, else from the access-token cookie
pub fn access_token(headers: &HeaderMap) -> Option<String> {
    bearer_token(headers).or_else(|| read_cookie(headers, ACCESS_COOKIE))
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?.trim();
    let token = value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))?
        .trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie(ACCESS_COOKIE, "abc", 1800, true).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("access_token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Lax"));
        assert!(cookie.contains("Max-Age=1800"));
        assert!(cookie.ends_with("; Secure"));

        let plain = session_cookie(ACCESS_COOKIE, "abc", 1800, false).unwrap();
        assert!(!plain.to_str().unwrap().contains("Secure"));
    }

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=r.t.x; access_token=a.b.c"),
        );
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE).as_deref(), Some("r.t.x"));
        assert_eq!(read_cookie(&headers, "missing"), None);
    }

    #[test]
    fn test_header_wins_over_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("access_token=from-cookie"));
        assert_eq!(access_token(&headers).as_deref(), Some("from-cookie"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(access_token(&headers).as_deref(), Some("from-header"));
    }
}
