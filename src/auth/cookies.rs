use axum::http::{header, HeaderMap};

use crate::config::AuthConfig;

pub const ACCESS_COOKIE: &str = "jwt_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// `Set-Cookie` value for an httpOnly auth cookie
pub fn build_cookie(name: &str, value: &str, max_age_secs: i64, config: &AuthConfig) -> String {
    let mut cookie = format!(
        "{name}={value}; Path=/; Max-Age={max_age_secs}; HttpOnly; SameSite={}",
        config.cookie_same_site.as_str()
    );
    if config.cookie_secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Expire a cookie immediately
pub fn clear_cookie(name: &str, config: &AuthConfig) -> String {
    build_cookie(name, "", 0, config)
}

pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
