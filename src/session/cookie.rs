//! Session cookie contract
//!
//! Renders the `Set-Cookie` values that carry the session token and reads the
//! token back out of request headers.

use axum::http::{header, HeaderMap};
use chrono::{DateTime, Utc};

use crate::config::bounded_secs;

/// Default cookie lifetime: 30 days.
pub const DEFAULT_COOKIE_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// `SameSite` attribute values this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }
}

// == Cookie Policy ==
/// Attributes of the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookiePolicy {
    /// Cookie name
    pub name: String,
    /// Emit `Secure`
    pub secure: bool,
    /// Frontend is served from another origin
    pub cross_origin: bool,
    /// Lifetime in seconds
    pub max_age: u64,
}

impl Default for CookiePolicy {
    fn default() -> Self {
        Self {
            name: "session_id".to_string(),
            secure: false,
            cross_origin: false,
            max_age: DEFAULT_COOKIE_MAX_AGE_SECS,
        }
    }
}

impl CookiePolicy {
    /// Policy for one request: `Secure` is forced on when the request itself
    /// arrived over a secure transport.
    pub fn for_transport(&self, secure_transport: bool) -> Self {
        Self {
            secure: self.secure || secure_transport,
            ..self.clone()
        }
    }

    /// Browsers drop `SameSite=None` cookies that are not `Secure`, so
    /// cross-origin mode only applies on secure transports.
    pub fn same_site(&self) -> SameSite {
        if self.cross_origin && self.secure {
            SameSite::None
        } else {
            SameSite::Lax
        }
    }

    /// `Set-Cookie` value delivering `token`.
    pub fn session_cookie(&self, token: &str, now: DateTime<Utc>) -> String {
        let expires = now + bounded_secs(self.max_age);
        self.render(token, self.max_age, expires)
    }

    /// `Set-Cookie` value that removes the session cookie.
    pub fn clearing_cookie(&self) -> String {
        self.render("", 0, DateTime::<Utc>::UNIX_EPOCH)
    }

    fn render(&self, value: &str, max_age: u64, expires: DateTime<Utc>) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; Expires={}; HttpOnly",
            self.name,
            value,
            max_age,
            expires.format("%a, %d %b %Y %H:%M:%S GMT")
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie.push_str("; SameSite=");
        cookie.push_str(self.same_site().as_str());
        cookie
    }

    /// Extracts the session token from the request's `Cookie` headers.
    pub fn token_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, value)| *name == self.name && !value.is_empty())
            .map(|(_, value)| value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use chrono::TimeZone;

    #[test]
    fn test_session_cookie_attributes() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let cookie = CookiePolicy::default().session_cookie("abc", now);

        assert!(cookie.starts_with("session_id=abc; Path=/; Max-Age=2592000"));
        assert!(cookie.contains("Expires=Sat, 31 Jan 2026 12:00:00 GMT"));
        assert!(cookie.contains("HttpOnly"));
        assert!(!cookie.contains("Secure"));
        assert!(cookie.ends_with("SameSite=Lax"));
    }

    #[test]
    fn test_secure_cross_origin_cookie() {
        let policy = CookiePolicy {
            cross_origin: true,
            ..Default::default()
        };
        assert_eq!(policy.same_site(), SameSite::Lax);

        let secure = policy.for_transport(true);
        assert_eq!(secure.same_site(), SameSite::None);
        let cookie = secure.session_cookie("abc", Utc::now());
        assert!(cookie.contains("; Secure"));
        assert!(cookie.ends_with("SameSite=None"));
    }

    #[test]
    fn test_for_transport_keeps_configured_secure() {
        let policy = CookiePolicy {
            secure: true,
            ..Default::default()
        };
        assert!(policy.for_transport(false).secure);
    }

    #[test]
    fn test_clearing_cookie() {
        let cookie = CookiePolicy::default().clearing_cookie();
        assert!(cookie.starts_with("session_id=; Path=/; Max-Age=0"));
        assert!(cookie.contains("Thu, 01 Jan 1970"));
    }

    #[test]
    fn test_token_from_headers() {
        let policy = CookiePolicy::default();
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session_id=tok123; other=1"),
        );
        assert_eq!(policy.token_from_headers(&headers).as_deref(), Some("tok123"));
    }

    #[test]
    fn test_token_from_headers_missing() {
        let policy = CookiePolicy::default();
        let mut headers = HeaderMap::new();
        assert!(policy.token_from_headers(&headers).is_none());

        headers.insert(header::COOKIE, HeaderValue::from_static("session_id="));
        assert!(policy.token_from_headers(&headers).is_none());
    }
}
