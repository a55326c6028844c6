//! Cookie jar shared between a requester and its transport

use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ::cookie::Cookie as SetCookie;
use parking_lot::RwLock;
use psl::{List, Psl};
use reqwest::header::HeaderValue;
use url::Url;

use super::{default_path, domain_matches, normalize_domain, Cookie};
use crate::utils::UrlUtils;

/// Cookie storage keyed by normalized domain.
///
/// Every mutation takes the write lock for the duration of one store
/// operation only. Concurrent writers to the same cookie race and the last
/// one to commit wins.
#[derive(Debug, Default)]
pub struct CookieJar {
    cookies: RwLock<HashMap<String, Vec<Cookie>>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a cookie, replacing any cookie with the same domain and name.
    ///
    /// Cookies with an empty domain or name are dropped.
    pub fn add(&self, mut cookie: Cookie) {
        cookie.domain = normalize_domain(&cookie.domain);
        if cookie.domain.is_empty() || cookie.name.is_empty() {
            log::warn!(
                "ignoring cookie with empty domain or name (domain='{}', name='{}')",
                cookie.domain,
                cookie.name
            );
            return;
        }
        if cookie.path.is_empty() {
            cookie.path = "/".to_string();
        }

        let mut store = self.cookies.write();
        let entries = store.entry(cookie.domain.clone()).or_default();
        match entries.iter_mut().find(|c| c.name == cookie.name) {
            Some(existing) => *existing = cookie,
            None => entries.push(cookie),
        }
    }

    /// Insert `(name, value, path)` triples for one domain
    pub fn add_many<I, N, V, P>(&self, domain: &str, cookies: I)
    where
        I: IntoIterator<Item = (N, V, P)>,
        N: Into<String>,
        V: Into<String>,
        P: Into<String>,
    {
        for (name, value, path) in cookies {
            self.add(Cookie::new(domain, name, value).with_path(path));
        }
    }

    /// Set the value of every cookie matching `domain` and `name`. Never creates.
    pub fn update(&self, domain: &str, name: &str, value: impl Into<String>) {
        let value = value.into();
        self.for_each_match(domain, |cookie| {
            if cookie.name == name {
                cookie.value = value.clone();
            }
        });
    }

    /// True if any cookie matches, expired or not
    pub fn has(&self, domain: &str, name: &str) -> bool {
        self.get(domain, name).is_some()
    }

    /// First cookie matching `domain` and `name`, preferring the exact domain
    pub fn get(&self, domain: &str, name: &str) -> Option<Cookie> {
        self.cookies(domain).into_iter().find(|c| c.name == name)
    }

    pub fn expire(&self, domain: &str, name: &str) {
        self.expire_where(domain, |cookie| cookie.name == name);
    }

    /// Expire every cookie in `domain` whose name is in `names`
    pub fn expire_all<I, S>(&self, domain: &str, names: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<S> = names.into_iter().collect();
        self.expire_where(domain, |cookie| {
            names.iter().any(|n| n.as_ref() == cookie.name)
        });
    }

    /// Expire every cookie in `domain` for which `predicate` holds
    pub fn expire_where<F>(&self, domain: &str, mut predicate: F)
    where
        F: FnMut(&Cookie) -> bool,
    {
        self.for_each_match(domain, |cookie| {
            if predicate(cookie) {
                cookie.expired = true;
            }
        });
    }

    /// Cookies applicable to `domain`, exact-domain entries first
    pub fn cookies(&self, domain: &str) -> Vec<Cookie> {
        let host = normalize_domain(domain);
        let store = self.cookies.read();
        let mut keys: Vec<&String> = store
            .keys()
            .filter(|key| domain_matches(key, &host))
            .collect();
        keys.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        keys.into_iter()
            .flat_map(|key| store[key].iter().cloned())
            .collect()
    }

    /// Snapshot of every stored cookie ordered by domain then name
    pub fn all(&self) -> Vec<Cookie> {
        let store = self.cookies.read();
        let mut all: Vec<Cookie> = store.values().flatten().cloned().collect();
        all.sort_by(|a, b| a.domain.cmp(&b.domain).then_with(|| a.name.cmp(&b.name)));
        all
    }

    pub fn len(&self) -> usize {
        self.cookies.read().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the Cookie header for a request to `url`.
    ///
    /// Expired cookies in the matching domains are removed from the jar.
    pub fn header_for(&self, url: &Url) -> Option<String> {
        let host = UrlUtils::extract_host(url)?;
        let mut store = self.cookies.write();

        let mut matched: Vec<Cookie> = Vec::new();
        store.retain(|domain, entries| {
            if !domain_matches(domain, &host) {
                return true;
            }
            entries.retain(|cookie| {
                if cookie.is_expired() {
                    log::trace!("pruning expired cookie {} for {}", cookie.name, domain);
                    return false;
                }
                true
            });
            matched.extend(
                entries
                    .iter()
                    .filter(|c| c.matches_url(url) && is_header_safe(c))
                    .cloned(),
            );
            !entries.is_empty()
        });

        if matched.is_empty() {
            return None;
        }
        matched.sort_by(|a, b| b.path.len().cmp(&a.path.len()));
        Some(
            matched
                .iter()
                .map(Cookie::to_header_value)
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Merge `Set-Cookie` header values received from `url`
    pub fn store_response_cookies<'a, I>(&self, headers: I, url: &Url)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let host = match UrlUtils::extract_host(url) {
            Some(host) => host,
            None => return,
        };
        for header in headers {
            match parse_set_cookie(header, &host, url.path()) {
                Some(cookie) => {
                    log::trace!(
                        "storing cookie {} for {} (expired={})",
                        cookie.name,
                        cookie.domain,
                        cookie.expired
                    );
                    self.add(cookie);
                }
                None => log::debug!("rejected Set-Cookie from {}: {}", host, header),
            }
        }
    }

    fn for_each_match<F>(&self, domain: &str, mut f: F)
    where
        F: FnMut(&mut Cookie),
    {
        let host = normalize_domain(domain);
        let mut store = self.cookies.write();
        for (key, entries) in store.iter_mut() {
            if domain_matches(key, &host) {
                entries.iter_mut().for_each(&mut f);
            }
        }
    }
}

fn parse_set_cookie(header: &str, host: &str, request_path: &str) -> Option<Cookie> {
    let parsed = SetCookie::parse(header.to_string()).ok()?;
    if parsed.name().is_empty() {
        return None;
    }

    let (domain, host_only) = match parsed.domain() {
        Some(domain) => {
            let domain = normalize_domain(domain);
            if !is_valid_cookie_domain(&domain, host) {
                return None;
            }
            // A Domain attribute naming the host itself on a public suffix or
            // IP literal is accepted, but only as a host-only cookie.
            let host_only = domain == host && (is_ip_host(host) || is_public_suffix(host));
            (domain, host_only)
        }
        None => (host.to_string(), true),
    };

    let path = match parsed.path() {
        Some(path) if path.starts_with('/') => path.to_string(),
        _ => default_path(request_path),
    };

    let now = SystemTime::now();
    let mut expired = false;
    let mut expires = None;
    if let Some(max_age) = parsed.max_age() {
        let seconds = max_age.whole_seconds();
        if seconds <= 0 {
            expired = true;
        } else {
            // Out-of-range lifetimes are kept as session cookies.
            expires = now.checked_add(Duration::from_secs(seconds as u64));
        }
    } else if let Some(at) = parsed.expires_datetime() {
        let timestamp = at.unix_timestamp();
        let at = if timestamp <= 0 {
            Some(UNIX_EPOCH)
        } else {
            UNIX_EPOCH.checked_add(Duration::from_secs(timestamp as u64))
        };
        match at {
            Some(at) if at <= now => expired = true,
            Some(at) => expires = Some(at),
            None => {}
        }
    }

    Some(Cookie {
        domain,
        name: parsed.name().to_string(),
        value: parsed.value().to_string(),
        path,
        secure: parsed.secure().unwrap_or(false),
        host_only,
        expires,
        expired,
    })
}

fn is_header_safe(cookie: &Cookie) -> bool {
    if HeaderValue::from_str(&cookie.to_header_value()).is_ok() {
        return true;
    }
    log::warn!("skipping cookie {} with invalid header value", cookie.name);
    false
}

/// Whether a response from `host` may set a cookie for `domain`.
///
/// IP hosts only accept their own address; public suffixes are refused
/// unless they name the responding host exactly.
fn is_valid_cookie_domain(domain: &str, host: &str) -> bool {
    if is_ip_host(host) {
        return domain == host;
    }
    if !domain_matches(domain, host) {
        return false;
    }
    domain == host || !is_public_suffix(domain)
}

fn is_public_suffix(domain: &str) -> bool {
    match List.suffix(domain.as_bytes()) {
        Some(suffix) => suffix.as_bytes() == domain.as_bytes(),
        None => false,
    }
}

fn is_ip_host(host: &str) -> bool {
    host.starts_with('[') || host.parse::<IpAddr>().is_ok()
}

impl reqwest::cookie::CookieStore for CookieJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        let headers: Vec<&str> = cookie_headers.filter_map(|h| h.to_str().ok()).collect();
        self.store_response_cookies(headers, url);
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        self.header_for(url)
            .and_then(|value| HeaderValue::from_str(&value).ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(input: &str) -> Url {
        Url::parse(input).expect("valid url")
    }

    #[test]
    fn add_replaces_same_domain_and_name() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "sid", "old"));
        jar.add(Cookie::new(".EXAMPLE.com", "sid", "new"));
        assert_eq!(jar.len(), 1);
        assert_eq!(jar.get("example.com", "sid").expect("cookie").value, "new");
    }

    #[test]
    fn add_drops_cookies_without_identity() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("", "sid", "1"));
        jar.add(Cookie::new("example.com", "", "1"));
        assert!(jar.is_empty());
    }

    #[test]
    fn superdomain_cookies_are_visible_from_subdomains() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "sid", "parent"));
        jar.add(Cookie::new("api.example.com", "sid", "child"));

        let found = jar.cookies("api.example.com");
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].value, "child");
        assert!(!jar.has("other.com", "sid"));
        assert_eq!(jar.cookies("example.com").len(), 1);
    }

    #[test]
    fn update_touches_every_match() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "sid", "a"));
        jar.add(Cookie::new("api.example.com", "sid", "b"));
        jar.update("api.example.com", "sid", "c");
        assert!(jar.all().iter().all(|c| c.value == "c"));
    }

    #[test]
    fn header_for_prunes_expired_cookies() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "keep", "1"));
        jar.add(Cookie::new("example.com", "drop", "2"));
        jar.expire("example.com", "drop");
        assert!(jar.has("example.com", "drop"));

        let header = jar.header_for(&url("http://example.com/"));
        assert_eq!(header.as_deref(), Some("keep=1"));
        assert!(!jar.has("example.com", "drop"));
    }

    #[test]
    fn header_for_orders_longer_paths_first() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "root", "1"));
        jar.add(Cookie::new("example.com", "deep", "2").with_path("/api"));
        let header = jar.header_for(&url("http://example.com/api/users"));
        assert_eq!(header.as_deref(), Some("deep=2; root=1"));
        let header = jar.header_for(&url("http://example.com/other"));
        assert_eq!(header.as_deref(), Some("root=1"));
    }

    #[test]
    fn set_cookie_headers_are_merged() {
        let jar = CookieJar::new();
        let origin = url("https://www.example.com/account/login");
        jar.store_response_cookies(
            [
                "sid=abc; Path=/; Secure; HttpOnly",
                "pref=dark; Domain=example.com",
                "scoped=1",
                "evil=1; Domain=other.com",
            ],
            &origin,
        );

        let sid = jar.get("www.example.com", "sid").expect("sid");
        assert!(sid.secure);
        assert_eq!(sid.path, "/");
        assert!(jar.has("example.com", "pref"));
        assert_eq!(
            jar.get("www.example.com", "scoped").expect("scoped").path,
            "/account"
        );
        assert!(!jar.has("other.com", "evil"));
    }

    #[test]
    fn max_age_zero_expires_existing_cookie() {
        let jar = CookieJar::new();
        let origin = url("http://example.com/");
        jar.add(Cookie::new("example.com", "sid", "abc"));
        jar.store_response_cookies(["sid=; Max-Age=0"], &origin);

        let sid = jar.get("example.com", "sid").expect("sid");
        assert!(sid.expired);
        assert_eq!(jar.header_for(&origin), None);
    }

    #[test]
    fn future_max_age_is_recorded() {
        let jar = CookieJar::new();
        jar.store_response_cookies(["token=t; Max-Age=3600"], &url("http://example.com/"));
        let token = jar.get("example.com", "token").expect("token");
        assert!(token.expires.is_some());
        assert!(!token.is_expired());
    }

    #[test]
    fn oversized_max_age_is_kept_without_expiry() {
        let jar = CookieJar::new();
        jar.store_response_cookies(
            ["sid=1; Max-Age=99999999999999999999"],
            &url("http://example.com/"),
        );
        let sid = jar.get("example.com", "sid").expect("sid");
        assert!(!sid.is_expired());
        assert_eq!(
            jar.header_for(&url("http://example.com/")).as_deref(),
            Some("sid=1")
        );
    }

    #[test]
    fn past_expires_marks_cookie_expired() {
        let jar = CookieJar::new();
        jar.store_response_cookies(
            ["sid=1; Expires=Wed, 21 Oct 2015 07:28:00 GMT"],
            &url("http://example.com/"),
        );
        assert!(jar.get("example.com", "sid").expect("sid").expired);
    }

    #[test]
    fn public_suffix_domain_is_rejected() {
        let jar = CookieJar::new();
        jar.store_response_cookies(["tracker=1; Domain=com"], &url("http://evil.com/"));
        jar.store_response_cookies(
            ["tracker=2; Domain=.co.uk"],
            &url("http://shop.example.co.uk/"),
        );
        assert!(jar.is_empty());
        assert_eq!(jar.header_for(&url("http://bank.com/")), None);

        jar.store_response_cookies(
            ["pref=1; Domain=example.co.uk"],
            &url("http://shop.example.co.uk/"),
        );
        assert!(jar.has("example.co.uk", "pref"));
    }

    #[test]
    fn ip_host_requires_exact_domain() {
        let jar = CookieJar::new();
        let origin = url("http://127.0.0.1/");
        jar.store_response_cookies(["a=1; Domain=127.0.0.1", "b=2; Domain=0.0.1"], &origin);

        let a = jar.get("127.0.0.1", "a").expect("a");
        assert!(a.host_only);
        assert!(!jar.has("0.0.1", "b"));
        assert_eq!(jar.header_for(&origin).as_deref(), Some("a=1"));
    }

    #[test]
    fn cookie_without_domain_is_host_only() {
        let jar = CookieJar::new();
        jar.store_response_cookies(["sid=secret"], &url("http://example.com/"));
        jar.store_response_cookies(["pref=1; Domain=example.com"], &url("http://example.com/"));

        assert!(jar.get("example.com", "sid").expect("sid").host_only);
        assert_eq!(
            jar.header_for(&url("http://attacker.example.com/")).as_deref(),
            Some("pref=1")
        );
        assert_eq!(
            jar.header_for(&url("http://example.com/")).as_deref(),
            Some("sid=secret; pref=1")
        );
    }

    #[test]
    fn invalid_cookie_value_is_skipped_in_header() {
        let jar = CookieJar::new();
        jar.add(Cookie::new("example.com", "bad", "a\nb"));
        jar.add(Cookie::new("example.com", "good", "1"));
        assert_eq!(
            jar.header_for(&url("http://example.com/")).as_deref(),
            Some("good=1")
        );
        assert!(jar.has("example.com", "bad"));
    }
}
