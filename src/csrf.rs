use std::{
    collections::hash_map::RandomState,
    hash::{BuildHasher, Hasher},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

pub const COOKIE_NAME: &str = "csrftoken";
pub const HEADER_NAME: &str = "x-csrftoken";

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Value of cookie `name` in a `Cookie` header, percent-decoded.
pub fn cookie_value(cookie_header: &str, name: &str) -> Option<String> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|cookie| cookie.strip_prefix(name)?.strip_prefix('='))
        .map(percent_decode)
}

/// Double-submit check: the header token must match the cookie token.
pub fn verify(cookie_header: Option<&str>, header_token: Option<&str>) -> bool {
    let Some(cookie_token) = cookie_header.and_then(|header| cookie_value(header, COOKIE_NAME)) else {
        return false;
    };
    match header_token {
        Some(token) => !token.is_empty() && token == cookie_token,
        None => false,
    }
}

/// Unpredictable but not a CSPRNG: `RandomState` seeds SipHash keys
/// from OS randomness once per thread; the time and counter keep tokens
/// distinct. Enough for a double-submit cookie, which only has to be
/// unreadable to other origins; not for secrets.
pub fn generate_token() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_nanos() as u64)
        .unwrap_or_default();
    let count = COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut first = RandomState::new().build_hasher();
    first.write_u64(nanos);
    first.write_u64(count);
    let mut second = RandomState::new().build_hasher();
    second.write_u64(first.finish());
    second.write_u64(count);

    format!("{:016x}{:016x}", first.finish(), second.finish())
}

/// `name=value` pair as sent back in a `Cookie` request header.
pub fn cookie_pair(token: &str) -> String {
    format!("{COOKIE_NAME}={token}")
}

pub fn set_cookie_header(token: &str) -> String {
    format!("{COOKIE_NAME}={token}; Path=/; SameSite=Lax")
}

fn percent_decode(value: &str) -> String {
    let bytes = value.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_cookie_by_exact_name() {
        let header = "sessionid=abc; csrftokenx=nope; csrftoken=tok%2B1; theme=dark";
        assert_eq!(cookie_value(header, "csrftoken").as_deref(), Some("tok+1"));
        assert_eq!(cookie_value(header, "missing"), None);
        assert_eq!(cookie_value("", "csrftoken"), None);
    }

    #[test]
    fn malformed_escapes_are_kept() {
        assert_eq!(cookie_value("csrftoken=a%zz%4", "csrftoken").as_deref(), Some("a%zz%4"));
    }

    #[test]
    fn verify_requires_matching_header() {
        let cookie = Some("csrftoken=abc123");
        assert!(verify(cookie, Some("abc123")));
        assert!(!verify(cookie, Some("other")));
        assert!(!verify(cookie, None));
        assert!(!verify(None, Some("abc123")));
        assert!(!verify(Some("csrftoken="), Some("")));
    }

    #[test]
    fn tokens_are_unique_hex() {
        let a = generate_token();
        let b = generate_token();
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|ch| ch.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn tokens_do_not_repeat_in_a_burst() {
        let tokens: std::collections::HashSet<_> = (0..1000).map(|_| generate_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
