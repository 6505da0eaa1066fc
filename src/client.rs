//! Deriving the rate-limiting key of a client from request headers.

/// Header carrying the chain of addresses a request was forwarded for.
pub const FORWARDED_FOR: &str = "x-forwarded-for";

/// Header carrying the address a reverse proxy saw the request from.
pub const REAL_IP: &str = "x-real-ip";

/// The key used for clients that give no address hint at all.
///
/// All such clients share one bucket, which makes it a global
/// throttle for unidentified traffic.
pub const FALLBACK_CLIENT_KEY: &str = "unknown";

/// Picks the most trustworthy client address from a request's
/// headers: the first entry of `X-Forwarded-For`, else `X-Real-IP`,
/// else `fallback`.
///
/// Header names are compared case-insensitively, and empty values
/// are ignored.
///
/// # Example
/// ```
/// use shortlink_gatekeeper::client::{client_key, FALLBACK_CLIENT_KEY};
///
/// let headers = [
///     ("X-Real-IP", "10.0.0.7"),
///     ("X-Forwarded-For", "203.0.113.9, 10.0.0.7"),
/// ];
/// assert_eq!("203.0.113.9", client_key(headers.iter().copied(), FALLBACK_CLIENT_KEY));
/// assert_eq!("unknown", client_key(std::iter::empty(), FALLBACK_CLIENT_KEY));
/// ```
pub fn client_key<'a, I>(headers: I, fallback: &str) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut forwarded = None;
    let mut real_ip = None;
    for (name, value) in headers {
        if forwarded.is_none() && name.eq_ignore_ascii_case(FORWARDED_FOR) {
            forwarded = value.split(',').map(str::trim).find(|hop| !hop.is_empty());
        } else if real_ip.is_none() && name.eq_ignore_ascii_case(REAL_IP) {
            real_ip = Some(value.trim()).filter(|ip| !ip.is_empty());
        }
    }
    forwarded.or(real_ip).unwrap_or(fallback).to_string()
}
