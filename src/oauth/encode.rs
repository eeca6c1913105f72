//! Percent-encoding and signature base strings (RFC 5849 section 3.4.1)

use super::params::{Params, percent_decode};
use crate::error::{Error, Result};
use reqwest::Url;

const HEX: &[u8; 16] = b"0123456789ABCDEF";

const fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Percent-encode `s` as described in section 3.6 of RFC 5849.
///
/// Every byte outside `A-Z a-z 0-9 - . _ ~` becomes `%XX`. With `double`
/// set the output is what encoding the once-encoded form again would
/// produce: each escape comes out as `%25XX`.
#[must_use]
pub fn encode(s: &str, double: bool) -> String {
    let escape_len = if double { 5 } else { 3 };
    let len = s
        .bytes()
        .map(|b| if is_unreserved(b) { 1 } else { escape_len })
        .sum();

    let mut out = String::with_capacity(len);
    for b in s.bytes() {
        if is_unreserved(b) {
            out.push(char::from(b));
            continue;
        }
        out.push('%');
        if double {
            out.push_str("25");
        }
        out.push(char::from(HEX[usize::from(b >> 4)]));
        out.push(char::from(HEX[usize::from(b & 0x0f)]));
    }
    out
}

/// Build the signature base string for a request.
///
/// `METHOD&scheme://host/path&params`, where the method and URL are
/// encoded once and the sorted parameter list is encoded twice. Sorting
/// happens on the doubly-encoded forms, which order the same way as the
/// once-encoded ones. The query component of `url` is not included; pass
/// every request parameter in `params`.
///
/// # Errors
///
/// Returns [`Error::InvalidUrl`] if `url` cannot be parsed or its path
/// holds a bad or non-UTF-8 percent escape.
pub fn base_string(method: &str, url: &str, params: &Params) -> Result<String> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{url}: {e}")))?;

    let mut authority = parsed.host_str().unwrap_or_default().to_ascii_lowercase();
    if let Some(port) = parsed.port() {
        authority = format!("{authority}:{port}");
    }
    let path = percent_decode(parsed.path(), false)
        .map_err(|_| Error::InvalidUrl(format!("{url}: bad escape in path")))?;

    let mut pairs: Vec<(String, String)> = params
        .iter()
        .map(|(key, value)| (encode(key, true), encode(value, true)))
        .collect();
    pairs.sort_unstable();

    let mut out = encode(&method.to_ascii_uppercase(), false);
    out.push('&');
    out.push_str(&encode(&parsed.scheme().to_ascii_lowercase(), false));
    out.push_str(&encode("://", false));
    out.push_str(&encode(&authority, false));
    out.push_str(&encode(&path, false));
    out.push('&');

    let amp = encode("&", false);
    let equals = encode("=", false);
    for (n, (key, value)) in pairs.iter().enumerate() {
        if n > 0 {
            out.push_str(&amp);
        }
        out.push_str(key);
        out.push_str(&equals);
        out.push_str(value);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreserved_bytes_pass_through() {
        let s = "AZaz09-._~";
        assert_eq!(encode(s, false), s);
        assert_eq!(encode(s, true), s);
    }

    #[test]
    fn reserved_bytes_escape_once() {
        assert_eq!(encode("a b", false), "a%20b");
        assert_eq!(encode("&=/+%", false), "%26%3D%2F%2B%25");
        assert_eq!(encode("é", false), "%C3%A9");
    }

    #[test]
    fn double_encoding_matches_encoding_twice() {
        for s in ["a b", "100%", "x=y&z", "ü~", "plain"] {
            assert_eq!(encode(s, true), encode(&encode(s, false), false));
        }
    }

    #[test]
    fn double_encoding_escapes_percent() {
        assert_eq!(encode("%", true), "%2525");
        // A single decode pass only gets back to the once-encoded form.
        assert_eq!(percent_decode(&encode("a b", true), false).unwrap(), "a%20b");
    }

    #[test]
    fn double_encoding_preserves_order() {
        let samples = [
            "", "a", "A", "Z", "[", "~", " ", "%", "a b", "a%b", "a=b", "ab", "a-b", "\u{7f}",
            "é", "zz", "0", "9:", "_x", ".",
        ];
        for a in samples {
            for b in samples {
                assert_eq!(
                    encode(a, false).cmp(&encode(b, false)),
                    encode(a, true).cmp(&encode(b, true)),
                    "{a:?} vs {b:?}"
                );
            }
        }
    }

    // Request from Appendix A.5 of the OAuth Core 1.0 specification.
    fn photos_params() -> Params {
        Params::from_pairs([
            ("file", "vacation.jpg"),
            ("size", "original"),
            ("oauth_consumer_key", "dpf43f3p2l4k3l03"),
            ("oauth_token", "nnch734d00sl2jdk"),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", "1191242096"),
            ("oauth_nonce", "kllo9940pd9333jh"),
            ("oauth_version", "1.0"),
        ])
    }

    #[test]
    fn base_string_for_known_request() {
        let base = base_string("get", "http://photos.example.net/photos", &photos_params()).unwrap();
        assert_eq!(
            base,
            "GET&http%3A%2F%2Fphotos.example.net%2Fphotos&file%3Dvacation.jpg\
             %26oauth_consumer_key%3Ddpf43f3p2l4k3l03%26oauth_nonce%3Dkllo9940pd9333jh\
             %26oauth_signature_method%3DHMAC-SHA1%26oauth_timestamp%3D1191242096\
             %26oauth_token%3Dnnch734d00sl2jdk%26oauth_version%3D1.0%26size%3Doriginal"
        );
    }

    #[test]
    fn base_string_lowercases_scheme_and_host_only() {
        let base = base_string("POST", "HTTPS://API.Example.COM/Path/Case", &Params::new()).unwrap();
        assert_eq!(base, "POST&https%3A%2F%2Fapi.example.com%2FPath%2FCase&");
    }

    #[test]
    fn base_string_keeps_non_default_port() {
        let base = base_string("GET", "http://127.0.0.1:8080/dm", &Params::new()).unwrap();
        assert_eq!(base, "GET&http%3A%2F%2F127.0.0.1%3A8080%2Fdm&");
    }

    #[test]
    fn base_string_sorts_repeated_names_by_value() {
        let params = Params::from_pairs([("a", "2"), ("a", "1"), ("A", "9")]);
        let base = base_string("GET", "http://h/", &params).unwrap();
        assert!(base.ends_with("&A%3D9%26a%3D1%26a%3D2"), "{base}");
    }

    #[test]
    fn base_string_rejects_bad_url() {
        assert!(matches!(
            base_string("GET", "not a url", &Params::new()),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn base_string_rejects_bad_path_escape() {
        for url in ["http://h/a%zz", "http://h/%ff"] {
            assert!(
                matches!(base_string("GET", url, &Params::new()), Err(Error::InvalidUrl(_))),
                "{url}"
            );
        }
    }
}
