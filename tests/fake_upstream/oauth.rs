//! Checking recorded requests the way the real service would

use super::Recorded;
use dm_gateway::oauth::{Credentials, Params, signature};

/// The parameters of an `Authorization: OAuth k="v", ...` header value,
/// decoded.
pub fn header_params(header: &str) -> Params {
    let fields = header
        .strip_prefix("OAuth ")
        .expect("OAuth authorization scheme");
    let form: Vec<String> = fields
        .split(", ")
        .map(|field| {
            let (key, value) = field.split_once('=').expect("key=\"value\"");
            format!("{key}={}", value.trim_matches('"'))
        })
        .collect();
    Params::parse_form(&form.join("&")).expect("header values are percent-encoded")
}

/// Every parameter the request carried, from the header, the query
/// string and a form body.
pub fn request_params(request: &Recorded) -> Params {
    let mut params = Params::new();
    if let Some(header) = request.header("authorization") {
        for (key, value) in header_params(header).iter() {
            params.add(key, value);
        }
    }
    for source in [request.query.as_deref(), Some(request.body.as_str())] {
        let Some(form) = source.filter(|s| !s.is_empty()) else {
            continue;
        };
        for (key, value) in Params::parse_form(form).unwrap().iter() {
            params.add(key, value);
        }
    }
    params
}

/// Recompute the signature of `request` as sent to `url` and compare it
/// with the one it carried.
pub fn assert_signed(
    request: &Recorded,
    consumer: &Credentials,
    token: Option<&Credentials>,
    url: &str,
) {
    let mut params = request_params(request);
    let sent = params
        .remove("oauth_signature")
        .and_then(|v| v.into_iter().next())
        .expect("request carries a signature");
    let expected = signature(consumer, token, &request.method, url, &params).unwrap();
    assert_eq!(sent, expected, "signature mismatch for {request:?}");
}
