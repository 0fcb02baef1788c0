//! The host, scheme and port a request was addressed to.

use http::header;

use crate::Request;

/// Where a request was sent: scheme, host and port.
///
/// Server-side requests usually carry only a path in their URI; the host
/// then comes from the `Host` header and the port defaults from the scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTarget {
    /// Lowercased scheme, `http` unless the URI says otherwise.
    pub scheme: String,
    /// Lowercased host, empty when unknown.
    pub host: String,
    /// Explicit port, or the scheme's default.
    pub port: Option<u16>,
}

impl RequestTarget {
    /// Derives the target of `request`.
    #[must_use]
    pub fn from_request(request: &Request) -> Self {
        let uri = request.uri();
        let scheme = uri
            .scheme_str()
            .map_or_else(|| "http".to_string(), str::to_ascii_lowercase);

        let header_authority = request
            .headers()
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<http::uri::Authority>().ok());

        let host = uri
            .host()
            .or_else(|| header_authority.as_ref().map(http::uri::Authority::host))
            .unwrap_or_default()
            .to_ascii_lowercase();

        let port = uri
            .port_u16()
            .or_else(|| header_authority.as_ref().and_then(http::uri::Authority::port_u16))
            .or_else(|| default_port(&scheme));

        Self { scheme, host, port }
    }

    /// Returns true if the port is the default for the scheme.
    #[must_use]
    pub fn is_default_port(&self) -> bool {
        self.port.is_none() || self.port == default_port(&self.scheme)
    }
}

/// Returns the conventional port for `scheme`.
#[must_use]
pub fn default_port(scheme: &str) -> Option<u16> {
    match scheme {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Full;

    fn request(uri: &str, host: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri(uri);
        if let Some(host) = host {
            builder = builder.header(header::HOST, host);
        }
        builder.body(Full::new(Bytes::new())).unwrap()
    }

    #[test]
    fn test_absolute_uri() {
        let target = RequestTarget::from_request(&request("https://API.example.com/x", None));
        assert_eq!(target.scheme, "https");
        assert_eq!(target.host, "api.example.com");
        assert_eq!(target.port, Some(443));
        assert!(target.is_default_port());
    }

    #[test]
    fn test_host_header_with_port() {
        let target = RequestTarget::from_request(&request("/x", Some("localhost:8080")));
        assert_eq!(target.scheme, "http");
        assert_eq!(target.host, "localhost");
        assert_eq!(target.port, Some(8080));
        assert!(!target.is_default_port());
    }

    #[test]
    fn test_no_host() {
        let target = RequestTarget::from_request(&request("/x", None));
        assert_eq!(target.host, "");
        assert_eq!(target.port, Some(80));
    }
}
