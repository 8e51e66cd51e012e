use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{header, request::Parts, Extensions, HeaderMap, Uri},
};
use std::convert::Infallible;
use std::net::SocketAddr;

use crate::domain::models::security::RequestMeta;

/// Client address and user agent of the current request, for audit logging.
pub struct ClientMeta(pub RequestMeta);

impl<S> FromRequestParts<S> for ClientMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientMeta(request_meta(&parts.headers, &parts.extensions, &parts.uri)))
    }
}

/// The first `X-Forwarded-For` hop wins over the socket peer.
pub fn request_meta(headers: &HeaderMap, extensions: &Extensions, uri: &Uri) -> RequestMeta {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let ip = forwarded
        .or_else(|| extensions.get::<ConnectInfo<SocketAddr>>().map(|c| c.0.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    RequestMeta {
        ip,
        user_agent,
        path: uri.path().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_forwarded_for_takes_first_hop() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        headers.insert(header::USER_AGENT, HeaderValue::from_static("curl/8"));

        let meta = request_meta(&headers, &Extensions::new(), &"/api/v1/leads?page=2".parse().unwrap());
        assert_eq!(meta.ip, "203.0.113.7");
        assert_eq!(meta.user_agent, "curl/8");
        assert_eq!(meta.path, "/api/v1/leads");
    }

    #[test]
    fn test_falls_back_to_peer_then_unknown() {
        let mut extensions = Extensions::new();
        extensions.insert(ConnectInfo("192.0.2.1:5000".parse::<SocketAddr>().unwrap()));
        let uri: Uri = "/".parse().unwrap();

        assert_eq!(request_meta(&HeaderMap::new(), &extensions, &uri).ip, "192.0.2.1");
        assert_eq!(request_meta(&HeaderMap::new(), &Extensions::new(), &uri).ip, "unknown");
    }
}
