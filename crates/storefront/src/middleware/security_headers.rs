//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Adds restrictive security headers to all responses. The CSP is built per
//! request so inline scripts can be allowed by nonce, and so product images
//! from the backend's storage host and the placeholder image CDN load.

use axum::{
    extract::{Request, State},
    http::{
        HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

use super::csp::CspNonce;

/// Image host used by the placeholder catalog and category tiles.
pub const PLACEHOLDER_IMAGE_HOST: &str = "https://images.pexels.com";

/// Content Security Policy settings shared by all requests.
#[derive(Clone, Debug)]
pub struct ContentPolicy {
    img_src: String,
}

impl ContentPolicy {
    /// Allow images from `'self'`, the placeholder CDN and the given hosts.
    #[must_use]
    pub fn new<I, H>(image_hosts: I) -> Self
    where
        I: IntoIterator<Item = H>,
        H: AsRef<str>,
    {
        let mut img_src = format!("'self' {PLACEHOLDER_IMAGE_HOST}");
        for host in image_hosts {
            img_src.push_str(" https://");
            img_src.push_str(host.as_ref());
        }
        Self { img_src }
    }

    /// Render the policy, allowing inline scripts that carry `nonce`.
    #[must_use]
    pub fn header_value(&self, nonce: Option<&CspNonce>) -> String {
        let script_src = match nonce {
            Some(nonce) if !nonce.value().is_empty() => {
                format!("'self' 'nonce-{}'", nonce.value())
            }
            _ => "'self'".to_string(),
        };

        format!(
            "default-src 'none'; \
             script-src {script_src}; \
             style-src 'self'; \
             font-src 'self'; \
             img-src {}; \
             connect-src 'self'; \
             frame-src 'none'; \
             object-src 'none'; \
             base-uri 'self'; \
             form-action 'self'; \
             frame-ancestors 'none'",
            self.img_src
        )
    }
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self::new(std::iter::empty::<&str>())
    }
}

/// Add security headers to all responses.
///
/// Headers applied:
/// - `X-Frame-Options: DENY`
/// - `X-Content-Type-Options: nosniff`
/// - `Referrer-Policy: same-origin`
/// - `Content-Security-Policy` from [`ContentPolicy`]
/// - `Permissions-Policy` denying sensors, camera, payment and the like
/// - `Cache-Control: no-store` unless the handler set its own
/// - `Cross-Origin-Opener-Policy: same-origin`
/// - `Cross-Origin-Resource-Policy: same-origin`
///
/// `Cross-Origin-Embedder-Policy` is left unset: the image CDNs do not send
/// CORP headers.
pub async fn security_headers_middleware(
    State(policy): State<ContentPolicy>,
    request: Request,
    next: Next,
) -> Response {
    let csp = policy.header_value(request.extensions().get::<CspNonce>());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(REFERRER_POLICY, HeaderValue::from_static("same-origin"));

    match HeaderValue::from_str(&csp) {
        Ok(value) => {
            headers.insert(CONTENT_SECURITY_POLICY, value);
        }
        Err(e) => tracing::error!(error = %e, "Invalid CSP header value"),
    }

    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static(
            "accelerometer=(), \
             camera=(), \
             display-capture=(), \
             geolocation=(), \
             gyroscope=(), \
             magnetometer=(), \
             microphone=(), \
             payment=(), \
             usb=(), \
             interest-cohort=()",
        ),
    );

    if !headers.contains_key(CACHE_CONTROL) {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }

    headers.insert(
        HeaderName::from_static("cross-origin-opener-policy"),
        HeaderValue::from_static("same-origin"),
    );
    headers.insert(
        HeaderName::from_static("cross-origin-resource-policy"),
        HeaderValue::from_static("same-origin"),
    );

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_lists_image_hosts() {
        let policy = ContentPolicy::new(["abc.supabase.co"]);
        let csp = policy.header_value(None);
        assert!(csp.contains("img-src 'self' https://images.pexels.com https://abc.supabase.co;"));
        assert!(csp.contains("script-src 'self';"));
    }

    #[test]
    fn test_policy_includes_nonce() {
        let nonce = CspNonce("bm9uY2U=".to_string());
        let csp = ContentPolicy::default().header_value(Some(&nonce));
        assert!(csp.contains("script-src 'self' 'nonce-bm9uY2U=';"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }
}
