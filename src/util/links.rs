use thiserror::Error;
use url::Url;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum OpenUrlError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
}

/// Resolve an image URL from the server against `base` and check it is safe
/// to hand to the system opener.
///
/// The server may return absolute URLs (object storage) or paths relative to
/// itself. Only http and https are accepted, so nothing else reaches a shell.
///
/// ```
/// use pixfeed::util::resolve_image_url;
/// use url::Url;
///
/// let base = Url::parse("http://localhost:8080/").unwrap();
/// let url = resolve_image_url(&base, "/uploads/a.jpg").unwrap();
/// assert_eq!(url.as_str(), "http://localhost:8080/uploads/a.jpg");
/// assert!(resolve_image_url(&base, "file:///etc/passwd").is_err());
/// ```
pub fn resolve_image_url(base: &Url, raw: &str) -> Result<Url, OpenUrlError> {
    let url = base.join(raw.trim())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(OpenUrlError::UnsupportedScheme(scheme.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://photos.example/").unwrap()
    }

    #[test]
    fn test_absolute_url_kept() {
        let url = resolve_image_url(&base(), "https://cdn.example/x.jpg").unwrap();
        assert_eq!(url.host_str(), Some("cdn.example"));
    }

    #[test]
    fn test_relative_path_joined() {
        let url = resolve_image_url(&base(), "uploads/x.jpg").unwrap();
        assert_eq!(url.as_str(), "https://photos.example/uploads/x.jpg");
    }

    #[test]
    fn test_other_schemes_rejected() {
        assert_eq!(
            resolve_image_url(&base(), "javascript:alert(1)"),
            Err(OpenUrlError::UnsupportedScheme("javascript".into()))
        );
        assert!(resolve_image_url(&base(), "file:///etc/passwd").is_err());
    }
}
