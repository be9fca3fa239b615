//! Origin collaborator: where assets come from when the "network" is up.

use super::store::{AssetRequest, StoredResponse};
use axum::http::Method;
use std::future::Future;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OriginError {
    #[error("origin has no entry for {url}")]
    NotFound { url: String },

    #[error("origin refused {url}")]
    Refused { url: String },

    #[error("origin unreachable: {0}")]
    Io(#[from] std::io::Error),
}

/// Fetch collaborator for the offline cache. A fetch either resolves to a
/// response snapshot or fails; failure is the "network unreachable" signal
/// that triggers the fallback chain.
pub trait AssetOrigin: Send + Sync {
    fn fetch(
        &self,
        request: &AssetRequest,
    ) -> impl Future<Output = Result<StoredResponse, OriginError>> + Send;
}

/// Serves files beneath a root directory for URLs under a mount prefix.
/// A missing or unreadable file is reported as a fetch failure, not a 404,
/// so the cache and the offline page get their chance.
pub struct FsOrigin {
    prefix: String,
    root: PathBuf,
}

impl FsOrigin {
    pub fn new(prefix: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
            root: root.into(),
        }
    }

    fn resolve(&self, url: &str) -> Result<PathBuf, OriginError> {
        let relative = url
            .strip_prefix(&self.prefix)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|rest| !rest.is_empty())
            .ok_or_else(|| OriginError::Refused {
                url: url.to_string(),
            })?;

        if relative.split('/').any(|part| part == "..") {
            return Err(OriginError::Refused {
                url: url.to_string(),
            });
        }

        Ok(self.root.join(relative))
    }
}

impl AssetOrigin for FsOrigin {
    async fn fetch(&self, request: &AssetRequest) -> Result<StoredResponse, OriginError> {
        if request.method != Method::GET {
            return Err(OriginError::Refused {
                url: request.url.clone(),
            });
        }

        let path = self.resolve(&request.url)?;
        match tokio::fs::read(&path).await {
            Ok(body) => Ok(StoredResponse::ok(content_type_for(&request.url), body)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Err(OriginError::NotFound {
                url: request.url.clone(),
            }),
            Err(err) => Err(OriginError::Io(err)),
        }
    }
}

fn content_type_for(url: &str) -> &'static str {
    match url.rsplit('.').next() {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "text/javascript; charset=utf-8",
        Some("json") | Some("webmanifest") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("ico") => "image/x-icon",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn origin_with(files: &[(&str, &str)]) -> (tempfile::TempDir, FsOrigin) {
        let dir = tempfile::tempdir().unwrap();
        for (name, body) in files {
            std::fs::write(dir.path().join(name), body).unwrap();
        }
        let origin = FsOrigin::new("/assets", dir.path().to_path_buf());
        (dir, origin)
    }

    #[tokio::test]
    async fn serves_file_with_content_type() {
        let (_dir, origin) = origin_with(&[("app.css", "body{}")]);
        let response = origin
            .fetch(&AssetRequest::get("/assets/app.css"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_type(), Some("text/css; charset=utf-8"));
        assert_eq!(response.body, b"body{}".to_vec());
    }

    #[tokio::test]
    async fn missing_file_is_a_fetch_failure() {
        let (_dir, origin) = origin_with(&[]);
        let err = origin
            .fetch(&AssetRequest::get("/assets/app.css"))
            .await
            .unwrap_err();
        assert!(matches!(err, OriginError::NotFound { .. }));
    }

    #[tokio::test]
    async fn refuses_urls_outside_the_mount() {
        let (_dir, origin) = origin_with(&[("app.css", "body{}")]);
        let err = origin.fetch(&AssetRequest::get("/other/app.css")).await;
        assert!(matches!(err, Err(OriginError::Refused { .. })));

        let err = origin.fetch(&AssetRequest::get("/assets/../secret")).await;
        assert!(matches!(err, Err(OriginError::Refused { .. })));
    }
}
