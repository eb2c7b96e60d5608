use crate::error::HttpError;
use crate::security::ERROR_BODY_PREVIEW_LIMIT;
use bytes::Bytes;
use http::{Response, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;

/// Boxed response body (already decompressed).
pub type ResponseBody =
    http_body_util::combinators::BoxBody<Bytes, Box<dyn std::error::Error + Send + Sync>>;

/// A received response. Every body read is capped at the client's
/// `max_body_size`.
#[derive(Debug)]
pub struct HttpResponse {
    pub(crate) inner: Response<ResponseBody>,
    pub(crate) max_body_size: usize,
}

impl HttpResponse {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// The raw body, whatever the status.
    ///
    /// # Errors
    /// [`HttpError::BodyTooLarge`] or a transport failure mid-body.
    pub async fn bytes(self) -> Result<Bytes, HttpError> {
        read_limited(self.inner, self.max_body_size).await
    }

    /// Decode a 2xx body as JSON.
    ///
    /// # Errors
    /// [`HttpError::HttpStatus`] carrying a body preview for other statuses,
    /// otherwise as [`bytes`](Self::bytes), plus [`HttpError::Json`].
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, HttpError> {
        let status = self.inner.status();
        if !status.is_success() {
            return Err(status_error(self.inner, self.max_body_size).await);
        }
        let body = read_limited(self.inner, self.max_body_size).await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn status_error(response: Response<ResponseBody>, max_body_size: usize) -> HttpError {
    let status = response.status();
    let content_type = response
        .headers()
        .get(http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    // An oversized error body must not hide the status error.
    let preview_limit = max_body_size.min(ERROR_BODY_PREVIEW_LIMIT);
    let body_preview = match read_limited(response, preview_limit).await {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(HttpError::BodyTooLarge { .. }) => "<body too large for preview>".to_owned(),
        Err(e) => return e,
    };

    HttpError::HttpStatus {
        status,
        body_preview,
        content_type,
    }
}

async fn read_limited(response: Response<ResponseBody>, limit: usize) -> Result<Bytes, HttpError> {
    let mut body = std::pin::pin!(response.into_body());
    let mut collected = Vec::new();

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            let actual = collected.len() + chunk.len();
            if actual > limit {
                return Err(HttpError::BodyTooLarge { limit, actual });
            }
            collected.extend_from_slice(chunk);
        }
    }

    Ok(Bytes::from(collected))
}
