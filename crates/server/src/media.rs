use domain::{Media, MediaKind};
use reqwest::Url;

use crate::error::ApiError;

const MAX_MEDIA_URL_LEN: usize = 2048;

/// Media are stored as references only; the link must be absolute http(s).
pub fn parse_media_url(raw: &str) -> Result<Media, ApiError> {
    let raw = raw.trim();
    if raw.len() > MAX_MEDIA_URL_LEN {
        return Err(ApiError::bad_request("Media URL is too long."));
    }

    let url = Url::parse(raw).map_err(|_| ApiError::bad_request("Media URL is not a valid URL."))?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ApiError::bad_request("Media URL must use http or https."));
    }

    // 规范化后 (百分号编码) 可能变长，按存储的形式再查一次
    let normalized = url.to_string();
    if normalized.len() > MAX_MEDIA_URL_LEN {
        return Err(ApiError::bad_request("Media URL is too long."));
    }

    Ok(Media {
        kind: MediaKind::from_path(url.path()),
        url: normalized,
    })
}
