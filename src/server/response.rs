use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use super::error_response::NO_STORE;
use crate::pipeline::FetchedMedia;
use crate::utils::header_safe_filename;

/// Whole-body attachment response for a fetched file.
///
/// `filename` carries an ASCII fallback, `filename*` (RFC 5987) the original name.
pub fn media_response(media: FetchedMedia) -> Response {
    let disposition = format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        header_safe_filename(&media.file_name),
        urlencoding::encode(&media.file_name)
    );
    let length = media.data.len();

    let mut response = (StatusCode::OK, Body::from(media.data)).into_response();
    let headers = response.headers_mut();

    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(media.mime_type));
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&disposition).unwrap_or_else(|_| HeaderValue::from_static("attachment")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(NO_STORE));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_media_response_headers() {
        let media = FetchedMedia {
            file_name: "My \"Great\" Song.mp3".to_string(),
            mime_type: "audio/mpeg",
            data: b"id3-data".to_vec(),
        };

        let response = media_response(media);
        let headers = response.headers();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(headers[header::CONTENT_TYPE], "audio/mpeg");
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"My _Great_ Song.mp3\"; filename*=UTF-8''My%20%22Great%22%20Song.mp3"
        );
        assert_eq!(headers[header::CONTENT_LENGTH], "8");
        assert_eq!(headers[header::CACHE_CONTROL], NO_STORE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"id3-data");
    }

    #[tokio::test]
    async fn test_non_ascii_file_name() {
        let media = FetchedMedia {
            file_name: "Café – Live.m4a".to_string(),
            mime_type: "audio/mp4",
            data: vec![1, 2, 3],
        };

        let response = media_response(media);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Caf_ _ Live.m4a\"; filename*=UTF-8''Caf%C3%A9%20%E2%80%93%20Live.m4a"
        );
    }

    #[test]
    fn test_unprintable_name_keeps_original_in_extended_parameter() {
        let media = FetchedMedia {
            file_name: "日本語.mp3".to_string(),
            mime_type: "audio/mpeg",
            data: Vec::new(),
        };

        let response = media_response(media);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"___.mp3\"; filename*=UTF-8''%E6%97%A5%E6%9C%AC%E8%AA%9E.mp3"
        );
    }
}
