//! File name to MIME type mapping, used for the content type of uploaded objects.

use std::path::Path;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Maps file names to a MIME type.
pub trait MimeMapper: Send + Sync {
    fn content_type_for(&self, file_name: &Path) -> String;
}

/// Extension table covering the usual static-site and document types.
const EXTENSION_TABLE: &[(&str, &str)] = &[
    // Web
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("mjs", "application/javascript"),
    ("json", "application/json"),
    ("map", "application/json"),
    ("xml", "text/xml"),
    ("wasm", "application/wasm"),
    ("webmanifest", "application/manifest+json"),
    // Text
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("csv", "text/csv"),
    ("ics", "text/calendar"),
    // Images
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("ico", "image/x-icon"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("avif", "image/avif"),
    ("tif", "image/tiff"),
    ("tiff", "image/tiff"),
    // Fonts
    ("woff", "font/woff"),
    ("woff2", "font/woff2"),
    ("ttf", "font/ttf"),
    ("otf", "font/otf"),
    ("eot", "application/vnd.ms-fontobject"),
    // Audio / video
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("flac", "audio/flac"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mov", "video/quicktime"),
    ("avi", "video/x-msvideo"),
    // Documents & archives
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("gz", "application/gzip"),
    ("tar", "application/x-tar"),
    ("7z", "application/x-7z-compressed"),
    ("doc", "application/msword"),
    (
        "docx",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    ),
    ("xls", "application/vnd.ms-excel"),
    (
        "xlsx",
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    ),
    ("ppt", "application/vnd.ms-powerpoint"),
    (
        "pptx",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    ),
    ("rtf", "application/rtf"),
];

/// Table-driven mapper; unknown extensions map to `application/octet-stream`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionMimeMapper;

impl MimeMapper for ExtensionMimeMapper {
    fn content_type_for(&self, file_name: &Path) -> String {
        let Some(ext) = file_name.extension().and_then(|e| e.to_str()) else {
            return DEFAULT_CONTENT_TYPE.to_string();
        };

        EXTENSION_TABLE
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(ext))
            .map(|(_, mime)| mime.to_string())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string())
    }
}
