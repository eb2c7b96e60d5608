//! HTTP security utilities.

/// Maximum body preview size for error messages (8KB).
///
/// Non-2xx bodies are read up to this limit so the error can carry a preview
/// (Graph error envelopes are small) without buffering arbitrary payloads.
pub const ERROR_BODY_PREVIEW_LIMIT: usize = 8 * 1024;
