//! MIME type helpers.

/// Map a content type to a dotted file extension.
///
/// Parameters such as `; charset=utf-8` are ignored. Unknown types map to
/// `.bin`.
pub fn mime_to_extension(mime: &str) -> &'static str {
    let essence = mime
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    match essence.as_str() {
        "application/pdf" => ".pdf",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        "image/tiff" => ".tiff",
        "image/bmp" | "image/x-ms-bmp" => ".bmp",
        "image/gif" => ".gif",
        "text/plain" => ".txt",
        "text/html" => ".html",
        "application/msword" => ".doc",
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => ".docx",
        _ => ".bin",
    }
}

/// Extension to use for a scratch copy of a document.
///
/// Prefers the document type the store reports; falls back to the content
/// type when the document type is empty.
pub fn scratch_extension(doc_type: &str, content_type: &str) -> String {
    let normalized = crate::ocr::normalize_doc_type(doc_type);
    if normalized.is_empty() {
        mime_to_extension(content_type).to_string()
    } else {
        normalized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_to_extension_pdf() {
        assert_eq!(mime_to_extension("application/pdf"), ".pdf");
    }

    #[test]
    fn test_mime_to_extension_ignores_params_and_case() {
        assert_eq!(mime_to_extension("Image/PNG; q=0.9"), ".png");
        assert_eq!(mime_to_extension("text/plain; charset=utf-8"), ".txt");
    }

    #[test]
    fn test_mime_to_extension_images() {
        assert_eq!(mime_to_extension("image/jpeg"), ".jpg");
        assert_eq!(mime_to_extension("image/tiff"), ".tiff");
        assert_eq!(mime_to_extension("image/bmp"), ".bmp");
    }

    #[test]
    fn test_mime_to_extension_unknown() {
        assert_eq!(mime_to_extension("application/unknown"), ".bin");
        assert_eq!(mime_to_extension(""), ".bin");
    }

    #[test]
    fn test_scratch_extension_prefers_doc_type() {
        assert_eq!(scratch_extension(".PDF", "image/png"), ".pdf");
        assert_eq!(scratch_extension("jpg", ""), ".jpg");
        assert_eq!(scratch_extension("", "application/pdf"), ".pdf");
    }
}
