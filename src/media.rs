//! Upload media-type resolution and filtering.

use image::ImageFormat;

pub const PDF: &str = "application/pdf";

/// Whether the extraction backend accepts this media type.
pub fn is_supported(media_type: &str) -> bool {
    media_type.starts_with("image/") || media_type == PDF
}

/// Resolve the media type of an upload.
///
/// The declared type wins unless it is missing or generic, in which case the
/// bytes are sniffed.
pub fn resolve(declared: Option<&str>, data: &[u8]) -> Option<String> {
    let declared = declared
        .map(|d| d.split(';').next().unwrap_or(d).trim().to_ascii_lowercase())
        .filter(|d| !d.is_empty() && d != "application/octet-stream");

    declared.or_else(|| sniff(data).map(str::to_string))
}

fn sniff(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"%PDF-") {
        return Some(PDF);
    }
    let mime = match image::guess_format(data).ok()? {
        ImageFormat::Png => "image/png",
        ImageFormat::Jpeg => "image/jpeg",
        ImageFormat::Gif => "image/gif",
        ImageFormat::WebP => "image/webp",
        ImageFormat::Bmp => "image/bmp",
        ImageFormat::Tiff => "image/tiff",
        _ => return None,
    };
    Some(mime)
}
