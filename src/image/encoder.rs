//! Turns user-selected files into [`SourceImage`]s.

use crate::error::{RestyleError, Result};
use crate::image::types::{ImageFormat, SourceImage};
use std::path::Path;

/// Reads `path` and encodes it as a source image.
///
/// The mime type is guessed from the extension, then from the file's magic
/// bytes. Files that are not images yield `Ok(None)`: selecting one is a
/// no-op rather than an error. An extension naming a non-image type is
/// rejected before the file is read. Read failures surface as
/// [`RestyleError::Read`].
pub async fn encode_file(path: impl AsRef<Path>) -> Result<Option<SourceImage>> {
    let path = path.as_ref();
    let guessed = guess_mime_type(path);

    // Known non-image types are rejected without touching the file.
    if let Some(mime) = guessed.as_deref() {
        if !is_image_mime(mime) && !is_generic_mime(mime) {
            tracing::debug!(path = %path.display(), mime_type = mime, "ignoring non-image file");
            return Ok(None);
        }
    }

    let data = tokio::fs::read(path).await.map_err(|source| RestyleError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let image = encode_bytes(data, guessed.as_deref());
    match &image {
        Some(image) => tracing::debug!(
            path = %path.display(),
            mime_type = image.mime_type(),
            size = image.size(),
            "encoded source image"
        ),
        None => tracing::debug!(path = %path.display(), "ignoring non-image file"),
    }
    Ok(image)
}

/// Encodes raw bytes with an optional declared mime type.
///
/// A declared `image/*` type wins. Otherwise the bytes are sniffed, and
/// anything that is neither declared nor detected as an image is rejected.
pub fn encode_bytes(data: Vec<u8>, declared_mime: Option<&str>) -> Option<SourceImage> {
    let mime_type = match declared_mime.map(str::trim).filter(|m| !is_generic_mime(m)) {
        Some(mime) if is_image_mime(mime) => mime.to_string(),
        Some(_) => return None,
        None => ImageFormat::from_magic_bytes(&data)?.mime_type().to_string(),
    };

    Some(SourceImage::new(mime_type, data))
}

fn guess_mime_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|mime| mime.essence_str().to_string())
}

fn is_image_mime(mime: &str) -> bool {
    mime.trim().to_lowercase().starts_with("image/")
}

// Types that say nothing about the content, so sniffing still applies.
fn is_generic_mime(mime: &str) -> bool {
    matches!(
        mime.trim().to_lowercase().as_str(),
        "" | "application/octet-stream"
    )
}
