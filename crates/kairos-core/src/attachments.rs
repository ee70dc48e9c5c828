//! Image attachments as data URLs

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use base64::Engine;

/// Mime type for an image path, judged by extension
pub fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        "bmp" => Some("image/bmp"),
        _ => None,
    }
}

pub fn encode_data_url(mime_type: &str, bytes: &[u8]) -> String {
    format!(
        "data:{};base64,{}",
        mime_type,
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Read an image file into a `data:<mime>;base64,...` URL
pub fn image_data_url(path: &Path) -> Result<String> {
    let mime_type = image_mime_type(path)
        .ok_or_else(|| anyhow!("{} is not a supported image", path.display()))?;
    let bytes = std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(encode_data_url(mime_type, &bytes))
}

/// Split a base64 data URL into its mime type and payload
pub fn split_data_url(url: &str) -> Option<(&str, &str)> {
    let rest = url.strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime_type = header.strip_suffix(";base64")?;
    Some((mime_type, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_image_data_url_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pieza.PNG");
        std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

        let url = image_data_url(&path).unwrap();
        assert_eq!(url, "data:image/png;base64,iVBORw==");
        assert_eq!(split_data_url(&url), Some(("image/png", "iVBORw==")));
    }

    #[test]
    fn test_rejects_non_images() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notas.txt");
        std::fs::write(&path, "hola").unwrap();
        assert!(image_data_url(&path).is_err());
    }

    #[test]
    fn test_split_data_url_rejects_plain_base64() {
        assert_eq!(split_data_url("iVBORw=="), None);
        assert_eq!(split_data_url("data:image/png,raw"), None);
    }
}
