use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine};

use crate::{
    config::Config,
    error::{AppError, AppResult},
};

pub const RECIPE_IMAGES: &str = "recipes";
pub const AVATARS: &str = "avatars";

/// Splits `data:image/<ext>;base64,<payload>` into the extension and decoded bytes.
pub fn decode_data_uri(data: &str) -> Option<(&str, Vec<u8>)> {
    let (format, payload) = data.strip_prefix("data:image/")?.split_once(";base64,")?;

    let ext = match format {
        "jpeg" | "jpg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "webp" => "webp",
        _ => return None,
    };

    let bytes = STANDARD.decode(payload.trim()).ok()?;
    (!bytes.is_empty()).then_some((ext, bytes))
}

/// Stores a base64 image under `MEDIA_ROOT/<folder>/` and returns its public URL.
/// `field` names the request field blamed when the payload is not an image.
pub async fn save_image(
    config: &Config,
    folder: &str,
    field: &'static str,
    data: &str,
) -> AppResult<String> {
    let Some((ext, bytes)) = decode_data_uri(data) else {
        return Err(AppError::Invalid(
            field,
            "Expected a base64 encoded data:image URI".to_string(),
        ));
    };

    let dir = config.media_root.join(folder);
    tokio::fs::create_dir_all(&dir).await?;

    let file_name = format!("{}.{ext}", uuid::Uuid::new_v4());
    tokio::fs::write(dir.join(&file_name), bytes).await?;
    tracing::debug!(folder, file = %file_name, "stored image");

    Ok(config.media_url(&format!("{folder}/{file_name}")))
}

/// Deletes a file previously returned by [`save_image`]. URLs from elsewhere are ignored.
pub async fn remove_image(config: &Config, url: &str) {
    let Some(relative) = url.strip_prefix(&config.media_url("")) else {
        return;
    };
    if relative.split('/').any(|part| part == ".." || part.is_empty()) {
        return;
    }

    let path = config.media_root.join(Path::new(relative));
    if let Err(err) = tokio::fs::remove_file(&path).await {
        tracing::warn!(path = %path.display(), %err, "could not remove image");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    #[test]
    fn decodes_png_data_uri() {
        let (ext, bytes) = decode_data_uri(PIXEL).unwrap();

        assert_eq!(ext, "png");
        assert_eq!(&bytes[1..4], b"PNG");
    }

    #[test]
    fn rejects_other_payloads() {
        assert!(decode_data_uri("https://example.com/cat.png").is_none());
        assert!(decode_data_uri("data:text/plain;base64,aGVsbG8=").is_none());
        assert!(decode_data_uri("data:image/png;base64,***").is_none());
        assert!(decode_data_uri("data:image/svg+xml;base64,PHN2Zz4=").is_none());
    }
}
