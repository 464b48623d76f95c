use std::path::Path;

use axum::{
    Extension, Json,
    extract::{Multipart, State},
};
use tracing::{error, info, warn};

use amity_types::api::{Claims, UploadResponse};

use crate::auth::AppState;
use crate::blocking;
use crate::error::ApiError;

/// Multipart field holding the picture.
const PHOTO_FIELD: &str = "photo";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ImageKind {
    Png,
    Jpeg,
    Gif,
}

impl ImageKind {
    fn from_extension(file_name: &str) -> Option<Self> {
        let ext = Path::new(file_name).extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "gif" => Some(Self::Gif),
            _ => None,
        }
    }

    fn matches_magic(self, data: &[u8]) -> bool {
        match self {
            Self::Png => data.starts_with(b"\x89PNG\r\n\x1a\n"),
            Self::Jpeg => data.starts_with(&[0xFF, 0xD8, 0xFF]),
            Self::Gif => data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a"),
        }
    }

    fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpg",
            Self::Gif => "gif",
        }
    }
}

/// Check an uploaded picture and return its normalized kind.
fn validate_image(file_name: &str, data: &[u8], max_bytes: usize) -> Result<ImageKind, ApiError> {
    let kind = ImageKind::from_extension(file_name).ok_or_else(|| {
        ApiError::Validation("Only .png, .jpg, .jpeg and .gif files are allowed".into())
    })?;
    if data.is_empty() {
        return Err(ApiError::Validation("Uploaded file is empty".into()));
    }
    if data.len() > max_bytes {
        return Err(ApiError::Validation(format!(
            "File is too large (max {} bytes)",
            max_bytes
        )));
    }
    if !kind.matches_magic(data) {
        return Err(ApiError::Validation(
            "File content does not match its extension".into(),
        ));
    }
    Ok(kind)
}

/// POST /upload: multipart form with a `photo` field. The picture replaces
/// any previous one and is stored as `user_{id}_profile.{ext}`.
pub async fn upload_profile_picture(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut photo = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(PHOTO_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field.bytes().await?;
        photo = Some((file_name, data));
        break;
    }

    let Some((file_name, data)) = photo else {
        warn!("Upload from {} without a photo part", claims.username);
        return Err(ApiError::InvalidArgument("No file part".into()));
    };
    if file_name.is_empty() {
        return Err(ApiError::InvalidArgument("No selected file".into()));
    }

    let kind = validate_image(&file_name, &data, state.max_upload_bytes).inspect_err(|e| {
        warn!("File validation error for {}: {}", claims.username, e);
    })?;

    let filename = format!("user_{}_profile.{}", claims.sub, kind.extension());
    let path = state.upload_dir.join(&filename);
    let partial = state.upload_dir.join(format!(".{}.part", filename));

    tokio::fs::create_dir_all(&state.upload_dir)
        .await
        .map_err(|e| anyhow::anyhow!("failed to create upload dir: {}", e))?;
    tokio::fs::write(&partial, &data).await.map_err(|e| {
        error!("Failed to write file {}: {}", partial.display(), e);
        anyhow::anyhow!("failed to store upload")
    })?;

    let user_id = claims.sub;
    let stored = filename.clone();
    let updated = blocking(&state, move |db| {
        let previous = db.get_user_by_id(user_id)?.and_then(|u| u.profile_img);
        db.set_profile_img(user_id, &stored)?;
        Ok(previous)
    })
    .await;
    let previous = match updated {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(rm) = tokio::fs::remove_file(&partial).await {
                warn!("Failed to remove {}: {}", partial.display(), rm);
            }
            return Err(e);
        }
    };

    tokio::fs::rename(&partial, &path).await.map_err(|e| {
        error!("Failed to move {} into place: {}", path.display(), e);
        anyhow::anyhow!("failed to store upload")
    })?;

    // A picture of another type leaves its old file behind otherwise.
    if let Some(old) = previous.filter(|old| *old != filename) {
        if let Err(e) = tokio::fs::remove_file(state.upload_dir.join(&old)).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to remove old picture {}: {}", old, e);
            }
        }
    }

    info!("File uploaded successfully: {}", filename);
    Ok(Json(UploadResponse { filename }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];

    #[test]
    fn test_accepts_known_images() {
        assert_eq!(validate_image("me.png", PNG, 1024).unwrap(), ImageKind::Png);
        assert_eq!(validate_image("Me.JPEG", JPEG, 1024).unwrap(), ImageKind::Jpeg);
        assert_eq!(validate_image("a.gif", b"GIF89a....", 1024).unwrap(), ImageKind::Gif);
    }

    #[test]
    fn test_rejects_bad_uploads() {
        assert!(validate_image("script.sh", PNG, 1024).is_err());
        assert!(validate_image("noext", PNG, 1024).is_err());
        assert!(validate_image("me.png", b"", 1024).is_err());
        assert!(validate_image("me.png", PNG, 4).is_err());
        // extension and content disagree
        assert!(validate_image("me.png", JPEG, 1024).is_err());
    }

    #[test]
    fn test_stored_extension_is_normalized() {
        assert_eq!(ImageKind::from_extension("x.jpeg").unwrap().extension(), "jpg");
        assert_eq!(ImageKind::from_extension("x.JPG").unwrap().extension(), "jpg");
    }
}
