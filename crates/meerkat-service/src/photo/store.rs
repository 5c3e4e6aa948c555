//! Photo persistence.
//!
//! Every write decodes the incoming image, stores a 125x125 JPEG under a
//! fresh `{uuid}_photo.jpg` name and returns a 48x48 JPEG thumbnail as an
//! inline data URL. Files are never rewritten in place.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use meerkat_db::model::contact::Contact;

use crate::error::{ServiceError, ServiceResult};

pub const PHOTO_SIZE: u32 = 125;
pub const THUMBNAIL_SIZE: u32 = 48;
pub const JPEG_QUALITY: u8 = 85;

const PHOTO_SUFFIX: &str = "_photo.jpg";
const THUMBNAIL_PREFIX: &str = "data:image/jpeg;base64,";

/// Outcome of a successful [`PhotoStore::save`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedPhoto {
    /// File name relative to the photo directory.
    pub filename: String,
    /// `data:image/jpeg;base64,...`
    pub thumbnail: String,
}

/// Photo bytes read back for a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoData {
    /// Standard base64 of the image bytes.
    pub base64: String,
    pub media_type: String,
}

#[derive(Debug, Clone)]
pub struct PhotoStore {
    dir: PathBuf,
}

impl PhotoStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// ## Summary
    /// Decodes `bytes`, then writes the resized photo and renders the
    /// thumbnail.
    ///
    /// ## Errors
    /// Returns [`ServiceError::UnsupportedFormat`] if the bytes are neither
    /// JPEG nor PNG, [`ServiceError::InvalidInput`] if they do not decode, and
    /// [`ServiceError::Internal`] on I/O failures.
    #[tracing::instrument(skip(self, bytes), fields(len = bytes.len()))]
    pub async fn save(
        &self,
        bytes: Vec<u8>,
        media_type: Option<&str>,
    ) -> ServiceResult<SavedPhoto> {
        let format = detect_format(&bytes, media_type)?;

        let (photo, thumbnail) = tokio::task::spawn_blocking(move || render(&bytes, format))
            .await
            .map_err(|e| ServiceError::Internal(format!("photo task failed: {e}")))??;

        let filename = format!("{}{PHOTO_SUFFIX}", uuid::Uuid::new_v4());
        self.write_atomically(&filename, &photo).await.map_err(|e| {
            tracing::error!(error = %e, dir = %self.dir.display(), "Failed to write photo");
            ServiceError::Internal(format!("failed to write photo: {e}"))
        })?;

        tracing::debug!(%filename, "Photo saved");
        Ok(SavedPhoto {
            filename,
            thumbnail: format!("{THUMBNAIL_PREFIX}{}", STANDARD.encode(thumbnail)),
        })
    }

    async fn write_atomically(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let tmp = self.dir.join(format!(".{filename}.tmp"));
        tokio::fs::write(&tmp, bytes).await?;
        if let Err(err) = tokio::fs::rename(&tmp, self.dir.join(filename)).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(err);
        }
        Ok(())
    }

    /// ## Summary
    /// Reads a contact's photo back: the stored file if it still exists,
    /// otherwise the inline thumbnail.
    ///
    /// Read failures are logged and treated as "no photo".
    #[tracing::instrument(skip_all, fields(contact_id = contact.id))]
    pub async fn load(&self, contact: &Contact) -> Option<PhotoData> {
        if let Some(filename) = contact.photo.as_deref().filter(|f| is_safe_filename(f)) {
            match tokio::fs::read(self.dir.join(filename)).await {
                Ok(bytes) => {
                    let media_type = sniff(&bytes)
                        .map_or("image/jpeg", |format| format.to_mime_type())
                        .to_string();
                    return Some(PhotoData {
                        base64: STANDARD.encode(&bytes),
                        media_type,
                    });
                }
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                    tracing::debug!(%filename, "Photo file missing, falling back to thumbnail");
                }
                Err(err) => {
                    tracing::warn!(error = %err, %filename, "Failed to read photo");
                }
            }
        }

        contact
            .photo_thumbnail
            .as_deref()
            .and_then(parse_data_url)
    }
}

/// Splits `data:{media type};base64,{body}`.
#[must_use]
pub fn parse_data_url(url: &str) -> Option<PhotoData> {
    let rest = url.trim().strip_prefix("data:")?;
    let (header, body) = rest.split_once(',')?;
    let media_type = header.strip_suffix(";base64")?;
    let media_type = if media_type.is_empty() {
        "image/jpeg"
    } else {
        media_type
    };
    Some(PhotoData {
        base64: body.to_string(),
        media_type: media_type.to_ascii_lowercase(),
    })
}

fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains(['/', '\\'])
        && !name.contains("..")
}

/// Detects JPEG or PNG from magic bytes.
#[must_use]
pub fn sniff(bytes: &[u8]) -> Option<ImageFormat> {
    if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageFormat::Jpeg)
    } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some(ImageFormat::Png)
    } else {
        None
    }
}

fn detect_format(bytes: &[u8], media_type: Option<&str>) -> ServiceResult<ImageFormat> {
    if let Some(format) = sniff(bytes) {
        return Ok(format);
    }
    let declared = media_type.map(str::to_ascii_lowercase).unwrap_or_default();
    match declared.as_str() {
        "image/jpeg" | "image/jpg" => Ok(ImageFormat::Jpeg),
        "image/png" => Ok(ImageFormat::Png),
        "" => Err(ServiceError::UnsupportedFormat("unknown".to_string())),
        _ => Err(ServiceError::UnsupportedFormat(declared)),
    }
}

fn render(bytes: &[u8], format: ImageFormat) -> ServiceResult<(Vec<u8>, Vec<u8>)> {
    let image = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ServiceError::InvalidInput(format!("cannot decode image: {e}")))?;

    Ok((
        encode_jpeg(&image, PHOTO_SIZE)?,
        encode_jpeg(&image, THUMBNAIL_SIZE)?,
    ))
}

fn encode_jpeg(image: &DynamicImage, size: u32) -> ServiceResult<Vec<u8>> {
    let rgb = image
        .resize_exact(size, size, FilterType::Lanczos3)
        .to_rgb8();
    let mut buf = Cursor::new(Vec::new());
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY)
        .encode_image(&rgb)
        .map_err(|e| ServiceError::Internal(format!("cannot encode jpeg: {e}")))?;
    Ok(buf.into_inner())
}
