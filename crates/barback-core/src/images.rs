//! Image ingestion: placeholder hashing, durable storage and metadata records.

use crate::config::{ImportConfig, StorageConfig};
use crate::error::{BarbackError, Result};
use crate::models::{ImageId, ImageMetadataUpdate, NewImage, StoredImage};
use crate::placeholder::derive_placeholder;
use crate::storage::Storage;
use crate::store::ImageStore;
use image::{DynamicImage, ImageFormat, ImageReader};
use serde::Serialize;
use std::io::Cursor;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Formats accepted from uploads and scrapes.
pub const ALLOWED_FORMATS: &[ImageFormat] = &[
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
];

/// A decoded raster image together with the format it arrived in.
#[derive(Debug, Clone)]
pub struct SourceImage {
    pub image: DynamicImage,
    pub format: Option<ImageFormat>,
}

impl SourceImage {
    /// Wrap an already decoded image. `None` stores it as JPEG.
    pub fn new(image: DynamicImage, format: Option<ImageFormat>) -> Self {
        Self { image, format }
    }

    /// Detect the format from magic bytes, check it is allowed, and decode.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() > ImportConfig::MAX_IMAGE_BYTES {
            return Err(BarbackError::validation(
                "image",
                format!(
                    "Image too large: {} bytes (max {})",
                    data.len(),
                    ImportConfig::MAX_IMAGE_BYTES
                ),
            ));
        }

        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|e| BarbackError::io_with_path(e, "<memory>"))?;

        let format = reader
            .format()
            .ok_or_else(|| BarbackError::validation("image", "Could not detect image format"))?;

        if !ALLOWED_FORMATS.contains(&format) {
            return Err(BarbackError::validation(
                "image",
                format!(
                    "Unsupported image format: {:?}. Allowed: JPEG, PNG, GIF, WebP",
                    format
                ),
            ));
        }

        let image = reader.decode()?;
        Ok(Self::new(image, Some(format)))
    }

    /// File extension for the stored file.
    pub fn extension(&self) -> &'static str {
        self.format
            .and_then(|f| f.extensions_str().first().copied())
            .unwrap_or(StorageConfig::DEFAULT_EXTENSION)
    }

    /// Encode the image in its original format (JPEG when unknown).
    pub fn encode(&self) -> Result<Vec<u8>> {
        let format = self.format.unwrap_or(ImageFormat::Jpeg);
        let mut buffer = Cursor::new(Vec::new());
        let encoded = match format {
            ImageFormat::Jpeg => {
                DynamicImage::ImageRgb8(self.image.to_rgb8()).write_to(&mut buffer, format)
            }
            _ => DynamicImage::ImageRgba8(self.image.to_rgba8()).write_to(&mut buffer, format),
        };
        encoded.map_err(|e| BarbackError::ImageEncoding {
            message: format!("Failed to encode {:?}: {}", format, e),
        })?;
        Ok(buffer.into_inner())
    }
}

/// One image handed to [`ImageIngestor::ingest`].
///
/// Uploads without a `file` carry metadata only and are skipped.
#[derive(Debug, Clone, Default)]
pub struct ImageUpload {
    pub file: Option<SourceImage>,
    pub copyright: Option<String>,
    pub sort: i64,
}

/// An image that was skipped, with the reason.
#[derive(Debug, Clone, Serialize)]
pub struct ImageFailure {
    /// Position of the image in the ingested batch.
    pub index: usize,
    pub reason: String,
}

/// Outcome of one ingestion batch.
#[derive(Debug, Default, Serialize)]
pub struct IngestReport {
    pub stored: Vec<StoredImage>,
    pub failures: Vec<ImageFailure>,
}

/// Turns decoded images into stored files plus database records.
pub struct ImageIngestor {
    disk: Arc<dyn Storage>,
    store: Arc<dyn ImageStore>,
}

impl ImageIngestor {
    /// # Arguments
    ///
    /// * `disk` - Durable storage for the encoded files
    /// * `store` - Image metadata records
    pub fn new(disk: Arc<dyn Storage>, store: Arc<dyn ImageStore>) -> Self {
        Self { disk, store }
    }

    /// Store every image with a binary payload.
    ///
    /// A failure to hash, write or record one image skips that image only.
    pub fn ingest(&self, images: Vec<ImageUpload>, owner_id: i64) -> IngestReport {
        let mut report = IngestReport::default();

        for (index, upload) in images.into_iter().enumerate() {
            let Some(file) = upload.file else {
                continue;
            };

            match self.ingest_one(file, upload.copyright, upload.sort, owner_id) {
                Ok(image) => {
                    info!(image_id = image.id, path = %image.file_path, "Image created");
                    report.stored.push(image);
                }
                Err(e) => {
                    warn!(index, "Skipping image: {}", e);
                    report.failures.push(ImageFailure {
                        index,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    fn ingest_one(
        &self,
        file: SourceImage,
        copyright: Option<String>,
        sort: i64,
        owner_id: i64,
    ) -> Result<StoredImage> {
        let extension = file.extension();
        let file_path = format!(
            "{}/{}.{}",
            StorageConfig::UPLOAD_NAMESPACE,
            Uuid::new_v4().simple(),
            extension
        );

        let placeholder_hash = derive_placeholder(&file.image)?;

        let bytes = file.encode()?;
        drop(file);
        self.disk
            .put(&file_path, &bytes)
            .map_err(|e| BarbackError::ImageWrite {
                path: file_path.clone(),
                message: e.to_string(),
            })?;

        self.store.insert_image(&NewImage {
            owner_id,
            file_path,
            file_extension: extension.to_string(),
            sort,
            copyright,
            placeholder_hash,
        })
    }

    /// Change copyright and/or sort of an existing image.
    ///
    /// The stored file and placeholder hash are never touched.
    pub fn update_metadata(
        &self,
        id: ImageId,
        update: &ImageMetadataUpdate,
    ) -> Result<StoredImage> {
        let image = self
            .store
            .update_image_metadata(id, update)?
            .ok_or(BarbackError::NotFound { entity: "Image", id })?;

        info!(image_id = image.id, "Image updated");
        Ok(image)
    }
}
