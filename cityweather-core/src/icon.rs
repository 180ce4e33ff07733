//! Weather-condition icon download and decoding.

use async_trait::async_trait;
use image::RgbaImage;
use reqwest::{Client, Url};
use std::{fmt::Debug, path::Path, sync::Arc};
use tracing::{debug, instrument};

use crate::{Config, error::ImageError};

/// Decoded RGBA pixels of one icon.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pixels: RgbaImage,
}

impl ImageBuffer {
    /// Decode `bytes` in any supported format (PNG, JPEG, GIF, WebP).
    pub fn decode(bytes: &[u8]) -> Result<Self, ImageError> {
        let decoded =
            image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;

        Ok(Self { pixels: decoded.into_rgba8() })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Write the icon to `path`; the format follows the file extension.
    pub fn save(&self, path: &Path) -> Result<(), ImageError> {
        self.pixels.save(path).map_err(|e| ImageError::Encode(e.to_string()))
    }
}

impl From<RgbaImage> for ImageBuffer {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}

#[async_trait]
pub trait ImageFetcher: Send + Sync + Debug {
    async fn fetch_image(&self, url: &str) -> Result<ImageBuffer, ImageError>;
}

#[derive(Debug, Clone, Default)]
pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(http: Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    #[instrument(skip(self))]
    async fn fetch_image(&self, url: &str) -> Result<ImageBuffer, ImageError> {
        let url = Url::parse(url).map_err(|_| ImageError::InvalidUrl(url.to_string()))?;

        let res = self.http.get(url).send().await?;

        let status = res.status();
        if !status.is_success() {
            return Err(ImageError::Status(status.as_u16()));
        }

        let bytes = res.bytes().await?;
        debug!(len = bytes.len(), "Downloaded icon");

        ImageBuffer::decode(&bytes)
    }
}

pub fn fetcher_from_config(config: &Config) -> anyhow::Result<Arc<dyn ImageFetcher>> {
    Ok(Arc::new(HttpImageFetcher::new(config.http_client()?)))
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    use image::{DynamicImage, ImageFormat, Rgba};
    use std::io::Cursor;

    let img = RgbaImage::from_pixel(width, height, Rgba([30, 144, 255, 255]));
    let mut bytes = Vec::new();
    DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("encode png");
    bytes
}
