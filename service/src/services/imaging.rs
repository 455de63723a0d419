// imgflow-service/src/services/imaging.rs

//! Filesystem-backed image collaborators. Buckets map to directories under a configured root.

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use image::{ColorType, DynamicImage, ImageFormat};
use imgflow::stages::{
  ImageMetadata, ImageRef, MetadataExtractor, RenderedThumbnail, ThumbnailFormat, ThumbnailPlan, ThumbnailRenderer,
};
use std::path::{Component, Path, PathBuf};

/// Reads originals from `source_root` and writes thumbnails under `thumbnails_root`.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
  source_root: PathBuf,
  thumbnails_root: PathBuf,
}

impl LocalImageStore {
  pub fn new(source_root: impl Into<PathBuf>, thumbnails_root: impl Into<PathBuf>) -> Self {
    Self {
      source_root: source_root.into(),
      thumbnails_root: thumbnails_root.into(),
    }
  }

  async fn read_source(&self, source: &ImageRef) -> Result<Vec<u8>> {
    let path = object_path(&self.source_root, &source.bucket, &source.key)?;
    tokio::fs::read(&path)
      .await
      .with_context(|| format!("failed to read source image {}", path.display()))
  }
}

/// Joins bucket and key under `root`, refusing anything that would leave it.
fn object_path(root: &Path, bucket: &str, key: &str) -> Result<PathBuf> {
  let mut path = root.to_path_buf();
  for part in [bucket, key] {
    for component in Path::new(part).components() {
      match component {
        Component::Normal(segment) => path.push(segment),
        Component::CurDir => {}
        _ => bail!("object location '{}/{}' escapes the storage root", bucket, key),
      }
    }
  }
  Ok(path)
}

fn decode(bytes: &[u8]) -> Result<(ImageFormat, DynamicImage)> {
  let format = image::guess_format(bytes).context("cannot identify image file")?;
  let img = image::load_from_memory_with_format(bytes, format).context("failed to decode image")?;
  Ok((format, img))
}

fn format_name(format: ImageFormat) -> String {
  format!("{:?}", format).to_ascii_uppercase()
}

fn mode_name(color: ColorType) -> String {
  match color {
    ColorType::L8 => "L".to_string(),
    ColorType::La8 => "LA".to_string(),
    ColorType::Rgb8 => "RGB".to_string(),
    ColorType::Rgba8 => "RGBA".to_string(),
    ColorType::L16 => "I;16".to_string(),
    other => format!("{:?}", other).to_ascii_uppercase(),
  }
}

fn encoder_for(format: ThumbnailFormat) -> Result<ImageFormat> {
  ImageFormat::from_mime_type(format.mime_type())
    .ok_or_else(|| anyhow!("no image encoder for {}", format.mime_type()))
}

fn render_blocking(bytes: Vec<u8>, plan: ThumbnailPlan, thumbnails_root: PathBuf) -> Result<Vec<RenderedThumbnail>> {
  let (source_format, img) = decode(&bytes)?;
  let format = ThumbnailFormat::for_source(&format_name(source_format));
  if format == ThumbnailFormat::Jpeg && source_format != ImageFormat::Jpeg {
    tracing::warn!(source = %plan.source, format = ?source_format, "Source format is not web friendly; writing JPEG thumbnails.");
  }

  let mut rendered = Vec::with_capacity(plan.sizes.len());
  for &size in &plan.sizes {
    // Images already within bounds are kept at their size.
    let thumb = if img.width() <= size.width && img.height() <= size.height {
      img.clone()
    } else {
      img.thumbnail(size.width, size.height)
    };
    let key = plan.target_key(size, format);
    let path = object_path(&thumbnails_root, &plan.target_bucket, &key)?;
    let parent = path
      .parent()
      .ok_or_else(|| anyhow!("failed to determine parent directory of {}", path.display()))?;
    std::fs::create_dir_all(parent).with_context(|| format!("failed to create directory tree {}", parent.display()))?;

    let encoder = encoder_for(format)?;
    let saved = match format {
      ThumbnailFormat::Jpeg => DynamicImage::ImageRgb8(thumb.to_rgb8()).save_with_format(&path, encoder),
      ThumbnailFormat::Png => thumb.save_with_format(&path, encoder),
    };
    saved.with_context(|| format!("failed to save {} thumbnail to {}", size, path.display()))?;
    tracing::debug!(size = %size, mime = format.mime_type(), path = %path.display(), "Thumbnail saved.");
    rendered.push(RenderedThumbnail { size, key });
  }
  Ok(rendered)
}

#[async_trait]
impl ThumbnailRenderer for LocalImageStore {
  async fn render(&self, plan: &ThumbnailPlan) -> Result<Vec<RenderedThumbnail>> {
    let bytes = self.read_source(&plan.source).await?;
    let plan = plan.clone();
    let root = self.thumbnails_root.clone();
    tokio::task::spawn_blocking(move || render_blocking(bytes, plan, root))
      .await
      .context("thumbnail task did not complete")?
  }
}

#[async_trait]
impl MetadataExtractor for LocalImageStore {
  async fn extract(&self, source: &ImageRef) -> Result<ImageMetadata> {
    let bytes = self.read_source(source).await?;
    let filename = source.file_name().to_string();
    tokio::task::spawn_blocking(move || -> Result<ImageMetadata> {
      let (format, img) = decode(&bytes)?;
      Ok(ImageMetadata {
        filename,
        filesize_bytes: bytes.len() as u64,
        format: format_name(format),
        width_pixels: img.width(),
        height_pixels: img.height(),
        mode: mode_name(img.color()),
      })
    })
    .await
    .context("metadata task did not complete")?
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{Rgb, RgbImage};
  use imgflow::ThumbnailSize;

  fn write_png(root: &Path, bucket: &str, key: &str, width: u32, height: u32) {
    let path = root.join(bucket).join(key);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    RgbImage::from_pixel(width, height, Rgb([200, 10, 10]))
      .save_with_format(&path, ImageFormat::Png)
      .unwrap();
  }

  #[test]
  fn object_paths_stay_under_root() {
    let root = Path::new("/srv/data");
    assert_eq!(
      object_path(root, "uploads", "a/./b.jpg").unwrap(),
      PathBuf::from("/srv/data/uploads/a/b.jpg")
    );
    assert!(object_path(root, "uploads", "../../etc/passwd").is_err());
    assert!(object_path(root, "uploads", "/etc/passwd").is_err());
  }

  #[test]
  fn thumbnail_formats_resolve_to_encoders() {
    assert_eq!(encoder_for(ThumbnailFormat::Jpeg).unwrap(), ImageFormat::Jpeg);
    assert_eq!(encoder_for(ThumbnailFormat::Png).unwrap(), ImageFormat::Png);
  }

  #[tokio::test]
  async fn renders_and_describes_png_source() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalImageStore::new(dir.path().join("in"), dir.path().join("out"));
    write_png(&dir.path().join("in"), "uploads", "pics/wide.png", 400, 200);

    let plan = ThumbnailPlan {
      source: ImageRef::new("uploads", "pics/wide.png"),
      target_bucket: "thumbs".into(),
      sizes: vec![ThumbnailSize::new(100, 100), ThumbnailSize::new(800, 800)],
    };
    let rendered = store.render(&plan).await.unwrap();
    assert_eq!(rendered[0].key, "thumbnails/wide_100x100.png");

    let small = image::open(dir.path().join("out/thumbs/thumbnails/wide_100x100.png")).unwrap();
    assert_eq!((small.width(), small.height()), (100, 50));
    let kept = image::open(dir.path().join("out/thumbs/thumbnails/wide_800x800.png")).unwrap();
    assert_eq!((kept.width(), kept.height()), (400, 200));

    let metadata = store.extract(&plan.source).await.unwrap();
    assert_eq!(metadata.format, "PNG");
    assert_eq!(metadata.mode, "RGB");
    assert_eq!((metadata.width_pixels, metadata.height_pixels), (400, 200));
    assert_eq!(metadata.filename, "wide.png");
  }

  #[tokio::test]
  async fn non_image_bytes_fail_to_decode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("uploads/notes.jpg");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, b"definitely not an image").unwrap();

    let store = LocalImageStore::new(dir.path(), dir.path().join("out"));
    let err = store.extract(&ImageRef::new("uploads", "notes.jpg")).await.unwrap_err();
    assert!(format!("{:#}", err).contains("cannot identify image file"));
  }
}
