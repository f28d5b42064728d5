//! Image attachments.
//!
//! [`inspect_image`] validates a file before anything is written. The
//! [`AttachmentStore`] trait copies validated files into place and removes them
//! again; [`MediaDir`] is the filesystem implementation used by the CLI.

use crate::error::{Result, TwtError};
use image::{ImageFormat, ImageReader};
use ring::digest::{self, SHA256};
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Largest accepted attachment in bytes.
pub const MAX_IMAGE_SIZE: u64 = 5 * 1024 * 1024;

/// Most attachments a single post may carry.
pub const MAX_IMAGES_PER_POST: usize = 4;

/// A validated image ready to be attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInfo {
    pub source: PathBuf,
    pub mime_type: &'static str,
    pub extension: &'static str,
    pub width: u32,
    pub height: u32,
    pub size: u64,
}

/// Where an attachment ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredAttachment {
    pub file_path: PathBuf,
    pub file_name: String,
}

/// Check that `path` is a non-empty JPEG, PNG or GIF of at most
/// [`MAX_IMAGE_SIZE`] bytes whose header decodes.
///
/// # Errors
///
/// Returns [`TwtError::InvalidAttachment`] describing the first failed check.
pub fn inspect_image(path: &Path) -> Result<ImageInfo> {
    let invalid = |reason: String| TwtError::invalid_attachment(path, reason);

    let meta = fs::metadata(path).map_err(|e| invalid(format!("cannot read file: {e}")))?;
    if !meta.is_file() {
        return Err(invalid("not a regular file".into()));
    }
    let size = meta.len();
    if size == 0 {
        return Err(invalid("file is empty".into()));
    }
    if size > MAX_IMAGE_SIZE {
        return Err(invalid(format!(
            "file is {size} bytes, the limit is {MAX_IMAGE_SIZE}"
        )));
    }

    let bytes = fs::read(path).map_err(|e| invalid(format!("cannot read file: {e}")))?;
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| invalid(format!("cannot read file: {e}")))?;

    let (mime_type, extension) = match reader.format() {
        Some(ImageFormat::Jpeg) => ("image/jpeg", "jpg"),
        Some(ImageFormat::Png) => ("image/png", "png"),
        Some(ImageFormat::Gif) => ("image/gif", "gif"),
        Some(other) => {
            return Err(invalid(format!(
                "unsupported image format {other:?} (only JPEG, PNG, GIF allowed)"
            )));
        }
        None => return Err(invalid("not a valid image file".into())),
    };

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| invalid(format!("not a valid image file: {e}")))?;

    debug!(path = %path.display(), mime_type, width, height, "Inspected image");
    Ok(ImageInfo {
        source: path.to_path_buf(),
        mime_type,
        extension,
        width,
        height,
        size,
    })
}

/// Copies attachments into durable storage and deletes them.
pub trait AttachmentStore {
    /// Store `image` as attachment `position` of `post_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be copied.
    fn store(&self, image: &ImageInfo, post_id: &str, position: u8) -> Result<StoredAttachment>;

    /// Delete a previously stored attachment. Missing files are not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if `path` is outside the store or cannot be removed.
    fn remove(&self, path: &Path) -> Result<()>;
}

/// Attachment store backed by a single directory.
///
/// Files are named `<post_id>_<position>_<sha256 prefix>.<ext>`.
#[derive(Debug, Clone)]
pub struct MediaDir {
    root: PathBuf,
}

impl MediaDir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn contains(&self, path: &Path) -> bool {
        let Ok(root) = self.root.canonicalize() else {
            return false;
        };
        path.parent()
            .and_then(|parent| parent.canonicalize().ok())
            .is_some_and(|parent| parent == root)
    }
}

impl AttachmentStore for MediaDir {
    fn store(&self, image: &ImageInfo, post_id: &str, position: u8) -> Result<StoredAttachment> {
        fs::create_dir_all(&self.root)
            .map_err(|e| TwtError::path_error("create", &self.root, e))?;

        let bytes =
            fs::read(&image.source).map_err(|e| TwtError::path_error("read", &image.source, e))?;
        let hash = digest::digest(&SHA256, &bytes);
        let file_name = format!(
            "{post_id}_{position}_{}.{}",
            hex_prefix(hash.as_ref(), 4),
            image.extension
        );
        let file_path = self.root.join(&file_name);

        fs::write(&file_path, &bytes).map_err(|e| TwtError::path_error("write", &file_path, e))?;
        info!(path = %file_path.display(), "Stored attachment");

        Ok(StoredAttachment {
            file_path,
            file_name,
        })
    }

    fn remove(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        if !self.contains(path) {
            return Err(TwtError::forbidden(format!(
                "'{}' is not in the media directory",
                path.display()
            )));
        }
        fs::remove_file(path).map_err(|e| TwtError::path_error("remove", path, e))?;
        debug!(path = %path.display(), "Removed attachment");
        Ok(())
    }
}

fn hex_prefix(bytes: &[u8], len: usize) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(len * 2);
    for byte in bytes.iter().take(len) {
        let _ = write!(&mut out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    pub(crate) fn write_png(path: &Path, width: u32, height: u32) {
        use image::{ImageBuffer, Rgb};

        let img: ImageBuffer<Rgb<u8>, Vec<u8>> = ImageBuffer::new(width, height);
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        fs::write(path, bytes).unwrap();
    }

    #[test]
    fn inspect_accepts_png() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("pic.png");
        write_png(&path, 4, 3);

        let info = inspect_image(&path).unwrap();
        assert_eq!(info.mime_type, "image/png");
        assert_eq!(info.extension, "png");
        assert_eq!((info.width, info.height), (4, 3));
        assert!(info.size > 0);
    }

    #[test]
    fn inspect_rejects_missing_empty_and_garbage() {
        let dir = TempDir::new().unwrap();

        let missing = dir.path().join("nope.png");
        assert!(matches!(
            inspect_image(&missing),
            Err(TwtError::InvalidAttachment { .. })
        ));

        let empty = dir.path().join("empty.png");
        fs::write(&empty, b"").unwrap();
        let err = inspect_image(&empty).unwrap_err();
        assert!(err.to_string().contains("empty"));

        let garbage = dir.path().join("notes.png");
        fs::write(&garbage, b"definitely not an image").unwrap();
        assert!(matches!(
            inspect_image(&garbage),
            Err(TwtError::InvalidAttachment { .. })
        ));
    }

    #[test]
    fn inspect_rejects_oversized_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("huge.png");
        let file = fs::File::create(&path).unwrap();
        file.set_len(MAX_IMAGE_SIZE + 1).unwrap();

        let err = inspect_image(&path).unwrap_err();
        assert!(err.to_string().contains("limit"));
    }

    #[test]
    fn store_names_file_after_post_position_and_hash() {
        let src_dir = TempDir::new().unwrap();
        let media_dir = TempDir::new().unwrap();
        let path = src_dir.path().join("pic.png");
        write_png(&path, 2, 2);
        let info = inspect_image(&path).unwrap();

        let store = MediaDir::new(media_dir.path().join("media"));
        let stored = store.store(&info, "01POST", 2).unwrap();

        assert!(stored.file_name.starts_with("01POST_2_"));
        assert!(
            std::path::Path::new(&stored.file_name)
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
        );
        // 01POST_2_ + 8 hex chars + .png
        assert_eq!(stored.file_name.len(), "01POST_2_".len() + 8 + 4);
        assert_eq!(fs::read(&stored.file_path).unwrap(), fs::read(&path).unwrap());
    }

    #[test]
    fn remove_only_inside_media_dir() {
        let media_dir = TempDir::new().unwrap();
        let outside_dir = TempDir::new().unwrap();
        let store = MediaDir::new(media_dir.path());

        let outside = outside_dir.path().join("keep.png");
        write_png(&outside, 1, 1);
        assert!(matches!(
            store.remove(&outside),
            Err(TwtError::Forbidden { .. })
        ));
        assert!(outside.exists());

        let inside = media_dir.path().join("gone.png");
        write_png(&inside, 1, 1);
        store.remove(&inside).unwrap();
        assert!(!inside.exists());

        // Already gone is fine.
        store.remove(&inside).unwrap();
    }
}
