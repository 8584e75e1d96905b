//! Encoded image containers and file I/O.

use std::fs;
use std::io;
use std::path::Path;

use crate::error::{Error, Result};

const JPEG_MAGIC: [u8; 3] = [0xFF, 0xD8, 0xFF];
const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Container format, decided from leading magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Unknown,
}

impl ImageKind {
    /// Sniff the container format of `bytes`.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(&JPEG_MAGIC) {
            ImageKind::Jpeg
        } else if bytes.starts_with(&PNG_SIGNATURE) {
            ImageKind::Png
        } else {
            ImageKind::Unknown
        }
    }
}

/// An immutable encoded image: raw container bytes tagged with their kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    kind: ImageKind,
    bytes: Vec<u8>,
}

impl EncodedImage {
    /// Wrap `bytes`, sniffing the container format.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            kind: ImageKind::detect(&bytes),
            bytes,
        }
    }

    /// Copy `bytes` into a new image.
    pub fn from_slice(bytes: &[u8]) -> Self {
        Self::new(bytes.to_vec())
    }

    #[inline]
    pub fn kind(&self) -> ImageKind {
        self.kind
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the bytes to `path`. Same as [`write_file`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        write_file(path, self)
    }
}

impl AsRef<[u8]> for EncodedImage {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

/// Read an image file into memory.
///
/// # Errors
/// [`Error::Io`] if the file is missing, unreadable, or empty.
pub fn read_file(path: impl AsRef<Path>) -> Result<EncodedImage> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    if bytes.is_empty() {
        return Err(Error::io(
            path,
            io::Error::new(io::ErrorKind::UnexpectedEof, "file is empty"),
        ));
    }
    Ok(EncodedImage::new(bytes))
}

/// Write `image` to `path`, replacing any existing file.
pub fn write_file(path: impl AsRef<Path>, image: &EncodedImage) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, image.as_bytes()).map_err(|e| Error::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("perceptual-jpeg-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_detect_kinds() {
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), ImageKind::Jpeg);
        assert_eq!(ImageKind::detect(&PNG_SIGNATURE), ImageKind::Png);
        assert_eq!(ImageKind::detect(b"GIF89a"), ImageKind::Unknown);
        assert_eq!(ImageKind::detect(&[]), ImageKind::Unknown);
        // Truncated SOI is not enough
        assert_eq!(ImageKind::detect(&[0xFF, 0xD8]), ImageKind::Unknown);
    }

    #[test]
    fn test_encoded_image_accessors() {
        let image = EncodedImage::from_slice(&[0xFF, 0xD8, 0xFF, 0xD9]);
        assert_eq!(image.kind(), ImageKind::Jpeg);
        assert_eq!(image.len(), 4);
        assert!(!image.is_empty());
        assert_eq!(image.clone().into_bytes(), image.as_bytes());
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file(temp_path("does-not-exist.jpg")).unwrap_err();
        match err {
            Error::Io { source, .. } => assert_eq!(source.kind(), io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_read_empty_file() {
        let path = temp_path("empty.jpg");
        fs::write(&path, []).unwrap();
        let err = read_file(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        match err {
            Error::Io { source, .. } => {
                assert_eq!(source.kind(), io::ErrorKind::UnexpectedEof)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_save_then_read() {
        let path = temp_path("roundtrip.png");
        let image = EncodedImage::from_slice(&PNG_SIGNATURE);
        image.save(&path).unwrap();
        let back = read_file(&path).unwrap();
        fs::remove_file(&path).unwrap();
        assert_eq!(back, image);
        assert_eq!(back.kind(), ImageKind::Png);
    }

    #[test]
    fn test_write_into_missing_directory() {
        let path = temp_path("no-such-dir").join("out.jpg");
        let image = EncodedImage::from_slice(&[1, 2, 3]);
        assert!(matches!(write_file(&path, &image), Err(Error::Io { .. })));
    }
}
