//! Page image discovery
//!
//! Pages are rendered externally into a directory as `page_1.png`,
//! `page_2.png`, ... Discovery walks the ordinals from 1 and stops at the
//! first gap, so the resulting set is always contiguous.

use std::path::{Path, PathBuf};

use crate::error::{OcrError, Result};

/// File name prefix of rendered pages
pub const PAGE_FILE_PREFIX: &str = "page_";

/// File extension of rendered pages
pub const PAGE_FILE_EXTENSION: &str = "png";

/// One rendered page on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// 1-based ordinal
    pub index: usize,
    pub path: PathBuf,
}

/// Pixel dimensions of a page image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageDimensions {
    pub width: u32,
    pub height: u32,
}

impl PageImage {
    /// Read the pixel dimensions from the image header.
    ///
    /// Fails for missing or malformed images.
    pub fn dimensions(&self) -> Result<PageDimensions> {
        let (width, height) = image::image_dimensions(&self.path)?;
        Ok(PageDimensions { width, height })
    }
}

/// Path of the page with the given 1-based ordinal
pub fn page_path(dir: &Path, index: usize) -> PathBuf {
    dir.join(format!("{}{}.{}", PAGE_FILE_PREFIX, index, PAGE_FILE_EXTENSION))
}

/// Ordered, contiguous set of page images
#[derive(Debug, Clone)]
pub struct PageImageSet {
    dir: PathBuf,
    pages: Vec<PageImage>,
}

impl PageImageSet {
    /// Discover `page_N.png` files in `dir`, starting at 1.
    ///
    /// Returns `NoPages` when `page_1.png` is absent.
    pub fn discover(dir: &Path) -> Result<Self> {
        if !dir.is_dir() {
            return Err(OcrError::DirectoryNotFound(dir.to_path_buf()));
        }

        let mut pages = Vec::new();
        let mut index = 1;
        loop {
            let path = page_path(dir, index);
            if !path.is_file() {
                break;
            }
            pages.push(PageImage { index, path });
            index += 1;
        }

        if pages.is_empty() {
            return Err(OcrError::NoPages(dir.to_path_buf()));
        }

        tracing::debug!("Discovered {} page(s) in {}", pages.len(), dir.display());
        Ok(Self {
            dir: dir.to_path_buf(),
            pages,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }

    /// Always at least one
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(path: &Path, width: u32, height: u32) {
        image::RgbImage::new(width, height).save(path).unwrap();
    }

    #[test]
    fn test_discovery_is_ordered_and_contiguous() {
        let dir = TempDir::new().unwrap();
        write_png(&page_path(dir.path(), 1), 4, 4);
        write_png(&page_path(dir.path(), 2), 4, 4);
        // Gap at 3: page 4 must not be picked up
        write_png(&page_path(dir.path(), 4), 4, 4);

        let set = PageImageSet::discover(dir.path()).unwrap();
        let indices: Vec<usize> = set.pages().iter().map(|p| p.index).collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(set.page_count(), 2);
        assert_eq!(set.dir(), dir.path());
        assert!(set.pages()[1].path.ends_with("page_2.png"));
    }

    #[test]
    fn test_empty_directory_has_no_pages() {
        let dir = TempDir::new().unwrap();
        let err = PageImageSet::discover(dir.path()).unwrap_err();
        assert!(matches!(err, OcrError::NoPages(_)));
    }

    #[test]
    fn test_missing_first_page() {
        let dir = TempDir::new().unwrap();
        write_png(&page_path(dir.path(), 2), 4, 4);
        assert!(matches!(
            PageImageSet::discover(dir.path()),
            Err(OcrError::NoPages(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(matches!(
            PageImageSet::discover(&missing),
            Err(OcrError::DirectoryNotFound(_))
        ));
    }

    #[test]
    fn test_dimensions() {
        let dir = TempDir::new().unwrap();
        write_png(&page_path(dir.path(), 1), 12, 7);
        let set = PageImageSet::discover(dir.path()).unwrap();
        assert_eq!(
            set.pages()[0].dimensions().unwrap(),
            PageDimensions { width: 12, height: 7 }
        );
    }

    #[test]
    fn test_malformed_image_dimensions_fail() {
        let dir = TempDir::new().unwrap();
        std::fs::write(page_path(dir.path(), 1), b"not a png").unwrap();
        let set = PageImageSet::discover(dir.path()).unwrap();
        assert!(set.pages()[0].dimensions().is_err());
    }
}
