use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
};

use image::ImageFormat;
use tracing::debug;

use crate::{error::Result, traits::FrameSource, types::Frame};

/// Whether `path` has an extension of a format the `image` crate can decode.
pub fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(ImageFormat::from_extension)
        .is_some_and(|format| format.reading_enabled())
}

/// Frames decoded from image files, in order.
#[derive(Debug, Clone, Default)]
pub struct ImageFileSource {
    paths: VecDeque<PathBuf>,
}

impl ImageFileSource {
    pub fn new<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self { paths: paths.into_iter().map(Into::into).collect() }
    }

    /// Every decodable image directly inside `dir`, sorted by file name.
    pub fn from_dir<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            if path.is_file() && is_image_file(&path) {
                paths.push(path);
            }
        }
        paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(dir = %dir.as_ref().display(), frames = paths.len(), "image directory");
        Ok(Self::new(paths))
    }

    /// Paths not yet read.
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }

    /// Path of the frame the next call to `next_frame` yields.
    pub fn peek_path(&self) -> Option<&Path> {
        self.paths.front().map(PathBuf::as_path)
    }

    /// Paths not yet read, in the order they will be yielded.
    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }
}

impl FrameSource for ImageFileSource {
    fn next_frame(&mut self) -> Option<Result<Frame>> {
        let path = self.paths.pop_front()?;
        Some(Frame::open(&path))
    }
}

impl Iterator for ImageFileSource {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_frame()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    #[test]
    fn reads_directory_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, shade) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbImage::from_pixel(4, 3, Rgb([shade, shade, shade]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let mut source = ImageFileSource::from_dir(dir.path()).unwrap();
        assert_eq!(source.remaining(), 3);
        assert_eq!(source.peek_path().unwrap().file_name().unwrap(), "a.png");

        let shades: Vec<u8> = std::iter::from_fn(|| source.next_frame())
            .map(|frame| frame.unwrap().pixel(0, 0)[0])
            .collect();
        assert_eq!(shades, vec![10, 20, 30]);
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn undecodable_file_yields_an_error_and_continues() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.png");
        std::fs::write(&bad, b"definitely not png").unwrap();
        let good = dir.path().join("good.png");
        RgbImage::new(2, 2).save(&good).unwrap();

        let mut source = ImageFileSource::new([bad, good]);
        assert!(source.next_frame().unwrap().is_err());
        assert!(source.next_frame().unwrap().is_ok());
        assert!(source.next_frame().is_none());
    }

    #[test]
    fn image_extensions() {
        assert!(is_image_file(Path::new("frame.PNG")));
        assert!(is_image_file(Path::new("frame.jpg")));
        assert!(!is_image_file(Path::new("frame.toml")));
        assert!(!is_image_file(Path::new("frame")));
    }
}
