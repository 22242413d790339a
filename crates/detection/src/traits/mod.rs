use image::Rgb;
use crate::{error::Result, types::{Contour, Frame}};

/// Producer of raster frames, e.g. a camera or a directory of images
pub trait FrameSource {
    /// Next frame, or `None` at end of stream
    fn next_frame(&mut self) -> Option<Result<Frame>>;
}

/// Strategy choosing the display color of each rendered contour
pub trait ColorAssigner {
    fn color_for(&mut self, index: usize, contour: &Contour) -> Rgb<u8>;
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Option<Result<Frame>> {
        (**self).next_frame()
    }
}
