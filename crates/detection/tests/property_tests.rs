use detection::{
    ColorRange, ColorSpace, Frame, Mask, MorphOp, MorphStep, clean, convert, extract, range_mask,
};
use image::{Rgb, RgbImage};
use proptest::prelude::*;

fn frame_strategy() -> impl Strategy<Value = Frame> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<u8>(), (w * h * 3) as usize).prop_map(move |data| {
            Frame::from_raw(w, h, 3, data, ColorSpace::Rgb).unwrap()
        })
    })
}

fn mask_strategy() -> impl Strategy<Value = Mask> {
    (1u32..24, 1u32..24).prop_flat_map(|(w, h)| {
        prop::collection::vec(any::<bool>(), (w * h) as usize).prop_map(move |bits| {
            Mask::from_fn(w, h, |x, y| bits[(y * w + x) as usize])
        })
    })
}

fn step_strategy() -> impl Strategy<Value = MorphStep> {
    (prop_oneof![Just(MorphOp::Erode), Just(MorphOp::Dilate)], 1u32..7, 1u32..7, 0u32..3)
        .prop_map(|(op, w, h, iterations)| MorphStep::new(op, w, h, iterations))
}

proptest! {
    #[test]
    fn test_full_range_selects_everything(frame in frame_strategy()) {
        let range = ColorRange::new([0; 3], [255; 3]).unwrap();
        let mask = range_mask(&frame, &range);
        prop_assert_eq!(mask.dimensions(), frame.dimensions());
        prop_assert_eq!(mask.foreground_count(), (frame.width() * frame.height()) as usize);
    }

    #[test]
    fn test_range_excluding_every_pixel_selects_nothing(
        (w, h) in (1u32..24, 1u32..24),
        values in prop::collection::vec(0u8..100, 3),
    ) {
        let pixels = RgbImage::from_pixel(w, h, Rgb([values[0], values[1], values[2]]));
        let frame = Frame::new(pixels, ColorSpace::Rgb).unwrap();
        let range = ColorRange::new([100, 0, 0], [255, 255, 255]).unwrap();
        prop_assert!(range_mask(&frame, &range).is_empty());
    }

    #[test]
    fn test_mask_matches_membership(frame in frame_strategy(), low in any::<[u8; 3]>()) {
        let range = ColorRange::new(low, [255; 3]).unwrap();
        let mask = range_mask(&frame, &range);
        for y in 0..frame.height() {
            for x in 0..frame.width() {
                prop_assert_eq!(mask.is_foreground(x, y), range.contains(frame.pixel(x, y)));
            }
        }
    }

    #[test]
    fn test_cleaning_empty_mask_stays_empty(
        (w, h) in (1u32..24, 1u32..24),
        ops in prop::collection::vec(step_strategy(), 0..4),
    ) {
        let cleaned = clean(&Mask::new(w, h), &ops).unwrap();
        prop_assert!(cleaned.is_empty());
        prop_assert_eq!(cleaned.dimensions(), (w, h));
    }

    #[test]
    fn test_erode_shrinks_and_dilate_grows(mask in mask_strategy(), size in 1u32..6) {
        let eroded = clean(&mask, &[MorphStep::erode(size, 1)]).unwrap();
        let dilated = clean(&mask, &[MorphStep::dilate(size, 1)]).unwrap();
        for y in 0..mask.height() {
            for x in 0..mask.width() {
                if eroded.is_foreground(x, y) {
                    prop_assert!(mask.is_foreground(x, y));
                }
                if mask.is_foreground(x, y) {
                    prop_assert!(dilated.is_foreground(x, y));
                }
            }
        }
    }

    #[test]
    fn test_convert_is_deterministic(frame in frame_strategy()) {
        for space in [ColorSpace::Lab, ColorSpace::YCrCb, ColorSpace::Hsv, ColorSpace::Bgr] {
            let a = convert(&frame, space).unwrap();
            let b = convert(&frame, space).unwrap();
            prop_assert_eq!(a.space(), space);
            prop_assert_eq!(a.dimensions(), frame.dimensions());
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn test_background_mask_has_no_contours((w, h) in (1u32..24, 1u32..24)) {
        prop_assert!(extract(&Mask::new(w, h), 100.0, 200.0).unwrap().is_empty());
    }

    #[test]
    fn test_foreground_mask_is_one_frame_sized_region((w, h) in (2u32..24, 2u32..24)) {
        let set = extract(&Mask::from_fn(w, h, |_, _| true), 100.0, 200.0).unwrap();
        prop_assert_eq!(set.len(), 1);
        prop_assert!(!set.contours[0].is_hole);
        let bbox = set.contours[0].bounding_box();
        prop_assert_eq!((bbox.x, bbox.y, bbox.width, bbox.height), (0, 0, w, h));
    }
}
