//! Integration tests for bloom pyramid sizing and resize handling.
//!
//! The GPU compositor builds its textures through [`Pyramid::build`] and
//! replaces them through [`rebuild`]; here the "textures" are counted handles
//! so leaks show up as a non-zero live count.

use std::cell::Cell;
use std::rc::Rc;

use particle_bloom::pyramid::{rebuild, DOWNSAMPLE_LEVELS, UPSAMPLE_STAGES};
use particle_bloom::{Pyramid, PyramidImage, PyramidLayout};

// ============================================================================
// Sizing
// ============================================================================

#[test]
fn test_downsample_levels_halve() {
    for (w, h) in [(800, 600), (1920, 1080), (1023, 767), (17, 9)] {
        let layout = PyramidLayout::new(w, h).unwrap();
        for k in 0..DOWNSAMPLE_LEVELS {
            assert_eq!(layout.downsample_extent(k), ((w >> k).max(1), (h >> k).max(1)));
        }
    }
}

#[test]
fn test_upsample_stages_mirror_downsample() {
    let layout = PyramidLayout::new(1023, 767).unwrap();
    for i in 0..UPSAMPLE_STAGES {
        assert_eq!(layout.upsample_extent(i), layout.downsample_extent(2 - i));
    }
    assert_eq!(layout.upsample_extent(2), (1023, 767));
    assert_eq!(layout.upsample_extent(0), (255, 191));
}

#[test]
fn test_upsample_inputs_match_output_size() {
    let layout = PyramidLayout::new(800, 600).unwrap();
    for i in 0..UPSAMPLE_STAGES {
        let out = layout.extent_of(PyramidImage::Upsample(i));
        let detail = layout.extent_of(PyramidImage::upsample_detail(i));
        assert_eq!(out, detail, "stage {i}");

        let source = layout.extent_of(PyramidImage::upsample_source(i));
        assert!(source.0 <= out.0 && source.1 <= out.1);
    }
}

#[test]
fn test_pyramid_holds_every_image() {
    let layout = PyramidLayout::new(640, 480).unwrap();
    let pyramid = Pyramid::build(layout, |image, extent| (image, extent));

    assert_eq!(pyramid.len(), 1 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES);
    assert_eq!(*pyramid.scene(), (PyramidImage::Scene, (640, 480)));
    assert_eq!(*pyramid.output(), (PyramidImage::Upsample(2), (640, 480)));
    assert_eq!(
        *pyramid.get(PyramidImage::Downsample(3)),
        (PyramidImage::Downsample(3), (80, 60))
    );
}

// ============================================================================
// Resize
// ============================================================================

/// Stand-in for a GPU texture that tracks how many are alive.
struct Handle {
    live: Rc<Cell<usize>>,
    extent: (u32, u32),
}

impl Handle {
    fn new(live: &Rc<Cell<usize>>, extent: (u32, u32)) -> Self {
        live.set(live.get() + 1);
        Self {
            live: live.clone(),
            extent,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        self.live.set(self.live.get() - 1);
    }
}

fn resize(slot: &mut Option<Pyramid<Handle>>, live: &Rc<Cell<usize>>, w: u32, h: u32) -> bool {
    rebuild(slot, w, h, |layout| {
        Pyramid::build(layout, |_, extent| Handle::new(live, extent))
    })
}

#[test]
fn test_repeated_resize_leaves_one_set() {
    let live = Rc::new(Cell::new(0));
    let mut slot = None;

    for (w, h) in [(800, 600), (1024, 768), (0, 0), (300, 0), (1280, 720), (1280, 720)] {
        resize(&mut slot, &live, w, h);
    }

    let pyramid = slot.as_ref().unwrap();
    assert_eq!(live.get(), pyramid.len());
    assert_eq!(pyramid.layout().extent(), (1280, 720));
    assert_eq!(pyramid.scene().extent, (1280, 720));
    assert_eq!(pyramid.get(PyramidImage::Downsample(2)).extent, (320, 180));
}

#[test]
fn test_zero_area_releases_everything() {
    let live = Rc::new(Cell::new(0));
    let mut slot = None;

    assert!(resize(&mut slot, &live, 800, 600));
    assert!(!resize(&mut slot, &live, 0, 600));
    assert!(slot.is_none());
    assert_eq!(live.get(), 0);

    assert!(resize(&mut slot, &live, 800, 600));
    assert_eq!(live.get(), 1 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES);
}

#[test]
fn test_old_set_dropped_before_new_built() {
    let live = Rc::new(Cell::new(0));
    let mut slot = None;
    resize(&mut slot, &live, 800, 600);

    let peak = Rc::new(Cell::new(0));
    rebuild(&mut slot, 400, 300, |layout| {
        Pyramid::build(layout, |_, extent| {
            let handle = Handle::new(&live, extent);
            peak.set(peak.get().max(live.get()));
            handle
        })
    });

    assert_eq!(peak.get(), 1 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES);
}
