//! Bloom image pyramid layout and ownership.
//!
//! Downsample level `k` (0..=3) is the viewport halved `k` times. Upsample
//! stage `i` (0..=2) has the size of downsample level `2 - i`, so the last
//! stage is back at full resolution.
//!
//! ```text
//! scene ─extract─▶ D0 ─▶ D1 ─▶ D2 ─▶ D3
//!                   │     │     │     │
//!                   │     │     └─▶ U0 ◀┘
//!                   │     └──────▶ U1 ◀┘
//!                   └────────────▶ U2 ◀┘
//! ```
//!
//! [`Pyramid`] is generic over the image handle so the same bookkeeping drives
//! real GPU targets and test doubles. Dropping a pyramid releases every image
//! in it at once.

/// Number of downsample levels, level 0 included.
pub const DOWNSAMPLE_LEVELS: usize = 4;

/// Number of upsample stages.
pub const UPSAMPLE_STAGES: usize = 3;

/// Size of every image in the pyramid for one viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PyramidLayout {
    width: u32,
    height: u32,
}

impl PyramidLayout {
    /// Layout for a `width`×`height` viewport. `None` for a zero-area viewport.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then_some(Self { width, height })
    }

    /// Full-resolution extent.
    pub fn extent(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Extent of downsample level `level`: the viewport shifted right by
    /// `level`, each axis clamped to at least one texel.
    pub fn downsample_extent(&self, level: usize) -> (u32, u32) {
        debug_assert!(level < DOWNSAMPLE_LEVELS);
        (
            (self.width >> level).max(1),
            (self.height >> level).max(1),
        )
    }

    /// Extent of upsample stage `stage`.
    pub fn upsample_extent(&self, stage: usize) -> (u32, u32) {
        debug_assert!(stage < UPSAMPLE_STAGES);
        self.downsample_extent(UPSAMPLE_STAGES - 1 - stage)
    }

    /// Extent of `image`.
    pub fn extent_of(&self, image: PyramidImage) -> (u32, u32) {
        match image {
            PyramidImage::Scene => self.extent(),
            PyramidImage::Downsample(level) => self.downsample_extent(level),
            PyramidImage::Upsample(stage) => self.upsample_extent(stage),
        }
    }
}

/// One image of the pyramid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PyramidImage {
    /// Full-resolution scene colour.
    Scene,
    /// Downsample level 0..=3.
    Downsample(usize),
    /// Upsample stage 0..=2.
    Upsample(usize),
}

impl PyramidImage {
    /// Low-resolution input of upsample stage `stage`.
    pub fn upsample_source(stage: usize) -> PyramidImage {
        if stage == 0 {
            PyramidImage::Downsample(DOWNSAMPLE_LEVELS - 1)
        } else {
            PyramidImage::Upsample(stage - 1)
        }
    }

    /// High-resolution detail input of upsample stage `stage`.
    pub fn upsample_detail(stage: usize) -> PyramidImage {
        PyramidImage::Downsample(UPSAMPLE_STAGES - 1 - stage)
    }

    /// Input of downsample level `level` (level 0 is the extract output).
    pub fn downsample_source(level: usize) -> PyramidImage {
        if level == 0 {
            PyramidImage::Scene
        } else {
            PyramidImage::Downsample(level - 1)
        }
    }
}

/// Every image of the pyramid for one viewport, owned together.
#[derive(Debug)]
pub struct Pyramid<T> {
    layout: PyramidLayout,
    scene: T,
    downsample: [T; DOWNSAMPLE_LEVELS],
    upsample: [T; UPSAMPLE_STAGES],
}

impl<T> Pyramid<T> {
    /// Allocate every image through `alloc`, which receives the image and its extent.
    pub fn build(layout: PyramidLayout, mut alloc: impl FnMut(PyramidImage, (u32, u32)) -> T) -> Self {
        let mut make = |image: PyramidImage| alloc(image, layout.extent_of(image));
        let scene = make(PyramidImage::Scene);
        let downsample = std::array::from_fn(|k| make(PyramidImage::Downsample(k)));
        let upsample = std::array::from_fn(|i| make(PyramidImage::Upsample(i)));
        Self {
            layout,
            scene,
            downsample,
            upsample,
        }
    }

    /// Layout the pyramid was built for.
    pub fn layout(&self) -> PyramidLayout {
        self.layout
    }

    /// Borrow one image.
    pub fn get(&self, image: PyramidImage) -> &T {
        match image {
            PyramidImage::Scene => &self.scene,
            PyramidImage::Downsample(level) => &self.downsample[level],
            PyramidImage::Upsample(stage) => &self.upsample[stage],
        }
    }

    /// Full-resolution scene image.
    pub fn scene(&self) -> &T {
        &self.scene
    }

    /// Final upsample output, the bloom result at full resolution.
    pub fn output(&self) -> &T {
        &self.upsample[UPSAMPLE_STAGES - 1]
    }

    /// Number of images held.
    pub fn len(&self) -> usize {
        1 + DOWNSAMPLE_LEVELS + UPSAMPLE_STAGES
    }

    /// Always false; a pyramid is never empty.
    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Replace the resources in `slot` with a set built for `width`×`height`.
///
/// The old set is dropped before the new one is built, so at most one set is
/// alive at a time. A zero-area size leaves the slot empty. Returns whether a
/// new set was built.
pub fn rebuild<T>(
    slot: &mut Option<T>,
    width: u32,
    height: u32,
    build: impl FnOnce(PyramidLayout) -> T,
) -> bool {
    *slot = None;
    match PyramidLayout::new(width, height) {
        Some(layout) => {
            *slot = Some(build(layout));
            true
        }
        None => false,
    }
}
