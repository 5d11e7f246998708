//! Type aliases and small geometry helpers built on `ultraviolet`.

pub use ultraviolet as uv;

/// The vector type used throughout the crate, in f64 precision.
pub type Vec2 = uv::DVec2;

/// An axis-aligned rectangle with its origin at the top left corner.
///
/// This is the shape proxy for every body as well as the world bounds
/// and all spatial index regions. Coordinates grow rightward and downward.
#[cfg_attr(
    feature = "serde-types",
    derive(serde::Deserialize, serde::Serialize),
    serde(default)
)]
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[inline]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The x coordinate of the right edge.
    #[inline]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// The y coordinate of the bottom edge.
    #[inline]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[inline]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width * 0.5, self.y + self.height * 0.5)
    }

    /// Half-open overlap test. Rectangles that merely share an edge
    /// do not count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.right() > other.x
            && self.bottom() > other.y
            && self.x < other.right()
            && self.y < other.bottom()
    }
}

/// One of the two cardinal axes. Collision separation works one axis
/// at a time, so most of the resolver is generic over this.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

impl Axis {
    #[inline]
    pub fn of(self, v: Vec2) -> f64 {
        match self {
            Axis::X => v.x,
            Axis::Y => v.y,
        }
    }

    #[inline]
    pub fn of_mut(self, v: &mut Vec2) -> &mut f64 {
        match self {
            Axis::X => &mut v.x,
            Axis::Y => &mut v.y,
        }
    }

    #[inline]
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Y,
            Axis::Y => Axis::X,
        }
    }
}
