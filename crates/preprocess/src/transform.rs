//! Geometric mapping between model-input pixels and source-image pixels.

use common::span_debug;

/// A 2D affine map `(x, y) -> (a*x + b*y + tx, c*x + d*y + ty)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AffineTransform {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub tx: f32,
    pub ty: f32,
}

impl AffineTransform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    pub fn scale(sx: f32, sy: f32) -> Self {
        Self {
            a: sx,
            d: sy,
            ..Self::IDENTITY
        }
    }

    /// Counter-clockwise in a y-up frame, clockwise on screen (y-down).
    pub fn rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self {
            a: cos,
            b: -sin,
            c: sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// `other ∘ self`: apply `self` first, then `other`.
    pub fn then(&self, other: &Self) -> Self {
        Self {
            a: other.a * self.a + other.b * self.c,
            b: other.a * self.b + other.b * self.d,
            c: other.c * self.a + other.d * self.c,
            d: other.c * self.b + other.d * self.d,
            tx: other.a * self.tx + other.b * self.ty + other.tx,
            ty: other.c * self.tx + other.d * self.ty + other.ty,
        }
    }

    /// `None` when the linear part is singular.
    pub fn invert(&self) -> Option<Self> {
        let det = self.a * self.d - self.b * self.c;
        if det == 0.0 || !det.is_finite() {
            return None;
        }
        let inv = 1.0 / det;
        let a = self.d * inv;
        let b = -self.b * inv;
        let c = -self.c * inv;
        let d = self.a * inv;
        Some(Self {
            a,
            b,
            c,
            d,
            tx: -(a * self.tx + b * self.ty),
            ty: -(c * self.tx + d * self.ty),
        })
    }

    #[inline]
    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.b * y + self.tx,
            self.c * x + self.d * y + self.ty,
        )
    }
}

impl Default for AffineTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Build the destination-to-source sampling transform.
///
/// The forward scale (source extents onto destination extents) is composed
/// first, then inverted so the resampler can walk the destination grid, and
/// finally post-rotated about the origin by `rotation_degrees`.
///
/// With `maintain_aspect_ratio` a single uniform factor
/// `max(dst_w / src_w, dst_h / src_h)` is used, which crops instead of
/// letterboxing. Otherwise each axis is stretched independently.
///
/// All four dimensions must be positive.
pub fn build_transform(
    src_w: u32,
    src_h: u32,
    dst_w: u32,
    dst_h: u32,
    maintain_aspect_ratio: bool,
    rotation_degrees: i32,
) -> AffineTransform {
    let _s = span_debug!("build_transform");

    debug_assert!(
        src_w > 0 && src_h > 0 && dst_w > 0 && dst_h > 0,
        "transform dimensions must be positive: {src_w}x{src_h} -> {dst_w}x{dst_h}"
    );

    let mut forward = AffineTransform::IDENTITY;

    if src_w != dst_w || src_h != dst_h {
        let scale_x = dst_w as f32 / src_w as f32;
        let scale_y = dst_h as f32 / src_h as f32;

        forward = if maintain_aspect_ratio {
            let scale = scale_x.max(scale_y);
            forward.then(&AffineTransform::scale(scale, scale))
        } else {
            forward.then(&AffineTransform::scale(scale_x, scale_y))
        };
    }

    // Positive dimensions keep the scale non-singular.
    let mut sampling = forward.invert().unwrap_or(AffineTransform::IDENTITY);

    if rotation_degrees != 0 {
        sampling = sampling.then(&AffineTransform::rotation(rotation_degrees as f32));
    }

    tracing::trace!(
        src_w,
        src_h,
        dst_w,
        dst_h,
        maintain_aspect_ratio,
        rotation_degrees,
        transform = ?sampling,
        "Built sampling transform"
    );

    sampling
}
