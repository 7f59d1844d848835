//! Element-wise transforms applied between the x and y containers.

/// A pure `f64 -> f64` map applied to every sample of a chunk.
pub trait ElementTransform: Send + Sync {
    fn apply(&self, x: f64) -> f64;

    fn apply_slice(&self, xs: &[f64], ys: &mut [f64]) {
        for (y, &x) in ys.iter_mut().zip(xs) {
            *y = self.apply(x);
        }
    }
}

/// The monic cubic `(x - r1)(x - r2)(x - r3)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CubicRoots {
    pub roots: [f64; 3],
}

impl CubicRoots {
    pub fn new(roots: [f64; 3]) -> Self {
        Self { roots }
    }
}

impl Default for CubicRoots {
    fn default() -> Self {
        Self::new([1.35, 4.45, 8.5])
    }
}

impl ElementTransform for CubicRoots {
    #[inline]
    fn apply(&self, x: f64) -> f64 {
        let [r1, r2, r3] = self.roots;
        (x - r1) * (x - r2) * (x - r3)
    }
}

impl<F> ElementTransform for F
where
    F: Fn(f64) -> f64 + Send + Sync,
{
    fn apply(&self, x: f64) -> f64 {
        self(x)
    }
}
