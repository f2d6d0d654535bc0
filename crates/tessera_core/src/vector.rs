//! # Vectors
//!
//! Fixed-length real vectors used by every physical body.
//!
//! A [`Vector`] is always finite. Anything else handed to a constructor or
//! setter is replaced by the zero vector of the same length; this never
//! fails and never panics.

use std::ops::{Add, AddAssign, Index, Mul};

/// Fixed-length vector of finite reals.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vector<const N: usize>([f64; N]);

/// Two-component vector (grounded bodies).
pub type Vec2 = Vector<2>;

/// Three-component vector (free bodies).
pub type Vec3 = Vector<3>;

impl<const N: usize> Vector<N> {
    /// The zero vector.
    pub const ZERO: Self = Self([0.0; N]);

    /// Creates a vector, falling back to zero if any component is not finite.
    #[inline]
    #[must_use]
    pub fn new(components: [f64; N]) -> Self {
        if components.iter().all(|c| c.is_finite()) {
            Self(components)
        } else {
            Self::ZERO
        }
    }

    /// Builds a vector from untrusted input.
    ///
    /// The input must have exactly `N` finite components, otherwise the
    /// zero vector is returned.
    #[must_use]
    pub fn sanitize(input: &[f64]) -> Self {
        if input.len() != N {
            return Self::ZERO;
        }
        let mut out = [0.0; N];
        out.copy_from_slice(input);
        Self::new(out)
    }

    /// Builds a vector from input of any length.
    ///
    /// Extra components are dropped and missing ones are zero. A non-finite
    /// component anywhere in the input yields the zero vector.
    #[must_use]
    pub fn project(input: &[f64]) -> Self {
        if input.iter().any(|c| !c.is_finite()) {
            return Self::ZERO;
        }
        let mut out = [0.0; N];
        for (slot, value) in out.iter_mut().zip(input) {
            *slot = *value;
        }
        Self(out)
    }

    /// Returns the components as an array.
    #[inline]
    #[must_use]
    pub const fn to_array(self) -> [f64; N] {
        self.0
    }

    /// Returns the components as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Returns true if every component is exactly zero.
    #[inline]
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|c| *c == 0.0)
    }

    /// Applies `f` to every component, keeping the finite invariant.
    #[must_use]
    pub fn map(self, mut f: impl FnMut(f64) -> f64) -> Self {
        let mut out = self.0;
        for c in &mut out {
            *c = f(*c);
        }
        Self::new(out)
    }

    /// Returns the first two components (the plane the spatial index sees).
    #[inline]
    #[must_use]
    pub fn planar(&self) -> [f64; 2] {
        [
            self.0.first().copied().unwrap_or(0.0),
            self.0.get(1).copied().unwrap_or(0.0),
        ]
    }
}

impl<const N: usize> Default for Vector<N> {
    fn default() -> Self {
        Self::ZERO
    }
}

impl<const N: usize> From<[f64; N]> for Vector<N> {
    fn from(components: [f64; N]) -> Self {
        Self::new(components)
    }
}

impl<const N: usize> Index<usize> for Vector<N> {
    type Output = f64;

    fn index(&self, index: usize) -> &f64 {
        &self.0[index]
    }
}

impl<const N: usize> Add for Vector<N> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut out = self.0;
        for (a, b) in out.iter_mut().zip(rhs.0) {
            *a += b;
        }
        Self::new(out)
    }
}

impl<const N: usize> AddAssign for Vector<N> {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl<const N: usize> Mul<f64> for Vector<N> {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        self.map(|c| c * rhs)
    }
}
