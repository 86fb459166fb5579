//! A small algebra of scalar fields `(x, y, z) -> f64`.
//!
//! Combinators consume their operands and return new fields; nothing is
//! mutated after construction except the memo slots of [`cache`] wrappers.

pub mod cache;

use crate::field::cache::{Cached2d, Cached3d};
use bevy_math::IVec3;

pub trait ScalarField {
    fn sample(&self, x: f64, y: f64, z: f64) -> f64;

    fn add<F>(self, other: F) -> Add<Self, F>
    where
        Self: Sized,
        F: ScalarField,
    {
        Add(self, other)
    }

    fn mul<F>(self, other: F) -> Mul<Self, F>
    where
        Self: Sized,
        F: ScalarField,
    {
        Mul(self, other)
    }

    /// `value * factor + offset`.
    fn affine(self, factor: f64, offset: f64) -> Affine<Self>
    where
        Self: Sized,
    {
        Affine {
            field: self,
            factor,
            offset,
        }
    }

    fn clamp(self, min: f64, max: f64) -> Clamp<Self>
    where
        Self: Sized,
    {
        Clamp {
            field: self,
            min,
            max,
        }
    }

    /// Uses `self` as the blend factor between `low` and `high`.
    fn lerp<A, B>(self, low: A, high: B) -> Lerp<Self, A, B>
    where
        Self: Sized,
        A: ScalarField,
        B: ScalarField,
    {
        Lerp {
            t: self,
            low,
            high,
        }
    }

    fn map<G>(self, g: G) -> Map<Self, G>
    where
        Self: Sized,
        G: Fn(f64) -> f64,
    {
        Map { field: self, g }
    }

    /// Memoizes the field in the `(x, z)` plane, sampling it at `y = 0`.
    fn cached2d<H>(self, capacity: usize, hash: H) -> Cached2d<Self, H>
    where
        Self: Sized,
        H: Fn(IVec3) -> i32,
    {
        Cached2d::new(self, capacity, hash)
    }

    fn cached3d<H>(self, capacity: usize, hash: H) -> Cached3d<Self, H>
    where
        Self: Sized,
        H: Fn(IVec3) -> i32,
    {
        Cached3d::new(self, capacity, hash)
    }
}

impl<T: ScalarField + ?Sized> ScalarField for Box<T> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).sample(x, y, z)
    }
}

impl<T: ScalarField + ?Sized> ScalarField for &T {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (**self).sample(x, y, z)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constant(pub f64);

impl ScalarField for Constant {
    #[inline]
    fn sample(&self, _x: f64, _y: f64, _z: f64) -> f64 {
        self.0
    }
}

/// Adapts a plain closure.
#[derive(Clone, Copy, Debug)]
pub struct FnField<F>(pub F);

impl<F> ScalarField for FnField<F>
where
    F: Fn(f64, f64, f64) -> f64,
{
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (self.0)(x, y, z)
    }
}

#[derive(Clone, Debug)]
pub struct Add<A, B>(A, B);

impl<A: ScalarField, B: ScalarField> ScalarField for Add<A, B> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.0.sample(x, y, z) + self.1.sample(x, y, z)
    }
}

#[derive(Clone, Debug)]
pub struct Mul<A, B>(A, B);

impl<A: ScalarField, B: ScalarField> ScalarField for Mul<A, B> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.0.sample(x, y, z) * self.1.sample(x, y, z)
    }
}

#[derive(Clone, Debug)]
pub struct Affine<F> {
    field: F,
    factor: f64,
    offset: f64,
}

impl<F: ScalarField> ScalarField for Affine<F> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.field.sample(x, y, z).mul_add(self.factor, self.offset)
    }
}

#[derive(Clone, Debug)]
pub struct Clamp<F> {
    field: F,
    min: f64,
    max: f64,
}

impl<F: ScalarField> ScalarField for Clamp<F> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        self.field.sample(x, y, z).clamp(self.min, self.max)
    }
}

#[derive(Clone, Debug)]
pub struct Lerp<T, A, B> {
    t: T,
    low: A,
    high: B,
}

impl<T: ScalarField, A: ScalarField, B: ScalarField> ScalarField for Lerp<T, A, B> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let t = self.t.sample(x, y, z);
        let low = self.low.sample(x, y, z);
        let high = self.high.sample(x, y, z);
        (high - low).mul_add(t, low)
    }
}

#[derive(Clone, Debug)]
pub struct Map<F, G> {
    field: F,
    g: G,
}

impl<F: ScalarField, G: Fn(f64) -> f64> ScalarField for Map<F, G> {
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        (self.g)(self.field.sample(x, y, z))
    }
}
