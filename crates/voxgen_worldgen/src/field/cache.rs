//! Direct-mapped memo tables for expensive fields.
//!
//! Each slot remembers the exact coordinates it was filled for, so a
//! colliding lookup only costs a recomputation. Slots live in [`Cell`]s,
//! which keeps the wrappers `!Sync`: one cached field belongs to one worker.

use crate::field::ScalarField;
use bevy_math::{DVec3, IVec3};
use std::cell::Cell;

#[derive(Clone, Copy, Debug, Default)]
struct Slot {
    key: [u64; 3],
    value: f64,
    filled: bool,
}

#[derive(Debug)]
struct Table {
    slots: Box<[Cell<Slot>]>,
}

impl Table {
    fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| Cell::new(Slot::default())).collect(),
        }
    }

    #[inline]
    fn get_or_insert(&self, index: i32, key: [u64; 3], compute: impl FnOnce() -> f64) -> f64 {
        let index = index.rem_euclid(self.slots.len() as i32) as usize;
        let cell = &self.slots[index];
        let slot = cell.get();
        if slot.filled && slot.key == key {
            return slot.value;
        }
        let value = compute();
        cell.set(Slot {
            key,
            value,
            filled: true,
        });
        value
    }

    fn clear(&self) {
        for cell in self.slots.iter() {
            cell.set(Slot::default());
        }
    }
}

#[inline]
fn key_of(x: f64, y: f64, z: f64) -> [u64; 3] {
    [x.to_bits(), y.to_bits(), z.to_bits()]
}

#[inline]
fn cell_of(x: f64, y: f64, z: f64) -> IVec3 {
    DVec3::new(x, y, z).floor().as_ivec3()
}

/// Memoizes a field that does not depend on `y`.
#[derive(Debug)]
pub struct Cached2d<F, H> {
    field: F,
    hash: H,
    table: Table,
}

impl<F, H> Cached2d<F, H>
where
    F: ScalarField,
    H: Fn(IVec3) -> i32,
{
    pub fn new(field: F, capacity: usize, hash: H) -> Self {
        Self {
            field,
            hash,
            table: Table::new(capacity),
        }
    }

    pub fn clear(&self) {
        self.table.clear();
    }
}

impl<F, H> ScalarField for Cached2d<F, H>
where
    F: ScalarField,
    H: Fn(IVec3) -> i32,
{
    #[inline]
    fn sample(&self, x: f64, _y: f64, z: f64) -> f64 {
        let index = (self.hash)(cell_of(x, 0.0, z));
        self.table
            .get_or_insert(index, key_of(x, 0.0, z), || self.field.sample(x, 0.0, z))
    }
}

#[derive(Debug)]
pub struct Cached3d<F, H> {
    field: F,
    hash: H,
    table: Table,
}

impl<F, H> Cached3d<F, H>
where
    F: ScalarField,
    H: Fn(IVec3) -> i32,
{
    pub fn new(field: F, capacity: usize, hash: H) -> Self {
        Self {
            field,
            hash,
            table: Table::new(capacity),
        }
    }

    pub fn clear(&self) {
        self.table.clear();
    }
}

impl<F, H> ScalarField for Cached3d<F, H>
where
    F: ScalarField,
    H: Fn(IVec3) -> i32,
{
    #[inline]
    fn sample(&self, x: f64, y: f64, z: f64) -> f64 {
        let index = (self.hash)(cell_of(x, y, z));
        self.table
            .get_or_insert(index, key_of(x, y, z), || self.field.sample(x, y, z))
    }
}

#[cfg(test)]
mod test {
    use crate::field::{FnField, ScalarField};
    use bevy_math::IVec3;
    use std::cell::Cell;

    #[test]
    fn colliding_keys_never_hit_falsely() {
        let field = FnField(|x: f64, y: f64, z: f64| x * 100.0 + y * 10.0 + z).cached3d(1, |_| 0);
        for _ in 0..4 {
            assert_eq!(field.sample(0.0, 0.0, 0.0), 0.0);
            assert_eq!(field.sample(1.0, 2.0, 3.0), 123.0);
            assert_eq!(field.sample(-1.0, 0.0, 0.0), -100.0);
        }
    }

    #[test]
    fn empty_slot_is_not_a_hit_at_origin() {
        let field = FnField(|_x: f64, _y: f64, _z: f64| 7.5).cached3d(4, |p: IVec3| p.x);
        assert_eq!(field.sample(0.0, 0.0, 0.0), 7.5);
        let flat = FnField(|_x: f64, _y: f64, _z: f64| -2.0).cached2d(4, |p: IVec3| p.z);
        assert_eq!(flat.sample(0.0, 5.0, 0.0), -2.0);
    }

    #[test]
    fn repeats_are_served_from_the_table() {
        let calls = Cell::new(0);
        let field = FnField(|x: f64, _y: f64, z: f64| {
            calls.set(calls.get() + 1);
            x - z
        })
        .cached2d(16, |p: IVec3| p.x + p.z * 4);
        assert_eq!(field.sample(3.0, 10.0, 1.0), 2.0);
        assert_eq!(field.sample(3.0, -40.0, 1.0), 2.0);
        assert_eq!(calls.get(), 1);
        assert_eq!(field.sample(1.0, 0.0, 3.0), -2.0);
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn cleared_tables_recompute() {
        let calls = Cell::new(0);
        let field = FnField(|x: f64, y: f64, z: f64| {
            calls.set(calls.get() + 1);
            x + y + z
        })
        .cached3d(8, |p: IVec3| p.x ^ p.y ^ p.z);
        field.sample(1.0, 1.0, 1.0);
        field.sample(1.0, 1.0, 1.0);
        field.clear();
        field.sample(1.0, 1.0, 1.0);
        assert_eq!(calls.get(), 2);
    }
}
