//! Trilinear expansion of a coarse grid into per-voxel samples.
//!
//! Each cell is swept y, then x, then z, stepping every interpolant by a
//! precomputed delta. Gradients are forward differences: the change of the
//! interpolated density over one block along each axis.

use crate::density::{CoarseGrid, REGION_VOLUME, voxel_index};
use bevy_math::{DVec3, IVec3};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct VoxelSample {
    pub density: f64,
    pub gradient: DVec3,
}

/// Expands one cell with corners indexed `dx | dy << 1 | dz << 2` into
/// `scale.x * scale.y * scale.z` samples, passing each to `emit` with its
/// local position.
pub fn expand_cell(corners: &[f64; 8], scale: IVec3, mut emit: impl FnMut(IVec3, VoxelSample)) {
    let step = 1.0 / scale.as_dvec3();
    let c = |x: usize, y: usize, z: usize| corners[x | (y << 1) | (z << 2)];

    // density change per block along y, for each vertical edge
    let dy00 = (c(0, 1, 0) - c(0, 0, 0)) * step.y;
    let dy10 = (c(1, 1, 0) - c(1, 0, 0)) * step.y;
    let dy01 = (c(0, 1, 1) - c(0, 0, 1)) * step.y;
    let dy11 = (c(1, 1, 1) - c(1, 0, 1)) * step.y;
    // the y gradient is the same on every layer; only x and z move it
    let ddy0 = (dy10 - dy00) * step.x;
    let ddy1 = (dy11 - dy01) * step.x;

    let mut e00 = c(0, 0, 0);
    let mut e10 = c(1, 0, 0);
    let mut e01 = c(0, 0, 1);
    let mut e11 = c(1, 0, 1);
    for ly in 0..scale.y {
        let dx0 = (e10 - e00) * step.x;
        let dx1 = (e11 - e01) * step.x;
        let ddx = (dx1 - dx0) * step.z;

        let mut a0 = e00;
        let mut a1 = e01;
        let mut b0 = dy00;
        let mut b1 = dy01;
        for lx in 0..scale.x {
            let dz = (a1 - a0) * step.z;
            let ddy = (b1 - b0) * step.z;

            let mut density = a0;
            let mut gx = dx0;
            let mut gy = b0;
            for lz in 0..scale.z {
                emit(
                    IVec3::new(lx, ly, lz),
                    VoxelSample {
                        density,
                        gradient: DVec3::new(gx, gy, dz),
                    },
                );
                density += dz;
                gx += ddx;
                gy += ddy;
            }
            a0 += dx0;
            a1 += dx1;
            b0 += ddy0;
            b1 += ddy1;
        }
        e00 += dy00;
        e10 += dy10;
        e01 += dy01;
        e11 += dy11;
    }
}

/// Expands a full grid into `out`, indexed by [`voxel_index`].
pub fn expand(grid: &CoarseGrid, out: &mut [VoxelSample; REGION_VOLUME]) {
    let scale = grid.scale();
    let cells = grid.size() - 1;
    for cx in 0..cells.x {
        for cy in 0..cells.y {
            for cz in 0..cells.z {
                let base = IVec3::new(cx, cy, cz) * scale;
                expand_cell(&grid.corners(cx, cy, cz), scale, |local, sample| {
                    let p = base + local;
                    out[voxel_index(p.x, p.y, p.z)] = sample;
                });
            }
        }
    }
}
