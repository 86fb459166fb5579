use crate::block::BlockId;
use crate::proto::CurvePoint;
use voxgen_random::hash::{feature_hash_init, finalize, hash_coords};

/// Piecewise-linear function through a set of points, extended linearly
/// past both ends.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserFunction {
    points: Box<[CurvePoint]>,
}

impl UserFunction {
    pub fn new(points: &[CurvePoint]) -> Self {
        let mut points = points.to_vec();
        points.sort_by(|a, b| a.y.total_cmp(&b.y));
        Self {
            points: points.into_boxed_slice(),
        }
    }

    pub fn value(&self, y: f64) -> f64 {
        let points = &self.points[..];
        let (a, b) = match points {
            [] => return 0.0,
            [only] => return only.v,
            [first, second, ..] if y < first.y => (first, second),
            [.., before_last, last] if y >= last.y => (before_last, last),
            _ => {
                let i = points.partition_point(|p| p.y <= y);
                (&points[i - 1], &points[i])
            }
        };
        let t = (y - a.y) / (b.y - a.y);
        (b.v - a.v).mul_add(t, a.v)
    }
}

/// Places a block with a y-dependent probability, decided per voxel by a
/// coordinate hash.
#[derive(Clone, Debug, PartialEq)]
pub struct GradientRule {
    block: BlockId,
    probability: UserFunction,
    hash_init: u32,
}

impl GradientRule {
    pub fn new(block: BlockId, probability: UserFunction, world_seed: u64, seed: i32) -> Self {
        Self {
            block,
            probability,
            hash_init: feature_hash_init(world_seed, seed),
        }
    }

    #[inline]
    pub fn apply(&self, prev: BlockId, x: i32, y: i32, z: i32) -> BlockId {
        let p = self.probability.value(y as f64);
        if p >= 1.0 {
            return self.block;
        }
        if p <= 0.0 {
            return prev;
        }
        let roll = finalize(hash_coords(self.hash_init, x, y, z)) as f64 / u32::MAX as f64;
        if roll <= p { self.block } else { prev }
    }
}

#[cfg(test)]
mod test {
    use crate::block::BlockId;
    use crate::proto::CurvePoint;
    use crate::replacer::gradient::{GradientRule, UserFunction};

    fn points(values: &[(f64, f64)]) -> Vec<CurvePoint> {
        values.iter().map(|&(y, v)| CurvePoint { y, v }).collect()
    }

    #[test]
    fn no_points_is_zero() {
        let f = UserFunction::new(&[]);
        for y in -100..100 {
            assert_eq!(f.value(y as f64), 0.0);
        }
    }

    #[test]
    fn single_point_is_constant() {
        let f = UserFunction::new(&points(&[(1.23456789, 9.87654321)]));
        for y in -100..100 {
            assert_eq!(f.value(y as f64), 9.87654321);
        }
    }

    #[test]
    fn two_points_extrapolate() {
        let f = UserFunction::new(&points(&[(1.0, 1.0), (0.0, 0.0)]));
        for y in -100..100 {
            let y = y as f64 * 0.1;
            assert!((f.value(y) - y).abs() < 1e-9, "{y}");
        }
    }

    #[test]
    fn three_points_make_abs() {
        let f = UserFunction::new(&points(&[(-1.0, 1.0), (0.0, 0.0), (1.0, 1.0)]));
        for y in -10..100 {
            let y = y as f64 * 0.1;
            assert!((f.value(y) - y.abs()).abs() < 1e-9, "{y}");
        }
    }

    #[test]
    fn certain_and_impossible_placement() {
        let always = GradientRule::new(BlockId::BEDROCK, UserFunction::new(&points(&[(0.0, 1.0)])), 42, 7);
        let never = GradientRule::new(BlockId::BEDROCK, UserFunction::new(&points(&[(0.0, 0.0)])), 42, 7);
        for x in -20..20 {
            for y in -20..20 {
                assert_eq!(always.apply(BlockId::STONE, x, y, x * 3), BlockId::BEDROCK);
                assert_eq!(never.apply(BlockId::STONE, x, y, x * 3), BlockId::STONE);
            }
        }
    }

    #[test]
    fn placement_is_positional_and_roughly_proportional() {
        let half = GradientRule::new(BlockId::BEDROCK, UserFunction::new(&points(&[(0.0, 0.5)])), 1, 2);
        let mut placed = 0;
        for x in 0..64 {
            for z in 0..64 {
                let block = half.apply(BlockId::AIR, x, 5, z);
                assert_eq!(block, half.apply(BlockId::AIR, x, 5, z));
                if block == BlockId::BEDROCK {
                    placed += 1;
                }
            }
        }
        assert!((1600..2500).contains(&placed), "{placed}");
    }
}
