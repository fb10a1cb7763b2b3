//! Distance-switched levels of detail.

/// Rejected switch distances.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LodError {
    #[error("switch distance of level {level} must be positive and finite, got {distance}")]
    NonPositiveDistance { level: usize, distance: f32 },

    #[error("switch distance of level {level} ({distance}) must exceed the previous one ({previous})")]
    NotIncreasing {
        level: usize,
        distance: f32,
        previous: f32,
    },
}

/// A coarser mesh used from `switch_distance` onwards.
#[derive(Clone, Debug, PartialEq)]
pub struct LodLevel<M> {
    pub mesh: M,
    pub switch_distance: f32,
}

/// A base mesh plus coarser levels ordered by strictly increasing switch
/// distance.
///
/// Level 0 is always the base mesh and has no switch distance.
#[derive(Clone, Debug, PartialEq)]
pub struct LodSet<M> {
    base: M,
    levels: Vec<LodLevel<M>>,
}

impl<M> LodSet<M> {
    /// Build a set from the base mesh and `(mesh, switch_distance)` pairs.
    ///
    /// Level numbers in errors count the base mesh as level 0.
    pub fn new(base: M, levels: impl IntoIterator<Item = (M, f32)>) -> Result<Self, LodError> {
        let mut checked: Vec<LodLevel<M>> = Vec::new();
        for (i, (mesh, distance)) in levels.into_iter().enumerate() {
            let level = i + 1;
            if !(distance > 0.0 && distance.is_finite()) {
                return Err(LodError::NonPositiveDistance { level, distance });
            }
            if let Some(previous) = checked.last()
                && distance <= previous.switch_distance
            {
                return Err(LodError::NotIncreasing {
                    level,
                    distance,
                    previous: previous.switch_distance,
                });
            }
            checked.push(LodLevel {
                mesh,
                switch_distance: distance,
            });
        }
        Ok(Self {
            base,
            levels: checked,
        })
    }

    /// A set with only the base mesh.
    pub fn single(base: M) -> Self {
        Self {
            base,
            levels: Vec::new(),
        }
    }

    /// The finest mesh, used at distances below the first switch.
    pub fn base(&self) -> &M {
        &self.base
    }

    pub fn levels(&self) -> &[LodLevel<M>] {
        &self.levels
    }

    /// Number of meshes including the base.
    pub fn len(&self) -> usize {
        1 + self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn switch_distances(&self) -> Vec<f32> {
        self.levels.iter().map(|level| level.switch_distance).collect()
    }

    /// Level index for a viewer at `distance`: the coarsest level whose
    /// switch distance is at most `distance`, or 0.
    pub fn select_level(&self, distance: f32) -> usize {
        self.levels
            .iter()
            .rposition(|level| level.switch_distance <= distance)
            .map_or(0, |i| i + 1)
    }

    /// Mesh for a viewer at `distance`.
    pub fn select(&self, distance: f32) -> &M {
        match self.select_level(distance) {
            0 => &self.base,
            level => &self.levels[level - 1].mesh,
        }
    }

    /// All meshes, finest first.
    pub fn meshes(&self) -> impl Iterator<Item = &M> {
        std::iter::once(&self.base).chain(self.levels.iter().map(|level| &level.mesh))
    }

    pub fn meshes_mut(&mut self) -> impl Iterator<Item = &mut M> {
        std::iter::once(&mut self.base).chain(self.levels.iter_mut().map(|level| &mut level.mesh))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terrain_set() -> LodSet<&'static str> {
        LodSet::new("fine", [("medium", 15_000.0), ("coarse", 30_000.0)]).unwrap()
    }

    #[test]
    fn test_close_viewer_gets_base_mesh() {
        let set = terrain_set();
        assert_eq!(*set.select(0.0), "fine");
        assert_eq!(*set.select(14_999.9), "fine");
    }

    #[test]
    fn test_switch_distance_is_inclusive() {
        let set = terrain_set();
        assert_eq!(*set.select(15_000.0), "medium");
        assert_eq!(*set.select(29_999.0), "medium");
        assert_eq!(*set.select(30_000.0), "coarse");
    }

    #[test]
    fn test_far_viewer_gets_coarsest_mesh() {
        let set = terrain_set();
        assert_eq!(*set.select(1.0e9), "coarse");
        assert_eq!(*set.select(f32::INFINITY), "coarse");
        assert_eq!(set.select_level(1.0e9), 2);
    }

    #[test]
    fn test_shape_of_three_level_set() {
        let set = terrain_set();
        assert_eq!(set.len(), 3);
        assert_eq!(set.switch_distances(), vec![15_000.0, 30_000.0]);
        assert_eq!(set.meshes().copied().collect::<Vec<_>>(), ["fine", "medium", "coarse"]);
    }

    #[test]
    fn test_single_level_set_always_selects_base() {
        let set = LodSet::single(1u8);
        assert_eq!(set.len(), 1);
        assert_eq!(*set.select(1.0e12), 1);
    }

    #[test]
    fn test_non_positive_distance_rejected() {
        assert_eq!(
            LodSet::new(0, [(1, 0.0)]),
            Err(LodError::NonPositiveDistance {
                level: 1,
                distance: 0.0
            })
        );
        assert!(LodSet::new(0, [(1, f32::NAN)]).is_err());
        assert!(LodSet::new(0, [(1, -5.0)]).is_err());
    }

    #[test]
    fn test_non_increasing_distances_rejected() {
        assert_eq!(
            LodSet::new(0, [(1, 30_000.0), (2, 15_000.0)]),
            Err(LodError::NotIncreasing {
                level: 2,
                distance: 15_000.0,
                previous: 30_000.0,
            })
        );
        assert!(LodSet::new(0, [(1, 10.0), (2, 10.0)]).is_err());
    }

    #[test]
    fn test_meshes_mut_visits_every_level() {
        let mut set = LodSet::new(1, [(2, 1.0), (3, 2.0)]).unwrap();
        for mesh in set.meshes_mut() {
            *mesh *= 10;
        }
        assert_eq!(set.meshes().copied().collect::<Vec<_>>(), [10, 20, 30]);
    }
}
