//! DDA voxel raycasting
//!
//! Amanatides & Woo grid traversal: walk voxel boundaries along a ray
//! until a solid cell is hit or the distance budget runs out. Used for
//! pick/edit flows feeding `set_voxel`.

use crate::chunk::Face;
use crate::registry::{VoxelId, VoxelTypeRegistry};
use glam::{IVec3, Vec3};

/// First solid cell along a ray
#[derive(Debug, Clone, Copy)]
pub struct RaycastHit {
    /// World coordinate of the solid voxel
    pub voxel: IVec3,

    /// Its type id
    pub id: VoxelId,

    /// The face the ray entered through; `None` when the ray origin
    /// was already inside the voxel
    pub face: Option<Face>,

    /// Distance from the ray origin to the entry point
    pub distance: f32,

    /// The cell just in front of the hit face (placement target)
    pub adjacent: IVec3,
}

/// Trace a ray through the voxel grid
///
/// `sample` reads a world voxel (AIR for anything not resident);
/// solidity comes from the registry, so water and torches are passed
/// through while glass and leaves stop the ray.
pub fn raycast_solid<F>(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    registry: &VoxelTypeRegistry,
    sample: F,
) -> Option<RaycastHit>
where
    F: Fn(IVec3) -> VoxelId,
{
    let direction = direction.normalize_or_zero();
    if direction == Vec3::ZERO || max_distance <= 0.0 {
        return None;
    }

    let mut voxel = origin.floor().as_ivec3();
    let step = IVec3::new(
        if direction.x > 0.0 { 1 } else { -1 },
        if direction.y > 0.0 { 1 } else { -1 },
        if direction.z > 0.0 { 1 } else { -1 },
    );

    // Ray length needed to cross one cell along each axis.
    let delta = Vec3::new(
        if direction.x.abs() < 1e-10 {
            f32::INFINITY
        } else {
            (1.0 / direction.x).abs()
        },
        if direction.y.abs() < 1e-10 {
            f32::INFINITY
        } else {
            (1.0 / direction.y).abs()
        },
        if direction.z.abs() < 1e-10 {
            f32::INFINITY
        } else {
            (1.0 / direction.z).abs()
        },
    );

    let boundary_t = |axis_origin: f32, axis_voxel: i32, axis_dir: f32| -> f32 {
        if axis_dir > 0.0 {
            (axis_voxel as f32 + 1.0 - axis_origin) / axis_dir
        } else if axis_dir < 0.0 {
            (axis_origin - axis_voxel as f32) / -axis_dir
        } else {
            f32::INFINITY
        }
    };
    let mut t_max = Vec3::new(
        boundary_t(origin.x, voxel.x, direction.x),
        boundary_t(origin.y, voxel.y, direction.y),
        boundary_t(origin.z, voxel.z, direction.z),
    );

    let mut entry_face = None;
    let mut distance = 0.0f32;

    while distance <= max_distance {
        let id = sample(voxel);
        if registry.is_solid(id) {
            let adjacent = match entry_face {
                Some(face) => voxel + Face::offset(face),
                None => voxel,
            };
            return Some(RaycastHit {
                voxel,
                id,
                face: entry_face,
                distance,
                adjacent,
            });
        }

        // Advance across the nearest cell boundary.
        if t_max.x < t_max.y && t_max.x < t_max.z {
            voxel.x += step.x;
            distance = t_max.x;
            t_max.x += delta.x;
            entry_face = Some(if step.x > 0 { Face::NegX } else { Face::PosX });
        } else if t_max.y < t_max.z {
            voxel.y += step.y;
            distance = t_max.y;
            t_max.y += delta.y;
            entry_face = Some(if step.y > 0 { Face::NegY } else { Face::PosY });
        } else {
            voxel.z += step.z;
            distance = t_max.z;
            t_max.z += delta.z;
            entry_face = Some(if step.z > 0 { Face::NegZ } else { Face::PosZ });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{AIR, STONE, WATER};

    fn registry() -> VoxelTypeRegistry {
        VoxelTypeRegistry::with_defaults()
    }

    #[test]
    fn test_hits_floor_straight_down() {
        let registry = registry();
        let hit = raycast_solid(
            Vec3::new(0.5, 10.5, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            32.0,
            &registry,
            |p| if p.y < 0 { STONE } else { AIR },
        )
        .expect("floor below");
        assert_eq!(hit.voxel, IVec3::new(0, -1, 0));
        assert_eq!(hit.face, Some(Face::PosY));
        assert_eq!(hit.adjacent, IVec3::new(0, 0, 0));
        assert!((hit.distance - 10.5).abs() < 1e-4);
    }

    #[test]
    fn test_respects_max_distance() {
        let registry = registry();
        let hit = raycast_solid(
            Vec3::new(0.5, 10.5, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            5.0,
            &registry,
            |p| if p.y < 0 { STONE } else { AIR },
        );
        assert!(hit.is_none());
    }

    #[test]
    fn test_passes_through_nonsolid() {
        let registry = registry();
        // A water column above the stone floor is traversed.
        let hit = raycast_solid(
            Vec3::new(0.5, 8.5, 0.5),
            Vec3::new(0.0, -1.0, 0.0),
            32.0,
            &registry,
            |p| {
                if p.y < 0 {
                    STONE
                } else if p.y < 4 {
                    WATER
                } else {
                    AIR
                }
            },
        )
        .expect("stone under water");
        assert_eq!(hit.id, STONE);
        assert_eq!(hit.voxel.y, -1);
    }

    #[test]
    fn test_origin_inside_solid_has_no_entry_face() {
        let registry = registry();
        let hit = raycast_solid(
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(1.0, 0.0, 0.0),
            8.0,
            &registry,
            |_| STONE,
        )
        .expect("inside solid");
        assert_eq!(hit.face, None);
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.adjacent, hit.voxel);
    }

    #[test]
    fn test_diagonal_ray_terminates() {
        let registry = registry();
        let hit = raycast_solid(
            Vec3::new(0.1, 0.2, 0.3),
            Vec3::new(1.0, 0.7, -0.4),
            64.0,
            &registry,
            |_| AIR,
        );
        assert!(hit.is_none());
    }
}
