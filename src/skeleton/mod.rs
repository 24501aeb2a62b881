//! Skeleton access
//!
//! The solvers never own bones. They read and write them through the
//! [`Skeleton`] trait, so any scene graph can be posed as long as it can
//! expose local rotations, local positions, parents and world matrices.

mod tree;

pub use tree::{Bone, BoneTree, BoneTreeBuilder};

use glam::{Mat4, Quat, Vec3};

/// Indexable bone hierarchy the IK solvers operate on.
///
/// Bone indices passed in are always `< bone_count()`; the solvers validate
/// chains before they ever touch a bone.
pub trait Skeleton {
    fn bone_count(&self) -> usize;

    fn parent(&self, bone: usize) -> Option<usize>;

    /// Inverse of the bone's world matrix in the bind (rest) pose.
    fn inverse_bind_matrix(&self, bone: usize) -> Mat4;

    fn local_rotation(&self, bone: usize) -> Quat;

    fn set_local_rotation(&mut self, bone: usize, rotation: Quat);

    /// Translation of the bone relative to its parent.
    fn local_position(&self, bone: usize) -> Vec3;

    /// Current world matrix. Must reflect every `update_world_matrix` call.
    fn world_matrix(&self, bone: usize) -> Mat4;

    /// Recomputes the bone's world matrix from its parent and propagates the
    /// change to every descendant.
    fn update_world_matrix(&mut self, bone: usize);

    fn world_position(&self, bone: usize) -> Vec3 {
        self.world_matrix(bone).w_axis.truncate()
    }
}
