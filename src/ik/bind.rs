//! Bind-pose cache
//!
//! Per-bone data derived once from a skeleton's inverse bind matrices:
//! local bind rotation (and its inverse), the bind direction of each bone in
//! its parent's frame, and the bind length of each bone.

use crate::math::{normalize_or, Mat4, Quat, Vec3};
use crate::skeleton::Skeleton;

/// Direction used for bones that coincide with their parent.
pub const FALLBACK_BONE_DIR: Vec3 = Vec3::Y;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindInfo {
    /// Rotation of the bone relative to its parent in the bind pose.
    pub bind_rotation: Quat,
    pub inv_bind_rotation: Quat,
    /// Unit direction parent -> bone in the bind pose, with the parent's bind
    /// rotation applied. Meaningless for roots.
    pub bone_dir: Vec3,
    /// Distance parent -> bone in the bind pose.
    pub bone_length: f32,
}

impl Default for BindInfo {
    fn default() -> Self {
        Self {
            bind_rotation: Quat::IDENTITY,
            inv_bind_rotation: Quat::IDENTITY,
            bone_dir: FALLBACK_BONE_DIR,
            bone_length: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BindPose {
    infos: Vec<BindInfo>,
    parents: Vec<Option<usize>>,
    order: Vec<usize>,
}

impl BindPose {
    pub fn from_skeleton<S: Skeleton + ?Sized>(skeleton: &S) -> Self {
        let count = skeleton.bone_count();

        let parents: Vec<Option<usize>> = (0..count)
            .map(|i| match skeleton.parent(i) {
                Some(p) if p < count && p != i => Some(p),
                Some(p) => {
                    log::warn!("bone {i} has invalid parent {p}; treating it as a root");
                    None
                }
                None => None,
            })
            .collect();

        let order = parent_first_order(&parents);

        let mut infos = vec![BindInfo::default(); count];
        for &i in &order {
            let inv_bind = skeleton.inverse_bind_matrix(i);
            let local = match parents[i] {
                Some(p) => skeleton.inverse_bind_matrix(p) * inv_bind.inverse(),
                None => inv_bind.inverse(),
            };

            let (bind_rotation, offset) = rotation_translation(&local);
            let bone_dir = match parents[i] {
                Some(p) => normalize_or(infos[p].bind_rotation * offset, FALLBACK_BONE_DIR),
                None => normalize_or(offset, FALLBACK_BONE_DIR),
            };

            infos[i] = BindInfo {
                bind_rotation,
                inv_bind_rotation: bind_rotation.inverse(),
                bone_dir,
                bone_length: if offset.is_finite() { offset.length() } else { 0.0 },
            };
        }

        log::debug!("bind pose cached for {count} bones");

        Self {
            infos,
            parents,
            order,
        }
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }

    pub fn get(&self, bone: usize) -> Option<&BindInfo> {
        self.infos.get(bone)
    }

    pub fn infos(&self) -> &[BindInfo] {
        &self.infos
    }

    pub fn bone_dir(&self, bone: usize) -> Vec3 {
        self.infos[bone].bone_dir
    }

    pub fn bind_rotation(&self, bone: usize) -> Quat {
        self.infos[bone].bind_rotation
    }

    pub fn inv_bind_rotation(&self, bone: usize) -> Quat {
        self.infos[bone].inv_bind_rotation
    }

    pub fn bone_length(&self, bone: usize) -> f32 {
        self.infos[bone].bone_length
    }

    pub fn parent_of(&self, bone: usize) -> Option<usize> {
        self.parents.get(bone).copied().flatten()
    }

    /// Bone indices ordered so every parent precedes its children.
    pub fn order(&self) -> &[usize] {
        &self.order
    }
}

fn rotation_translation(local: &Mat4) -> (Quat, Vec3) {
    let (_, rotation, translation) = local.to_scale_rotation_translation();
    let rotation = if rotation.is_finite() && rotation.length_squared() > 1e-12 {
        rotation.normalize()
    } else {
        Quat::IDENTITY
    };
    (rotation, translation)
}

/// Breadth-first from the roots. Bones unreachable from any root (cycles)
/// are appended afterwards so every bone still gets an entry.
fn parent_first_order(parents: &[Option<usize>]) -> Vec<usize> {
    let count = parents.len();
    let mut children = vec![Vec::new(); count];
    let mut order = Vec::with_capacity(count);
    for (i, parent) in parents.iter().enumerate() {
        match parent {
            Some(p) => children[*p].push(i),
            None => order.push(i),
        }
    }

    let mut head = 0;
    while head < order.len() {
        let bone = order[head];
        order.extend_from_slice(&children[bone]);
        head += 1;
    }

    if order.len() < count {
        let mut visited = vec![false; count];
        for &i in &order {
            visited[i] = true;
        }
        for (i, seen) in visited.iter().enumerate() {
            if !seen {
                log::warn!("bone {i} is not reachable from any root");
                order.push(i);
            }
        }
    }

    order
}
