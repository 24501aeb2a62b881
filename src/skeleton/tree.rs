use super::Skeleton;
use crate::error::{IkError, IkResult};
use crate::math::Transform;
use glam::{Mat4, Quat, Vec3};

#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    pub parent: Option<usize>,
    pub local: Transform,
}

/// In-memory skeleton with cached world matrices.
///
/// Bones are stored parents-first. The inverse bind matrices are captured
/// from the pose the tree was built with.
#[derive(Debug, Clone)]
pub struct BoneTree {
    bones: Vec<Bone>,
    children: Vec<Vec<usize>>,
    world: Vec<Mat4>,
    inverse_bind: Vec<Mat4>,
    root_transform: Mat4,
}

impl BoneTree {
    pub fn builder() -> BoneTreeBuilder {
        BoneTreeBuilder::new()
    }

    /// A single straight limb: a root at the origin followed by one bone per
    /// segment, each offset by `segment_lengths[i]` along `direction`.
    ///
    /// Bone `0` is the root and the last bone is the tip.
    pub fn straight_chain(segment_lengths: &[f32], direction: Vec3) -> Self {
        let direction = direction.normalize_or_zero();
        let mut bones = Vec::with_capacity(segment_lengths.len() + 1);
        bones.push(Bone {
            name: "bone_0".to_string(),
            parent: None,
            local: Transform::IDENTITY,
        });
        for (i, length) in segment_lengths.iter().enumerate() {
            bones.push(Bone {
                name: format!("bone_{}", i + 1),
                parent: Some(i),
                local: Transform::from_position(direction * *length),
            });
        }
        Self::assemble(bones)
    }

    fn assemble(bones: Vec<Bone>) -> Self {
        let n = bones.len();
        let mut children = vec![Vec::new(); n];
        for (i, bone) in bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                children[parent].push(i);
            }
        }

        let mut tree = Self {
            bones,
            children,
            world: vec![Mat4::IDENTITY; n],
            inverse_bind: Vec::new(),
            root_transform: Mat4::IDENTITY,
        };
        tree.update_all();
        tree.inverse_bind = tree.world.iter().map(|m| m.inverse()).collect();
        tree
    }

    pub fn bones(&self) -> &[Bone] {
        &self.bones
    }

    pub fn bone(&self, index: usize) -> Option<&Bone> {
        self.bones.get(index)
    }

    pub fn bone_name(&self, index: usize) -> Option<&str> {
        self.bones.get(index).map(|b| b.name.as_str())
    }

    pub fn find_bone(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|b| b.name == name)
    }

    pub fn children(&self, index: usize) -> &[usize] {
        &self.children[index]
    }

    pub fn local_transform(&self, index: usize) -> &Transform {
        &self.bones[index].local
    }

    /// Replaces a bone's local transform and refreshes its subtree.
    pub fn set_local_transform(&mut self, index: usize, local: Transform) {
        self.bones[index].local = local;
        self.update_world_matrix(index);
    }

    pub fn root_transform(&self) -> Mat4 {
        self.root_transform
    }

    /// Model matrix applied above every root bone.
    pub fn set_root_transform(&mut self, transform: Mat4) {
        self.root_transform = transform;
        self.update_all();
    }

    /// Restores every bone's local rotation to its bind pose.
    pub fn reset_to_bind(&mut self) {
        for i in 0..self.bones.len() {
            let parent_inv_bind = match self.bones[i].parent {
                Some(p) => self.inverse_bind[p],
                None => Mat4::IDENTITY,
            };
            let local_bind = parent_inv_bind * self.inverse_bind[i].inverse();
            let (_, rotation, _) = local_bind.to_scale_rotation_translation();
            self.bones[i].local.rotation = rotation.normalize();
        }
        self.update_all();
    }

    pub fn update_all(&mut self) {
        for i in 0..self.bones.len() {
            let parent_world = match self.bones[i].parent {
                Some(p) => self.world[p],
                None => self.root_transform,
            };
            self.world[i] = parent_world * self.bones[i].local.to_matrix();
        }
    }

    fn propagate(&mut self, index: usize) {
        let parent_world = match self.bones[index].parent {
            Some(p) => self.world[p],
            None => self.root_transform,
        };
        self.world[index] = parent_world * self.bones[index].local.to_matrix();
        for k in 0..self.children[index].len() {
            let child = self.children[index][k];
            self.propagate(child);
        }
    }
}

impl Skeleton for BoneTree {
    fn bone_count(&self) -> usize {
        self.bones.len()
    }

    fn parent(&self, bone: usize) -> Option<usize> {
        self.bones[bone].parent
    }

    fn inverse_bind_matrix(&self, bone: usize) -> Mat4 {
        self.inverse_bind[bone]
    }

    fn local_rotation(&self, bone: usize) -> Quat {
        self.bones[bone].local.rotation
    }

    fn set_local_rotation(&mut self, bone: usize, rotation: Quat) {
        self.bones[bone].local.rotation = rotation.normalize();
    }

    fn local_position(&self, bone: usize) -> Vec3 {
        self.bones[bone].local.position
    }

    fn world_matrix(&self, bone: usize) -> Mat4 {
        self.world[bone]
    }

    fn update_world_matrix(&mut self, bone: usize) {
        self.propagate(bone);
    }
}

pub struct BoneTreeBuilder {
    bones: Vec<Bone>,
}

impl BoneTreeBuilder {
    pub fn new() -> Self {
        Self { bones: Vec::new() }
    }

    pub fn add_root(mut self, name: impl Into<String>, local: Transform) -> Self {
        self.bones.push(Bone {
            name: name.into(),
            parent: None,
            local,
        });
        self
    }

    pub fn add_bone(mut self, name: impl Into<String>, parent: usize, local: Transform) -> Self {
        self.bones.push(Bone {
            name: name.into(),
            parent: Some(parent),
            local,
        });
        self
    }

    /// Validates parent links and captures the current pose as bind pose.
    pub fn build(self) -> IkResult<BoneTree> {
        for (i, bone) in self.bones.iter().enumerate() {
            if let Some(parent) = bone.parent {
                if parent >= i {
                    return Err(IkError::InvalidParent { bone: i, parent });
                }
            }
        }
        Ok(BoneTree::assemble(self.bones))
    }
}

impl Default for BoneTreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
