//! FABRIK: relax joint positions towards the target, then rotate each joint
//! so its child lands on the relaxed position.

use super::bind::BindPose;
use super::chain::Chain;
use super::solver::{commit_joint, SolverConfig, MIN_DELTA_ANGLE};
use crate::math::rotation_between;
use crate::skeleton::Skeleton;
use glam::Vec3;

/// Per-chain position buffers, indexed like `Chain::bones`. Reused across
/// updates.
#[derive(Debug, Default)]
pub(crate) struct FabrikScratch {
    positions: Vec<Vec3>,
    targets: Vec<Vec3>,
}

impl FabrikScratch {
    fn load<S: Skeleton + ?Sized>(&mut self, skeleton: &S, bones: &[usize]) {
        self.positions.clear();
        self.positions
            .extend(bones.iter().map(|&bone| skeleton.world_position(bone)));
        self.targets.clear();
        self.targets.resize(bones.len(), Vec3::ZERO);
    }

    /// Effector to root: drag each point onto the goal, keeping segment
    /// lengths from the current pose.
    fn backward_pass(&mut self, goal: Vec3) {
        let n = self.positions.len();
        let mut point = goal;
        let mut fallback = Vec3::Y;

        for i in 0..n - 1 {
            let segment = self.positions[i].distance(self.positions[i + 1]);
            self.targets[i] = point;
            let dir = direction_or(point - self.positions[i + 1], &mut fallback);
            point -= dir * segment;
        }
        self.targets[n - 1] = point;
    }

    /// Root to effector: pin the root back to where it was and pull the
    /// rest of the chain after it.
    fn forward_pass(&mut self) {
        let n = self.positions.len();
        let mut point = self.positions[n - 1];
        let mut fallback = Vec3::Y;

        for i in (1..n).rev() {
            let segment = self.positions[i].distance(self.positions[i - 1]);
            self.targets[i] = point;
            let dir = direction_or(point - self.targets[i - 1], &mut fallback);
            point -= dir * segment;
        }
        self.targets[0] = point;
    }
}

/// Unit `v`, or the last good direction when `v` is too short to normalize.
fn direction_or(v: Vec3, fallback: &mut Vec3) -> Vec3 {
    let len = v.length();
    if len > 0.0001 && len.is_finite() {
        *fallback = v / len;
    }
    *fallback
}

/// One FABRIK iteration over every enabled chain. Returns whether any chain
/// still needed work.
pub(crate) fn iterate<S: Skeleton + ?Sized>(
    skeleton: &mut S,
    bind: &BindPose,
    chains: &[Chain],
    config: &SolverConfig,
    scratch: &mut FabrikScratch,
) -> bool {
    let mut adjusted = false;

    for chain in chains.iter().filter(|c| c.is_enabled() && c.len() > 1) {
        let goal = chain.target_position();
        if !goal.is_finite() {
            log::trace!("chain '{}' has a non-finite target", chain.name());
            continue;
        }
        let effector = skeleton.world_position(chain.effector());
        if effector.distance_squared(goal) <= config.sq_threshold {
            log::trace!("chain '{}' already at target", chain.name());
            continue;
        }
        adjusted = true;

        scratch.load(skeleton, chain.bones());
        scratch.backward_pass(goal);
        scratch.forward_pass();
        reconstruct_rotations(skeleton, bind, chain, &scratch.targets, config);
    }

    adjusted
}

/// Root-most joint first, so every joint sees its parent's new pose.
fn reconstruct_rotations<S: Skeleton + ?Sized>(
    skeleton: &mut S,
    bind: &BindPose,
    chain: &Chain,
    targets: &[Vec3],
    config: &SolverConfig,
) {
    let bones = chain.bones();
    for i in (1..bones.len()).rev() {
        let bone = bones[i];
        let child = bones[i - 1];

        // Both directions live in the parent frame, centred on the joint.
        let rotation = skeleton.local_rotation(bone);
        let world_to_local = skeleton.world_matrix(bone).inverse();
        let current = rotation * skeleton.local_position(child);
        let wanted = rotation * world_to_local.transform_point3(targets[i - 1]);

        let Some(delta) = rotation_between(current, wanted, MIN_DELTA_ANGLE) else {
            continue;
        };
        commit_joint(
            skeleton,
            bind,
            chain,
            i,
            (delta * rotation).normalize(),
            config.constraints_enabled,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn scratch_with(positions: &[Vec3]) -> FabrikScratch {
        FabrikScratch {
            positions: positions.to_vec(),
            targets: vec![Vec3::ZERO; positions.len()],
        }
    }

    #[test]
    fn passes_keep_segment_lengths_and_root() {
        // effector first
        let positions = [
            Vec3::new(0.5, 2.8, 0.0),
            Vec3::new(0.2, 1.9, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::ZERO,
        ];
        let mut scratch = scratch_with(&positions);
        let goal = Vec3::new(1.5, 1.0, 0.3);
        scratch.backward_pass(goal);
        assert_eq!(scratch.targets[0], goal);
        scratch.forward_pass();

        assert_eq!(scratch.targets[3], Vec3::ZERO);
        for i in 0..3 {
            let before = positions[i].distance(positions[i + 1]);
            let after = scratch.targets[i].distance(scratch.targets[i + 1]);
            assert_abs_diff_eq!(before, after, epsilon = 1e-5);
        }
        // closer than where it started
        assert!(scratch.targets[0].distance(goal) < positions[0].distance(goal));
    }

    #[test]
    fn coincident_joints_stay_finite() {
        let positions = [Vec3::Y, Vec3::Y, Vec3::ZERO];
        let mut scratch = scratch_with(&positions);
        scratch.backward_pass(Vec3::Y);
        scratch.forward_pass();
        assert!(scratch.targets.iter().all(|p| p.is_finite()));
        assert_eq!(scratch.targets[2], Vec3::ZERO);
    }

    #[test]
    fn direction_or_remembers_last_good() {
        let mut fallback = Vec3::Y;
        assert_eq!(direction_or(Vec3::X * 3.0, &mut fallback), Vec3::X);
        assert_eq!(direction_or(Vec3::ZERO, &mut fallback), Vec3::X);
        assert_eq!(direction_or(Vec3::splat(f32::NAN), &mut fallback), Vec3::X);
    }
}
