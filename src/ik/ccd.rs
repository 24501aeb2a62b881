//! Cyclic coordinate descent.
//!
//! Walks each chain from the joint nearest the effector towards the root and
//! turns every joint so the effector points at the target from there.

use super::bind::BindPose;
use super::chain::Chain;
use super::solver::{commit_joint, SolverConfig, MIN_DELTA_ANGLE};
use crate::math::rotation_between;
use crate::skeleton::Skeleton;

/// One CCD iteration over every enabled chain. Returns whether any chain
/// still needed work.
pub(crate) fn iterate<S: Skeleton + ?Sized>(
    skeleton: &mut S,
    bind: &BindPose,
    chains: &[Chain],
    config: &SolverConfig,
) -> bool {
    let mut adjusted = false;

    for chain in chains.iter().filter(|c| c.is_enabled() && c.len() > 1) {
        let goal = chain.target_position();
        if !goal.is_finite() {
            log::trace!("chain '{}' has a non-finite target", chain.name());
            continue;
        }

        for i in 1..chain.len() {
            let effector = skeleton.world_position(chain.effector());
            if effector.distance_squared(goal) <= config.sq_threshold {
                break;
            }
            adjusted = true;

            let bone = chain.bones()[i];
            let rotation = skeleton.local_rotation(bone);
            let world_to_local = skeleton.world_matrix(bone).inverse();
            let effector_dir = rotation * world_to_local.transform_point3(effector);
            let goal_dir = rotation * world_to_local.transform_point3(goal);

            // None for a zero-length direction or a negligible angle
            let Some(delta) = rotation_between(effector_dir, goal_dir, MIN_DELTA_ANGLE) else {
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

    adjusted
}
