use super::bind::BindPose;
use super::ccd;
use super::chain::{Chain, ChainRegistry};
use super::constraint::{swing_twist, ConstraintKind, ConstraintSpec};
use super::events::IkObserver;
use super::fabrik::{self, FabrikScratch};
use super::target::Target;
use crate::error::IkResult;
use crate::skeleton::Skeleton;
use glam::Quat;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Squared effector distance below which a chain counts as solved.
pub const DEFAULT_SQ_THRESHOLD: f32 = 1e-7;
/// Threshold substituted for an invalid one.
pub const FALLBACK_SQ_THRESHOLD: f32 = 1e-3;
/// Joint corrections smaller than this (radians) are skipped.
pub const MIN_DELTA_ANGLE: f32 = 1e-5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Algorithm {
    /// Position-based: relax joint positions, then rebuild rotations.
    #[default]
    Fabrik,
    /// Rotation-based: align each joint towards the target in turn.
    Ccd,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverConfig {
    /// Outer iterations per update, at least 1.
    pub iterations: u32,
    /// Squared world-space distance at which an effector has arrived.
    pub sq_threshold: f32,
    pub constraints_enabled: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            iterations: 1,
            sq_threshold: DEFAULT_SQ_THRESHOLD,
            constraints_enabled: true,
        }
    }
}

impl SolverConfig {
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = sanitize_iterations(iterations);
        self
    }

    pub fn with_sq_threshold(mut self, sq_threshold: f32) -> Self {
        self.sq_threshold = sanitize_sq_threshold(sq_threshold);
        self
    }

    pub fn with_constraints_enabled(mut self, enabled: bool) -> Self {
        self.constraints_enabled = enabled;
        self
    }

    /// Replaces invalid fields with their fallbacks.
    pub fn sanitized(self) -> Self {
        Self {
            iterations: sanitize_iterations(self.iterations),
            sq_threshold: sanitize_sq_threshold(self.sq_threshold),
            constraints_enabled: self.constraints_enabled,
        }
    }
}

fn sanitize_iterations(iterations: u32) -> u32 {
    if iterations == 0 {
        log::warn!("iteration count must be positive; using 1");
        1
    } else {
        iterations
    }
}

fn sanitize_sq_threshold(sq_threshold: f32) -> f32 {
    if sq_threshold.is_finite() && sq_threshold >= 0.0 {
        sq_threshold
    } else {
        log::warn!("invalid squared threshold {sq_threshold}; using {FALLBACK_SQ_THRESHOLD}");
        FALLBACK_SQ_THRESHOLD
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveResult {
    /// Iterations actually run.
    pub iterations: u32,
    /// Every enabled chain ended within the threshold.
    pub converged: bool,
    /// Largest squared effector distance over enabled chains.
    pub worst_sq_distance: f32,
}

/// IK solver bound to one skeleton's bind pose.
///
/// Owns its chains. The skeleton itself is borrowed for each
/// [`update`](Self::update), so several solvers can pose the same skeleton.
#[derive(Debug)]
pub struct IkSolver {
    algorithm: Algorithm,
    config: SolverConfig,
    bind: BindPose,
    registry: ChainRegistry,
    scratch: FabrikScratch,
}

impl IkSolver {
    pub fn new<S: Skeleton + ?Sized>(skeleton: &S, algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            config: SolverConfig::default(),
            bind: BindPose::from_skeleton(skeleton),
            registry: ChainRegistry::new(),
            scratch: FabrikScratch::default(),
        }
    }

    pub fn fabrik<S: Skeleton + ?Sized>(skeleton: &S) -> Self {
        Self::new(skeleton, Algorithm::Fabrik)
    }

    pub fn ccd<S: Skeleton + ?Sized>(skeleton: &S) -> Self {
        Self::new(skeleton, Algorithm::Ccd)
    }

    pub fn with_config(mut self, config: SolverConfig) -> Self {
        self.config = config.sanitized();
        self
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn set_algorithm(&mut self, algorithm: Algorithm) {
        self.algorithm = algorithm;
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn iterations(&self) -> u32 {
        self.config.iterations
    }

    pub fn set_iterations(&mut self, iterations: u32) {
        self.config.iterations = sanitize_iterations(iterations);
    }

    pub fn sq_threshold(&self) -> f32 {
        self.config.sq_threshold
    }

    pub fn set_sq_threshold(&mut self, sq_threshold: f32) {
        self.config.sq_threshold = sanitize_sq_threshold(sq_threshold);
    }

    pub fn constraints_enabled(&self) -> bool {
        self.config.constraints_enabled
    }

    pub fn set_constraints_enabled(&mut self, enabled: bool) {
        self.config.constraints_enabled = enabled;
    }

    pub fn bind_pose(&self) -> &BindPose {
        &self.bind
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn subscribe(&mut self, observer: impl IkObserver + 'static) {
        self.registry.subscribe(observer);
    }

    /// See [`ChainRegistry::create`].
    pub fn create_chain(
        &mut self,
        name: impl Into<String>,
        bones: &[usize],
        specs: &[Option<ConstraintSpec>],
        target: impl Target + 'static,
    ) -> IkResult<()> {
        self.registry.create(&self.bind, name, bones, specs, target)
    }

    pub fn remove_chain(&mut self, name: &str) -> IkResult<()> {
        self.registry.remove(name)
    }

    pub fn remove_all_chains(&mut self) {
        self.registry.remove_all();
    }

    pub fn chain(&self, name: &str) -> Option<&Chain> {
        self.registry.get(name)
    }

    pub fn chains(&self) -> &[Chain] {
        self.registry.chains()
    }

    pub fn chain_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.registry.chain_names()
    }

    pub fn set_constraint(
        &mut self,
        chain: &str,
        index: usize,
        spec: Option<ConstraintSpec>,
    ) -> IkResult<Option<ConstraintKind>> {
        self.registry.set_constraint(&self.bind, chain, index, spec)
    }

    pub fn set_chain_enabled(&mut self, chain: &str, enabled: bool) -> IkResult<()> {
        self.registry.set_enabled(chain, enabled)
    }

    pub fn set_all_chains_enabled(&mut self, enabled: bool) {
        self.registry.set_all_enabled(enabled);
    }

    pub fn set_chain_target(&mut self, chain: &str, target: impl Target + 'static) -> IkResult<()> {
        self.registry.set_target(chain, target)
    }

    /// Runs the configured number of iterations of the active algorithm over
    /// every enabled chain.
    ///
    /// Stops early once an iteration leaves every chain untouched. Does
    /// nothing if `skeleton` no longer has the bone count this solver was
    /// built for.
    pub fn update<S: Skeleton + ?Sized>(&mut self, skeleton: &mut S) -> SolveResult {
        if skeleton.bone_count() != self.bind.len() {
            log::warn!(
                "skeleton has {} bones but the solver was built for {}; skipping update",
                skeleton.bone_count(),
                self.bind.len()
            );
            return SolveResult {
                iterations: 0,
                converged: false,
                worst_sq_distance: f32::INFINITY,
            };
        }

        let mut iterations = 0;
        for _ in 0..self.config.iterations {
            iterations += 1;
            let adjusted = match self.algorithm {
                Algorithm::Fabrik => fabrik::iterate(
                    skeleton,
                    &self.bind,
                    self.registry.chains(),
                    &self.config,
                    &mut self.scratch,
                ),
                Algorithm::Ccd => {
                    ccd::iterate(skeleton, &self.bind, self.registry.chains(), &self.config)
                }
            };
            if !adjusted {
                break;
            }
        }

        let worst_sq_distance = self
            .registry
            .chains()
            .iter()
            .filter(|c| c.is_enabled())
            .map(|c| {
                skeleton
                    .world_position(c.effector())
                    .distance_squared(c.target_position())
            })
            .fold(0.0, f32::max);

        SolveResult {
            iterations,
            converged: worst_sq_distance <= self.config.sq_threshold,
            worst_sq_distance,
        }
    }
}

/// Runs several solvers on one skeleton, in slice order. Each solver sees
/// the pose left by the previous one.
pub fn solve_mixed<S: Skeleton + ?Sized>(
    solvers: &mut [&mut IkSolver],
    skeleton: &mut S,
) -> Vec<SolveResult> {
    solvers
        .iter_mut()
        .map(|solver| solver.update(skeleton))
        .collect()
}

/// Commits `rotation` as the new local rotation of `chain.bones()[index]`.
///
/// The twist the joint already had about its child's bind direction is kept
/// and the twist introduced by the correction is dropped; the constraint, if
/// enabled, then clamps the twist/swing pair. A non-finite result is
/// discarded. Returns whether the bone was written.
pub(crate) fn commit_joint<S: Skeleton + ?Sized>(
    skeleton: &mut S,
    bind: &BindPose,
    chain: &Chain,
    index: usize,
    rotation: Quat,
    constraints_enabled: bool,
) -> bool {
    let bone = chain.bones()[index];
    let child = chain.bones()[index - 1];
    let info = match bind.get(bone) {
        Some(info) => *info,
        None => return false,
    };
    let axis = bind.bone_dir(child);

    let (_, mut twist) = swing_twist(skeleton.local_rotation(bone) * info.inv_bind_rotation, axis);
    let (mut swing, _) = swing_twist(rotation * info.inv_bind_rotation, axis);

    if constraints_enabled {
        if let Some(constraint) = chain.constraint(index) {
            constraint.apply(&mut twist, &mut swing);
        }
    }

    let committed = (swing * twist * info.bind_rotation).normalize();
    if !committed.is_finite() {
        return false;
    }
    skeleton.set_local_rotation(bone, committed);
    skeleton.update_world_matrix(bone);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ik::events::EventQueue;
    use crate::skeleton::BoneTree;
    use glam::Vec3;

    #[test]
    fn config_defaults() {
        let config = SolverConfig::default();
        assert_eq!(config.iterations, 1);
        assert_eq!(config.sq_threshold, DEFAULT_SQ_THRESHOLD);
        assert!(config.constraints_enabled);
    }

    #[test]
    fn invalid_settings_fall_back() {
        let tree = BoneTree::straight_chain(&[1.0], Vec3::Y);
        let mut solver = IkSolver::fabrik(&tree);
        solver.set_iterations(0);
        assert_eq!(solver.iterations(), 1);
        solver.set_iterations(12);
        assert_eq!(solver.iterations(), 12);

        for bad in [f32::NAN, f32::INFINITY, -1.0] {
            solver.set_sq_threshold(bad);
            assert_eq!(solver.sq_threshold(), FALLBACK_SQ_THRESHOLD);
        }
        solver.set_sq_threshold(0.0);
        assert_eq!(solver.sq_threshold(), 0.0);

        let config = SolverConfig {
            iterations: 0,
            sq_threshold: f32::NAN,
            constraints_enabled: false,
        }
        .sanitized();
        assert_eq!(config.iterations, 1);
        assert_eq!(config.sq_threshold, FALLBACK_SQ_THRESHOLD);
        assert!(!config.constraints_enabled);
    }

    #[test]
    fn mismatched_skeleton_is_left_alone() {
        let tree = BoneTree::straight_chain(&[1.0, 1.0], Vec3::Y);
        let mut solver = IkSolver::fabrik(&tree);
        solver
            .create_chain("arm", &[2, 1, 0], &[], Vec3::new(1.0, 1.0, 0.0))
            .unwrap();

        let mut other = BoneTree::straight_chain(&[1.0], Vec3::Y);
        let result = solver.update(&mut other);
        assert_eq!(result.iterations, 0);
        assert!(!result.converged);
        assert_eq!(other.local_rotation(1), Quat::IDENTITY);
    }

    #[test]
    fn no_chains_is_trivially_converged() {
        let mut tree = BoneTree::straight_chain(&[1.0], Vec3::Y);
        let mut solver = IkSolver::ccd(&tree);
        let result = solver.update(&mut tree);
        assert!(result.converged);
        assert_eq!(result.iterations, 1);
        assert_eq!(result.worst_sq_distance, 0.0);
    }

    #[test]
    fn algorithm_switch_keeps_chains() {
        let tree = BoneTree::straight_chain(&[1.0, 1.0], Vec3::Y);
        let mut solver = IkSolver::fabrik(&tree);
        let queue = EventQueue::new();
        solver.subscribe(queue.clone());
        solver.create_chain("arm", &[2, 1, 0], &[], Vec3::X).unwrap();
        solver.set_algorithm(Algorithm::Ccd);
        assert_eq!(solver.algorithm(), Algorithm::Ccd);
        assert_eq!(solver.chain_names().collect::<Vec<_>>(), vec!["arm"]);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn commit_keeps_existing_twist() {
        let mut tree = BoneTree::straight_chain(&[1.0, 1.0], Vec3::Y);
        let mut solver = IkSolver::fabrik(&tree);
        solver.create_chain("arm", &[2, 1, 0], &[], Vec3::X).unwrap();
        let chain = solver.chain("arm").unwrap();

        // joint 1 starts twisted about its bone axis
        tree.set_local_rotation(1, Quat::from_rotation_y(0.4));
        tree.update_world_matrix(1);

        // proposed rotation adds more twist and a bend
        let proposed = Quat::from_rotation_z(0.3) * Quat::from_rotation_y(1.0);
        assert!(commit_joint(&mut tree, solver.bind_pose(), chain, 1, proposed, true));

        let committed = tree.local_rotation(1);
        let (_, twist) = swing_twist(committed, Vec3::Y);
        let expected = Quat::from_rotation_y(0.4);
        assert!(twist.abs_diff_eq(expected, 1e-5) || twist.abs_diff_eq(-expected, 1e-5));
        // child direction follows the proposed rotation
        assert!((committed * Vec3::Y).abs_diff_eq(proposed * Vec3::Y, 1e-5));
    }

    #[test]
    fn commit_rejects_nan() {
        let mut tree = BoneTree::straight_chain(&[1.0, 1.0], Vec3::Y);
        let mut solver = IkSolver::fabrik(&tree);
        solver.create_chain("arm", &[2, 1, 0], &[], Vec3::X).unwrap();
        let chain = solver.chain("arm").unwrap();
        let nan = Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0);
        assert!(!commit_joint(&mut tree, solver.bind_pose(), chain, 1, nan, true));
        assert_eq!(tree.local_rotation(1), Quat::IDENTITY);
    }
}
