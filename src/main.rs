use glam::{Quat, Vec3};
use skeletal_ik::ik::{
    solve_mixed, Algorithm, ConstraintSpec, IkSolver, SmoothedTarget, SolveResult, SpringPreset,
};
use skeletal_ik::math::Transform;
use skeletal_ik::skeleton::{BoneTree, Skeleton};
use skeletal_ik::IkResult;
use std::f32::consts::{FRAC_PI_2, TAU};

const FRAMES: usize = 300;
const DT: f32 = 1.0 / 60.0;

#[derive(Debug, Clone, Default)]
struct Stats {
    frames: usize,
    converged: usize,
    iterations: u64,
    worst_distance: f32,
}

impl Stats {
    fn record(&mut self, result: &SolveResult) {
        self.frames += 1;
        self.iterations += u64::from(result.iterations);
        if result.converged {
            self.converged += 1;
        }
        self.worst_distance = self.worst_distance.max(result.worst_sq_distance.sqrt());
    }
}

fn build_arm() -> IkResult<BoneTree> {
    BoneTree::builder()
        .add_root("shoulder", Transform::from_position(Vec3::new(0.0, 1.5, 0.0)))
        .add_bone("upper_arm", 0, Transform::from_position(Vec3::new(0.0, 0.3, 0.0)))
        .add_bone("forearm", 1, Transform::from_position(Vec3::new(0.0, 0.6, 0.0)))
        .add_bone("hand", 2, Transform::from_position(Vec3::new(0.0, 0.5, 0.0)))
        .build()
}

fn make_solver(
    skeleton: &BoneTree,
    algorithm: Algorithm,
    name: &str,
    target: &SmoothedTarget,
) -> IkResult<IkSolver> {
    let mut solver = IkSolver::new(skeleton, algorithm);
    solver.set_iterations(8);
    solver.set_sq_threshold(1e-6);

    let elbow = ConstraintSpec::hinge()
        .with_axis(-Vec3::X)
        .with_limits(0.0, 2.6);
    let shoulder = ConstraintSpec::ball_socket()
        .with_polar(0.0, FRAC_PI_2 + 0.3)
        .with_twist(-0.5, 0.5);
    let chain = ["hand", "forearm", "upper_arm", "shoulder"]
        .map(|bone| skeleton.find_bone(bone).unwrap_or(0));
    solver.create_chain(
        name,
        &chain,
        &[None, Some(elbow), Some(shoulder), None],
        target.clone(),
    )?;
    Ok(solver)
}

fn goal_at(frame: usize) -> Vec3 {
    let t = frame as f32 / FRAMES as f32 * TAU;
    Vec3::new(0.6 * t.cos(), 2.2 + 0.4 * (2.0 * t).sin(), 0.6 * t.sin() + 0.3)
}

fn run(label: &str, solvers: &mut [&mut IkSolver], target: &SmoothedTarget) -> IkResult<()> {
    let mut skeleton = build_arm()?;
    // slightly bent elbow
    skeleton.set_local_rotation(2, Quat::from_rotation_x(-0.2));
    skeleton.update_world_matrix(2);
    target.reset(goal_at(0));

    let mut stats = vec![Stats::default(); solvers.len()];
    for frame in 0..FRAMES {
        target.advance(goal_at(frame), DT);
        let results = solve_mixed(solvers, &mut skeleton);
        for (stats, result) in stats.iter_mut().zip(&results) {
            stats.record(result);
        }
    }

    for (i, stats) in stats.iter().enumerate() {
        log::info!(
            "{label} [{i}]: {}/{} frames converged, {:.2} iterations per frame, worst distance {:.4}",
            stats.converged,
            stats.frames,
            stats.iterations as f32 / stats.frames.max(1) as f32,
            stats.worst_distance
        );
    }
    log::info!(
        "{label}: hand ended at {:?}",
        skeleton.world_position(skeleton.find_bone("hand").unwrap_or(0))
    );
    Ok(())
}

fn main() -> IkResult<()> {
    #[cfg(not(target_arch = "wasm32"))]
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let arm = build_arm()?;
    let target = SmoothedTarget::from_preset(SpringPreset::Smooth, goal_at(0));

    let mut fabrik = make_solver(&arm, Algorithm::Fabrik, "arm", &target)?;
    let mut ccd = make_solver(&arm, Algorithm::Ccd, "arm", &target)?;

    run("fabrik", &mut [&mut fabrik], &target)?;
    run("ccd", &mut [&mut ccd], &target)?;
    run("mix", &mut [&mut fabrik, &mut ccd], &target)?;
    Ok(())
}
