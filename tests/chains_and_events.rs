//! Integration tests: chain bookkeeping through `IkSolver`, change events and
//! running several solvers on one skeleton.

use glam::{Quat, Vec3};
use skeletal_ik::ik::{
    solve_mixed, Algorithm, ConstraintKind, ConstraintSpec, EventQueue, IkEvent, IkSolver,
};
use skeletal_ik::skeleton::{BoneTree, Skeleton};
use skeletal_ik::IkError;
use std::sync::{Arc, Mutex};

fn arm() -> BoneTree {
    let mut tree = BoneTree::straight_chain(&[1.0, 1.0, 1.0], Vec3::Y);
    tree.set_local_rotation(1, Quat::from_rotation_z(0.4));
    tree.update_world_matrix(1);
    tree
}

fn rotations(tree: &BoneTree) -> Vec<Quat> {
    (0..tree.bone_count()).map(|b| tree.local_rotation(b)).collect()
}

#[test]
fn lifecycle_events_in_order() {
    let tree = arm();
    let mut solver = IkSolver::fabrik(&tree);
    let queue = EventQueue::new();
    solver.subscribe(queue.clone());

    solver.create_chain("arm", &[3, 2, 1, 0], &[], Vec3::X).unwrap();
    solver.create_chain("tip", &[3, 2], &[], Vec3::Y).unwrap();
    solver
        .set_constraint("arm", 2, Some(ConstraintSpec::ball_socket().with_polar(0.0, 1.0)))
        .unwrap();
    solver.remove_chain("tip").unwrap();
    solver.remove_all_chains();

    assert_eq!(
        queue.drain(),
        vec![
            IkEvent::ChainCreated {
                chain: "arm".into()
            },
            IkEvent::ChainCreated {
                chain: "tip".into()
            },
            IkEvent::ConstraintChanged {
                chain: "arm".into(),
                index: 2,
                bone: 1,
                kind: Some(ConstraintKind::BallSocket),
            },
            IkEvent::ChainDestroyed {
                chain: "tip".into()
            },
            IkEvent::ChainsCleared,
        ]
    );
}

#[test]
fn solving_emits_no_events() {
    let mut tree = arm();
    let mut solver = IkSolver::ccd(&tree);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    solver.subscribe(move |event: &IkEvent| sink.lock().unwrap().push(event.clone()));

    solver
        .create_chain("arm", &[3, 2, 1, 0], &[], Vec3::new(1.0, 1.5, 0.0))
        .unwrap();
    solver.set_iterations(10);
    solver.update(&mut tree);
    solver.update(&mut tree);

    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[test]
fn failed_operations_change_nothing() {
    let tree = arm();
    let mut solver = IkSolver::fabrik(&tree);
    let queue = EventQueue::new();
    solver.subscribe(queue.clone());
    solver.create_chain("arm", &[3, 2, 1], &[], Vec3::X).unwrap();
    queue.drain();

    assert_eq!(
        solver.create_chain("arm", &[2, 1], &[], Vec3::X),
        Err(IkError::DuplicateChain("arm".into()))
    );
    assert_eq!(
        solver.create_chain("leg", &[3, 1], &[], Vec3::X),
        Err(IkError::NotParent {
            child: 3,
            expected_parent: 1
        })
    );
    assert_eq!(
        solver.set_constraint("arm", 0, Some(ConstraintSpec::hinge())),
        Err(IkError::ConstraintIndexOutOfRange { index: 0, len: 3 })
    );
    assert_eq!(
        solver.remove_chain("leg"),
        Err(IkError::UnknownChain("leg".into()))
    );
    assert!(solver.set_chain_target("leg", Vec3::Z).is_err());

    assert_eq!(solver.chain_names().collect::<Vec<_>>(), vec!["arm"]);
    assert!(solver.chain("arm").unwrap().constraint(1).is_none());
    assert!(queue.is_empty());
}

#[test]
fn constraint_kind_changes_replace_same_kind_updates() {
    let tree = arm();
    let mut solver = IkSolver::fabrik(&tree);
    solver.create_chain("arm", &[3, 2, 1, 0], &[], Vec3::X).unwrap();

    let hinge = ConstraintSpec::hinge().with_limits(0.0, 1.0);
    assert_eq!(
        solver.set_constraint("arm", 1, Some(hinge)).unwrap(),
        Some(ConstraintKind::Hinge)
    );
    assert_eq!(
        solver
            .set_constraint("arm", 1, Some(hinge.with_limits(0.0, 2.0)))
            .unwrap(),
        Some(ConstraintKind::Hinge)
    );
    assert_eq!(
        solver
            .set_constraint("arm", 1, Some(ConstraintSpec::omni().with_twist(0.0, 0.5)))
            .unwrap(),
        Some(ConstraintKind::Omni)
    );
    let constraint = solver.chain("arm").unwrap().constraint(1).unwrap();
    assert_eq!(constraint.kind(), ConstraintKind::Omni);
    assert!(constraint.twist_range().is_some());
}

#[test]
fn mixed_solvers_compose_in_order() {
    let target = Vec3::new(1.2, 1.5, 0.3);
    let setup = |tree: &BoneTree, algorithm| {
        let mut solver = IkSolver::new(tree, algorithm);
        solver.set_iterations(2);
        solver
            .create_chain(
                "arm",
                &[3, 2, 1, 0],
                &[None, Some(ConstraintSpec::omni().with_twist(-0.2, 0.2))],
                target,
            )
            .unwrap();
        solver
    };

    let mut mixed = arm();
    let mut fabrik = setup(&mixed, Algorithm::Fabrik);
    let mut ccd = setup(&mixed, Algorithm::Ccd);
    let results = solve_mixed(&mut [&mut fabrik, &mut ccd], &mut mixed);
    assert_eq!(results.len(), 2);

    let mut sequential = arm();
    let mut fabrik = setup(&sequential, Algorithm::Fabrik);
    let mut ccd = setup(&sequential, Algorithm::Ccd);
    let first = fabrik.update(&mut sequential);
    let second = ccd.update(&mut sequential);

    assert_eq!(rotations(&mixed), rotations(&sequential));
    assert_eq!(results, vec![first, second]);
}

#[test]
fn switching_algorithm_keeps_chains() {
    let mut tree = arm();
    let target = Vec3::new(-1.0, 2.0, 0.0);
    let mut solver = IkSolver::fabrik(&tree);
    solver.create_chain("arm", &[3, 2, 1, 0], &[], target).unwrap();
    solver.set_iterations(100);
    solver.set_sq_threshold(1e-6);

    solver.set_algorithm(Algorithm::Ccd);
    let result = solver.update(&mut tree);
    assert_eq!(solver.algorithm(), Algorithm::Ccd);
    assert!(result.converged, "{result:?}");
    assert_eq!(solver.chains().len(), 1);
}

#[test]
fn skeleton_with_extra_bones_is_skipped() {
    let tree = arm();
    let mut solver = IkSolver::fabrik(&tree);
    solver.create_chain("arm", &[3, 2, 1, 0], &[], Vec3::X).unwrap();

    let mut bigger = BoneTree::straight_chain(&[1.0, 1.0, 1.0, 1.0], Vec3::Y);
    let before = rotations(&bigger);
    let result = solver.update(&mut bigger);
    assert_eq!(result.iterations, 0);
    assert!(!result.converged);
    assert_eq!(rotations(&bigger), before);
}
