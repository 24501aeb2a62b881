//! # skeletal-ik
//!
//! Inverse kinematics for articulated skeletons: poses chains of bones so
//! their end effectors reach world-space targets while every joint stays
//! inside its rotation limits.
//!
//! ## Features
//! - FABRIK (Forward And Backward Reaching Inverse Kinematics) and CCD
//!   (Cyclic Coordinate Descent) solvers, switchable at runtime
//! - Twist/swing joint constraints: omni, hinge and ball-socket, with
//!   limits that may wrap around 0/2π
//! - Works on any scene graph through the [`Skeleton`] trait; [`BoneTree`]
//!   is a ready-made one
//! - Change events for editors, fixed or shared or spring-smoothed targets
//!
//! ## Example
//! ```rust
//! use skeletal_ik::ik::{ConstraintSpec, IkSolver};
//! use skeletal_ik::skeleton::{BoneTree, Skeleton};
//! use glam::{Quat, Vec3};
//! use std::f32::consts::FRAC_PI_2;
//!
//! // root + three unit bones along +Y, slightly bent
//! let mut skeleton = BoneTree::straight_chain(&[1.0, 1.0, 1.0], Vec3::Y);
//! skeleton.set_local_rotation(1, Quat::from_rotation_z(0.4));
//! skeleton.update_world_matrix(1);
//!
//! let mut solver = IkSolver::fabrik(&skeleton);
//! solver.set_iterations(10);
//! let elbow = ConstraintSpec::hinge()
//!     .with_axis(Vec3::Z)
//!     .with_limits(0.0, FRAC_PI_2);
//! solver
//!     .create_chain("arm", &[3, 2, 1, 0], &[None, None, Some(elbow)], Vec3::new(1.0, 1.5, 0.0))
//!     .unwrap();
//!
//! let result = solver.update(&mut skeleton);
//! println!("converged: {}, iterations: {}", result.converged, result.iterations);
//! ```

pub mod error;
pub mod ik;
pub mod math;
pub mod skeleton;

pub use error::{IkError, IkResult};
pub use ik::{
    Algorithm, ConstraintKind, ConstraintSpec, IkEvent, IkSolver, SolveResult, SolverConfig,
    Target,
};
pub use math::Transform;
pub use skeleton::{BoneTree, Skeleton};
