//! Inverse kinematics module
//!
//! Bind-pose cache, joint constraints, the chain registry and the FABRIK and
//! CCD solvers that drive them.

pub mod bind;
mod ccd;
pub mod chain;
pub mod constraint;
pub mod events;
mod fabrik;
pub mod solver;
pub mod target;

pub use bind::{BindInfo, BindPose};
pub use chain::{Chain, ChainRegistry};
pub use constraint::{
    swing_twist, twist_angle, BallSocketLimit, ConstraintKind, ConstraintSpec, HingeLimit,
    JointConstraint, SwingConstraint, SwingFrame, SwingLimit,
};
pub use events::{EventQueue, IkEvent, IkObserver};
pub use solver::{solve_mixed, Algorithm, IkSolver, SolveResult, SolverConfig};
pub use target::{SharedTarget, SmoothedTarget, SpringPreset, Target};
