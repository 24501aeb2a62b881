//! Target providers
//!
//! A chain reads its goal through [`Target`] at the start of every solve, so
//! the goal can be a fixed point, a handle an editor moves from another
//! thread, or a spring that follows such a handle.

use crate::math::Vec3;
use std::f32::consts::PI;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

/// World-space goal of a chain's end effector.
pub trait Target: Send + Sync + Debug {
    fn world_position(&self) -> Vec3;
}

impl Target for Vec3 {
    fn world_position(&self) -> Vec3 {
        *self
    }
}

/// Cloneable handle to a movable point. Every clone sees the same position.
#[derive(Debug, Clone, Default)]
pub struct SharedTarget {
    position: Arc<RwLock<Vec3>>,
}

impl SharedTarget {
    pub fn new(position: Vec3) -> Self {
        Self {
            position: Arc::new(RwLock::new(position)),
        }
    }

    pub fn set(&self, position: Vec3) {
        *self.position.write().unwrap_or_else(PoisonError::into_inner) = position;
    }

    pub fn get(&self) -> Vec3 {
        *self.position.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Target for SharedTarget {
    fn world_position(&self) -> Vec3 {
        self.get()
    }
}

/// Tuning presets as `(frequency, damping, response)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpringPreset {
    Snappy,
    Smooth,
    Bouncy,
    Sluggish,
    Anticipate,
}

impl SpringPreset {
    pub fn params(self) -> (f32, f32, f32) {
        match self {
            SpringPreset::Snappy => (4.0, 0.5, 2.0),
            SpringPreset::Smooth => (2.0, 1.0, 0.0),
            SpringPreset::Bouncy => (3.0, 0.3, 1.0),
            SpringPreset::Sluggish => (1.0, 1.5, 0.0),
            SpringPreset::Anticipate => (3.0, 0.8, -0.5),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Spring {
    position: Vec3,
    velocity: Vec3,
    previous_goal: Vec3,
    k1: f32,
    k2: f32,
    k3: f32,
}

impl Spring {
    fn coefficients(frequency: f32, damping: f32, response: f32) -> (f32, f32, f32) {
        let frequency = frequency.max(1e-3);
        let omega = 2.0 * PI * frequency;
        (
            damping / (PI * frequency),
            1.0 / (omega * omega),
            response * damping / (2.0 * PI * frequency),
        )
    }

    /// Semi-implicit Euler step. `k2` is raised to the smallest value that
    /// keeps the step stable for this `dt`.
    fn step(&mut self, goal: Vec3, dt: f32) -> Vec3 {
        if dt.is_nan() || dt <= 0.0 || !goal.is_finite() {
            return self.position;
        }
        let goal_velocity = (goal - self.previous_goal) / dt;
        self.previous_goal = goal;

        let k2 = self
            .k2
            .max(dt * dt / 2.0 + dt * self.k1 / 2.0)
            .max(dt * self.k1);

        self.position += self.velocity * dt;
        let accel =
            (goal + goal_velocity * self.k3 - self.position - self.velocity * self.k1) / k2;
        self.velocity += accel * dt;
        self.position
    }
}

/// Spring-smoothed target.
///
/// Clones share state: hand one clone to a chain and keep another to call
/// [`advance`](Self::advance) with the raw goal once per frame.
#[derive(Debug, Clone)]
pub struct SmoothedTarget {
    spring: Arc<RwLock<Spring>>,
}

impl SmoothedTarget {
    /// `frequency` in Hz, `damping` 1.0 for critical damping, `response`
    /// below zero anticipates and above one overshoots.
    pub fn new(frequency: f32, damping: f32, response: f32, initial: Vec3) -> Self {
        let (k1, k2, k3) = Spring::coefficients(frequency, damping, response);
        Self {
            spring: Arc::new(RwLock::new(Spring {
                position: initial,
                velocity: Vec3::ZERO,
                previous_goal: initial,
                k1,
                k2,
                k3,
            })),
        }
    }

    pub fn from_preset(preset: SpringPreset, initial: Vec3) -> Self {
        let (f, z, r) = preset.params();
        Self::new(f, z, r, initial)
    }

    pub fn set_parameters(&self, frequency: f32, damping: f32, response: f32) {
        let (k1, k2, k3) = Spring::coefficients(frequency, damping, response);
        let mut spring = self.spring.write().unwrap_or_else(PoisonError::into_inner);
        spring.k1 = k1;
        spring.k2 = k2;
        spring.k3 = k3;
    }

    /// Moves the smoothed point towards `goal` over `dt` seconds and returns
    /// its new position. Non-positive `dt` leaves it in place.
    pub fn advance(&self, goal: Vec3, dt: f32) -> Vec3 {
        self.spring
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .step(goal, dt)
    }

    /// Snaps to `position` with zero velocity.
    pub fn reset(&self, position: Vec3) {
        let mut spring = self.spring.write().unwrap_or_else(PoisonError::into_inner);
        spring.position = position;
        spring.velocity = Vec3::ZERO;
        spring.previous_goal = position;
    }

    pub fn velocity(&self) -> Vec3 {
        self.spring
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .velocity
    }
}

impl Target for SmoothedTarget {
    fn world_position(&self) -> Vec3 {
        self.spring
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .position
    }
}
