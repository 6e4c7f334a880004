//! Camera focus controller for the forest view.
//!
//! Two states: Overview (slow auto-rotation around the scene centre) and
//! Focused(tree) (anchored near one tree, rotation suspended). Every
//! transition starts from the pose the camera actually has at that instant,
//! so retargeting mid-flight never jumps.

use std::f32::consts::PI;
use std::ops::{Add, Mul, Sub};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::animation::{Animator, CancelToken, Lerp, Tween};
use crate::models::Tree;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        (*self - other).length()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Lerp for Vec3 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

/// Camera position plus the point it looks at
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pose {
    pub position: Vec3,
    pub target: Vec3,
}

impl Lerp for Pose {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        Pose {
            position: Vec3::lerp(from.position, to.position, t),
            target: Vec3::lerp(from.target, to.target, t),
        }
    }
}

impl Pose {
    /// Distance between camera and look-at target
    pub fn distance(&self) -> f32 {
        self.position.distance(self.target)
    }
}

/// Allowed camera-to-target distance
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomBounds {
    pub min: f32,
    pub max: f32,
}

impl ZoomBounds {
    pub fn clamp(&self, distance: f32) -> f32 {
        distance.clamp(self.min, self.max)
    }
}

pub const OVERVIEW_POSE: Pose = Pose {
    position: Vec3::new(0.0, 8.0, 8.0),
    target: Vec3::ZERO,
};
/// Camera offset from a focused tree's ground position
pub const FOCUS_OFFSET: Vec3 = Vec3::new(1.5, 1.2, 1.5);
/// Look-at height on the trunk
pub const TRUNK_LOOK_HEIGHT: f32 = 0.5;
pub const TRANSITION_DURATION: Duration = Duration::from_millis(1000);
pub const FOCUSED_ZOOM: ZoomBounds = ZoomBounds { min: 0.8, max: 8.0 };
pub const OVERVIEW_ZOOM: ZoomBounds = ZoomBounds { min: 2.0, max: 20.0 };
/// Orbit-control convention: 0.5 means one turn every 120s
pub const AUTO_ROTATE_SPEED: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tree_id", rename_all = "lowercase")]
pub enum Focus {
    Overview,
    Tree(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    /// The transition toward `Focus` completed and zoom bounds were applied
    TargetReached(Focus),
}

/// Destination pose for a focused tree
pub fn focus_pose(tree: &Tree) -> Pose {
    let ground = tree.ground_position();
    Pose {
        position: ground + FOCUS_OFFSET,
        target: Vec3::new(ground.x, TRUNK_LOOK_HEIGHT, ground.z),
    }
}

fn zoom_for(focus: Focus) -> ZoomBounds {
    match focus {
        Focus::Overview => OVERVIEW_ZOOM,
        Focus::Tree(_) => FOCUSED_ZOOM,
    }
}

#[derive(Debug)]
pub struct CameraController {
    pose: Pose,
    zoom: ZoomBounds,
    focus: Focus,
    animator: Animator<Pose>,
    auto_rotate_speed: f32,
    last_tick: Option<Instant>,
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            pose: OVERVIEW_POSE,
            zoom: OVERVIEW_ZOOM,
            focus: Focus::Overview,
            animator: Animator::new(),
            auto_rotate_speed: AUTO_ROTATE_SPEED,
            last_tick: None,
        }
    }

    pub fn with_auto_rotate_speed(mut self, speed: f32) -> Self {
        self.auto_rotate_speed = speed;
        self
    }

    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn zoom_bounds(&self) -> ZoomBounds {
        self.zoom
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn is_animating(&self) -> bool {
        self.animator.is_running()
    }

    pub fn is_auto_rotating(&self) -> bool {
        self.focus == Focus::Overview && !self.animator.is_running()
    }

    /// Pose the running transition is heading to
    pub fn destination(&self) -> Option<Pose> {
        self.animator.target()
    }

    pub fn focus_tree(&mut self, tree: &Tree, now: Instant) -> CancelToken {
        self.transition(Focus::Tree(tree.id), focus_pose(tree), now)
    }

    pub fn focus_overview(&mut self, now: Instant) -> CancelToken {
        self.transition(Focus::Overview, OVERVIEW_POSE, now)
    }

    fn transition(&mut self, focus: Focus, destination: Pose, now: Instant) -> CancelToken {
        // Commit the mid-flight pose before the old tween is cancelled
        if let Some(current) = self.animator.peek(now) {
            self.pose = current;
        }
        log::debug!("[Camera] {:?} -> {:?}, start {:?}", self.focus, focus, self.pose.position);

        self.focus = focus;
        self.last_tick = Some(now);
        self.animator.run(Tween::new(self.pose, destination, TRANSITION_DURATION, now))
    }

    /// Advance one frame. Returns `TargetReached` on the frame a transition
    /// completes.
    pub fn tick(&mut self, now: Instant) -> Option<CameraEvent> {
        let dt = self.last_tick
            .map(|last| now.saturating_duration_since(last))
            .unwrap_or(Duration::ZERO);
        self.last_tick = Some(now);

        if let Some(sample) = self.animator.sample(now) {
            self.pose = sample.value;
            if sample.finished {
                self.zoom = zoom_for(self.focus);
                self.clamp_distance();
                log::debug!("[Camera] Reached {:?}, zoom {:?}", self.focus, self.zoom);
                return Some(CameraEvent::TargetReached(self.focus));
            }
            return None;
        }

        if self.focus == Focus::Overview {
            self.auto_rotate(dt);
        }
        None
    }

    /// Scale the camera distance by `factor`, clamped to the zoom bounds.
    /// Ignored while a transition owns the camera.
    pub fn zoom(&mut self, factor: f32) {
        if self.animator.is_running() || factor <= 0.0 {
            return;
        }
        self.set_distance(self.pose.distance() * factor);
    }

    /// Stop any transition; later ticks will not move the camera toward it
    pub fn teardown(&mut self) {
        self.animator.cancel();
        self.last_tick = None;
    }

    fn clamp_distance(&mut self) {
        self.set_distance(self.pose.distance());
    }

    fn set_distance(&mut self, distance: f32) {
        let offset = self.pose.position - self.pose.target;
        let current = offset.length();
        if current <= f32::EPSILON {
            return;
        }
        let clamped = self.zoom.clamp(distance);
        self.pose.position = self.pose.target + offset * (clamped / current);
    }

    fn auto_rotate(&mut self, dt: Duration) {
        if self.auto_rotate_speed == 0.0 || dt.is_zero() {
            return;
        }
        let angle = 2.0 * PI / 60.0 * self.auto_rotate_speed * dt.as_secs_f32();
        let offset = self.pose.position - self.pose.target;
        let radius = (offset.x * offset.x + offset.z * offset.z).sqrt();
        let theta = offset.x.atan2(offset.z) - angle;
        self.pose.position = self.pose.target + Vec3::new(radius * theta.sin(), offset.y, radius * theta.cos());
    }
}
