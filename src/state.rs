//! Shape/state controller.
//!
//! A timed state machine that drives the behaviour switches of the simulation
//! kernel and the renderer:
//!
//! ```text
//!  Absorbing ──(absorb_duration)──▶ HeartShape | StarShape ──(shape_duration)──▶ Normal
//!      ▲                                                                        │
//!      └──────────────────── begin_absorb(target) ◀───────────────────────────────┘
//! ```
//!
//! `Normal` never leaves on its own. [`ShapeController::reset`] forces `Normal`
//! from any state. Every transition zeroes the state clock.

use glam::{Vec3, Vec4};

use crate::spawn::DEFAULT_HEART_SCALE;

const BASE_SPRITE_SIZE: f32 = 0.015;
const SPRITE_BREATH_AMPLITUDE: f32 = 0.005;
const BASE_PARTICLE_SCALE: f32 = 1.0;
const SCALE_BREATH_AMPLITUDE: f32 = 0.1;
const BREATH_SPEED: f32 = 2.0;

/// Discrete particle behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParticleState {
    /// Idle drift through the noise field, optional attractor.
    #[default]
    Normal,
    /// Collapse toward the origin before forming a shape.
    Absorbing,
    /// Settle onto the heart curve.
    HeartShape,
    /// Settle onto the five-pointed star.
    StarShape,
}

impl ParticleState {
    /// Numeric code written into the shader parameter block.
    pub fn code(self) -> u32 {
        match self {
            ParticleState::Normal => 0,
            ParticleState::Absorbing => 1,
            ParticleState::HeartShape => 2,
            ParticleState::StarShape => 3,
        }
    }
}

/// Shape reached at the end of an absorb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShapeTarget {
    #[default]
    Heart,
    Star,
}

impl From<ShapeTarget> for ParticleState {
    fn from(target: ShapeTarget) -> Self {
        match target {
            ShapeTarget::Heart => ParticleState::HeartShape,
            ShapeTarget::Star => ParticleState::StarShape,
        }
    }
}

/// How long the timed states last, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShapeTimings {
    /// Time spent in `Absorbing` before the target shape forms.
    pub absorb_duration: f32,
    /// Time a shape is held before returning to `Normal`. Shared by heart and star.
    pub shape_duration: f32,
}

impl Default for ShapeTimings {
    fn default() -> Self {
        Self {
            absorb_duration: 2.0,
            shape_duration: 5.0,
        }
    }
}

/// Attractor path and strength.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttractorSettings {
    /// Pull strength while enabled in `Normal`.
    pub strength: f32,
    /// Angular speed of the orbit, in radians per second of run time.
    pub speed: f32,
}

impl Default for AttractorSettings {
    fn default() -> Self {
        Self {
            strength: 0.0002,
            speed: 0.2,
        }
    }
}

/// Per-frame values the controller hands to the parameter block.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameState {
    pub state: ParticleState,
    /// Seconds since the current state was entered (0 in `Normal`).
    pub state_time: f32,
    /// Length of the current timed state (0 in `Normal`).
    pub state_duration: f32,
    pub sprite_size: f32,
    pub particle_scale: f32,
    /// `xyz` position, `w` strength (0 = disabled).
    pub attractor: Vec4,
    pub heart_scale: f32,
}

/// Timed state machine for the particle behaviour.
#[derive(Debug, Clone)]
pub struct ShapeController {
    state: ParticleState,
    target: ShapeTarget,
    state_time: f32,
    run_time: f32,
    timings: ShapeTimings,
    attractor: AttractorSettings,
    attractor_enabled: bool,
}

impl ShapeController {
    /// Controller in its start-up state, `HeartShape`.
    pub fn new(timings: ShapeTimings, attractor: AttractorSettings) -> Self {
        Self {
            state: ParticleState::HeartShape,
            target: ShapeTarget::Heart,
            state_time: 0.0,
            run_time: 0.0,
            timings,
            attractor,
            attractor_enabled: false,
        }
    }

    /// Current state.
    pub fn state(&self) -> ParticleState {
        self.state
    }

    /// Seconds since the last transition.
    pub fn state_time(&self) -> f32 {
        self.state_time
    }

    /// Seconds accumulated since start or the last reset.
    pub fn run_time(&self) -> f32 {
        self.run_time
    }

    /// Shape the next absorb resolves into.
    pub fn target(&self) -> ShapeTarget {
        self.target
    }

    /// Whether the attractor is switched on.
    pub fn attractor_enabled(&self) -> bool {
        self.attractor_enabled
    }

    /// Flip the attractor switch. It only pulls while in `Normal`.
    pub fn toggle_attractor(&mut self) -> bool {
        self.attractor_enabled = !self.attractor_enabled;
        self.attractor_enabled
    }

    /// Force `Normal` and restart both clocks.
    pub fn reset(&mut self) {
        self.enter(ParticleState::Normal);
        self.run_time = 0.0;
    }

    /// Record `target` and start absorbing toward it.
    pub fn begin_absorb(&mut self, target: ShapeTarget) {
        self.target = target;
        self.enter(ParticleState::Absorbing);
    }

    fn enter(&mut self, state: ParticleState) {
        if state != self.state {
            log::debug!("particle state {:?} -> {:?}", self.state, state);
        }
        self.state = state;
        self.state_time = 0.0;
    }

    /// Duration of `state`, zero for the untimed `Normal`.
    fn duration_of(&self, state: ParticleState) -> f32 {
        match state {
            ParticleState::Normal => 0.0,
            ParticleState::Absorbing => self.timings.absorb_duration,
            ParticleState::HeartShape | ParticleState::StarShape => self.timings.shape_duration,
        }
    }

    /// Advance by `delta_time` seconds and produce this frame's values.
    ///
    /// The state clock advances before the transition check, so a transition
    /// lands on the exact frame the duration is reached and that frame
    /// reports the new state with a zero clock.
    pub fn tick(&mut self, delta_time: f32) -> FrameState {
        self.state_time += delta_time;

        match self.state {
            ParticleState::Absorbing if self.state_time >= self.timings.absorb_duration => {
                self.enter(self.target.into());
            }
            ParticleState::HeartShape | ParticleState::StarShape
                if self.state_time >= self.timings.shape_duration =>
            {
                self.enter(ParticleState::Normal);
            }
            _ => {}
        }

        let frame = self.frame_state();
        self.run_time += delta_time;
        frame
    }

    fn frame_state(&self) -> FrameState {
        let t = self.run_time;
        let breath = (t * BREATH_SPEED).sin();
        let orbit = t * self.attractor.speed;
        let attractor_position = Vec3::new(orbit.sin(), (orbit * 1.3).sin(), orbit.cos());

        match self.state {
            ParticleState::Normal => {
                let strength = if self.attractor_enabled {
                    self.attractor.strength
                } else {
                    0.0
                };
                FrameState {
                    state: ParticleState::Normal,
                    state_time: 0.0,
                    state_duration: 0.0,
                    sprite_size: BASE_SPRITE_SIZE + breath * SPRITE_BREATH_AMPLITUDE,
                    particle_scale: BASE_PARTICLE_SCALE + breath * SCALE_BREATH_AMPLITUDE,
                    attractor: attractor_position.extend(strength),
                    heart_scale: DEFAULT_HEART_SCALE,
                }
            }
            state => FrameState {
                state,
                state_time: self.state_time,
                state_duration: self.duration_of(state),
                sprite_size: BASE_SPRITE_SIZE,
                particle_scale: BASE_PARTICLE_SCALE,
                attractor: attractor_position.extend(0.0),
                heart_scale: DEFAULT_HEART_SCALE,
            },
        }
    }
}

impl Default for ShapeController {
    fn default() -> Self {
        Self::new(ShapeTimings::default(), AttractorSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_heart_shape() {
        let c = ShapeController::default();
        assert_eq!(c.state(), ParticleState::HeartShape);
        assert_eq!(c.state_time(), 0.0);
    }

    #[test]
    fn test_state_codes() {
        assert_eq!(ParticleState::Normal.code(), 0);
        assert_eq!(ParticleState::Absorbing.code(), 1);
        assert_eq!(ParticleState::HeartShape.code(), 2);
        assert_eq!(ParticleState::StarShape.code(), 3);
    }

    #[test]
    fn test_heart_returns_to_normal() {
        let mut c = ShapeController::default();
        for _ in 0..9 {
            c.tick(0.5);
        }
        assert_eq!(c.state(), ParticleState::HeartShape);
        let frame = c.tick(0.5);
        assert_eq!(frame.state, ParticleState::Normal);
        assert_eq!(c.state_time(), 0.0);
    }

    #[test]
    fn test_star_uses_shared_shape_duration() {
        let mut c = ShapeController::default();
        c.begin_absorb(ShapeTarget::Star);
        for _ in 0..4 {
            c.tick(0.5);
        }
        assert_eq!(c.state(), ParticleState::StarShape);
        c.tick(4.9);
        assert_eq!(c.state(), ParticleState::StarShape);
        c.tick(0.1);
        assert_eq!(c.state(), ParticleState::Normal);
    }

    #[test]
    fn test_attractor_only_pulls_in_normal() {
        let mut c = ShapeController::default();
        assert!(c.toggle_attractor());
        let frame = c.tick(0.1);
        assert_eq!(frame.state, ParticleState::HeartShape);
        assert_eq!(frame.attractor.w, 0.0);

        c.reset();
        let frame = c.tick(0.1);
        assert_eq!(frame.attractor.w, AttractorSettings::default().strength);
    }

    #[test]
    fn test_breathing_only_in_normal() {
        let mut c = ShapeController::default();
        c.tick(0.7);
        let shaped = c.tick(0.1);
        assert_eq!(shaped.sprite_size, BASE_SPRITE_SIZE);
        assert_eq!(shaped.particle_scale, BASE_PARTICLE_SCALE);

        c.reset();
        c.tick(0.7);
        let normal = c.tick(0.1);
        let breath = (0.7f32 * BREATH_SPEED).sin();
        assert!((normal.sprite_size - (BASE_SPRITE_SIZE + breath * SPRITE_BREATH_AMPLITUDE)).abs() < 1e-6);
        assert!((normal.particle_scale - (1.0 + breath * 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_reset_restarts_run_time() {
        let mut c = ShapeController::default();
        c.tick(3.0);
        assert!(c.run_time() > 0.0);
        c.reset();
        assert_eq!(c.run_time(), 0.0);
        assert_eq!(c.state(), ParticleState::Normal);
    }

    #[test]
    fn test_shape_frame_reports_duration() {
        let mut c = ShapeController::default();
        c.begin_absorb(ShapeTarget::Heart);
        let frame = c.tick(0.25);
        assert_eq!(frame.state, ParticleState::Absorbing);
        assert_eq!(frame.state_time, 0.25);
        assert_eq!(frame.state_duration, 2.0);
    }
}
