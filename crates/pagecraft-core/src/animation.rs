//! Per-shape reveal animations.
//!
//! A shape's animation is configured once (`kind`, delay, duration and pan
//! direction) and evaluated every frame against a start time that is set
//! lazily the first time the shape is observed. Evaluation itself is pure.

use crate::shapes::{Shape, ShapeBase};
use kurbo::{Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Default animation duration in milliseconds.
pub const DEFAULT_DURATION_MS: f64 = 300.0;

/// Kind of reveal animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationKind {
    #[default]
    None,
    /// Alpha ramps from 0 to 1.
    Fade,
    /// Clip grows from the top edge down.
    Wipe,
    /// Shape slides up from one height below its resting place.
    Raise,
    /// Shape slides in horizontally from one width away.
    Pan,
}

impl AnimationKind {
    /// Whether this kind uses the ease-out curve.
    pub fn is_eased(self) -> bool {
        matches!(self, AnimationKind::Raise | AnimationKind::Pan)
    }
}

/// Side a pan animation enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PanDirection {
    #[default]
    Left,
    Right,
}

impl PanDirection {
    /// Sign of the starting horizontal offset.
    pub fn sign(self) -> f64 {
        match self {
            PanDirection::Left => -1.0,
            PanDirection::Right => 1.0,
        }
    }
}

/// Animation settings stored on a shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnimationConfig {
    pub kind: AnimationKind,
    pub duration_ms: f64,
    pub delay_ms: f64,
    /// Only meaningful for [`AnimationKind::Pan`].
    pub direction: PanDirection,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            kind: AnimationKind::None,
            duration_ms: DEFAULT_DURATION_MS,
            delay_ms: 0.0,
            direction: PanDirection::Left,
        }
    }
}

impl AnimationConfig {
    pub fn new(kind: AnimationKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn with_timing(mut self, delay_ms: f64, duration_ms: f64) -> Self {
        self.delay_ms = delay_ms;
        self.duration_ms = duration_ms;
        self
    }

    pub fn with_direction(mut self, direction: PanDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn is_active(&self) -> bool {
        self.kind != AnimationKind::None
    }

    /// Time from start until the animation settles.
    pub fn total_ms(&self) -> f64 {
        self.delay_ms.max(0.0) + self.duration_ms.max(0.0)
    }
}

/// Lifecycle phase of a shape's animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    /// No animation configured.
    Idle,
    /// Waiting for the delay to elapse.
    Delaying,
    Running,
    Settled,
}

/// Pose of a shape for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationState {
    pub visible: bool,
    pub alpha: f64,
    /// Clip in the shape's unrotated world frame, for wipes.
    pub clip: Option<Rect>,
    /// Translation applied on top of the shape's position.
    pub offset: Vec2,
    pub progress: f64,
    pub still_animating: bool,
    pub phase: AnimationPhase,
}

impl AnimationState {
    /// Fully visible resting pose.
    pub fn settled(phase: AnimationPhase) -> Self {
        Self {
            visible: true,
            alpha: 1.0,
            clip: None,
            offset: Vec2::ZERO,
            progress: 1.0,
            still_animating: false,
            phase,
        }
    }

    /// Whether anything of the shape would reach the surface.
    pub fn is_drawable(&self) -> bool {
        self.visible && self.alpha > 0.0 && self.clip.is_none_or(|c| c.height() > 0.0)
    }
}

/// Ease-out cubic: `1 - (1 - t)^3`, with `t` clamped to `[0, 1]`.
pub fn ease_out_cubic(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    1.0 - (1.0 - t).powi(3)
}

/// Evaluate an animation at `now_ms` for a shape occupying `bounds`.
///
/// A missing start time is treated as "starting now".
pub fn evaluate(
    config: &AnimationConfig,
    bounds: Rect,
    start_ms: Option<f64>,
    now_ms: f64,
) -> AnimationState {
    if !config.is_active() {
        return AnimationState::settled(AnimationPhase::Idle);
    }

    let elapsed = now_ms - start_ms.unwrap_or(now_ms);
    if elapsed < config.delay_ms {
        return AnimationState {
            still_animating: true,
            phase: AnimationPhase::Delaying,
            ..pose(config, bounds, 0.0)
        };
    }

    let progress = if config.duration_ms <= 0.0 {
        1.0
    } else {
        ((elapsed - config.delay_ms) / config.duration_ms).clamp(0.0, 1.0)
    };
    let still_animating = progress < 1.0;
    AnimationState {
        still_animating,
        phase: if still_animating {
            AnimationPhase::Running
        } else {
            AnimationPhase::Settled
        },
        ..pose(config, bounds, progress)
    }
}

fn pose(config: &AnimationConfig, bounds: Rect, progress: f64) -> AnimationState {
    let mut state = AnimationState {
        progress,
        ..AnimationState::settled(AnimationPhase::Running)
    };
    let eased = if config.kind.is_eased() {
        ease_out_cubic(progress)
    } else {
        progress
    };

    match config.kind {
        AnimationKind::None => {}
        AnimationKind::Fade => {
            state.alpha = progress;
            state.visible = progress > 0.0;
        }
        AnimationKind::Wipe => {
            let height = bounds.height() * progress;
            state.clip = Some(Rect::new(
                bounds.x0,
                bounds.y0,
                bounds.x1,
                bounds.y0 + height,
            ));
            state.visible = height > 0.0;
        }
        AnimationKind::Raise => {
            state.offset = Vec2::new(0.0, bounds.height() * (1.0 - eased));
        }
        AnimationKind::Pan => {
            state.offset = Vec2::new(config.direction.sign() * bounds.width() * (1.0 - eased), 0.0);
        }
    }
    state
}

/// Observe a shape for the current frame, starting its clock if needed.
pub fn observe(base: &mut ShapeBase, now_ms: f64) -> AnimationState {
    if base.animation.is_active() && base.animation_start_ms.is_none() {
        log::debug!("Starting {:?} animation at {now_ms}", base.animation.kind);
        base.animation_start_ms = Some(now_ms);
    }
    evaluate(&base.animation, base.bounds(), base.animation_start_ms, now_ms)
}

/// The final pose, leaving the start time untouched.
pub fn force_final_state(base: &ShapeBase) -> AnimationState {
    if base.animation.is_active() {
        AnimationState::settled(AnimationPhase::Settled)
    } else {
        AnimationState::settled(AnimationPhase::Idle)
    }
}

/// Longest `delay + duration` over the animated shapes of a page.
pub fn max_animation_duration(shapes: &[Shape]) -> f64 {
    shapes
        .iter()
        .map(|s| &s.base().animation)
        .filter(|a| a.is_active())
        .map(AnimationConfig::total_ms)
        .fold(0.0, f64::max)
}

/// True when no shape on the page is still animating at `now_ms`.
///
/// Shapes that were never observed count as not yet started.
pub fn page_settled(shapes: &[Shape], now_ms: f64) -> bool {
    shapes.iter().all(|shape| {
        let base = shape.base();
        if !base.animation.is_active() {
            return true;
        }
        match base.animation_start_ms {
            Some(start) => !evaluate(&base.animation, base.bounds(), Some(start), now_ms).still_animating,
            None => false,
        }
    })
}

/// Clear every start time so animations replay from the beginning.
pub fn reset_page_animations(shapes: &mut [Shape]) {
    for shape in shapes {
        shape.base_mut().animation_start_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::Text;

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 100.0, 50.0)
    }

    #[test]
    fn test_fade_midpoint_and_end() {
        let config = AnimationConfig::new(AnimationKind::Fade);
        let half = evaluate(&config, bounds(), Some(1000.0), 1150.0);
        assert!((half.alpha - 0.5).abs() < 1e-9);
        assert!(half.still_animating);
        assert_eq!(half.phase, AnimationPhase::Running);

        let done = evaluate(&config, bounds(), Some(1000.0), 1300.0);
        assert!((done.alpha - 1.0).abs() < f64::EPSILON);
        assert!(!done.still_animating);
        assert_eq!(done.phase, AnimationPhase::Settled);
    }

    #[test]
    fn test_progress_is_monotonic_and_saturates() {
        let config = AnimationConfig::new(AnimationKind::Raise).with_timing(50.0, 200.0);
        let mut last = -1.0;
        let mut last_offset = f64::INFINITY;
        for step in 0..=40 {
            let now = step as f64 * 10.0;
            let state = evaluate(&config, bounds(), Some(0.0), now);
            assert!(state.progress >= last);
            assert!(state.offset.y <= last_offset);
            last = state.progress;
            last_offset = state.offset.y;
        }
        assert!((last - 1.0).abs() < f64::EPSILON);
        assert!(last_offset.abs() < 1e-12);
    }

    #[test]
    fn test_delaying_pose() {
        let delay = |kind| AnimationConfig::new(kind).with_timing(100.0, 300.0);

        let fade = evaluate(&delay(AnimationKind::Fade), bounds(), Some(0.0), 50.0);
        assert!(!fade.visible);
        assert!(fade.still_animating);
        assert_eq!(fade.phase, AnimationPhase::Delaying);

        let wipe = evaluate(&delay(AnimationKind::Wipe), bounds(), Some(0.0), 50.0);
        assert!(!wipe.is_drawable());

        let raise = evaluate(&delay(AnimationKind::Raise), bounds(), Some(0.0), 50.0);
        assert!((raise.offset.y - 50.0).abs() < f64::EPSILON);

        let pan = evaluate(&delay(AnimationKind::Pan), bounds(), Some(0.0), 50.0);
        assert!((pan.offset.x + 100.0).abs() < f64::EPSILON);
        let pan_right = evaluate(
            &delay(AnimationKind::Pan).with_direction(PanDirection::Right),
            bounds(),
            Some(0.0),
            50.0,
        );
        assert!((pan_right.offset.x - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_wipe_clip_grows_downward() {
        let config = AnimationConfig::new(AnimationKind::Wipe).with_timing(0.0, 100.0);
        let state = evaluate(&config, Rect::new(10.0, 20.0, 110.0, 220.0), Some(0.0), 25.0);
        let clip = state.clip.unwrap();
        assert!((clip.y0 - 20.0).abs() < f64::EPSILON);
        assert!((clip.height() - 50.0).abs() < 1e-9);
        assert!((clip.width() - 100.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_pan_uses_ease_out() {
        let config = AnimationConfig::new(AnimationKind::Pan).with_timing(0.0, 100.0);
        let state = evaluate(&config, bounds(), Some(0.0), 50.0);
        let expected = -100.0 * (1.0 - ease_out_cubic(0.5));
        assert!((state.offset.x - expected).abs() < 1e-9);
    }

    #[test]
    fn test_zero_duration_settles_after_delay() {
        let config = AnimationConfig::new(AnimationKind::Fade).with_timing(20.0, 0.0);
        assert!(evaluate(&config, bounds(), Some(0.0), 10.0).still_animating);
        let state = evaluate(&config, bounds(), Some(0.0), 20.0);
        assert!(!state.still_animating);
        assert!((state.alpha - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_observe_starts_clock_once() {
        let mut text = Text::new(Rect::new(0.0, 0.0, 100.0, 50.0), "hi");
        text.base.animation = AnimationConfig::new(AnimationKind::Fade);
        let first = observe(&mut text.base, 500.0);
        assert_eq!(text.base.animation_start_ms, Some(500.0));
        assert!((first.alpha).abs() < f64::EPSILON);
        observe(&mut text.base, 650.0);
        assert_eq!(text.base.animation_start_ms, Some(500.0));
    }

    #[test]
    fn test_idle_shape_never_starts() {
        let mut text = Text::new(Rect::new(0.0, 0.0, 100.0, 50.0), "hi");
        let state = observe(&mut text.base, 10.0);
        assert_eq!(state.phase, AnimationPhase::Idle);
        assert!(text.base.animation_start_ms.is_none());
    }

    #[test]
    fn test_force_final_keeps_start() {
        let mut text = Text::new(Rect::new(0.0, 0.0, 100.0, 50.0), "hi");
        text.base.animation = AnimationConfig::new(AnimationKind::Wipe);
        text.base.animation_start_ms = Some(42.0);
        let state = force_final_state(&text.base);
        assert!(state.is_drawable());
        assert!(state.clip.is_none());
        assert_eq!(text.base.animation_start_ms, Some(42.0));
    }

    #[test]
    fn test_page_helpers() {
        let mut a = Text::new(Rect::new(0.0, 0.0, 10.0, 10.0), "a");
        a.base.animation = AnimationConfig::new(AnimationKind::Fade).with_timing(100.0, 300.0);
        let mut b = Text::new(Rect::new(0.0, 0.0, 10.0, 10.0), "b");
        b.base.animation = AnimationConfig::new(AnimationKind::Pan).with_timing(0.0, 500.0);
        let c = Text::new(Rect::new(0.0, 0.0, 10.0, 10.0), "c");
        let mut shapes = vec![Shape::Text(a), Shape::Text(b), Shape::Text(c)];

        assert!((max_animation_duration(&shapes) - 500.0).abs() < f64::EPSILON);
        assert!(!page_settled(&shapes, 0.0));

        for shape in shapes.iter_mut() {
            observe(shape.base_mut(), 0.0);
        }
        assert!(!page_settled(&shapes, 450.0));
        assert!(page_settled(&shapes, 500.0));

        reset_page_animations(&mut shapes);
        assert!(shapes.iter().all(|s| s.base().animation_start_ms.is_none()));
    }

    #[test]
    fn test_config_json_defaults() {
        let config: AnimationConfig = serde_json::from_str(r#"{"kind":"pan","direction":"right"}"#).unwrap();
        assert_eq!(config.kind, AnimationKind::Pan);
        assert_eq!(config.direction, PanDirection::Right);
        assert!((config.duration_ms - 300.0).abs() < f64::EPSILON);
        assert!(config.delay_ms.abs() < f64::EPSILON);
    }
}
