//! Built-in procedural scenes

use crate::color::Color;
use crate::shade::Shader;
use crate::RenderError;
use raster_scheduler::Vec2;
use std::f32::consts::TAU;
use std::fmt;
use std::str::FromStr;

/// Procedural pattern to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SceneKind {
    /// Diagonal two-color gradient whose hue drifts with time
    Gradient,
    /// Rotating checkerboard
    Checker,
    /// Concentric rings moving outwards
    Rings,
}

impl SceneKind {
    pub const ALL: [SceneKind; 3] = [SceneKind::Gradient, SceneKind::Checker, SceneKind::Rings];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Gradient => "gradient",
            SceneKind::Checker => "checker",
            SceneKind::Rings => "rings",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = RenderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SceneKind::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RenderError::UnknownScene(s.to_string()))
    }
}

const CHECKER_CELLS: f32 = 8.0;
const RING_FREQUENCY: f32 = 24.0;

/// A scene at a point in time, sized for a particular output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scene {
    kind: SceneKind,
    time: f32,
    aspect: f32,
}

impl Scene {
    /// Scene for a `width × height` output at time 0.
    ///
    /// Normalized coordinates are stretched back by the aspect ratio so
    /// patterns stay round on non-square outputs.
    pub fn new(kind: SceneKind, width: u32, height: u32) -> Self {
        let aspect = if height == 0 { 1.0 } else { width as f32 / height as f32 };
        Self {
            kind,
            time: 0.0,
            aspect,
        }
    }

    /// Animation time in `[0, 1]`; one unit is a full loop.
    pub fn with_time(mut self, time: f32) -> Self {
        self.time = time;
        self
    }

    pub fn kind(&self) -> SceneKind {
        self.kind
    }

    fn gradient(&self, p: Vec2) -> Color {
        let t = (p.x + p.y + 1.0) * 0.5;
        let drift = 0.5 + 0.5 * (self.time * TAU).sin();
        let from = Color::rgb(0.05, 0.1, 0.35).lerp(Color::rgb(0.3, 0.05, 0.4), drift);
        let to = Color::rgb(1.0, 0.6, 0.1);
        from.lerp(to, t.clamp(0.0, 1.0))
    }

    fn checker(&self, p: Vec2) -> Color {
        let angle = self.time * TAU * 0.25;
        let (sin, cos) = angle.sin_cos();
        let q = Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);
        let cell = (q.x * CHECKER_CELLS).floor() as i64 + (q.y * CHECKER_CELLS).floor() as i64;
        if cell.rem_euclid(2) == 0 {
            Color::rgb(0.9, 0.9, 0.85)
        } else {
            Color::rgb(0.15, 0.15, 0.2)
        }
    }

    fn rings(&self, p: Vec2) -> Color {
        let d = p.length();
        let wave = 0.5 + 0.5 * (d * RING_FREQUENCY * TAU - self.time * TAU).cos();
        Color::rgb(0.1, 0.2, 0.3).lerp(Color::rgb(0.95, 0.85, 0.5), wave)
    }
}

impl Shader for Scene {
    fn shade(&self, point: Vec2) -> Color {
        let p = Vec2::new(point.x * self.aspect.max(1.0), point.y / self.aspect.min(1.0));
        match self.kind {
            SceneKind::Gradient => self.gradient(p),
            SceneKind::Checker => self.checker(p),
            SceneKind::Rings => self.rings(p),
        }
    }
}
