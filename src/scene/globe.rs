//! 3D globe with an animated arc from headquarters to the destination

use super::{Presenter, Region};
use crate::braille::{BrailleCanvas, Ink};
use crate::camera::{frame_camera, polar_to_cartesian, CameraPose, Vec3, GLOBE_RADIUS};
use crate::coastline;
use crate::colors::{self, ColorState};
use crate::error::ProjectionError;
use crate::geo::{Coordinate, PARIS};
use crate::order::Order;
use crate::terminal::Terminal;
use crossterm::style::Color;
use std::f64::consts::PI;
use std::time::Duration;
use tracing::debug;

const ARC_SAMPLES: usize = 96;

/// Shortest signed longitude difference from `from` to `to`, in degrees (-180..180]
fn shortest_lng_delta(from: f64, to: f64) -> f64 {
    let mut delta = to - from;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta < -180.0 {
        delta += 360.0;
    }
    delta
}

/// Globe surface imagery
#[derive(Clone, Debug, PartialEq)]
pub struct GlobeMesh {
    pub texture_url: &'static str,
    pub bump_url: &'static str,
}

impl GlobeMesh {
    /// Image file names, texture then bump map
    pub fn label(&self) -> String {
        let name = |url: &'static str| url.rsplit('/').next().unwrap_or(url);
        format!("{}+{}", name(self.texture_url), name(self.bump_url))
    }
}

impl Default for GlobeMesh {
    fn default() -> Self {
        Self {
            texture_url: "https://unpkg.com/three-globe/example/img/earth-blue-marble.jpg",
            bump_url: "https://unpkg.com/three-globe/example/img/earth-topology.png",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Light {
    Ambient { color: Color, intensity: f64 },
    Directional { color: Color, intensity: f64, position: Vec3 },
}

impl Light {
    /// Contribution at a surface point with unit normal `normal`
    fn irradiance(&self, normal: Vec3) -> f64 {
        match *self {
            Light::Ambient { intensity, .. } => intensity,
            Light::Directional { intensity, position, .. } => {
                intensity * normal.dot(position.normalize()).max(0.0)
            }
        }
    }
}

/// Fixed look of the order arc
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcStyle {
    pub color: Color,
    pub altitude: f64,
    pub stroke: f64,
    pub dash_length: f64,
    pub dash_gap: f64,
    pub dash_initial_gap: f64,
    pub dash_animate: Duration,
}

impl Default for ArcStyle {
    fn default() -> Self {
        Self {
            color: colors::ROUTE,
            altitude: 0.2,
            stroke: 0.5,
            dash_length: 0.3,
            dash_gap: 2.0,
            dash_initial_gap: 0.3,
            dash_animate: Duration::from_millis(2000),
        }
    }
}

impl ArcStyle {
    /// Whether the point at fraction `t` of the arc is inside a dash at time `elapsed`.
    /// Dashes travel one full arc length per `dash_animate`.
    pub fn dash_lit(&self, t: f64, elapsed: Duration) -> bool {
        let period = self.dash_length + self.dash_gap;
        let travel = elapsed.as_secs_f64() / self.dash_animate.as_secs_f64().max(f64::EPSILON);
        (t - self.dash_initial_gap - travel).rem_euclid(period) < self.dash_length
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Arc {
    pub start: Coordinate,
    pub end: Coordinate,
    pub style: ArcStyle,
}

impl Arc {
    /// Scene point at fraction `t`: great-circle path lifted by a sine altitude profile
    pub fn point(&self, t: f64) -> Vec3 {
        let a = polar_to_cartesian(self.start, 0.0).normalize();
        let b = polar_to_cartesian(self.end, 0.0).normalize();
        let omega = a.dot(b).clamp(-1.0, 1.0).acos();
        let dir = if omega.abs() < 1e-9 {
            a
        } else if PI - omega < 1e-6 {
            // Antipodes: any great circle works, take the one over the north pole
            let up = Vec3::new(0.0, 1.0, 0.0);
            let mut side = up - a * a.dot(up);
            if side.length() < 1e-9 {
                let x = Vec3::new(1.0, 0.0, 0.0);
                side = x - a * a.dot(x);
            }
            let side = side.normalize();
            a * (t * PI).cos() + side * (t * PI).sin()
        } else {
            let s = omega.sin();
            a * (((1.0 - t) * omega).sin() / s) + b * ((t * omega).sin() / s)
        };
        let lift = self.style.altitude * (t * PI).sin();
        dir.normalize() * (GLOBE_RADIUS * (1.0 + lift))
    }
}

/// Persistent globe state, built on first entry into globe mode
pub struct GlobeScene {
    pub mesh: GlobeMesh,
    lights: Vec<Light>,
    lights_added: bool,
    arcs: Vec<Arc>,
    pub camera: CameraPose,
}

impl GlobeScene {
    fn new() -> Self {
        Self {
            mesh: GlobeMesh::default(),
            lights: Vec::new(),
            lights_added: false,
            arcs: Vec::new(),
            camera: CameraPose::default(),
        }
    }

    /// Ambient and directional light, added exactly once per scene
    fn ensure_lights(&mut self) {
        if self.lights_added {
            return;
        }
        self.lights.push(Light::Ambient {
            color: Color::White,
            intensity: 1.0,
        });
        self.lights.push(Light::Directional {
            color: Color::White,
            intensity: 0.8,
            position: Vec3::new(5.0, 3.0, 5.0),
        });
        self.lights_added = true;
    }

    #[cfg(test)]
    pub fn lights(&self) -> &[Light] {
        &self.lights
    }

    #[cfg(test)]
    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    fn irradiance(&self, normal: Vec3) -> f64 {
        self.lights.iter().map(|l| l.irradiance(normal)).sum()
    }
}

pub struct GlobePresenter {
    scene: Option<GlobeScene>,
    region: Region,
}

impl GlobePresenter {
    pub fn new(region: Region) -> Self {
        Self { scene: None, region }
    }

    #[cfg(test)]
    pub fn scene(&self) -> Option<&GlobeScene> {
        self.scene.as_ref()
    }

    /// Scene position of a coordinate; fails until the globe exists
    pub fn project(&self, coord: Coordinate, altitude: f64) -> Result<Vec3, ProjectionError> {
        if self.scene.is_none() {
            return Err(ProjectionError::Uninitialized);
        }
        let p = polar_to_cartesian(coord, altitude);
        if !p.is_finite() {
            return Err(ProjectionError::NonFinite {
                lat: coord.lat,
                lng: coord.lng,
            });
        }
        Ok(p)
    }

    fn aspect(&self) -> f64 {
        let (w, h) = self.region.dots();
        if h == 0 {
            1.0
        } else {
            w as f64 / h as f64
        }
    }
}

/// Draws scene points through one camera onto one canvas
struct Painter<'a> {
    camera: &'a CameraPose,
    aspect: f64,
    width: f64,
    height: f64,
}

impl Painter<'_> {
    fn dot(&self, p: Vec3) -> Option<(i32, i32)> {
        if self.camera.occluded(p) {
            return None;
        }
        let ndc = self.camera.project(p, self.aspect)?;
        let x = (ndc.x + 1.0) / 2.0 * self.width;
        let y = (1.0 - ndc.y) / 2.0 * self.height;
        Some((x.round() as i32, y.round() as i32))
    }

    /// Outline of the visible disc
    fn limb(&self, canvas: &mut BrailleCanvas) {
        let p = self.camera.position;
        let dist = p.length();
        if dist <= GLOBE_RADIUS {
            return;
        }
        let n = p.normalize();
        let center = n * (GLOBE_RADIUS * GLOBE_RADIUS / dist);
        let radius = GLOBE_RADIUS * (1.0 - (GLOBE_RADIUS / dist).powi(2)).sqrt();
        let helper = if n.y.abs() < 0.9 { Vec3::new(0.0, 1.0, 0.0) } else { Vec3::new(1.0, 0.0, 0.0) };
        let u = n.cross(helper).normalize();
        let v = n.cross(u);
        let ndc = |q: Vec3| self.camera.project(q, self.aspect);
        let mut prev: Option<(i32, i32)> = None;
        for i in 0..=180 {
            let a = i as f64 / 180.0 * std::f64::consts::TAU;
            let q = center + u * (radius * a.cos()) + v * (radius * a.sin());
            let cur = ndc(q).map(|c| {
                (
                    ((c.x + 1.0) / 2.0 * self.width).round() as i32,
                    ((1.0 - c.y) / 2.0 * self.height).round() as i32,
                )
            });
            if let (Some(a), Some(b)) = (prev, cur) {
                canvas.line(a, b, Ink::Dim);
            }
            prev = cur;
        }
    }
}

impl Presenter for GlobePresenter {
    fn present(&mut self, order: &Order) -> Result<(), ProjectionError> {
        let scene = self.scene.get_or_insert_with(GlobeScene::new);
        scene.ensure_lights();

        self.project(order.location, 0.0)?;
        let pose = frame_camera(PARIS, order.location);
        if !pose.position.is_finite() {
            return Err(ProjectionError::NonFinite {
                lat: order.location.lat,
                lng: order.location.lng,
            });
        }
        if let Some(scene) = &mut self.scene {
            scene.arcs = vec![Arc {
                start: PARIS,
                end: order.location,
                style: ArcStyle::default(),
            }];
            scene.camera = pose;
        }
        debug!(zoom = pose.zoom_factor, km = pose.distance_km, "globe camera framed");
        Ok(())
    }

    fn resize(&mut self, region: Region) {
        self.region = region;
    }

    fn render(&self, canvas: &mut BrailleCanvas, term: &mut Terminal, colors: &ColorState, elapsed: Duration) {
        let Some(scene) = &self.scene else {
            return;
        };
        let (w, h) = canvas.size();
        let painter = Painter {
            camera: &scene.camera,
            aspect: self.aspect(),
            width: w as f64,
            height: h as f64,
        };

        painter.limb(canvas);

        // Graticule every 30 degrees
        for lat in (-60..=60).step_by(30) {
            for lng in (-180..180).step_by(2) {
                if let Some(d) = painter.dot(polar_to_cartesian(Coordinate::new(lat as f64, lng as f64), 0.0)) {
                    canvas.plot(d.0, d.1, Ink::Dim);
                }
            }
        }
        for lng in (-180..180).step_by(30) {
            for lat in (-90..=90).step_by(2) {
                if let Some(d) = painter.dot(polar_to_cartesian(Coordinate::new(lat as f64, lng as f64), 0.0)) {
                    canvas.plot(d.0, d.1, Ink::Dim);
                }
            }
        }

        // Coastlines, shaded by the scene lights
        for ring in coastline::RINGS {
            for pair in ring.windows(2) {
                let (lat1, lng1) = pair[0];
                let (lat2, lng2) = pair[1];
                let dlng = shortest_lng_delta(lng1, lng2);
                for step in 0..12 {
                    let f = step as f64 / 12.0;
                    let c = Coordinate::new(lat1 + (lat2 - lat1) * f, lng1 + dlng * f);
                    let p = polar_to_cartesian(c, 0.0);
                    let Some(d) = painter.dot(p) else {
                        continue;
                    };
                    let light = scene.irradiance(p.normalize());
                    let ink = if light >= 1.5 {
                        Ink::Bright
                    } else if light >= 1.1 {
                        Ink::Normal
                    } else {
                        Ink::Dim
                    };
                    canvas.plot(d.0, d.1, ink);
                }
            }
        }

        for arc in &scene.arcs {
            for i in 0..=ARC_SAMPLES {
                let t = i as f64 / ARC_SAMPLES as f64;
                if !arc.style.dash_lit(t, elapsed) {
                    continue;
                }
                if let Some(d) = painter.dot(arc.point(t)) {
                    canvas.plot(d.0, d.1, Ink::Route);
                }
            }
            for (c, ink) in [(arc.start, Ink::Anchor), (arc.end, Ink::Destination)] {
                if let Some(d) = painter.dot(polar_to_cartesian(c, 0.0)) {
                    canvas.diamond(d, 1, ink);
                }
            }
        }

        canvas.blit(term, self.region.col, self.region.row, colors);
    }

    fn caption(&self) -> String {
        match &self.scene {
            Some(scene) => format!(
                "globe · {:.0} km · zoom x{:.2} · {}",
                scene.camera.distance_km,
                scene.camera.zoom_factor,
                scene.mesh.label()
            ),
            None => "globe".to_string(),
        }
    }
}
