//! 2D map of the Paris region: anchor marker, destination marker, route line

use super::{Presenter, Region};
use crate::braille::{BrailleCanvas, Ink};
use crate::coastline;
use crate::colors::{self, ColorState};
use crate::error::ProjectionError;
use crate::geo::{Coordinate, GeoBounds, PARIS};
use crate::help::{box_size, draw_box, wrap};
use crate::order::Order;
use crate::terminal::Terminal;
use crossterm::style::Color;
use std::f64::consts::PI;
use std::time::Duration;
use tracing::debug;

const TILE_SIZE: f64 = 256.0;
const MAX_MERCATOR_LAT: f64 = 85.051_128_78;
const INITIAL_ZOOM: u8 = 10;
const POPUP_WIDTH: usize = 30;

/// Base layer description (tiles themselves are not fetched)
#[derive(Clone, Debug, PartialEq)]
pub struct TileLayer {
    pub url_template: &'static str,
    pub max_zoom: u8,
}

impl Default for TileLayer {
    fn default() -> Self {
        Self {
            url_template: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png",
            max_zoom: 18,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub at: Coordinate,
    pub popup: String,
    pub popup_open: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub points: Vec<Coordinate>,
    pub color: Color,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Layer {
    Tiles(TileLayer),
    Marker(Marker),
    Polyline(Polyline),
}

pub type LayerId = u64;

/// Web-Mercator position in the unit square, (0, 0) at the north-west corner
pub fn mercator(c: Coordinate) -> (f64, f64) {
    let lat = c.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
    let x = (c.lng + 180.0) / 360.0;
    let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0;
    (x, y)
}

/// Visible window of the map
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapView {
    pub center: (f64, f64),
    pub zoom: u8,
    pub width: usize,
    pub height: usize,
}

impl MapView {
    fn scale(&self) -> f64 {
        TILE_SIZE * 2f64.powi(self.zoom as i32)
    }

    pub fn set_view(&mut self, center: Coordinate, zoom: u8) {
        self.center = mercator(center);
        self.zoom = zoom;
    }

    /// Canvas dot position of a coordinate
    pub fn to_canvas(&self, c: Coordinate) -> (f64, f64) {
        let (x, y) = mercator(c);
        let s = self.scale();
        (
            (x - self.center.0) * s + self.width as f64 / 2.0,
            (y - self.center.1) * s + self.height as f64 / 2.0,
        )
    }

    /// Center on `bounds` at the highest zoom that keeps them, plus `padding`
    /// dots on every side, inside the view
    pub fn fit_bounds(&mut self, bounds: GeoBounds, padding: usize, max_zoom: u8) {
        let nw = mercator(Coordinate::new(bounds.north, bounds.west));
        let se = mercator(Coordinate::new(bounds.south, bounds.east));
        let avail_w = self.width.saturating_sub(2 * padding).max(1) as f64;
        let avail_h = self.height.saturating_sub(2 * padding).max(1) as f64;

        let zoom = (0..=max_zoom)
            .rev()
            .find(|&z| {
                let s = TILE_SIZE * 2f64.powi(z as i32);
                (se.0 - nw.0) * s <= avail_w && (se.1 - nw.1) * s <= avail_h
            })
            .unwrap_or(0);

        self.center = ((nw.0 + se.0) / 2.0, (nw.1 + se.1) / 2.0);
        self.zoom = zoom;
    }
}

/// Persistent map state, built on first entry into map mode
pub struct MapScene {
    pub view: MapView,
    layers: Vec<(LayerId, Layer)>,
    next_id: LayerId,
    anchor: LayerId,
    destination: Option<LayerId>,
    route: Option<LayerId>,
}

impl MapScene {
    fn new(first: Coordinate, width: usize, height: usize) -> Self {
        let mut view = MapView {
            center: (0.0, 0.0),
            zoom: INITIAL_ZOOM,
            width,
            height,
        };
        view.set_view(first, INITIAL_ZOOM);

        let mut scene = Self {
            view,
            layers: Vec::new(),
            next_id: 0,
            anchor: 0,
            destination: None,
            route: None,
        };
        scene.add_layer(Layer::Tiles(TileLayer::default()));
        scene.anchor = scene.add_layer(Layer::Marker(Marker {
            at: PARIS,
            popup: "Headquarters".to_string(),
            popup_open: false,
        }));
        scene.open_popup(scene.anchor);
        scene
    }

    pub fn add_layer(&mut self, layer: Layer) -> LayerId {
        let id = self.next_id;
        self.next_id += 1;
        self.layers.push((id, layer));
        id
    }

    pub fn remove_layer(&mut self, id: LayerId) {
        self.layers.retain(|(lid, _)| *lid != id);
    }

    /// Open one marker's popup; any other open popup closes
    pub fn open_popup(&mut self, id: LayerId) {
        for (lid, layer) in &mut self.layers {
            if let Layer::Marker(m) = layer {
                m.popup_open = *lid == id;
            }
        }
    }

    pub fn layers(&self) -> impl Iterator<Item = &Layer> {
        self.layers.iter().map(|(_, l)| l)
    }

    pub fn markers(&self) -> impl Iterator<Item = &Marker> {
        self.layers().filter_map(|l| match l {
            Layer::Marker(m) => Some(m),
            _ => None,
        })
    }

    pub fn polylines(&self) -> impl Iterator<Item = &Polyline> {
        self.layers().filter_map(|l| match l {
            Layer::Polyline(p) => Some(p),
            _ => None,
        })
    }

    pub fn tiles(&self) -> Option<&TileLayer> {
        self.layers().find_map(|l| match l {
            Layer::Tiles(t) => Some(t),
            _ => None,
        })
    }

    pub fn destination(&self) -> Option<&Marker> {
        let id = self.destination?;
        self.layers.iter().find_map(|(lid, l)| match l {
            Layer::Marker(m) if *lid == id => Some(m),
            _ => None,
        })
    }

    /// Fit the view to the anchor and the current destination
    fn refit(&mut self, padding: usize) {
        let Some(dest) = self.destination().map(|m| m.at) else {
            return;
        };
        let max_zoom = self.tiles().map(|t| t.max_zoom).unwrap_or(18);
        self.view
            .fit_bounds(GeoBounds::from_corners(PARIS, dest), padding, max_zoom);
        debug!(zoom = self.view.zoom, %dest, "map refit");
    }
}

pub struct MapPresenter {
    scene: Option<MapScene>,
    region: Region,
    padding: usize,
}

impl MapPresenter {
    pub fn new(region: Region, padding: u16) -> Self {
        Self {
            scene: None,
            region,
            padding: padding as usize,
        }
    }

    #[cfg(test)]
    pub fn scene(&self) -> Option<&MapScene> {
        self.scene.as_ref()
    }

    fn draw_ring(view: &MapView, canvas: &mut BrailleCanvas, ring: &[(f64, f64)], ink: Ink) {
        let to_dot = |&(lat, lng): &(f64, f64)| {
            let (x, y) = view.to_canvas(Coordinate::new(lat, lng));
            (x.round() as i32, y.round() as i32)
        };
        for pair in ring.windows(2) {
            canvas.line(to_dot(&pair[0]), to_dot(&pair[1]), ink);
        }
    }

    fn draw_graticule(view: &MapView, canvas: &mut BrailleCanvas) {
        // Degrees between grid lines, coarser when zoomed out
        let step = match view.zoom {
            0..=2 => 30.0,
            3..=4 => 10.0,
            5..=6 => 2.0,
            7..=8 => 0.5,
            9..=10 => 0.1,
            _ => 0.02,
        };
        let (w, h) = (view.width as i32, view.height as i32);
        let top_left = unproject(view, 0.0, 0.0);
        let bottom_right = unproject(view, w as f64, h as f64);

        let mut lng = (top_left.lng / step).floor() * step;
        while lng <= bottom_right.lng {
            let (x, _) = view.to_canvas(Coordinate::new(0.0, lng));
            let x = x.round() as i32;
            for y in (0..h).step_by(3) {
                canvas.plot(x, y, Ink::Dim);
            }
            lng += step;
        }
        let mut lat = (bottom_right.lat / step).floor() * step;
        while lat <= top_left.lat {
            let (_, y) = view.to_canvas(Coordinate::new(lat, 0.0));
            let y = y.round() as i32;
            for x in (0..w).step_by(3) {
                canvas.plot(x, y, Ink::Dim);
            }
            lat += step;
        }
    }
}

/// Coordinate under a canvas dot
fn unproject(view: &MapView, x: f64, y: f64) -> Coordinate {
    let s = view.scale();
    let mx = (x - view.width as f64 / 2.0) / s + view.center.0;
    let my = (y - view.height as f64 / 2.0) / s + view.center.1;
    let lng = mx * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * my)).sinh().atan().to_degrees();
    Coordinate::new(lat, lng)
}

impl Presenter for MapPresenter {
    fn present(&mut self, order: &Order) -> Result<(), ProjectionError> {
        let (width, height) = self.region.dots();
        let dest = order.location;
        let scene = self
            .scene
            .get_or_insert_with(|| MapScene::new(dest, width, height));

        if let Some(id) = scene.route.take() {
            scene.remove_layer(id);
        }
        if let Some(id) = scene.destination.take() {
            scene.remove_layer(id);
        }

        let marker = scene.add_layer(Layer::Marker(Marker {
            at: dest,
            popup: order.popup_text(),
            popup_open: false,
        }));
        scene.open_popup(marker);
        scene.destination = Some(marker);
        scene.route = Some(scene.add_layer(Layer::Polyline(Polyline {
            points: vec![PARIS, dest],
            color: colors::ROUTE,
        })));

        scene.refit(self.padding);
        Ok(())
    }

    fn resize(&mut self, region: Region) {
        self.region = region;
        let (width, height) = region.dots();
        if let Some(scene) = &mut self.scene {
            scene.view.width = width;
            scene.view.height = height;
            scene.refit(self.padding);
        }
    }

    fn render(&self, canvas: &mut BrailleCanvas, term: &mut Terminal, colors: &ColorState, _elapsed: Duration) {
        let Some(scene) = &self.scene else {
            return;
        };
        let view = &scene.view;

        Self::draw_graticule(view, canvas);
        for ring in coastline::RINGS {
            Self::draw_ring(view, canvas, ring, Ink::Normal);
        }
        for ring in coastline::REGIONS {
            Self::draw_ring(view, canvas, ring, Ink::Bright);
        }

        let dot = |c: Coordinate| {
            let (x, y) = view.to_canvas(c);
            (x.round() as i32, y.round() as i32)
        };
        for line in scene.polylines() {
            for pair in line.points.windows(2) {
                canvas.line(dot(pair[0]), dot(pair[1]), Ink::Route);
            }
        }
        for (id, layer) in &scene.layers {
            if let Layer::Marker(m) = layer {
                let ink = if *id == scene.anchor { Ink::Anchor } else { Ink::Destination };
                canvas.diamond(dot(m.at), 2, ink);
            }
        }

        canvas.blit(term, self.region.col, self.region.row, colors);

        for m in scene.markers().filter(|m| m.popup_open) {
            let lines = wrap(&m.popup, POPUP_WIDTH);
            let (bw, bh) = box_size(&lines);
            let (x, y) = dot(m.at);
            let col = self.region.col as i32 + x / 2 - bw as i32 / 2;
            let top = self.region.row as i32;
            // Above the marker when there is room, otherwise below it
            let above = top + y / 4 - bh as i32 - 1;
            let row = if above >= top { above } else { top + (y + 2) / 4 + 1 };
            // Keep the popup on screen, like an auto-panned popup
            let max_col = (self.region.col + self.region.cols) as i32 - bw as i32;
            let col = col.clamp(self.region.col as i32, max_col.max(self.region.col as i32));
            draw_box(term, col, row, &lines, Color::White, Color::Grey);
        }
    }

    fn caption(&self) -> String {
        match &self.scene {
            Some(scene) => format!(
                "map z{} · {}",
                scene.view.zoom,
                scene.tiles().map(|t| t.url_template).unwrap_or("no base layer")
            ),
            None => "map".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{tests::sample_payload, RawRecord, RecordLayout};

    fn region() -> Region {
        Region { col: 0, row: 0, cols: 80, rows: 24 }
    }

    fn order_at(location: &str) -> Order {
        let raw = RawRecord::from_value(sample_payload(location)).unwrap();
        Order::decode(&raw, &RecordLayout::default()).unwrap()
    }

    #[test]
    fn scene_is_built_lazily() {
        let mut presenter = MapPresenter::new(region(), 12);
        assert!(presenter.scene().is_none());
        presenter.present(&order_at("48.85,2.35")).unwrap();
        let scene = presenter.scene().unwrap();
        assert!(scene.tiles().is_some());
        assert_eq!(scene.tiles().unwrap().max_zoom, 18);
    }

    #[test]
    fn second_present_replaces_destination_and_route() {
        let mut presenter = MapPresenter::new(region(), 12);
        presenter.present(&order_at("48.85,2.35")).unwrap();
        presenter.present(&order_at("48.60,2.90")).unwrap();

        let scene = presenter.scene().unwrap();
        assert_eq!(scene.markers().count(), 2, "anchor plus one destination");
        assert_eq!(scene.polylines().count(), 1);
        assert_eq!(scene.destination().unwrap().at, Coordinate::new(48.60, 2.90));
        assert_eq!(scene.polylines().next().unwrap().points, vec![PARIS, Coordinate::new(48.60, 2.90)]);
        assert!(scene.markers().any(|m| m.at == PARIS));
    }

    #[test]
    fn destination_popup_is_the_only_open_one() {
        let mut presenter = MapPresenter::new(region(), 12);
        presenter.present(&order_at("48.85,2.35")).unwrap();
        let scene = presenter.scene().unwrap();
        let open: Vec<&Marker> = scene.markers().filter(|m| m.popup_open).collect();
        assert_eq!(open.len(), 1);
        assert!(open[0].popup.contains("Maison Lumière"));
        assert!(open[0].popup.contains("42.50"));
        assert!(open[0].popup.contains("Lyon"));
    }

    #[test]
    fn fit_keeps_both_points_inside_padding() {
        let mut presenter = MapPresenter::new(region(), 12);
        presenter.present(&order_at("48.40,3.40")).unwrap();
        let view = presenter.scene().unwrap().view;
        for c in [PARIS, Coordinate::new(48.40, 3.40)] {
            let (x, y) = view.to_canvas(c);
            assert!(x >= 12.0 - 1e-6 && x <= view.width as f64 - 12.0 + 1e-6, "x={x}");
            assert!(y >= 12.0 - 1e-6 && y <= view.height as f64 - 12.0 + 1e-6, "y={y}");
        }
        // One zoom level closer would no longer fit
        let mut closer = view;
        closer.zoom += 1;
        let (ax, _) = closer.to_canvas(PARIS);
        let (bx, _) = closer.to_canvas(Coordinate::new(48.40, 3.40));
        let (_, ay) = closer.to_canvas(PARIS);
        let (_, by) = closer.to_canvas(Coordinate::new(48.40, 3.40));
        assert!((bx - ax).abs() > view.width as f64 - 24.0 || (by - ay).abs() > view.height as f64 - 24.0);
    }

    #[test]
    fn identical_points_clamp_to_max_zoom() {
        let mut presenter = MapPresenter::new(region(), 12);
        presenter.present(&order_at("48.8696,2.3484")).unwrap();
        assert_eq!(presenter.scene().unwrap().view.zoom, 18);
    }

    #[test]
    fn mercator_round_trips_through_view() {
        let mut view = MapView { center: (0.0, 0.0), zoom: 9, width: 160, height: 96 };
        view.set_view(PARIS, 9);
        let (x, y) = view.to_canvas(PARIS);
        assert!((x - 80.0).abs() < 1e-9 && (y - 48.0).abs() < 1e-9);
        let back = unproject(&view, 100.0, 20.0);
        let (x2, y2) = view.to_canvas(back);
        assert!((x2 - 100.0).abs() < 1e-6 && (y2 - 20.0).abs() < 1e-6);
    }

    #[test]
    fn render_draws_markers_and_popup() {
        let mut presenter = MapPresenter::new(region(), 12);
        presenter.present(&order_at("48.60,2.90")).unwrap();
        let mut canvas = BrailleCanvas::for_cells(80, 24);
        let mut term = Terminal::headless(80, 24);
        presenter.render(&mut canvas, &mut term, &ColorState::new(0), Duration::ZERO);

        let view = presenter.scene().unwrap().view;
        let (x, y) = view.to_canvas(Coordinate::new(48.60, 2.90));
        assert_eq!(canvas.get(x.round() as i32, y.round() as i32), Some(Ink::Destination));
        let (x, y) = view.to_canvas(PARIS);
        assert_eq!(canvas.get(x.round() as i32, y.round() as i32), Some(Ink::Anchor));

        let text: String = (0..24).map(|r| term.row_text(r)).collect::<Vec<_>>().join("\n");
        assert!(text.contains("Maison"));
    }

    #[test]
    fn popup_drops_below_a_marker_near_the_top() {
        let mut presenter = MapPresenter::new(region(), 4);
        presenter.present(&order_at("49.50,1.50")).unwrap();
        let mut canvas = BrailleCanvas::for_cells(80, 24);
        let mut term = Terminal::headless(80, 24);
        presenter.render(&mut canvas, &mut term, &ColorState::new(0), Duration::ZERO);

        let view = presenter.scene().unwrap().view;
        let (x, y) = view.to_canvas(Coordinate::new(49.50, 1.50));
        let (col, row) = ((x.round() as i32 / 2) as u16, (y.round() as i32 / 4) as u16);
        assert_eq!(term.get(col, row).and_then(|c| c.fg), Some(colors::DESTINATION));
        let below: String = (row + 1..24).map(|r| term.row_text(r)).collect();
        assert!(below.contains("Hey!"));
    }

    #[test]
    fn resize_keeps_route_inside_the_padding() {
        let mut presenter = MapPresenter::new(region(), 12);
        let dest = Coordinate::new(48.40, 3.40);
        presenter.present(&order_at("48.40,3.40")).unwrap();
        let before = presenter.scene().unwrap().view.zoom;

        presenter.resize(Region { col: 0, row: 0, cols: 30, rows: 12 });
        let view = presenter.scene().unwrap().view;
        assert_eq!((view.width, view.height), (60, 48));
        assert!(view.zoom < before);
        for c in [PARIS, dest] {
            let (x, y) = view.to_canvas(c);
            assert!(x >= 12.0 - 1e-6 && x <= 48.0 + 1e-6, "x={x}");
            assert!(y >= 12.0 - 1e-6 && y <= 36.0 + 1e-6, "y={y}");
        }
    }
}
