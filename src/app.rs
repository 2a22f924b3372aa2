//! Interactive loop: drains polling cycles, routes orders to a presenter, redraws every frame

use crate::braille::BrailleCanvas;
use crate::colors::ColorState;
use crate::error::CycleError;
use crate::fetch::{CycleOutcome, Fetcher, Poller};
use crate::geo::{classify, DisplayMode};
use crate::help::{render_help_overlay, HELP};
use crate::order::Order;
use crate::panel::{panel_cols, Panel};
use crate::scene::globe::GlobePresenter;
use crate::scene::map::MapPresenter;
use crate::scene::{Presenter, Region, Stage};
use crate::settings::{DisplaySettings, Settings};
use crate::terminal::Terminal;
use crossterm::event::{KeyCode, KeyModifiers};
use std::io;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Scene area for a terminal size: right of the panel strip, above the status row
pub fn scene_region(width: u16, height: u16) -> Region {
    let panel = panel_cols(width);
    Region {
        col: panel,
        row: 0,
        cols: width - panel,
        rows: height.saturating_sub(1),
    }
}

/// Both presenters, the stage deciding which one shows, and the order panel
pub struct App {
    map: MapPresenter,
    globe: GlobePresenter,
    stage: Stage,
    panel: Panel,
    last_cycle: u64,
}

impl App {
    pub fn new(region: Region, display: &DisplaySettings) -> Self {
        Self {
            map: MapPresenter::new(region, display.map_padding),
            globe: GlobePresenter::new(region),
            stage: Stage::default(),
            panel: Panel::default(),
            last_cycle: 0,
        }
    }

    #[cfg(test)]
    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    #[cfg(test)]
    pub fn panel(&self) -> &Panel {
        &self.panel
    }

    #[cfg(test)]
    pub fn map(&self) -> &MapPresenter {
        &self.map
    }

    #[cfg(test)]
    pub fn globe(&self) -> &GlobePresenter {
        &self.globe
    }

    /// Classify the order and hand it to the matching presenter
    pub fn route(&mut self, order: &Order) -> Result<DisplayMode, CycleError> {
        let mode = classify(order.location);
        match mode {
            DisplayMode::Map => self.map.present(order)?,
            DisplayMode::Globe => self.globe.present(order)?,
        }
        self.stage.show(mode);
        Ok(mode)
    }

    /// Apply one finished polling cycle. Failures keep the previous scene.
    pub fn apply(&mut self, outcome: CycleOutcome) -> Option<DisplayMode> {
        if outcome.cycle <= self.last_cycle {
            warn!(cycle = outcome.cycle, last = self.last_cycle, "dropping stale cycle");
            return None;
        }
        self.last_cycle = outcome.cycle;

        let order = match outcome.result {
            Ok(order) => order,
            Err(e) => {
                self.panel.fail(format!("{}: {e}", e.kind()), outcome.cycle);
                return None;
            }
        };

        match self.route(&order) {
            Ok(mode) => {
                info!(cycle = outcome.cycle, mode = mode.label(), "scene updated");
                self.panel.update(order, outcome.cycle, outcome.fetched_at);
                Some(mode)
            }
            Err(e) => {
                error!(cycle = outcome.cycle, "render update failed: {e}");
                self.panel.fail(format!("{}: {e}", e.kind()), outcome.cycle);
                None
            }
        }
    }

    pub fn resize(&mut self, region: Region) {
        self.map.resize(region);
        self.globe.resize(region);
    }

    fn active(&self) -> Option<&dyn Presenter> {
        match self.stage.visible()? {
            DisplayMode::Map => Some(&self.map),
            DisplayMode::Globe => Some(&self.globe),
        }
    }

    /// Draw the visible scene, the panel and the status line
    pub fn draw(&self, term: &mut Terminal, canvas: &mut BrailleCanvas, colors: &ColorState, elapsed: Duration) {
        canvas.clear();
        let caption = match self.active() {
            Some(presenter) => {
                presenter.render(canvas, term, colors, elapsed);
                presenter.caption()
            }
            None => String::new(),
        };
        self.panel.render(term, colors, self.stage.visible(), &caption);
    }
}

/// Render a single order off-screen
pub fn render_order(order: &Order, width: u16, height: u16, display: &DisplaySettings) -> Result<(Terminal, DisplayMode), CycleError> {
    let region = scene_region(width, height);
    let mut app = App::new(region, display);
    let mode = app.route(order)?;
    app.panel.update(order.clone(), 1, chrono::Local::now());

    let mut term = Terminal::headless(width, height);
    let mut canvas = BrailleCanvas::for_cells(region.cols, region.rows);
    app.draw(&mut term, &mut canvas, &ColorState::new(display.color_scheme), Duration::ZERO);
    Ok((term, mode))
}

/// Run the interactive display until the user quits
pub fn run(settings: &Settings) -> io::Result<()> {
    let fetcher = Fetcher::new(&settings.source, settings.record.clone());
    info!(endpoint = fetcher.endpoint(), "starting poller");
    let poller = Poller::spawn(fetcher, Duration::from_millis(settings.source.poll_interval_ms));

    let mut term = Terminal::new()?;
    let (width, height) = term.size();
    let mut region = scene_region(width, height);
    let mut app = App::new(region, &settings.display);
    let mut canvas = BrailleCanvas::for_cells(region.cols, region.rows);
    let mut colors = ColorState::new(settings.display.color_scheme);
    let frame = Duration::from_millis(settings.display.frame_ms.max(1));

    let mut show_help = false;
    let mut paused = false;
    let mut animation = Duration::ZERO;
    let mut last_frame = Instant::now();

    loop {
        if term.sync_size()? {
            let (width, height) = term.size();
            region = scene_region(width, height);
            app.resize(region);
            canvas = BrailleCanvas::for_cells(region.cols, region.rows);
        }

        while let Some(outcome) = poller.try_next() {
            app.apply(outcome);
        }

        if let Some((code, mods)) = term.check_key()? {
            match code {
                KeyCode::Char('q') | KeyCode::Esc => break,
                KeyCode::Char('c') if mods.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('?') => show_help = !show_help,
                KeyCode::Char(' ') => paused = !paused,
                KeyCode::Char('r') => poller.refresh(),
                other => {
                    colors.handle_key(other);
                }
            }
        }

        let now = Instant::now();
        if !paused {
            animation += now - last_frame;
        }
        last_frame = now;

        term.clear();
        app.draw(&mut term, &mut canvas, &colors, animation);
        if show_help {
            render_help_overlay(&mut term, HELP);
        }
        term.present()?;
        thread::sleep(frame);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colors;
    use crate::error::FetchError;
    use crate::geo::{Coordinate, PARIS};
    use crate::order::{tests::sample_payload, RawRecord, RecordLayout};
    use chrono::Local;

    fn outcome(cycle: u64, location: &str) -> CycleOutcome {
        let raw = RawRecord::from_value(sample_payload(location)).unwrap();
        CycleOutcome {
            cycle,
            fetched_at: Local::now(),
            result: Order::decode(&raw, &RecordLayout::default()).map_err(CycleError::from),
        }
    }

    fn order_at(location: &str) -> Order {
        let raw = RawRecord::from_value(sample_payload(location)).unwrap();
        Order::decode(&raw, &RecordLayout::default()).unwrap()
    }

    fn app() -> App {
        App::new(scene_region(80, 25), &DisplaySettings::default())
    }

    #[test]
    fn paris_order_goes_to_map() {
        let mut app = app();
        assert_eq!(app.apply(outcome(1, "48.85,2.35")), Some(DisplayMode::Map));
        assert!(app.stage().is_visible(DisplayMode::Map));
        assert!(app.globe().scene().is_none());

        let dest = app.map().scene().unwrap().destination().unwrap();
        assert!(dest.popup.contains("Maison Lumière"));
        assert!(dest.popup.contains("42.50"));
        assert!(dest.popup.contains("Lyon"));
    }

    #[test]
    fn tokyo_order_goes_to_globe() {
        let mut app = app();
        assert_eq!(app.apply(outcome(1, "35.68,139.69")), Some(DisplayMode::Globe));
        assert!(app.stage().is_visible(DisplayMode::Globe));
        let arcs = app.globe().scene().unwrap().arcs();
        assert_eq!(arcs.len(), 1);
        assert_eq!(arcs[0].start, PARIS);
        assert_eq!(arcs[0].end, Coordinate::new(35.68, 139.69));
    }

    #[test]
    fn modes_switch_and_keep_their_scenes() {
        let mut app = app();
        app.apply(outcome(1, "48.85,2.35"));
        app.apply(outcome(2, "35.68,139.69"));
        assert!(app.stage().is_visible(DisplayMode::Globe));
        assert!(app.map().scene().is_some());
        app.apply(outcome(3, "48.70,2.10"));
        assert!(app.stage().is_visible(DisplayMode::Map));
        assert_eq!(app.map().scene().unwrap().markers().count(), 2);
    }

    #[test]
    fn failed_cycle_keeps_previous_scene() {
        let mut app = app();
        app.apply(outcome(1, "35.68,139.69"));
        let failed = CycleOutcome {
            cycle: 2,
            fetched_at: Local::now(),
            result: Err(FetchError::Status { url: "http://x".into(), status: 503 }.into()),
        };
        assert_eq!(app.apply(failed), None);
        assert!(app.stage().is_visible(DisplayMode::Globe));
        assert!(app.panel().order().is_some());
        assert!(app.panel().last_error().unwrap().starts_with("fetch"));

        assert_eq!(app.apply(outcome(3, "garbage")), None);
        assert!(app.panel().last_error().unwrap().starts_with("payload"));
        assert_eq!(app.apply(outcome(4, "40.71,-74.00")), Some(DisplayMode::Globe));
        assert_eq!(app.panel().last_error(), None);
    }

    #[test]
    fn stale_cycles_are_ignored() {
        let mut app = app();
        app.apply(outcome(5, "35.68,139.69"));
        assert_eq!(app.apply(outcome(4, "48.85,2.35")), None);
        assert!(app.stage().is_visible(DisplayMode::Globe));
    }

    #[test]
    fn render_order_off_screen() {
        let (term, mode) = render_order(&order_at("48.85,2.35"), 80, 25, &DisplaySettings::default()).unwrap();
        assert_eq!(mode, DisplayMode::Map);
        assert!(term.row_text(1).contains("Order infos"));
        assert!(term.row_text(24).contains("map"));
    }

    #[test]
    fn scene_sits_beside_the_panel() {
        let region = scene_region(80, 25);
        assert_eq!(region.col, panel_cols(80));
        assert_eq!(region.col + region.cols, 80);
        assert_eq!(region.rows, 24);
        assert_eq!(scene_region(20, 5).col, 10);
    }

    #[test]
    fn north_west_destination_is_not_under_the_panel() {
        let (term, mode) = render_order(&order_at("49.04,2.07"), 80, 25, &DisplaySettings::default()).unwrap();
        assert_eq!(mode, DisplayMode::Map);

        let destination_cells = (0..80u16)
            .flat_map(|x| (0..24u16).map(move |y| (x, y)))
            .filter(|&(x, y)| term.get(x, y).and_then(|c| c.fg) == Some(colors::DESTINATION))
            .count();
        assert!(destination_cells > 0);

        let text = (0..24).map(|r| term.row_text(r)).collect::<Vec<_>>().join("\n");
        assert!(text.contains("Hey! I'm a customer of shop"), "{text}");
        assert!(text.contains("Order infos"));
    }

    #[test]
    fn projection_failure_leaves_panel_on_previous_order() {
        let mut app = app();
        app.apply(outcome(1, "35.68,139.69"));

        let mut broken = order_at("35.68,139.69");
        broken.location = Coordinate::new(f64::NAN, 0.0);
        broken.shop = "Nowhere".to_string();
        let failed = CycleOutcome {
            cycle: 2,
            fetched_at: Local::now(),
            result: Ok(broken),
        };
        assert_eq!(app.apply(failed), None);
        assert_eq!(app.panel().order().unwrap().shop, "Maison Lumière");
        assert!(app.panel().last_error().unwrap().starts_with("projection"));
    }

    #[test]
    fn resize_refits_the_map() {
        let mut app = app();
        app.apply(outcome(1, "48.40,3.40"));
        app.resize(scene_region(50, 14));
        let view = app.map().scene().unwrap().view;
        let (w, h) = scene_region(50, 14).dots();
        assert_eq!((view.width, view.height), (w, h));
        for c in [PARIS, Coordinate::new(48.40, 3.40)] {
            let (x, y) = view.to_canvas(c);
            assert!(x >= 0.0 && x <= w as f64, "x={x}");
            assert!(y >= 0.0 && y <= h as f64, "y={y}");
        }
    }
}
