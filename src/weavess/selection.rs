//! Mouse-driven selection state machines.
//!
//! Both machines take pixel positions from the main view and resolve them to time through
//! [`mapper`], so a selection drawn on screen and the interval it reports always agree.
use crate::sigpro::TimeRange;
use crate::weavess::mapper;
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging { anchor: f64, current: f64 },
    Selected(TimeRange),
}
fn clamped_time(pixel_x: f64, viewport: &TimeRange, width_px: u32) -> Option<f64> {
    mapper::pixel_to_time(pixel_x.clamp(0.0, width_px as f64), viewport, width_px)
}
fn ordered(a: f64, b: f64) -> TimeRange {
    TimeRange {
        start_time_secs: a.min(b),
        end_time_secs: a.max(b),
    }
}
/// Idle -> Dragging -> Selected -> Idle.
#[derive(Clone, Debug, Default)]
pub struct SelectionWindow {
    state: SelectionState,
}
impl SelectionWindow {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn state(&self) -> SelectionState {
        self.state
    }
    /// Press inside the view. Ignored when the press falls off the canvas.
    pub fn press(&mut self, pixel_x: f64, viewport: &TimeRange, width_px: u32) -> bool {
        match mapper::pixel_to_time(pixel_x, viewport, width_px) {
            Some(time) => {
                self.state = SelectionState::Dragging {
                    anchor: time,
                    current: time,
                };
                true
            }
            None => false,
        }
    }
    pub fn drag(&mut self, pixel_x: f64, viewport: &TimeRange, width_px: u32) {
        if let SelectionState::Dragging { anchor, .. } = self.state {
            if let Some(current) = clamped_time(pixel_x, viewport, width_px) {
                self.state = SelectionState::Dragging { anchor, current };
            }
        }
    }
    /// Release; a zero-length drag clears instead of selecting.
    pub fn release(&mut self) -> Option<TimeRange> {
        let SelectionState::Dragging { anchor, current } = self.state else {
            return self.selection();
        };
        if anchor == current {
            self.state = SelectionState::Idle;
            return None;
        }
        let range = ordered(anchor, current);
        self.state = SelectionState::Selected(range);
        Some(range)
    }
    pub fn clear(&mut self) {
        self.state = SelectionState::Idle;
    }
    pub fn selection(&self) -> Option<TimeRange> {
        match self.state {
            SelectionState::Selected(range) => Some(range),
            SelectionState::Dragging { anchor, current } => Some(ordered(anchor, current)),
            SelectionState::Idle => None,
        }
    }
    /// Pixel extent of the visible part of the selection.
    pub fn overlay(&self, viewport: &TimeRange, width_px: u32) -> Option<(f64, f64)> {
        let range = self.selection()?;
        if !range.overlaps(viewport) {
            return None;
        }
        let start = range.start_time_secs.max(viewport.start_time_secs);
        let end = range.end_time_secs.min(viewport.end_time_secs);
        Some((
            mapper::time_to_pixel(start, viewport, width_px)?,
            mapper::time_to_pixel(end, viewport, width_px)?,
        ))
    }
}
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum MeasureState {
    #[default]
    Hidden,
    Dragging { anchor: f64, current: f64 },
    Visible(TimeRange),
}
/// Secondary zoom region dragged out on the main view and shown in its own panel.
#[derive(Clone, Debug)]
pub struct MeasureWindow {
    state: MeasureState,
    width_px: u32,
}
impl MeasureWindow {
    pub fn new(width_px: u32) -> Self {
        Self {
            state: MeasureState::Hidden,
            width_px,
        }
    }
    pub fn state(&self) -> MeasureState {
        self.state
    }
    pub fn width_px(&self) -> u32 {
        self.width_px
    }
    pub fn set_width(&mut self, width_px: u32) {
        self.width_px = width_px;
    }
    pub fn begin(&mut self, pixel_x: f64, viewport: &TimeRange, main_width_px: u32) -> bool {
        match mapper::pixel_to_time(pixel_x, viewport, main_width_px) {
            Some(time) => {
                self.state = MeasureState::Dragging {
                    anchor: time,
                    current: time,
                };
                true
            }
            None => false,
        }
    }
    pub fn update(&mut self, pixel_x: f64, viewport: &TimeRange, main_width_px: u32) {
        if let MeasureState::Dragging { anchor, .. } = self.state {
            if let Some(current) = clamped_time(pixel_x, viewport, main_width_px) {
                self.state = MeasureState::Dragging { anchor, current };
            }
        }
    }
    /// Finish the drag; an empty drag hides the window.
    pub fn release(&mut self) -> Option<TimeRange> {
        match self.state {
            MeasureState::Dragging { anchor, current } if anchor != current => {
                let range = ordered(anchor, current);
                self.state = MeasureState::Visible(range);
                Some(range)
            }
            MeasureState::Dragging { .. } => {
                self.state = MeasureState::Hidden;
                None
            }
            MeasureState::Visible(range) => Some(range),
            MeasureState::Hidden => None,
        }
    }
    pub fn hide(&mut self) {
        self.state = MeasureState::Hidden;
    }
    pub fn range(&self) -> Option<TimeRange> {
        match self.state {
            MeasureState::Visible(range) => Some(range),
            _ => None,
        }
    }
    /// Time under `pixel_x` of the measure panel itself.
    pub fn pixel_to_time(&self, pixel_x: f64) -> Option<f64> {
        mapper::pixel_to_time(pixel_x, &self.range()?, self.width_px)
    }
    pub fn time_to_pixel(&self, time: f64) -> Option<f64> {
        mapper::time_to_pixel(time, &self.range()?, self.width_px)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn viewport() -> TimeRange {
        TimeRange::new(100.0, 200.0).unwrap()
    }
    #[test]
    fn selection_walks_through_states() {
        let mut selection = SelectionWindow::new();
        assert!(selection.press(750.0, &viewport(), 1000));
        selection.drag(250.0, &viewport(), 1000);
        assert!(matches!(selection.state(), SelectionState::Dragging { .. }));
        let range = selection.release().unwrap();
        assert_eq!(range, TimeRange::new(125.0, 175.0).unwrap());
        assert_eq!(selection.overlay(&viewport(), 1000), Some((250.0, 750.0)));
        selection.clear();
        assert_eq!(selection.state(), SelectionState::Idle);
    }
    #[test]
    fn click_without_drag_selects_nothing() {
        let mut selection = SelectionWindow::new();
        selection.press(10.0, &viewport(), 1000);
        assert_eq!(selection.release(), None);
        assert!(!selection.press(-5.0, &viewport(), 1000));
    }
    #[test]
    fn drag_past_edge_clamps_to_viewport() {
        let mut selection = SelectionWindow::new();
        selection.press(900.0, &viewport(), 1000);
        selection.drag(5_000.0, &viewport(), 1000);
        assert_eq!(selection.release().unwrap().end_time_secs, 200.0);
    }
    #[test]
    fn measure_window_agrees_with_main_mapper() {
        let mut measure = MeasureWindow::new(400);
        assert!(measure.begin(100.0, &viewport(), 1000));
        measure.update(300.0, &viewport(), 1000);
        let range = measure.release().unwrap();
        assert_eq!(range, TimeRange::new(110.0, 130.0).unwrap());
        assert_eq!(measure.pixel_to_time(200.0), Some(120.0));
        assert_eq!(measure.time_to_pixel(110.0), Some(0.0));
        measure.hide();
        assert_eq!(measure.range(), None);
    }
}
