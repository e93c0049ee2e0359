//! Interactive waveform view.
//!
//! The display never blocks on the worker. Pan and zoom move the viewport,
//! [`WaveformDisplay::request_buffers`] queues buffer builds, and [`WaveformDisplay::poll`]
//! applies whatever replies have arrived. A reply only lands if it answers the newest
//! request for its channel; a failed reply leaves the previous buffer on screen.
use std::sync::Arc;
use crate::config::DisplayConfig;
use crate::rpc::{Delivery, PendingCall, ResponseSlot, WorkerClient};
use crate::sigpro::{PipelineError, TimeRange, WaveformSegment};
use crate::types::RequestId;
use crate::weavess::cache::{CacheKey, PositionBufferCache};
use crate::weavess::mapper;
use crate::weavess::position::{PositionBuffer, PositionBufferRequest};
use crate::weavess::selection::{MeasureWindow, SelectionWindow};
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Main,
    Measure,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    Stale,
    Failed,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PollSummary {
    pub applied: usize,
    pub stale: usize,
    pub failed: usize,
    pub pending: usize,
}
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: String,
    pub time_secs: f64,
}
struct InFlight {
    call: PendingCall<PositionBuffer>,
    key: CacheKey,
}
#[derive(Default)]
struct BufferTrack {
    slot: ResponseSlot,
    in_flight: Vec<InFlight>,
    current: Option<Arc<PositionBuffer>>,
    last_error: Option<String>,
}
struct DisplayChannel {
    segment: WaveformSegment,
    main: BufferTrack,
    measure: BufferTrack,
}
impl DisplayChannel {
    fn track_mut(&mut self, view: View) -> &mut BufferTrack {
        match view {
            View::Main => &mut self.main,
            View::Measure => &mut self.measure,
        }
    }
    fn track(&self, view: View) -> &BufferTrack {
        match view {
            View::Main => &self.main,
            View::Measure => &self.measure,
        }
    }
}
pub struct WaveformDisplay {
    client: WorkerClient,
    domain: TimeRange,
    viewport: TimeRange,
    width_px: u32,
    zoom_step: f64,
    min_zoom_secs: f64,
    channels: Vec<DisplayChannel>,
    markers: Vec<Marker>,
    selection: SelectionWindow,
    measure: MeasureWindow,
    cache: PositionBufferCache,
}
impl WaveformDisplay {
    /// View over `domain`, initially showing all of it.
    pub fn new(client: WorkerClient, domain: TimeRange, config: &DisplayConfig) -> Result<Self, PipelineError> {
        domain.validate()?;
        if config.width_px == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "display width must be at least one pixel".into(),
            ));
        }
        Ok(Self {
            client,
            domain,
            viewport: domain,
            width_px: config.width_px,
            zoom_step: config.zoom_step,
            min_zoom_secs: config.min_zoom_secs,
            channels: Vec::new(),
            markers: Vec::new(),
            selection: SelectionWindow::new(),
            measure: MeasureWindow::new(config.measure_width_px),
            cache: PositionBufferCache::new(config.cache_capacity),
        })
    }
    pub fn add_channel(&mut self, segment: WaveformSegment) -> Result<usize, PipelineError> {
        segment.validate()?;
        self.channels.push(DisplayChannel {
            segment,
            main: BufferTrack::default(),
            measure: BufferTrack::default(),
        });
        Ok(self.channels.len() - 1)
    }
    /// Swap a channel's data. Buffers, cache entries and in-flight calls built from the old
    /// segment are dropped, so nothing drawn afterwards predates the swap.
    pub fn replace_segment(&mut self, index: usize, segment: WaveformSegment) -> Result<(), PipelineError> {
        segment.validate()?;
        let channel = self.channel_mut(index)?;
        let new_id = segment.id.clone();
        let old_id = std::mem::replace(&mut channel.segment, segment).id;
        for track in [&mut channel.main, &mut channel.measure] {
            track.slot.supersede();
            track.in_flight.clear();
            track.current = None;
            track.last_error = None;
        }
        self.cache.invalidate_segment(&old_id);
        self.cache.invalidate_segment(&new_id);
        log::debug!("channel {index}: segment {old_id} replaced by {new_id}");
        Ok(())
    }
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
    pub fn viewport(&self) -> TimeRange {
        self.viewport
    }
    pub fn domain(&self) -> TimeRange {
        self.domain
    }
    pub fn width_px(&self) -> u32 {
        self.width_px
    }
    pub fn set_width(&mut self, width_px: u32) -> Result<(), PipelineError> {
        if width_px == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "display width must be at least one pixel".into(),
            ));
        }
        self.width_px = width_px;
        Ok(())
    }
    pub fn set_viewport(&mut self, viewport: TimeRange) -> Result<(), PipelineError> {
        viewport.validate()?;
        if !self.domain.overlaps(&viewport) {
            return Err(PipelineError::InvalidConfiguration(format!(
                "viewport [{}, {}] lies outside the loaded data",
                viewport.start_time_secs, viewport.end_time_secs
            )));
        }
        self.viewport = self.clamped(viewport.start_time_secs, viewport.duration_secs());
        Ok(())
    }
    fn clamped(&self, start: f64, duration: f64) -> TimeRange {
        let duration = duration.min(self.domain.duration_secs());
        let latest = self.domain.end_time_secs - duration;
        let start = start.min(latest).max(self.domain.start_time_secs);
        TimeRange {
            start_time_secs: start,
            end_time_secs: start + duration,
        }
    }
    /// Shift by `delta_px` pixels; positive moves later in time.
    pub fn pan(&mut self, delta_px: f64) -> TimeRange {
        let seconds = delta_px * self.viewport.duration_secs() / self.width_px as f64;
        self.viewport = self.clamped(
            self.viewport.start_time_secs + seconds,
            self.viewport.duration_secs(),
        );
        self.viewport
    }
    /// Scale the viewport duration by `scale`, keeping the time under `center_px` fixed.
    pub fn zoom(&mut self, scale: f64, center_px: f64) -> TimeRange {
        let width = self.width_px;
        let duration = self.viewport.duration_secs();
        let anchor = mapper::pixel_to_time(center_px.clamp(0.0, width as f64), &self.viewport, width)
            .unwrap_or(self.viewport.start_time_secs + duration / 2.0);
        let fraction = mapper::time_to_fraction(anchor, &self.viewport).unwrap_or(0.5);
        let floor = self.min_zoom_secs.min(self.domain.duration_secs());
        let new_duration = (duration * scale).clamp(floor, self.domain.duration_secs());
        self.viewport = self.clamped(anchor - fraction * new_duration, new_duration);
        self.viewport
    }
    pub fn zoom_in(&mut self, center_px: f64) -> TimeRange {
        self.zoom(self.zoom_step, center_px)
    }
    pub fn zoom_out(&mut self, center_px: f64) -> TimeRange {
        self.zoom(1.0 / self.zoom_step, center_px)
    }
    pub fn add_marker(&mut self, id: impl Into<String>, time_secs: f64) {
        self.markers.push(Marker {
            id: id.into(),
            time_secs,
        });
    }
    pub fn remove_marker(&mut self, id: &str) {
        self.markers.retain(|m| m.id != id);
    }
    /// Pixel position of every on-screen marker; off-screen markers are left out.
    pub fn visible_markers(&self) -> Vec<(&str, f64)> {
        self.markers
            .iter()
            .filter_map(|m| {
                mapper::time_to_pixel(m.time_secs, &self.viewport, self.width_px)
                    .map(|x| (m.id.as_str(), x))
            })
            .collect()
    }
    pub fn selection(&self) -> &SelectionWindow {
        &self.selection
    }
    pub fn press_selection(&mut self, pixel_x: f64) -> bool {
        self.selection.press(pixel_x, &self.viewport, self.width_px)
    }
    pub fn drag_selection(&mut self, pixel_x: f64) {
        self.selection.drag(pixel_x, &self.viewport, self.width_px);
    }
    pub fn release_selection(&mut self) -> Option<TimeRange> {
        self.selection.release()
    }
    pub fn measure(&self) -> &MeasureWindow {
        &self.measure
    }
    pub fn begin_measure(&mut self, pixel_x: f64) -> bool {
        self.measure.begin(pixel_x, &self.viewport, self.width_px)
    }
    pub fn drag_measure(&mut self, pixel_x: f64) {
        self.measure.update(pixel_x, &self.viewport, self.width_px);
    }
    pub fn release_measure(&mut self) -> Option<TimeRange> {
        self.measure.release()
    }
    pub fn hide_measure(&mut self) {
        self.measure.hide();
        for channel in &mut self.channels {
            channel.measure.slot.supersede();
            channel.measure.current = None;
        }
    }
    fn channel_mut(&mut self, index: usize) -> Result<&mut DisplayChannel, PipelineError> {
        let count = self.channels.len();
        self.channels.get_mut(index).ok_or_else(|| {
            PipelineError::InvalidConfiguration(format!("no channel {index} (have {count})"))
        })
    }
    /// Queue buffer builds for the main view. Returns how many calls went to the worker.
    pub fn request_buffers(&mut self) -> Result<usize, PipelineError> {
        let viewport = self.viewport;
        let width = self.width_px;
        self.request_view(View::Main, viewport, width)
    }
    /// Queue buffer builds for the measure window, if one is showing.
    pub fn request_measure_buffers(&mut self) -> Result<usize, PipelineError> {
        let Some(range) = self.measure.range() else {
            return Ok(0);
        };
        let width = self.measure.width_px();
        self.request_view(View::Measure, range, width)
    }
    fn request_view(&mut self, view: View, viewport: TimeRange, width_px: u32) -> Result<usize, PipelineError> {
        let mut dispatched = 0;
        for channel in &mut self.channels {
            let key = CacheKey::new(channel.segment.id.clone(), &viewport, width_px);
            if let Some(hit) = self.cache.get(&key) {
                let track = channel.track_mut(view);
                track.slot.supersede();
                track.current = Some(hit);
                continue;
            }
            let call = self.client.create_position_buffer(PositionBufferRequest {
                segment: channel.segment.clone(),
                viewport,
                width_px,
            })?;
            let track = channel.track_mut(view);
            track.slot.issue(call.request_id());
            track.in_flight.push(InFlight { call, key });
            dispatched += 1;
        }
        Ok(dispatched)
    }
    /// Apply every reply that has arrived, without blocking.
    pub fn poll(&mut self) -> PollSummary {
        let mut summary = PollSummary::default();
        for index in 0..self.channels.len() {
            for view in [View::Main, View::Measure] {
                let in_flight = std::mem::take(&mut self.channels[index].track_mut(view).in_flight);
                for mut pending in in_flight {
                    match pending.call.try_take() {
                        None => {
                            summary.pending += 1;
                            self.channels[index].track_mut(view).in_flight.push(pending);
                        }
                        Some(result) => {
                            let request_id = pending.call.request_id();
                            match self.apply_response(index, view, request_id, pending.key, result) {
                                ApplyOutcome::Applied => summary.applied += 1,
                                ApplyOutcome::Stale => summary.stale += 1,
                                ApplyOutcome::Failed => summary.failed += 1,
                            }
                        }
                    }
                }
            }
        }
        summary
    }
    fn apply_response(
        &mut self,
        index: usize,
        view: View,
        request_id: RequestId,
        key: CacheKey,
        result: Result<PositionBuffer, PipelineError>,
    ) -> ApplyOutcome {
        let track = self.channels[index].track_mut(view);
        match track.slot.accept(request_id, result) {
            Delivery::Stale => ApplyOutcome::Stale,
            Delivery::Current(Ok(buffer)) => {
                let buffer = self.cache.insert(key, Arc::new(buffer));
                let track = self.channels[index].track_mut(view);
                track.current = Some(buffer);
                track.last_error = None;
                ApplyOutcome::Applied
            }
            Delivery::Current(Err(err)) => {
                log::warn!("{request_id}: buffer for channel {index} failed, keeping previous: {err}");
                track.last_error = Some(err.to_string());
                ApplyOutcome::Failed
            }
        }
    }
    pub fn buffer(&self, index: usize) -> Option<Arc<PositionBuffer>> {
        self.channels.get(index)?.track(View::Main).current.clone()
    }
    pub fn measure_buffer(&self, index: usize) -> Option<Arc<PositionBuffer>> {
        self.channels.get(index)?.track(View::Measure).current.clone()
    }
    pub fn last_error(&self, index: usize) -> Option<&str> {
        self.channels.get(index)?.main.last_error.as_deref()
    }
    pub fn is_idle(&self) -> bool {
        self.channels
            .iter()
            .all(|c| c.main.in_flight.is_empty() && c.measure.in_flight.is_empty())
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::WorkerMessage;
    use crate::types::{OperationResult, RpcError, RpcResponse};
    use crossbeam::channel::Receiver;
    fn display() -> (WaveformDisplay, Receiver<WorkerMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        let client = WorkerClient::new(tx, Default::default());
        let config = DisplayConfig {
            width_px: 100,
            ..DisplayConfig::default()
        };
        let domain = TimeRange::new(0.0, 100.0).unwrap();
        let mut display = WaveformDisplay::new(client, domain, &config).unwrap();
        let samples: Vec<f64> = (0..1_001).map(|i| (i as f64 * 0.1).sin()).collect();
        display
            .add_channel(WaveformSegment::new("chan", 10.0, 0.0, samples))
            .unwrap();
        (display, rx)
    }
    fn envelope(rx: &Receiver<WorkerMessage>) -> crate::rpc::Envelope {
        match rx.try_recv() {
            Ok(WorkerMessage::Call(envelope)) => envelope,
            _ => panic!("expected a queued call"),
        }
    }
    fn reply_with(envelope: crate::rpc::Envelope, marker: f32) {
        let buffer = PositionBuffer::from_points([(0.0, marker)]);
        envelope
            .reply
            .send(RpcResponse::success(
                envelope.request.request_id,
                OperationResult::PositionBuffer(buffer),
            ))
            .unwrap();
    }
    #[test]
    fn late_reply_for_older_request_is_discarded() {
        let (mut display, rx) = display();
        assert_eq!(display.request_buffers().unwrap(), 1);
        let a = envelope(&rx);
        display.zoom_in(50.0);
        assert_eq!(display.request_buffers().unwrap(), 1);
        let b = envelope(&rx);
        reply_with(b, 2.0);
        let first = display.poll();
        assert_eq!(first.applied, 1);
        assert_eq!(first.pending, 1);
        reply_with(a, 1.0);
        let second = display.poll();
        assert_eq!(second.stale, 1);
        let shown = display.buffer(0).unwrap();
        assert_eq!(shown.points().next(), Some((0.0, 2.0)));
        assert!(display.is_idle());
    }
    #[test]
    fn failure_keeps_previous_buffer() {
        let (mut display, rx) = display();
        display.request_buffers().unwrap();
        reply_with(envelope(&rx), 5.0);
        display.poll();
        display.zoom_in(50.0);
        display.request_buffers().unwrap();
        let failing = envelope(&rx);
        failing
            .reply
            .send(RpcResponse::failure(
                failing.request.request_id,
                RpcError {
                    name: "Beamforming".into(),
                    message: "boom".into(),
                },
            ))
            .unwrap();
        assert_eq!(display.poll().failed, 1);
        assert_eq!(display.buffer(0).unwrap().points().next(), Some((0.0, 5.0)));
        assert!(display.last_error(0).is_some());
    }
    #[test]
    fn cached_viewport_is_served_without_worker() {
        let (mut display, rx) = display();
        display.request_buffers().unwrap();
        reply_with(envelope(&rx), 3.0);
        display.poll();
        display.zoom_in(50.0);
        display.request_buffers().unwrap();
        let _ignored = envelope(&rx);
        display.set_viewport(TimeRange::new(0.0, 100.0).unwrap()).unwrap();
        assert_eq!(display.request_buffers().unwrap(), 0);
        assert_eq!(display.buffer(0).unwrap().points().next(), Some((0.0, 3.0)));
    }
    #[test]
    fn replaced_segment_drops_old_replies_and_cache() {
        let (mut display, rx) = display();
        display.request_buffers().unwrap();
        reply_with(envelope(&rx), 3.0);
        display.poll();
        display.zoom_in(50.0);
        display.request_buffers().unwrap();
        let old = envelope(&rx);
        display
            .replace_segment(0, WaveformSegment::new("chan", 10.0, 0.0, vec![-7.0; 1_001]))
            .unwrap();
        assert!(display.buffer(0).is_none());
        assert!(display.is_idle());
        let late = old.reply.send(RpcResponse::success(
            old.request.request_id,
            OperationResult::PositionBuffer(PositionBuffer::from_points([(0.0, 1.0)])),
        ));
        assert!(late.is_err());
        assert_eq!(display.poll(), PollSummary::default());
        display.set_viewport(TimeRange::new(0.0, 100.0).unwrap()).unwrap();
        assert_eq!(display.request_buffers().unwrap(), 1);
        reply_with(envelope(&rx), -7.0);
        assert_eq!(display.poll().applied, 1);
        assert_eq!(display.buffer(0).unwrap().points().next(), Some((0.0, -7.0)));
    }
    #[test]
    fn width_change_rebuilds_instead_of_reusing() {
        let (mut display, rx) = display();
        display.request_buffers().unwrap();
        reply_with(envelope(&rx), 4.0);
        display.poll();
        assert_eq!(display.request_buffers().unwrap(), 0);
        assert!(display.set_width(0).is_err());
        display.set_width(50).unwrap();
        assert_eq!(display.request_buffers().unwrap(), 1);
        match &envelope(&rx).request.operation {
            crate::types::Operation::CreatePositionBuffer(request) => assert_eq!(request.width_px, 50),
            other => panic!("unexpected {other:?}"),
        }
    }
    #[test]
    fn zoom_and_pan_stay_inside_domain() {
        let (mut display, _rx) = display();
        let zoomed = display.zoom(0.5, 0.0);
        assert_eq!(zoomed, TimeRange::new(0.0, 50.0).unwrap());
        let panned = display.pan(1_000.0);
        assert_eq!(panned, TimeRange::new(50.0, 100.0).unwrap());
        for _ in 0..200 {
            display.zoom_in(37.0);
        }
        assert!(display.viewport().duration_secs() >= 0.5 - 1e-9);
        let out = display.zoom(1e6, 50.0);
        assert_eq!(out, display.domain());
    }
    #[test]
    fn markers_off_screen_are_hidden() {
        let (mut display, _rx) = display();
        display.add_marker("p", 25.0);
        display.add_marker("s", 75.0);
        display.set_viewport(TimeRange::new(0.0, 50.0).unwrap()).unwrap();
        assert_eq!(display.visible_markers(), vec![("p", 50.0)]);
        display.remove_marker("p");
        assert!(display.visible_markers().is_empty());
    }
    #[test]
    fn measure_window_requests_its_own_buffers() {
        let (mut display, rx) = display();
        assert!(display.begin_measure(10.0));
        display.drag_measure(20.0);
        let range = display.release_measure().unwrap();
        assert_eq!(range, TimeRange::new(10.0, 20.0).unwrap());
        assert_eq!(display.request_measure_buffers().unwrap(), 1);
        let call = envelope(&rx);
        match &call.request.operation {
            crate::types::Operation::CreatePositionBuffer(request) => {
                assert_eq!(request.viewport, range);
                assert_eq!(request.width_px, display.measure().width_px());
            }
            other => panic!("unexpected {other:?}"),
        }
        reply_with(call, 9.0);
        display.poll();
        assert!(display.measure_buffer(0).is_some());
        assert!(display.buffer(0).is_none());
    }
}
