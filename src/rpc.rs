//! Interactive side of the worker channel.
//!
//! Calls never block: [`WorkerClient`] validates the request, queues it and hands back a
//! [`PendingCall`] that can be awaited, polled with [`PendingCall::try_take`], or waited on
//! from plain threads.
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use crossbeam::channel::Sender;
use tokio::sync::oneshot;
use crate::config::FkConfig;
use crate::sigpro::{
    select_fk_channels, EventBeam, EventBeamRequest, FkAttributes, FkSpectra, FrequencyBand,
    LegacyFkPowerSpectra, PipelineError,
};
use crate::store::StoreSnapshot;
use crate::types::{FkComputeRequest, Operation, OperationResult, RequestId, RpcRequest, RpcResponse};
use crate::weavess::{PositionBuffer, PositionBufferRequest, RecordSection, RecordSectionRequest};
pub(crate) struct Envelope {
    pub request: RpcRequest,
    pub reply: oneshot::Sender<RpcResponse>,
}
pub(crate) enum WorkerMessage {
    Call(Envelope),
    Shutdown,
}
type Extract<T> = fn(OperationResult) -> Result<T, PipelineError>;
fn unexpected(result: OperationResult) -> PipelineError {
    PipelineError::RpcFailure {
        name: "UnexpectedResult".into(),
        message: format!("worker answered with {}", result.variant_name()),
    }
}
/// Reply to one call. Resolves exactly once.
#[must_use = "a pending call does nothing unless its result is taken"]
pub struct PendingCall<T> {
    request_id: RequestId,
    receiver: oneshot::Receiver<RpcResponse>,
    extract: Extract<T>,
}
impl<T> PendingCall<T> {
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }
    fn finish(
        request_id: RequestId,
        extract: Extract<T>,
        response: RpcResponse,
    ) -> Result<T, PipelineError> {
        if response.request_id != request_id {
            return Err(PipelineError::RpcFailure {
                name: "CorrelationMismatch".into(),
                message: format!("expected {}, got {}", request_id, response.request_id),
            });
        }
        response.into_result().and_then(extract)
    }
    /// Non-blocking check. `None` while the worker is still busy.
    pub fn try_take(&mut self) -> Option<Result<T, PipelineError>> {
        match self.receiver.try_recv() {
            Ok(response) => Some(Self::finish(self.request_id, self.extract, response)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(PipelineError::WorkerUnavailable)),
        }
    }
    /// Block the current thread until the reply arrives. Not for use inside an async runtime.
    pub fn wait(self) -> Result<T, PipelineError> {
        let PendingCall {
            request_id,
            receiver,
            extract,
        } = self;
        match receiver.blocking_recv() {
            Ok(response) => Self::finish(request_id, extract, response),
            Err(_) => Err(PipelineError::WorkerUnavailable),
        }
    }
}
impl<T> Future for PendingCall<T> {
    type Output = Result<T, PipelineError>;
    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match Pin::new(&mut this.receiver).poll(cx) {
            Poll::Ready(Ok(response)) => Poll::Ready(Self::finish(this.request_id, this.extract, response)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(PipelineError::WorkerUnavailable)),
            Poll::Pending => Poll::Pending,
        }
    }
}
#[derive(Clone)]
pub struct WorkerClient {
    queue: Sender<WorkerMessage>,
    next_id: Arc<AtomicU64>,
    fk: Arc<FkConfig>,
}
impl WorkerClient {
    pub(crate) fn new(queue: Sender<WorkerMessage>, fk: FkConfig) -> Self {
        Self {
            queue,
            next_id: Arc::new(AtomicU64::new(1)),
            fk: Arc::new(fk),
        }
    }
    /// Queue `operation` without validation.
    pub fn rpc(&self, operation: Operation) -> Result<PendingCall<OperationResult>, PipelineError> {
        self.call(operation, Ok)
    }
    fn call<T>(&self, operation: Operation, extract: Extract<T>) -> Result<PendingCall<T>, PipelineError> {
        let request_id = RequestId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (reply, receiver) = oneshot::channel();
        log::debug!("{request_id}: queueing {}", operation.kind());
        let envelope = Envelope {
            request: RpcRequest {
                request_id,
                operation,
            },
            reply,
        };
        self.queue
            .send(WorkerMessage::Call(envelope))
            .map_err(|_| PipelineError::WorkerUnavailable)?;
        Ok(PendingCall {
            request_id,
            receiver,
            extract,
        })
    }
    pub(crate) fn send_shutdown(&self) -> bool {
        self.queue.send(WorkerMessage::Shutdown).is_ok()
    }
    pub fn create_position_buffer(
        &self,
        request: PositionBufferRequest,
    ) -> Result<PendingCall<PositionBuffer>, PipelineError> {
        request.validate()?;
        self.call(Operation::CreatePositionBuffer(request), |result| match result {
            OperationResult::PositionBuffer(buffer) => Ok(buffer),
            other => Err(unexpected(other)),
        })
    }
    pub fn create_record_section(
        &self,
        request: RecordSectionRequest,
    ) -> Result<PendingCall<RecordSection>, PipelineError> {
        request.validate()?;
        if request.width_px == 0 {
            return Err(PipelineError::InvalidConfiguration(
                "render width must be at least one pixel".into(),
            ));
        }
        self.call(
            Operation::CreateRecordSectionPositionBuffer(request),
            |result| match result {
                OperationResult::RecordSection(section) => Ok(section),
                other => Err(unexpected(other)),
            },
        )
    }
    fn validate_fk(&self, request: &FkComputeRequest) -> Result<(), PipelineError> {
        request.input.validate()?;
        select_fk_channels(&request.input, &request.channels, &self.fk)?;
        Ok(())
    }
    pub fn compute_fk(&self, request: FkComputeRequest) -> Result<PendingCall<FkSpectra>, PipelineError> {
        self.validate_fk(&request)?;
        self.call(Operation::ComputeFkSpectra(request), |result| match result {
            OperationResult::FkSpectra(spectra) => Ok(spectra),
            other => Err(unexpected(other)),
        })
    }
    /// One FK call per pass band, queued only after every band validated.
    pub fn compute_fk_frequency_thumbnails(
        &self,
        request: &FkComputeRequest,
        bands: &[FrequencyBand],
    ) -> Result<Vec<(FrequencyBand, PendingCall<FkSpectra>)>, PipelineError> {
        if bands.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "no frequency bands to compute thumbnails for".into(),
            ));
        }
        let banded: Vec<FkComputeRequest> = bands
            .iter()
            .map(|&band| FkComputeRequest {
                input: request.input.with_band(band),
                channels: request.channels.clone(),
            })
            .collect();
        for request in &banded {
            self.validate_fk(request)?;
        }
        bands
            .iter()
            .copied()
            .zip(banded)
            .map(|(band, request)| -> Result<_, PipelineError> { Ok((band, self.compute_fk(request)?)) })
            .collect()
    }
    pub fn get_peak_fk_attributes(
        &self,
        spectra: FkSpectra,
    ) -> Result<PendingCall<FkAttributes>, PipelineError> {
        if spectra.spectrums.is_empty() {
            return Err(PipelineError::InvalidConfiguration(
                "FK spectra contain no windows".into(),
            ));
        }
        self.call(Operation::GetPeakFkAttributes(spectra), |result| match result {
            OperationResult::FkAttributes(attributes) => Ok(attributes),
            other => Err(unexpected(other)),
        })
    }
    pub fn compute_legacy_fk(
        &self,
        request: FkComputeRequest,
    ) -> Result<PendingCall<LegacyFkPowerSpectra>, PipelineError> {
        self.validate_fk(&request)?;
        self.call(Operation::ComputeLegacyFkSpectra(request), |result| match result {
            OperationResult::LegacyFkSpectra(spectra) => Ok(spectra),
            other => Err(unexpected(other)),
        })
    }
    pub fn export_waveform_store(&self) -> Result<PendingCall<StoreSnapshot>, PipelineError> {
        self.call(Operation::ExportWaveformStore, |result| match result {
            OperationResult::WaveformStore(snapshot) => Ok(snapshot),
            other => Err(unexpected(other)),
        })
    }
    pub fn import_waveform_store(&self, snapshot: StoreSnapshot) -> Result<PendingCall<()>, PipelineError> {
        self.call(Operation::ImportWaveformStore(snapshot), |result| match result {
            OperationResult::Imported { .. } => Ok(()),
            other => Err(unexpected(other)),
        })
    }
    pub fn fetch_event_beams(
        &self,
        request: EventBeamRequest,
    ) -> Result<PendingCall<Vec<EventBeam>>, PipelineError> {
        for station in &request.stations {
            station.window.validate()?;
            if station.channels.is_empty() {
                return Err(PipelineError::InvalidConfiguration(format!(
                    "station {} has no channels to beam",
                    station.station
                )));
            }
        }
        self.call(
            Operation::FetchEventBeamsByEventHypothesisAndStations(request),
            |result| match result {
                OperationResult::EventBeams(beams) => Ok(beams),
                other => Err(unexpected(other)),
            },
        )
    }
}
/// Outcome of matching a reply against the newest request for its slot.
#[derive(Clone, Debug, PartialEq)]
pub enum Delivery<T> {
    Current(T),
    Stale,
}
/// Tracks the newest request issued for one logical purpose, such as one channel's buffer.
#[derive(Clone, Debug, Default)]
pub struct ResponseSlot {
    latest: Option<RequestId>,
}
impl ResponseSlot {
    pub fn new() -> Self {
        Self::default()
    }
    /// Record `request_id` as the newest; replies to anything older become stale.
    pub fn issue(&mut self, request_id: RequestId) {
        self.latest = Some(request_id);
    }
    /// Forget the newest request without issuing another, making every in-flight reply stale.
    pub fn supersede(&mut self) {
        self.latest = None;
    }
    pub fn latest(&self) -> Option<RequestId> {
        self.latest
    }
    pub fn is_pending(&self) -> bool {
        self.latest.is_some()
    }
    pub fn accept<T>(&mut self, request_id: RequestId, value: T) -> Delivery<T> {
        if self.latest == Some(request_id) {
            self.latest = None;
            Delivery::Current(value)
        } else {
            log::debug!("{request_id}: discarding stale reply");
            Delivery::Stale
        }
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::sigpro::{
        ChannelPosition, ChannelSegment, FkComputeInput, SlownessGrid, TimeRange, WaveformSegment,
    };
    use crate::types::{RpcError, RpcOutcome};
    fn client() -> (WorkerClient, crossbeam::channel::Receiver<WorkerMessage>) {
        let (tx, rx) = crossbeam::channel::unbounded();
        (WorkerClient::new(tx, FkConfig::default()), rx)
    }
    fn next_call(rx: &crossbeam::channel::Receiver<WorkerMessage>) -> Envelope {
        match rx.try_recv() {
            Ok(WorkerMessage::Call(envelope)) => envelope,
            _ => panic!("expected a queued call"),
        }
    }
    #[test]
    fn tokens_are_unique_and_replies_correlate() {
        let (client, rx) = client();
        let mut first = client.export_waveform_store().unwrap();
        let second = client.export_waveform_store().unwrap();
        assert_ne!(first.request_id(), second.request_id());
        let a = next_call(&rx);
        let b = next_call(&rx);
        assert_eq!(a.request.request_id, first.request_id());
        assert!(first.try_take().is_none());
        b.reply
            .send(RpcResponse::success(
                b.request.request_id,
                OperationResult::WaveformStore(StoreSnapshot::new()),
            ))
            .unwrap();
        a.reply
            .send(RpcResponse::failure(
                a.request.request_id,
                RpcError {
                    name: "Boom".into(),
                    message: "bad".into(),
                },
            ))
            .unwrap();
        assert!(second.wait().unwrap().is_empty());
        match first.try_take() {
            Some(Err(PipelineError::RpcFailure { name, .. })) => assert_eq!(name, "Boom"),
            _ => panic!("expected the failure for the first call"),
        }
    }
    #[test]
    fn validation_happens_before_dispatch() {
        let (client, rx) = client();
        let request = PositionBufferRequest {
            segment: WaveformSegment::new("s", 0.0, 0.0, vec![1.0]),
            viewport: TimeRange::new(0.0, 1.0).unwrap(),
            width_px: 10,
        };
        assert!(matches!(
            client.create_position_buffer(request),
            Err(PipelineError::InvalidSegment(_))
        ));
        assert!(matches!(
            client.compute_fk(fk_request(2)),
            Err(PipelineError::InsufficientChannels { .. })
        ));
        assert!(rx.try_recv().is_err());
    }
    fn fk_request(channel_count: usize) -> FkComputeRequest {
        let channels: Vec<ChannelSegment> = (0..channel_count)
            .map(|i| {
                ChannelSegment::new(
                    format!("A.S{i}.SHZ"),
                    ChannelPosition::default(),
                    WaveformSegment::new("w", 40.0, 0.0, vec![0.0; 400]),
                )
            })
            .collect();
        FkComputeRequest {
            input: FkComputeInput {
                start_time: 0.0,
                sample_rate: 40.0,
                sample_count: 400,
                channels: Vec::new(),
                window_lead: "PT1S".into(),
                window_length: "PT4S".into(),
                low_frequency: 0.5,
                high_frequency: 3.0,
                use_channel_vertical_offset: false,
                phase_type: "P".into(),
                normalize_waveforms: false,
                slowness_grid: SlownessGrid::centered(5, 10.0),
            },
            channels,
        }
    }
    #[test]
    fn fk_configuration_errors_are_synchronous() {
        let (client, rx) = client();
        let mut oversized = fk_request(3);
        oversized.input.window_length = "P100000W".into();
        assert!(matches!(
            client.compute_fk(oversized),
            Err(PipelineError::InvalidConfiguration(_))
        ));
        let mut too_long = fk_request(3);
        too_long.input.window_length = "PT11S".into();
        assert!(matches!(
            client.compute_legacy_fk(too_long),
            Err(PipelineError::InvalidConfiguration(_))
        ));
        let mut no_bins = fk_request(3);
        no_bins.input.low_frequency = 0.3;
        no_bins.input.high_frequency = 0.45;
        assert!(matches!(
            client.compute_fk(no_bins),
            Err(PipelineError::InvalidConfiguration(_))
        ));
        let mut mixed_rates = fk_request(3);
        mixed_rates.channels[2].segment = WaveformSegment::new("w", 20.0, 0.0, vec![0.0; 200]);
        assert!(matches!(
            client.compute_fk(mixed_rates),
            Err(PipelineError::InvalidSegment(_))
        ));
        let bands = [FrequencyBand::new(0.5, 2.0), FrequencyBand::new(0.3, 0.45)];
        assert!(client.compute_fk_frequency_thumbnails(&fk_request(3), &bands).is_err());
        assert!(rx.try_recv().is_err());
        let calls = client
            .compute_fk_frequency_thumbnails(&fk_request(3), &bands[..1])
            .unwrap();
        assert_eq!(calls.len(), 1);
        assert!(matches!(rx.try_recv(), Ok(WorkerMessage::Call(_))));
    }
    #[test]
    fn wrong_result_kind_is_reported() {
        let (client, rx) = client();
        let pending = client.export_waveform_store().unwrap();
        let envelope = next_call(&rx);
        envelope
            .reply
            .send(RpcResponse {
                request_id: envelope.request.request_id,
                outcome: RpcOutcome::Result(OperationResult::PositionBuffer(PositionBuffer::default())),
            })
            .unwrap();
        assert!(matches!(
            pending.wait(),
            Err(PipelineError::RpcFailure { .. })
        ));
    }
    #[test]
    fn dropped_reply_means_worker_unavailable() {
        let (client, rx) = client();
        let pending = client.export_waveform_store().unwrap();
        drop(rx);
        assert!(matches!(pending.wait(), Err(PipelineError::WorkerUnavailable)));
        assert!(matches!(
            client.export_waveform_store(),
            Err(PipelineError::WorkerUnavailable)
        ));
    }
    #[test]
    fn slot_discards_older_tokens() {
        let mut slot = ResponseSlot::new();
        slot.issue(RequestId(1));
        slot.issue(RequestId(2));
        assert_eq!(slot.accept(RequestId(2), "b"), Delivery::Current("b"));
        assert_eq!(slot.accept(RequestId(1), "a"), Delivery::Stale);
        assert!(!slot.is_pending());
    }
}
