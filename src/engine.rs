// src/engine.rs
// worker 线程池：从共享队列取请求，执行操作，通过 oneshot 回复
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use crossbeam::channel::Receiver;
use crate::config::{AppConfig, FkConfig};
use crate::rpc::{Envelope, WorkerClient, WorkerMessage};
use crate::sigpro::{
    compute_fk_spectra, compute_legacy_fk_spectra, fetch_event_beams, get_peak_fk_attributes,
    PipelineError,
};
use crate::store::WaveformStore;
use crate::types::{Operation, OperationResult, RpcError, RpcResponse};
use crate::weavess::{build_position_buffer, build_record_section};
/// State every worker thread can reach. FK calls keep nothing between invocations.
#[derive(Clone)]
pub struct WorkerContext {
    pub store: Arc<RwLock<WaveformStore>>,
    pub fk: FkConfig,
}
/// Run one operation. Every variant has exactly one handler.
pub fn dispatch(operation: Operation, ctx: &WorkerContext) -> Result<OperationResult, PipelineError> {
    match operation {
        Operation::CreatePositionBuffer(request) => {
            build_position_buffer(&request).map(OperationResult::PositionBuffer)
        }
        Operation::CreateRecordSectionPositionBuffer(request) => {
            build_record_section(&request).map(OperationResult::RecordSection)
        }
        Operation::ComputeFkSpectra(request) => {
            compute_fk_spectra(&request.input, &request.channels, &ctx.fk).map(OperationResult::FkSpectra)
        }
        Operation::GetPeakFkAttributes(spectra) => {
            get_peak_fk_attributes(&spectra).map(OperationResult::FkAttributes)
        }
        Operation::ComputeLegacyFkSpectra(request) => {
            compute_legacy_fk_spectra(&request.input, &request.channels, &ctx.fk)
                .map(OperationResult::LegacyFkSpectra)
        }
        Operation::ExportWaveformStore => {
            let store = ctx.store.read().unwrap_or_else(|poisoned| poisoned.into_inner());
            Ok(OperationResult::WaveformStore(store.export()))
        }
        Operation::ImportWaveformStore(snapshot) => {
            let count = snapshot.len();
            let mut store = ctx.store.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            store.import(snapshot);
            Ok(OperationResult::Imported { count })
        }
        Operation::FetchEventBeamsByEventHypothesisAndStations(request) => {
            fetch_event_beams(&request).map(OperationResult::EventBeams)
        }
    }
}
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "worker panicked".to_owned()
    }
}
/// Execute one call, turning errors and panics into a serialized failure.
fn handle(envelope: Envelope, ctx: &WorkerContext) {
    let Envelope { request, reply } = envelope;
    let request_id = request.request_id;
    let kind = request.operation.kind();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(request.operation, ctx)));
    let response = match outcome {
        Ok(Ok(result)) => RpcResponse::success(request_id, result),
        Ok(Err(err)) => {
            log::warn!("{request_id}: {kind} failed: {err}");
            RpcResponse::failure(request_id, RpcError::from(&err))
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            log::error!("{request_id}: {kind} panicked: {message}");
            RpcResponse::failure(
                request_id,
                RpcError {
                    name: "Panic".to_owned(),
                    message,
                },
            )
        }
    };
    if reply.send(response).is_err() {
        log::debug!("{request_id}: caller went away before the reply");
    }
}
fn run(name: String, queue: Receiver<WorkerMessage>, ctx: WorkerContext) {
    log::info!("{name} started");
    while let Ok(message) = queue.recv() {
        match message {
            WorkerMessage::Call(envelope) => handle(envelope, &ctx),
            WorkerMessage::Shutdown => {
                log::info!("{name} shutting down");
                break;
            }
        }
    }
    log::info!("{name} stopped");
}
pub struct WorkerPool {
    client: WorkerClient,
    store: Arc<RwLock<WaveformStore>>,
    handles: Vec<JoinHandle<()>>,
}
pub fn spawn_workers(config: &AppConfig) -> Result<WorkerPool, PipelineError> {
    config.validate()?;
    let (queue_tx, queue_rx) = crossbeam::channel::unbounded();
    let ctx = WorkerContext {
        store: Arc::new(RwLock::new(WaveformStore::new())),
        fk: config.fk.clone(),
    };
    let client = WorkerClient::new(queue_tx, config.fk.clone());
    let mut pool = WorkerPool {
        client,
        store: ctx.store.clone(),
        handles: Vec::with_capacity(config.worker.threads),
    };
    for index in 0..config.worker.threads {
        let name = format!("{}-{index}", config.worker.thread_name);
        let queue = queue_rx.clone();
        let ctx = ctx.clone();
        let handle = thread::Builder::new()
            .name(name.clone())
            .spawn(move || run(name, queue, ctx))?;
        pool.handles.push(handle);
    }
    Ok(pool)
}
impl WorkerPool {
    pub fn client(&self) -> WorkerClient {
        self.client.clone()
    }
    pub fn store(&self) -> Arc<RwLock<WaveformStore>> {
        self.store.clone()
    }
    pub fn thread_count(&self) -> usize {
        self.handles.len()
    }
    /// Stop every worker once the calls queued before this one have run.
    pub fn shutdown(mut self) {
        self.stop();
    }
    fn stop(&mut self) {
        for _ in 0..self.handles.len() {
            self.client.send_shutdown();
        }
        for handle in self.handles.drain(..) {
            if handle.join().is_err() {
                log::error!("worker thread exited abnormally");
            }
        }
    }
}
impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}
