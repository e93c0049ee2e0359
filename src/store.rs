// src/store.rs
// worker 侧的波形缓存：id -> 采样数组
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use crate::sigpro::PipelineError;
/// Exported form of the store. Sample arrays are shared handles, so exporting copies no samples.
pub type StoreSnapshot = BTreeMap<String, Arc<[f64]>>;
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformStore {
    waveforms: StoreSnapshot,
}
impl WaveformStore {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn insert(&mut self, id: impl Into<String>, samples: impl Into<Arc<[f64]>>) -> Option<Arc<[f64]>> {
        self.waveforms.insert(id.into(), samples.into())
    }
    pub fn get(&self, id: &str) -> Option<Arc<[f64]>> {
        self.waveforms.get(id).cloned()
    }
    pub fn len(&self) -> usize {
        self.waveforms.len()
    }
    pub fn is_empty(&self) -> bool {
        self.waveforms.is_empty()
    }
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.waveforms.keys().map(String::as_str)
    }
    pub fn export(&self) -> StoreSnapshot {
        self.waveforms.clone()
    }
    /// Replace the whole store with `snapshot`.
    pub fn import(&mut self, snapshot: StoreSnapshot) {
        log::debug!(
            "importing {} waveforms (replacing {})",
            snapshot.len(),
            self.waveforms.len()
        );
        self.waveforms = snapshot;
    }
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let json = serde_json::to_string(&self.waveforms)?;
        fs::write(path, json)?;
        Ok(())
    }
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = fs::read_to_string(path)?;
        let waveforms: StoreSnapshot = serde_json::from_str(&text)?;
        Ok(Self { waveforms })
    }
}
