//! Shared holder for an engine that is loaded in the background

use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;

use crate::errors::Result;
use crate::errors::VerseRagError;
use crate::rag::RetrievalEngine;

#[derive(Default)]
enum SlotState {
    #[default]
    Loading,
    Ready(Arc<RetrievalEngine>),
    Failed(String),
}

/// Starts out loading and ends either ready or failed. Neither end state
/// changes afterwards.
///
/// Readers clone the `Arc` and drop the lock before searching.
#[derive(Default)]
pub struct EngineSlot {
    state: RwLock<SlotState>,
}

impl EngineSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engine(engine: RetrievalEngine) -> Self {
        Self {
            state: RwLock::new(SlotState::Ready(Arc::new(engine))),
        }
    }

    pub fn install(&self, engine: RetrievalEngine) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        *guard = SlotState::Ready(Arc::new(engine));
    }

    /// Record that loading gave up; `reason` stays server-side
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if !matches!(*guard, SlotState::Ready(_)) {
            *guard = SlotState::Failed(reason.into());
        }
    }

    pub fn get(&self) -> Result<Arc<RetrievalEngine>> {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Ready(engine) => Ok(Arc::clone(engine)),
            SlotState::Loading => Err(VerseRagError::NotReady(
                "models are still loading".to_string(),
            )),
            SlotState::Failed(reason) => Err(VerseRagError::LoadFailed(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.get().is_ok()
    }

    /// `loading`, `healthy` or `failed`
    pub fn status(&self) -> &'static str {
        match &*self.state.read().unwrap_or_else(PoisonError::into_inner) {
            SlotState::Loading => "loading",
            SlotState::Ready(_) => "healthy",
            SlotState::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_slot_is_not_ready() {
        let slot = EngineSlot::new();
        assert!(!slot.is_ready());
        assert_eq!(slot.status(), "loading");
        assert!(matches!(slot.get(), Err(VerseRagError::NotReady(_))));
    }

    #[test]
    fn test_failed_slot_stops_reporting_loading() {
        let slot = EngineSlot::new();
        slot.mark_failed("index.bin not found");
        assert!(!slot.is_ready());
        assert_eq!(slot.status(), "failed");
        match slot.get() {
            Err(VerseRagError::LoadFailed(reason)) => assert_eq!(reason, "index.bin not found"),
            _ => panic!("expected a load failure"),
        }
    }
}
