//! Layout model handle
//!
//! Owns the heavy layout engine. The engine is constructed on first use and
//! then kept for the life of the process; it is never rebuilt once a load
//! has succeeded. A failed load leaves the handle empty, so a later request
//! may try again.

use std::time::Instant;

use super::announce;
use crate::error::{OcrError, Result};
use crate::ocr::engine::{LayoutEngine, LayoutEngineLoader};

/// Notice emitted before the model load starts
pub const LOADING_NOTICE: &str = "loading layout model...";

/// Notice emitted once the model is ready
pub const LOADED_NOTICE: &str = "layout model loaded";

pub struct LayoutModelHandle<L: LayoutEngineLoader> {
    loader: L,
    engine: Option<Box<dyn LayoutEngine>>,
}

impl<L: LayoutEngineLoader> LayoutModelHandle<L> {
    /// Create an empty handle; nothing is loaded yet
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            engine: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.engine.is_some()
    }

    /// Borrow the engine, loading it first if this is the first use
    pub async fn get_or_load(&mut self) -> Result<&mut (dyn LayoutEngine + 'static)> {
        if self.engine.is_none() {
            announce(LOADING_NOTICE);
            let started = Instant::now();

            let engine = self.loader.load().await.map_err(|e| {
                tracing::error!("Layout model load failed: {}", e);
                e
            })?;

            announce(LOADED_NOTICE);
            tracing::info!("Layout model loaded in {}ms", started.elapsed().as_millis());
            self.engine = Some(engine);
        }

        self.engine
            .as_deref_mut()
            .ok_or_else(|| OcrError::Init("layout engine unavailable".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::engine::mock::MockLayoutLoader;
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn test_loads_lazily_and_once() {
        let loader = MockLayoutLoader::default();
        let mut handle = LayoutModelHandle::new(loader.clone());
        assert!(!handle.is_loaded());
        assert_eq!(loader.load_count(), 0);

        handle.get_or_load().await.unwrap();
        handle.get_or_load().await.unwrap();
        handle.get_or_load().await.unwrap();

        assert!(handle.is_loaded());
        assert_eq!(loader.load_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_load_can_be_retried() {
        let loader = MockLayoutLoader::default();
        loader.failures_before_success.store(1, Ordering::SeqCst);
        let mut handle = LayoutModelHandle::new(loader.clone());

        assert!(matches!(handle.get_or_load().await, Err(OcrError::Init(_))));
        assert!(!handle.is_loaded());

        handle.get_or_load().await.unwrap();
        assert!(handle.is_loaded());
        assert_eq!(loader.load_count(), 2);
    }
}
