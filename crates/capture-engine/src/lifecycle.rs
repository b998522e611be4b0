//! Engine lifecycle: `Uninitialized → Initialized → Uninitialized`.

use std::sync::Arc;

use crate::engine::{Engine, EngineError};

/// Owns the engine and whether it has been started.
pub struct EngineLifecycle {
    engine: Arc<dyn Engine>,
    initialized: bool,
}

impl EngineLifecycle {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            initialized: false,
        }
    }

    /// Start the engine. A no-op when already initialized; on failure the
    /// lifecycle stays uninitialized.
    pub fn init(&mut self) -> Result<(), EngineError> {
        if self.initialized {
            return Ok(());
        }
        self.engine.startup()?;
        self.initialized = true;
        tracing::info!(version = ?self.engine.version(), "Engine initialized");
        Ok(())
    }

    /// Tear the engine down. A no-op when not initialized.
    pub fn shutdown(&mut self) {
        if !self.initialized {
            return;
        }
        self.engine.shutdown();
        self.initialized = false;
        tracing::info!("Engine shut down");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }
}

impl Drop for EngineLifecycle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{FailPoint, FakeEngine};

    #[test]
    fn init_and_shutdown_are_idempotent() {
        let engine = Arc::new(FakeEngine::new());
        let mut lifecycle = EngineLifecycle::new(engine.clone());

        lifecycle.init().unwrap();
        lifecycle.init().unwrap();
        assert!(lifecycle.is_initialized());
        assert_eq!(engine.startup_count(), 1);

        lifecycle.shutdown();
        lifecycle.shutdown();
        assert!(!lifecycle.is_initialized());
        assert_eq!(engine.shutdown_count(), 1);
    }

    #[test]
    fn failed_startup_stays_uninitialized() {
        let engine = Arc::new(FakeEngine::new());
        engine.inject_failure(FailPoint::Startup);
        let mut lifecycle = EngineLifecycle::new(engine.clone());

        let err = lifecycle.init().unwrap_err();
        assert!(matches!(err, EngineError::StartupFailed { .. }));
        assert!(!lifecycle.is_initialized());

        lifecycle.init().unwrap();
        assert!(lifecycle.is_initialized());
    }

    #[test]
    fn drop_shuts_engine_down() {
        let engine = Arc::new(FakeEngine::new());
        {
            let mut lifecycle = EngineLifecycle::new(engine.clone());
            lifecycle.init().unwrap();
        }
        assert!(!engine.is_started());
    }
}
