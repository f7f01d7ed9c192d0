//! Prism3D Engine - Singleton manager for engine subsystems
//!
//! Holds the process-wide renderer and the replaceable logger in
//! thread-safe static storage.

use std::sync::{OnceLock, RwLock};
use std::time::SystemTime;
use crate::graphics_device::GraphicsDevice;
use crate::renderer::{Renderer, RendererConfig};
use crate::error::{Result, Error};
use crate::log::{Logger, LogEntry, LogSeverity, DefaultLogger};

// ===== INTERNAL STATE =====

/// Global engine state storage
static ENGINE_STATE: OnceLock<EngineState> = OnceLock::new();

/// Global logger (initialized with DefaultLogger)
static LOGGER: OnceLock<RwLock<Box<dyn Logger>>> = OnceLock::new();

/// Internal state structure holding all engine singletons
struct EngineState {
    renderer: RwLock<Option<Renderer>>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            renderer: RwLock::new(None),
        }
    }
}

// ===== PUBLIC API =====

/// Main engine singleton manager
///
/// # Example
///
/// ```no_run
/// use prism_3d_engine::prism3d::{Engine, RendererConfig};
/// use prism_3d_engine::prism3d::device::NullGraphicsDevice;
///
/// Engine::initialize()?;
/// let renderer = Engine::create_renderer(NullGraphicsDevice::new(), RendererConfig::default())?;
/// // ... render frames ...
/// Engine::shutdown();
/// # Ok::<(), prism_3d_engine::prism3d::Error>(())
/// ```
pub struct Engine;

impl Engine {
    fn log_and_return_error(error: Error) -> Error {
        crate::engine_error!("prism3d::Engine", "{}", error);
        error
    }

    fn state() -> Result<&'static EngineState> {
        ENGINE_STATE.get().ok_or_else(|| {
            Self::log_and_return_error(Error::InitializationFailed(
                "Engine not initialized. Call Engine::initialize() first".to_string(),
            ))
        })
    }

    /// Initialize the engine
    ///
    /// Idempotent; must be called before creating the renderer.
    pub fn initialize() -> Result<()> {
        ENGINE_STATE.get_or_init(EngineState::new);
        Ok(())
    }

    /// Shutdown the engine, destroying the renderer and every resource
    /// still uploaded to it.
    pub fn shutdown() {
        if let Some(state) = ENGINE_STATE.get() {
            if let Ok(mut slot) = state.renderer.write() {
                if let Some(renderer) = slot.take() {
                    renderer.shutdown();
                }
            }
        }
    }

    /// Create and register the renderer singleton
    ///
    /// # Arguments
    ///
    /// * `device` - Backend implementing [`GraphicsDevice`]
    /// * `config` - Renderer configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized, a renderer already
    /// exists, or the device fails to report its capabilities.
    ///
    /// # Threading
    ///
    /// [`Engine::renderer`] hands the renderer to any thread. Devices tied to
    /// a thread-bound API context (the OpenGL backend) must only be driven
    /// from the thread that owns that context: every render call and every
    /// resource upload, destroy, mutation or drop of an uploaded resource
    /// belongs on that thread.
    pub fn create_renderer<D: GraphicsDevice + 'static>(
        device: D,
        config: RendererConfig,
    ) -> Result<Renderer> {
        let state = Self::state()?;
        let mut slot = state.renderer.write().map_err(|_| {
            Self::log_and_return_error(Error::BackendError("Renderer lock poisoned".to_string()))
        })?;

        if slot.is_some() {
            return Err(Self::log_and_return_error(Error::InitializationFailed(
                "Renderer already exists. Call destroy_renderer() first".to_string(),
            )));
        }

        let renderer = Renderer::new(device, config)?;
        *slot = Some(renderer.clone());
        Ok(renderer)
    }

    /// Get the renderer singleton
    ///
    /// # Errors
    ///
    /// Returns an error if the engine is not initialized or no renderer exists.
    pub fn renderer() -> Result<Renderer> {
        let state = Self::state()?;
        let slot = state.renderer.read().map_err(|_| {
            Self::log_and_return_error(Error::BackendError("Renderer lock poisoned".to_string()))
        })?;

        slot.clone().ok_or_else(|| {
            Self::log_and_return_error(Error::InitializationFailed(
                "Renderer not created. Call Engine::create_renderer() first".to_string(),
            ))
        })
    }

    /// Shut down and unregister the renderer singleton
    pub fn destroy_renderer() -> Result<()> {
        let state = Self::state()?;
        let mut slot = state.renderer.write().map_err(|_| {
            Self::log_and_return_error(Error::BackendError("Renderer lock poisoned".to_string()))
        })?;

        if let Some(renderer) = slot.take() {
            renderer.shutdown();
        }
        Ok(())
    }

    // ===== LOGGING API =====

    /// Set a custom logger
    ///
    /// ```no_run
    /// use prism_3d_engine::prism3d::{Engine, log::{Logger, LogEntry}};
    ///
    /// struct FileLogger;
    /// impl Logger for FileLogger {
    ///     fn log(&self, entry: &LogEntry) {
    ///         // Write to file...
    ///     }
    /// }
    ///
    /// Engine::set_logger(FileLogger);
    /// ```
    pub fn set_logger<L: Logger + 'static>(logger: L) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(mut lock) = logger_lock.write() {
            *lock = Box::new(logger);
        }
    }

    /// Reset logger to [`DefaultLogger`]
    pub fn reset_logger() {
        Self::set_logger(DefaultLogger);
    }

    /// Log without file:line (used by `engine_trace!` .. `engine_warn!`)
    pub fn log(severity: LogSeverity, source: &str, message: String) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: None,
            line: None,
        });
    }

    /// Log with file:line (used by `engine_error!`)
    pub fn log_detailed(
        severity: LogSeverity,
        source: &str,
        message: String,
        file: &'static str,
        line: u32,
    ) {
        Self::dispatch(LogEntry {
            severity,
            timestamp: SystemTime::now(),
            source: source.to_string(),
            message,
            file: Some(file),
            line: Some(line),
        });
    }

    fn dispatch(entry: LogEntry) {
        let logger_lock = LOGGER.get_or_init(|| RwLock::new(Box::new(DefaultLogger)));
        if let Ok(lock) = logger_lock.read() {
            lock.log(&entry);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
