//! Server-wide state: the processor, translations and live sessions

use crate::{
    config::ProcessorConfig,
    error::Result,
    i18n::Translator,
    processor::StyleTransferProcessor,
    session::SessionContext,
};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Sessions idle for longer than this are closed and their files removed
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(60 * 60);

struct SessionSlot {
    context: SessionContext,
    last_seen: Instant,
}

/// Everything a request handler needs
pub struct AppState {
    pub processor: StyleTransferProcessor,
    pub translator: Translator,
    sessions: HashMap<Uuid, SessionSlot>,
    idle_timeout: Duration,
}

impl AppState {
    /// Build state around a configured processor
    pub fn new(processor: StyleTransferProcessor) -> Result<Self> {
        let translator = Translator::from_config(processor.config())?;
        Ok(Self::with_translator(processor, translator))
    }

    #[must_use]
    pub fn with_translator(processor: StyleTransferProcessor, translator: Translator) -> Self {
        Self {
            processor,
            translator,
            sessions: HashMap::new(),
            idle_timeout: SESSION_IDLE_TIMEOUT,
        }
    }

    /// Override the idle timeout
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        self.processor.config()
    }

    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Existing session for `id`, if still alive
    pub fn session(&mut self, id: Uuid) -> Option<&mut SessionContext> {
        let slot = self.sessions.get_mut(&id)?;
        slot.last_seen = Instant::now();
        Some(&mut slot.context)
    }

    /// Start a new session in the default locale and return its id
    pub fn open_session(&mut self) -> Uuid {
        let config = self.processor.config();
        let context = SessionContext::new(&config.staging_root, self.translator.default_locale());
        let id = context.id;
        log::info!("Opened session {}", id);
        self.sessions.insert(
            id,
            SessionSlot {
                context,
                last_seen: Instant::now(),
            },
        );
        id
    }

    /// Borrow the processor, translator and a session at once
    pub fn parts(
        &mut self,
        id: Uuid,
    ) -> Option<(&mut StyleTransferProcessor, &Translator, &mut SessionContext)> {
        let slot = self.sessions.get_mut(&id)?;
        slot.last_seen = Instant::now();
        Some((&mut self.processor, &self.translator, &mut slot.context))
    }

    /// Close sessions idle past the timeout; returns how many were closed
    pub fn evict_idle(&mut self) -> usize {
        let now = Instant::now();
        let timeout = self.idle_timeout;
        let expired: Vec<Uuid> = self
            .sessions
            .iter()
            .filter(|(_, slot)| now.duration_since(slot.last_seen) >= timeout)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(mut slot) = self.sessions.remove(id) {
                if let Err(e) = slot.context.close() {
                    log::warn!("Failed to clean up session {}: {}", id, e);
                } else {
                    log::info!("Closed idle session {}", id);
                }
            }
        }
        expired.len()
    }

    /// Close every session
    pub fn shutdown(&mut self) {
        for (id, mut slot) in self.sessions.drain() {
            if let Err(e) = slot.context.close() {
                log::warn!("Failed to clean up session {}: {}", id, e);
            }
        }
    }
}
