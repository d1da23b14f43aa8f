//! Lazily constructed, shared collaborator handles.

use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use super::{Editor, EngineFactory, EngineResult, Player};

/// A value built on first use and shared afterwards.
///
/// Concurrent first callers serialize on the init mutex, so the builder
/// runs at most once while it succeeds. A failed build is not cached.
pub struct LazyHandle<T: ?Sized> {
    cell: OnceLock<Arc<T>>,
    init: Mutex<()>,
}

impl<T: ?Sized> Default for LazyHandle<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> LazyHandle<T> {
    pub fn new() -> Self {
        Self {
            cell: OnceLock::new(),
            init: Mutex::new(()),
        }
    }

    pub fn get_or_try_init<E>(
        &self,
        build: impl FnOnce() -> Result<Arc<T>, E>,
    ) -> Result<Arc<T>, E> {
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }

        let _guard = self.init.lock();
        if let Some(value) = self.cell.get() {
            return Ok(Arc::clone(value));
        }

        let value = build()?;
        let _ = self.cell.set(Arc::clone(&value));
        Ok(value)
    }

    #[cfg(test)]
    pub fn is_initialized(&self) -> bool {
        self.cell.get().is_some()
    }
}

/// Editor and player handles over one factory.
pub struct Engines {
    factory: Arc<dyn EngineFactory>,
    editor: LazyHandle<dyn Editor>,
    player: LazyHandle<dyn Player>,
}

impl Engines {
    pub fn new(factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            factory,
            editor: LazyHandle::new(),
            player: LazyHandle::new(),
        }
    }

    pub fn editor(&self) -> EngineResult<Arc<dyn Editor>> {
        self.editor.get_or_try_init(|| self.factory.editor())
    }

    pub fn player(&self) -> EngineResult<Arc<dyn Player>> {
        self.player.get_or_try_init(|| self.factory.player())
    }
}
