use std::{
    collections::{HashMap, hash_map},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{
    backend::{RequestContext, TempDataBackend},
    error::{Error, Result},
    value::{TempMap, TempValue},
};

/// Per-request temp data, loaded from the backend on first access.
///
/// Keys compare case-insensitively; the spelling of the first write is kept. Entries that are
/// read with [`TempData::get`] are dropped at [`TempData::save`] unless kept, entries that are
/// only peeked at or were never touched carry over to the next request.
#[derive(Debug, Clone)]
pub struct TempData {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    backend: Arc<dyn TempDataBackend>,
    ctx: RequestContext,
    state: Mutex<State>,
}

#[derive(Debug, Default)]
struct State {
    loaded: bool,
    entries: HashMap<String, Entry>,
}

#[derive(Debug, Clone)]
struct Entry {
    key: String,
    value: TempValue,
    // Loaded and not yet read, or written during this request.
    retain: bool,
    kept: bool,
}

fn fold(key: &str) -> String {
    key.to_lowercase()
}

impl State {
    fn fill(&mut self, values: TempMap) {
        for (key, value) in values {
            match self.entries.entry(fold(&key)) {
                hash_map::Entry::Occupied(mut slot) => slot.get_mut().value = value,
                hash_map::Entry::Vacant(slot) => {
                    slot.insert(Entry {
                        key,
                        value,
                        retain: true,
                        kept: false,
                    });
                }
            }
        }
        self.loaded = true;
    }
}

impl TempData {
    pub fn new(backend: Arc<dyn TempDataBackend>, ctx: RequestContext) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                ctx,
                state: Mutex::new(State::default()),
            }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.inner
            .state
            .lock()
            .map_err(|_| Error::Backend("temp data lock is poisoned".into()))
    }

    pub fn is_loaded(&self) -> bool {
        self.lock().map(|state| state.loaded).unwrap_or(false)
    }

    /// Loads from the backend unless this request already did.
    pub async fn load(&self) -> Result<()> {
        let loaded = self.lock()?.loaded;
        if loaded {
            return Ok(());
        }

        let values = self.inner.backend.load(&self.inner.ctx).await?;
        tracing::debug!(entries = values.len(), "temp data loaded");

        let mut state = self.lock()?;
        if !state.loaded {
            state.fill(values);
        }
        Ok(())
    }

    /// Returns the value and marks it as read.
    pub async fn get(&self, key: &str) -> Result<Option<TempValue>> {
        self.load().await?;
        let mut state = self.lock()?;
        Ok(state.entries.get_mut(&fold(key)).map(|entry| {
            entry.retain = false;
            entry.value.clone()
        }))
    }

    /// Returns the value without marking it as read.
    pub async fn peek(&self, key: &str) -> Result<Option<TempValue>> {
        self.load().await?;
        let state = self.lock()?;
        Ok(state.entries.get(&fold(key)).map(|entry| entry.value.clone()))
    }

    pub async fn insert<K, V>(&self, key: K, value: V) -> Result<Option<TempValue>>
    where
        K: Into<String>,
        V: Into<TempValue>,
    {
        self.load().await?;
        let key = key.into();
        let value = value.into();
        let mut state = self.lock()?;

        match state.entries.get_mut(&fold(&key)) {
            Some(entry) => {
                entry.retain = true;
                Ok(Some(std::mem::replace(&mut entry.value, value)))
            }
            None => {
                state.entries.insert(
                    fold(&key),
                    Entry {
                        key,
                        value,
                        retain: true,
                        kept: false,
                    },
                );
                Ok(None)
            }
        }
    }

    pub async fn remove(&self, key: &str) -> Result<Option<TempValue>> {
        self.load().await?;
        let mut state = self.lock()?;
        Ok(state.entries.remove(&fold(key)).map(|entry| entry.value))
    }

    pub async fn contains_key(&self, key: &str) -> Result<bool> {
        self.load().await?;
        Ok(self.lock()?.entries.contains_key(&fold(key)))
    }

    pub async fn keys(&self) -> Result<Vec<String>> {
        self.load().await?;
        let state = self.lock()?;
        let mut keys: Vec<String> = state.entries.values().map(|entry| entry.key.clone()).collect();
        keys.sort();
        Ok(keys)
    }

    pub async fn len(&self) -> Result<usize> {
        self.load().await?;
        Ok(self.lock()?.entries.len())
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    pub async fn clear(&self) -> Result<()> {
        self.load().await?;
        self.lock()?.entries.clear();
        Ok(())
    }

    /// Keeps every current entry for one more request, read or not.
    pub async fn keep(&self) -> Result<()> {
        self.load().await?;
        for entry in self.lock()?.entries.values_mut() {
            entry.kept = true;
        }
        Ok(())
    }

    pub async fn keep_key(&self, key: &str) -> Result<()> {
        self.load().await?;
        if let Some(entry) = self.lock()?.entries.get_mut(&fold(key)) {
            entry.kept = true;
        }
        Ok(())
    }

    /// Persists the retained entries through the backend.
    ///
    /// A store that was never loaded leaves the backend untouched.
    pub async fn save(&self) -> Result<()> {
        let values = {
            let mut state = self.lock()?;
            if !state.loaded {
                return Ok(());
            }
            state.entries.retain(|_, entry| entry.retain || entry.kept);
            state
                .entries
                .values()
                .map(|entry| (entry.key.clone(), entry.value.clone()))
                .collect::<TempMap>()
        };

        self.inner.backend.save(&self.inner.ctx, &values).await
    }
}
