//! Per-request pipeline handles: the "response is starting" hook list, a type-keyed side-table
//! and the classification of the produced response.

use std::{
    fmt,
    future::Future,
    sync::{Arc, Mutex, PoisonError},
};

use futures::{FutureExt as _, future::BoxFuture};
use http::{Extensions, Response, StatusCode};

use crate::error::Result;

type StartingHook = Box<dyn FnOnce(ResultKind) -> BoxFuture<'static, Result<()>> + Send>;

/// Whether a response asks for the loaded temp data to survive another request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    Default,
    /// Redirects, or responses carrying the [`KeepTempData`] extension.
    KeepTempData,
}

impl ResultKind {
    pub fn of<B>(response: &Response<B>) -> Self {
        if is_redirect(response.status()) || response.extensions().get::<KeepTempData>().is_some() {
            ResultKind::KeepTempData
        } else {
            ResultKind::Default
        }
    }

    pub fn keeps_temp_data(self) -> bool {
        matches!(self, ResultKind::KeepTempData)
    }
}

/// Only statuses that send the client somewhere else. `300` and `304` do not.
fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

/// Response extension that marks a non-redirect response as keeping temp data.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepTempData;

/// Hooks that run once, right before the response starts going out.
///
/// Handlers that stream their body call [`ResponseStart::start`] before committing to it; the
/// temp data layer calls it when it hands the response back to the transport.
#[derive(Clone, Default)]
pub struct ResponseStart {
    inner: Arc<Mutex<StartState>>,
}

#[derive(Default)]
struct StartState {
    started: bool,
    hooks: Vec<StartingHook>,
}

impl fmt::Debug for ResponseStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("ResponseStart")
            .field("started", &state.started)
            .field("hooks", &state.hooks.len())
            .finish()
    }
}

impl ResponseStart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_started(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .started
    }

    /// Registers a hook. Hooks registered after the response started never run.
    pub fn on_starting<F, Fut>(&self, hook: F)
    where
        F: FnOnce(ResultKind) -> Fut + Send + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if state.started {
            tracing::debug!("response already started; hook dropped");
            return;
        }
        state.hooks.push(Box::new(move |kind| hook(kind).boxed()));
    }

    /// Marks the response as started and runs the registered hooks in order.
    ///
    /// Only the first call runs hooks. Every hook runs even if an earlier one fails; the first
    /// failure is returned.
    pub async fn start(&self, kind: ResultKind) -> Result<()> {
        let hooks = {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            if state.started {
                return Ok(());
            }
            state.started = true;
            std::mem::take(&mut state.hooks)
        };

        let mut first_err = None;
        for hook in hooks {
            if let Err(err) = hook(kind).await {
                tracing::error!(err = %err, "response starting hook failed");
                first_err.get_or_insert(err);
            }
        }

        match first_err {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

/// Type-keyed per-request side-table.
#[derive(Debug, Clone, Default)]
pub struct RequestItems {
    inner: Arc<Mutex<Extensions>>,
}

impl RequestItems {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get<T: Clone + Send + Sync + 'static>(&self) -> Option<T> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get::<T>()
            .cloned()
    }

    /// Inserts `value` only if no item of its type exists. Returns whether it was inserted.
    pub fn claim<T: Clone + Send + Sync + 'static>(&self, value: T) -> bool {
        let mut items = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if items.get::<T>().is_some() {
            return false;
        }
        items.insert(value);
        true
    }
}
