//! Times the single save of a request's temp data.
//!
//! Two triggers can save: the response-starting hook, which may fire while a streaming body is
//! being produced, and the late stage that runs once the inner service returned. Whichever runs
//! first claims a marker in the request's side-table; the other sees the marker and does nothing.
//! The late stage also stands down once the response has started, since cookies and session
//! writes may no longer reach the client at that point.

use crate::{
    error::Result,
    response::{RequestItems, ResponseStart, ResultKind},
    store::TempData,
};

/// Which trigger performed the save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveTrigger {
    ResponseStart,
    LateStage,
}

/// Side-table marker recorded by the trigger that saved.
#[derive(Debug, Clone, Copy)]
struct TempDataSaved(SaveTrigger);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Armed,
    SavedByHook,
    SavedByLateStage,
}

/// Everything a save needs, captured once per request.
#[derive(Debug, Clone)]
pub struct SaveContext {
    pub temp_data: TempData,
    pub response: ResponseStart,
    pub items: RequestItems,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PersistenceFilter;

impl PersistenceFilter {
    /// Registers the response-starting hook.
    ///
    /// The hook captures the store and side-table only; it never touches the session or cookies
    /// once the late stage has saved.
    pub fn arm(cx: &SaveContext) {
        let temp_data = cx.temp_data.clone();
        let items = cx.items.clone();
        cx.response.on_starting(move |kind| async move {
            save_once(&temp_data, &items, kind, SaveTrigger::ResponseStart).await
        });
    }

    /// The late stage, run after the inner service produced its response.
    pub async fn on_result_executed(cx: &SaveContext, kind: ResultKind) -> Result<()> {
        if cx.response.has_started() {
            tracing::debug!("response already started; temp data left to the starting hook");
            return Ok(());
        }
        save_once(&cx.temp_data, &cx.items, kind, SaveTrigger::LateStage).await
    }

    pub fn state(items: &RequestItems) -> SaveState {
        match items.get::<TempDataSaved>() {
            None => SaveState::Armed,
            Some(TempDataSaved(SaveTrigger::ResponseStart)) => SaveState::SavedByHook,
            Some(TempDataSaved(SaveTrigger::LateStage)) => SaveState::SavedByLateStage,
        }
    }
}

async fn save_once(
    temp_data: &TempData,
    items: &RequestItems,
    kind: ResultKind,
    trigger: SaveTrigger,
) -> Result<()> {
    if !items.claim(TempDataSaved(trigger)) {
        tracing::debug!(?trigger, "temp data already saved");
        return Ok(());
    }

    if kind.keeps_temp_data() {
        temp_data.keep().await?;
    }
    temp_data.save().await?;
    tracing::debug!(?trigger, "temp data saved");
    Ok(())
}
