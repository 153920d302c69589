//! Render bridge: correlates renderer instructions with renderer signals.
//!
//! The renderer runs in an isolated context that can only be driven with
//! fire-and-forget instructions and answers through callbacks on arbitrary
//! threads. [`RenderBridge`] turns that into two future-based operations,
//! [`submit_content`](RenderBridge::submit_content) and
//! [`export_artifact`](RenderBridge::export_artifact), each backed by a
//! single-shot [`Completion`].
//!
//! All pending state sits behind one mutex shared with every
//! [`BridgeHandle`]. Each pending completion is resolved at most once, by
//! whichever of signal, command failure or teardown gets there first; later
//! arrivals are dropped and logged. The renderer is never called while the
//! mutex is held, so a renderer may deliver its signal synchronously from
//! inside `load`/`export`.

use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::artifact::ArtifactWriter;
use crate::completion::{Completion, Resolver};
use crate::error::{BridgeError, Result};
use crate::renderer::{Renderer, RendererSignal};

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Lifecycle of the submitted specification.
enum SubmitState {
    /// Nothing handed to the renderer yet.
    Idle,
    /// `load` issued, waiting for the renderer to report a layout.
    Pending {
        spec: String,
        waiters: Vec<Resolver<()>>,
    },
    /// The renderer holds a laid-out rendering of `spec`.
    Rendered { spec: String },
}

struct BridgeState {
    closed: bool,
    submit: SubmitState,
    /// The single in-flight export, if any.
    export: Option<Resolver<String>>,
}

impl BridgeState {
    fn new() -> Self {
        Self {
            closed: false,
            submit: SubmitState::Idle,
            export: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Callback side of a [`RenderBridge`].
///
/// Cheap to clone and safe to use from any thread. Renderer integrations call
/// [`dispatch`](Self::dispatch) (or the typed `on_*` helpers) when the
/// renderer signals back.
#[derive(Clone)]
pub struct BridgeHandle {
    shared: Arc<Mutex<BridgeState>>,
}

impl BridgeHandle {
    fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(BridgeState::new())),
        }
    }

    /// Route a renderer signal to the matching pending completion.
    pub fn dispatch(&self, signal: RendererSignal) {
        match signal {
            RendererSignal::Rendered => self.on_rendered(),
            RendererSignal::Exported { data } => self.complete_export(Ok(data)),
            RendererSignal::ExportFailed { message } => {
                self.complete_export(Err(BridgeError::RenderExportFailed(message)))
            }
        }
    }

    /// The renderer finished laying out the submitted specification.
    pub fn on_rendered(&self) {
        let mut state = self.shared.lock();
        if state.closed {
            log::debug!("Dropping rendered signal received after bridge close");
            return;
        }
        match std::mem::replace(&mut state.submit, SubmitState::Idle) {
            SubmitState::Pending { spec, waiters } => {
                log::debug!(
                    "Renderer reported layout; resolving {} submit waiter(s)",
                    waiters.len()
                );
                for waiter in waiters {
                    let _ = waiter.send(Ok(()));
                }
                state.submit = SubmitState::Rendered { spec };
            }
            SubmitState::Rendered { spec } => {
                log::debug!("Ignoring duplicate rendered signal");
                state.submit = SubmitState::Rendered { spec };
            }
            SubmitState::Idle => {
                log::warn!("Ignoring rendered signal with no submitted content");
            }
        }
    }

    /// The renderer delivered its encoded export.
    pub fn on_exported(&self, data: impl Into<String>) {
        self.complete_export(Ok(data.into()));
    }

    /// The renderer failed to export.
    pub fn on_export_failed(&self, message: impl Into<String>) {
        self.complete_export(Err(BridgeError::RenderExportFailed(message.into())));
    }

    fn complete_export(&self, result: Result<String>) {
        let mut state = self.shared.lock();
        if state.closed {
            log::debug!("Dropping export signal received after bridge close");
            return;
        }
        match state.export.take() {
            Some(resolver) => {
                if let Err(e) = &result {
                    log::warn!("Export rejected: {e}");
                }
                if resolver.send(result).is_err() {
                    log::debug!("Export resolved but the caller no longer waits for it");
                }
            }
            None => log::warn!("Dropping export signal with no pending export"),
        }
    }

    /// Reject a pending submit after the renderer refused the load command.
    fn fail_submit(&self, error: BridgeError) {
        let mut state = self.shared.lock();
        if let SubmitState::Pending { .. } = state.submit
            && let SubmitState::Pending { waiters, .. } =
                std::mem::replace(&mut state.submit, SubmitState::Idle)
        {
            for waiter in waiters {
                let _ = waiter.send(Err(error.clone()));
            }
        }
    }

    /// Close the bridge: reject everything outstanding with
    /// [`BridgeError::BridgeClosed`] and refuse later operations and signals.
    ///
    /// Idempotent.
    pub fn close(&self) {
        let mut state = self.shared.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let mut rejected = 0;
        if let SubmitState::Pending { waiters, .. } =
            std::mem::replace(&mut state.submit, SubmitState::Idle)
        {
            for waiter in waiters {
                let _ = waiter.send(Err(BridgeError::BridgeClosed));
                rejected += 1;
            }
        }
        if let Some(resolver) = state.export.take() {
            let _ = resolver.send(Err(BridgeError::BridgeClosed));
            rejected += 1;
        }
        log::debug!("Render bridge closed ({rejected} pending completion(s) rejected)");
    }

    pub fn is_closed(&self) -> bool {
        self.shared.lock().closed
    }
}

impl std::fmt::Debug for BridgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.shared.lock();
        let submit = match state.submit {
            SubmitState::Idle => "idle",
            SubmitState::Pending { .. } => "pending",
            SubmitState::Rendered { .. } => "rendered",
        };
        f.debug_struct("BridgeHandle")
            .field("closed", &state.closed)
            .field("submit", &submit)
            .field("export_pending", &state.export.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Owns one renderer and the pending operations issued against it.
///
/// A renderer's state (current spec, current rendering) is singular, so each
/// live diagram needs its own bridge and renderer. Dropping the bridge closes
/// it.
pub struct RenderBridge<R: Renderer> {
    renderer: R,
    handle: BridgeHandle,
    /// Task forwarding an attached signal stream into `handle`.
    signal_task: Option<JoinHandle<()>>,
}

impl<R: Renderer> RenderBridge<R> {
    pub fn new(renderer: R) -> Self {
        Self {
            renderer,
            handle: BridgeHandle::new(),
            signal_task: None,
        }
    }

    /// The callback handle renderer integrations deliver signals to.
    pub fn handle(&self) -> BridgeHandle {
        self.handle.clone()
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Forward a renderer's signal stream into this bridge.
    ///
    /// Spawns a task on the current tokio runtime. When the stream ends (the
    /// renderer went away) the bridge is closed. Attaching a second stream
    /// replaces the first.
    pub fn attach_signals(&mut self, mut signals: mpsc::UnboundedReceiver<RendererSignal>) {
        let handle = self.handle.clone();
        let task = tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                log::trace!("Renderer signal: {signal:?}");
                handle.dispatch(signal);
            }
            if !handle.is_closed() {
                log::warn!("Renderer signal stream ended; closing bridge");
                handle.close();
            }
        });
        if let Some(previous) = self.signal_task.replace(task) {
            previous.abort();
        }
    }

    /// Hand `spec` to the renderer and wait until it has been laid out.
    ///
    /// The renderer is loaded at most once per bridge. A call made while a
    /// submit is pending joins that submit; a call made after the renderer
    /// reported its layout resolves immediately. Either way a differing
    /// `spec` is ignored. If the renderer refuses the load the completion is
    /// rejected and the bridge returns to its unsubmitted state.
    ///
    /// No timeout is applied here; callers bound the wait themselves.
    pub fn submit_content(&self, spec: &str) -> Completion<()> {
        let (resolver, completion) = Completion::pending();
        {
            let mut state = self.handle.shared.lock();
            if state.closed {
                return Completion::failed(BridgeError::BridgeClosed);
            }
            match &mut state.submit {
                SubmitState::Rendered { spec: current } => {
                    if current != spec {
                        log::warn!("Content already rendered; ignoring new specification");
                    }
                    return Completion::ready(());
                }
                SubmitState::Pending {
                    spec: current,
                    waiters,
                } => {
                    if current != spec {
                        log::warn!("Content already submitted; ignoring new specification");
                    }
                    waiters.push(resolver);
                    return completion;
                }
                SubmitState::Idle => {
                    state.submit = SubmitState::Pending {
                        spec: spec.to_string(),
                        waiters: vec![resolver],
                    };
                }
            }
        }

        log::debug!("Submitting {} byte specification to renderer", spec.len());
        if let Err(e) = self.renderer.load(spec) {
            log::error!("Renderer refused specification: {e}");
            self.handle.fail_submit(e);
        }
        completion
    }

    /// Ask the renderer to serialize its current rendering.
    ///
    /// Resolves with the encoded payload exactly as the renderer delivered it
    /// (see [`ArtifactWriter::persist`] for decoding). Only one export may be
    /// outstanding: a second call while one is pending returns an
    /// already-rejected completion with [`BridgeError::ConcurrentExport`]
    /// and leaves the renderer alone.
    ///
    /// Content should have been submitted and rendered first; the bridge
    /// does not sequence that for the caller.
    pub fn export_artifact(&self) -> Completion<String> {
        let (resolver, completion) = Completion::pending();
        {
            let mut state = self.handle.shared.lock();
            if state.closed {
                return Completion::failed(BridgeError::BridgeClosed);
            }
            if state.export.is_some() {
                log::warn!("Export requested while another export is pending");
                return Completion::failed(BridgeError::ConcurrentExport);
            }
            if !matches!(state.submit, SubmitState::Rendered { .. }) {
                log::warn!("Export requested before the renderer reported a layout");
            }
            state.export = Some(resolver);
        }

        log::debug!("Requesting export from renderer");
        if let Err(e) = self.renderer.export() {
            log::error!("Renderer refused export: {e}");
            self.handle.complete_export(Err(e));
        }
        completion
    }

    /// Export and persist the result with `writer`, returning the file path.
    pub async fn export_to_file(&self, writer: &ArtifactWriter) -> Result<PathBuf> {
        let data = self.export_artifact().await?;
        writer.persist(&data)
    }

    /// Close the bridge. See [`BridgeHandle::close`].
    pub fn close(&self) {
        self.handle.close();
    }

    pub fn is_closed(&self) -> bool {
        self.handle.is_closed()
    }
}

impl<R: Renderer> Drop for RenderBridge<R> {
    fn drop(&mut self) {
        self.handle.close();
        if let Some(task) = self.signal_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests;
