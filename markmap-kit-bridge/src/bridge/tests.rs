use super::*;
use crate::error::ErrorKind;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

/// Records the instructions it receives. When `echo` is set it answers
/// synchronously from inside `load`/`export`, like a host that evaluates
/// scripts on the calling thread.
#[derive(Default)]
struct FakeRenderer {
    loads: Mutex<Vec<String>>,
    exports: AtomicUsize,
    refuse: AtomicBool,
    echo: Mutex<Option<BridgeHandle>>,
}

impl FakeRenderer {
    fn load_count(&self) -> usize {
        self.loads.lock().len()
    }
}

impl Renderer for FakeRenderer {
    fn load(&self, spec: &str) -> Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(BridgeError::RendererUnavailable("detached".to_string()));
        }
        self.loads.lock().push(spec.to_string());
        if let Some(handle) = self.echo.lock().clone() {
            handle.on_rendered();
        }
        Ok(())
    }

    fn export(&self) -> Result<()> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(BridgeError::RendererUnavailable("detached".to_string()));
        }
        self.exports.fetch_add(1, Ordering::SeqCst);
        if let Some(handle) = self.echo.lock().clone() {
            handle.on_exported("data:image/png;base64,AAAA");
        }
        Ok(())
    }
}

fn bridge() -> (Arc<FakeRenderer>, RenderBridge<Arc<FakeRenderer>>) {
    let renderer = Arc::new(FakeRenderer::default());
    let bridge = RenderBridge::new(Arc::clone(&renderer));
    (renderer, bridge)
}

async fn rendered_bridge() -> (Arc<FakeRenderer>, RenderBridge<Arc<FakeRenderer>>) {
    let (renderer, bridge) = bridge();
    let submit = bridge.submit_content("# root");
    bridge.handle().on_rendered();
    submit.await.unwrap();
    (renderer, bridge)
}

// ─── submit ───

#[tokio::test]
async fn test_submit_resolves_on_rendered() {
    let (renderer, bridge) = bridge();
    let submit = bridge.submit_content("# root\n- a");
    assert!(!submit.is_immediate());
    assert_eq!(*renderer.loads.lock(), vec!["# root\n- a".to_string()]);

    bridge.handle().on_rendered();
    submit.await.unwrap();
}

#[tokio::test]
async fn test_submit_while_pending_joins_existing() {
    let (renderer, bridge) = bridge();
    let first = bridge.submit_content("# root");
    let second = bridge.submit_content("# root");
    assert_eq!(renderer.load_count(), 1);

    bridge.handle().on_rendered();
    first.await.unwrap();
    second.await.unwrap();
}

#[tokio::test]
async fn test_submit_after_render_is_immediate() {
    let (renderer, bridge) = rendered_bridge().await;
    let again = bridge.submit_content("# something else");
    assert!(again.is_immediate());
    again.await.unwrap();
    assert_eq!(renderer.load_count(), 1);
}

#[tokio::test]
async fn test_refused_load_rejects_and_allows_resubmit() {
    let (renderer, bridge) = bridge();
    renderer.refuse.store(true, Ordering::SeqCst);
    let err = bridge.submit_content("# root").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RendererUnavailable);
    assert!(err.requires_resubmit());

    renderer.refuse.store(false, Ordering::SeqCst);
    let submit = bridge.submit_content("# root");
    assert_eq!(renderer.load_count(), 1);
    bridge.handle().on_rendered();
    submit.await.unwrap();
}

#[tokio::test]
async fn test_synchronous_renderer_does_not_deadlock() {
    let (renderer, bridge) = bridge();
    *renderer.echo.lock() = Some(bridge.handle());

    bridge.submit_content("# root").await.unwrap();
    let data = bridge.export_artifact().await.unwrap();
    assert_eq!(data, "data:image/png;base64,AAAA");
}

// ─── export ───

#[tokio::test]
async fn test_export_resolves_with_payload() {
    let (renderer, bridge) = rendered_bridge().await;
    let export = bridge.export_artifact();
    assert_eq!(renderer.exports.load(Ordering::SeqCst), 1);

    bridge
        .handle()
        .dispatch(RendererSignal::Exported {
            data: "data:image/png;base64,AAAA".to_string(),
        });
    assert_eq!(export.await.unwrap(), "data:image/png;base64,AAAA");
}

#[tokio::test]
async fn test_export_failure_carries_message() {
    let (_renderer, bridge) = rendered_bridge().await;
    let export = bridge.export_artifact();
    bridge.handle().on_export_failed("boom");

    match export.await {
        Err(BridgeError::RenderExportFailed(message)) => assert_eq!(message, "boom"),
        other => panic!("expected RenderExportFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_concurrent_export_fails_fast() {
    let (renderer, bridge) = rendered_bridge().await;
    let first = bridge.export_artifact();
    let second = bridge.export_artifact();
    assert!(second.is_immediate());
    assert_eq!(
        second.await.unwrap_err().kind(),
        ErrorKind::ConcurrentExport
    );
    assert_eq!(renderer.exports.load(Ordering::SeqCst), 1);

    // The first export is unaffected.
    bridge.handle().on_exported("payload");
    assert_eq!(first.await.unwrap(), "payload");
}

#[tokio::test]
async fn test_export_can_be_retried_after_completion() {
    let (renderer, bridge) = rendered_bridge().await;
    let first = bridge.export_artifact();
    bridge.handle().on_export_failed("transient");
    assert!(first.await.unwrap_err().is_export_failure());

    let retry = bridge.export_artifact();
    bridge.handle().on_exported("second");
    assert_eq!(retry.await.unwrap(), "second");
    assert_eq!(renderer.exports.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_refused_export_rejects_and_frees_slot() {
    let (renderer, bridge) = rendered_bridge().await;
    renderer.refuse.store(true, Ordering::SeqCst);
    let err = bridge.export_artifact().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RendererUnavailable);

    renderer.refuse.store(false, Ordering::SeqCst);
    let export = bridge.export_artifact();
    bridge.handle().on_exported("ok");
    assert_eq!(export.await.unwrap(), "ok");
}

#[tokio::test]
async fn test_first_callback_wins() {
    let (_renderer, bridge) = rendered_bridge().await;
    let export = bridge.export_artifact();
    let handle = bridge.handle();
    handle.on_exported("winner");
    handle.on_export_failed("too late");
    handle.on_exported("also too late");
    assert_eq!(export.await.unwrap(), "winner");
}

#[tokio::test]
async fn test_unsolicited_signals_are_ignored() {
    let (_renderer, bridge) = bridge();
    let handle = bridge.handle();
    handle.on_rendered();
    handle.on_exported("stray");
    handle.on_export_failed("stray");

    // A stray rendered signal does not count as a rendering of later content.
    let submit = bridge.submit_content("# root");
    assert!(!submit.is_immediate());
    handle.on_rendered();
    submit.await.unwrap();
}

#[tokio::test]
async fn test_callbacks_from_other_threads() {
    let (_renderer, bridge) = bridge();
    let submit = bridge.submit_content("# root");
    let handle = bridge.handle();
    std::thread::spawn(move || handle.on_rendered())
        .join()
        .unwrap();
    submit.await.unwrap();

    let export = bridge.export_artifact();
    let threads: Vec<_> = (0..4)
        .map(|i| {
            let handle = bridge.handle();
            std::thread::spawn(move || {
                if i % 2 == 0 {
                    handle.on_exported(format!("payload-{i}"));
                } else {
                    handle.on_export_failed(format!("error-{i}"));
                }
            })
        })
        .collect();
    for thread in threads {
        thread.join().unwrap();
    }
    // Exactly one of the racing callbacks resolved the export.
    match export.await {
        Ok(data) => assert!(data.starts_with("payload-")),
        Err(BridgeError::RenderExportFailed(message)) => assert!(message.starts_with("error-")),
        Err(other) => panic!("unexpected error {other:?}"),
    }
}

// ─── teardown ───

#[tokio::test]
async fn test_close_rejects_outstanding_completions() {
    let (_renderer, bridge) = bridge();
    let submit = bridge.submit_content("# root");
    let export = bridge.export_artifact();

    bridge.close();
    assert!(bridge.is_closed());
    assert_eq!(submit.await.unwrap_err().kind(), ErrorKind::BridgeClosed);
    assert_eq!(export.await.unwrap_err().kind(), ErrorKind::BridgeClosed);

    // Late signals are dropped, later operations refused.
    bridge.handle().on_rendered();
    bridge.handle().on_exported("late");
    assert_eq!(
        bridge.submit_content("# root").await.unwrap_err().kind(),
        ErrorKind::BridgeClosed
    );
    assert_eq!(
        bridge.export_artifact().await.unwrap_err().kind(),
        ErrorKind::BridgeClosed
    );
}

#[tokio::test]
async fn test_drop_rejects_pending_completions() {
    let (_renderer, bridge) = bridge();
    let handle = bridge.handle();
    let submit = bridge.submit_content("# root");
    drop(bridge);

    assert!(handle.is_closed());
    assert_eq!(submit.await.unwrap_err().kind(), ErrorKind::BridgeClosed);
}

// ─── signal streams and persistence ───

#[tokio::test]
async fn test_attached_signal_stream_drives_bridge() {
    let (_renderer, mut bridge) = bridge();
    let (tx, rx) = mpsc::unbounded_channel();
    bridge.attach_signals(rx);

    let submit = bridge.submit_content("# root");
    tx.send(RendererSignal::Rendered).unwrap();
    submit.await.unwrap();

    let export = bridge.export_artifact();
    tx.send(RendererSignal::ExportFailed {
        message: "boom".to_string(),
    })
    .unwrap();
    assert_eq!(
        export.await.unwrap_err().kind(),
        ErrorKind::RenderExportFailed
    );

    // Renderer going away closes the bridge.
    let export = bridge.export_artifact();
    drop(tx);
    assert_eq!(export.await.unwrap_err().kind(), ErrorKind::BridgeClosed);
    assert!(bridge.is_closed());
}

#[tokio::test]
async fn test_export_to_file_persists_payload() {
    let dir = tempfile::tempdir().unwrap();
    let writer = ArtifactWriter::new(dir.path());
    let (renderer, bridge) = bridge();
    *renderer.echo.lock() = Some(bridge.handle());

    bridge.submit_content("# root").await.unwrap();
    let path = bridge.export_to_file(&writer).await.unwrap();

    assert!(path.is_absolute());
    assert_eq!(std::fs::read(&path).unwrap(), vec![0u8, 0, 0]);
}
