//! Renderer backed by a script-capable view (web view, headless browser).
//!
//! The host loads [`MARKMAP_PAGE_HTML`], evaluates the scripts produced by
//! [`ScriptRenderer`] and forwards every message the page posts through
//! `window.markmapHost.postMessage` to [`BridgeHandle::dispatch_json`].

use crate::bridge::BridgeHandle;
use crate::error::{BridgeError, Result};
use crate::renderer::{Renderer, RendererSignal};

/// Base URL to load [`MARKMAP_PAGE_HTML`] under in hosts that take one
/// alongside inline HTML. Every script the page pulls in lives below it.
pub const MARKMAP_PAGE_BASE_URL: &str = "https://cdn.jsdelivr.net/";

/// Standalone page that renders a markmap and exports it as a PNG data URL.
///
/// Exposes `renderMarkmap(markdown)` and `exportAsImage()`, and reports back
/// with `{"type":"rendered"}`, `{"type":"exported","data":...}` or
/// `{"type":"export_failed","message":...}`.
pub const MARKMAP_PAGE_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Markmap</title>
    <style>
        body, html {
            margin: 0;
            padding: 0;
            height: 100%;
            width: 100%;
            overflow: hidden;
            background-color: white;
        }
        svg {
            width: 100%;
            height: 100%;
        }
        .markmap-container {
            height: 100%;
            width: 100%;
        }
    </style>
    <script src="https://cdn.jsdelivr.net/npm/d3@7"></script>
    <script src="https://cdn.jsdelivr.net/npm/markmap-view@0.14.4"></script>
</head>
<body>
    <div class="markmap-container">
        <svg id="markmap"></svg>
    </div>
    <script>
        let markmapObject = null;

        function post(signal) {
            window.markmapHost.postMessage(JSON.stringify(signal));
        }

        function renderMarkmap(markdown) {
            const { Markmap } = window.markmap;
            const svg = document.getElementById('markmap');
            svg.innerHTML = '';
            markmapObject = Markmap.create(svg, undefined, markdown);
            setTimeout(() => {
                if (markmapObject) {
                    const { minX, maxX, minY, maxY } = markmapObject.state;
                    svg.setAttribute('width', maxX - minX + 400);
                    svg.setAttribute('height', maxY - minY + 200);
                    post({ type: 'rendered' });
                }
            }, 500);
        }

        function exportAsImage() {
            try {
                const svg = document.getElementById('markmap');
                const bbox = svg.getBBox();
                const canvas = document.createElement('canvas');
                canvas.width = Math.max(bbox.width + 100, window.innerWidth);
                canvas.height = Math.max(bbox.height + 100, window.innerHeight);
                const data = new XMLSerializer().serializeToString(svg);
                const blob = new Blob([data], { type: 'image/svg+xml;charset=utf-8' });
                const url = URL.createObjectURL(blob);
                const ctx = canvas.getContext('2d');
                ctx.fillStyle = 'white';
                ctx.fillRect(0, 0, canvas.width, canvas.height);
                const img = new Image();
                img.onload = function () {
                    ctx.drawImage(img, 0, 0);
                    URL.revokeObjectURL(url);
                    post({ type: 'exported', data: canvas.toDataURL('image/png') });
                };
                img.onerror = function () {
                    URL.revokeObjectURL(url);
                    post({ type: 'export_failed', message: 'failed to rasterize svg' });
                };
                img.src = url;
            } catch (e) {
                post({ type: 'export_failed', message: String(e && e.message || e) });
            }
        }
    </script>
</body>
</html>
"#;

/// Something that can evaluate a script inside the renderer page.
///
/// Evaluation is fire-and-forget; results travel back as posted messages.
pub trait ScriptHost: Send + Sync {
    fn evaluate(&self, script: String) -> Result<()>;
}

/// [`Renderer`] that drives [`MARKMAP_PAGE_HTML`] through a [`ScriptHost`].
pub struct ScriptRenderer<H: ScriptHost> {
    host: H,
}

impl<H: ScriptHost> ScriptRenderer<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }
}

impl<H: ScriptHost> Renderer for ScriptRenderer<H> {
    fn load(&self, spec: &str) -> Result<()> {
        self.host.evaluate(render_script(spec)?)
    }

    fn export(&self) -> Result<()> {
        self.host.evaluate(export_script())
    }
}

/// `renderMarkmap(...)` call with `spec` as a JSON string literal.
///
/// JSON string syntax is a subset of JavaScript's, so backticks, quotes and
/// `${...}` in the spec cannot break out of the argument.
pub fn render_script(spec: &str) -> Result<String> {
    let literal = serde_json::to_string(spec)
        .map_err(|e| BridgeError::RendererUnavailable(format!("unencodable spec: {e}")))?;
    Ok(format!("renderMarkmap({literal})"))
}

pub fn export_script() -> String {
    "exportAsImage()".to_string()
}

/// The renderer page, for hosts that load documents from a string.
pub fn markmap_page() -> &'static str {
    MARKMAP_PAGE_HTML
}

impl BridgeHandle {
    /// Dispatch a JSON message posted by the renderer page.
    ///
    /// Messages that do not decode to a [`RendererSignal`] are logged and
    /// dropped.
    pub fn dispatch_json(&self, message: &str) {
        match RendererSignal::from_json(message) {
            Ok(signal) => self.dispatch(signal),
            Err(e) => log::error!("Failed to parse renderer message: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RenderBridge;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingHost {
        scripts: Mutex<Vec<String>>,
    }

    impl ScriptHost for Arc<RecordingHost> {
        fn evaluate(&self, script: String) -> Result<()> {
            self.scripts.lock().push(script);
            Ok(())
        }
    }

    #[test]
    fn test_render_script_escapes_spec() {
        let script = render_script("# `root` ${x}\n- \"quoted\"").unwrap();
        assert_eq!(
            script,
            r##"renderMarkmap("# `root` ${x}\n- \"quoted\"")"##
        );
    }

    #[test]
    fn test_page_exposes_entry_points() {
        let page = markmap_page();
        assert!(page.contains("function renderMarkmap(markdown)"));
        assert!(page.contains("function exportAsImage()"));
        assert!(page.contains("markmap-view@0.14.4"));
        assert!(page.contains("type: 'export_failed'"));
    }

    #[test]
    fn test_page_scripts_live_under_base_url() {
        let sources: Vec<&str> = MARKMAP_PAGE_HTML
            .split("<script src=\"")
            .skip(1)
            .filter_map(|rest| rest.split('"').next())
            .collect();
        assert_eq!(sources.len(), 2);
        for src in sources {
            assert!(src.starts_with(MARKMAP_PAGE_BASE_URL), "{src}");
        }
    }

    #[tokio::test]
    async fn test_script_renderer_round_trip() {
        let host = Arc::new(RecordingHost::default());
        let bridge = RenderBridge::new(ScriptRenderer::new(Arc::clone(&host)));
        let handle = bridge.handle();

        let submit = bridge.submit_content("# root");
        handle.dispatch_json(r#"{"type":"rendered"}"#);
        submit.await.unwrap();

        let export = bridge.export_artifact();
        handle.dispatch_json("not json");
        handle.dispatch_json(r#"{"type":"exported","data":"data:image/png;base64,AAAA"}"#);
        assert_eq!(export.await.unwrap(), "data:image/png;base64,AAAA");

        assert_eq!(
            *host.scripts.lock(),
            vec![
                r##"renderMarkmap("# root")"##.to_string(),
                "exportAsImage()".to_string()
            ]
        );
    }
}
