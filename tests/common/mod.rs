#![allow(dead_code)]

use std::sync::Arc;

use brrtrouter_dispatch::dispatcher::{from_fn, Handler, HandlerResponse};
use parking_lot::Mutex;
use serde_json::json;

/// Shared, ordered record of what the chain did.
#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, event: impl Into<String>) {
        self.events.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().clone()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }

    /// Middleware logging `before-NAME`, advancing, then logging `after-NAME`.
    pub fn wrap(&self, name: &'static str) -> Arc<dyn Handler> {
        let rec = self.clone();
        from_fn(move |ctx, chain| {
            rec.push(format!("before-{name}"));
            chain.advance(ctx)?;
            rec.push(format!("after-{name}"));
            Ok(())
        })
    }

    /// Handler that records `NAME` and returns without advancing.
    pub fn stop(&self, name: &'static str) -> Arc<dyn Handler> {
        let rec = self.clone();
        from_fn(move |ctx, _chain| {
            rec.push(name);
            ctx.response = HandlerResponse::json(200, json!({ "handled_by": name }));
            Ok(())
        })
    }
}

pub mod temp_files {
    use std::io::Write;

    use tempfile::NamedTempFile;

    /// Temporary file with the given extension, removed on drop.
    pub fn create_temp(content: &str, ext: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .prefix("brrt_test_")
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }
}
