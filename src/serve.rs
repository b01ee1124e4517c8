//! Dev server: static file serving with a client-reload channel
//!
//! Serves the project root over HTTP and exposes a long-poll endpoint
//! carrying a reload generation counter. Writing pipelines call
//! [`ReloadHub::notify`]; connected clients see the generation move and
//! refresh. The broadcast is fire-and-forget with no acknowledgment.

use crate::report;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tiny_http::{Header, Request, Response, Server};

/// Reserved path for the injected reload client
const CLIENT_PATH: &str = "/__conveyor/reload.js";

/// Reserved path the client long-polls
const EVENTS_PATH: &str = "/__conveyor/events";

/// How long a poll is held open before answering with the current generation
const POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// Long-polling reload client, injected into served HTML pages.
const RELOAD_CLIENT: &str = r#"(function () {
  'use strict';
  var gen = null;
  function poll() {
    var xhr = new XMLHttpRequest();
    xhr.open('GET', '/__conveyor/events' + (gen === null ? '' : '?since=' + gen));
    xhr.onload = function () {
      try {
        var next = JSON.parse(xhr.responseText).generation;
        if (gen !== null && next !== gen) { location.reload(); return; }
        gen = next;
      } catch (e) {}
      setTimeout(poll, 250);
    };
    xhr.onerror = function () { setTimeout(poll, 1000); };
    xhr.send();
  }
  poll();
})();
"#;

/// Dev server error
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServeError {
    /// Could not bind the listening socket
    #[error("failed to bind dev server: {0}")]
    Bind(String),
}

/// Shared reload channel between writing pipelines and connected clients.
///
/// Holds a generation counter; every broadcast bumps it after the
/// configured settle delay so filesystem writes finish before clients
/// refetch. Cloning shares the same counter.
#[derive(Clone)]
pub struct ReloadHub {
    inner: Arc<HubState>,
    delay: Duration,
}

struct HubState {
    generation: Mutex<u64>,
    bumped: Condvar,
}

impl ReloadHub {
    pub fn new(delay: Duration) -> Self {
        Self {
            inner: Arc::new(HubState { generation: Mutex::new(0), bumped: Condvar::new() }),
            delay,
        }
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        *self.inner.generation.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Schedule a reload broadcast after the settle delay.
    pub fn notify(&self) {
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;
        thread::spawn(move || {
            thread::sleep(delay);
            let mut generation = inner.generation.lock().unwrap_or_else(|e| e.into_inner());
            *generation += 1;
            inner.bumped.notify_all();
        });
    }

    /// Block until the generation moves past `since` or the timeout runs
    /// out, returning the generation at wake-up.
    pub fn wait_past(&self, since: u64, timeout: Duration) -> u64 {
        let guard = self.inner.generation.lock().unwrap_or_else(|e| e.into_inner());
        let (guard, _) = self
            .inner
            .bumped
            .wait_timeout_while(guard, timeout, |generation| *generation <= since)
            .unwrap_or_else(|e| e.into_inner());
        *guard
    }
}

/// Map a file extension to a Content-Type.
pub fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") | Some("map") => "application/json; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") | Some("hbs") | Some("scss") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Resolve a request path under the served root, rejecting traversal.
pub fn resolve_request_path(root: &Path, raw: &str) -> Option<PathBuf> {
    let rel = raw.trim_start_matches('/');
    let rel_path = Path::new(rel);
    for component in rel_path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => return None,
        }
    }
    let mut resolved = root.join(rel_path);
    if resolved.is_dir() {
        resolved = resolved.join("index.html");
    }
    Some(resolved)
}

/// Inject the reload client into an HTML document.
pub fn inject_reload_client(html: &str) -> String {
    let tag = format!("<script src=\"{}\"></script>", CLIENT_PATH);
    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + tag.len());
            out.push_str(&html[..pos]);
            out.push_str(&tag);
            out.push_str(&html[pos..]);
            out
        }
        None => {
            let mut out = html.to_string();
            out.push_str(&tag);
            out
        }
    }
}

fn plain_header(value: &str) -> Option<Header> {
    Header::from_bytes(&b"Content-Type"[..], value.as_bytes()).ok()
}

fn respond_bytes(request: Request, body: Vec<u8>, ctype: &str, status: u16) {
    let mut response = Response::from_data(body).with_status_code(status);
    if let Some(header) = plain_header(ctype) {
        response.add_header(header);
    }
    if let Err(err) = request.respond(response) {
        report::warn(&format!("response failed: {}", err));
    }
}

fn handle_events(request: Request, hub: &ReloadHub) {
    let since = request
        .url()
        .split_once('?')
        .and_then(|(_, query)| {
            query.split('&').find_map(|pair| pair.strip_prefix("since=")).and_then(|v| v.parse().ok())
        });

    let generation = match since {
        // Poll with a known generation: hold until it moves or times out
        Some(since) => hub.wait_past(since, POLL_TIMEOUT),
        // First contact: answer immediately so the client learns the baseline
        None => hub.generation(),
    };
    let body = format!("{{\"generation\":{}}}", generation);
    respond_bytes(request, body.into_bytes(), "application/json; charset=utf-8", 200);
}

fn handle_static(request: Request, root: &Path) {
    let raw_path = request.url().split('?').next().unwrap_or("/").to_string();
    let resolved = match resolve_request_path(root, &raw_path) {
        Some(path) => path,
        None => {
            respond_bytes(request, b"forbidden".to_vec(), "text/plain; charset=utf-8", 403);
            return;
        }
    };

    match fs::read(&resolved) {
        Ok(body) => {
            let ctype = content_type(&resolved);
            if ctype.starts_with("text/html") {
                let html = String::from_utf8_lossy(&body);
                let injected = inject_reload_client(&html);
                respond_bytes(request, injected.into_bytes(), ctype, 200);
            } else {
                respond_bytes(request, body, ctype, 200);
            }
        }
        Err(_) => respond_bytes(request, b"not found".to_vec(), "text/plain; charset=utf-8", 404),
    }
}

/// Serve `root` on the given port until the process exits.
///
/// Each request is handled on its own thread; event polls block their
/// thread while they wait on the hub.
pub fn serve(root: PathBuf, port: u16, hub: ReloadHub) -> Result<(), ServeError> {
    let server = Server::http(("127.0.0.1", port)).map_err(|e| ServeError::Bind(e.to_string()))?;
    report::info(&format!("dev server listening on http://localhost:{}/", port));

    for request in server.incoming_requests() {
        let root = root.clone();
        let hub = hub.clone();
        thread::spawn(move || {
            let path = request.url().split('?').next().unwrap_or("/");
            if path == EVENTS_PATH {
                handle_events(request, &hub);
            } else if path == CLIENT_PATH {
                respond_bytes(
                    request,
                    RELOAD_CLIENT.as_bytes().to_vec(),
                    "application/javascript; charset=utf-8",
                    200,
                );
            } else {
                handle_static(request, &root);
            }
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(Path::new("a/App.css")), "text/css; charset=utf-8");
        assert_eq!(content_type(Path::new("Sprite.png")), "image/png");
        assert_eq!(content_type(Path::new("App.css.map")), "application/json; charset=utf-8");
        assert_eq!(content_type(Path::new("mystery")), "application/octet-stream");
    }

    #[test]
    fn test_traversal_rejected() {
        let root = Path::new("/srv/app");
        assert!(resolve_request_path(root, "/../etc/passwd").is_none());
        assert!(resolve_request_path(root, "/a/../../b").is_none());
        assert!(resolve_request_path(root, "/App/Styles/App.css").is_some());
    }

    #[test]
    fn test_inject_before_body_close() {
        let html = "<html><body><p>hi</p></body></html>";
        let injected = inject_reload_client(html);
        assert!(injected.contains("<script src=\"/__conveyor/reload.js\"></script></body>"));
    }

    #[test]
    fn test_inject_appends_without_body() {
        let injected = inject_reload_client("<p>bare fragment</p>");
        assert!(injected.ends_with("</script>"));
    }

    #[test]
    fn test_hub_generation_moves_after_delay() {
        let hub = ReloadHub::new(Duration::from_millis(10));
        assert_eq!(hub.generation(), 0);
        hub.notify();
        let generation = hub.wait_past(0, Duration::from_secs(2));
        assert_eq!(generation, 1);
    }

    #[test]
    fn test_hub_wait_times_out_without_notify() {
        let hub = ReloadHub::new(Duration::from_millis(10));
        let generation = hub.wait_past(0, Duration::from_millis(50));
        assert_eq!(generation, 0);
    }
}
