//! Headless Chromium driven over the DevTools protocol (CDP).
//!
//! Every launch gets a fresh temporary profile directory and its own browser
//! process; nothing is shared between requests. The process is spawned with
//! `kill_on_drop(true)`, so a session dropped without `close()` still takes
//! the browser down with it.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tempfile::TempDir;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{sleep, timeout, Instant};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const SCREENSHOT_TIMEOUT: Duration = Duration::from_secs(15);
const CLOSE_GRACE: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Page region to capture, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clip {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Selector {selector} did not appear within {timeout:?}")]
    MissingSelector { selector: String, timeout: Duration },

    #[error("Timed out after {0:?} during {1}")]
    Timeout(Duration, &'static str),

    #[error("DevTools protocol error: {0}")]
    Protocol(String),

    #[error("Screenshot failed: {0}")]
    Screenshot(String),

    #[error("Browser shutdown failed: {0}")]
    Shutdown(String),
}

/// Starts isolated browser sessions.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>, BrowserError>;
}

/// One page in one browser process.
#[async_trait]
pub trait BrowserSession: Send {
    async fn navigate(&mut self, url: &str, timeout: Duration) -> Result<(), BrowserError>;

    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<(), BrowserError>;

    /// PNG bytes of the clipped region.
    async fn screenshot(&mut self, clip: Clip) -> Result<Vec<u8>, BrowserError>;

    /// Shuts the browser down. Calling it again is a no-op.
    async fn close(&mut self) -> Result<(), BrowserError>;
}

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Request/response channel over the browser-level DevTools socket.
struct Cdp {
    socket: Socket,
    next_id: u64,
}

impl Cdp {
    /// Sends one command and waits for its reply. Events arriving in between
    /// are skipped.
    async fn call(&mut self, method: &str, params: Value, session_id: Option<&str>) -> Result<Value, BrowserError> {
        self.next_id += 1;
        let id = self.next_id;
        let mut request = json!({ "id": id, "method": method, "params": params });
        if let Some(session_id) = session_id {
            request["sessionId"] = json!(session_id);
        }

        self.socket
            .send(Message::Text(request.to_string()))
            .await
            .map_err(|e| BrowserError::Protocol(format!("{method}: {e}")))?;

        while let Some(frame) = self.socket.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => return Err(BrowserError::Protocol(format!("{method}: {e}"))),
            };
            let reply: Value = match serde_json::from_str(&text) {
                Ok(v) => v,
                Err(e) => {
                    debug!("Ignoring unparseable DevTools frame: {e}");
                    continue;
                }
            };
            if reply.get("id").and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = reply.get("error") {
                return Err(BrowserError::Protocol(format!("{method}: {error}")));
            }
            return Ok(reply.get("result").cloned().unwrap_or(Value::Null));
        }

        Err(BrowserError::Protocol(format!("{method}: connection closed")))
    }
}

/// Reads the browser's stderr until it announces the DevTools endpoint, then
/// keeps draining it in the background so the pipe never fills up.
async fn devtools_url<R>(stderr: R) -> Result<String, BrowserError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut lines = BufReader::new(stderr).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| BrowserError::Launch(format!("reading browser output: {e}")))?
    {
        if let Some(url) = line.trim().strip_prefix("DevTools listening on ") {
            let url = url.to_string();
            tokio::spawn(async move { while let Ok(Some(_)) = lines.next_line().await {} });
            return Ok(url);
        }
    }
    Err(BrowserError::Launch(
        "browser exited before exposing a DevTools endpoint".to_string(),
    ))
}

fn string_field(value: &Value, field: &str, method: &str) -> Result<String, BrowserError> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| BrowserError::Protocol(format!("{method}: reply has no {field}")))
}

/// Connects to the browser, opens a page target and attaches to it.
async fn open_page<R>(stderr: R, viewport: Viewport) -> Result<(Cdp, String), BrowserError>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let ws_url = devtools_url(stderr).await?;
    let (socket, _response) = connect_async(ws_url.as_str())
        .await
        .map_err(|e| BrowserError::Launch(format!("connecting to {ws_url}: {e}")))?;
    let mut cdp = Cdp { socket, next_id: 0 };

    let target = cdp
        .call("Target.createTarget", json!({ "url": "about:blank" }), None)
        .await?;
    let target_id = string_field(&target, "targetId", "Target.createTarget")?;

    let attached = cdp
        .call(
            "Target.attachToTarget",
            json!({ "targetId": target_id, "flatten": true }),
            None,
        )
        .await?;
    let session_id = string_field(&attached, "sessionId", "Target.attachToTarget")?;

    cdp.call("Page.enable", json!({}), Some(session_id.as_str())).await?;
    cdp.call(
        "Emulation.setDeviceMetricsOverride",
        json!({
            "width": viewport.width,
            "height": viewport.height,
            "deviceScaleFactor": 1,
            "mobile": false
        }),
        Some(session_id.as_str()),
    )
    .await?;

    Ok((cdp, session_id))
}

/// Launches the Chromium binary named by `CHROME_BIN`.
#[derive(Debug, Clone)]
pub struct ChromiumLauncher {
    chrome_bin: String,
    launch_timeout: Duration,
}

impl ChromiumLauncher {
    pub fn new(chrome_bin: impl Into<String>, launch_timeout: Duration) -> Self {
        Self {
            chrome_bin: chrome_bin.into(),
            launch_timeout,
        }
    }
}

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    async fn launch(&self, viewport: Viewport) -> Result<Box<dyn BrowserSession>, BrowserError> {
        let profile = tempfile::Builder::new()
            .prefix("folio-chromium-")
            .tempdir()
            .map_err(|e| BrowserError::Launch(format!("creating profile directory: {e}")))?;

        let mut child = Command::new(&self.chrome_bin)
            .args([
                "--headless=new",
                "--disable-gpu",
                "--disable-dev-shm-usage",
                "--disable-extensions",
                "--disable-background-networking",
                "--hide-scrollbars",
                "--mute-audio",
                "--no-first-run",
                "--no-default-browser-check",
                "--remote-debugging-port=0",
            ])
            .arg(format!("--user-data-dir={}", profile.path().display()))
            .arg(format!("--window-size={},{}", viewport.width, viewport.height))
            .arg("about:blank")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BrowserError::Launch(format!("{}: {e}", self.chrome_bin)))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| BrowserError::Launch("browser stderr was not captured".to_string()))?;

        let (cdp, session_id) = match timeout(self.launch_timeout, open_page(stderr, viewport)).await {
            Ok(Ok(opened)) => opened,
            Ok(Err(e)) => {
                let _ = child.kill().await;
                return Err(e);
            }
            Err(_) => {
                let _ = child.kill().await;
                return Err(BrowserError::Timeout(self.launch_timeout, "launch"));
            }
        };

        info!(pid = ?child.id(), profile = %profile.path().display(), "Launched headless browser");

        Ok(Box::new(ChromiumSession {
            child,
            cdp,
            session_id,
            closed: false,
            _profile: profile,
        }))
    }
}

/// Evaluates a readiness expression in the current page.
#[async_trait]
trait ReadinessCheck: Send {
    async fn check(&mut self, expression: &str) -> Result<bool, BrowserError>;
}

/// Polls `check` until it reports true or `limit` elapses.
///
/// Evaluation errors count as "not ready yet": right after `Page.navigate` the old
/// execution context can be gone before the new document has one.
async fn poll_ready<P: ReadinessCheck + ?Sized>(check: &mut P, expression: &str, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, check.check(expression)).await {
            Ok(Ok(true)) => return true,
            Ok(Ok(false)) => {}
            Ok(Err(e)) => debug!("Readiness check not answered yet: {e}"),
            Err(_) => return false,
        }
        if Instant::now() + POLL_INTERVAL >= deadline {
            return false;
        }
        sleep(POLL_INTERVAL).await;
    }
}

/// Field order matters: the process is killed before the profile directory
/// is removed.
pub struct ChromiumSession {
    child: Child,
    cdp: Cdp,
    session_id: String,
    closed: bool,
    _profile: TempDir,
}

#[async_trait]
impl ReadinessCheck for ChromiumSession {
    async fn check(&mut self, expression: &str) -> Result<bool, BrowserError> {
        let reply = self
            .cdp
            .call(
                "Runtime.evaluate",
                json!({ "expression": expression, "returnByValue": true }),
                Some(self.session_id.as_str()),
            )
            .await?;
        Ok(reply["result"]["value"].as_bool() == Some(true))
    }
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), BrowserError> {
        let reply = timeout(
            limit,
            self.cdp
                .call("Page.navigate", json!({ "url": url }), Some(self.session_id.as_str())),
        )
        .await
        .map_err(|_| BrowserError::Timeout(limit, "navigation"))??;

        if let Some(reason) = reply.get("errorText").and_then(Value::as_str) {
            return Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: reason.to_string(),
            });
        }
        debug!(url, "Navigated");
        Ok(())
    }

    async fn wait_for_selector(&mut self, selector: &str, limit: Duration) -> Result<(), BrowserError> {
        let expression = format!(
            "document.querySelector({}) !== null",
            Value::String(selector.to_string())
        );
        if poll_ready(&mut *self, &expression, limit).await {
            return Ok(());
        }
        Err(BrowserError::MissingSelector {
            selector: selector.to_string(),
            timeout: limit,
        })
    }

    async fn screenshot(&mut self, clip: Clip) -> Result<Vec<u8>, BrowserError> {
        let params = json!({
            "format": "png",
            "captureBeyondViewport": false,
            "clip": {
                "x": clip.x,
                "y": clip.y,
                "width": clip.width,
                "height": clip.height,
                "scale": 1
            }
        });
        let reply = timeout(
            SCREENSHOT_TIMEOUT,
            self.cdp
                .call("Page.captureScreenshot", params, Some(self.session_id.as_str())),
        )
        .await
        .map_err(|_| BrowserError::Timeout(SCREENSHOT_TIMEOUT, "screenshot"))??;

        let data = reply
            .get("data")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Screenshot("reply carried no image data".to_string()))?;
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(|e| BrowserError::Screenshot(format!("invalid image encoding: {e}")))
    }

    async fn close(&mut self) -> Result<(), BrowserError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        // The reply may never arrive once the browser starts exiting.
        let _ = timeout(CLOSE_GRACE, self.cdp.call("Browser.close", json!({}), None)).await;

        match timeout(CLOSE_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!(%status, "Browser exited");
                Ok(())
            }
            Ok(Err(e)) => Err(BrowserError::Shutdown(e.to_string())),
            Err(_) => {
                warn!(pid = ?self.child.id(), "Browser ignored Browser.close, killing");
                self.child
                    .kill()
                    .await
                    .map_err(|e| BrowserError::Shutdown(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted browser for exercising export flows without Chromium.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;

    pub const PNG_STUB: &[u8] = b"\x89PNG\r\n\x1a\nstub";

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Outcome {
        Capture,
        LaunchFails,
        NavigationTimesOut,
        NeverReady,
    }

    #[derive(Debug, Default)]
    pub struct Counters {
        pub launches: AtomicUsize,
        pub closes: AtomicUsize,
        pub urls: Mutex<Vec<String>>,
    }

    impl Counters {
        pub fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }

        pub fn closes(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls.lock().unwrap().clone()
        }
    }

    pub struct FakeLauncher {
        pub outcome: Outcome,
        pub counters: Arc<Counters>,
    }

    impl FakeLauncher {
        pub fn new(outcome: Outcome) -> Self {
            Self {
                outcome,
                counters: Arc::new(Counters::default()),
            }
        }
    }

    #[async_trait]
    impl BrowserLauncher for FakeLauncher {
        async fn launch(&self, _viewport: Viewport) -> Result<Box<dyn BrowserSession>, BrowserError> {
            if self.outcome == Outcome::LaunchFails {
                return Err(BrowserError::Launch("chromium: not found".to_string()));
            }
            self.counters.launches.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSession {
                outcome: self.outcome,
                counters: self.counters.clone(),
                closed: false,
            }))
        }
    }

    struct FakeSession {
        outcome: Outcome,
        counters: Arc<Counters>,
        closed: bool,
    }

    #[async_trait]
    impl BrowserSession for FakeSession {
        async fn navigate(&mut self, url: &str, limit: Duration) -> Result<(), BrowserError> {
            self.counters.urls.lock().unwrap().push(url.to_string());
            if self.outcome == Outcome::NavigationTimesOut {
                return Err(BrowserError::Timeout(limit, "navigation"));
            }
            Ok(())
        }

        async fn wait_for_selector(&mut self, selector: &str, limit: Duration) -> Result<(), BrowserError> {
            if self.outcome == Outcome::NeverReady {
                return Err(BrowserError::MissingSelector {
                    selector: selector.to_string(),
                    timeout: limit,
                });
            }
            Ok(())
        }

        async fn screenshot(&mut self, _clip: Clip) -> Result<Vec<u8>, BrowserError> {
            Ok(PNG_STUB.to_vec())
        }

        async fn close(&mut self) -> Result<(), BrowserError> {
            if !self.closed {
                self.closed = true;
                self.counters.closes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Replays scripted answers, then keeps failing or keeps answering false.
    struct ScriptedCheck {
        replies: VecDeque<Result<bool, BrowserError>>,
        then_error: bool,
        calls: usize,
    }

    #[async_trait]
    impl ReadinessCheck for ScriptedCheck {
        async fn check(&mut self, _expression: &str) -> Result<bool, BrowserError> {
            self.calls += 1;
            match self.replies.pop_front() {
                Some(reply) => reply,
                None if self.then_error => Err(BrowserError::Protocol(
                    "Cannot find context with specified id".to_string(),
                )),
                None => Ok(false),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_context_errors_after_navigation_are_retried() {
        let mut check = ScriptedCheck {
            replies: VecDeque::from([
                Err(BrowserError::Protocol("Execution context was destroyed.".to_string())),
                Err(BrowserError::Protocol("Cannot find context with specified id".to_string())),
                Ok(false),
                Ok(true),
            ]),
            then_error: false,
            calls: 0,
        };
        assert!(poll_ready(&mut check, "true", Duration::from_secs(5)).await);
        assert_eq!(check.calls, 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_errors_give_up_at_deadline() {
        let mut check = ScriptedCheck {
            replies: VecDeque::new(),
            then_error: true,
            calls: 0,
        };
        let started = Instant::now();
        assert!(!poll_ready(&mut check, "true", Duration::from_secs(1)).await);
        assert!(check.calls >= 5, "gave up after {} checks", check.calls);
        assert!(started.elapsed() <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_devtools_url_is_read_from_stderr() {
        let output: &'static [u8] = b"[0101/000000.000:ERROR:gpu_init.cc] noise\n\
              DevTools listening on ws://127.0.0.1:40123/devtools/browser/4f1c\n\
              more output\n";
        let url = devtools_url(output).await.unwrap();
        assert_eq!(url, "ws://127.0.0.1:40123/devtools/browser/4f1c");
    }

    #[tokio::test]
    async fn test_devtools_url_missing_is_launch_error() {
        let output: &'static [u8] = b"crashed before listening\n";
        assert!(matches!(devtools_url(output).await, Err(BrowserError::Launch(_))));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_to_launch() {
        let launcher = ChromiumLauncher::new("/nonexistent/folio-chromium", Duration::from_secs(1));
        let result = launcher
            .launch(Viewport {
                width: 800,
                height: 600,
            })
            .await;
        assert!(matches!(result, Err(BrowserError::Launch(_))));
    }
}
