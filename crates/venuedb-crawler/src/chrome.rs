//! Chrome DevTools implementation of the browser traits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::input::{
    DispatchMouseEventParams, DispatchMouseEventType, MouseButton,
};
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::task::JoinHandle;
use venuedb_core::BrowserSettings;

use crate::error::CrawlError;
use crate::remote::resolve_debugger_url;
use crate::session::{BrowserSession, PageHandle};

/// Hides the automation markers the map front end checks for.
const STEALTH_SCRIPT: &str = r"
Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
Object.defineProperty(navigator, 'languages', { get: () => ['ru-RU', 'ru', 'en-US', 'en'] });
window.chrome = window.chrome || { runtime: {} };
";

const LAUNCH_ARGS: [&str; 7] = [
    "--disable-blink-features=AutomationControlled",
    "--disable-dev-shm-usage",
    "--no-sandbox",
    "--disable-gpu",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-infobars",
];

/// Quote `s` as a JavaScript string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

#[derive(Debug, Deserialize)]
struct ThumbBox {
    x: f64,
    y: f64,
    viewport: f64,
}

/// Close tasks spawned by dropped tabs. The session drains them before it
/// stops the DevTools handler, otherwise the close is never sent.
#[derive(Clone, Default)]
struct PendingCloses {
    tasks: Arc<Mutex<Vec<JoinHandle<()>>>>,
}

impl PendingCloses {
    fn track(&self, task: JoinHandle<()>) {
        if let Ok(mut tasks) = self.tasks.lock() {
            tasks.retain(|t| !t.is_finished());
            tasks.push(task);
        }
    }

    fn take(&self) -> Vec<JoinHandle<()>> {
        self.tasks
            .lock()
            .map(|mut tasks| std::mem::take(&mut *tasks))
            .unwrap_or_default()
    }

    /// Wait up to `budget` for every tracked close. Returns how many were
    /// still running when the budget ran out; those are aborted.
    async fn drain(&self, budget: Duration) -> usize {
        let tasks = self.take();
        let deadline = tokio::time::Instant::now() + budget;
        let mut unfinished = 0;
        for mut task in tasks {
            if tokio::time::timeout_at(deadline, &mut task).await.is_err() {
                task.abort();
                unfinished += 1;
            }
        }
        unfinished
    }
}

/// One browser tab. A tab dropped without [`PageHandle::close`] closes
/// itself in the background.
pub struct ChromeTab {
    page: Option<Page>,
    nav_timeout: Duration,
    pending: PendingCloses,
}

impl ChromeTab {
    async fn open(
        browser: &Browser,
        nav_timeout: Duration,
        pending: PendingCloses,
    ) -> Result<Self, CrawlError> {
        let params = CreateTargetParams::builder()
            .url("about:blank")
            .background(true)
            .build()
            .map_err(CrawlError::Protocol)?;
        let page = browser.new_page(params).await?;
        page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(STEALTH_SCRIPT))
            .await?;
        Ok(Self {
            page: Some(page),
            nav_timeout,
            pending,
        })
    }

    fn page(&self) -> Result<&Page, CrawlError> {
        self.page
            .as_ref()
            .ok_or_else(|| CrawlError::SessionLost("tab already closed".to_string()))
    }

    /// Evaluate `body` (a function body ending in `return`) and decode its
    /// JSON-stringified result.
    async fn eval<T: DeserializeOwned>(&self, body: &str) -> Result<T, CrawlError> {
        let script = format!("JSON.stringify((() => {{ {body} }})())");
        let raw: String = self
            .page()?
            .evaluate(script)
            .await?
            .into_value()
            .map_err(|e| CrawlError::Protocol(e.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| CrawlError::Protocol(e.to_string()))
    }

    async fn mouse(
        &self,
        kind: DispatchMouseEventType,
        x: f64,
        y: f64,
    ) -> Result<(), CrawlError> {
        let params = DispatchMouseEventParams::builder()
            .r#type(kind)
            .x(x)
            .y(y)
            .button(MouseButton::Left)
            .click_count(1)
            .build()
            .map_err(CrawlError::Protocol)?;
        self.page()?.execute(params).await?;
        Ok(())
    }
}

impl Drop for ChromeTab {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                let task = handle.spawn(async move {
                    if let Err(e) = page.close().await {
                        tracing::debug!(error = %e, "background tab close failed");
                    }
                });
                self.pending.track(task);
            }
        }
    }
}

#[async_trait]
impl PageHandle for ChromeTab {
    async fn navigate(&self, url: &str) -> Result<(), CrawlError> {
        tracing::debug!(url, "navigating");
        match tokio::time::timeout(self.nav_timeout, self.page()?.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => {
                let err = CrawlError::from(e);
                if err.ends_session() {
                    Err(err)
                } else {
                    Err(CrawlError::Navigation {
                        url: url.to_string(),
                        reason: err.to_string(),
                    })
                }
            }
            Err(_) => Err(CrawlError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: self.nav_timeout.as_secs(),
            }),
        }
    }

    async fn current_url(&self) -> Result<String, CrawlError> {
        Ok(self.page()?.url().await?.unwrap_or_default())
    }

    async fn html(&self) -> Result<String, CrawlError> {
        Ok(self.page()?.content().await?)
    }

    async fn exists(&self, selector: &str) -> Result<bool, CrawlError> {
        self.eval(&format!(
            "return document.querySelector({}) !== null;",
            js_string(selector)
        ))
        .await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, CrawlError> {
        let text: Option<String> = self
            .eval(&format!(
                "const el = document.querySelector({}); return el ? el.innerText : null;",
                js_string(selector)
            ))
            .await?;
        Ok(text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()))
    }

    async fn attribute_of(
        &self,
        selector: &str,
        name: &str,
    ) -> Result<Option<String>, CrawlError> {
        self.eval(&format!(
            "const el = document.querySelector({}); return el ? el.getAttribute({}) : null;",
            js_string(selector),
            js_string(name)
        ))
        .await
    }

    async fn hrefs(&self, selector: &str) -> Result<Vec<String>, CrawlError> {
        self.eval(&format!(
            "return Array.from(document.querySelectorAll({})).map(a => a.href).filter(Boolean);",
            js_string(selector)
        ))
        .await
    }

    async fn click_first(&self, selector: &str) -> Result<bool, CrawlError> {
        self.eval(&format!(
            "const el = document.querySelector({}); if (!el) return false; el.click(); return true;",
            js_string(selector)
        ))
        .await
    }

    async fn type_into(&self, selector: &str, text: &str) -> Result<(), CrawlError> {
        let element = self.page()?.find_element(selector).await.map_err(|e| {
            tracing::debug!(selector, error = %e, "input lookup failed");
            CrawlError::ElementMissing {
                selector: selector.to_string(),
            }
        })?;
        element.click().await?.type_str(text).await?;
        Ok(())
    }

    async fn press_enter(&self, selector: &str) -> Result<(), CrawlError> {
        let element = self.page()?.find_element(selector).await.map_err(|_| {
            CrawlError::ElementMissing {
                selector: selector.to_string(),
            }
        })?;
        element.press_key("Enter").await?;
        Ok(())
    }

    async fn drag_thumb(&self, selector: &str, dy: f64) -> Result<(), CrawlError> {
        let thumb: Option<ThumbBox> = self
            .eval(&format!(
                "const el = document.querySelector({}); if (!el) return null; \
                 const r = el.getBoundingClientRect(); \
                 return {{ x: r.left + r.width / 2, y: r.top + r.height / 2, viewport: window.innerHeight }};",
                js_string(selector)
            ))
            .await?;
        let Some(thumb) = thumb else {
            return Err(CrawlError::ElementMissing {
                selector: selector.to_string(),
            });
        };

        let target_y = thumb.y + dy;
        if target_y < 0.0 || target_y > thumb.viewport {
            return Err(CrawlError::DragOutOfBounds {
                target_y,
                track_height: thumb.viewport,
            });
        }

        self.mouse(DispatchMouseEventType::MousePressed, thumb.x, thumb.y)
            .await?;
        self.mouse(DispatchMouseEventType::MouseMoved, thumb.x, target_y)
            .await?;
        self.mouse(DispatchMouseEventType::MouseReleased, thumb.x, target_y)
            .await
    }

    async fn close(mut self) -> Result<(), CrawlError> {
        if let Some(page) = self.page.take() {
            page.close().await?;
        }
        Ok(())
    }
}

/// A launched or attached Chrome instance with its search tab.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    primary: ChromeTab,
    nav_timeout: Duration,
    pending: PendingCloses,
    /// Launched by us, so ours to shut down. Attached browsers are only
    /// disconnected from.
    owned: bool,
}

impl ChromeSession {
    /// Launch a local browser, or attach to `settings.remote_url` when set.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlError::Launch`] if the browser cannot be started, or the
    /// remote resolution errors when attaching.
    pub async fn start(settings: &BrowserSettings) -> Result<Self, CrawlError> {
        let nav_timeout = Duration::from_secs(settings.nav_timeout_secs);

        let (browser, mut handler, owned) = if let Some(remote) = &settings.remote_url {
            let ws_url = resolve_debugger_url(remote, settings.nav_timeout_secs).await?;
            tracing::info!("attaching to remote browser");
            let config = HandlerConfig {
                request_timeout: nav_timeout,
                ..HandlerConfig::default()
            };
            let (browser, handler) = Browser::connect_with_config(ws_url, config)
                .await
                .map_err(|e| CrawlError::Launch(e.to_string()))?;
            (browser, handler, false)
        } else {
            let mut builder = BrowserConfig::builder().request_timeout(nav_timeout);
            if !settings.headless {
                builder = builder.with_head();
            }
            if let Some(path) = &settings.chrome_path {
                builder = builder.chrome_executable(path);
            }
            for arg in LAUNCH_ARGS {
                builder = builder.arg(arg);
            }
            let config = builder.build().map_err(CrawlError::Launch)?;
            tracing::info!(headless = settings.headless, "launching browser");
            let (browser, handler) = Browser::launch(config)
                .await
                .map_err(|e| CrawlError::Launch(e.to_string()))?;
            (browser, handler, true)
        };

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler stopped");
                    break;
                }
            }
        });

        let pending = PendingCloses::default();
        let primary = match ChromeTab::open(&browser, nav_timeout, pending.clone()).await {
            Ok(tab) => tab,
            Err(e) => {
                handler.abort();
                return Err(CrawlError::Launch(e.to_string()));
            }
        };

        Ok(Self {
            browser,
            handler,
            primary,
            nav_timeout,
            pending,
            owned,
        })
    }

    fn ensure_alive(&self) -> Result<(), CrawlError> {
        if self.handler.is_finished() {
            return Err(CrawlError::SessionLost(
                "devtools connection closed".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BrowserSession for ChromeSession {
    type Page = ChromeTab;

    fn primary(&self) -> &ChromeTab {
        &self.primary
    }

    async fn open_detail_tab(&self, url: &str) -> Result<ChromeTab, CrawlError> {
        self.ensure_alive()?;
        let tab = ChromeTab::open(&self.browser, self.nav_timeout, self.pending.clone()).await?;
        // On failure the tab is dropped and closes itself.
        tab.navigate(url).await?;
        Ok(tab)
    }

    async fn shutdown(self) -> Result<(), CrawlError> {
        let Self {
            mut browser,
            handler,
            primary,
            nav_timeout,
            pending,
            owned,
        } = self;

        if let Err(e) = primary.close().await {
            tracing::debug!(error = %e, "primary tab close failed");
        }

        let unfinished = pending.drain(nav_timeout).await;
        if unfinished > 0 {
            tracing::warn!(unfinished, "detail tabs left open at shutdown");
        }

        let result = if owned {
            let closed = browser.close().await.map(|_| ());
            if let Err(e) = browser.wait().await {
                tracing::debug!(error = %e, "waiting for browser exit failed");
            }
            closed.map_err(CrawlError::from)
        } else {
            Ok(())
        };

        handler.abort();
        tracing::info!("browser session closed");
        result
    }
}
