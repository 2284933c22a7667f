// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::BrowserSettings;
use crate::engines::traits::{BrowserEngine, EngineError, RenderRequest};
use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use parking_lot::Mutex;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

/// 滚动轮数上限，防止无限加载的页面无法结束
const MAX_SCROLL_ROUNDS: u32 = 50;
const ELEMENT_POLL_INTERVAL: Duration = Duration::from_millis(250);
const SESSION_CLOSE_TIMEOUT: Duration = Duration::from_secs(10);

/// 浏览器事件处理任务，丢弃时终止
struct EventLoop(JoinHandle<()>);

impl Drop for EventLoop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// 在后台执行清理，完成后再终止事件处理任务
///
/// 不在 tokio 运行时中时只终止事件处理任务
fn release_in_background<F>(cleanup: F, events: EventLoop)
where
    F: Future<Output = ()> + Send + 'static,
{
    match Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                cleanup.await;
                drop(events);
            });
        }
        Err(_) => drop(events),
    }
}

/// 关闭会话打开的页面和浏览器
async fn close_browser(mut browser: Browser, pages: Vec<Page>) {
    let closing = async move {
        for page in pages {
            if let Err(e) = page.close().await {
                debug!("Failed to close page: {}", e);
            }
        }
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser session: {}", e);
        }
        if let Err(e) = browser.wait().await {
            debug!("Browser process did not exit cleanly: {}", e);
        }
    };
    if timeout(SESSION_CLOSE_TIMEOUT, closing).await.is_err() {
        warn!("Timed out closing browser session after {:?}", SESSION_CLOSE_TIMEOUT);
    }
}

/// 单次调用独占的浏览器会话
///
/// 正常路径通过 `quit` 释放；渲染被取消（租约超时或工作者终止）时
/// 由 `Drop` 在后台关闭页面和浏览器，远程浏览器也不会遗留目标页。
struct BrowserSession {
    browser: Option<Browser>,
    pages: Mutex<Vec<Page>>,
    events: Option<EventLoop>,
}

impl BrowserSession {
    async fn acquire(settings: &BrowserSettings) -> Result<Self, EngineError> {
        let (browser, mut handler) = match &settings.remote_url {
            Some(url) => {
                info!("Connecting to remote Chrome instance at: {}", url);
                Browser::connect(url.as_str()).await.map_err(|e| {
                    EngineError::Browser(format!("Failed to connect to remote Chrome: {}", e))
                })?
            }
            None => {
                let config = BrowserConfig::builder()
                    .no_sandbox()
                    .request_timeout(Duration::from_secs(settings.page_load_timeout_secs))
                    .arg("--headless=new")
                    .arg("--disable-gpu")
                    .arg("--disable-dev-shm-usage")
                    .arg("--disable-blink-features=AutomationControlled")
                    .build()
                    .map_err(EngineError::Browser)?;
                Browser::launch(config)
                    .await
                    .map_err(|e| EngineError::Browser(e.to_string()))?
            }
        };

        // Spawn a handler to process browser events
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(Self {
            browser: Some(browser),
            pages: Mutex::new(Vec::new()),
            events: Some(EventLoop(handler)),
        })
    }

    fn browser(&self) -> Result<&Browser, EngineError> {
        self.browser
            .as_ref()
            .ok_or_else(|| EngineError::Browser("browser session already closed".to_string()))
    }

    /// 记录打开的页面，释放会话时一并关闭
    fn track(&self, page: &Page) {
        self.pages.lock().push(page.clone());
    }

    async fn quit(mut self) {
        let pages = std::mem::take(self.pages.get_mut());
        if let Some(browser) = self.browser.take() {
            close_browser(browser, pages).await;
        }
        drop(self.events.take());
    }
}

impl Drop for BrowserSession {
    fn drop(&mut self) {
        let Some(browser) = self.browser.take() else {
            return;
        };
        let pages = std::mem::take(self.pages.get_mut());
        if let Some(events) = self.events.take() {
            warn!("Browser session dropped mid-render, closing it in the background");
            release_in_background(close_browser(browser, pages), events);
        }
    }
}

/// Chromium 浏览器引擎
///
/// 基于chromiumoxide实现，每次渲染都获取新的会话并在结束时关闭
pub struct ChromiumEngine {
    settings: BrowserSettings,
}

impl ChromiumEngine {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }

    async fn bounded<T, F, E>(&self, limit: Duration, what: &str, fut: F) -> Result<T, EngineError>
    where
        F: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        timeout(limit, fut)
            .await
            .map_err(|_| EngineError::Timeout(format!("{} exceeded {:?}", what, limit)))?
            .map_err(|e| EngineError::Browser(format!("{}: {}", what, e)))
    }

    async fn render_in(
        &self,
        session: &BrowserSession,
        request: &RenderRequest,
    ) -> Result<String, EngineError> {
        let page_load = Duration::from_secs(self.settings.page_load_timeout_secs);
        let script = Duration::from_secs(self.settings.script_timeout_secs);

        let page = self
            .bounded(page_load, "open page", session.browser()?.new_page("about:blank"))
            .await?;
        session.track(&page);
        self.bounded(script, "set user agent", page.set_user_agent(&self.settings.user_agent))
            .await?;

        timeout(page_load, page.goto(&request.url))
            .await
            .map_err(|_| EngineError::Timeout(format!("page load of {}", request.url)))?
            .map_err(|e| EngineError::Navigation(format!("{}: {}", request.url, e)))?;

        if let Some(selector) = &request.wait_for {
            self.wait_for_element(&page, selector).await?;
        }

        if request.scroll {
            self.scroll_page(&page).await?;
        }

        self.bounded(script, "read page content", page.content()).await
    }

    /// 轮询等待元素出现，出现后再固定等待一段时间
    async fn wait_for_element(&self, page: &Page, selector: &str) -> Result<(), EngineError> {
        let deadline =
            Instant::now() + Duration::from_secs(self.settings.element_wait_timeout_secs);

        loop {
            if page.find_element(selector).await.is_ok() {
                sleep(Duration::from_millis(self.settings.settle_delay_ms)).await;
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(EngineError::MissingElement(selector.to_string()));
            }
            sleep(ELEMENT_POLL_INTERVAL).await;
        }
    }

    async fn scroll_height(&self, page: &Page) -> Result<i64, EngineError> {
        let script = Duration::from_secs(self.settings.script_timeout_secs);
        let result = self
            .bounded(
                script,
                "read scroll height",
                page.evaluate("document.documentElement.scrollHeight"),
            )
            .await?;
        result
            .into_value::<i64>()
            .map_err(|e| EngineError::Browser(format!("scroll height: {}", e)))
    }

    /// 滚动到底部直到页面高度连续多次不再增长
    async fn scroll_page(&self, page: &Page) -> Result<(), EngineError> {
        let script = Duration::from_secs(self.settings.script_timeout_secs);
        let growth_timeout = Duration::from_secs(self.settings.scroll_growth_timeout_secs);
        let mut last_height = 0;
        let mut attempts = 0;
        let mut rounds = 0;

        while attempts < self.settings.max_scroll_attempts && rounds < MAX_SCROLL_ROUNDS {
            rounds += 1;
            self.bounded(
                script,
                "scroll",
                page.evaluate("window.scrollTo(0, document.documentElement.scrollHeight);"),
            )
            .await?;
            sleep(Duration::from_millis(self.settings.scroll_pause_ms)).await;

            let deadline = Instant::now() + growth_timeout;
            let mut grown = None;
            while Instant::now() < deadline {
                let height = self.scroll_height(page).await?;
                if height > last_height {
                    grown = Some(height);
                    break;
                }
                sleep(ELEMENT_POLL_INTERVAL).await;
            }

            match grown {
                Some(height) => {
                    last_height = height;
                    attempts = 0;
                }
                None => attempts += 1,
            }
        }

        debug!(rounds, last_height, "Finished scrolling");
        Ok(())
    }
}

#[async_trait]
impl BrowserEngine for ChromiumEngine {
    /// 执行浏览器渲染
    ///
    /// # 参数
    ///
    /// * `request` - 渲染请求
    ///
    /// # 返回值
    ///
    /// * `Ok(String)` - 渲染后的 HTML
    /// * `Err(EngineError)` - 超时、导航失败或元素缺失
    async fn render(&self, request: &RenderRequest) -> Result<String, EngineError> {
        let session = BrowserSession::acquire(&self.settings).await?;
        let outcome = self.render_in(&session, request).await;
        session.quit().await;
        outcome
    }

    fn name(&self) -> &'static str {
        "chromium"
    }
}
