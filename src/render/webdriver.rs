use fantoccini::elements::Element;
use fantoccini::error::{CmdError, ErrorStatus};
use fantoccini::wd::Capabilities;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::AuditConfig;
use crate::error::RenderError;
use crate::render::{BoundingBox, ElementHandle, PageHandle, Probe, Renderer};
use crate::viewport::ViewportProfile;

/// Resource count must hold still this long before the network counts as idle.
const NETWORK_QUIET: Duration = Duration::from_millis(500);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

const IDLE_PROBE_SCRIPT: &str =
    "return [document.readyState, performance.getEntriesByType('resource').length];";
const DOCUMENT_HEIGHT_SCRIPT: &str = "return Math.ceil(Math.max(document.documentElement.scrollHeight, document.body ? document.body.scrollHeight : 0));";

/// Renders pages through a WebDriver server (ChromeDriver or compatible).
///
/// Each [`Renderer::open`] starts a fresh session so viewports never share
/// state.
#[derive(Debug, Clone)]
pub struct WebDriverRenderer {
    webdriver_url: String,
    headless: bool,
    page_load_timeout: Duration,
}

impl WebDriverRenderer {
    pub fn new(webdriver_url: &str) -> Self {
        Self {
            webdriver_url: webdriver_url.to_string(),
            headless: true,
            page_load_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_config(config: &AuditConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            headless: config.headless,
            page_load_timeout: config.render_timeout(),
        }
    }

    pub fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    pub fn with_page_load_timeout(mut self, timeout: Duration) -> Self {
        self.page_load_timeout = timeout;
        self
    }

    /// Session capabilities for a viewport preset
    fn capabilities(&self, viewport: &ViewportProfile) -> Capabilities {
        let mut args = vec![
            "--disable-gpu".to_string(),
            "--hide-scrollbars".to_string(),
            format!("--window-size={},{}", viewport.width, viewport.height),
        ];
        if self.headless {
            args.push("--headless=new".to_string());
        }

        let mut chrome_options = json!({ "args": args });
        if viewport.is_mobile() {
            chrome_options["mobileEmulation"] = json!({
                "deviceMetrics": {
                    "width": viewport.width,
                    "height": viewport.height,
                    "pixelRatio": viewport.device_scale,
                    "mobile": true,
                    "touch": true,
                }
            });
        } else {
            args_push(
                &mut chrome_options,
                format!("--force-device-scale-factor={}", viewport.device_scale),
            );
        }

        let mut caps = Capabilities::new();
        caps.insert("browserName".to_string(), json!("chrome"));
        caps.insert("goog:chromeOptions".to_string(), chrome_options);
        caps.insert(
            "timeouts".to_string(),
            json!({
                "pageLoad": self.page_load_timeout.as_millis() as u64,
                "script": self.page_load_timeout.as_millis() as u64,
            }),
        );
        caps
    }

    /// Connects to the configured WebDriver, then to well-known local ports
    async fn connect(&self, caps: Capabilities) -> Result<Client, RenderError> {
        let first_error = match connect_once(&self.webdriver_url, caps.clone()).await {
            Ok(client) => return Ok(client),
            Err(e) => {
                ::log::error!("Failed to connect to WebDriver at {}: {}", self.webdriver_url, e);
                e
            }
        };

        let fallback_urls = [
            "http://localhost:9515", // ChromeDriver default
            "http://127.0.0.1:4444", // Try with IP instead of localhost
        ];

        for url in fallback_urls.iter() {
            if *url == self.webdriver_url {
                continue;
            }
            ::log::info!("Trying fallback WebDriver URL: {}", url);
            if let Ok(client) = connect_once(url, caps.clone()).await {
                ::log::debug!("Connected to fallback WebDriver at {}", url);
                return Ok(client);
            }
        }

        ::log::error!(
            "Make sure a WebDriver server is running or set the WEBDRIVER_URL environment variable"
        );
        Err(RenderError::Session {
            url: self.webdriver_url.clone(),
            reason: first_error,
        })
    }
}

fn args_push(chrome_options: &mut Value, arg: String) {
    if let Some(args) = chrome_options["args"].as_array_mut() {
        args.push(Value::String(arg));
    }
}

async fn connect_once(webdriver_url: &str, caps: Capabilities) -> Result<Client, String> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(caps);
    builder
        .connect(webdriver_url)
        .await
        .map_err(|e| e.to_string())
}

/// Maps a WebDriver command failure, noting lost sessions separately
fn command_error(error: CmdError, context: &str) -> RenderError {
    if error.to_string().contains("Unable to find session") {
        ::log::warn!("Lost WebDriver session while {}", context);
    } else {
        ::log::debug!("WebDriver command failed while {}: {}", context, error);
    }
    RenderError::Command {
        context: context.to_string(),
        reason: error.to_string(),
    }
}

/// Polls until the document is complete and no new resources have been
/// requested for [`NETWORK_QUIET`], or `timeout` elapses.
async fn wait_for_network_idle(client: &Client, timeout: Duration) -> Result<(), RenderError> {
    let deadline = Instant::now() + timeout;
    let mut last_count: Option<u64> = None;
    let mut quiet_since = Instant::now();

    loop {
        let state = client
            .execute(IDLE_PROBE_SCRIPT, Vec::new())
            .await
            .map_err(|e| command_error(e, "waiting for network idle"))?;
        let complete = state.get(0).and_then(Value::as_str) == Some("complete");
        let count = state.get(1).and_then(Value::as_u64);

        if !complete || count != last_count {
            last_count = count;
            quiet_since = Instant::now();
        } else if quiet_since.elapsed() >= NETWORK_QUIET {
            return Ok(());
        }

        if Instant::now() >= deadline {
            return Err(RenderError::Timeout(timeout));
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

impl Renderer for WebDriverRenderer {
    type Page = WebDriverPage;

    async fn open(&self, url: &Url, viewport: &ViewportProfile) -> Result<WebDriverPage, RenderError> {
        let started = Instant::now();
        let client = self.connect(self.capabilities(viewport)).await?;

        let page = WebDriverPage {
            client,
            viewport: *viewport,
        };
        if let Err(e) = page.load(url, self.page_load_timeout).await {
            page.close().await.ok();
            return Err(e);
        }

        ::log::debug!(
            "Rendered {} at {} in {:.2} seconds",
            url,
            viewport.name,
            started.elapsed().as_secs_f64()
        );
        Ok(page)
    }
}

/// One WebDriver session showing one page.
pub struct WebDriverPage {
    client: Client,
    viewport: ViewportProfile,
}

impl WebDriverPage {
    async fn load(&self, url: &Url, timeout: Duration) -> Result<(), RenderError> {
        if !self.viewport.is_mobile() {
            self.client
                .set_window_size(self.viewport.width, self.viewport.height)
                .await
                .map_err(|e| command_error(e, "sizing window"))?;
        }
        self.client.goto(url.as_str()).await.map_err(|e| {
            if matches!(&e, CmdError::Standard(wd) if matches!(wd.error, ErrorStatus::Timeout)) {
                RenderError::Timeout(timeout)
            } else {
                command_error(e, &format!("accessing {}", url))
            }
        })?;
        wait_for_network_idle(&self.client, timeout).await
    }
}

impl PageHandle for WebDriverPage {
    type Element = WebDriverElement;

    async fn find(&self, probe: &Probe) -> Result<Option<WebDriverElement>, RenderError> {
        let xpath;
        let locator = match probe {
            Probe::Css(css) => Locator::Css(css),
            Probe::ButtonText(text) => {
                xpath = button_text_xpath(text);
                Locator::XPath(&xpath)
            }
        };

        let found = self
            .client
            .find_all(locator)
            .await
            .map_err(|e| command_error(e, &format!("finding {}", probe)))?;
        Ok(found.into_iter().next().map(WebDriverElement))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, RenderError> {
        self.client
            .execute(script, Vec::new())
            .await
            .map_err(|e| command_error(e, "evaluating script"))
    }

    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, RenderError> {
        if full_page && !self.viewport.is_mobile() {
            let height = self.evaluate(DOCUMENT_HEIGHT_SCRIPT).await?;
            let height = height
                .as_u64()
                .and_then(|h| u32::try_from(h).ok())
                .unwrap_or(self.viewport.height)
                .max(self.viewport.height);
            self.client
                .set_window_size(self.viewport.width, height)
                .await
                .map_err(|e| command_error(e, "expanding window for full-page capture"))?;
        }
        self.client
            .screenshot()
            .await
            .map_err(|e| command_error(e, "capturing screenshot"))
    }

    async fn close(self) -> Result<(), RenderError> {
        self.client
            .close()
            .await
            .map_err(|e| command_error(e, "closing session"))
    }
}

/// Case-insensitive "button contains text" as XPath 1.0
fn button_text_xpath(text: &str) -> String {
    const UPPER: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    const LOWER: &str = "abcdefghijklmnopqrstuvwxyz";
    format!(
        "//button[contains(translate(normalize-space(.), '{}', '{}'), '{}')]",
        UPPER,
        LOWER,
        text.to_lowercase()
    )
}

pub struct WebDriverElement(Element);

impl ElementHandle for WebDriverElement {
    async fn bounding_box(&self) -> Result<Option<BoundingBox>, RenderError> {
        let displayed = self
            .0
            .is_displayed()
            .await
            .map_err(|e| command_error(e, "checking element visibility"))?;
        if !displayed {
            return Ok(None);
        }

        let (x, y, width, height) = self
            .0
            .rectangle()
            .await
            .map_err(|e| command_error(e, "reading element geometry"))?;
        Ok(Some(BoundingBox {
            x,
            y,
            width,
            height,
        }))
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, RenderError> {
        self.0
            .attr(name)
            .await
            .map_err(|e| command_error(e, &format!("reading attribute {}", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_text_xpath() {
        assert_eq!(
            button_text_xpath("Get Started"),
            "//button[contains(translate(normalize-space(.), 'ABCDEFGHIJKLMNOPQRSTUVWXYZ', 'abcdefghijklmnopqrstuvwxyz'), 'get started')]"
        );
    }

    #[test]
    fn test_desktop_capabilities() {
        let renderer = WebDriverRenderer::new("http://localhost:4444")
            .with_page_load_timeout(Duration::from_secs(10));
        let caps = renderer.capabilities(&ViewportProfile::DESKTOP);

        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(args.contains(&json!("--window-size=1920,1080")));
        assert!(args.contains(&json!("--headless=new")));
        assert!(caps["goog:chromeOptions"].get("mobileEmulation").is_none());
        assert_eq!(caps["timeouts"]["pageLoad"], json!(10000));
    }

    #[test]
    fn test_mobile_capabilities() {
        let renderer = WebDriverRenderer::new("http://localhost:4444").with_headless(false);
        let caps = renderer.capabilities(&ViewportProfile::MOBILE);

        let metrics = &caps["goog:chromeOptions"]["mobileEmulation"]["deviceMetrics"];
        assert_eq!(metrics["width"], json!(375));
        assert_eq!(metrics["height"], json!(812));
        assert_eq!(metrics["pixelRatio"], json!(2.0));

        let args = caps["goog:chromeOptions"]["args"].as_array().unwrap();
        assert!(!args.contains(&json!("--headless=new")));
    }
}
