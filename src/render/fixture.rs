//! Static-HTML renderer for tests.
//!
//! Layout is faked from attributes: `data-top` gives an element's y offset
//! (default 0), `hidden` makes it unrendered, and `data-scroll-width` on
//! `<html>` sets the document scroll width (default: viewport width). The base
//! font size comes from a `font-size: Npx` declaration in the body's `style`
//! attribute (default 16).

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};
use std::time::Duration;
use url::Url;

use crate::error::RenderError;
use crate::parsers::text::normalize_whitespace;
use crate::render::{BoundingBox, ElementHandle, PageHandle, Probe, Renderer};
use crate::viewport::ViewportProfile;
use crate::visual::{BASE_FONT_SCRIPT, SCROLL_WIDTH_SCRIPT};

pub const FIXTURE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nfixture";

static FONT_SIZE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"font-size:\s*([0-9.]+)px").unwrap());
static BUTTON: LazyLock<Selector> = LazyLock::new(|| Selector::parse("button").unwrap());
static BODY: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

pub struct FixtureRenderer {
    html: String,
    opened: Mutex<Vec<&'static str>>,
    fail_on: Option<&'static str>,
    delay: Option<Duration>,
}

impl FixtureRenderer {
    pub fn new(html: &str) -> Self {
        Self {
            html: html.to_string(),
            opened: Mutex::new(Vec::new()),
            fail_on: None,
            delay: None,
        }
    }

    /// Fails `open` for the named viewport.
    pub fn failing_on(mut self, viewport: &'static str) -> Self {
        self.fail_on = Some(viewport);
        self
    }

    /// Sleeps this long in `open` before loading.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Viewport names passed to `open`, in call order.
    pub fn opened(&self) -> Vec<&'static str> {
        self.opened.lock().unwrap().clone()
    }
}

impl Renderer for FixtureRenderer {
    type Page = FixturePage;

    async fn open(&self, url: &Url, viewport: &ViewportProfile) -> Result<FixturePage, RenderError> {
        self.opened.lock().unwrap().push(viewport.name);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on == Some(viewport.name) {
            return Err(RenderError::Session {
                url: url.to_string(),
                reason: format!("fixture refuses {}", viewport.name),
            });
        }
        Ok(FixturePage {
            doc: Html::parse_document(&self.html),
            viewport: *viewport,
        })
    }
}

pub struct FixturePage {
    doc: Html,
    viewport: ViewportProfile,
}

impl FixturePage {
    fn scroll_width(&self) -> i64 {
        self.doc
            .root_element()
            .value()
            .attr("data-scroll-width")
            .and_then(|w| w.parse().ok())
            .unwrap_or(i64::from(self.viewport.width))
    }

    fn base_font_size(&self) -> f64 {
        self.doc
            .select(&BODY)
            .next()
            .and_then(|body| body.value().attr("style"))
            .and_then(|style| FONT_SIZE.captures(style))
            .and_then(|caps| caps[1].parse().ok())
            .unwrap_or(16.0)
    }
}

impl PageHandle for FixturePage {
    type Element = FixtureElement;

    async fn find(&self, probe: &Probe) -> Result<Option<FixtureElement>, RenderError> {
        let found = match probe {
            Probe::Css(css) => {
                let selector = Selector::parse(css).map_err(|e| RenderError::Command {
                    context: format!("parsing {}", css),
                    reason: e.to_string(),
                })?;
                self.doc.select(&selector).next()
            }
            Probe::ButtonText(text) => {
                let needle = text.to_lowercase();
                self.doc.select(&BUTTON).find(|button| {
                    normalize_whitespace(&button.text().collect::<String>())
                        .to_lowercase()
                        .contains(&needle)
                })
            }
        };
        Ok(found.map(FixtureElement::from_element))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, RenderError> {
        match script {
            SCROLL_WIDTH_SCRIPT => Ok(json!([self.scroll_width(), self.viewport.width])),
            BASE_FONT_SCRIPT => Ok(json!(self.base_font_size())),
            other => Err(RenderError::UnexpectedValue {
                script: other.to_string(),
                value: "unsupported by fixture".to_string(),
            }),
        }
    }

    async fn screenshot(&self, _full_page: bool) -> Result<Vec<u8>, RenderError> {
        Ok(FIXTURE_PNG.to_vec())
    }

    async fn close(self) -> Result<(), RenderError> {
        Ok(())
    }
}

pub struct FixtureElement {
    top: f64,
    hidden: bool,
    attrs: HashMap<String, String>,
}

impl FixtureElement {
    fn from_element(element: ElementRef) -> Self {
        let value = element.value();
        Self {
            top: value
                .attr("data-top")
                .and_then(|t| t.parse().ok())
                .unwrap_or(0.0),
            hidden: value.attr("hidden").is_some(),
            attrs: value
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl ElementHandle for FixtureElement {
    async fn bounding_box(&self) -> Result<Option<BoundingBox>, RenderError> {
        if self.hidden {
            return Ok(None);
        }
        Ok(Some(BoundingBox {
            x: 0.0,
            y: self.top,
            width: 100.0,
            height: 20.0,
        }))
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, RenderError> {
        Ok(self.attrs.get(name).cloned())
    }
}
