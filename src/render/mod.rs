//! The rendering capability the visual inspector and screenshot capture sit on.
//!
//! A [`Renderer`] opens a page at a viewport preset; the page answers element
//! lookups, geometry, attribute and script queries. The WebDriver
//! implementation lives in [`webdriver`].

pub mod webdriver;

#[cfg(test)]
pub(crate) mod fixture;

use serde_json::Value;
use std::fmt;
use url::Url;

use crate::error::RenderError;
use crate::viewport::ViewportProfile;

pub use webdriver::WebDriverRenderer;

/// How to locate an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Probe {
    /// A CSS selector; the first match in document order is used.
    Css(&'static str),
    /// The first `<button>` whose text contains this string, ignoring case.
    ButtonText(&'static str),
}

impl fmt::Display for Probe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Probe::Css(css) => f.write_str(css),
            Probe::ButtonText(text) => write!(f, "button:has-text('{}')", text),
        }
    }
}

/// Element geometry in CSS pixels relative to the top-left of the document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    /// Whether the box starts within the first `fold` pixels of the page.
    pub fn is_above_fold(&self, fold: u32) -> bool {
        self.y < f64::from(fold)
    }
}

#[allow(async_fn_in_trait)]
pub trait ElementHandle {
    /// Geometry, or `None` when the element is not rendered.
    async fn bounding_box(&self) -> Result<Option<BoundingBox>, RenderError>;

    async fn attr(&self, name: &str) -> Result<Option<String>, RenderError>;
}

#[allow(async_fn_in_trait)]
pub trait PageHandle {
    type Element: ElementHandle;

    /// First element matching `probe`, if one exists.
    async fn find(&self, probe: &Probe) -> Result<Option<Self::Element>, RenderError>;

    /// Runs a script body (`return ...;`) and returns its JSON result.
    async fn evaluate(&self, script: &str) -> Result<Value, RenderError>;

    /// PNG bytes of the viewport, or of the whole document when `full_page`.
    async fn screenshot(&self, full_page: bool) -> Result<Vec<u8>, RenderError>;

    async fn close(self) -> Result<(), RenderError>;
}

#[allow(async_fn_in_trait)]
pub trait Renderer {
    type Page: PageHandle;

    /// Loads `url` at `viewport` and waits for the network to settle.
    async fn open(&self, url: &Url, viewport: &ViewportProfile) -> Result<Self::Page, RenderError>;
}
