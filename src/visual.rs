//! Layout heuristics evaluated against a rendered page.
//!
//! The page is rendered twice: once at the desktop preset for above-the-fold
//! checks, once at the mobile preset for responsiveness and typography. Any
//! failure ends up in [`VisualReport::error`]; [`inspect`] never returns an
//! `Err`.

use serde::Serialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use url::Url;

use crate::config::AuditConfig;
use crate::error::RenderError;
use crate::findings::MIN_READABLE_FONT_PX;
use crate::render::{ElementHandle, PageHandle, Probe, Renderer};
use crate::resolver::{self, DEFAULT_RESOLVE_TIMEOUT};
use crate::viewport::ViewportProfile;

/// Call-to-action probes, highest priority first.
pub const CTA_PROBES: [Probe; 8] = [
    Probe::Css("a[href*='signup']"),
    Probe::Css("a[href*='contact']"),
    Probe::Css("a[href*='demo']"),
    Probe::ButtonText("Get Started"),
    Probe::ButtonText("Sign Up"),
    Probe::ButtonText("Contact"),
    Probe::Css(".cta"),
    Probe::Css("[class*='cta']"),
];

/// Hero image probes, highest priority first.
pub const HERO_PROBES: [Probe; 4] = [
    Probe::Css(".hero img"),
    Probe::Css("[class*='hero'] img"),
    Probe::Css("header img"),
    Probe::Css("main img:first-of-type"),
];

pub const H1_PROBE: Probe = Probe::Css("h1");
pub const VIEWPORT_META_PROBE: Probe = Probe::Css("meta[name='viewport']");

pub const SCROLL_WIDTH_SCRIPT: &str =
    "return [document.documentElement.scrollWidth, window.innerWidth];";
pub const BASE_FONT_SCRIPT: &str =
    "return parseFloat(window.getComputedStyle(document.body).fontSize);";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AboveFold {
    pub h1_visible: bool,
    pub cta_visible: bool,
    pub hero_image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MobileChecks {
    pub viewport_meta: bool,
    pub horizontal_scroll: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Typography {
    /// Computed body font size in CSS pixels.
    pub base_size: Option<f64>,
    pub readable: bool,
}

/// Outcome of one visual inspection.
///
/// Fields start at their defaults and are only set by a phase that completed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VisualReport {
    pub url: String,
    pub above_fold: AboveFold,
    pub mobile: MobileChecks,
    pub fonts: Typography,
    pub error: Option<String>,
}

impl VisualReport {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            above_fold: AboveFold::default(),
            mobile: MobileChecks::default(),
            fonts: Typography::default(),
            error: None,
        }
    }

    /// A report with every flag at its default and `error` set.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        let mut report = Self::new(url);
        report.error = Some(error.into());
        report
    }
}

/// Budgets for one inspection.
#[derive(Debug, Clone, Copy)]
pub struct InspectOptions {
    /// Applies to each viewport phase separately.
    pub render_timeout: Duration,
    pub resolve_timeout: Duration,
}

impl Default for InspectOptions {
    fn default() -> Self {
        Self {
            render_timeout: Duration::from_millis(30_000),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl From<&AuditConfig> for InspectOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            render_timeout: config.render_timeout(),
            resolve_timeout: config.resolve_timeout(),
        }
    }
}

/// Inspects `url` through `renderer`.
pub async fn inspect<R: Renderer>(renderer: &R, url: &str, options: &InspectOptions) -> VisualReport {
    let mut report = VisualReport::new(url);

    let target = match resolver::resolve_with_timeout(url, options.resolve_timeout).await {
        Ok(target) => target,
        Err(e) => {
            report.error = Some(e.to_string());
            return report;
        }
    };

    let started = Instant::now();
    match bounded(options.render_timeout, desktop_phase(renderer, &target.url)).await {
        Ok(above_fold) => report.above_fold = above_fold,
        Err(e) => {
            ::log::warn!("Desktop inspection of {} failed: {}", target.url, e);
            report.error = Some(e.to_string());
            return report;
        }
    }

    match bounded(options.render_timeout, mobile_phase(renderer, &target.url)).await {
        Ok((mobile, fonts)) => {
            report.mobile = mobile;
            report.fonts = fonts;
        }
        Err(e) => {
            ::log::warn!("Mobile inspection of {} failed: {}", target.url, e);
            report.error = Some(e.to_string());
        }
    }

    ::log::debug!(
        "Visual inspection of {} finished in {:.2} seconds",
        target.url,
        started.elapsed().as_secs_f64()
    );
    report
}

async fn bounded<T>(
    timeout: Duration,
    phase: impl Future<Output = Result<T, RenderError>>,
) -> Result<T, RenderError> {
    match tokio::time::timeout(timeout, phase).await {
        Ok(result) => result,
        Err(_) => Err(RenderError::Timeout(timeout)),
    }
}

async fn desktop_phase<R: Renderer>(renderer: &R, url: &Url) -> Result<AboveFold, RenderError> {
    let viewport = &ViewportProfile::DESKTOP;
    let page = renderer.open(url, viewport).await?;
    let result = above_fold(&page, viewport.height).await;
    close_quietly(page).await;
    result
}

async fn mobile_phase<R: Renderer>(
    renderer: &R,
    url: &Url,
) -> Result<(MobileChecks, Typography), RenderError> {
    let page = renderer.open(url, &ViewportProfile::MOBILE).await?;
    let result = async {
        let mobile = mobile_checks(&page).await?;
        let fonts = typography(&page).await?;
        Ok((mobile, fonts))
    }
    .await;
    close_quietly(page).await;
    result
}

async fn close_quietly<P: PageHandle>(page: P) {
    if let Err(e) = page.close().await {
        ::log::debug!("Failed to close page: {}", e);
    }
}

async fn above_fold<P: PageHandle>(page: &P, fold: u32) -> Result<AboveFold, RenderError> {
    let h1_visible = match page.find(&H1_PROBE).await? {
        Some(h1) => h1
            .bounding_box()
            .await?
            .is_some_and(|bbox| bbox.is_above_fold(fold)),
        None => false,
    };

    Ok(AboveFold {
        h1_visible,
        cta_visible: first_cta_above_fold(page, fold).await.is_some(),
        hero_image: first_hero_image(page).await,
    })
}

/// First CTA probe whose element sits above the fold. Probe failures count
/// as "not found".
pub async fn first_cta_above_fold<P: PageHandle>(page: &P, fold: u32) -> Option<Probe> {
    for probe in CTA_PROBES {
        let above = async {
            match page.find(&probe).await? {
                Some(element) => Ok::<_, RenderError>(
                    element
                        .bounding_box()
                        .await?
                        .is_some_and(|bbox| bbox.is_above_fold(fold)),
                ),
                None => Ok(false),
            }
        }
        .await;

        match above {
            Ok(true) => {
                ::log::debug!("CTA found above the fold via {}", probe);
                return Some(probe);
            }
            Ok(false) => {}
            Err(e) => ::log::debug!("CTA probe {} failed: {}", probe, e),
        }
    }
    None
}

/// `src` of the first hero probe match that has a non-empty one.
pub async fn first_hero_image<P: PageHandle>(page: &P) -> Option<String> {
    for probe in HERO_PROBES {
        let src = async {
            match page.find(&probe).await? {
                Some(element) => element.attr("src").await,
                None => Ok(None),
            }
        }
        .await;

        match src {
            Ok(Some(src)) if !src.is_empty() => return Some(src),
            Ok(_) => {}
            Err(e) => ::log::debug!("Hero probe {} failed: {}", probe, e),
        }
    }
    None
}

async fn mobile_checks<P: PageHandle>(page: &P) -> Result<MobileChecks, RenderError> {
    let viewport_meta = page.find(&VIEWPORT_META_PROBE).await?.is_some();

    let widths = page.evaluate(SCROLL_WIDTH_SCRIPT).await?;
    let (scroll_width, inner_width) = match (
        widths.get(0).and_then(Value::as_i64),
        widths.get(1).and_then(Value::as_i64),
    ) {
        (Some(scroll), Some(inner)) => (scroll, inner),
        _ => {
            return Err(RenderError::UnexpectedValue {
                script: SCROLL_WIDTH_SCRIPT.to_string(),
                value: widths.to_string(),
            });
        }
    };

    Ok(MobileChecks {
        viewport_meta,
        horizontal_scroll: scroll_width > inner_width,
    })
}

async fn typography<P: PageHandle>(page: &P) -> Result<Typography, RenderError> {
    let value = page.evaluate(BASE_FONT_SCRIPT).await?;
    // parseFloat yields NaN for an unparseable size, which arrives as null
    let base_size = value.as_f64();
    Ok(Typography {
        base_size,
        readable: base_size.is_some_and(|size| size >= MIN_READABLE_FONT_PX),
    })
}
