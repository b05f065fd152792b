//! Screenshot capture and where the files may go.

use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};
use url::Url;

use crate::config::AuditConfig;
use crate::error::{PersistError, RenderError};
use crate::render::{PageHandle, Renderer};
use crate::resolver::{self, DEFAULT_RESOLVE_TIMEOUT};
use crate::viewport::ViewportProfile;

#[derive(Debug, Clone, Copy)]
pub struct CaptureOptions {
    pub full_page: bool,
    /// Covers page load, settling and the capture itself.
    pub render_timeout: Duration,
    /// Extra wait after load for lazily loaded content.
    pub settle: Duration,
    pub resolve_timeout: Duration,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            full_page: false,
            render_timeout: Duration::from_millis(30_000),
            settle: Duration::from_millis(1000),
            resolve_timeout: DEFAULT_RESOLVE_TIMEOUT,
        }
    }
}

impl From<&AuditConfig> for CaptureOptions {
    fn from(config: &AuditConfig) -> Self {
        Self {
            render_timeout: config.render_timeout(),
            resolve_timeout: config.resolve_timeout(),
            ..Self::default()
        }
    }
}

/// `<host with dots as underscores>_<viewport>.png`
pub fn file_name(url: &Url, viewport: &ViewportProfile) -> String {
    let mut host = url.host_str().unwrap_or("page").to_string();
    if let Some(port) = url.port() {
        host.push_str(&format!("_{}", port));
    }
    format!("{}_{}.png", host.replace(['.', ':'], "_"), viewport.name)
}

/// Collapses `.` and `..` without touching the filesystem
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Resolves symlinks in the deepest existing ancestor of `path` and
/// re-attaches the components that do not exist yet.
///
/// `path` must be absolute and lexically normalised.
fn resolve_existing(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        if let Ok(mut real) = existing.canonicalize() {
            real.extend(missing.iter().rev());
            return real;
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

/// Makes `dir` absolute against `cwd` and checks it lies inside one of `roots`.
///
/// Both sides of the check have symlinks resolved, so a link inside a root
/// that points elsewhere is rejected. The returned path is the resolved one.
pub fn guard_output_dir(dir: &Path, cwd: &Path, roots: &[&Path]) -> Result<PathBuf, PersistError> {
    let resolved = resolve_existing(&normalize_lexically(&cwd.join(dir)));
    let inside = roots
        .iter()
        .map(|root| resolve_existing(&normalize_lexically(root)))
        .any(|root| resolved.starts_with(root));

    if inside {
        Ok(resolved)
    } else {
        ::log::warn!("Refusing output directory {}", resolved.display());
        Err(PersistError::OutsideAllowedRoots(resolved))
    }
}

/// Checks `dir` against the working and home directories, then creates it.
pub fn prepare_output_dir(dir: &Path) -> Result<PathBuf, PersistError> {
    let cwd = std::env::current_dir().map_err(|source| PersistError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let home = dirs::home_dir();

    let mut roots = vec![cwd.as_path()];
    if let Some(home) = home.as_deref() {
        roots.push(home);
    }

    let dir = guard_output_dir(dir, &cwd, &roots)?;
    std::fs::create_dir_all(&dir).map_err(|source| PersistError::Io {
        path: dir.clone(),
        source,
    })?;
    Ok(dir)
}

/// Renders `url` at `viewport` and writes a PNG to `output`.
///
/// `output`'s directory must already have passed [`prepare_output_dir`].
pub async fn capture<R: Renderer>(
    renderer: &R,
    url: &str,
    viewport: &ViewportProfile,
    output: &Path,
    options: &CaptureOptions,
) -> Result<PathBuf, PersistError> {
    let target = resolver::resolve_with_timeout(url, options.resolve_timeout)
        .await
        .map_err(RenderError::from)?;

    let started = Instant::now();
    let png = match tokio::time::timeout(
        options.render_timeout,
        render_png(renderer, &target.url, viewport, options),
    )
    .await
    {
        Ok(result) => result?,
        Err(_) => return Err(RenderError::Timeout(options.render_timeout).into()),
    };

    tokio::fs::write(output, &png)
        .await
        .map_err(|source| PersistError::Io {
            path: output.to_path_buf(),
            source,
        })?;

    ::log::debug!(
        "Captured {} at {} to {} in {:.2} seconds",
        target.url,
        viewport.name,
        output.display(),
        started.elapsed().as_secs_f64()
    );
    Ok(output.to_path_buf())
}

async fn render_png<R: Renderer>(
    renderer: &R,
    url: &Url,
    viewport: &ViewportProfile,
    options: &CaptureOptions,
) -> Result<Vec<u8>, RenderError> {
    let page = renderer.open(url, viewport).await?;
    tokio::time::sleep(options.settle).await;
    let png = page.screenshot(options.full_page).await;
    if let Err(e) = page.close().await {
        ::log::debug!("Failed to close page: {}", e);
    }
    png
}

/// Captures each viewport into `dir`, one file per viewport. Failures are
/// returned per viewport and do not stop the rest.
pub async fn capture_viewports<R: Renderer>(
    renderer: &R,
    url: &str,
    viewports: &[&ViewportProfile],
    dir: &Path,
    options: &CaptureOptions,
) -> Vec<(&'static str, Result<PathBuf, PersistError>)> {
    let parsed = match resolver::normalize_url(url) {
        Ok(parsed) => parsed,
        Err(e) => {
            return viewports
                .iter()
                .map(|vp| (vp.name, Err(PersistError::from(RenderError::from(e.clone())))))
                .collect();
        }
    };

    let mut results = Vec::with_capacity(viewports.len());
    for viewport in viewports {
        ::log::info!("Capturing {} screenshot of {}", viewport.name, parsed);
        let output = dir.join(file_name(&parsed, viewport));
        let result = capture(renderer, url, viewport, &output, options).await;
        if let Err(e) = &result {
            ::log::warn!("{} screenshot of {} failed: {}", viewport.name, parsed, e);
        }
        results.push((viewport.name, result));
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::fixture::{FIXTURE_PNG, FixtureRenderer};
    use crate::viewport::VIEWPORTS;

    fn quick() -> CaptureOptions {
        CaptureOptions {
            settle: Duration::ZERO,
            ..CaptureOptions::default()
        }
    }

    #[test]
    fn test_file_name() {
        let url = Url::parse("https://www.example.com/pricing").unwrap();
        assert_eq!(
            file_name(&url, &ViewportProfile::MOBILE),
            "www_example_com_mobile.png"
        );

        let url = Url::parse("http://93.184.216.34:8080/").unwrap();
        assert_eq!(
            file_name(&url, &ViewportProfile::DESKTOP),
            "93_184_216_34_8080_desktop.png"
        );
    }

    #[test]
    fn test_guard_allows_nested_dirs() {
        let cwd = Path::new("/work/project");
        let home = Path::new("/home/me");
        assert_eq!(
            guard_output_dir(Path::new("screenshots"), cwd, &[cwd, home]).unwrap(),
            PathBuf::from("/work/project/screenshots")
        );
        assert_eq!(
            guard_output_dir(Path::new("/home/me/shots/./a/../b"), cwd, &[cwd, home]).unwrap(),
            PathBuf::from("/home/me/shots/b")
        );
    }

    #[test]
    fn test_guard_rejects_traversal() {
        let cwd = Path::new("/work/project");
        let home = Path::new("/home/me");
        assert!(matches!(
            guard_output_dir(Path::new("../../etc"), cwd, &[cwd, home]),
            Err(PersistError::OutsideAllowedRoots(p)) if p == Path::new("/etc")
        ));
    }

    #[test]
    fn test_guard_is_component_wise() {
        let cwd = Path::new("/work/project");
        assert!(guard_output_dir(Path::new("/work/project-evil"), cwd, &[cwd]).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_guard_rejects_symlink_out_of_root() {
        let cwd = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), cwd.path().join("shots")).unwrap();

        let result = guard_output_dir(Path::new("shots"), cwd.path(), &[cwd.path()]);
        assert!(matches!(
            result,
            Err(PersistError::OutsideAllowedRoots(p))
                if p == outside.path().canonicalize().unwrap()
        ));
        assert!(
            guard_output_dir(Path::new("shots/nested"), cwd.path(), &[cwd.path()]).is_err()
        );
    }

    #[test]
    fn test_guard_resolves_real_dirs() {
        let cwd = tempfile::tempdir().unwrap();
        std::fs::create_dir(cwd.path().join("real")).unwrap();

        let dir = guard_output_dir(Path::new("real/new/deeper"), cwd.path(), &[cwd.path()]).unwrap();
        assert_eq!(
            dir,
            cwd.path().canonicalize().unwrap().join("real/new/deeper")
        );
    }

    #[tokio::test]
    async fn test_capture_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("shot.png");
        let renderer = FixtureRenderer::new("<html><body></body></html>");

        let written = capture(
            &renderer,
            "http://93.184.216.34/",
            &ViewportProfile::TABLET,
            &output,
            &quick(),
        )
        .await
        .unwrap();

        assert_eq!(written, output);
        assert_eq!(std::fs::read(&output).unwrap(), FIXTURE_PNG);
        assert_eq!(renderer.opened(), vec!["tablet"]);
    }

    #[tokio::test]
    async fn test_capture_blocked_target() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("shot.png");
        let renderer = FixtureRenderer::new("<html></html>");

        let err = capture(
            &renderer,
            "http://192.168.1.1/",
            &ViewportProfile::DESKTOP,
            &output,
            &quick(),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, PersistError::Render(RenderError::Rejected(_))));
        assert!(!output.exists());
        assert!(renderer.opened().is_empty());
    }

    #[tokio::test]
    async fn test_capture_all_viewports() {
        let dir = tempfile::tempdir().unwrap();
        let renderer = FixtureRenderer::new("<html></html>").failing_on("laptop");
        let viewports: Vec<_> = VIEWPORTS.iter().collect();

        let results = capture_viewports(
            &renderer,
            "http://93.184.216.34/",
            &viewports,
            dir.path(),
            &quick(),
        )
        .await;

        let names: Vec<_> = results.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["desktop", "laptop", "tablet", "mobile"]);
        assert!(results[1].1.is_err());
        assert!(dir.path().join("93_184_216_34_mobile.png").exists());
        assert!(!dir.path().join("93_184_216_34_laptop.png").exists());
    }
}
