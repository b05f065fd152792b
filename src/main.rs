use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::Read;
use std::process::ExitCode;

use page_audit::fetch::{self, FetchOptions};
use page_audit::render::WebDriverRenderer;
use page_audit::screenshot::{self, CaptureOptions};
use page_audit::viewport::{VIEWPORTS, ViewportProfile};
use page_audit::visual::{self, InspectOptions};
use page_audit::{Audit, AuditConfig, hook, report, resolver, schema};

mod args;
use args::{Args, Command};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            ::log::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(args: &Args) -> Result<AuditConfig> {
    let config = match &args.config {
        Some(path) => AuditConfig::from_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AuditConfig::default(),
    };
    Ok(config.with_env_overrides())
}

async fn run(args: Args) -> Result<ExitCode> {
    let mut config = load_config(&args)?;

    match args.command {
        Command::Fetch {
            url,
            output,
            timeout,
            no_redirects,
            json,
        } => {
            if let Some(timeout) = timeout {
                config.fetch_timeout_secs = timeout;
            }
            config.follow_redirects = !no_redirects;

            let page = fetch::fetch_url(&url, &FetchOptions::from(&config)).await?;
            if json {
                println!("{}", report::to_json(&page)?);
                return Ok(ExitCode::SUCCESS);
            }

            match output {
                Some(path) => {
                    std::fs::write(&path, &page.body)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Saved to {}", path.display());
                }
                None => println!("{}", page.body),
            }
            eprint!("\n{}", report::fetch_text(&page));
        }

        Command::Parse { file, url, json } => {
            let html = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("File not found: {}", path.display()))?,
                None => {
                    let mut html = String::new();
                    std::io::stdin()
                        .read_to_string(&mut html)
                        .context("reading stdin")?;
                    html
                }
            };
            let base_url = url.as_deref().map(resolver::normalize_url).transpose()?;

            let summary = page_audit::extract(&html, base_url.as_ref());
            if json {
                println!("{}", report::to_json(&summary)?);
            } else {
                print!("{}", report::summary_text(&summary));
            }
        }

        Command::Schema { file, json } => {
            let bytes =
                std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
            let findings = schema::validate_source(&String::from_utf8_lossy(&bytes), &config.rules);
            if json {
                println!("{}", report::to_json(&findings)?);
            } else if findings.is_empty() {
                println!("No schema issues found");
            } else {
                print!("{}", report::findings_text(&findings));
            }
        }

        Command::Visual { url, timeout, json } => {
            if let Some(timeout) = timeout {
                config.render_timeout_ms = timeout;
            }
            let renderer = WebDriverRenderer::from_config(&config);
            let result = visual::inspect(&renderer, &url, &InspectOptions::from(&config)).await;
            if json {
                println!("{}", report::to_json(&result)?);
            } else {
                print!("{}", report::visual_text(&result));
            }
        }

        Command::Screenshot {
            url,
            output,
            viewport,
            all,
            full,
            timeout,
        } => {
            if let Some(timeout) = timeout {
                config.render_timeout_ms = timeout;
            }
            let viewports: Vec<&ViewportProfile> = if all {
                VIEWPORTS.iter().collect()
            } else {
                vec![ViewportProfile::by_name(&viewport)?]
            };

            let dir = screenshot::prepare_output_dir(&output)?;
            let options = CaptureOptions {
                full_page: full,
                ..CaptureOptions::from(&config)
            };
            let renderer = WebDriverRenderer::from_config(&config);

            let mut failed = 0;
            for (name, result) in
                screenshot::capture_viewports(&renderer, &url, &viewports, &dir, &options).await
            {
                match result {
                    Ok(path) => println!("  ✓ {} saved to {}", name, path.display()),
                    Err(e) => {
                        failed += 1;
                        println!("  ✗ {} failed: {}", name, e);
                    }
                }
            }
            if failed == viewports.len() {
                bail!("no screenshots captured");
            }
        }

        Command::Audit { url, visual, json } => {
            let result = Audit::new(&url)
                .with_config(config)
                .with_visual(visual)
                .run()
                .await?;
            if json {
                println!("{}", report::to_json(&result)?);
            } else {
                print!("{}", report::audit_text(&result));
            }
        }

        Command::Hook { file } => {
            let Some(file) = file else {
                return Ok(ExitCode::SUCCESS);
            };
            let outcome = hook::check_file(&file, &config.rules);
            print!("{}", report::hook_text(&outcome));
            return Ok(ExitCode::from(outcome.exit_code() as u8));
        }
    }

    Ok(ExitCode::SUCCESS)
}
