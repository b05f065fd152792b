use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "page-audit")]
#[command(about = "On-page SEO audit: metadata, structured data and layout checks")]
#[command(version)]
pub struct Args {
    /// JSON configuration file (timeouts, WebDriver URL, rule tables)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch a page and print its body
    Fetch {
        url: String,

        /// Write the body to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Request timeout in seconds
        #[arg(short, long)]
        timeout: Option<u64>,

        /// Don't follow redirects
        #[arg(long)]
        no_redirects: bool,

        /// Print the whole response as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Extract SEO metadata from an HTML file (stdin when omitted)
    Parse {
        file: Option<PathBuf>,

        /// Base URL for resolving and classifying links
        #[arg(short, long)]
        url: Option<String>,

        #[arg(short, long)]
        json: bool,
    },

    /// Validate the JSON-LD blocks found in a file
    Schema {
        file: PathBuf,

        #[arg(short, long)]
        json: bool,
    },

    /// Render a page and check above-the-fold, mobile and typography heuristics
    Visual {
        url: String,

        /// Page load timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,

        #[arg(short, long)]
        json: bool,
    },

    /// Capture page screenshots
    Screenshot {
        url: String,

        /// Output directory
        #[arg(short, long, default_value = "screenshots")]
        output: PathBuf,

        /// Viewport preset (desktop, laptop, tablet, mobile)
        #[arg(short, long, default_value = "desktop")]
        viewport: String,

        /// Capture all viewports
        #[arg(short, long)]
        all: bool,

        /// Capture the full page instead of the viewport
        #[arg(short, long)]
        full: bool,

        /// Page load timeout in milliseconds
        #[arg(short, long)]
        timeout: Option<u64>,
    },

    /// Fetch, extract, validate and (optionally) render a page
    Audit {
        url: String,

        /// Also run the visual inspection through WebDriver
        #[arg(long)]
        visual: bool,

        #[arg(short, long)]
        json: bool,
    },

    /// Post-edit check: exit 0 clean, 1 warnings, 2 blocking
    Hook { file: Option<PathBuf> },
}
