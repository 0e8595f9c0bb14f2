// SPDX-License-Identifier: MIT OR Apache-2.0
//! Showcase - staged playback of the decompilation service page
//!
//! A terminal rendition of the promo page featuring:
//! - The decompilation demo with its sample picker and run control
//! - Viewport-gated stat counters
//! - A control-flow graph revealed block by block
//! - The live analysis feed
//! - A scripted reader that scrolls and clicks through the page
//!
//! ## Architecture
//!
//! All sections run on the playback engine in `showcase_playback`, driven by
//! a tokio-backed clock on a current-thread `LocalSet` and a scroll-geometry
//! viewport. Frames go to stdout, logs to stderr.

mod app;
mod content;
mod host;
mod page;
mod render;
mod settings;
mod tour;
mod viewport;

use app::ShowcaseApp;
use settings::ShowcaseSettings;
use std::ffi::OsStr;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn main() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("showcase_app=info,showcase_playback=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting showcase v{}", env!("CARGO_PKG_VERSION"));

    let arg = std::env::args_os().nth(1);
    if arg.as_deref() == Some(OsStr::new("--print-settings")) {
        match ShowcaseSettings::default().to_ron() {
            Ok(text) => println!("{text}"),
            Err(e) => {
                tracing::error!("Failed to serialize settings: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    let path = arg.map(PathBuf::from);
    let settings = match ShowcaseSettings::load_or_default(path.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Invalid settings: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = ShowcaseApp::new(settings).run() {
        tracing::error!("Showcase stopped: {e}");
        std::process::exit(1);
    }
}
