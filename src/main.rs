//! Echobox - A desktop voice recorder for Linux
//!
//! This is the main entry point for the Echobox application.

mod app;
mod assets;
mod audio;
mod cli;
mod config;
mod library;
mod state;
mod util;
mod waveform;

use app::Echobox;
use assets::Assets;
use clap::Parser;
use gpui::prelude::*;
use gpui::*;
use log::info;

fn main() {
    // Parse command-line arguments and initialize logging
    let args = cli::Args::parse();
    cli::init_logging(&args);

    info!("Starting Echobox voice recorder");

    Application::new().with_assets(Assets).run(|cx: &mut App| {
        let bounds = Bounds::centered(None, size(px(900.0), px(600.0)), cx);
        cx.open_window(
            WindowOptions {
                window_bounds: Some(WindowBounds::Windowed(bounds)),
                // No titlebar - we'll draw our own
                titlebar: None,
                // Use client-side decorations so we can draw our own titlebar
                window_decorations: Some(WindowDecorations::Client),
                // App ID for Wayland/GNOME desktop integration
                app_id: Some("com.echobox.VoiceRecorder".to_string()),
                ..Default::default()
            },
            |window, cx| {
                window.set_app_id("com.echobox.VoiceRecorder");
                cx.new(Echobox::new)
            },
        )
        .expect("Failed to open window");
    });
}
