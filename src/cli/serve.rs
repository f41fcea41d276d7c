//! Web server command.

use std::sync::Arc;

use console::style;

use crate::config::{resolve_shortcuts, warn_reserved_keys, Config, ConfigError, Settings};
use crate::ocr::TesseractExtractor;
use crate::server::AppState;
use crate::store::{DocumentStore, GodocsClient};

/// Validate the config against the server and start the web server.
pub async fn cmd_serve(config: Config, addr: Option<String>) -> anyhow::Result<()> {
    config.validate()?;
    let mut settings = Settings::from_config(&config);
    if let Some(addr) = addr {
        settings.addr = addr;
    }

    let client = GodocsClient::new(&settings.godocs_server)?;
    let server_tags = match client.list_tags().await {
        Ok(tags) => tags,
        Err(e) => {
            eprintln!(
                "  {} Cannot reach godocs at {}: {}",
                style("✗").red(),
                settings.godocs_server,
                e
            );
            return Err(e.into());
        }
    };
    println!(
        "{} Connected to godocs at {} ({} tags available)",
        style("✓").green(),
        settings.godocs_server,
        server_tags.len()
    );

    if let Err(e) = resolve_shortcuts(&mut settings.shortcuts, &server_tags) {
        eprintln!("  {} {}", style("✗").red(), e);
        if matches!(e, ConfigError::UnknownTag { .. }) {
            eprintln!("  Available tags:");
            super::tags::print_tags(&server_tags);
        }
        return Err(e.into());
    }
    warn_reserved_keys(&settings.shortcuts);

    if let Some(hint) = TesseractExtractor::availability_hint() {
        println!("{} {}", style("!").yellow(), hint);
    }

    let store: Arc<dyn DocumentStore> = Arc::new(client);
    let state = AppState::with_store(&settings, store).await?;

    println!(
        "{} Starting docinbox at http://{}",
        style("→").cyan(),
        settings.addr
    );
    println!("  {} shortcuts configured", settings.shortcuts.len());
    println!("  Previews cached in {}", settings.thumb_dir.display());
    println!("  Press Ctrl+C to stop");

    crate::server::serve(state, &settings.addr).await
}
