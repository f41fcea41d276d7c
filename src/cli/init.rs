//! Initialize command.

use std::path::Path;

use console::style;

use crate::config::Config;

/// Write an example config file.
pub fn cmd_init(path: &Path) -> anyhow::Result<()> {
    Config::write_example(path)?;

    println!("{} Wrote {}", style("✓").green(), path.display());
    println!("  Set godocs_server, then map shortcut keys to tag ids");
    println!("  Run `docinbox tags` to see the tag ids on your server");
    Ok(())
}
