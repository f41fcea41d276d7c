//! Tag listing command.

use console::style;

use crate::config::Config;
use crate::store::{DocumentStore, GodocsClient, StoreTag};

/// List the server's tags with their ids, grouped as godocs shows them.
pub async fn cmd_tags(config: &Config) -> anyhow::Result<()> {
    config.validate()?;
    let client = GodocsClient::new(&config.godocs_server)?;
    let tags = client.list_tags().await?;

    if tags.is_empty() {
        println!("{} No tags defined on {}", style("!").yellow(), client.base_url());
        return Ok(());
    }

    print_tags(&tags);
    Ok(())
}

/// Print tags sorted by group, then name.
pub(super) fn print_tags(tags: &[StoreTag]) {
    let mut sorted: Vec<&StoreTag> = tags.iter().collect();
    sorted.sort_by(|a, b| a.tag_group.cmp(&b.tag_group).then_with(|| a.name.cmp(&b.name)));

    for tag in sorted {
        let group = if tag.tag_group.is_empty() {
            String::new()
        } else {
            format!("  {}", style(&tag.tag_group).dim())
        };
        println!("  id={:<5} {}{}", tag.id, style(&tag.name).bold(), group);
    }
}
