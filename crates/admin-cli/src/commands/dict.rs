use admin_client::AdminConsole;
use anyhow::{Context, Result};

use crate::cli::{DictArgs, OutputFormat};
use crate::output::print_dict_items;

pub async fn show(console: &AdminConsole, args: &DictArgs, format: OutputFormat) -> Result<()> {
    let dicts = console.dicts();
    if args.refresh {
        dicts.remove(&args.code);
    }
    tracing::debug!(code = %args.code, cached = dicts.cached(&args.code).is_some(), "Loading dictionary");
    let items = dicts
        .load_items(&args.code)
        .await
        .with_context(|| format!("Failed to load dictionary {}", args.code))?;
    print_dict_items(&args.code, &items, format);
    Ok(())
}
