// src/commands/copy.rs

//! Single verified copy

use super::copy_settings;
use crate::cli::CopyArgs;
use anyhow::Result;
use ldrstage::{FileItem, Item, ItemCopier, StageConfig, UrlItem};
use std::path::Path;

pub fn cmd_copy(src: &str, dst: &Path, clobber: bool, copy: &CopyArgs, config: &StageConfig) -> Result<()> {
    let settings = copy_settings(config, copy)?;
    let src: Box<dyn Item> = if src.starts_with("http://") || src.starts_with("https://") {
        Box::new(UrlItem::new(src)?)
    } else {
        Box::new(FileItem::new(src))
    };
    let dst = FileItem::new(dst);

    let report = ItemCopier::with_settings(src.as_ref(), &dst, &settings)
        .clobber(clobber)
        .copy(false)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
