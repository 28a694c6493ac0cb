use std::path::Path;

use inksync_core::NoteKey;

use crate::commands::common::{open_cache, read_cached};
use crate::error::CliError;

pub async fn run_export(
    key: &NoteKey,
    output_path: Option<&Path>,
    db_path: &Path,
) -> Result<(), CliError> {
    let cache = open_cache(db_path).await?;
    let cached = read_cached(&cache, key).await?;
    let rendered = serde_json::to_string_pretty(&cached.note)?;

    if let Some(path) = output_path {
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }

    Ok(())
}
