use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::config::{self, ConfigFields, ConfigFile, DATABASE_ID_KEY, DATABASE_NAME_KEY};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] config::Error),

    #[error("Unable to write {path}: {reason}")]
    WriteFailed { path: String, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriteOutcome {
    pub previous_id: Option<String>,
    pub mismatch: bool,
    /// False when the file assigns the id in a form that can't be rewritten.
    pub updated: bool,
    pub content: String,
}

/// Records `database_id` in the config file, overwriting it in place.
///
/// A different id already in the file only produces a warning.
pub fn write(config_file: &ConfigFile, database_id: &str) -> Result<WriteOutcome, Error> {
    let outcome = update_content(config_file, database_id)?;

    if !outcome.updated {
        warn!(
            "{} assigns {} in an unrecognized form; set it to \"{}\" by hand",
            config_file.path.display(),
            DATABASE_ID_KEY,
            database_id
        );
        return Ok(outcome);
    }

    if outcome.mismatch {
        warn!(
            "Database ID in {} ({}) does not match the result from Cloudflare API ({})",
            config_file.path.display(),
            outcome.previous_id.as_deref().unwrap_or_default(),
            database_id
        );
    }

    write_file(&config_file.path, &outcome.content)?;
    info!(
        path = %config_file.path.display(),
        database_id = %database_id,
        "Updated database_id"
    );

    return Ok(outcome);
}

pub fn update_content(config_file: &ConfigFile, database_id: &str) -> Result<WriteOutcome, Error> {
    let previous_id = config_file.database_id()?;

    let (content, updated) = match previous_id {
        Some(_) => (config_file.replace_field(DATABASE_ID_KEY, database_id)?, true),
        None if config_file.has_key(DATABASE_ID_KEY)? => (config_file.content.clone(), false),
        None => (
            config_file.insert_field_after(DATABASE_NAME_KEY, DATABASE_ID_KEY, database_id)?,
            true,
        ),
    };
    let mismatch = previous_id
        .as_deref()
        .map_or(false, |previous| previous != database_id);

    return Ok(WriteOutcome {
        previous_id,
        mismatch,
        updated,
        content,
    });
}

fn write_file(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents).map_err(|error| Error::WriteFailed {
        path: path.display().to_string(),
        reason: error.to_string(),
    })
}
