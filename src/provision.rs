use std::path::Path;

use tracing::info;

use crate::config;
use crate::credentials::{self, Credentials};
use crate::provider::{self, DatabaseProvider};
use crate::resolver::{self, Database};
use crate::writer;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Credentials(#[from] credentials::Error),

    #[error(transparent)]
    Config(#[from] config::Error),

    #[error(transparent)]
    Provider(#[from] provider::Error),

    #[error(transparent)]
    Resolve(#[from] resolver::Error),

    #[error(transparent)]
    Write(#[from] writer::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing environment variable, config file or required field.
    Configuration,
    /// The Cloudflare API call failed.
    Provider,
    /// The API answered with something that breaks its own contract.
    Logic,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Credentials(_) | Error::Config(_) | Error::Write(_) => {
                ErrorKind::Configuration
            }
            Error::Provider(_) | Error::Resolve(resolver::Error::Provider(_)) => {
                ErrorKind::Provider
            }
            Error::Resolve(resolver::Error::MissingIdentifier(_)) => ErrorKind::Logic,
        }
    }
}

/// Loads credentials, connects to the provider and provisions the database
/// named in `config_path`. The provider is only built once both credentials
/// are present.
pub async fn run<L, C, P>(lookup: L, config_path: &Path, connect: C) -> Result<Database, Error>
where
    L: Fn(&str) -> Option<String>,
    C: FnOnce(&Credentials) -> Result<P, provider::Error>,
    P: DatabaseProvider,
{
    let credentials = Credentials::from_lookup(lookup)?;
    let provider = connect(&credentials)?;

    provision(&provider, &credentials.account_id, config_path).await
}

pub async fn provision<P>(
    provider: &P,
    account_id: &str,
    config_path: &Path,
) -> Result<Database, Error>
where
    P: DatabaseProvider + ?Sized,
{
    let config_file = config::read(config_path)?;
    let name = config_file.database_name()?;
    info!(path = %config_file.path.display(), name = %name, "Read config file");

    let database = resolver::find_or_create(provider, account_id, &name).await?;
    writer::write(&config_file, &database.uuid)?;

    return Ok(database);
}
