use tracing::info;

use crate::provider::{self, DatabaseProvider, DatabaseRecord};

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Provider(#[from] provider::Error),

    #[error("Database {0} found but no uuid found. Cannot continue")]
    MissingIdentifier(String),
}

/// A database whose identifier is known.
#[derive(Debug, Clone, PartialEq)]
pub struct Database {
    pub name: String,
    pub uuid: String,
}

/// Returns the first database listed under `name`, creating one when the
/// account has none.
///
/// Nothing guards the gap between the list and the create call: two runs
/// racing on the same name can both create a database.
pub async fn find_or_create<P>(
    provider: &P,
    account_id: &str,
    name: &str,
) -> Result<Database, Error>
where
    P: DatabaseProvider + ?Sized,
{
    info!(name = %name, "Looking for database");

    let record = match find(provider, account_id, name).await? {
        Some(record) => {
            info!(name = %record.name, uuid = ?record.uuid, "Database found");
            record
        }
        None => {
            info!(name = %name, "Database not found, creating...");
            let record = provider.create(account_id, name).await?;
            info!(name = %record.name, uuid = ?record.uuid, "Database created");
            record
        }
    };

    match record.uuid {
        Some(uuid) if !uuid.is_empty() => Ok(Database {
            name: record.name,
            uuid,
        }),
        _ => Err(Error::MissingIdentifier(name.to_string())),
    }
}

async fn find<P>(
    provider: &P,
    account_id: &str,
    name: &str,
) -> Result<Option<DatabaseRecord>, Error>
where
    P: DatabaseProvider + ?Sized,
{
    let databases = provider.list(account_id, name).await?;
    return Ok(databases.into_iter().next());
}
