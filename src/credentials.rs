use validator::Validate;

pub const API_KEY_VAR: &str = "CLOUDFLARE_API_KEY";
pub const ACCOUNT_ID_VAR: &str = "CLOUDFLARE_ACCOUNT_ID";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("{0} is not set")]
    MissingVariable(&'static str),
}

#[derive(Debug, Validate)]
pub struct Credentials {
    #[validate(length(min = 1))]
    pub api_key: String,

    #[validate(length(min = 1))]
    pub account_id: String,
}

impl Credentials {
    /// Builds credentials from an arbitrary variable source. Unset and empty
    /// values are both rejected, the API key before the account id.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let credentials = Credentials {
            api_key: lookup(API_KEY_VAR).unwrap_or_default(),
            account_id: lookup(ACCOUNT_ID_VAR).unwrap_or_default(),
        };

        if let Err(errors) = credentials.validate() {
            let field_errors = errors.field_errors();
            for (field, variable) in [("api_key", API_KEY_VAR), ("account_id", ACCOUNT_ID_VAR)] {
                if field_errors.keys().any(|key| *key == field) {
                    return Err(Error::MissingVariable(variable));
                }
            }
        }

        return Ok(credentials);
    }
}
