use regex::{NoExpand, Regex};
use std::{
    fs, io,
    path::{Path, PathBuf},
};

pub const DATABASE_NAME_KEY: &str = "database_name";
pub const DATABASE_ID_KEY: &str = "database_id";

const CONFIG_FILE_NAME: &str = "wrangler.toml";

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum Error {
    #[error("File {0} not found")]
    FileNotFound(String),

    #[error("D1 {key} not found in {path}")]
    MissingField { key: String, path: String },

    /// Only reachable when an escaped key exceeds the regex size limit.
    #[error("Invalid field pattern: {0}")]
    InvalidPattern(String),

    #[error("Unknown error occurred: {0}")]
    Unknown(String),
}

/// Pattern-based access to `key = "value"` assignments.
///
/// Matching is exact: case-sensitive key, single `=` surrounded by one space,
/// double-quoted value. Anything else reads as absent.
pub trait ConfigFields {
    fn extract_field(&self, key: &str) -> Result<Option<String>, Error>;

    /// Whether any line assigns `key`, in whatever spacing or quoting.
    fn has_key(&self, key: &str) -> Result<bool, Error>;

    /// Rewrites the first assignment of `key`. Content without one is
    /// returned unchanged.
    fn replace_field(&self, key: &str, value: &str) -> Result<String, Error>;

    /// Adds a `key` assignment on the line following the first `anchor`
    /// assignment, keeping its indentation and line ending.
    fn insert_field_after(&self, anchor: &str, key: &str, value: &str) -> Result<String, Error>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub content: String,
}

/// `wrangler.toml` next to this crate, independent of the working directory.
pub fn default_path() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join(CONFIG_FILE_NAME)
}

pub fn read(path: &Path) -> Result<ConfigFile, Error> {
    let content = match fs::read_to_string(path) {
        Ok(raw_contents) => Ok(raw_contents),
        Err(error) => match error.kind() {
            io::ErrorKind::NotFound => Err(Error::FileNotFound(path.display().to_string())),
            _ => Err(Error::Unknown(error.to_string())),
        },
    }?;

    return Ok(ConfigFile {
        path: path.to_path_buf(),
        content,
    });
}

impl ConfigFile {
    /// An empty name counts as missing: listing with it would match every
    /// database in the account.
    pub fn database_name(&self) -> Result<String, Error> {
        match self.extract_field(DATABASE_NAME_KEY)? {
            Some(name) if !name.is_empty() => Ok(name),
            _ => Err(Error::MissingField {
                key: DATABASE_NAME_KEY.to_string(),
                path: self.path.display().to_string(),
            }),
        }
    }

    pub fn database_id(&self) -> Result<Option<String>, Error> {
        self.extract_field(DATABASE_ID_KEY)
    }
}

impl ConfigFields for ConfigFile {
    fn extract_field(&self, key: &str) -> Result<Option<String>, Error> {
        let pattern = field_pattern(key)?;
        let value = pattern
            .captures(&self.content)
            .and_then(|captures| captures.get(1))
            .map(|value| value.as_str().to_string());

        return Ok(value);
    }

    fn has_key(&self, key: &str) -> Result<bool, Error> {
        let pattern = Regex::new(&format!(r"(?m)^[ \t]*{}[ \t]*=", regex::escape(key)))
            .map_err(|error| Error::InvalidPattern(error.to_string()))?;

        return Ok(pattern.is_match(&self.content));
    }

    fn replace_field(&self, key: &str, value: &str) -> Result<String, Error> {
        let pattern = field_pattern(key)?;
        let replacement = assignment(key, value);

        return Ok(pattern
            .replace(&self.content, NoExpand(&replacement))
            .into_owned());
    }

    fn insert_field_after(&self, anchor: &str, key: &str, value: &str) -> Result<String, Error> {
        let pattern = field_pattern(anchor)?;
        let found = match pattern.find(&self.content) {
            Some(found) => found,
            None => return Ok(self.content.clone()),
        };

        let line_start = self.content[..found.start()]
            .rfind('\n')
            .map_or(0, |index| index + 1);
        let indent: String = self.content[line_start..]
            .chars()
            .take_while(|c| *c == ' ' || *c == '\t')
            .collect();
        let line = format!("{}{}", indent, assignment(key, value));

        let mut updated = self.content.clone();
        match self.content[found.end()..].find('\n') {
            Some(offset) => {
                let newline_at = found.end() + offset;
                let line_ending = if self.content[..newline_at].ends_with('\r') {
                    "\r\n"
                } else {
                    "\n"
                };
                updated.insert_str(newline_at + 1, &format!("{}{}", line, line_ending));
            }
            None => {
                updated.push('\n');
                updated.push_str(&line);
            }
        }

        return Ok(updated);
    }
}

fn field_pattern(key: &str) -> Result<Regex, Error> {
    Regex::new(&format!(r#"{} = "(.*)""#, regex::escape(key)))
        .map_err(|error| Error::InvalidPattern(error.to_string()))
}

fn assignment(key: &str, value: &str) -> String {
    format!(r#"{} = "{}""#, key, value)
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Write;
    use std::path::PathBuf;

    use super::read;
    use super::ConfigFields;
    use super::ConfigFile;
    use super::Error;
    use tempfile::tempdir;

    fn config(content: &str) -> ConfigFile {
        ConfigFile {
            path: PathBuf::from("wrangler.toml"),
            content: content.to_string(),
        }
    }

    #[test]
    fn file_does_not_exist() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("wrangler.toml");

        let result = read(&file_path);
        assert_eq!(true, result.is_err());
        match result.err().unwrap() {
            Error::FileNotFound(_) => {}
            _ => panic!("Expected `FileNotFound` error"),
        }
    }

    #[test]
    fn reads_the_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("wrangler.toml");

        let mut file = File::create(&file_path).unwrap();
        writeln!(file, "database_name = \"orders-db\"").unwrap();

        let config = read(&file_path).unwrap();
        assert_eq!(config.path, file_path);
        assert_eq!(config.database_name().unwrap(), "orders-db");
    }

    #[test]
    fn missing_database_name() {
        let config = config("name = \"worker\"\ndatabase_id = \"abc\"\n");

        match config.database_name().unwrap_err() {
            Error::MissingField { key, .. } => assert_eq!(key, "database_name"),
            _ => panic!("Expected `MissingField` error"),
        }
    }

    #[test]
    fn empty_database_name() {
        let config = config("database_name = \"\"\ndatabase_id = \"abc\"\n");

        match config.database_name().unwrap_err() {
            Error::MissingField { key, .. } => assert_eq!(key, "database_name"),
            _ => panic!("Expected `MissingField` error"),
        }
    }

    #[test]
    fn key_with_loose_syntax_is_detected() {
        let config = config("database_name = \"orders-db\"\n  database_id=\"old\"\n");

        assert_eq!(config.extract_field("database_id").unwrap(), None);
        assert_eq!(config.has_key("database_id").unwrap(), true);
        assert_eq!(config.has_key("binding").unwrap(), false);
    }

    #[test]
    fn missing_database_id_is_tolerated() {
        let config = config("database_name = \"orders-db\"\n");
        assert_eq!(config.database_id().unwrap(), None);
    }

    #[test]
    fn extracts_first_match_only() {
        let config = config(
            "[[d1_databases]]\nbinding = \"DB\"\ndatabase_name = \"first\"\ndatabase_id = \"one\"\n\n[[d1_databases]]\ndatabase_name = \"second\"\ndatabase_id = \"two\"\n",
        );

        assert_eq!(config.database_name().unwrap(), "first");
        assert_eq!(config.database_id().unwrap(), Some(String::from("one")));
    }

    #[test]
    fn deviating_syntax_reads_as_absent() {
        let config = config("database_name=\"a\"\nDatabase_Name = \"b\"\ndatabase_name = 'c'\n");
        assert_eq!(config.extract_field("database_name").unwrap(), None);
    }

    #[test]
    fn replaces_only_the_identifier() {
        let config = config("database_name = \"foo\"\ndatabase_id = \"old-uuid\"");

        let updated = config.replace_field("database_id", "new-uuid").unwrap();
        assert_eq!(updated, "database_name = \"foo\"\ndatabase_id = \"new-uuid\"");
    }

    #[test]
    fn replacement_value_is_literal() {
        let config = config("database_id = \"old\"\n");

        let updated = config.replace_field("database_id", "$1-${0}").unwrap();
        assert_eq!(updated, "database_id = \"$1-${0}\"\n");
    }

    #[test]
    fn replace_without_field_keeps_content() {
        let config = config("database_name = \"foo\"\n");

        let updated = config.replace_field("database_id", "new-uuid").unwrap();
        assert_eq!(updated, config.content);
    }

    #[test]
    fn inserts_after_anchor_line() {
        let config = config(
            "[[d1_databases]]\n  binding = \"DB\"\n  database_name = \"orders-db\"\n  migrations_dir = \"migrations\"\n",
        );

        let updated = config
            .insert_field_after("database_name", "database_id", "abc-123")
            .unwrap();
        assert_eq!(
            updated,
            "[[d1_databases]]\n  binding = \"DB\"\n  database_name = \"orders-db\"\n  database_id = \"abc-123\"\n  migrations_dir = \"migrations\"\n"
        );
    }

    #[test]
    fn inserts_with_crlf_line_endings() {
        let config = config("database_name = \"orders-db\"\r\nbinding = \"DB\"\r\n");

        let updated = config
            .insert_field_after("database_name", "database_id", "abc-123")
            .unwrap();
        assert_eq!(
            updated,
            "database_name = \"orders-db\"\r\ndatabase_id = \"abc-123\"\r\nbinding = \"DB\"\r\n"
        );
    }

    #[test]
    fn inserts_at_end_of_file() {
        let config = config("database_name = \"orders-db\"");

        let updated = config
            .insert_field_after("database_name", "database_id", "abc-123")
            .unwrap();
        assert_eq!(
            updated,
            "database_name = \"orders-db\"\ndatabase_id = \"abc-123\""
        );
    }
}
