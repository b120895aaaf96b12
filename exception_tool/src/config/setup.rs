use std::path::{Path, PathBuf};
use std::{env, fs, io};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use toml::map::Entry;
use toml::{Table, Value};

/// Layered builder for the tool configuration.
#[must_use]
pub struct Builder {
    table: Result<Table>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            table: Ok(Table::new()),
        }
    }

    /// Adds a layer. Later layers override values of earlier ones, and
    /// tables are merged key by key.
    pub fn add_layer<L: Layer>(mut self, source: L) -> Self {
        self.table = self.table.and_then(|mut t| {
            source.extend_table(&mut t)?;
            Ok(t)
        });
        self
    }

    /// Deserializes the merged layers.
    pub fn build<T>(self) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let table = self.table?;
        T::deserialize(table).context("cannot deserialize config")
    }
}

/// A configuration layer.
pub trait Layer {
    fn extend_table(&self, table: &mut Table) -> Result<()>;
}

/// A TOML file layer. Optional files that do not exist add nothing.
#[must_use]
pub struct File {
    path: PathBuf,
    required: bool,
}

impl File {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            required: true,
        }
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }
}

/// A layer of TOML text, usually the built-in defaults.
#[must_use]
pub struct TomlText<'a> {
    text: &'a str,
}

impl<'a> TomlText<'a> {
    pub fn new(text: &'a str) -> Self {
        Self { text }
    }
}

/// An environment variable layer.
///
/// Only variables starting with the prefix followed by `__` are loaded. The
/// rest of the name is lowercased and split on `__` into nested keys, so
/// `EXCEPTION_TOOL__DECRYPT__ALLOWED` sets `decrypt.allowed`.
///
/// Values are strings, except that `true` and `false` become booleans.
/// Values that are not valid UTF-8 are converted lossily.
#[must_use]
pub struct Env {
    prefix: String,
}

impl Env {
    pub fn prefixed(prefix: &str) -> Self {
        let mut prefix = prefix.to_ascii_lowercase();
        prefix.push_str("__");
        Self { prefix }
    }

    fn extend_from<I>(&self, table: &mut Table, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (mut key, value) in vars {
            key.make_ascii_lowercase();
            let Some(path) = key.strip_prefix(&self.prefix) else {
                continue;
            };

            let segments = path.split("__").collect::<SmallVec<[&str; 8]>>();
            if segments.iter().any(|s| s.is_empty()) {
                log::warn!("ignoring env variable with empty key segment: {key}");
                continue;
            }

            insert_at(table, &segments, env_value(value));
        }
    }
}

fn env_value(value: String) -> Value {
    match value.as_str() {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        _ => Value::String(value),
    }
}

impl Layer for File {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let file = match fs::read_to_string(&self.path) {
            Ok(content) => deserialize_str_to_table(&content)
                .with_context(|| format!("failed to load config {:?}", self.path))?,
            Err(why) => {
                if !self.required && why.kind() == io::ErrorKind::NotFound {
                    return Ok(());
                }

                return Err(why).context(format!("cannot read required config {:?}", self.path));
            },
        };

        merge_tables(table, file);
        Ok(())
    }
}

impl Layer for TomlText<'_> {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        let toml = deserialize_str_to_table(self.text).context("built-in config is invalid")?;
        merge_tables(table, toml);
        Ok(())
    }
}

impl Layer for Env {
    fn extend_table(&self, table: &mut Table) -> Result<()> {
        // names that aren't utf8 cannot match the prefix
        let vars = env::vars_os().filter_map(|(key, value)| {
            let key = key.into_string().ok()?;
            let value = value
                .into_string()
                .unwrap_or_else(|o| o.to_string_lossy().into_owned());
            Some((key, value))
        });

        self.extend_from(table, vars);
        Ok(())
    }
}

fn deserialize_str_to_table(text: &str) -> Result<Table> {
    toml::from_str(text).context("config toml is invalid")
}

fn merge_tables(target: &mut Table, consume: Table) {
    for (key, value) in consume {
        match target.entry(key) {
            Entry::Vacant(entry) => _ = entry.insert(value),
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Table(a), Value::Table(b)) => merge_tables(a, b),
                (a, b) => *a = b,
            },
        }
    }
}

/// Inserts `value` at the nested `path`, replacing non-table values on the way.
fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let [first, rest @ ..] = path else {
        return;
    };

    let slot = table
        .entry((*first).to_owned())
        .or_insert_with(|| Value::Table(Table::new()));

    if rest.is_empty() {
        *slot = value;
        return;
    }

    if !slot.is_table() {
        *slot = Value::Table(Table::new());
    }

    if let Value::Table(inner) = slot {
        insert_at(inner, rest, value);
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Debug, Deserialize)]
    struct Sample {
        app: SampleApp,
    }

    #[derive(Debug, Deserialize)]
    struct SampleApp {
        name: String,
        #[serde(default)]
        verbose: bool,
    }

    #[test]
    fn later_layers_win() {
        let sample: Sample = Builder::new()
            .add_layer(TomlText::new("[app]\nname = \"first\"\nverbose = true"))
            .add_layer(TomlText::new("[app]\nname = \"second\""))
            .build()
            .expect("config should build");

        assert_eq!(sample.app.name, "second");
        assert!(sample.app.verbose, "unset keys keep earlier values");
    }

    #[test]
    fn missing_optional_file() {
        let sample: Sample = Builder::new()
            .add_layer(TomlText::new("[app]\nname = \"base\""))
            .add_layer(File::new("does-not-exist.toml").required(false))
            .build()
            .expect("config should build");

        assert_eq!(sample.app.name, "base");
    }

    #[test]
    fn missing_required_file() {
        let err = Builder::new()
            .add_layer(File::new("does-not-exist.toml"))
            .build::<Sample>()
            .expect_err("required file is missing");

        assert!(format!("{err:#}").contains("does-not-exist.toml"), "{err:#}");
    }

    #[test]
    fn env_prefix_and_nesting() {
        let mut table = Table::new();
        let env = Env::prefixed("EXCEPTION_TOOL");
        env.extend_from(
            &mut table,
            [
                ("EXCEPTION_TOOL__APP__NAME".to_owned(), "from env".to_owned()),
                ("EXCEPTION_TOOL__APP__VERBOSE".to_owned(), "true".to_owned()),
                ("OTHER__APP__NAME".to_owned(), "ignored".to_owned()),
                ("EXCEPTION_TOOL__APP____BROKEN".to_owned(), "ignored".to_owned()),
            ],
        );

        let sample = Sample::deserialize(table).expect("table should deserialize");
        assert_eq!(sample.app.name, "from env");
        assert!(sample.app.verbose, "bool should be parsed");
    }

    #[test]
    fn insert_replaces_scalars() {
        let mut table: Table = toml::from_str("app = 5").expect("toml is valid");
        insert_at(&mut table, &["app", "name"], Value::String("x".to_owned()));

        let name = table
            .get("app")
            .and_then(|a| a.get("name"))
            .and_then(Value::as_str);
        assert_eq!(name, Some("x"));
    }
}
