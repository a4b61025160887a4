use crate::domain::connection::ConnectionArgs;
use crate::domain::field::FieldMap;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;

/// Number of objects paginated over when a pagination flag is given without `--count`
pub const DEFAULT_CONNECTION_SIZE: usize = 10;

/// Fixture factory - build mock objects from declarative factory definitions
#[derive(Parser, Debug, Clone)]
#[command(name = "fabricator", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, env = "FABRICATOR_CONFIG", default_value = "fabricator.toml")]
    pub config: PathBuf,

    /// Name of the factory to build with
    pub factory: String,

    /// Build a list of this many objects
    #[arg(short = 'n', long)]
    pub count: Option<usize>,

    /// Trait to apply (repeatable, later traits win)
    #[arg(short, long = "trait", value_name = "NAME")]
    pub traits: Vec<String>,

    /// Override a field: `name=JSON` (non-JSON values are taken as strings)
    #[arg(short, long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
    pub set: Vec<(String, Value)>,

    /// Pagination: return the first N edges
    #[arg(long)]
    pub first: Option<usize>,

    /// Pagination: cursor to start after
    #[arg(long)]
    pub after: Option<String>,

    /// Pagination: return the last N edges
    #[arg(long)]
    pub last: Option<usize>,

    /// Pagination: cursor to end before
    #[arg(long)]
    pub before: Option<String>,
}

impl Cli {
    /// Field overrides from `--set`, in the order given
    pub fn inputs(&self) -> FieldMap {
        self.set
            .iter()
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect()
    }

    /// Connection arguments, if any pagination flag is present
    pub fn connection_args(&self) -> Option<ConnectionArgs> {
        let args = ConnectionArgs {
            first: self.first,
            after: self.after.clone(),
            last: self.last,
            before: self.before.clone(),
        };
        if args.is_empty() {
            None
        } else {
            Some(args)
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{}`", raw))?;
    if name.is_empty() {
        return Err(format!("missing field name in `{}`", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((name.to_string(), value))
}
