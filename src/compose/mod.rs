//! The remote `docker-compose.yml`: validation, line patching and publishing.

mod patch;
mod publish;

use serde_yaml::Value;

use crate::error::{Error, Result};

pub use patch::{Patched, patch};
pub use publish::{Publisher, STAGING_SUFFIX};

/// Name of the compose document looked up beneath the server root.
pub const COMPOSE_FILE: &str = "docker-compose.yml";

/// Check the document is YAML with a top-level `services` mapping.
pub fn validate(content: &str) -> Result<()> {
    let document: Value =
        serde_yaml::from_str(content).map_err(|e| Error::parse(COMPOSE_FILE, e.to_string()))?;

    match document.get("services") {
        Some(Value::Mapping(_)) => Ok(()),
        Some(_) => Err(Error::parse(COMPOSE_FILE, "`services` is not a mapping")),
        None => Err(Error::parse(COMPOSE_FILE, "no top-level `services` key")),
    }
}
