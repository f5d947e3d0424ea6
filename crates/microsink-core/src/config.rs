//! Sink configuration from environment variables.

use anyhow::{anyhow, Context, Result};

use crate::schema::SchemaMatch;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkConfig {
    /// Policy for the output schema check done on every batch.
    pub schema_match: SchemaMatch,
}

impl SinkConfig {
    pub fn from_env() -> Result<Self> {
        let schema_match = match std::env::var("MICROSINK_SCHEMA_MATCH") {
            Ok(raw) => raw
                .parse::<SchemaMatch>()
                .map_err(|e| anyhow!(e))
                .context("Invalid MICROSINK_SCHEMA_MATCH")?,
            Err(_) => SchemaMatch::default(),
        };
        Ok(Self { schema_match })
    }
}
