//! Client configuration.

use std::collections::HashMap;
use std::time::Duration;

use dynawire_model::TableSchema;

/// Default endpoint, a local DynamoDB-compatible server.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

/// Default signing region.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Endpoint the HTTP transport posts to.
    pub endpoint_url: String,
    /// Region used in the SigV4 credential scope.
    pub region: String,
    /// Per-call timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Whether the HTTP transport checks the `x-amz-crc32` response header.
    pub verify_crc32: bool,
    /// Known table schemas, by table name, for schema-aware validation.
    pub table_schemas: HashMap<String, TableSchema>,
}

impl ClientConfig {
    /// Create configuration from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `DYNAMODB_ENDPOINT_URL` | `http://localhost:8000` |
    /// | `AWS_REGION`, then `DEFAULT_REGION` | `us-east-1` |
    /// | `DYNAMODB_TIMEOUT_MS` | no timeout |
    /// | `DYNAMODB_VERIFY_CRC32` | `true` |
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`ClientConfig::from_env`] with a custom variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let timeout = var("DYNAMODB_TIMEOUT_MS").and_then(|raw| match raw.parse::<u64>() {
            Ok(0) => None,
            Ok(ms) => Some(Duration::from_millis(ms)),
            Err(_) => {
                tracing::warn!(value = %raw, "ignoring unparseable DYNAMODB_TIMEOUT_MS");
                None
            }
        });

        Self {
            endpoint_url: var("DYNAMODB_ENDPOINT_URL")
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            region: var("AWS_REGION")
                .or_else(|| var("DEFAULT_REGION"))
                .unwrap_or_else(|| DEFAULT_REGION.to_owned()),
            timeout,
            verify_crc32: var("DYNAMODB_VERIFY_CRC32").is_none_or(|v| parse_bool(&v)),
            table_schemas: HashMap::new(),
        }
    }

    /// Register a table schema for local key validation.
    ///
    /// Schema-dependent checks only run for registered tables: key shape,
    /// key attributes in updates, Query key conditions against the index
    /// schema, and `ConsistentRead` on global secondary indexes. Requests
    /// against unregistered tables skip them and rely on the server.
    #[must_use]
    pub fn with_table_schema(mut self, schema: TableSchema) -> Self {
        self.table_schemas.insert(schema.table_name.clone(), schema);
        self
    }

    /// Set the per-call timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint_url: DEFAULT_ENDPOINT.to_owned(),
            region: DEFAULT_REGION.to_owned(),
            timeout: None,
            verify_crc32: true,
            table_schemas: HashMap::new(),
        }
    }
}

fn parse_bool(value: &str) -> bool {
    matches!(value, "1" | "true" | "yes" | "TRUE" | "YES")
}

#[cfg(test)]
mod tests {
    use dynawire_model::KeySchema;

    use super::*;

    fn lookup(vars: &'static [(&'static str, &'static str)]) -> impl Fn(&str) -> Option<String> {
        move |name| {
            vars.iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| (*v).to_owned())
        }
    }

    #[test]
    fn test_should_use_defaults_without_environment() {
        let config = ClientConfig::from_lookup(|_| None);
        assert_eq!(config.endpoint_url, DEFAULT_ENDPOINT);
        assert_eq!(config.region, DEFAULT_REGION);
        assert_eq!(config.timeout, None);
        assert!(config.verify_crc32);
    }

    #[test]
    fn test_should_read_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("DYNAMODB_ENDPOINT_URL", "http://dynamo:4566"),
            ("DEFAULT_REGION", "eu-west-1"),
            ("DYNAMODB_TIMEOUT_MS", "2500"),
            ("DYNAMODB_VERIFY_CRC32", "false"),
        ]));
        assert_eq!(config.endpoint_url, "http://dynamo:4566");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.timeout, Some(Duration::from_millis(2500)));
        assert!(!config.verify_crc32);
    }

    #[test]
    fn test_should_prefer_aws_region_over_default_region() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("AWS_REGION", "ap-south-1"),
            ("DEFAULT_REGION", "eu-west-1"),
        ]));
        assert_eq!(config.region, "ap-south-1");
    }

    #[test]
    fn test_should_ignore_bad_timeout() {
        let config = ClientConfig::from_lookup(lookup(&[("DYNAMODB_TIMEOUT_MS", "soon")]));
        assert_eq!(config.timeout, None);
    }

    #[test]
    fn test_should_register_table_schema() {
        let config = ClientConfig::default()
            .with_table_schema(TableSchema::new("users", KeySchema::hash_only("id")));
        assert!(config.table_schemas.contains_key("users"));
    }
}
