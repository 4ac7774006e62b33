//! Database server flavours a datacenter can run.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Server distribution deployed by a `CassandraDatacenter`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Apache Cassandra (OSS)
    #[default]
    Cassandra,

    /// DataStax Enterprise
    Dse,
}

impl ServerType {
    /// Wire name as used in the CRD and in image configuration keys.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ServerType::Cassandra => "cassandra",
            ServerType::Dse => "dse",
        }
    }
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_type_wire_names() {
        assert_eq!(serde_json::to_value(ServerType::Dse).ok(), Some(serde_json::json!("dse")));
        let parsed: ServerType = serde_json::from_str("\"cassandra\"").expect("valid server type");
        assert_eq!(parsed, ServerType::Cassandra);
        assert!(serde_json::from_str::<ServerType>("\"scylla\"").is_err());
    }
}
