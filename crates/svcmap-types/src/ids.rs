//! Opaque identifiers assigned by the registry
//!
//! The registry hands these out; this crate never inspects their contents.

use serde::{Deserialize, Serialize};

macro_rules! registry_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self::new(id)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

registry_id!(
    /// Identifier of a namespace
    NamespaceId
);

registry_id!(
    /// Identifier of a service within a namespace
    ServiceId
);

registry_id!(
    /// Identifier of an instance within a service
    InstanceId
);

registry_id!(
    /// Identifier of an asynchronous registry operation
    OperationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_string() {
        let id = ServiceId::new("srv-123");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"srv-123\"");
        assert_eq!(id.to_string(), "srv-123");
    }
}
