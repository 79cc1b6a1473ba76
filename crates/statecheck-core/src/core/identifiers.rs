// crates/statecheck-core/src/core/identifiers.rs
// ============================================================================
// Module: Statecheck Identifiers
// Description: Opaque identifiers for expectations, probes, and runs.
// Purpose: Keep expectation, probe, and run names from being mixed up.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque strings that serialize transparently. Uniqueness and
//! emptiness checks happen when the rule registry loads expectations, not in
//! these wrappers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::borrow::Borrow;
use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Macro
// ============================================================================

/// Declares a transparent string identifier with display and conversions.
macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            #[doc = concat!("Wraps a string as a [`", stringify!($name), "`].")]
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrows the raw identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

string_identifier! {
    /// Expectation identifier, unique within one rule registry.
    ExpectationId
}

string_identifier! {
    /// Probe kind identifier used to route a probe reference to a registered probe.
    ProbeId
}

string_identifier! {
    /// Run identifier stamped on reports and run log events.
    RunId
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::panic,
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test fixtures use explicit asserts and unwraps for clarity."
    )]

    use std::collections::BTreeMap;

    use super::*;

    #[test]
    fn identifiers_serialize_as_bare_strings() {
        let id = ExpectationId::new("ingress-enabled");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"ingress-enabled\"");
        let parsed: ProbeId = serde_json::from_str("\"helm\"").unwrap();
        assert_eq!(parsed.as_str(), "helm");
        assert_eq!(RunId::from("run-7").to_string(), "run-7");
    }

    #[test]
    fn maps_keyed_by_identifier_accept_str_lookups() {
        let mut statuses = BTreeMap::new();
        statuses.insert(ExpectationId::new("namespace-exists"), 1);
        assert_eq!(statuses.get("namespace-exists"), Some(&1));
    }
}
