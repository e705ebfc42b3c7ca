//! Compilation errors.
//!
//! Every error aborts the whole run. Nothing in the pipeline recovers locally
//! and no partial topology is ever handed to the emitter.

use serde::Serialize;

/// Errors raised while validating, planning or rendering a solver document
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    /// A required field is missing or has the wrong shape
    #[error("invalid solver document at `{path}`: {reason}\ncontext:\n{context}")]
    Structural {
        path: String,
        reason: String,
        context: String,
    },

    /// A cross-reference between nodes, links and interfaces does not resolve
    #[error("unresolved reference in site {site}: {message}")]
    Referential { site: String, message: String },

    #[error("unsupported solver schema version {found} (supported: {supported})")]
    UnsupportedVersion { found: String, supported: u64 },

    #[error("address pools {pool4} / {pool6} cannot supply {requested} point-to-point subnets")]
    AllocationExhausted {
        requested: usize,
        pool4: String,
        pool6: String,
    },

    /// A link violates the endpoint rules of its kind
    #[error("cannot render link {link} in site {site}: {message}")]
    Precondition {
        site: String,
        link: String,
        message: String,
    },

    #[error("bridge name {bridge} derived from both `{first}` and `{second}`")]
    BridgeCollision {
        bridge: String,
        first: String,
        second: String,
    },

    #[error("node name {name} rendered more than once")]
    DuplicateNode { name: String },
}

impl CompileError {
    /// Build a structural error, dumping `context` as pretty JSON
    pub fn structural<C>(path: impl Into<String>, reason: impl Into<String>, context: &C) -> Self
    where
        C: Serialize + ?Sized,
    {
        let context = serde_json::to_string_pretty(context)
            .unwrap_or_else(|e| format!("<context unavailable: {}>", e));
        CompileError::Structural {
            path: path.into(),
            reason: reason.into(),
            context,
        }
    }

    pub fn referential(site: impl Into<String>, message: impl Into<String>) -> Self {
        CompileError::Referential {
            site: site.into(),
            message: message.into(),
        }
    }

    pub fn precondition(
        site: impl Into<String>,
        link: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CompileError::Precondition {
            site: site.into(),
            link: link.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_structural_error_carries_context() {
        let err = CompileError::structural("sites.acme.hq.nodes", "missing field", &json!({"links": {}}));
        let text = err.to_string();
        assert!(text.contains("sites.acme.hq.nodes"));
        assert!(text.contains("\"links\""));
    }

    #[test]
    fn test_exhaustion_names_count() {
        let err = CompileError::AllocationExhausted {
            requested: 2,
            pool4: "10.0.0.0/31".to_string(),
            pool6: "fd00::/127".to_string(),
        };
        assert!(err.to_string().contains("supply 2 point-to-point"));
    }
}
