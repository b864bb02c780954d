//! Rule engine interface
//!
//! The rule engine compiles rule fragments and evaluates requests. This
//! layer only drives it: load rules, open a transaction, feed request data,
//! read back a verdict.

mod passthrough;
#[cfg(test)]
pub(crate) mod testing;

pub use passthrough::{PassthroughEngine, PassthroughRuleSet, PassthroughTransaction};

use crate::error::EngineError;

/// Allocates an engine handle. Supplied by the host adapter.
pub type EngineBuilder<E> = fn() -> E;

/// Inspection verdict
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    /// Let the request proceed
    Allow,

    /// Terminate the request
    Deny { reason: String },
}

/// Connection details handed to a new transaction
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    pub client_address: Option<String>,
    pub server_address: Option<String>,
}

/// Request data fed to the engine
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InspectedRequest {
    /// Host context id of the request stream
    pub context_id: u32,

    /// Header pairs as delivered by the host, pseudo-headers included
    pub headers: Vec<(String, String)>,
}

impl InspectedRequest {
    pub fn new(context_id: u32, headers: Vec<(String, String)>) -> Self {
        Self { context_id, headers }
    }

    /// First header value matching `name`, ignoring case
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn path(&self) -> Option<&str> {
        self.header(":path")
    }

    pub fn method(&self) -> Option<&str> {
        self.header(":method")
    }
}

/// An open inspection session
pub trait Transaction {
    /// Evaluate the accumulated request headers
    fn inspect_request_headers(&mut self, request: &InspectedRequest) -> Result<Verdict, EngineError>;
}

/// Rule engine handle
pub trait RuleEngine {
    /// Compiled rules, grown by [`RuleEngine::load_rule`]
    type RuleSet;

    /// Session bound to the engine and a rule set
    type Transaction: Transaction;

    /// Allocate an empty rule set
    fn create_rule_set(&self) -> Self::RuleSet;

    /// Compile one rule-language fragment into `rules`.
    ///
    /// Whether a failed fragment leaves partial state behind is up to the
    /// engine.
    fn load_rule(&self, rules: &mut Self::RuleSet, source: &str) -> Result<(), EngineError>;

    /// Open a transaction over `rules`
    fn create_transaction(
        &self,
        rules: &Self::RuleSet,
        connection: Option<&ConnectionInfo>,
    ) -> Result<Self::Transaction, EngineError>;

    /// Close a transaction
    fn destroy_transaction(&self, transaction: Self::Transaction) {
        drop(transaction);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> InspectedRequest {
        InspectedRequest::new(
            7,
            vec![
                (":method".to_string(), "POST".to_string()),
                (":path".to_string(), "/login".to_string()),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
        )
    }

    #[test]
    fn test_pseudo_header_accessors() {
        let req = request();
        assert_eq!(req.path(), Some("/login"));
        assert_eq!(req.method(), Some("POST"));
    }

    #[test]
    fn test_header_lookup_ignores_case() {
        let req = request();
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert_eq!(req.header("x-missing"), None);
    }
}
