//! Passthrough engine
//!
//! Default engine for the Envoy filter. Keeps rule fragments in load order
//! without interpreting them; every transaction allows every request.

use super::{ConnectionInfo, InspectedRequest, RuleEngine, Transaction, Verdict};
use crate::error::EngineError;

/// Engine that accepts rules but never denies
#[derive(Debug, Default)]
pub struct PassthroughEngine;

impl PassthroughEngine {
    pub fn new() -> Self {
        Self
    }
}

/// Rule fragments in load order
#[derive(Debug, Default, Clone)]
pub struct PassthroughRuleSet {
    fragments: Vec<String>,
}

impl PassthroughRuleSet {
    pub fn fragments(&self) -> &[String] {
        &self.fragments
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }
}

/// Transaction over a passthrough rule set
#[derive(Debug)]
pub struct PassthroughTransaction {
    rule_count: usize,
    connection: Option<ConnectionInfo>,
}

impl PassthroughTransaction {
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    pub fn connection(&self) -> Option<&ConnectionInfo> {
        self.connection.as_ref()
    }
}

impl Transaction for PassthroughTransaction {
    fn inspect_request_headers(&mut self, request: &InspectedRequest) -> Result<Verdict, EngineError> {
        let (client, server) = match &self.connection {
            Some(conn) => (
                conn.client_address.as_deref().unwrap_or("-"),
                conn.server_address.as_deref().unwrap_or("-"),
            ),
            None => ("-", "-"),
        };
        log::debug!(
            "passthrough inspection of {} headers against {} rules ({} -> {})",
            request.headers.len(),
            self.rule_count,
            client,
            server
        );
        Ok(Verdict::Allow)
    }
}

impl RuleEngine for PassthroughEngine {
    type RuleSet = PassthroughRuleSet;
    type Transaction = PassthroughTransaction;

    fn create_rule_set(&self) -> PassthroughRuleSet {
        PassthroughRuleSet::default()
    }

    fn load_rule(&self, rules: &mut PassthroughRuleSet, source: &str) -> Result<(), EngineError> {
        if source.trim().is_empty() {
            return Err(EngineError::RuleLoad {
                index: rules.fragments.len(),
                reason: "empty rule fragment".to_string(),
            });
        }
        rules.fragments.push(source.to_string());
        Ok(())
    }

    fn create_transaction(
        &self,
        rules: &PassthroughRuleSet,
        connection: Option<&ConnectionInfo>,
    ) -> Result<PassthroughTransaction, EngineError> {
        Ok(PassthroughTransaction {
            rule_count: rules.len(),
            connection: connection.cloned(),
        })
    }
}
