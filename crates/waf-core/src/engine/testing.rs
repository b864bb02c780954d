//! Recording engine for unit tests
//!
//! Rule fragments understood by the mock:
//! - `fail...` is rejected at load time
//! - `deny:<needle>` denies requests whose path contains `<needle>`
//! - `error` makes inspection fail
//!
//! Anything else loads and matches nothing.

use super::{ConnectionInfo, InspectedRequest, RuleEngine, Transaction, Verdict};
use crate::error::EngineError;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Debug, Default)]
pub(crate) struct MockState {
    pub load_calls: RefCell<Vec<String>>,
    pub live: Cell<usize>,
    pub created: Cell<usize>,
    pub destroyed: Cell<usize>,
    pub fail_transactions: Cell<bool>,
}

#[derive(Debug, Default)]
pub(crate) struct MockEngine {
    pub state: Rc<MockState>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_calls(&self) -> Vec<String> {
        self.state.load_calls.borrow().clone()
    }

    pub fn live_transactions(&self) -> usize {
        self.state.live.get()
    }
}

#[derive(Debug)]
pub(crate) struct MockTransaction {
    pub id: usize,
    rules: Vec<String>,
    state: Rc<MockState>,
}

impl Drop for MockTransaction {
    fn drop(&mut self) {
        self.state.live.set(self.state.live.get() - 1);
    }
}

impl Transaction for MockTransaction {
    fn inspect_request_headers(&mut self, request: &InspectedRequest) -> Result<Verdict, EngineError> {
        let path = request.path().unwrap_or_default();
        for rule in &self.rules {
            if rule == "error" {
                return Err(EngineError::Inspection("scripted failure".to_string()));
            }
            if let Some(needle) = rule.strip_prefix("deny:") {
                if path.contains(needle) {
                    return Ok(Verdict::Deny { reason: rule.clone() });
                }
            }
        }
        Ok(Verdict::Allow)
    }
}

impl RuleEngine for MockEngine {
    type RuleSet = Vec<String>;
    type Transaction = MockTransaction;

    fn create_rule_set(&self) -> Vec<String> {
        Vec::new()
    }

    fn load_rule(&self, rules: &mut Vec<String>, source: &str) -> Result<(), EngineError> {
        self.state.load_calls.borrow_mut().push(source.to_string());
        if source.starts_with("fail") {
            return Err(EngineError::RuleLoad {
                index: rules.len(),
                reason: format!("rejected {}", source),
            });
        }
        rules.push(source.to_string());
        Ok(())
    }

    fn create_transaction(
        &self,
        rules: &Vec<String>,
        _connection: Option<&ConnectionInfo>,
    ) -> Result<MockTransaction, EngineError> {
        if self.state.fail_transactions.get() {
            return Err(EngineError::Transaction("scripted failure".to_string()));
        }
        let id = self.state.created.get() + 1;
        self.state.created.set(id);
        self.state.live.set(self.state.live.get() + 1);
        Ok(MockTransaction {
            id,
            rules: rules.clone(),
            state: Rc::clone(&self.state),
        })
    }

    fn destroy_transaction(&self, transaction: MockTransaction) {
        self.state.destroyed.set(self.state.destroyed.get() + 1);
        drop(transaction);
    }
}
