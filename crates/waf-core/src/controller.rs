//! Plugin-wide controller
//!
//! Owns the engine handle, the loaded rule set, the active configuration and
//! the single live transaction. Each configure event fully supersedes the
//! previous configuration.

use crate::config::{FailureMode, ReloadPolicy, WafConfig};
use crate::engine::{EngineBuilder, InspectedRequest, RuleEngine, Transaction, Verdict};
use crate::error::{EngineError, Result, WafError};
use crate::request::FilterAction;

/// Reconfiguration state
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No configuration applied yet
    Unconfigured,
    /// Configured with inspection off
    Disabled,
    /// Configured with a live transaction
    Enabled,
}

/// Engine handle and the rule set compiled into it
struct EngineRuntime<E: RuleEngine> {
    engine: E,
    rules: E::RuleSet,
}

/// Plugin-wide controller
pub struct WafController<E: RuleEngine> {
    builder: EngineBuilder<E>,
    runtime: Option<EngineRuntime<E>>,
    config: Option<WafConfig>,
    transaction: Option<E::Transaction>,
    state: ControllerState,
}

impl<E: RuleEngine> WafController<E> {
    pub fn new(builder: EngineBuilder<E>) -> Self {
        Self {
            builder,
            runtime: None,
            config: None,
            transaction: None,
            state: ControllerState::Unconfigured,
        }
    }

    /// Allocate the engine handle and an empty rule set
    pub fn on_start(&mut self) -> bool {
        if self.runtime.is_some() {
            log::info!("waf controller already started");
            return true;
        }

        let engine = (self.builder)();
        let rules = engine.create_rule_set();
        self.runtime = Some(EngineRuntime { engine, rules });
        log::info!("waf controller started");
        true
    }

    /// Host-facing configure hook. Returns `false` when the configuration
    /// was rejected.
    pub fn on_configure(&mut self, payload: Option<&[u8]>) -> bool {
        match self.configure(payload) {
            Ok(()) => true,
            Err(e) => {
                log::error!("waf filter configuration failed: {}", e);
                false
            }
        }
    }

    /// Decode `payload` and apply it.
    ///
    /// A decode failure leaves config, rule set and transaction untouched.
    pub fn configure(&mut self, payload: Option<&[u8]>) -> Result<()> {
        if self.runtime.is_none() {
            return Err(WafError::NotStarted);
        }

        let config = WafConfig::from_payload(payload)?;

        if config.disable {
            self.retire_transaction();
            self.config = Some(config);
            self.state = ControllerState::Disabled;
            log::info!("waf filter disabled");
            return Ok(());
        }

        self.load_rules(&config)?;
        self.retire_transaction();

        let runtime = self.runtime.as_ref().ok_or(WafError::NotStarted)?;
        match runtime.engine.create_transaction(&runtime.rules, None) {
            Ok(transaction) => {
                self.transaction = Some(transaction);
                log::info!(
                    "waf filter enabled: {} rules loaded, failure mode {:?}",
                    config.rules.len(),
                    config.failure_mode
                );
                self.config = Some(config);
                self.state = ControllerState::Enabled;
                Ok(())
            }
            Err(e) => {
                self.config = Some(WafConfig { disable: true, ..config });
                self.state = ControllerState::Disabled;
                Err(e.into())
            }
        }
    }

    fn load_rules(&mut self, config: &WafConfig) -> Result<()> {
        let runtime = self.runtime.as_mut().ok_or(WafError::NotStarted)?;
        match config.reload_policy {
            ReloadPolicy::Accumulate => {
                load_all(&runtime.engine, &mut runtime.rules, &config.rules)?;
            }
            ReloadPolicy::Rebuild => {
                let mut fresh = runtime.engine.create_rule_set();
                load_all(&runtime.engine, &mut fresh, &config.rules)?;
                runtime.rules = fresh;
            }
        }
        Ok(())
    }

    fn retire_transaction(&mut self) {
        if let Some(transaction) = self.transaction.take() {
            match &self.runtime {
                Some(runtime) => runtime.engine.destroy_transaction(transaction),
                None => drop(transaction),
            }
        }
    }

    /// Verdict lookup for one request.
    ///
    /// No transaction means inspection is off and the request continues.
    /// Engine faults resolve through the configured failure mode.
    pub fn inspect(&mut self, request: &InspectedRequest) -> FilterAction {
        let failure_mode = self.failure_mode();
        let transaction = match self.transaction.as_mut() {
            Some(transaction) => transaction,
            None => return FilterAction::Continue,
        };

        match transaction.inspect_request_headers(request) {
            Ok(Verdict::Allow) => FilterAction::Continue,
            Ok(Verdict::Deny { reason }) => {
                log::warn!(
                    "request {} denied: {} (path {})",
                    request.context_id,
                    reason,
                    request.path().unwrap_or("-")
                );
                FilterAction::deny(reason)
            }
            Err(e) => match failure_mode {
                FailureMode::FailOpen => {
                    log::warn!("request {} inspection failed, continuing: {}", request.context_id, e);
                    FilterAction::Continue
                }
                FailureMode::FailClosed => {
                    log::error!("request {} inspection failed, denying: {}", request.context_id, e);
                    FilterAction::deny(e.to_string())
                }
            },
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Configuration in effect. After a failed transaction creation this is
    /// the requested configuration with `disable` forced on, matching the
    /// `Disabled` state.
    pub fn config(&self) -> Option<&WafConfig> {
        self.config.as_ref()
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.config.as_ref().map(|c| c.failure_mode).unwrap_or_default()
    }

    pub fn is_started(&self) -> bool {
        self.runtime.is_some()
    }

    pub fn has_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    pub fn transaction(&self) -> Option<&E::Transaction> {
        self.transaction.as_ref()
    }

    pub fn engine(&self) -> Option<&E> {
        self.runtime.as_ref().map(|r| &r.engine)
    }

    pub fn rule_set(&self) -> Option<&E::RuleSet> {
        self.runtime.as_ref().map(|r| &r.rules)
    }
}

impl<E: RuleEngine> Drop for WafController<E> {
    fn drop(&mut self) {
        self.retire_transaction();
    }
}

fn load_all<E: RuleEngine>(
    engine: &E,
    rules: &mut E::RuleSet,
    sources: &[String],
) -> std::result::Result<(), EngineError> {
    for (position, source) in sources.iter().enumerate() {
        if let Err(e) = engine.load_rule(rules, source) {
            log::error!("failed loading rule {} of {}: {}", position + 1, sources.len(), e);
            return Err(e);
        }
    }
    Ok(())
}
