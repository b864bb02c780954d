//! WAF Envoy WASM Filter
//!
//! Request-inspection filter for Envoy Proxy. Host callbacks are adapted
//! onto `waf-core`: the root context owns the controller, every HTTP context
//! gets a weak reference to it.
//!
//! ## Build
//!
//! ```bash
//! cargo build --target wasm32-wasi --release
//! ```

use proxy_wasm::traits::*;
use proxy_wasm::types::*;
use std::cell::RefCell;
use std::rc::Rc;
use waf_core::{FilterAction, PassthroughEngine, RequestContext, WafController};

type Engine = PassthroughEngine;

proxy_wasm::main! {{
    proxy_wasm::set_log_level(LogLevel::Info);
    proxy_wasm::set_root_context(|_| -> Box<dyn RootContext> {
        Box::new(WafFilterRoot::new())
    });
}}

/// Root context for the WAF filter
pub struct WafFilterRoot {
    controller: Rc<RefCell<WafController<Engine>>>,
}

impl WafFilterRoot {
    fn new() -> Self {
        Self {
            controller: Rc::new(RefCell::new(WafController::new(PassthroughEngine::new))),
        }
    }
}

impl Context for WafFilterRoot {}

impl RootContext for WafFilterRoot {
    fn on_vm_start(&mut self, _vm_configuration_size: usize) -> bool {
        self.controller.borrow_mut().on_start()
    }

    fn on_configure(&mut self, _plugin_configuration_size: usize) -> bool {
        let config = self.get_plugin_configuration();
        let mut controller = self.controller.borrow_mut();

        if !controller.is_started() {
            log::info!("configure received before vm start, starting controller");
            controller.on_start();
        }

        controller.on_configure(config.as_deref())
    }

    fn create_http_context(&self, context_id: u32) -> Option<Box<dyn HttpContext>> {
        Some(Box::new(WafFilter {
            context: RequestContext::new(context_id, Rc::downgrade(&self.controller)),
        }))
    }

    fn get_type(&self) -> Option<ContextType> {
        Some(ContextType::HttpContext)
    }
}

/// HTTP context for the WAF filter
pub struct WafFilter {
    context: RequestContext<Engine>,
}

impl Context for WafFilter {
    fn on_done(&mut self) -> bool {
        self.context.on_done();
        true
    }
}

impl HttpContext for WafFilter {
    fn on_http_request_headers(&mut self, num_headers: usize, end_of_stream: bool) -> Action {
        let headers = self.get_http_request_headers_bytes();

        match self.context.on_request_headers(&headers, num_headers, end_of_stream) {
            FilterAction::Continue => Action::Continue,
            FilterAction::Deny { status, reason } => {
                log::warn!(
                    "WAF: Blocked request {} with status {}: {}",
                    self.context.context_id(),
                    status,
                    reason
                );
                self.send_http_response(
                    status,
                    vec![
                        ("content-type", "application/json"),
                        ("x-waf-blocked", "true"),
                    ],
                    Some(br#"{"error":"forbidden","message":"Request blocked by WAF policy"}"#),
                );
                Action::Pause
            }
        }
    }
}
