//! Per-request inspection hook
//!
//! One `RequestContext` per request stream. It holds a weak reference to the
//! controller that spawned it and asks the controller's current transaction
//! for a verdict once the request headers arrive.

use crate::controller::WafController;
use crate::engine::{InspectedRequest, RuleEngine};
use std::cell::RefCell;
use std::rc::Weak;

/// Status sent back when a request is denied
pub const DENY_STATUS: u32 = 403;

/// What the host should do with the stream
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FilterAction {
    /// Proceed to the next filter
    Continue,

    /// Answer locally with `status`, never reaching upstream
    Deny { status: u32, reason: String },
}

impl FilterAction {
    pub fn deny(reason: impl Into<String>) -> Self {
        FilterAction::Deny {
            status: DENY_STATUS,
            reason: reason.into(),
        }
    }

    pub fn is_continue(&self) -> bool {
        matches!(self, FilterAction::Continue)
    }
}

/// Request lifecycle phase
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    Created,
    HeadersSeen,
    Done,
}

/// Source of request headers
pub trait RequestHeaders {
    fn header(&self, name: &str) -> Option<String>;

    fn headers(&self) -> Vec<(String, String)>;
}

impl RequestHeaders for Vec<(String, String)> {
    fn header(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.clone())
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.clone()
    }
}

/// Raw header values as delivered by the host. Values that are not valid
/// UTF-8 (obs-text) are decoded lossily.
impl RequestHeaders for Vec<(String, Vec<u8>)> {
    fn header(&self, name: &str) -> Option<String> {
        self.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| String::from_utf8_lossy(value).into_owned())
    }

    fn headers(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(key, value)| (key.clone(), String::from_utf8_lossy(value).into_owned()))
            .collect()
    }
}

/// Per-request context
pub struct RequestContext<E: RuleEngine> {
    context_id: u32,
    controller: Weak<RefCell<WafController<E>>>,
    phase: RequestPhase,
}

impl<E: RuleEngine> RequestContext<E> {
    pub fn new(context_id: u32, controller: Weak<RefCell<WafController<E>>>) -> Self {
        Self {
            context_id,
            controller,
            phase: RequestPhase::Created,
        }
    }

    pub fn context_id(&self) -> u32 {
        self.context_id
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// Inspect the request headers.
    ///
    /// Anything short of an engine deny (no transaction, controller gone,
    /// controller busy) continues the stream.
    pub fn on_request_headers<H: RequestHeaders + ?Sized>(
        &mut self,
        headers: &H,
        header_count: usize,
        end_of_stream: bool,
    ) -> FilterAction {
        let path = headers.header(":path").unwrap_or_default();
        log::info!(
            "request {} headers: count={} end_of_stream={} path={}",
            self.context_id,
            header_count,
            end_of_stream,
            path
        );

        if self.phase != RequestPhase::Created {
            log::warn!(
                "request {} headers already inspected ({:?}), continuing",
                self.context_id,
                self.phase
            );
            return FilterAction::Continue;
        }
        self.phase = RequestPhase::HeadersSeen;

        let controller = match self.controller.upgrade() {
            Some(controller) => controller,
            None => {
                log::warn!("request {} has no controller, continuing", self.context_id);
                return FilterAction::Continue;
            }
        };

        let mut controller = match controller.try_borrow_mut() {
            Ok(controller) => controller,
            Err(_) => {
                log::warn!("request {} controller busy, continuing", self.context_id);
                return FilterAction::Continue;
            }
        };

        let request = InspectedRequest::new(self.context_id, headers.headers());
        controller.inspect(&request)
    }

    pub fn on_done(&mut self) {
        log::info!("request {} done", self.context_id);
        self.phase = RequestPhase::Done;
    }
}
