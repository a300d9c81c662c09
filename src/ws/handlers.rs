//! Callback registries for inbound streaming messages
//!
//! Each message category keeps an ordered, duplicate-suppressing list of
//! callbacks (identity by `Arc` pointer). Fan-out happens in registration
//! order, so the registry hands out snapshots instead of holding its lock
//! while user code runs.

use std::sync::Arc;

use serde_json::Value;

use crate::error::RofexError;
use crate::ws::events::ErrorEvent;

/// Callback for market-data and order-report messages.
pub type MessageHandler = Arc<dyn Fn(&Value) + Send + Sync>;
/// Callback for API error frames and synthesized unsupported-message notices.
pub type ErrorHandler = Arc<dyn Fn(&ErrorEvent) + Send + Sync>;
/// Terminal sink for errors raised inside the receive loop.
pub type ExceptionHandler = Arc<dyn Fn(&RofexError) + Send + Sync>;

#[derive(Default)]
pub(crate) struct HandlerRegistry {
    market_data: Vec<MessageHandler>,
    order_report: Vec<MessageHandler>,
    error: Vec<ErrorHandler>,
    exception: Option<ExceptionHandler>,
}

fn add<T: ?Sized>(list: &mut Vec<Arc<T>>, handler: Arc<T>) {
    if !list.iter().any(|existing| Arc::ptr_eq(existing, &handler)) {
        list.push(handler);
    }
}

fn remove<T: ?Sized>(list: &mut Vec<Arc<T>>, handler: &Arc<T>) {
    list.retain(|existing| !Arc::ptr_eq(existing, handler));
}

impl HandlerRegistry {
    pub fn add_market_data_handler(&mut self, handler: MessageHandler) {
        add(&mut self.market_data, handler);
    }

    pub fn remove_market_data_handler(&mut self, handler: &MessageHandler) {
        remove(&mut self.market_data, handler);
    }

    pub fn add_order_report_handler(&mut self, handler: MessageHandler) {
        add(&mut self.order_report, handler);
    }

    pub fn remove_order_report_handler(&mut self, handler: &MessageHandler) {
        remove(&mut self.order_report, handler);
    }

    pub fn add_error_handler(&mut self, handler: ErrorHandler) {
        add(&mut self.error, handler);
    }

    pub fn remove_error_handler(&mut self, handler: &ErrorHandler) {
        remove(&mut self.error, handler);
    }

    /// Single-slot overwrite; `None` disables exception forwarding.
    pub fn set_exception_handler(&mut self, handler: Option<ExceptionHandler>) {
        self.exception = handler;
    }

    pub fn market_data_handlers(&self) -> Vec<MessageHandler> {
        self.market_data.clone()
    }

    pub fn order_report_handlers(&self) -> Vec<MessageHandler> {
        self.order_report.clone()
    }

    pub fn error_handlers(&self) -> Vec<ErrorHandler> {
        self.error.clone()
    }

    pub fn exception_handler(&self) -> Option<ExceptionHandler> {
        self.exception.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> MessageHandler {
        Arc::new(move |_msg| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn adding_the_same_handler_twice_keeps_one_entry() {
        let mut registry = HandlerRegistry::default();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter);

        registry.add_market_data_handler(handler.clone());
        registry.add_market_data_handler(handler.clone());
        assert_eq!(registry.market_data_handlers().len(), 1);
    }

    #[test]
    fn removing_an_absent_handler_is_a_noop() {
        let mut registry = HandlerRegistry::default();
        let handler = counting_handler(Arc::new(AtomicUsize::new(0)));
        registry.remove_market_data_handler(&handler);
        assert!(registry.market_data_handlers().is_empty());
    }

    #[test]
    fn handlers_keep_registration_order() {
        let mut registry = HandlerRegistry::default();
        let first = counting_handler(Arc::new(AtomicUsize::new(0)));
        let second = counting_handler(Arc::new(AtomicUsize::new(0)));

        registry.add_order_report_handler(first.clone());
        registry.add_order_report_handler(second.clone());
        let snapshot = registry.order_report_handlers();
        assert!(Arc::ptr_eq(&snapshot[0], &first));
        assert!(Arc::ptr_eq(&snapshot[1], &second));

        registry.remove_order_report_handler(&first);
        let snapshot = registry.order_report_handlers();
        assert_eq!(snapshot.len(), 1);
        assert!(Arc::ptr_eq(&snapshot[0], &second));
    }

    #[test]
    fn exception_slot_overwrites_and_clears() {
        let mut registry = HandlerRegistry::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        registry.set_exception_handler(Some(Arc::new(move |_err| {
            hits_clone.fetch_add(1, Ordering::SeqCst);
        })));

        let handler = registry.exception_handler().expect("handler set");
        handler(&RofexError::NotConnected);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        registry.set_exception_handler(None);
        assert!(registry.exception_handler().is_none());
    }
}
