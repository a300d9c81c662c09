//! WebSocket streaming module for the Primary real-time API
//!
//! This module provides:
//! - A streaming session with token-authenticated connect and a background
//!   receive loop
//! - Handler registries for market data, order reports and errors
//! - Wire encoders for subscriptions and streaming order routing

pub mod client;
pub mod events;
pub mod handlers;

pub use client::WsSession;
pub use events::{
    CancelOrderFrame, ErrorEvent, InstrumentId, MarketDataSubscription, NewOrderFrame,
    OrderReportSubscription,
};
pub use handlers::{ErrorHandler, ExceptionHandler, MessageHandler};
