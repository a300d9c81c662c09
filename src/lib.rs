//! Connectivity client for the Matba Rofex (Primary) trading API
//!
//! Two transports share one authenticated environment:
//! - REST for queries and order commands ([`rest::RestClient`])
//! - WebSocket for streaming market data and order reports ([`ws::WsSession`])
//!
//! [`RofexClient`] ties them together behind argument validation and session
//! defaults.
//!
//! ```no_run
//! use rofex::{Environment, MarketDataEntry, Market, RofexClient};
//! use std::sync::Arc;
//!
//! # async fn run() -> rofex::Result<()> {
//! let client = RofexClient::initialize("user", "password", None, Environment::Remarket).await?;
//! client
//!     .connect_websocket(
//!         Some(Arc::new(|msg| println!("market data: {msg}"))),
//!         None,
//!         None,
//!         None,
//!     )
//!     .await?;
//! client
//!     .market_data_subscription(
//!         vec!["DLR/ENE24".to_string()],
//!         vec![MarketDataEntry::Bids, MarketDataEntry::Offers],
//!         1,
//!         Market::Rofex,
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod env;
pub mod error;
pub mod rest;
pub mod types;
pub mod ws;

pub use client::RofexClient;
pub use env::{EnvironmentConfig, EnvironmentContext};
pub use error::{Result, RofexError};
pub use types::{Environment, Market, MarketDataEntry, NewOrder, OrderType, Side, TimeInForce};
pub use ws::{ErrorEvent, ErrorHandler, ExceptionHandler, MessageHandler, WsSession};
