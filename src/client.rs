//! High-level facade over the REST and streaming clients
//!
//! [`RofexClient`] validates caller arguments (environment initialized,
//! account present, non-empty instrument lists) and applies the session
//! defaults before delegating to the transport clients.

use serde_json::Value;
use tracing::info;

use crate::env::{EnvironmentConfig, EnvironmentContext};
use crate::error::{Result, RofexError};
use crate::rest::RestClient;
use crate::types::{Environment, Market, MarketDataEntry, NewOrder};
use crate::ws::handlers::{ErrorHandler, ExceptionHandler, MessageHandler};
use crate::ws::WsSession;

/// Entry point for one authenticated environment.
pub struct RofexClient {
    ctx: EnvironmentContext,
    rest: RestClient,
    ws: WsSession,
}

impl RofexClient {
    /// Authenticates against `environment` and returns a ready client.
    pub async fn initialize(
        user: impl Into<String>,
        password: impl Into<String>,
        account: Option<String>,
        environment: Environment,
    ) -> Result<Self> {
        Self::with_config(EnvironmentConfig::new(environment)?, user, password, account).await
    }

    /// Same as [`initialize`](Self::initialize) with explicit endpoint
    /// configuration, e.g. for custom gateways.
    pub async fn with_config(
        config: EnvironmentConfig,
        user: impl Into<String>,
        password: impl Into<String>,
        account: Option<String>,
    ) -> Result<Self> {
        let ctx = EnvironmentContext::new(config, user, password, account);
        let rest = RestClient::new(ctx.clone())?;
        rest.authenticate().await?;
        let ws = WsSession::new(ctx.clone());
        info!("environment initialized");
        Ok(Self { ctx, rest, ws })
    }

    pub fn context(&self) -> &EnvironmentContext {
        &self.ctx
    }

    // ---- REST operations ----

    pub async fn get_segments(&self) -> Result<Value> {
        self.ensure_initialized()?;
        self.rest.get_segments().await
    }

    pub async fn get_all_instruments(&self) -> Result<Value> {
        self.ensure_initialized()?;
        self.rest.get_all_instruments().await
    }

    pub async fn get_detailed_instruments(&self) -> Result<Value> {
        self.ensure_initialized()?;
        self.rest.get_detailed_instruments().await
    }

    pub async fn get_instrument_details(&self, ticker: &str, market: Market) -> Result<Value> {
        self.ensure_initialized()?;
        self.rest.get_instrument_details(ticker, market).await
    }

    /// Queries current market data for `ticker`. An empty `entries` slice
    /// requests the full entry set.
    pub async fn get_market_data(
        &self,
        ticker: &str,
        entries: Vec<MarketDataEntry>,
        depth: u32,
        market: Market,
    ) -> Result<Value> {
        self.ensure_initialized()?;
        let entries = resolve_entries(entries);
        self.rest
            .get_market_data(ticker, &entries, depth, market)
            .await
    }

    pub async fn get_trade_history(
        &self,
        ticker: &str,
        start_date: &str,
        end_date: &str,
        market: Market,
    ) -> Result<Value> {
        self.ensure_initialized()?;
        self.rest
            .get_trade_history(ticker, start_date, end_date, market)
            .await
    }

    pub async fn get_order_status(
        &self,
        client_order_id: &str,
        proprietary: Option<&str>,
    ) -> Result<Value> {
        self.ensure_initialized()?;
        let proprietary = self.resolve_proprietary(proprietary);
        self.rest.get_order_status(client_order_id, &proprietary).await
    }

    pub async fn get_all_orders_status(&self, account: Option<&str>) -> Result<Value> {
        self.ensure_initialized()?;
        let account = self.resolve_account(account)?;
        self.rest.get_all_orders_status(&account).await
    }

    /// Sends a new order through the REST order-routing endpoint.
    pub async fn send_order(&self, order: &NewOrder) -> Result<Value> {
        self.ensure_initialized()?;
        let account = self.resolve_account(order.account.as_deref())?;
        self.rest.send_order(order, &account).await
    }

    pub async fn cancel_order(
        &self,
        client_order_id: &str,
        proprietary: Option<&str>,
    ) -> Result<Value> {
        self.ensure_initialized()?;
        let proprietary = self.resolve_proprietary(proprietary);
        self.rest.cancel_order(client_order_id, &proprietary).await
    }

    // ---- Streaming operations ----

    /// Opens the streaming connection, registering the given handlers first.
    pub async fn connect_websocket(
        &self,
        market_data_handler: Option<MessageHandler>,
        order_report_handler: Option<MessageHandler>,
        error_handler: Option<ErrorHandler>,
        exception_handler: Option<ExceptionHandler>,
    ) -> Result<()> {
        self.ensure_initialized()?;
        if let Some(handler) = market_data_handler {
            self.ws.add_market_data_handler(handler);
        }
        if let Some(handler) = order_report_handler {
            self.ws.add_order_report_handler(handler);
        }
        if let Some(handler) = error_handler {
            self.ws.add_error_handler(handler);
        }
        if let Some(handler) = exception_handler {
            self.ws.set_exception_handler(Some(handler));
        }
        self.ws.connect().await
    }

    pub async fn close_websocket(&self) {
        self.ws.close().await
    }

    pub fn is_websocket_connected(&self) -> bool {
        self.ws.is_connected()
    }

    /// Subscribes to market data. An empty `entries` slice requests the full
    /// entry set.
    pub async fn market_data_subscription(
        &self,
        tickers: Vec<String>,
        entries: Vec<MarketDataEntry>,
        depth: u32,
        market: Market,
    ) -> Result<()> {
        self.ensure_initialized()?;
        if tickers.is_empty() {
            return Err(RofexError::InvalidArgument(
                "at least one ticker is required".into(),
            ));
        }
        let entries = resolve_entries(entries);
        self.ws
            .market_data_subscription(tickers, entries, depth, market)
            .await
    }

    /// Subscribes to order reports. `snapshot_only_active = true` skips the
    /// replay of historical reports.
    pub async fn order_report_subscription(
        &self,
        account: Option<&str>,
        snapshot_only_active: bool,
    ) -> Result<()> {
        self.ensure_initialized()?;
        let account = self.resolve_account(account)?;
        self.ws
            .order_report_subscription(&account, snapshot_only_active)
            .await
    }

    /// Sends a new order through the streaming order-routing path.
    pub async fn send_order_via_websocket(&self, order: &NewOrder) -> Result<()> {
        self.ensure_initialized()?;
        let account = self.resolve_account(order.account.as_deref())?;
        self.ws.send_order(order, &account).await
    }

    pub async fn cancel_order_via_websocket(
        &self,
        client_order_id: &str,
        proprietary: Option<&str>,
    ) -> Result<()> {
        self.ensure_initialized()?;
        let proprietary = self.resolve_proprietary(proprietary);
        self.ws.cancel_order(client_order_id, &proprietary).await
    }

    pub fn add_market_data_handler(&self, handler: MessageHandler) {
        self.ws.add_market_data_handler(handler);
    }

    pub fn remove_market_data_handler(&self, handler: &MessageHandler) {
        self.ws.remove_market_data_handler(handler);
    }

    pub fn add_order_report_handler(&self, handler: MessageHandler) {
        self.ws.add_order_report_handler(handler);
    }

    pub fn remove_order_report_handler(&self, handler: &MessageHandler) {
        self.ws.remove_order_report_handler(handler);
    }

    pub fn add_error_handler(&self, handler: ErrorHandler) {
        self.ws.add_error_handler(handler);
    }

    pub fn remove_error_handler(&self, handler: &ErrorHandler) {
        self.ws.remove_error_handler(handler);
    }

    pub fn set_exception_handler(&self, handler: Option<ExceptionHandler>) {
        self.ws.set_exception_handler(handler);
    }

    // ---- Validation helpers ----

    fn ensure_initialized(&self) -> Result<()> {
        if !self.ctx.is_initialized() {
            return Err(RofexError::NotInitialized);
        }
        Ok(())
    }

    fn resolve_account(&self, account: Option<&str>) -> Result<String> {
        account
            .map(str::to_string)
            .or_else(|| self.ctx.account())
            .ok_or_else(|| RofexError::InvalidArgument("account not specified".into()))
    }

    fn resolve_proprietary(&self, proprietary: Option<&str>) -> String {
        proprietary
            .map(str::to_string)
            .unwrap_or_else(|| self.ctx.proprietary().to_string())
    }
}

/// An empty entry set defaults to all known entry kinds.
fn resolve_entries(entries: Vec<MarketDataEntry>) -> Vec<MarketDataEntry> {
    if entries.is_empty() {
        MarketDataEntry::all()
    } else {
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_entries_default_to_the_full_set() {
        assert_eq!(resolve_entries(vec![]).len(), 13);
        assert_eq!(
            resolve_entries(vec![MarketDataEntry::Bids]),
            vec![MarketDataEntry::Bids]
        );
    }
}
