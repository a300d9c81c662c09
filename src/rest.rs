//! REST client for the Primary trading API
//!
//! Every request carries the session token in the `X-Auth-Token` header. A 401
//! response triggers exactly one re-authentication and retry; a second 401 is
//! terminal so persistently bad credentials cannot loop forever.

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::Authenticator;
use crate::env::EnvironmentContext;
use crate::error::{Result, RofexError};
use crate::types::{Market, MarketDataEntry, NewOrder};

mod paths {
    pub const SEGMENTS: &str = "rest/segment/all";
    pub const ALL_INSTRUMENTS: &str = "rest/instruments/all";
    pub const DETAILED_INSTRUMENTS: &str = "rest/instruments/details";
    pub const INSTRUMENT_DETAIL: &str = "rest/instruments/detail";
    pub const MARKET_DATA: &str = "rest/marketdata/get";
    pub const HISTORIC_TRADES: &str = "rest/data/getTrades";
    pub const ORDER_STATUS: &str = "rest/order/id";
    pub const ALL_ORDERS_STATUS: &str = "rest/order/all";
    pub const NEW_ORDER: &str = "rest/order/newSingleOrder";
    pub const CANCEL_ORDER: &str = "rest/order/cancelById";
}

/// Authenticated GET transport plus the query endpoints of the API.
pub struct RestClient {
    ctx: EnvironmentContext,
    http: reqwest::Client,
    authenticator: Authenticator,
}

impl RestClient {
    pub fn new(ctx: EnvironmentContext) -> Result<Self> {
        let http = Authenticator::build_http_client(&ctx)?;
        let authenticator = Authenticator::new(ctx.clone(), http.clone());
        Ok(Self {
            ctx,
            http,
            authenticator,
        })
    }

    pub async fn authenticate(&self) -> Result<()> {
        self.authenticator.authenticate().await
    }

    pub async fn get_segments(&self) -> Result<Value> {
        self.get(self.endpoint(paths::SEGMENTS)?).await
    }

    pub async fn get_all_instruments(&self) -> Result<Value> {
        self.get(self.endpoint(paths::ALL_INSTRUMENTS)?).await
    }

    pub async fn get_detailed_instruments(&self) -> Result<Value> {
        self.get(self.endpoint(paths::DETAILED_INSTRUMENTS)?).await
    }

    pub async fn get_instrument_details(&self, ticker: &str, market: Market) -> Result<Value> {
        let mut url = self.endpoint(paths::INSTRUMENT_DETAIL)?;
        url.query_pairs_mut()
            .append_pair("marketId", market.as_str())
            .append_pair("symbol", ticker);
        self.get(url).await
    }

    pub async fn get_market_data(
        &self,
        ticker: &str,
        entries: &[MarketDataEntry],
        depth: u32,
        market: Market,
    ) -> Result<Value> {
        let entry_string = entries
            .iter()
            .map(|entry| entry.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let mut url = self.endpoint(paths::MARKET_DATA)?;
        url.query_pairs_mut()
            .append_pair("marketId", market.as_str())
            .append_pair("symbol", ticker)
            .append_pair("entries", &entry_string)
            .append_pair("depth", &depth.to_string());
        self.get(url).await
    }

    pub async fn get_trade_history(
        &self,
        ticker: &str,
        start_date: &str,
        end_date: &str,
        market: Market,
    ) -> Result<Value> {
        let mut url = self.endpoint(paths::HISTORIC_TRADES)?;
        url.query_pairs_mut()
            .append_pair("marketId", market.as_str())
            .append_pair("symbol", ticker)
            .append_pair("dateFrom", start_date)
            .append_pair("dateTo", end_date);
        self.get(url).await
    }

    pub async fn get_order_status(
        &self,
        client_order_id: &str,
        proprietary: &str,
    ) -> Result<Value> {
        let mut url = self.endpoint(paths::ORDER_STATUS)?;
        url.query_pairs_mut()
            .append_pair("clOrdId", client_order_id)
            .append_pair("proprietary", proprietary);
        self.get(url).await
    }

    pub async fn get_all_orders_status(&self, account: &str) -> Result<Value> {
        let mut url = self.endpoint(paths::ALL_ORDERS_STATUS)?;
        url.query_pairs_mut().append_pair("accountId", account);
        self.get(url).await
    }

    /// Sends a new order through the REST order-routing endpoint.
    ///
    /// `order.account` must already be resolved; conditional parameters are
    /// included only when the order shape requires them.
    pub async fn send_order(&self, order: &NewOrder, account: &str) -> Result<Value> {
        order.validate()?;
        let url = new_order_url(self.endpoint(paths::NEW_ORDER)?, order, account);
        self.get(url).await
    }

    pub async fn cancel_order(&self, client_order_id: &str, proprietary: &str) -> Result<Value> {
        let mut url = self.endpoint(paths::CANCEL_ORDER)?;
        url.query_pairs_mut()
            .append_pair("clOrdId", client_order_id)
            .append_pair("proprietary", proprietary);
        self.get(url).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.ctx.config().rest_url.join(path)?)
    }

    /// Authenticated GET with the single-retry 401 contract.
    async fn get(&self, url: Url) -> Result<Value> {
        let mut retried = false;
        loop {
            let token = self.ctx.token().ok_or(RofexError::NotInitialized)?;
            debug!(%url, "GET");
            let response = self
                .http
                .get(url.clone())
                .header("X-Auth-Token", token)
                .send()
                .await?;

            if response.status() == StatusCode::UNAUTHORIZED {
                if retried {
                    return Err(RofexError::Authentication(
                        "request unauthorized after token refresh".into(),
                    ));
                }
                warn!(%url, "got 401, refreshing token and retrying once");
                self.authenticator.authenticate().await?;
                retried = true;
                continue;
            }

            return Ok(response.json().await?);
        }
    }
}

/// Builds the `newSingleOrder` query string from the order parameters.
fn new_order_url(mut url: Url, order: &NewOrder, account: &str) -> Url {
    {
        let mut query = url.query_pairs_mut();
        query
            .append_pair("marketId", order.market.as_str())
            .append_pair("symbol", &order.ticker)
            .append_pair("orderQty", &order.size.to_string())
            .append_pair("ordType", order.order_type.as_str())
            .append_pair("side", order.side.as_str())
            .append_pair("timeInForce", order.time_in_force.as_str())
            .append_pair("account", account)
            .append_pair("cancelPrevious", bool_str(order.cancel_previous));
        if let Some(price) = order.price {
            query.append_pair("price", &price.to_string());
        }
        if let Some(expire_date) = &order.expire_date {
            query.append_pair("expireDate", expire_date);
        }
        if order.iceberg {
            query.append_pair("iceberg", "true");
            if let Some(display_quantity) = order.display_quantity {
                query.append_pair("displayQuantity", &display_quantity.to_string());
            }
        }
    }
    url
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderType, Side, TimeInForce};

    fn base_url() -> Url {
        Url::parse("https://api.remarkets.primary.com.ar/rest/order/newSingleOrder").unwrap()
    }

    fn query_of(url: &Url) -> String {
        url.query().unwrap_or_default().to_string()
    }

    #[test]
    fn limit_order_query_includes_price() {
        let order = NewOrder::new("DLR/ENE24", 10, Side::Buy, OrderType::Limit).price(155.5);
        let url = new_order_url(base_url(), &order, "ACC123");
        let query = query_of(&url);
        assert!(query.contains("ordType=limit"));
        assert!(query.contains("price=155.5"));
        assert!(query.contains("account=ACC123"));
        assert!(query.contains("cancelPrevious=false"));
        assert!(!query.contains("iceberg"));
        assert!(!query.contains("expireDate"));
    }

    #[test]
    fn market_order_query_omits_price() {
        let order = NewOrder::new("DLR/ENE24", 10, Side::Sell, OrderType::Market);
        let url = new_order_url(base_url(), &order, "ACC123");
        let query = query_of(&url);
        assert!(query.contains("ordType=market"));
        assert!(!query.contains("price="));
    }

    #[test]
    fn iceberg_and_gtd_parameters_are_conditional() {
        let order = NewOrder::new("DLR/ENE24", 100, Side::Buy, OrderType::Limit)
            .price(155.0)
            .iceberg(10)
            .time_in_force(TimeInForce::GoodTillDate)
            .expire_date("20240131");
        let url = new_order_url(base_url(), &order, "ACC123");
        let query = query_of(&url);
        assert!(query.contains("iceberg=true"));
        assert!(query.contains("displayQuantity=10"));
        assert!(query.contains("expireDate=20240131"));
        assert!(query.contains("timeInForce=GTD"));
    }
}
