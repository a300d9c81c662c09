//! Domain enums and order parameters with their Primary API wire values

use serde::{Deserialize, Serialize};

use crate::error::{Result, RofexError};

/// Available environments.
///
/// `Remarket` is the demo environment used for testing purposes, `Live` is the
/// production environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Remarket,
    Live,
}

impl Environment {
    pub fn rest_url(&self) -> &'static str {
        match self {
            Self::Remarket => "https://api.remarkets.primary.com.ar/",
            Self::Live => "https://api.primary.com.ar/",
        }
    }

    pub fn ws_url(&self) -> &'static str {
        match self {
            Self::Remarket => "wss://api.remarkets.primary.com.ar/",
            Self::Live => "wss://api.primary.com.ar/",
        }
    }

    /// Default proprietary code for order routing in this environment.
    pub fn proprietary(&self) -> &'static str {
        match self {
            Self::Remarket => "PBCP",
            Self::Live => "api",
        }
    }
}

/// Market ID associated with the instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Market {
    #[serde(rename = "ROFX")]
    Rofex,
}

impl Market {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rofex => "ROFX",
        }
    }
}

/// Side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "buy")]
    Buy,
    #[serde(rename = "sell")]
    Sell,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

/// Order types supported by the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderType {
    #[serde(rename = "limit")]
    Limit,
    #[serde(rename = "market")]
    Market,
    #[serde(rename = "market_to_limit")]
    MarketToLimit,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "limit",
            Self::Market => "market",
            Self::MarketToLimit => "market_to_limit",
        }
    }
}

/// Time modifier that defines how long the order stays active.
///
/// `GoodTillDate` orders must carry an expiration date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    #[serde(rename = "Day")]
    Day,
    #[serde(rename = "IOC")]
    ImmediateOrCancel,
    #[serde(rename = "FOK")]
    FillOrKill,
    #[serde(rename = "GTD")]
    GoodTillDate,
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Day => "Day",
            Self::ImmediateOrCancel => "IOC",
            Self::FillOrKill => "FOK",
            Self::GoodTillDate => "GTD",
        }
    }
}

/// Market data entries that can be requested for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketDataEntry {
    /// Best buy offer in the book.
    #[serde(rename = "BI")]
    Bids,
    /// Best sell offer in the book.
    #[serde(rename = "OF")]
    Offers,
    /// Last traded price.
    #[serde(rename = "LA")]
    Last,
    #[serde(rename = "OP")]
    OpeningPrice,
    #[serde(rename = "CL")]
    ClosingPrice,
    /// Settlement price (futures only).
    #[serde(rename = "SE")]
    SettlementPrice,
    #[serde(rename = "HI")]
    HighPrice,
    #[serde(rename = "LO")]
    LowPrice,
    #[serde(rename = "TV")]
    TradeVolume,
    /// Open interest in contracts (futures only).
    #[serde(rename = "OI")]
    OpenInterest,
    /// Calculated index value (indices only).
    #[serde(rename = "IV")]
    IndexValue,
    #[serde(rename = "EV")]
    TradeEffectiveVolume,
    #[serde(rename = "NV")]
    NominalVolume,
}

impl MarketDataEntry {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bids => "BI",
            Self::Offers => "OF",
            Self::Last => "LA",
            Self::OpeningPrice => "OP",
            Self::ClosingPrice => "CL",
            Self::SettlementPrice => "SE",
            Self::HighPrice => "HI",
            Self::LowPrice => "LO",
            Self::TradeVolume => "TV",
            Self::OpenInterest => "OI",
            Self::IndexValue => "IV",
            Self::TradeEffectiveVolume => "EV",
            Self::NominalVolume => "NV",
        }
    }

    /// Full entry set, used as the default when the caller does not specify one.
    pub fn all() -> Vec<MarketDataEntry> {
        vec![
            Self::Bids,
            Self::Offers,
            Self::Last,
            Self::OpeningPrice,
            Self::ClosingPrice,
            Self::SettlementPrice,
            Self::HighPrice,
            Self::LowPrice,
            Self::TradeVolume,
            Self::OpenInterest,
            Self::IndexValue,
            Self::TradeEffectiveVolume,
            Self::NominalVolume,
        ]
    }
}

/// Parameters for a new single order, shared by the REST and streaming paths.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub ticker: String,
    pub size: u64,
    pub side: Side,
    pub order_type: OrderType,
    pub market: Market,
    pub time_in_force: TimeInForce,
    /// Account to route the order through. `None` uses the session default.
    pub account: Option<String>,
    /// Required for limit orders.
    pub price: Option<f64>,
    /// Cancel active orders matching account, side and ticker before placing.
    pub cancel_previous: bool,
    pub iceberg: bool,
    /// Disclosed quantity, required when `iceberg` is set.
    pub display_quantity: Option<u64>,
    /// Expiration date for GTD orders, format `yyyyMMdd`.
    pub expire_date: Option<String>,
    pub all_or_none: bool,
    /// Optional client-assigned order id for the streaming path.
    pub client_order_id: Option<String>,
}

impl NewOrder {
    pub fn new(ticker: impl Into<String>, size: u64, side: Side, order_type: OrderType) -> Self {
        Self {
            ticker: ticker.into(),
            size,
            side,
            order_type,
            market: Market::Rofex,
            time_in_force: TimeInForce::Day,
            account: None,
            price: None,
            cancel_previous: false,
            iceberg: false,
            display_quantity: None,
            expire_date: None,
            all_or_none: false,
            client_order_id: None,
        }
    }

    pub fn price(mut self, price: f64) -> Self {
        self.price = Some(price);
        self
    }

    pub fn account(mut self, account: impl Into<String>) -> Self {
        self.account = Some(account.into());
        self
    }

    pub fn market(mut self, market: Market) -> Self {
        self.market = market;
        self
    }

    pub fn time_in_force(mut self, time_in_force: TimeInForce) -> Self {
        self.time_in_force = time_in_force;
        self
    }

    pub fn cancel_previous(mut self, cancel_previous: bool) -> Self {
        self.cancel_previous = cancel_previous;
        self
    }

    pub fn iceberg(mut self, display_quantity: u64) -> Self {
        self.iceberg = true;
        self.display_quantity = Some(display_quantity);
        self
    }

    pub fn expire_date(mut self, expire_date: impl Into<String>) -> Self {
        self.expire_date = Some(expire_date.into());
        self
    }

    pub fn all_or_none(mut self, all_or_none: bool) -> Self {
        self.all_or_none = all_or_none;
        self
    }

    pub fn client_order_id(mut self, client_order_id: impl Into<String>) -> Self {
        self.client_order_id = Some(client_order_id.into());
        self
    }

    /// Checks the conditional field requirements before the order is encoded.
    pub fn validate(&self) -> Result<()> {
        if self.order_type == OrderType::Limit && self.price.is_none() {
            return Err(RofexError::InvalidArgument(
                "price is required for limit orders".into(),
            ));
        }
        if self.iceberg && self.display_quantity.is_none() {
            return Err(RofexError::InvalidArgument(
                "display_quantity is required for iceberg orders".into(),
            ));
        }
        if self.time_in_force == TimeInForce::GoodTillDate && self.expire_date.is_none() {
            return Err(RofexError::InvalidArgument(
                "expire_date is required for GTD orders".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_match_the_api() {
        assert_eq!(Market::Rofex.as_str(), "ROFX");
        assert_eq!(Side::Buy.as_str(), "buy");
        assert_eq!(Side::Sell.as_str(), "sell");
        assert_eq!(OrderType::MarketToLimit.as_str(), "market_to_limit");
        assert_eq!(TimeInForce::ImmediateOrCancel.as_str(), "IOC");
        assert_eq!(TimeInForce::GoodTillDate.as_str(), "GTD");
        assert_eq!(MarketDataEntry::Bids.as_str(), "BI");
        assert_eq!(MarketDataEntry::NominalVolume.as_str(), "NV");
    }

    #[test]
    fn serde_uses_wire_values() {
        assert_eq!(
            serde_json::to_string(&MarketDataEntry::Offers).unwrap(),
            "\"OF\""
        );
        assert_eq!(serde_json::to_string(&Side::Sell).unwrap(), "\"sell\"");
        assert_eq!(serde_json::to_string(&Market::Rofex).unwrap(), "\"ROFX\"");
    }

    #[test]
    fn all_entries_has_every_kind() {
        let all = MarketDataEntry::all();
        assert_eq!(all.len(), 13);
        assert_eq!(all[0], MarketDataEntry::Bids);
        assert_eq!(all[1], MarketDataEntry::Offers);
    }

    #[test]
    fn limit_order_without_price_is_rejected() {
        let order = NewOrder::new("DLR/ENE24", 10, Side::Buy, OrderType::Limit);
        assert!(matches!(
            order.validate(),
            Err(RofexError::InvalidArgument(_))
        ));
        assert!(order.price(155.0).validate().is_ok());
    }

    #[test]
    fn gtd_order_requires_expire_date() {
        let order = NewOrder::new("DLR/ENE24", 10, Side::Buy, OrderType::Market)
            .time_in_force(TimeInForce::GoodTillDate);
        assert!(order.validate().is_err());
        assert!(order.expire_date("20240131").validate().is_ok());
    }
}
