//! Wire frames and inbound message classification for the streaming API

use serde::Serialize;
use serde_json::Value;

use crate::types::{Market, MarketDataEntry, NewOrder};

/// Instrument identifier as it appears inside subscription and order frames.
#[derive(Debug, Clone, Serialize)]
pub struct InstrumentId {
    pub symbol: String,
    #[serde(rename = "marketId")]
    pub market_id: Market,
}

/// Market data subscription frame (`type: "smd"`).
#[derive(Debug, Serialize)]
pub struct MarketDataSubscription {
    #[serde(rename = "type")]
    msg_type: &'static str,
    level: u32,
    depth: u32,
    entries: Vec<MarketDataEntry>,
    products: Vec<InstrumentId>,
}

impl MarketDataSubscription {
    pub fn new(
        tickers: Vec<String>,
        entries: Vec<MarketDataEntry>,
        depth: u32,
        market: Market,
    ) -> Self {
        let products = tickers
            .into_iter()
            .map(|symbol| InstrumentId {
                symbol,
                market_id: market,
            })
            .collect();
        Self {
            msg_type: "smd",
            level: 1,
            depth,
            entries,
            products,
        }
    }
}

#[derive(Debug, Serialize)]
struct AccountId {
    id: String,
}

/// Order report subscription frame (`type: "os"`).
#[derive(Debug, Serialize)]
pub struct OrderReportSubscription {
    #[serde(rename = "type")]
    msg_type: &'static str,
    account: AccountId,
    #[serde(rename = "snapshotOnlyActive")]
    snapshot_only_active: bool,
}

impl OrderReportSubscription {
    /// `snapshot_only_active = true` skips the replay of historical reports.
    pub fn new(account: impl Into<String>, snapshot_only_active: bool) -> Self {
        Self {
            msg_type: "os",
            account: AccountId {
                id: account.into(),
            },
            snapshot_only_active,
        }
    }
}

/// New order frame for the streaming order-routing path (`type: "no"`).
#[derive(Debug, Serialize)]
pub struct NewOrderFrame {
    #[serde(rename = "type")]
    msg_type: &'static str,
    product: InstrumentId,
    quantity: u64,
    #[serde(rename = "ordType")]
    ord_type: crate::types::OrderType,
    side: crate::types::Side,
    account: String,
    #[serde(rename = "allOrNone")]
    all_or_none: bool,
    #[serde(rename = "timeInForce")]
    time_in_force: crate::types::TimeInForce,
    #[serde(rename = "cancelPrevious")]
    cancel_previous: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    iceberg: Option<bool>,
    #[serde(rename = "displayQuantity", skip_serializing_if = "Option::is_none")]
    display_quantity: Option<u64>,
    #[serde(rename = "expireDate", skip_serializing_if = "Option::is_none")]
    expire_date: Option<String>,
    #[serde(rename = "wsClOrdId", skip_serializing_if = "Option::is_none")]
    ws_client_order_id: Option<String>,
}

impl NewOrderFrame {
    /// `account` must already be resolved against the session default.
    pub fn new(order: &NewOrder, account: impl Into<String>) -> Self {
        Self {
            msg_type: "no",
            product: InstrumentId {
                symbol: order.ticker.clone(),
                market_id: order.market,
            },
            quantity: order.size,
            ord_type: order.order_type,
            side: order.side,
            account: account.into(),
            all_or_none: order.all_or_none,
            time_in_force: order.time_in_force,
            cancel_previous: order.cancel_previous,
            price: order.price,
            iceberg: order.iceberg.then_some(true),
            display_quantity: if order.iceberg {
                order.display_quantity
            } else {
                None
            },
            expire_date: order.expire_date.clone(),
            ws_client_order_id: order.client_order_id.clone(),
        }
    }
}

/// Cancel order frame (`type: "co"`).
#[derive(Debug, Serialize)]
pub struct CancelOrderFrame {
    #[serde(rename = "type")]
    msg_type: &'static str,
    #[serde(rename = "clientId")]
    client_id: String,
    proprietary: String,
}

impl CancelOrderFrame {
    pub fn new(client_order_id: impl Into<String>, proprietary: impl Into<String>) -> Self {
        Self {
            msg_type: "co",
            client_id: client_order_id.into(),
            proprietary: proprietary.into(),
        }
    }
}

/// Payload delivered to error handlers.
#[derive(Debug, Clone)]
pub enum ErrorEvent {
    /// Raw frame with `status == "ERROR"`.
    Api(Value),
    /// Synthesized notice for frames with an unknown or missing `type`.
    Unsupported(String),
}

/// Inbound message category, first match wins.
#[derive(Debug)]
pub enum Classified {
    MarketData(Value),
    OrderReport(Value),
    Error(Value),
    /// Notice text for an unrecognized or missing message type.
    Unsupported(String),
}

/// Classifies one parsed inbound frame.
///
/// The `type` comparison is case-insensitive; a frame with neither a `status`
/// nor a `type` field is unsupported.
pub fn classify(msg: Value) -> Classified {
    if msg.get("status").and_then(Value::as_str) == Some("ERROR") {
        return Classified::Error(msg);
    }
    match msg.get("type").and_then(Value::as_str) {
        Some(msg_type) => match msg_type.to_ascii_uppercase().as_str() {
            "MD" => Classified::MarketData(msg),
            "OR" => Classified::OrderReport(msg),
            _ => Classified::Unsupported(format!(
                "websocket: message type not supported. message: {msg}"
            )),
        },
        None => Classified::Unsupported(format!("websocket: message not supported. message: {msg}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OrderType, Side, TimeInForce};
    use serde_json::json;

    #[test]
    fn market_data_subscription_serializes_to_the_documented_shape() {
        let frame = MarketDataSubscription::new(
            vec!["DLR/ENE24".to_string()],
            vec![MarketDataEntry::Bids, MarketDataEntry::Offers],
            2,
            Market::Rofex,
        );
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "type": "smd",
                "level": 1,
                "depth": 2,
                "entries": ["BI", "OF"],
                "products": [{"symbol": "DLR/ENE24", "marketId": "ROFX"}]
            })
        );
    }

    #[test]
    fn order_report_subscription_frame() {
        let frame = OrderReportSubscription::new("ACC123", true);
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({
                "type": "os",
                "account": {"id": "ACC123"},
                "snapshotOnlyActive": true
            })
        );
    }

    #[test]
    fn iceberg_order_includes_display_quantity() {
        let order = NewOrder::new("DLR/ENE24", 100, Side::Buy, OrderType::Limit)
            .price(155.0)
            .iceberg(10);
        let value = serde_json::to_value(NewOrderFrame::new(&order, "ACC123")).unwrap();
        assert_eq!(value["type"], "no");
        assert_eq!(value["iceberg"], true);
        assert_eq!(value["displayQuantity"], 10);
        assert_eq!(value["price"], 155.0);
        assert_eq!(value["product"]["marketId"], "ROFX");
    }

    #[test]
    fn non_iceberg_order_omits_iceberg_fields() {
        let order = NewOrder::new("DLR/ENE24", 100, Side::Sell, OrderType::Market);
        let value = serde_json::to_value(NewOrderFrame::new(&order, "ACC123")).unwrap();
        assert!(value.get("iceberg").is_none());
        assert!(value.get("displayQuantity").is_none());
        assert!(value.get("price").is_none());
        assert_eq!(value["side"], "sell");
        assert_eq!(value["allOrNone"], false);
    }

    #[test]
    fn gtd_order_carries_expire_date() {
        let order = NewOrder::new("DLR/ENE24", 100, Side::Buy, OrderType::Market)
            .time_in_force(TimeInForce::GoodTillDate)
            .expire_date("20240131")
            .client_order_id("my-order-1");
        let value = serde_json::to_value(NewOrderFrame::new(&order, "ACC123")).unwrap();
        assert_eq!(value["timeInForce"], "GTD");
        assert_eq!(value["expireDate"], "20240131");
        assert_eq!(value["wsClOrdId"], "my-order-1");
    }

    #[test]
    fn cancel_order_frame() {
        let frame = CancelOrderFrame::new("ORD-1", "PBCP");
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"type": "co", "clientId": "ORD-1", "proprietary": "PBCP"})
        );
    }

    #[test]
    fn error_status_wins_over_type() {
        let classified = classify(json!({"status": "ERROR", "type": "MD", "msg": "x"}));
        assert!(matches!(classified, Classified::Error(_)));
    }

    #[test]
    fn type_match_is_case_insensitive() {
        assert!(matches!(
            classify(json!({"type": "md"})),
            Classified::MarketData(_)
        ));
        assert!(matches!(
            classify(json!({"type": "or"})),
            Classified::OrderReport(_)
        ));
    }

    #[test]
    fn unknown_type_becomes_an_unsupported_notice() {
        match classify(json!({"type": "ZZ"})) {
            Classified::Unsupported(notice) => {
                assert!(notice.contains("not supported"));
                assert!(notice.contains("ZZ"));
            }
            other => panic!("expected unsupported, got {other:?}"),
        }
    }

    #[test]
    fn missing_type_and_status_is_unsupported() {
        assert!(matches!(
            classify(json!({"foo": 1})),
            Classified::Unsupported(_)
        ));
    }
}
