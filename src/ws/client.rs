//! Streaming session over the Primary WebSocket API
//!
//! One session owns one socket and one background receive task. Inbound frames
//! are classified and fanned out to the registered handlers; everything that
//! goes wrong on the receive task is routed to the exception handler instead
//! of unwinding into the caller.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{oneshot, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use crate::env::EnvironmentContext;
use crate::error::{Result, RofexError};
use crate::types::{Market, MarketDataEntry, NewOrder};
use crate::ws::events::{
    classify, CancelOrderFrame, Classified, ErrorEvent, MarketDataSubscription, NewOrderFrame,
    OrderReportSubscription,
};
use crate::ws::handlers::{ErrorHandler, ExceptionHandler, HandlerRegistry, MessageHandler};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type SharedSink = Arc<AsyncMutex<Option<WsSink>>>;
type SharedRegistry = Arc<Mutex<HandlerRegistry>>;

/// Streaming session bound to one environment.
///
/// The session object survives `close()` and can be connected again; a second
/// `connect()` while the receive task is alive is a no-op.
pub struct WsSession {
    ctx: EnvironmentContext,
    handlers: SharedRegistry,
    sink: SharedSink,
    connected: Arc<AtomicBool>,
    recv_task: Mutex<Option<JoinHandle<()>>>,
}

impl WsSession {
    pub fn new(ctx: EnvironmentContext) -> Self {
        Self {
            ctx,
            handlers: Arc::new(Mutex::new(HandlerRegistry::default())),
            sink: Arc::new(AsyncMutex::new(None)),
            connected: Arc::new(AtomicBool::new(false)),
            recv_task: Mutex::new(None),
        }
    }

    /// Opens the socket and starts the background receive task.
    ///
    /// Fails with `NotInitialized` when the environment has no token. Waits up
    /// to the configured connect timeout for the open confirmation; on timeout
    /// the exception handler is notified with a `Connection` error and the
    /// call still returns `Ok` so the caller may retry.
    pub async fn connect(&self) -> Result<()> {
        let token = self.ctx.token().ok_or(RofexError::NotInitialized)?;

        let mut request = self.ctx.config().ws_url.as_str().into_client_request()?;
        let token_value = HeaderValue::from_str(&token).map_err(|_| {
            RofexError::InvalidArgument("token is not a valid header value".into())
        })?;
        request.headers_mut().insert("X-Auth-Token", token_value);

        let (open_tx, open_rx) = oneshot::channel();
        // Check and replace under one lock acquisition so two concurrent
        // connect() calls cannot both spawn a receive task.
        {
            let mut guard = self.recv_task.lock().expect("receive task lock poisoned");
            if let Some(task) = guard.as_ref() {
                if !task.is_finished() {
                    debug!("receive task already running, ignoring connect");
                    return Ok(());
                }
            }
            *guard = Some(tokio::spawn(receive_loop(
                request,
                self.ctx.config().heartbeat,
                self.sink.clone(),
                self.handlers.clone(),
                self.connected.clone(),
                open_tx,
            )));
        }

        match tokio::time::timeout(self.ctx.config().connect_timeout, open_rx).await {
            Ok(Ok(())) => debug!("websocket open confirmed"),
            // The receive task dropped the sender after reporting its own
            // handshake failure; nothing more to do here.
            Ok(Err(_)) => {}
            Err(_) => {
                let err = RofexError::Connection("connection could not be established".into());
                warn!(%err, "timed out waiting for websocket open");
                forward_exception(&self.handlers, &err);
            }
        }
        Ok(())
    }

    /// Requests socket shutdown. Idempotent; does not wait for the receive
    /// task to exit.
    pub async fn close(&self) {
        let mut guard = self.sink.lock().await;
        if let Some(mut sink) = guard.take() {
            info!("closing websocket connection");
            let _ = sink.send(Message::Close(None)).await;
            let _ = sink.close().await;
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    /// Reflects the last open/close event on the socket.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn add_market_data_handler(&self, handler: MessageHandler) {
        self.registry().add_market_data_handler(handler);
    }

    pub fn remove_market_data_handler(&self, handler: &MessageHandler) {
        self.registry().remove_market_data_handler(handler);
    }

    pub fn add_order_report_handler(&self, handler: MessageHandler) {
        self.registry().add_order_report_handler(handler);
    }

    pub fn remove_order_report_handler(&self, handler: &MessageHandler) {
        self.registry().remove_order_report_handler(handler);
    }

    pub fn add_error_handler(&self, handler: ErrorHandler) {
        self.registry().add_error_handler(handler);
    }

    pub fn remove_error_handler(&self, handler: &ErrorHandler) {
        self.registry().remove_error_handler(handler);
    }

    pub fn set_exception_handler(&self, handler: Option<ExceptionHandler>) {
        self.registry().set_exception_handler(handler);
    }

    /// Subscribes to market data for the given instruments.
    pub async fn market_data_subscription(
        &self,
        tickers: Vec<String>,
        entries: Vec<MarketDataEntry>,
        depth: u32,
        market: Market,
    ) -> Result<()> {
        let frame = MarketDataSubscription::new(tickers, entries, depth, market);
        self.send_frame(&frame).await
    }

    /// Subscribes to order reports for `account`.
    pub async fn order_report_subscription(
        &self,
        account: &str,
        snapshot_only_active: bool,
    ) -> Result<()> {
        let frame = OrderReportSubscription::new(account, snapshot_only_active);
        self.send_frame(&frame).await
    }

    /// Sends a new order through the streaming order-routing path.
    pub async fn send_order(&self, order: &NewOrder, account: &str) -> Result<()> {
        order.validate()?;
        let frame = NewOrderFrame::new(order, account);
        self.send_frame(&frame).await
    }

    /// Requests cancellation of the order identified by `client_order_id`.
    pub async fn cancel_order(&self, client_order_id: &str, proprietary: &str) -> Result<()> {
        let frame = CancelOrderFrame::new(client_order_id, proprietary);
        self.send_frame(&frame).await
    }

    async fn send_frame<T: Serialize>(&self, frame: &T) -> Result<()> {
        let text = serde_json::to_string(frame)?;
        let mut guard = self.sink.lock().await;
        let sink = guard.as_mut().ok_or(RofexError::NotConnected)?;
        debug!(%text, "sending frame");
        sink.send(Message::text(text)).await?;
        Ok(())
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, HandlerRegistry> {
        self.handlers.lock().expect("handler registry lock poisoned")
    }
}

/// Body of the background receive task: one handshake, then read and dispatch
/// until the socket goes away.
async fn receive_loop(
    request: tokio_tungstenite::tungstenite::handshake::client::Request,
    heartbeat: Duration,
    sink: SharedSink,
    handlers: SharedRegistry,
    connected: Arc<AtomicBool>,
    open_tx: oneshot::Sender<()>,
) {
    let (stream, _response) = match connect_async(request).await {
        Ok(ok) => ok,
        Err(e) => {
            error!("websocket handshake failed: {e}");
            forward_exception(&handlers, &RofexError::WebSocket(e));
            return;
        }
    };
    info!("websocket connected");

    let (write, mut read) = stream.split();
    *sink.lock().await = Some(write);
    connected.store(true, Ordering::SeqCst);
    let _ = open_tx.send(());

    let mut ping = interval(heartbeat);
    ping.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick of a tokio interval fires immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => dispatch_frame(&handlers, text.as_str()),
                    Some(Ok(Message::Ping(payload))) => {
                        let mut guard = sink.lock().await;
                        if let Some(s) = guard.as_mut() {
                            let _ = s.send(Message::Pong(payload)).await;
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        info!("websocket closed by server");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!("websocket transport error: {e}");
                        sink.lock().await.take();
                        forward_exception(&handlers, &RofexError::WebSocket(e));
                        break;
                    }
                    None => {
                        warn!("websocket stream ended");
                        break;
                    }
                }
            }
            _ = ping.tick() => {
                let mut guard = sink.lock().await;
                match guard.as_mut() {
                    Some(s) => {
                        if let Err(e) = s.send(Message::Ping(Vec::new().into())).await {
                            error!("heartbeat ping failed: {e}");
                            guard.take();
                            drop(guard);
                            forward_exception(&handlers, &RofexError::WebSocket(e));
                            break;
                        }
                    }
                    // Sink is gone: close() was called.
                    None => break,
                }
            }
        }
    }

    connected.store(false, Ordering::SeqCst);
    sink.lock().await.take();
    debug!("receive loop finished");
}

/// Parses and dispatches one inbound text frame.
///
/// Never panics into the receive loop: parse failures become `Protocol` errors
/// on the exception handler and a panicking subscriber only skips itself.
fn dispatch_frame(handlers: &SharedRegistry, text: &str) {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            let err = RofexError::Protocol(format!("malformed frame: {e}"));
            warn!(%err, frame = text, "dropping unparseable frame");
            forward_exception(handlers, &err);
            return;
        }
    };

    match classify(value) {
        Classified::MarketData(msg) => {
            let snapshot = handlers
                .lock()
                .expect("handler registry lock poisoned")
                .market_data_handlers();
            fan_out(handlers, &snapshot, &msg);
        }
        Classified::OrderReport(msg) => {
            let snapshot = handlers
                .lock()
                .expect("handler registry lock poisoned")
                .order_report_handlers();
            fan_out(handlers, &snapshot, &msg);
        }
        Classified::Error(msg) => {
            fan_out_error(handlers, &ErrorEvent::Api(msg));
        }
        Classified::Unsupported(notice) => {
            warn!(%notice, "unsupported inbound message");
            fan_out_error(handlers, &ErrorEvent::Unsupported(notice));
        }
    }
}

fn fan_out(handlers: &SharedRegistry, snapshot: &[MessageHandler], msg: &Value) {
    for handler in snapshot {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(msg))) {
            forward_exception(handlers, &RofexError::Callback(panic_message(payload)));
        }
    }
}

fn fan_out_error(handlers: &SharedRegistry, event: &ErrorEvent) {
    let snapshot = handlers
        .lock()
        .expect("handler registry lock poisoned")
        .error_handlers();
    for handler in &snapshot {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| handler(event))) {
            forward_exception(handlers, &RofexError::Callback(panic_message(payload)));
        }
    }
}

/// Hands an error to the exception handler without holding the registry lock,
/// or logs and drops it when no handler is registered.
fn forward_exception(handlers: &SharedRegistry, error: &RofexError) {
    let handler = handlers
        .lock()
        .expect("handler registry lock poisoned")
        .exception_handler();
    match handler {
        Some(handler) => handler(error),
        None => warn!(%error, "no exception handler registered, dropping error"),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
