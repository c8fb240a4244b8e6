//! One connection: a dispatch loop reading frames plus any number of
//! concurrent callers writing them.
//!
//! Every inbound frame is either a call from the peer, answered with the
//! registered handler, or a reply to one of our own calls, handed to the
//! waiting caller through the pending table. Replies may arrive in any order.

use std::fmt;
use std::io::Read;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Duration;

use entityipc_frame::{FrameError, FrameReader, FrameWriter};
use entityipc_transport::{Duplex, DuplexWriter, TransportError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;
use tracing::{debug, trace, warn};

use crate::config::ConnectionConfig;
use crate::envelope::{Envelope, Message, RemoteError, Reply};
use crate::error::{Result, RpcError};
use crate::handler::{HandlerBinding, JsonMap};
use crate::ids::{IdSource, RandomIds};
use crate::pending::{Delivery, PendingCalls, RegisterError};

const CLOSED_BY_PEER: &str = "stream closed by peer";
const CLOSED_LOCALLY: &str = "connection closed locally";
const HANDLER_PANICKED: &str = "handler panicked";

type SharedWriter = FrameWriter<Box<dyn DuplexWriter>>;

/// A bidirectional call channel over one duplex stream.
///
/// Both sides are symmetric: each may register a handler for inbound calls
/// and issue calls of its own. `Connection` is `Sync`; share it behind an
/// `Arc` to issue calls from several threads while the dispatch loop runs.
pub struct Connection {
    config: ConnectionConfig,
    pending: PendingCalls,
    writer: Mutex<Option<SharedWriter>>,
    handler: RwLock<Option<HandlerBinding>>,
    ids: Mutex<Box<dyn IdSource>>,
    started: AtomicBool,
}

impl Connection {
    pub fn new() -> Self {
        Self::with_config(ConnectionConfig::default())
    }

    pub fn with_config(config: ConnectionConfig) -> Self {
        Self::with_id_source(config, RandomIds::new())
    }

    /// Use `ids` instead of the default random source for outgoing calls.
    pub fn with_id_source(config: ConnectionConfig, ids: impl IdSource + 'static) -> Self {
        Self {
            config,
            pending: PendingCalls::new(),
            writer: Mutex::new(None),
            handler: RwLock::new(None),
            ids: Mutex::new(Box::new(ids)),
            started: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Install the handler for inbound calls, replacing any previous one.
    ///
    /// Payloads are decoded into `T`; see [`HandlerBinding::new`].
    pub fn register_handler<T, R, E, F>(&self, handler: F)
    where
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(T) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.set_handler(HandlerBinding::new(handler));
    }

    /// Install a handler taking the generic key-value shape.
    pub fn register_map_handler<R, E, F>(&self, handler: F)
    where
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(JsonMap) -> std::result::Result<R, E> + Send + Sync + 'static,
    {
        self.set_handler(HandlerBinding::map(handler));
    }

    /// Install a prebuilt binding. Calls already executing finish with the
    /// handler they started with.
    pub fn set_handler(&self, binding: HandlerBinding) {
        debug!(shape = binding.shape(), "handler registered");
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = Some(binding);
    }

    /// Remove the handler; inbound calls are answered with "no handler registered".
    pub fn clear_handler(&self) {
        *self.handler.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Input shape of the current handler, if one is registered.
    pub fn handler_shape(&self) -> Option<&'static str> {
        self.handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(HandlerBinding::shape)
    }

    /// Attach `stream` and run the dispatch loop on the current thread.
    ///
    /// Returns `Ok(())` when the peer closes the stream between frames, and
    /// the terminal error otherwise. Either way every call still pending is
    /// failed before this returns. A connection can be started only once.
    pub fn start<S: Duplex>(&self, stream: S) -> Result<()> {
        let reader = self.attach(stream)?;
        self.run(reader)
    }

    /// Attach `stream` and run the dispatch loop on a dedicated thread.
    pub fn spawn<S: Duplex>(self: &Arc<Self>, stream: S) -> Result<JoinHandle<Result<()>>> {
        let reader = self.attach(stream)?;
        let connection = Arc::clone(self);
        std::thread::Builder::new()
            .name("entityipc-dispatch".to_string())
            .spawn(move || connection.run(reader))
            .map_err(|err| {
                self.close();
                RpcError::Transport(TransportError::Io(err))
            })
    }

    /// Call the peer and wait for its reply, bounded by the configured
    /// `call_timeout` if there is one.
    pub fn call<Req, Resp>(&self, request: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.issue(request, self.config.call_timeout)
    }

    /// Call the peer and wait at most `timeout` for its reply.
    ///
    /// A reply arriving after the deadline is discarded by the dispatch loop.
    pub fn call_timeout<Req, Resp>(&self, request: &Req, timeout: Duration) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        self.issue(request, Some(timeout))
    }

    /// Fail pending calls, refuse new ones and shut the write side down.
    ///
    /// For sockets the shutdown also wakes the dispatch loop; for split
    /// pipe pairs the loop ends when the peer closes its side.
    pub fn close(&self) {
        let woken = self.pending.close(CLOSED_LOCALLY);
        self.shutdown_writer();
        debug!(woken, "connection closed");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    pub fn is_closed(&self) -> bool {
        self.pending.is_closed()
    }

    /// Number of calls currently waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    fn attach<S: Duplex>(&self, stream: S) -> Result<FrameReader<S::Reader>> {
        if let Some(reason) = self.pending.closed_reason() {
            return Err(RpcError::ConnectionClosed(reason));
        }
        if self.started.swap(true, Ordering::AcqRel) {
            return Err(RpcError::AlreadyStarted);
        }

        let (reader, writer) = match stream.split() {
            Ok(halves) => halves,
            Err(err) => {
                self.started.store(false, Ordering::Release);
                return Err(err.into());
            }
        };
        let writer: Box<dyn DuplexWriter> = Box::new(writer);
        *self.lock_writer() = Some(FrameWriter::with_config(writer, self.config.frame.clone()));

        debug!(
            max_frame_size = self.config.frame.max_frame_size,
            "stream attached"
        );
        Ok(FrameReader::with_config(reader, self.config.frame.clone()))
    }

    fn run<R: Read>(&self, mut reader: FrameReader<R>) -> Result<()> {
        let result = loop {
            let body = match reader.read_frame() {
                Ok(body) => body,
                Err(FrameError::ConnectionClosed) => break Ok(()),
                Err(err) => break Err(RpcError::Frame(err)),
            };
            if let Err(err) = self.dispatch(&body) {
                break Err(err);
            }
        };
        self.teardown(&result);
        result
    }

    fn dispatch(&self, body: &[u8]) -> Result<()> {
        match Envelope::decode(body)?.into_message()? {
            Message::Reply { id, reply } => {
                if self.pending.deliver(id, reply) {
                    trace!(id, "reply delivered");
                } else {
                    warn!(id, "discarding reply for unknown call id");
                }
                Ok(())
            }
            Message::Call { id, payload } => {
                let outcome = self.answer(id, &payload);
                self.write_envelope(&Envelope::reply(id, outcome))
            }
        }
    }

    fn answer(
        &self,
        id: u32,
        payload: &RawValue,
    ) -> std::result::Result<Box<RawValue>, RemoteError> {
        let binding = self
            .handler
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let Some(binding) = binding else {
            debug!(id, "inbound call with no handler registered");
            return Err(RemoteError::no_handler());
        };

        trace!(id, shape = binding.shape(), "invoking handler");
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| binding.invoke(payload))) {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(id, shape = binding.shape(), "handler panicked");
                return Err(RemoteError::new(HANDLER_PANICKED));
            }
        };
        if let Err(err) = &outcome {
            debug!(id, error = %err, "handler returned error");
        }
        outcome
    }

    fn teardown(&self, result: &Result<()>) {
        let reason = match result {
            Ok(()) => CLOSED_BY_PEER.to_string(),
            Err(err) => err.to_string(),
        };
        let woken = self.pending.close(&reason);
        self.shutdown_writer();

        match result {
            Ok(()) => debug!(woken, "dispatch loop finished"),
            Err(err) => warn!(error = %err, woken, "dispatch loop terminated"),
        }
    }

    fn issue<Req, Resp>(&self, request: &Req, timeout: Option<Duration>) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let payload = serde_json::value::to_raw_value(request).map_err(RpcError::Encode)?;
        let (id, rx) = self.register_call()?;

        if let Err(err) = self.write_envelope(&Envelope::call(id, payload)) {
            self.pending.remove(id);
            return Err(err);
        }
        trace!(id, "call issued");

        let delivery = self.wait_for_reply(id, &rx, timeout);
        self.pending.remove(id);

        match delivery? {
            Delivery::Reply(Reply::Value(raw)) => {
                serde_json::from_str(raw.get()).map_err(RpcError::Decode)
            }
            Delivery::Reply(Reply::Error(err)) => Err(RpcError::Remote(err)),
            Delivery::Closed(reason) => Err(RpcError::ConnectionClosed(reason)),
        }
    }

    fn register_call(&self) -> Result<(u32, Receiver<Delivery>)> {
        let attempts = self.config.max_id_attempts.max(1);
        for _ in 0..attempts {
            let id = self.lock_ids().next_id();
            match self.pending.register(id) {
                Ok(rx) => return Ok((id, rx)),
                Err(RegisterError::Occupied) => {
                    debug!(id, "call id already pending, drawing another");
                }
                Err(RegisterError::Closed(reason)) => {
                    return Err(RpcError::ConnectionClosed(reason));
                }
            }
        }
        Err(RpcError::IdExhausted(attempts))
    }

    fn wait_for_reply(
        &self,
        id: u32,
        rx: &Receiver<Delivery>,
        timeout: Option<Duration>,
    ) -> Result<Delivery> {
        let Some(timeout) = timeout else {
            return rx.recv().map_err(|_| self.closed_error());
        };

        match rx.recv_timeout(timeout) {
            Ok(delivery) => Ok(delivery),
            Err(RecvTimeoutError::Disconnected) => Err(self.closed_error()),
            Err(RecvTimeoutError::Timeout) => {
                if self.pending.remove(id) {
                    debug!(id, ?timeout, "call timed out");
                    return Err(RpcError::Timeout(timeout));
                }
                // The entry was taken between the timeout and the removal, so
                // the delivery is already in the channel.
                rx.try_recv().map_err(|_| RpcError::Timeout(timeout))
            }
        }
    }

    fn write_envelope(&self, envelope: &Envelope) -> Result<()> {
        let body = envelope.encode()?;
        let mut guard = self.lock_writer();
        let Some(writer) = guard.as_mut() else {
            return Err(if self.is_started() {
                self.closed_error()
            } else {
                RpcError::NotStarted
            });
        };

        match writer.send(&body) {
            Ok(()) => Ok(()),
            Err(err) => {
                // A failed write may have left half a frame on the stream.
                if err.is_transport() {
                    if let Some(mut writer) = guard.take() {
                        let _ = writer.get_mut().shutdown();
                    }
                }
                Err(err.into())
            }
        }
    }

    fn shutdown_writer(&self) {
        if let Some(mut writer) = self.lock_writer().take() {
            if let Err(err) = writer.get_mut().shutdown() {
                debug!(error = %err, "write side shutdown failed");
            }
        }
    }

    fn closed_error(&self) -> RpcError {
        RpcError::ConnectionClosed(
            self.pending
                .closed_reason()
                .unwrap_or_else(|| CLOSED_LOCALLY.to_string()),
        )
    }

    fn lock_writer(&self) -> MutexGuard<'_, Option<SharedWriter>> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_ids(&self) -> MutexGuard<'_, Box<dyn IdSource>> {
        self.ids.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("started", &self.is_started())
            .field("closed", &self.is_closed())
            .field("pending", &self.pending.len())
            .field("handler", &self.handler_shape())
            .finish_non_exhaustive()
    }
}
