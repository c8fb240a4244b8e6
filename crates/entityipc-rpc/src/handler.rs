use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::value::RawValue;

use crate::envelope::RemoteError;

/// Generic key-value shape for handlers that do not declare their own input type.
pub type JsonMap = serde_json::Map<String, serde_json::Value>;

type ErasedHandler = dyn Fn(&RawValue) -> Result<Box<RawValue>, RemoteError> + Send + Sync;

/// An inbound-call handler together with the input shape it expects.
///
/// The shape is the handler's Rust input type: raw payloads are decoded into
/// it when a call arrives, and a payload that does not fit is answered with an
/// `invalid request` error instead of reaching the handler. Cloning is cheap,
/// so one binding can serve many connections.
#[derive(Clone)]
pub struct HandlerBinding {
    shape: &'static str,
    handler: Arc<ErasedHandler>,
}

impl HandlerBinding {
    /// Bind `handler`, decoding payloads into `T` and encoding its `R` result.
    /// The `Display` text of a handler error becomes the remote error message.
    pub fn new<T, R, E, F>(handler: F) -> Self
    where
        T: DeserializeOwned + 'static,
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(T) -> Result<R, E> + Send + Sync + 'static,
    {
        let erased = move |payload: &RawValue| -> Result<Box<RawValue>, RemoteError> {
            let request: T = serde_json::from_str(payload.get())
                .map_err(|err| RemoteError::new(format!("invalid request: {err}")))?;
            let response = handler(request).map_err(|err| RemoteError::new(err.to_string()))?;
            serde_json::value::to_raw_value(&response)
                .map_err(|err| RemoteError::new(format!("failed to encode response: {err}")))
        };
        Self {
            shape: std::any::type_name::<T>(),
            handler: Arc::new(erased),
        }
    }

    /// Bind a handler taking the generic [`JsonMap`] shape.
    pub fn map<R, E, F>(handler: F) -> Self
    where
        R: Serialize + 'static,
        E: fmt::Display + 'static,
        F: Fn(JsonMap) -> Result<R, E> + Send + Sync + 'static,
    {
        Self::new::<JsonMap, R, E, F>(handler)
    }

    /// Name of the input type payloads are decoded into.
    pub fn shape(&self) -> &'static str {
        self.shape
    }

    pub(crate) fn invoke(&self, payload: &RawValue) -> Result<Box<RawValue>, RemoteError> {
        (self.handler)(payload)
    }
}

impl fmt::Debug for HandlerBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerBinding")
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}
