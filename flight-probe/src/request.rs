use std::collections::BTreeMap;

use arrow_flight::Ticket;
use bytes::Bytes;
use serde::Serialize;

use crate::error::Result;

/// Action requested when nothing else is configured.
pub const DEFAULT_ACTION: &str = "get_all";

#[derive(Serialize)]
struct ActionCommand<'a> {
    action: &'a str,
    #[serde(flatten)]
    params: &'a BTreeMap<String, String>,
}

/// Opaque payload sent to the server as the `DoGet` ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    payload: Bytes,
}

impl RequestDescriptor {
    /// Use `payload` verbatim.
    pub fn raw(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
        }
    }

    /// Encode `{"action": name, ...params}` as a JSON ticket.
    ///
    /// # Example
    ///
    /// ```rust
    /// use flight_probe::RequestDescriptor;
    ///
    /// let request = RequestDescriptor::action("filter_dept", [("department", "Teacher")])?;
    /// assert_eq!(
    ///     request.as_str(),
    ///     Some(r#"{"action":"filter_dept","department":"Teacher"}"#)
    /// );
    /// # Ok::<(), flight_probe::ProbeError>(())
    /// ```
    pub fn action<I, K, V>(name: &str, params: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params: BTreeMap<String, String> = params
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| k != "action")
            .collect();
        let payload = serde_json::to_vec(&ActionCommand {
            action: name,
            params: &params,
        })?;
        Ok(Self::raw(payload))
    }

    /// Bytes exactly as they go on the wire.
    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// The payload as text, when it is valid UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// Wrap the payload in a Flight ticket.
    pub fn to_ticket(&self) -> Ticket {
        Ticket::new(self.payload.clone())
    }
}

impl Default for RequestDescriptor {
    fn default() -> Self {
        Self::raw(Bytes::from_static(br#"{"action":"get_all"}"#))
    }
}
