//! Serialized outbound frames
//!
//! Routers serialize an event once and hand the same frame to every
//! recipient. `Bytes` is reference counted, so fan-out to N connections
//! costs N pointer copies rather than N serializations.

use bytes::Bytes;
use serde::Serialize;

/// A JSON text payload ready to be written to a WebSocket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundFrame {
    data: Bytes,
}

impl OutboundFrame {
    /// Serialize a value as JSON
    pub fn encode<T: Serialize>(value: &T) -> serde_json::Result<Self> {
        let data = serde_json::to_vec(value)?;
        Ok(Self {
            data: Bytes::from(data),
        })
    }

    /// Raw JSON bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// JSON text
    pub fn as_str(&self) -> &str {
        // Always constructed from serde_json output, which is valid UTF-8
        std::str::from_utf8(&self.data).unwrap_or_default()
    }

    /// Consume the frame, returning the shared buffer
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Length of the payload in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_shares_buffer() {
        let frame = OutboundFrame::encode(&json!({"type": "menu_update"})).unwrap();
        let copy = frame.clone();

        assert_eq!(frame.as_bytes().as_ptr(), copy.as_bytes().as_ptr());
        assert_eq!(frame.as_str(), r#"{"type":"menu_update"}"#);
        assert!(!frame.is_empty());
    }
}
