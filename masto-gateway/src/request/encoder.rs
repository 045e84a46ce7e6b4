//! Request payload encoding.
//!
//! Payloads travel either in the query string (GET) or in the body, encoded by
//! the declared media type:
//!
//! | Media type            | Body                                  |
//! |-----------------------|---------------------------------------|
//! | `application/json`    | JSON text                             |
//! | `multipart/form-data` | flattened `key[sub][0]` form fields   |
//! | anything else         | strings verbatim, other values as JSON |

use bytes::{BufMut, Bytes, BytesMut};
use http::HeaderValue;
use masto_gateway_core::{flatten, leaf_to_field};
use rand::Rng;
use serde_json::{Map, Value};

use crate::GatewayError;

/// Default media type for request bodies.
pub const APPLICATION_JSON: &str = "application/json";

/// Media type that triggers flattening into form fields.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

const BOUNDARY_LEN: usize = 32;

/// An encoded request body.
#[derive(Debug)]
pub(crate) struct EncodedBody {
    pub(crate) data: Bytes,
    /// Replacement `Content-Type`, set when the encoding adds parameters.
    pub(crate) content_type: Option<HeaderValue>,
}

/// The media type of a `Content-Type` value, lowercased and without parameters.
pub(crate) fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Encode `payload` for a body declared as `content_type`.
pub(crate) fn encode_body(payload: &Value, content_type: &str) -> Result<EncodedBody, GatewayError> {
    let media = media_type(content_type);
    if media == APPLICATION_JSON || media.ends_with("+json") {
        let data = serde_json::to_vec(payload).map_err(|e| GatewayError::Encode(e.to_string()))?;
        return Ok(EncodedBody {
            data: Bytes::from(data),
            content_type: None,
        });
    }
    if media == MULTIPART_FORM_DATA {
        let boundary = boundary();
        let data = multipart(&flatten(payload), &boundary);
        let content_type = HeaderValue::try_from(format!("{MULTIPART_FORM_DATA}; boundary={boundary}"))
            .map_err(|e| GatewayError::Encode(e.to_string()))?;
        return Ok(EncodedBody {
            data,
            content_type: Some(content_type),
        });
    }
    let data = match payload {
        Value::String(s) => Bytes::from(s.clone()),
        other => Bytes::from(other.to_string()),
    };
    Ok(EncodedBody {
        data,
        content_type: None,
    })
}

fn boundary() -> String {
    let suffix: String = rand::rng()
        .sample_iter(rand::distr::Alphanumeric)
        .take(BOUNDARY_LEN)
        .map(char::from)
        .collect();
    format!("----masto-gateway-{suffix}")
}

fn multipart(fields: &[(String, Value)], boundary: &str) -> Bytes {
    let mut buf = BytesMut::new();
    for (name, value) in fields {
        buf.put_slice(b"--");
        buf.put_slice(boundary.as_bytes());
        buf.put_slice(b"\r\nContent-Disposition: form-data; name=\"");
        buf.put_slice(escape_field_name(name).as_bytes());
        buf.put_slice(b"\"\r\n\r\n");
        buf.put_slice(leaf_to_field(value).as_bytes());
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(b"--");
    buf.put_slice(boundary.as_bytes());
    buf.put_slice(b"--\r\n");
    buf.freeze()
}

fn escape_field_name(name: &str) -> String {
    name.replace('"', "%22")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Encode GET parameters as a query string in bracket notation.
///
/// Arrays use empty brackets (`id[]=1&id[]=2`), the form Rails-style servers
/// read as a list. Null values are dropped. Returns an empty string for an
/// empty or null payload.
pub(crate) fn encode_query(params: &Value) -> Result<String, GatewayError> {
    match strip_nulls(params) {
        Value::Null => Ok(String::new()),
        Value::Object(map) if map.is_empty() => Ok(String::new()),
        value @ Value::Object(_) => {
            serde_qs::Config::new()
                .array_format(serde_qs::ArrayFormat::EmptyIndexed)
                .serialize_string(&value)
                .map_err(|e| GatewayError::Encode(e.to_string()))
        }
        other => Err(GatewayError::Encode(format!(
            "query parameters must be an object, got {other}"
        ))),
    }
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect::<Map<_, _>>(),
        ),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter(|v| !v.is_null())
                .map(strip_nulls)
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}
