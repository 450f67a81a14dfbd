//! Payload encoding: JSON bodies and flat query strings.
//!
//! Both paths honor the same [`EncodeOptions`], so a payload serializes
//! identically whether it travels as a POST body or as GET query content.
//! Options are applied by reshaping the serialized `serde_json::Value`
//! tree; with default options the tree step is skipped and bytes come
//! straight from the serializer.

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::error::{Error, Result};

/// Key naming applied to serialized payload fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldNaming {
    /// Keys pass through exactly as the payload's `Serialize` produced them.
    #[default]
    Preserve,
    /// `snake_case` keys are rewritten to `camelCase`, recursively through
    /// nested objects and arrays. Keys already in camelCase pass through.
    CamelCase,
}

/// Options governing how payloads are serialized.
///
/// Set once on the client builder; every body and query encoding in that
/// client honors them.
///
/// # Examples
///
/// ```
/// use gantry::{EncodeOptions, FieldNaming};
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Signup {
///     user_name: String,
///     referral_code: Option<String>,
/// }
///
/// let options = EncodeOptions {
///     field_naming: FieldNaming::CamelCase,
///     skip_nulls: true,
/// };
/// let payload = Signup { user_name: "ada".into(), referral_code: None };
/// let bytes = gantry::encode_payload(&payload, &options).unwrap();
/// assert_eq!(&bytes[..], br#"{"userName":"ada"}"#);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct EncodeOptions {
    /// Key naming policy.
    pub field_naming: FieldNaming,
    /// Drop object fields whose serialized value is `null`.
    pub skip_nulls: bool,
}

impl EncodeOptions {
    fn is_passthrough(&self) -> bool {
        self.field_naming == FieldNaming::Preserve && !self.skip_nulls
    }
}

/// Serialize a payload to JSON bytes under the given options.
///
/// The result is cheaply cloneable, so the same buffer is reused across
/// retry attempts without re-serializing.
pub fn encode_payload<B>(payload: &B, options: &EncodeOptions) -> Result<Bytes>
where
    B: Serialize + ?Sized,
{
    if options.is_passthrough() {
        return serde_json::to_vec(payload)
            .map(Bytes::from)
            .map_err(|e| Error::Serialize(e.to_string()));
    }
    let mut value = serde_json::to_value(payload).map_err(|e| Error::Serialize(e.to_string()))?;
    reshape(&mut value, options);
    serde_json::to_vec(&value)
        .map(Bytes::from)
        .map_err(|e| Error::Serialize(e.to_string()))
}

/// Flatten a payload into `url`'s query string under the given options.
///
/// The payload must serialize to a flat JSON object: strings, numbers,
/// and booleans become query pairs, `null` fields are omitted, and any
/// nested object or array is a [`Error::Serialize`] failure. Existing
/// query pairs on the URL are kept.
pub(crate) fn attach_query<B>(url: &mut Url, payload: &B, options: &EncodeOptions) -> Result<()>
where
    B: Serialize + ?Sized,
{
    let mut value = serde_json::to_value(payload).map_err(|e| Error::Serialize(e.to_string()))?;
    reshape(&mut value, options);
    let Value::Object(map) = value else {
        return Err(Error::Serialize(
            "query payloads must serialize to a JSON object".to_string(),
        ));
    };
    if map.is_empty() {
        return Ok(());
    }
    let mut pairs = url.query_pairs_mut();
    for (key, field) in &map {
        match field {
            Value::Null => {}
            Value::String(s) => {
                pairs.append_pair(key, s);
            }
            Value::Bool(b) => {
                pairs.append_pair(key, if *b { "true" } else { "false" });
            }
            Value::Number(n) => {
                pairs.append_pair(key, &n.to_string());
            }
            Value::Array(_) | Value::Object(_) => {
                return Err(Error::Serialize(format!(
                    "query field '{key}' is not a flat value"
                )));
            }
        }
    }
    drop(pairs);
    Ok(())
}

/// Apply naming and null policies to a serialized tree in place.
fn reshape(value: &mut Value, options: &EncodeOptions) {
    match value {
        Value::Object(map) => {
            let entries = std::mem::take(map);
            for (key, mut field) in entries {
                if options.skip_nulls && field.is_null() {
                    continue;
                }
                reshape(&mut field, options);
                let key = match options.field_naming {
                    FieldNaming::Preserve => key,
                    FieldNaming::CamelCase => camel_case(&key),
                };
                map.insert(key, field);
            }
        }
        Value::Array(items) => {
            for item in items {
                reshape(item, options);
            }
        }
        _ => {}
    }
}

/// Rewrite one key to camelCase. Leading separators are kept verbatim so
/// conventionally private `_field` names survive.
fn camel_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut upper_next = false;
    let mut started = false;
    for ch in key.chars() {
        if !started {
            if ch == '_' || ch == '-' {
                out.push(ch);
                continue;
            }
            started = true;
            out.extend(ch.to_lowercase());
            continue;
        }
        if ch == '_' || ch == '-' {
            upper_next = true;
            continue;
        }
        if upper_next {
            upper_next = false;
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
    }
    out
}
