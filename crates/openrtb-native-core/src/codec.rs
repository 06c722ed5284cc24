//! Member-level codecs and the per-decode context they report into.

use serde_json::{Map, Number, Value};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::description::StructureDescription;
use crate::enums::NativeEnum;
use crate::error::FieldError;
use crate::native::{Id, MimeType, Tagged};
use crate::path::{insert_at, JsonPath};

/// Why a piece of input ended up in the residual document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResidualReason {
    UnknownField,
    Mismatch(FieldError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResidualEntry {
    pub path: JsonPath,
    pub reason: ResidualReason,
}

/// State of one in-flight decode: where we are and what was set aside.
#[derive(Debug)]
pub struct DecodeContext {
    path: JsonPath,
    residual: Value,
    entries: Vec<ResidualEntry>,
}

impl Default for DecodeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl DecodeContext {
    pub fn new() -> Self {
        DecodeContext {
            path: JsonPath::new(),
            residual: Value::Object(Map::new()),
            entries: Vec::new(),
        }
    }

    pub fn path(&self) -> &JsonPath {
        &self.path
    }

    pub fn within_field<R>(&mut self, key: &str, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push_field(key);
        let out = f(self);
        self.path.pop();
        out
    }

    pub fn within_index<R>(&mut self, index: usize, f: impl FnOnce(&mut Self) -> R) -> R {
        self.path.push_index(index);
        let out = f(self);
        self.path.pop();
        out
    }

    /// Copies a subtree no binding claimed into the residual at the current path.
    pub fn capture_unknown(&mut self, value: &Value) {
        log::debug!("capturing unknown field {}", self.path);
        self.capture(value, ResidualReason::UnknownField);
    }

    /// Copies a value its codec rejected into the residual at the current path.
    pub fn capture_mismatch(&mut self, value: &Value, err: FieldError) {
        log::warn!("unparseable value at {}: {}", self.path, err);
        self.capture(value, ResidualReason::Mismatch(err));
    }

    fn capture(&mut self, value: &Value, reason: ResidualReason) {
        insert_at(&mut self.residual, self.path.segments(), value.clone());
        self.entries.push(ResidualEntry {
            path: self.path.clone(),
            reason,
        });
    }

    pub fn finish(self) -> (Value, Vec<ResidualEntry>) {
        (self.residual, self.entries)
    }
}

/// Maps one member to and from its JSON value.
pub trait ValueCodec<V>: Send + Sync + 'static {
    fn decode(&self, value: &Value, ctx: &mut DecodeContext) -> Result<V, FieldError>;

    /// `None` leaves the key out of the encoded object.
    fn encode(&self, value: &V) -> Option<Value>;

    /// Value installed when the key is missing from input.
    fn absent(&self) -> Option<V> {
        None
    }
}

/// Scalars that can sit inside a [`Tagged`].
pub trait TaggedScalar: Copy + Send + Sync + 'static {
    const EXPECTED: &'static str;

    fn from_json(value: &Value) -> Option<Self>;
    fn to_json(&self) -> Value;
}

impl TaggedScalar for i64 {
    const EXPECTED: &'static str = "integer";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_i64()
    }

    fn to_json(&self) -> Value {
        Value::from(*self)
    }
}

impl TaggedScalar for f64 {
    const EXPECTED: &'static str = "number";

    fn from_json(value: &Value) -> Option<Self> {
        value.as_f64()
    }

    fn to_json(&self) -> Value {
        Number::from_f64(*self).map_or(Value::Null, Value::Number)
    }
}

impl TaggedScalar for bool {
    const EXPECTED: &'static str = "boolean or 0/1";

    // OpenRTB flags are integers on the wire; JSON booleans are accepted too.
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => match n.as_i64() {
                Some(0) => Some(false),
                Some(1) => Some(true),
                _ => None,
            },
            _ => None,
        }
    }

    fn to_json(&self) -> Value {
        Value::from(i64::from(*self))
    }
}

/// Tagged scalar with an optional per-field default.
#[derive(Debug, Clone, Copy, Default)]
pub struct TaggedCodec<S> {
    default: Option<S>,
}

impl<S: TaggedScalar> TaggedCodec<S> {
    pub fn new() -> Self {
        TaggedCodec { default: None }
    }

    pub fn with_default(default: S) -> Self {
        TaggedCodec {
            default: Some(default),
        }
    }
}

impl<S: TaggedScalar> ValueCodec<Tagged<S>> for TaggedCodec<S> {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<Tagged<S>, FieldError> {
        S::from_json(value)
            .map(Tagged::new)
            .ok_or_else(|| FieldError::mismatch(S::EXPECTED, value))
    }

    fn encode(&self, value: &Tagged<S>) -> Option<Value> {
        value.present.then(|| value.value.to_json())
    }

    fn absent(&self) -> Option<Tagged<S>> {
        self.default.map(Tagged::absent)
    }
}

pub struct EnumCodec<E>(PhantomData<fn() -> E>);

impl<E> EnumCodec<E> {
    pub fn new() -> Self {
        EnumCodec(PhantomData)
    }
}

impl<E> Default for EnumCodec<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: NativeEnum> ValueCodec<E> for EnumCodec<E> {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<E, FieldError> {
        value
            .as_i64()
            .map(E::from_code)
            .ok_or_else(|| FieldError::mismatch("integer code", value))
    }

    fn encode(&self, value: &E) -> Option<Value> {
        value.code().map(Value::from)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct StringCodec;

impl ValueCodec<Option<String>> for StringCodec {
    fn decode(
        &self,
        value: &Value,
        _ctx: &mut DecodeContext,
    ) -> Result<Option<String>, FieldError> {
        value
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| FieldError::mismatch("string", value))
    }

    fn encode(&self, value: &Option<String>) -> Option<Value> {
        value.as_ref().map(|s| Value::String(s.clone()))
    }
}

/// Identifiers may arrive as strings or integers; they always leave as strings.
#[derive(Debug, Clone, Copy, Default)]
pub struct StringIdCodec;

impl ValueCodec<Id> for StringIdCodec {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<Id, FieldError> {
        match value {
            Value::String(s) => Ok(Id(s.clone())),
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Id(n.to_string())),
            _ => Err(FieldError::mismatch("string or integer id", value)),
        }
    }

    fn encode(&self, value: &Id) -> Option<Value> {
        (!value.is_empty()).then(|| Value::String(value.0.clone()))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MimeTypeCodec;

impl ValueCodec<MimeType> for MimeTypeCodec {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<MimeType, FieldError> {
        value
            .as_str()
            .map(|s| MimeType(s.to_string()))
            .ok_or_else(|| FieldError::mismatch("MIME type string", value))
    }

    fn encode(&self, value: &MimeType) -> Option<Value> {
        Some(Value::String(value.0.clone()))
    }
}

/// Opaque `ext` blobs, kept as-is.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl ValueCodec<Option<Value>> for JsonCodec {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<Option<Value>, FieldError> {
        Ok(Some(value.clone()))
    }

    fn encode(&self, value: &Option<Value>) -> Option<Value> {
        value.clone()
    }
}

/// The residual document when it is read back from input.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResidualCodec;

impl ValueCodec<Value> for ResidualCodec {
    fn decode(&self, value: &Value, _ctx: &mut DecodeContext) -> Result<Value, FieldError> {
        if value.is_object() {
            Ok(value.clone())
        } else {
            Err(FieldError::mismatch("object", value))
        }
    }

    fn encode(&self, value: &Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::Object(map) if map.is_empty() => None,
            other => Some(other.clone()),
        }
    }
}

pub struct OptionalCodec<C>(pub C);

impl<V, C> ValueCodec<Option<V>> for OptionalCodec<C>
where
    V: 'static,
    C: ValueCodec<V>,
{
    fn decode(&self, value: &Value, ctx: &mut DecodeContext) -> Result<Option<V>, FieldError> {
        self.0.decode(value, ctx).map(Some)
    }

    fn encode(&self, value: &Option<V>) -> Option<Value> {
        value.as_ref().and_then(|v| self.0.encode(v))
    }
}

/// Ordered sequence. Elements the inner codec rejects are captured at their
/// own index and dropped from the typed list; the rest keep input order.
pub struct ListCodec<C> {
    inner: C,
    omit_empty: bool,
}

impl<C> ListCodec<C> {
    pub fn new(inner: C) -> Self {
        ListCodec {
            inner,
            omit_empty: true,
        }
    }

    /// Emit `[]` instead of leaving the key out when the list is empty.
    pub fn always_emit(mut self) -> Self {
        self.omit_empty = false;
        self
    }
}

impl<V, C> ValueCodec<Vec<V>> for ListCodec<C>
where
    V: 'static,
    C: ValueCodec<V>,
{
    fn decode(&self, value: &Value, ctx: &mut DecodeContext) -> Result<Vec<V>, FieldError> {
        let items = value
            .as_array()
            .ok_or_else(|| FieldError::mismatch("array", value))?;
        let mut out = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            ctx.within_index(index, |ctx| match self.inner.decode(item, ctx) {
                Ok(decoded) => out.push(decoded),
                Err(err) => ctx.capture_mismatch(item, err),
            });
        }
        Ok(out)
    }

    fn encode(&self, value: &Vec<V>) -> Option<Value> {
        if value.is_empty() && self.omit_empty {
            return None;
        }
        Some(Value::Array(
            value.iter().filter_map(|v| self.inner.encode(v)).collect(),
        ))
    }
}

/// Nested object handled by its own structure description.
pub struct StructCodec<T> {
    description: Arc<StructureDescription<T>>,
}

impl<T> StructCodec<T> {
    pub fn new(description: Arc<StructureDescription<T>>) -> Self {
        StructCodec { description }
    }
}

impl<T: Default + 'static> ValueCodec<T> for StructCodec<T> {
    fn decode(&self, value: &Value, ctx: &mut DecodeContext) -> Result<T, FieldError> {
        self.description.decode(value, ctx)
    }

    fn encode(&self, value: &T) -> Option<Value> {
        Some(self.description.encode(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::ContextType;
    use crate::error::JsonKind;
    use crate::path::lookup;
    use serde_json::json;

    #[test]
    fn tagged_int_decodes_and_defaults() {
        let mut ctx = DecodeContext::new();
        let codec = TaggedCodec::with_default(1_i64);
        assert_eq!(codec.decode(&json!(3), &mut ctx), Ok(Tagged::new(3)));
        assert_eq!(codec.absent(), Some(Tagged::absent(1)));
        assert_eq!(codec.encode(&Tagged::absent(1)), None);
        assert_eq!(codec.encode(&Tagged::new(1)), Some(json!(1)));

        let err = codec.decode(&json!("oops"), &mut ctx).unwrap_err();
        assert_eq!(err.found, JsonKind::String);
        assert_eq!(TaggedCodec::<i64>::new().absent(), None);
    }

    #[test]
    fn tagged_bool_accepts_openrtb_flags() {
        let mut ctx = DecodeContext::new();
        let codec = TaggedCodec::with_default(false);
        assert_eq!(codec.decode(&json!(1), &mut ctx), Ok(Tagged::new(true)));
        assert_eq!(codec.decode(&json!(false), &mut ctx), Ok(Tagged::new(false)));
        assert!(codec.decode(&json!(2), &mut ctx).is_err());
        assert_eq!(codec.encode(&Tagged::new(true)), Some(json!(1)));
    }

    #[test]
    fn tagged_float_accepts_integers() {
        let mut ctx = DecodeContext::new();
        let codec = TaggedCodec::<f64>::new();
        assert_eq!(codec.decode(&json!(15), &mut ctx), Ok(Tagged::new(15.0)));
        assert_eq!(codec.encode(&Tagged::new(7.5)), Some(json!(7.5)));
    }

    #[test]
    fn enum_codec_keeps_unknown_codes_and_omits_sentinel() {
        let mut ctx = DecodeContext::new();
        let codec = EnumCodec::<ContextType>::new();
        let decoded = codec.decode(&json!(99), &mut ctx).unwrap();
        assert_eq!(decoded, ContextType::Unrecognized(99));
        assert_eq!(codec.encode(&decoded), Some(json!(99)));
        assert_eq!(codec.encode(&ContextType::Unspecified), None);
        assert!(codec.decode(&json!("1"), &mut ctx).is_err());
    }

    #[test]
    fn string_id_accepts_integers() {
        let mut ctx = DecodeContext::new();
        assert_eq!(StringIdCodec.decode(&json!(42), &mut ctx), Ok(Id::from("42")));
        assert_eq!(StringIdCodec.decode(&json!("a1"), &mut ctx), Ok(Id::from("a1")));
        assert!(StringIdCodec.decode(&json!(1.5), &mut ctx).is_err());
        assert_eq!(StringIdCodec.encode(&Id::from("42")), Some(json!("42")));
        assert_eq!(StringIdCodec.encode(&Id::default()), None);
    }

    #[test]
    fn list_codec_captures_bad_elements_at_their_index() {
        let mut ctx = DecodeContext::new();
        let codec = ListCodec::new(MimeTypeCodec);
        let decoded = ctx.within_field("mimes", |ctx| {
            codec.decode(&json!(["image/png", 7, "image/jpeg", "image/png"]), ctx)
        });
        assert_eq!(
            decoded.unwrap(),
            vec![
                MimeType::from("image/png"),
                MimeType::from("image/jpeg"),
                MimeType::from("image/png"),
            ]
        );
        let (residual, entries) = ctx.finish();
        assert_eq!(residual, json!({"mimes": [null, 7]}));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].path.to_string(), "mimes[1]");
    }

    #[test]
    fn list_codec_empty_handling() {
        let omit = ListCodec::new(MimeTypeCodec);
        assert_eq!(omit.encode(&Vec::new()), None);
        let keep = ListCodec::new(MimeTypeCodec).always_emit();
        assert_eq!(keep.encode(&Vec::new()), Some(json!([])));
    }

    #[test]
    fn context_records_paths() {
        let mut ctx = DecodeContext::new();
        ctx.within_field("vendorX", |ctx| ctx.capture_unknown(&json!({"a": [1, 2, 3]})));
        assert!(ctx.path().is_empty());
        let (residual, entries) = ctx.finish();
        assert_eq!(
            lookup(&residual, entries[0].path.segments()),
            Some(&json!({"a": [1, 2, 3]}))
        );
        assert_eq!(entries[0].reason, ResidualReason::UnknownField);
    }

    #[test]
    fn residual_codec_omits_empty() {
        assert_eq!(ResidualCodec.encode(&json!({})), None);
        assert_eq!(ResidualCodec.encode(&json!({"a": 1})), Some(json!({"a": 1})));
    }
}
