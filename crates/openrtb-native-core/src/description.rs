//! Structure codecs: an ordered table of key bindings per object type.
//!
//! Decoding walks the input object once. Keys with a binding are handed to
//! that binding's codec; anything else, and any value a codec rejects, is
//! copied into the residual at its path. Encoding emits keys in the order
//! the bindings were declared.

use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::codec::{DecodeContext, ResidualEntry, ValueCodec};
use crate::error::{FieldError, JsonKind, NativeError, Result};
use crate::path::merge_into;

type DecodeFn<T> = Box<
    dyn Fn(&mut T, &Value, &mut DecodeContext) -> std::result::Result<(), FieldError>
        + Send
        + Sync,
>;
type EncodeFn<T> = Box<dyn Fn(&T) -> Option<Value> + Send + Sync>;
type DefaultFn<T> = Box<dyn Fn(&mut T) + Send + Sync>;

/// One `JSON key <-> member` binding.
pub struct FieldBinding<T> {
    key: String,
    description: &'static str,
    decode: DecodeFn<T>,
    encode: EncodeFn<T>,
    apply_default: DefaultFn<T>,
}

impl<T> FieldBinding<T> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn description(&self) -> &'static str {
        self.description
    }
}

/// Everything set aside while decoding one document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodeReport {
    pub residual: Value,
    pub entries: Vec<ResidualEntry>,
}

impl DecodeReport {
    /// True when every input key was mapped onto the typed result.
    pub fn is_clean(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The codec for one structure: an ordered table of bindings, built once and
/// shared read-only afterwards.
pub struct StructureDescription<T> {
    type_name: &'static str,
    fields: Vec<FieldBinding<T>>,
    residual: Option<fn(&mut T) -> &mut Value>,
}

impl<T: Default + 'static> StructureDescription<T> {
    pub fn new(type_name: &'static str) -> Self {
        StructureDescription {
            type_name,
            fields: Vec::new(),
            residual: None,
        }
    }

    /// Binds `key` to the member reached through `get`/`get_mut`, coded by `codec`.
    pub fn field<V, C>(
        mut self,
        key: impl Into<String>,
        description: &'static str,
        get: fn(&T) -> &V,
        get_mut: fn(&mut T) -> &mut V,
        codec: C,
    ) -> Self
    where
        V: 'static,
        C: ValueCodec<V>,
    {
        let codec = Arc::new(codec);
        let decode_codec = Arc::clone(&codec);
        let default_codec = Arc::clone(&codec);
        self.fields.push(FieldBinding {
            key: key.into(),
            description,
            decode: Box::new(
                move |target: &mut T,
                      value: &Value,
                      ctx: &mut DecodeContext|
                      -> std::result::Result<(), FieldError> {
                    *get_mut(target) = decode_codec.decode(value, ctx)?;
                    Ok(())
                },
            ),
            encode: Box::new(move |source: &T| codec.encode(get(source))),
            apply_default: Box::new(move |target: &mut T| {
                if let Some(default) = default_codec.absent() {
                    *get_mut(target) = default;
                }
            }),
        });
        self
    }

    /// Installs the residual accumulated during a document decode into `member`.
    pub fn capture_residual(mut self, member: fn(&mut T) -> &mut Value) -> Self {
        self.residual = Some(member);
        self
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldBinding<T>> {
        self.fields.iter()
    }

    fn binding(&self, key: &str) -> Option<&FieldBinding<T>> {
        self.fields.iter().find(|binding| binding.key == key)
    }

    /// Decodes an object found at the context's current path.
    ///
    /// Keys without a binding and values a binding rejects are copied into
    /// the context's residual; only a non-object `value` fails.
    pub fn decode(
        &self,
        value: &Value,
        ctx: &mut DecodeContext,
    ) -> std::result::Result<T, FieldError> {
        let Value::Object(map) = value else {
            return Err(FieldError::mismatch("object", value));
        };
        let mut out = T::default();
        for binding in &self.fields {
            (binding.apply_default)(&mut out);
        }
        for (key, item) in map {
            ctx.within_field(key, |ctx| match self.binding(key) {
                Some(binding) => {
                    if let Err(err) = (binding.decode)(&mut out, item, ctx) {
                        ctx.capture_mismatch(item, err);
                    }
                }
                None => ctx.capture_unknown(item),
            });
        }
        Ok(out)
    }

    /// Decodes a whole document rooted at this structure.
    pub fn decode_document(&self, value: &Value) -> Result<(T, DecodeReport)> {
        if !value.is_object() {
            return Err(NativeError::UnexpectedRoot {
                found: JsonKind::of(value),
            });
        }
        let mut ctx = DecodeContext::new();
        let mut out = self
            .decode(value, &mut ctx)
            .map_err(|err| NativeError::UnexpectedRoot { found: err.found })?;
        let (residual, entries) = ctx.finish();
        if let Some(member) = self.residual {
            let slot = member(&mut out);
            if !slot.is_object() {
                *slot = Value::Object(Map::new());
            }
            merge_into(slot, &residual);
        }
        if !entries.is_empty() {
            log::debug!(
                "{} decoded with {} residual entries",
                self.type_name,
                entries.len()
            );
        }
        Ok((out, DecodeReport { residual, entries }))
    }

    /// Emits one key per present member, in declaration order.
    pub fn encode(&self, source: &T) -> Value {
        let mut map = Map::new();
        for binding in &self.fields {
            if let Some(value) = (binding.encode)(source) {
                map.insert(binding.key.clone(), value);
            }
        }
        Value::Object(map)
    }
}

impl<T> fmt::Debug for StructureDescription<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StructureDescription")
            .field("type_name", &self.type_name)
            .field(
                "fields",
                &self.fields.iter().map(|b| b.key.as_str()).collect::<Vec<_>>(),
            )
            .field("captures_residual", &self.residual.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{JsonCodec, ResidualCodec, ResidualReason, TaggedCodec};
    use crate::native::Tagged;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Slot {
        w: Tagged<i64>,
        count: Tagged<i64>,
        ext: Option<Value>,
        leftovers: Value,
    }

    fn slot_description() -> StructureDescription<Slot> {
        StructureDescription::<Slot>::new("Slot")
            .field("w", "Width", |s| &s.w, |s| &mut s.w, TaggedCodec::new())
            .field(
                "count",
                "Count",
                |s| &s.count,
                |s| &mut s.count,
                TaggedCodec::with_default(1),
            )
            .field("ext", "Extensions", |s| &s.ext, |s| &mut s.ext, JsonCodec)
            .field(
                "leftovers",
                "Residual",
                |s| &s.leftovers,
                |s| &mut s.leftovers,
                ResidualCodec,
            )
            .capture_residual(|s| &mut s.leftovers)
    }

    #[test]
    fn decode_applies_defaults_and_captures_unknowns() {
        let desc = slot_description();
        let (slot, report) = desc
            .decode_document(&json!({"w": 300, "vendor": {"x": true}}))
            .unwrap();
        assert_eq!(slot.w, Tagged::new(300));
        assert_eq!(slot.count, Tagged::absent(1));
        assert_eq!(slot.leftovers, json!({"vendor": {"x": true}}));
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].reason, ResidualReason::UnknownField);
    }

    #[test]
    fn mismatched_member_is_captured_and_siblings_survive() {
        let desc = slot_description();
        let (slot, report) = desc
            .decode_document(&json!({"w": "wide", "count": 4, "ext": {"k": 1}}))
            .unwrap();
        assert_eq!(slot.w, Tagged::default());
        assert_eq!(slot.count, Tagged::new(4));
        assert_eq!(slot.ext, Some(json!({"k": 1})));
        assert_eq!(slot.leftovers, json!({"w": "wide"}));
        assert!(matches!(
            report.entries[0].reason,
            ResidualReason::Mismatch(FieldError {
                found: JsonKind::String,
                ..
            })
        ));
    }

    #[test]
    fn incoming_residual_is_merged_with_captured_content() {
        let desc = slot_description();
        let (slot, _) = desc
            .decode_document(&json!({"leftovers": {"old": 1}, "new": 2}))
            .unwrap();
        assert_eq!(slot.leftovers, json!({"old": 1, "new": 2}));
    }

    #[test]
    fn non_object_root_is_rejected() {
        let desc = slot_description();
        let err = desc.decode_document(&json!([1, 2])).unwrap_err();
        assert!(matches!(
            err,
            NativeError::UnexpectedRoot {
                found: JsonKind::Array
            }
        ));
    }

    #[test]
    fn encode_follows_declaration_order_and_skips_absent() {
        let desc = slot_description();
        let slot = Slot {
            w: Tagged::new(320),
            count: Tagged::absent(1),
            ext: None,
            leftovers: json!({}),
        };
        assert_eq!(desc.encode(&slot), json!({"w": 320}));
        let keys: Vec<_> = desc.fields().map(|b| b.key()).collect();
        assert_eq!(keys, ["w", "count", "ext", "leftovers"]);
    }
}
