//! OpenRTB Dynamic Native Ads 1.1 request codec.
//!
//! Decoding never drops input: whatever the schema cannot map lands in
//! [`NativeRequest::unparseable`] under its original JSON path. Only text
//! that is not JSON, or a root that is not an object, fails.

pub mod bindings;
pub mod codec;
pub mod config;
pub mod description;
pub mod enums;
pub mod error;
pub mod native;
pub mod path;

pub use bindings::{default_codec, FieldDoc, NativeCodec, RESIDUAL_KEY};
pub use config::{CodecConfig, ImageSizeBinding, NativeConfig, ResidualOutput};
pub use description::DecodeReport;
pub use enums::{
    ContextSubType, ContextType, DataType, ImageType, NativeEnum, PlacementType,
    VideoBidResponseProtocol,
};
pub use error::{NativeError, Result};
pub use native::{
    Asset, Data, Id, Image, MimeType, NativeRequest, Tagged, TaggedBool, TaggedFloat, TaggedInt,
    Title, Video,
};

pub fn from_str(json: &str) -> Result<NativeRequest> {
    default_codec().decode_str(json)
}

pub fn from_slice(json: &[u8]) -> Result<NativeRequest> {
    default_codec().decode_slice(json)
}

pub fn from_value(value: &serde_json::Value) -> Result<NativeRequest> {
    default_codec().decode_value(value)
}

pub fn to_value(request: &NativeRequest) -> serde_json::Value {
    default_codec().encode_value(request)
}

pub fn to_string(request: &NativeRequest) -> Result<String> {
    default_codec().encode_string(request)
}
