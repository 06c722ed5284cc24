//! OpenRTB Dynamic Native Ads 1.1 request objects (section 4).
//!
//! These are plain values. How each member maps to JSON is declared in
//! [`crate::bindings`], not here.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::enums::{
    ContextSubType, ContextType, DataType, ImageType, PlacementType, VideoBidResponseProtocol,
};

/// A scalar paired with whether it was present in the input.
///
/// When absent, `value` holds the field's declared default (or the type's
/// zero value when none is declared). Absent scalars are not encoded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Tagged<S> {
    pub value: S,
    pub present: bool,
}

impl<S> Tagged<S> {
    pub fn new(value: S) -> Self {
        Tagged {
            value,
            present: true,
        }
    }

    pub fn absent(default: S) -> Self {
        Tagged {
            value: default,
            present: false,
        }
    }

    /// The value when present.
    pub fn get(&self) -> Option<&S> {
        self.present.then_some(&self.value)
    }

    pub fn set(&mut self, value: S) {
        self.value = value;
        self.present = true;
    }
}

pub type TaggedInt = Tagged<i64>;
pub type TaggedFloat = Tagged<f64>;
pub type TaggedBool = Tagged<bool>;

/// Asset identifier. Always carried as text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct Id(pub String);

impl Id {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id(value.to_string())
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct MimeType(pub String);

impl From<&str> for MimeType {
    fn from(value: &str) -> Self {
        MimeType(value.to_string())
    }
}

/// 4.3 Title Object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Title {
    /// Maximum length of the text in the title element.
    pub len: TaggedInt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// 4.4 Image Object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Image {
    #[serde(rename = "type")]
    pub image_type: ImageType,
    pub w: TaggedInt,
    pub wmin: TaggedInt,
    pub h: TaggedInt,
    pub hmin: TaggedInt,
    /// Whitelist of content MIME types; empty means all.
    pub mimes: Vec<MimeType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// 4.5 Video Object
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Video {
    pub mimes: Vec<MimeType>,
    /// Minimum duration in seconds.
    pub minduration: TaggedFloat,
    /// Maximum duration in seconds.
    pub maxduration: TaggedFloat,
    pub protocols: Vec<VideoBidResponseProtocol>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// 4.6 Data Object: brand name, ratings, prices and other non-core elements.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Data {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub len: TaggedInt,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

/// 4.2 Asset Object
///
/// Well-formed input populates exactly one of `title`, `img`, `video` and
/// `data`. That rule belongs to consumers; nothing here enforces it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Asset {
    pub id: Id,
    pub required: TaggedBool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub img: Option<Image>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Video>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Data>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
}

impl Asset {
    pub const DEFAULT_REQUIRED: bool = false;
}

impl Default for Asset {
    fn default() -> Self {
        Asset {
            id: Id::default(),
            required: Tagged::absent(Self::DEFAULT_REQUIRED),
            title: None,
            img: None,
            video: None,
            data: None,
            ext: None,
        }
    }
}

/// 4.1 Native Markup Request Object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NativeRequest {
    /// Version of the Native Markup in use.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ver: Option<String>,
    pub context_type: ContextType,
    pub context_sub_type: ContextSubType,
    pub placement_type: PlacementType,
    /// Number of identical placements in this layout.
    pub placement_count: TaggedInt,
    /// 0 for the first ad, 1 for the second and so on. Not meant to be
    /// combined with `placement_count`.
    pub seq: TaggedInt,
    pub assets: Vec<Asset>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ext: Option<Value>,
    /// Input the schema could not map, keyed by its original JSON path.
    pub unparseable: Value,
}

impl NativeRequest {
    pub const DEFAULT_PLACEMENT_COUNT: i64 = 1;
    pub const DEFAULT_SEQ: i64 = 0;

    /// True when some input was set aside during decode.
    pub fn has_residual(&self) -> bool {
        match &self.unparseable {
            Value::Object(map) => !map.is_empty(),
            Value::Null => false,
            _ => true,
        }
    }
}

impl Default for NativeRequest {
    fn default() -> Self {
        NativeRequest {
            ver: None,
            context_type: ContextType::Unspecified,
            context_sub_type: ContextSubType::Unspecified,
            placement_type: PlacementType::Unspecified,
            placement_count: Tagged::absent(Self::DEFAULT_PLACEMENT_COUNT),
            seq: Tagged::absent(Self::DEFAULT_SEQ),
            assets: Vec::new(),
            ext: None,
            unparseable: Value::Object(Map::new()),
        }
    }
}
