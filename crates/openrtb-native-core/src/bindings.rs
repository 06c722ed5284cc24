//! JSON key tables for every native object, and the codec that drives them.

use serde_json::Value;
use std::sync::{Arc, LazyLock};

use crate::codec::{
    EnumCodec, JsonCodec, ListCodec, MimeTypeCodec, OptionalCodec, ResidualCodec, StringCodec,
    StringIdCodec, StructCodec, TaggedCodec,
};
use crate::config::{CodecConfig, ImageSizeBinding, ResidualOutput};
use crate::description::{DecodeReport, StructureDescription};
use crate::error::{NativeError, Result};
use crate::native::{Asset, Data, Image, NativeRequest, Title, Video};
use crate::path::restore_into;

/// Key the residual document is read from and written to.
pub const RESIDUAL_KEY: &str = "unparseable";

fn title_description() -> StructureDescription<Title> {
    StructureDescription::<Title>::new("Title")
        .field(
            "len",
            "Max length of title",
            |t| &t.len,
            |t| &mut t.len,
            TaggedCodec::new(),
        )
        .field(
            "ext",
            "Extensions to the protocol go here",
            |t| &t.ext,
            |t| &mut t.ext,
            JsonCodec,
        )
}

fn image_description(binding: ImageSizeBinding) -> StructureDescription<Image> {
    let desc = StructureDescription::<Image>::new("Image").field(
        "type",
        "Type of image",
        |i| &i.image_type,
        |i| &mut i.image_type,
        EnumCodec::new(),
    );
    let desc = match binding {
        ImageSizeBinding::Standard => desc
            .field("w", "Ad width", |i| &i.w, |i| &mut i.w, TaggedCodec::new())
            .field(
                "wmin",
                "Ad minimum width",
                |i| &i.wmin,
                |i| &mut i.wmin,
                TaggedCodec::new(),
            )
            .field("h", "Ad height", |i| &i.h, |i| &mut i.h, TaggedCodec::new())
            .field(
                "hmin",
                "Ad minimum height",
                |i| &i.hmin,
                |i| &mut i.hmin,
                TaggedCodec::new(),
            ),
        // RTBkit bound the exact-size keys onto the minimum-size members.
        ImageSizeBinding::Legacy => desc
            .field("w", "Ad width", |i| &i.wmin, |i| &mut i.wmin, TaggedCodec::new())
            .field(
                "wmin",
                "Ad minimum width",
                |i| &i.wmin,
                |i| &mut i.wmin,
                TaggedCodec::new(),
            )
            .field("h", "Ad height", |i| &i.hmin, |i| &mut i.hmin, TaggedCodec::new())
            .field(
                "hmin",
                "Ad minimum height",
                |i| &i.hmin,
                |i| &mut i.hmin,
                TaggedCodec::new(),
            ),
    };
    desc.field(
        "mimes",
        "Whitelist of content MIME types (none = all)",
        |i| &i.mimes,
        |i| &mut i.mimes,
        ListCodec::new(MimeTypeCodec),
    )
    .field(
        "ext",
        "Extensions to the protocol go here",
        |i| &i.ext,
        |i| &mut i.ext,
        JsonCodec,
    )
}

fn video_description() -> StructureDescription<Video> {
    StructureDescription::<Video>::new("Video")
        .field(
            "mimes",
            "Content MIME types supported",
            |v| &v.mimes,
            |v| &mut v.mimes,
            ListCodec::new(MimeTypeCodec),
        )
        .field(
            "minduration",
            "Minimum duration in seconds",
            |v| &v.minduration,
            |v| &mut v.minduration,
            TaggedCodec::new(),
        )
        .field(
            "maxduration",
            "Maximum duration in seconds",
            |v| &v.maxduration,
            |v| &mut v.maxduration,
            TaggedCodec::new(),
        )
        .field(
            "protocols",
            "Bid response supported protocols",
            |v| &v.protocols,
            |v| &mut v.protocols,
            ListCodec::new(EnumCodec::new()),
        )
        .field(
            "ext",
            "Extensions to the protocol go here",
            |v| &v.ext,
            |v| &mut v.ext,
            JsonCodec,
        )
}

fn data_description() -> StructureDescription<Data> {
    StructureDescription::<Data>::new("Data")
        .field(
            "type",
            "Type of data",
            |d| &d.data_type,
            |d| &mut d.data_type,
            EnumCodec::new(),
        )
        .field(
            "len",
            "Max length of data",
            |d| &d.len,
            |d| &mut d.len,
            TaggedCodec::new(),
        )
        .field(
            "ext",
            "Extensions to the protocol go here",
            |d| &d.ext,
            |d| &mut d.ext,
            JsonCodec,
        )
}

struct AssetParts {
    title: Arc<StructureDescription<Title>>,
    image: Arc<StructureDescription<Image>>,
    video: Arc<StructureDescription<Video>>,
    data: Arc<StructureDescription<Data>>,
}

fn asset_description(parts: &AssetParts) -> StructureDescription<Asset> {
    StructureDescription::<Asset>::new("Asset")
        .field("id", "Asset ID", |a| &a.id, |a| &mut a.id, StringIdCodec)
        .field(
            "required",
            "Set if this asset is required",
            |a| &a.required,
            |a| &mut a.required,
            TaggedCodec::with_default(Asset::DEFAULT_REQUIRED),
        )
        .field(
            "title",
            "Title object",
            |a| &a.title,
            |a| &mut a.title,
            OptionalCodec(StructCodec::new(Arc::clone(&parts.title))),
        )
        .field(
            "img",
            "Image object",
            |a| &a.img,
            |a| &mut a.img,
            OptionalCodec(StructCodec::new(Arc::clone(&parts.image))),
        )
        .field(
            "video",
            "Video object",
            |a| &a.video,
            |a| &mut a.video,
            OptionalCodec(StructCodec::new(Arc::clone(&parts.video))),
        )
        .field(
            "data",
            "Data object",
            |a| &a.data,
            |a| &mut a.data,
            OptionalCodec(StructCodec::new(Arc::clone(&parts.data))),
        )
        .field(
            "ext",
            "Extended asset attributes",
            |a| &a.ext,
            |a| &mut a.ext,
            JsonCodec,
        )
}

fn request_description(
    config: &CodecConfig,
    asset: Arc<StructureDescription<Asset>>,
) -> StructureDescription<NativeRequest> {
    StructureDescription::<NativeRequest>::new("NativeRequest")
        .field(
            config.version_key.as_str(),
            "Native Request Version",
            |r| &r.ver,
            |r| &mut r.ver,
            StringCodec,
        )
        .field(
            "context",
            "Context of ad",
            |r| &r.context_type,
            |r| &mut r.context_type,
            EnumCodec::new(),
        )
        .field(
            "contextsubtype",
            "Detail context of ad",
            |r| &r.context_sub_type,
            |r| &mut r.context_sub_type,
            EnumCodec::new(),
        )
        .field(
            "plcmttype",
            "Placement Type",
            |r| &r.placement_type,
            |r| &mut r.placement_type,
            EnumCodec::new(),
        )
        .field(
            "plcmtcnt",
            "Placement Count",
            |r| &r.placement_count,
            |r| &mut r.placement_count,
            TaggedCodec::with_default(NativeRequest::DEFAULT_PLACEMENT_COUNT),
        )
        .field(
            "seq",
            "Sequence of ad",
            |r| &r.seq,
            |r| &mut r.seq,
            TaggedCodec::with_default(NativeRequest::DEFAULT_SEQ),
        )
        .field(
            "assets",
            "Array of Asset objects",
            |r| &r.assets,
            |r| &mut r.assets,
            ListCodec::new(StructCodec::new(asset)).always_emit(),
        )
        .field(
            "ext",
            "Extended request attributes",
            |r| &r.ext,
            |r| &mut r.ext,
            JsonCodec,
        )
        .field(
            RESIDUAL_KEY,
            "Unparseable fields are stored here",
            |r| &r.unparseable,
            |r| &mut r.unparseable,
            ResidualCodec,
        )
        .capture_residual(|r| &mut r.unparseable)
}

/// One documented key, as listed by [`NativeCodec::schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDoc {
    pub type_name: &'static str,
    pub key: String,
    pub description: &'static str,
}

/// Decoder/encoder for native requests under one [`CodecConfig`].
///
/// Building one assembles every binding table; afterwards it is immutable
/// and can be shared between threads.
#[derive(Debug)]
pub struct NativeCodec {
    config: CodecConfig,
    title: Arc<StructureDescription<Title>>,
    image: Arc<StructureDescription<Image>>,
    video: Arc<StructureDescription<Video>>,
    data: Arc<StructureDescription<Data>>,
    asset: Arc<StructureDescription<Asset>>,
    request: StructureDescription<NativeRequest>,
}

impl Default for NativeCodec {
    fn default() -> Self {
        Self::new(CodecConfig::default())
    }
}

impl NativeCodec {
    /// Builds a codec from a config checked with [`CodecConfig::check`].
    ///
    /// Configs loaded through [`crate::NativeConfig::from_toml_str`] are
    /// already checked; use [`NativeCodec::try_new`] for hand-built ones.
    pub fn new(config: CodecConfig) -> Self {
        if !config.is_default_binding() {
            log::info!(
                "native codec using version key {:?} and {:?} image size binding",
                config.version_key,
                config.image_size_binding
            );
        }
        let parts = AssetParts {
            title: Arc::new(title_description()),
            image: Arc::new(image_description(config.image_size_binding)),
            video: Arc::new(video_description()),
            data: Arc::new(data_description()),
        };
        let asset = Arc::new(asset_description(&parts));
        let request = request_description(&config, Arc::clone(&asset));
        NativeCodec {
            config,
            title: parts.title,
            image: parts.image,
            video: parts.video,
            data: parts.data,
            asset,
            request,
        }
    }

    /// Checks `config` first, so a version key cannot shadow another binding.
    pub fn try_new(config: CodecConfig) -> Result<Self> {
        config.check()?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    pub fn decode_str(&self, json: &str) -> Result<NativeRequest> {
        self.decode_str_with_report(json).map(|(request, _)| request)
    }

    pub fn decode_slice(&self, json: &[u8]) -> Result<NativeRequest> {
        let value: Value = serde_json::from_slice(json).map_err(NativeError::syntax)?;
        self.decode_value(&value)
    }

    pub fn decode_value(&self, value: &Value) -> Result<NativeRequest> {
        self.decode_value_with_report(value).map(|(request, _)| request)
    }

    pub fn decode_str_with_report(&self, json: &str) -> Result<(NativeRequest, DecodeReport)> {
        let value: Value = serde_json::from_str(json).map_err(NativeError::syntax)?;
        self.decode_value_with_report(&value)
    }

    pub fn decode_value_with_report(&self, value: &Value) -> Result<(NativeRequest, DecodeReport)> {
        self.request.decode_document(value)
    }

    /// Decodes a lone asset object, e.g. one pulled out of a larger payload.
    pub fn decode_asset(&self, value: &Value) -> Result<(Asset, DecodeReport)> {
        self.asset.decode_document(value)
    }

    pub fn encode_value(&self, request: &NativeRequest) -> Value {
        let mut out = self.request.encode(request);
        match self.config.residual_output {
            ResidualOutput::Field => {}
            ResidualOutput::Merge => {
                let residual = out.as_object_mut().and_then(|m| m.remove(RESIDUAL_KEY));
                if let Some(residual) = residual {
                    restore_into(&mut out, &residual);
                }
            }
            ResidualOutput::Drop => {
                if let Some(map) = out.as_object_mut() {
                    map.remove(RESIDUAL_KEY);
                }
            }
        }
        out
    }

    pub fn encode_asset(&self, asset: &Asset) -> Value {
        self.asset.encode(asset)
    }

    pub fn encode_string(&self, request: &NativeRequest) -> Result<String> {
        serde_json::to_string(&self.encode_value(request)).map_err(NativeError::Encode)
    }

    pub fn encode_string_pretty(&self, request: &NativeRequest) -> Result<String> {
        serde_json::to_string_pretty(&self.encode_value(request)).map_err(NativeError::Encode)
    }

    pub fn encode_vec(&self, request: &NativeRequest) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.encode_value(request)).map_err(NativeError::Encode)
    }

    /// Every bound key with its description, request first, then nested objects.
    pub fn schema(&self) -> Vec<FieldDoc> {
        let mut docs = Vec::new();
        collect_docs(&self.request, &mut docs);
        collect_docs(&self.asset, &mut docs);
        collect_docs(&self.title, &mut docs);
        collect_docs(&self.image, &mut docs);
        collect_docs(&self.video, &mut docs);
        collect_docs(&self.data, &mut docs);
        docs
    }
}

fn collect_docs<T: Default + 'static>(desc: &StructureDescription<T>, docs: &mut Vec<FieldDoc>) {
    docs.extend(desc.fields().map(|binding| FieldDoc {
        type_name: desc.type_name(),
        key: binding.key().to_string(),
        description: binding.description(),
    }));
}

static DEFAULT_CODEC: LazyLock<NativeCodec> =
    LazyLock::new(|| NativeCodec::new(CodecConfig::default()));

/// Codec with published key bindings, built on first use.
pub fn default_codec() -> &'static NativeCodec {
    &DEFAULT_CODEC
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{DataType, ImageType, PlacementType, VideoBidResponseProtocol};
    use crate::native::{Id, MimeType, Tagged};
    use serde_json::json;

    #[test]
    fn decodes_every_object_kind() {
        let codec = NativeCodec::default();
        let req = codec
            .decode_value(&json!({
                "ver": "1.1",
                "plcmttype": 1,
                "plcmtcnt": 3,
                "assets": [
                    {"id": 1, "required": 1, "title": {"len": 90}},
                    {"id": 2, "img": {"type": 3, "w": 1200, "h": 627, "mimes": ["image/jpeg"]}},
                    {"id": 3, "video": {
                        "mimes": ["video/mp4"],
                        "minduration": 5,
                        "maxduration": 30.5,
                        "protocols": [2, 3, 42]
                    }},
                    {"id": 4, "data": {"type": 1, "len": 25, "ext": {"k": "v"}}}
                ]
            }))
            .unwrap();

        assert_eq!(req.ver.as_deref(), Some("1.1"));
        assert_eq!(req.placement_type, PlacementType::Feed);
        assert_eq!(req.placement_count, Tagged::new(3));
        assert_eq!(req.seq, Tagged::absent(0));
        assert_eq!(req.assets.len(), 4);

        let title_asset = &req.assets[0];
        assert_eq!(title_asset.id, Id::from("1"));
        assert_eq!(title_asset.required, Tagged::new(true));
        assert_eq!(title_asset.title.as_ref().unwrap().len, Tagged::new(90));

        let img = req.assets[1].img.as_ref().unwrap();
        assert_eq!(img.image_type, ImageType::Main);
        assert_eq!(img.w, Tagged::new(1200));
        assert_eq!(img.h, Tagged::new(627));
        assert_eq!(img.wmin, Tagged::default());
        assert_eq!(img.mimes, vec![MimeType::from("image/jpeg")]);

        let video = req.assets[2].video.as_ref().unwrap();
        assert_eq!(video.minduration, Tagged::new(5.0));
        assert_eq!(video.maxduration, Tagged::new(30.5));
        assert_eq!(
            video.protocols,
            vec![
                VideoBidResponseProtocol::Vast2,
                VideoBidResponseProtocol::Vast3,
                VideoBidResponseProtocol::Unrecognized(42),
            ]
        );

        let data = req.assets[3].data.as_ref().unwrap();
        assert_eq!(data.data_type, DataType::Sponsored);
        assert_eq!(data.ext, Some(json!({"k": "v"})));
        assert!(!req.has_residual());
    }

    #[test]
    fn legacy_binding_reads_version_from_id_and_sizes_into_minimums() {
        let codec = NativeCodec::new(CodecConfig::legacy());
        let req = codec
            .decode_value(&json!({
                "id": "1.0",
                "assets": [{"id": "a", "img": {"w": 300, "h": 250}}]
            }))
            .unwrap();
        assert_eq!(req.ver.as_deref(), Some("1.0"));
        let img = req.assets[0].img.as_ref().unwrap();
        assert_eq!(img.wmin, Tagged::new(300));
        assert_eq!(img.hmin, Tagged::new(250));
        assert_eq!(img.w, Tagged::default());

        // both keys are emitted from the aliased member
        let encoded = codec.encode_asset(&req.assets[0]);
        assert_eq!(encoded["img"], json!({"w": 300, "wmin": 300, "h": 250, "hmin": 250}));
    }

    #[test]
    fn default_binding_treats_id_as_unknown() {
        let req = NativeCodec::default()
            .decode_value(&json!({"id": "1.0", "ver": "1.2"}))
            .unwrap();
        assert_eq!(req.ver.as_deref(), Some("1.2"));
        assert_eq!(req.unparseable, json!({"id": "1.0"}));
    }

    #[test]
    fn residual_output_modes() {
        let input = json!({"seq": 2, "vendorX": {"a": [1, 2, 3]}, "assets": []});

        let field = NativeCodec::default();
        let req = field.decode_value(&input).unwrap();
        assert_eq!(
            field.encode_value(&req),
            json!({"seq": 2, "assets": [], "unparseable": {"vendorX": {"a": [1, 2, 3]}}})
        );

        let merge = NativeCodec::new(CodecConfig {
            residual_output: ResidualOutput::Merge,
            ..CodecConfig::default()
        });
        assert_eq!(merge.encode_value(&req), input);

        let drop = NativeCodec::new(CodecConfig {
            residual_output: ResidualOutput::Drop,
            ..CodecConfig::default()
        });
        assert_eq!(drop.encode_value(&req), json!({"seq": 2, "assets": []}));
    }

    #[test]
    fn try_new_rejects_version_key_that_shadows_assets() {
        let err = NativeCodec::try_new(CodecConfig {
            version_key: "assets".to_string(),
            ..CodecConfig::default()
        })
        .unwrap_err();
        assert!(matches!(err, NativeError::Config(_)));
        assert!(NativeCodec::try_new(CodecConfig::legacy()).is_ok());
    }

    #[test]
    fn schema_lists_descriptions_in_declaration_order() {
        let schema = NativeCodec::default().schema();
        let first = &schema[0];
        assert_eq!(first.type_name, "NativeRequest");
        assert_eq!(first.key, "ver");
        assert_eq!(first.description, "Native Request Version");
        assert!(schema
            .iter()
            .any(|d| d.type_name == "Video" && d.key == "protocols"));
        assert!(schema
            .iter()
            .any(|d| d.type_name == "NativeRequest" && d.key == RESIDUAL_KEY));
    }

    #[test]
    fn decode_asset_reports_its_own_residual() {
        let codec = NativeCodec::default();
        let (asset, report) = codec
            .decode_asset(&json!({"id": "9", "title": {"len": "oops"}, "foo": 1}))
            .unwrap();
        assert_eq!(asset.id, Id::from("9"));
        assert_eq!(asset.title.unwrap().len, Tagged::default());
        assert_eq!(report.residual, json!({"title": {"len": "oops"}, "foo": 1}));
        assert_eq!(report.entries.len(), 2);
    }
}
