//! Enumerated value tables from OpenRTB Dynamic Native Ads 1.1 (section 7)
//! and the OpenRTB 2.x protocol list used by the native video object.
//!
//! Every enumeration is closed over its published codes but open on the
//! wire: an unknown integer decodes to `Unrecognized(code)` and encodes back
//! to the same integer. `Unspecified` stands for "not present in input" and
//! is never written out.

use serde::Serialize;

/// Integer-coded enumeration as seen by the codec layer.
pub trait NativeEnum: Copy + Default + Send + Sync + 'static {
    /// Name used in diagnostics.
    const NAME: &'static str;

    fn from_code(code: i64) -> Self;

    /// Wire code, or `None` for `Unspecified`.
    fn code(&self) -> Option<i64>;

    fn is_specified(&self) -> bool {
        self.code().is_some()
    }
}

/// Code reserved for "absent from input".
pub const UNSPECIFIED_CODE: i64 = -1;

macro_rules! native_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
        pub enum $name {
            #[default]
            Unspecified,
            $( $(#[$vmeta])* $variant, )+
            /// A code outside the published table, kept for re-encoding.
            Unrecognized(i64),
        }

        impl NativeEnum for $name {
            const NAME: &'static str = stringify!($name);

            fn from_code(code: i64) -> Self {
                match code {
                    UNSPECIFIED_CODE => $name::Unspecified,
                    $( $code => $name::$variant, )+
                    other => $name::Unrecognized(other),
                }
            }

            fn code(&self) -> Option<i64> {
                match self {
                    $name::Unspecified => None,
                    $( $name::$variant => Some($code), )+
                    $name::Unrecognized(code) => Some(*code),
                }
            }
        }
    };
}

native_enum! {
    /// 7.3 Context Type IDs: what kind of content surrounds the ad.
    ContextType {
        Content = 1,
        Social = 2,
        Product = 3,
    }
}

native_enum! {
    /// 7.4 Context Sub Type IDs. Subtypes are meant to be combined with the
    /// context type sharing their leading digit; this is not enforced.
    ContextSubType {
        General = 10,
        Article = 11,
        Video = 12,
        Audio = 13,
        Image = 14,
        UserGenerated = 15,
        Social = 20,
        Email = 21,
        ChatIm = 22,
        Products = 30,
        AppStore = 31,
        ProductReview = 32,
    }
}

native_enum! {
    /// 7.5 Placement Type IDs: the format of the ad unit being offered.
    PlacementType {
        /// In the feed of content.
        Feed = 1,
        /// In the atomic unit of the content (article page, single image page).
        Atomic = 2,
        /// Outside the core content, e.g. in the ads section on the right rail.
        Content = 3,
        /// Recommendation widget.
        Widget = 4,
    }
}

native_enum! {
    /// 7.6 Data Asset Types.
    DataType {
        /// Sponsored by message, should contain the brand name.
        Sponsored = 1,
        Desc = 2,
        /// 0-5 integer formatted as string.
        Rating = 3,
        Likes = 4,
        Downloads = 5,
        Price = 6,
        SalePrice = 7,
        Phone = 8,
        Address = 9,
        Desc2 = 10,
        DisplayUrl = 11,
        CtaText = 12,
    }
}

native_enum! {
    /// 7.7 Image Asset Types.
    ImageType {
        Icon = 1,
        Logo = 2,
        Main = 3,
    }
}

native_enum! {
    /// Bid response protocols a native video asset accepts.
    VideoBidResponseProtocol {
        Vast1 = 1,
        Vast2 = 2,
        Vast3 = 3,
        Vast1Wrapper = 4,
        Vast2Wrapper = 5,
        Vast3Wrapper = 6,
        Vast4 = 7,
        Vast4Wrapper = 8,
        Daast1 = 9,
        Daast1Wrapper = 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_variants() {
        assert_eq!(ContextType::from_code(1), ContextType::Content);
        assert_eq!(ContextSubType::from_code(32), ContextSubType::ProductReview);
        assert_eq!(PlacementType::from_code(2), PlacementType::Atomic);
        assert_eq!(DataType::from_code(12), DataType::CtaText);
        assert_eq!(ImageType::from_code(3), ImageType::Main);
        assert_eq!(
            VideoBidResponseProtocol::from_code(7),
            VideoBidResponseProtocol::Vast4
        );
    }

    #[test]
    fn unknown_codes_survive() {
        let ctx = ContextType::from_code(99);
        assert_eq!(ctx, ContextType::Unrecognized(99));
        assert_eq!(ctx.code(), Some(99));
        assert!(ctx.is_specified());

        assert_eq!(ImageType::from_code(0).code(), Some(0));
        assert_eq!(DataType::from_code(500), DataType::Unrecognized(500));
    }

    #[test]
    fn sentinel_is_unspecified() {
        assert_eq!(PlacementType::from_code(-1), PlacementType::Unspecified);
        assert_eq!(PlacementType::default(), PlacementType::Unspecified);
        assert_eq!(PlacementType::Unspecified.code(), None);
        assert!(!ContextSubType::default().is_specified());
    }

    #[test]
    fn every_named_variant_round_trips() {
        for code in 1..=12 {
            assert_eq!(DataType::from_code(code).code(), Some(code));
        }
        for code in [10, 11, 12, 13, 14, 15, 20, 21, 22, 30, 31, 32] {
            let sub = ContextSubType::from_code(code);
            assert!(!matches!(sub, ContextSubType::Unrecognized(_)));
            assert_eq!(sub.code(), Some(code));
        }
    }
}
