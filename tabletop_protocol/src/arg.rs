// Typed command arguments.
//
// `Arg` is the closed set of values a command may carry. On the wire each
// argument is a JSON object `{"type": <name>, "value": <payload>}`; the type
// names are the ones the allow-list gate (`allowlist.rs`) checks before any
// payload is materialized.
//
// Type names are grouped by namespace:
// - `lang.*`:              primitives (null, booleans, integers, ...).
// - `util.*`:              general-purpose collections.
// - `lib.Md5Key`:          content hash of an asset.
// - `tabletop.geom.*`:     zone geometry.
// - `tabletop.model.*`:    domain model values.
// - `tabletop.transfer.*`: chunked asset transfer frames.
//
// `ArgType` mirrors `Arg` without payloads and is what command signatures are
// written in. `FromArg` lets handlers pull a typed value (or reference) out
// of a validated command without matching on `Arg` by hand.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tabletop_model::{
    AddOnLibrary, Area, Asset, AssetId, Campaign, CampaignProperties, Drawable, DrawnElement,
    ExposedAreaMeta, Guid, InitiativeList, Label, Layer, MacroButton, Pen, Player, Pointer,
    ServerPolicy, TextMessage, Token, TokenUpdateKind, TopologyType, VisionType, Zone, ZonePoint,
};

use crate::transfer::{AssetChunk, AssetHeader};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Arg {
    #[serde(rename = "lang.Null")]
    Null,
    #[serde(rename = "lang.Boolean")]
    Bool(bool),
    #[serde(rename = "lang.Integer")]
    Int(i32),
    #[serde(rename = "lang.Double")]
    Double(f64),
    #[serde(rename = "lang.String")]
    Str(String),
    #[serde(rename = "lang.Bytes")]
    Bytes(Vec<u8>),

    #[serde(rename = "util.Guid")]
    Guid(Guid),
    #[serde(rename = "util.GuidSet")]
    GuidSet(BTreeSet<Guid>),
    #[serde(rename = "util.GuidList")]
    GuidList(Vec<Guid>),
    #[serde(rename = "util.StringList")]
    StringList(Vec<String>),
    #[serde(rename = "util.List")]
    List(Vec<Arg>),

    #[serde(rename = "lib.Md5Key")]
    AssetId(AssetId),

    #[serde(rename = "tabletop.geom.Area")]
    Area(Area),
    #[serde(rename = "tabletop.geom.ZonePoint")]
    ZonePoint(ZonePoint),

    #[serde(rename = "tabletop.model.Token")]
    Token(Box<Token>),
    #[serde(rename = "tabletop.model.Zone")]
    Zone(Box<Zone>),
    #[serde(rename = "tabletop.model.Campaign")]
    Campaign(Box<Campaign>),
    #[serde(rename = "tabletop.model.CampaignProperties")]
    CampaignProperties(Box<CampaignProperties>),
    #[serde(rename = "tabletop.model.Pen")]
    Pen(Pen),
    #[serde(rename = "tabletop.model.Drawable")]
    Drawable(Drawable),
    #[serde(rename = "tabletop.model.DrawnElement")]
    DrawnElement(DrawnElement),
    #[serde(rename = "tabletop.model.Label")]
    Label(Label),
    #[serde(rename = "tabletop.model.Pointer")]
    Pointer(Pointer),
    #[serde(rename = "tabletop.model.TextMessage")]
    TextMessage(TextMessage),
    #[serde(rename = "tabletop.model.InitiativeList")]
    InitiativeList(InitiativeList),
    #[serde(rename = "tabletop.model.ExposedAreaMeta")]
    ExposedAreaMeta(ExposedAreaMeta),
    #[serde(rename = "tabletop.model.Player")]
    Player(Player),
    #[serde(rename = "tabletop.model.ServerPolicy")]
    ServerPolicy(ServerPolicy),
    #[serde(rename = "tabletop.model.MacroButtonList")]
    MacroButtons(Vec<MacroButton>),
    #[serde(rename = "tabletop.model.AddOnLibraryList")]
    AddOnLibraries(Vec<AddOnLibrary>),
    #[serde(rename = "tabletop.model.Asset")]
    Asset(Box<Asset>),
    #[serde(rename = "tabletop.model.Layer")]
    Layer(Layer),
    #[serde(rename = "tabletop.model.TopologyType")]
    TopologyType(TopologyType),
    #[serde(rename = "tabletop.model.VisionType")]
    VisionType(VisionType),
    #[serde(rename = "tabletop.model.TokenUpdateKind")]
    TokenUpdateKind(TokenUpdateKind),

    #[serde(rename = "tabletop.transfer.AssetHeader")]
    AssetHeader(AssetHeader),
    #[serde(rename = "tabletop.transfer.AssetChunk")]
    AssetChunk(AssetChunk),
}

/// Payload-free mirror of `Arg`, used in command signatures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ArgType {
    Null,
    Bool,
    Int,
    Double,
    Str,
    Bytes,
    Guid,
    GuidSet,
    GuidList,
    StringList,
    List,
    AssetId,
    Area,
    ZonePoint,
    Token,
    Zone,
    Campaign,
    CampaignProperties,
    Pen,
    Drawable,
    DrawnElement,
    Label,
    Pointer,
    TextMessage,
    InitiativeList,
    ExposedAreaMeta,
    Player,
    ServerPolicy,
    MacroButtons,
    AddOnLibraries,
    Asset,
    Layer,
    TopologyType,
    VisionType,
    TokenUpdateKind,
    AssetHeader,
    AssetChunk,
}

impl ArgType {
    pub const ALL: [ArgType; 37] = [
        Self::Null,
        Self::Bool,
        Self::Int,
        Self::Double,
        Self::Str,
        Self::Bytes,
        Self::Guid,
        Self::GuidSet,
        Self::GuidList,
        Self::StringList,
        Self::List,
        Self::AssetId,
        Self::Area,
        Self::ZonePoint,
        Self::Token,
        Self::Zone,
        Self::Campaign,
        Self::CampaignProperties,
        Self::Pen,
        Self::Drawable,
        Self::DrawnElement,
        Self::Label,
        Self::Pointer,
        Self::TextMessage,
        Self::InitiativeList,
        Self::ExposedAreaMeta,
        Self::Player,
        Self::ServerPolicy,
        Self::MacroButtons,
        Self::AddOnLibraries,
        Self::Asset,
        Self::Layer,
        Self::TopologyType,
        Self::VisionType,
        Self::TokenUpdateKind,
        Self::AssetHeader,
        Self::AssetChunk,
    ];

    /// Wire type name, identical to the `type` tag serde writes for `Arg`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Null => "lang.Null",
            Self::Bool => "lang.Boolean",
            Self::Int => "lang.Integer",
            Self::Double => "lang.Double",
            Self::Str => "lang.String",
            Self::Bytes => "lang.Bytes",
            Self::Guid => "util.Guid",
            Self::GuidSet => "util.GuidSet",
            Self::GuidList => "util.GuidList",
            Self::StringList => "util.StringList",
            Self::List => "util.List",
            Self::AssetId => "lib.Md5Key",
            Self::Area => "tabletop.geom.Area",
            Self::ZonePoint => "tabletop.geom.ZonePoint",
            Self::Token => "tabletop.model.Token",
            Self::Zone => "tabletop.model.Zone",
            Self::Campaign => "tabletop.model.Campaign",
            Self::CampaignProperties => "tabletop.model.CampaignProperties",
            Self::Pen => "tabletop.model.Pen",
            Self::Drawable => "tabletop.model.Drawable",
            Self::DrawnElement => "tabletop.model.DrawnElement",
            Self::Label => "tabletop.model.Label",
            Self::Pointer => "tabletop.model.Pointer",
            Self::TextMessage => "tabletop.model.TextMessage",
            Self::InitiativeList => "tabletop.model.InitiativeList",
            Self::ExposedAreaMeta => "tabletop.model.ExposedAreaMeta",
            Self::Player => "tabletop.model.Player",
            Self::ServerPolicy => "tabletop.model.ServerPolicy",
            Self::MacroButtons => "tabletop.model.MacroButtonList",
            Self::AddOnLibraries => "tabletop.model.AddOnLibraryList",
            Self::Asset => "tabletop.model.Asset",
            Self::Layer => "tabletop.model.Layer",
            Self::TopologyType => "tabletop.model.TopologyType",
            Self::VisionType => "tabletop.model.VisionType",
            Self::TokenUpdateKind => "tabletop.model.TokenUpdateKind",
            Self::AssetHeader => "tabletop.transfer.AssetHeader",
            Self::AssetChunk => "tabletop.transfer.AssetChunk",
        }
    }
}

impl Arg {
    pub fn arg_type(&self) -> ArgType {
        match self {
            Self::Null => ArgType::Null,
            Self::Bool(_) => ArgType::Bool,
            Self::Int(_) => ArgType::Int,
            Self::Double(_) => ArgType::Double,
            Self::Str(_) => ArgType::Str,
            Self::Bytes(_) => ArgType::Bytes,
            Self::Guid(_) => ArgType::Guid,
            Self::GuidSet(_) => ArgType::GuidSet,
            Self::GuidList(_) => ArgType::GuidList,
            Self::StringList(_) => ArgType::StringList,
            Self::List(_) => ArgType::List,
            Self::AssetId(_) => ArgType::AssetId,
            Self::Area(_) => ArgType::Area,
            Self::ZonePoint(_) => ArgType::ZonePoint,
            Self::Token(_) => ArgType::Token,
            Self::Zone(_) => ArgType::Zone,
            Self::Campaign(_) => ArgType::Campaign,
            Self::CampaignProperties(_) => ArgType::CampaignProperties,
            Self::Pen(_) => ArgType::Pen,
            Self::Drawable(_) => ArgType::Drawable,
            Self::DrawnElement(_) => ArgType::DrawnElement,
            Self::Label(_) => ArgType::Label,
            Self::Pointer(_) => ArgType::Pointer,
            Self::TextMessage(_) => ArgType::TextMessage,
            Self::InitiativeList(_) => ArgType::InitiativeList,
            Self::ExposedAreaMeta(_) => ArgType::ExposedAreaMeta,
            Self::Player(_) => ArgType::Player,
            Self::ServerPolicy(_) => ArgType::ServerPolicy,
            Self::MacroButtons(_) => ArgType::MacroButtons,
            Self::AddOnLibraries(_) => ArgType::AddOnLibraries,
            Self::Asset(_) => ArgType::Asset,
            Self::Layer(_) => ArgType::Layer,
            Self::TopologyType(_) => ArgType::TopologyType,
            Self::VisionType(_) => ArgType::VisionType,
            Self::TokenUpdateKind(_) => ArgType::TokenUpdateKind,
            Self::AssetHeader(_) => ArgType::AssetHeader,
            Self::AssetChunk(_) => ArgType::AssetChunk,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.arg_type().name()
    }

    pub fn token(token: Token) -> Self {
        Self::Token(Box::new(token))
    }

    pub fn zone(zone: Zone) -> Self {
        Self::Zone(Box::new(zone))
    }

    pub fn campaign(campaign: Campaign) -> Self {
        Self::Campaign(Box::new(campaign))
    }

    pub fn asset(asset: Asset) -> Self {
        Self::Asset(Box::new(asset))
    }

    pub fn str(s: impl Into<String>) -> Self {
        Self::Str(s.into())
    }

    /// `Some(s)` → `Str`, `None` → `Null`.
    pub fn opt_str(s: Option<impl Into<String>>) -> Self {
        s.map_or(Self::Null, |s| Self::Str(s.into()))
    }
}

/// One positional parameter of a command signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Param {
    pub ty: ArgType,
    pub nullable: bool,
}

impl Param {
    pub const fn req(ty: ArgType) -> Self {
        Self { ty, nullable: false }
    }

    pub const fn opt(ty: ArgType) -> Self {
        Self { ty, nullable: true }
    }

    pub fn accepts(&self, arg: &Arg) -> bool {
        match arg {
            Arg::Null => self.nullable,
            other => other.arg_type() == self.ty,
        }
    }
}

// ---------------------------------------------------------------------------
// Typed extraction
// ---------------------------------------------------------------------------

/// Conversion from a borrowed `Arg` into a concrete value or reference.
pub trait FromArg<'a>: Sized {
    const EXPECTED: ArgType;

    fn from_arg(arg: &'a Arg) -> Option<Self>;
}

impl<'a, T: FromArg<'a>> FromArg<'a> for Option<T> {
    const EXPECTED: ArgType = T::EXPECTED;

    fn from_arg(arg: &'a Arg) -> Option<Self> {
        match arg {
            Arg::Null => Some(None),
            other => T::from_arg(other).map(Some),
        }
    }
}

macro_rules! copy_arg {
    ($ty:ty, $variant:ident) => {
        impl<'a> FromArg<'a> for $ty {
            const EXPECTED: ArgType = ArgType::$variant;

            fn from_arg(arg: &'a Arg) -> Option<Self> {
                match arg {
                    Arg::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

macro_rules! ref_arg {
    ($ty:ty, $variant:ident) => {
        impl<'a> FromArg<'a> for &'a $ty {
            const EXPECTED: ArgType = ArgType::$variant;

            fn from_arg(arg: &'a Arg) -> Option<Self> {
                match arg {
                    Arg::$variant(v) => Some(&**v),
                    _ => None,
                }
            }
        }
    };
}

copy_arg!(bool, Bool);
copy_arg!(i32, Int);
copy_arg!(f64, Double);
copy_arg!(Guid, Guid);
copy_arg!(ZonePoint, ZonePoint);
copy_arg!(Layer, Layer);
copy_arg!(TopologyType, TopologyType);
copy_arg!(VisionType, VisionType);
copy_arg!(TokenUpdateKind, TokenUpdateKind);

ref_arg!(str, Str);
ref_arg!([u8], Bytes);
ref_arg!([Guid], GuidList);
ref_arg!([String], StringList);
ref_arg!([Arg], List);
ref_arg!([MacroButton], MacroButtons);
ref_arg!([AddOnLibrary], AddOnLibraries);
ref_arg!(Token, Token);
ref_arg!(Zone, Zone);
ref_arg!(Campaign, Campaign);
ref_arg!(CampaignProperties, CampaignProperties);
ref_arg!(Asset, Asset);

macro_rules! plain_ref_arg {
    ($ty:ty, $variant:ident) => {
        impl<'a> FromArg<'a> for &'a $ty {
            const EXPECTED: ArgType = ArgType::$variant;

            fn from_arg(arg: &'a Arg) -> Option<Self> {
                match arg {
                    Arg::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

plain_ref_arg!(BTreeSet<Guid>, GuidSet);
plain_ref_arg!(AssetId, AssetId);
plain_ref_arg!(Area, Area);
plain_ref_arg!(Pen, Pen);
plain_ref_arg!(Drawable, Drawable);
plain_ref_arg!(DrawnElement, DrawnElement);
plain_ref_arg!(Label, Label);
plain_ref_arg!(Pointer, Pointer);
plain_ref_arg!(TextMessage, TextMessage);
plain_ref_arg!(InitiativeList, InitiativeList);
plain_ref_arg!(ExposedAreaMeta, ExposedAreaMeta);
plain_ref_arg!(Player, Player);
plain_ref_arg!(ServerPolicy, ServerPolicy);
plain_ref_arg!(AssetHeader, AssetHeader);
plain_ref_arg!(AssetChunk, AssetChunk);
