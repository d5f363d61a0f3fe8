// Command kinds, their signatures, and the validated command envelope.
//
// `CommandKind` is the closed vocabulary shared by client→server and
// server→client traffic. Each kind has a fixed positional signature
// (`signature()`), and a `Command` can only be constructed if its
// arguments match that signature exactly, so handlers downstream can
// extract arguments with `Command::get` without re-checking arity.
//
// The table below is the single source of truth for wire names and
// signatures: the `command_kinds!` macro expands it into the enum, the
// name↔kind conversions and the signature lookup.
//
// Two per-kind flags drive dispatch policy:
// - `is_optimistic()`: the sending client already applied the mutation
//   locally; the server forwards it to everyone else only, and a client
//   ignores its own echo if one ever arrives.
// - `is_background_safe()`: a client may apply it on the network thread
//   because it only touches internally-locked stores (assets, add-on
//   libraries, the data store).

use std::fmt;
use std::str::FromStr;

use crate::arg::{Arg, ArgType, FromArg, Param};
use crate::error::ProtocolError;
use crate::types::ConnectionId;

macro_rules! command_kinds {
    ($( $variant:ident => $name:literal [ $( $req:ident $ty:ident ),* ] ),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum CommandKind {
            $( $variant, )*
        }

        impl CommandKind {
            pub const ALL: &'static [CommandKind] = &[ $( CommandKind::$variant, )* ];

            /// Wire name of the command.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $( Self::$variant => $name, )*
                }
            }

            /// Positional parameter types.
            pub fn signature(self) -> &'static [Param] {
                match self {
                    $( Self::$variant => {
                        const SIGNATURE: &[Param] = &[ $( Param::$req(ArgType::$ty) ),* ];
                        SIGNATURE
                    } )*
                }
            }
        }

        impl FromStr for CommandKind {
            type Err = ProtocolError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $name => Ok(Self::$variant), )*
                    _ => Err(ProtocolError::UnknownCommand(s.to_owned())),
                }
            }
        }
    };
}

command_kinds! {
    BootPlayer => "bootPlayer" [req Str],
    BringTokensToFront => "bringTokensToFront" [req Guid, req GuidSet],
    SendTokensToBack => "sendTokensToBack" [req Guid, req GuidSet],
    Draw => "draw" [req Guid, req Pen, req Drawable],
    UpdateDrawing => "updateDrawing" [req Guid, req Pen, req DrawnElement],
    UndoDraw => "undoDraw" [req Guid, req Guid],
    ClearAllDrawings => "clearAllDrawings" [req Guid, req Layer],
    EnforceZoneView => "enforceZoneView" [req Guid, req Int, req Int, req Double, req Int, req Int],
    RestoreZoneView => "restoreZoneView" [req Guid],
    EnforceZone => "enforceZone" [req Guid],
    ExposeFoW => "exposeFoW" [req Guid, req Area, opt GuidSet],
    HideFoW => "hideFoW" [req Guid, req Area, opt GuidSet],
    SetFoW => "setFoW" [req Guid, req Area, opt GuidSet],
    ExposePcArea => "exposePCArea" [req Guid],
    ClearExposedArea => "clearExposedArea" [req Guid, req Bool],
    UpdateExposedAreaMeta => "updateExposedAreaMeta" [req Guid, req Guid, req ExposedAreaMeta],
    GetAsset => "getAsset" [req AssetId],
    PutAsset => "putAsset" [req Asset],
    RemoveAsset => "removeAsset" [req AssetId],
    StartAssetTransfer => "startAssetTransfer" [req AssetHeader],
    UpdateAssetTransfer => "updateAssetTransfer" [req AssetChunk],
    GetZone => "getZone" [req Guid],
    PutZone => "putZone" [req Zone],
    RemoveZone => "removeZone" [req Guid],
    RenameZone => "renameZone" [req Guid, req Str],
    ChangeZoneDispName => "changeZoneDispName" [req Guid, opt Str],
    SetZoneGridSize => "setZoneGridSize" [req Guid, req Int, req Int, req Int, req Int],
    SetZoneVisibility => "setZoneVisibility" [req Guid, req Bool],
    SetZoneHasFoW => "setZoneHasFoW" [req Guid, req Bool],
    SetVisionType => "setVisionType" [req Guid, req VisionType],
    SetUseVision => "setUseVision" [req Guid, req VisionType],
    SetBoard => "setBoard" [req Guid, opt AssetId, req Int, req Int],
    AddTopology => "addTopology" [req Guid, req Area, req TopologyType],
    RemoveTopology => "removeTopology" [req Guid, req Area, req TopologyType],
    PutToken => "putToken" [req Guid, req Token],
    EditToken => "editToken" [req Guid, req Token],
    RemoveToken => "removeToken" [req Guid, req Guid],
    RemoveTokens => "removeTokens" [req Guid, req GuidList],
    UpdateTokenProperty => "updateTokenProperty" [req Guid, req Guid, req TokenUpdateKind, req List],
    SetTokenLocation => "setTokenLocation" [req Guid, req Guid, req Int, req Int],
    StartTokenMove => "startTokenMove" [req Str, req Guid, req Guid, req GuidSet],
    UpdateTokenMove => "updateTokenMove" [req Guid, req Guid, req Int, req Int],
    StopTokenMove => "stopTokenMove" [req Guid, req Guid],
    ToggleTokenMoveWaypoint => "toggleTokenMoveWaypoint" [req Guid, req Guid, req ZonePoint],
    PutLabel => "putLabel" [req Guid, req Label],
    RemoveLabel => "removeLabel" [req Guid, req Guid],
    ShowPointer => "showPointer" [req Str, req Pointer],
    HidePointer => "hidePointer" [req Str],
    MovePointer => "movePointer" [req Str, req Int, req Int],
    Message => "message" [req TextMessage],
    ExecFunction => "execFunction" [opt Str, req Str, req Str, req List],
    ExecLink => "execLink" [req Str, opt Str, req Str],
    SetLiveTypingLabel => "setLiveTypingLabel" [req Str, req Bool],
    EnforceNotification => "enforceNotification" [req Bool],
    SetCampaign => "setCampaign" [req Campaign],
    SetCampaignName => "setCampaignName" [req Str],
    UpdateCampaign => "updateCampaign" [req CampaignProperties],
    UpdateCampaignMacros => "updateCampaignMacros" [req MacroButtons],
    UpdateGmMacros => "updateGmMacros" [req MacroButtons],
    SetServerPolicy => "setServerPolicy" [req ServerPolicy],
    UpdateInitiative => "updateInitiative" [opt InitiativeList, opt Bool],
    UpdateTokenInitiative => "updateTokenInitiative" [req Guid, req Guid, req Bool, opt Str, req Int],
    Heartbeat => "heartbeat" [req Str],
    AddAddOnLibrary => "addAddOnLibrary" [req AddOnLibraries],
    RemoveAddOnLibrary => "removeAddOnLibrary" [req StringList],
    RemoveAllAddOnLibraries => "removeAllAddOnLibraries" [],
    UpdateDataStore => "updateDataStore" [req Bytes],
    UpdateDataNamespace => "updateDataNamespace" [req Bytes],
    UpdateData => "updateData" [req Str, req Str, req Bytes],
    RemoveDataStore => "removeDataStore" [],
    RemoveDataNamespace => "removeDataNamespace" [req Str, req Str],
    RemoveData => "removeData" [req Str, req Str, req Str],
    PlayerConnected => "playerConnected" [req Player],
    PlayerDisconnected => "playerDisconnected" [req Player],
}

impl CommandKind {
    /// The sending client applies this mutation locally before sending.
    pub fn is_optimistic(self) -> bool {
        matches!(
            self,
            Self::PutToken
                | Self::EditToken
                | Self::RemoveToken
                | Self::RemoveTokens
                | Self::UpdateTokenProperty
                | Self::ExposeFoW
                | Self::SetCampaignName
                | Self::ExecFunction
                | Self::ExecLink
        )
    }

    /// A client may apply this on its network thread.
    pub fn is_background_safe(self) -> bool {
        matches!(
            self,
            Self::PutAsset
                | Self::RemoveAsset
                | Self::StartAssetTransfer
                | Self::UpdateAssetTransfer
                | Self::AddAddOnLibrary
                | Self::RemoveAddOnLibrary
                | Self::RemoveAllAddOnLibraries
                | Self::UpdateDataStore
                | Self::UpdateDataNamespace
                | Self::UpdateData
                | Self::RemoveDataStore
                | Self::RemoveDataNamespace
                | Self::RemoveData
                | Self::Heartbeat
        )
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A command whose arguments are known to match its kind's signature.
#[derive(Clone, Debug, PartialEq)]
pub struct Command {
    kind: CommandKind,
    sender: ConnectionId,
    args: Vec<Arg>,
}

impl Command {
    /// Build a command originated locally. The sender is the reserved
    /// server id until `with_sender` or `received` attributes it.
    pub fn new(kind: CommandKind, args: Vec<Arg>) -> Result<Self, ProtocolError> {
        Self::received(ConnectionId::server(), kind, args)
    }

    /// Build a command received from `sender`.
    pub fn received(
        sender: ConnectionId,
        kind: CommandKind,
        args: Vec<Arg>,
    ) -> Result<Self, ProtocolError> {
        check_signature(kind, &args)?;
        Ok(Self { kind, sender, args })
    }

    pub fn kind(&self) -> CommandKind {
        self.kind
    }

    pub fn sender(&self) -> &ConnectionId {
        &self.sender
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Arg> {
        self.args
    }

    /// The same command attributed to a different sender.
    pub fn with_sender(mut self, sender: ConnectionId) -> Self {
        self.sender = sender;
        self
    }

    /// Typed positional argument.
    pub fn get<'a, T: FromArg<'a>>(&'a self, index: usize) -> Result<T, ProtocolError> {
        let arg = self.args.get(index).ok_or(ProtocolError::Arity {
            kind: self.kind,
            expected: index + 1,
            found: self.args.len(),
        })?;
        T::from_arg(arg).ok_or(ProtocolError::ArgType {
            kind: self.kind,
            index,
            expected: T::EXPECTED.name(),
            found: arg.type_name(),
        })
    }
}

/// Check `args` against the signature of `kind`.
pub fn check_signature(kind: CommandKind, args: &[Arg]) -> Result<(), ProtocolError> {
    let signature = kind.signature();
    if args.len() != signature.len() {
        return Err(ProtocolError::Arity {
            kind,
            expected: signature.len(),
            found: args.len(),
        });
    }
    for (index, (param, arg)) in signature.iter().zip(args).enumerate() {
        if !param.accepts(arg) {
            return Err(ProtocolError::ArgType {
                kind,
                index,
                expected: param.ty.name(),
                found: arg.type_name(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use tabletop_model::{Guid, Token};

    use super::*;

    #[test]
    fn every_kind_round_trips_its_name() {
        for kind in CommandKind::ALL {
            assert_eq!(kind.as_str().parse::<CommandKind>().unwrap(), *kind);
        }
    }

    #[test]
    fn wire_names_are_unique() {
        let names: BTreeSet<&str> = CommandKind::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names.len(), CommandKind::ALL.len());
    }

    #[test]
    fn unknown_kind_is_an_error() {
        let err = "fooBar".parse::<CommandKind>().unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(name) if name == "fooBar"));
    }

    #[test]
    fn wrong_arity_is_rejected() {
        let err = Command::new(CommandKind::PutToken, vec![Arg::Guid(Guid::new())]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::Arity {
                expected: 2,
                found: 1,
                ..
            }
        ));
    }

    #[test]
    fn wrong_type_is_rejected() {
        let err = Command::new(
            CommandKind::PutToken,
            vec![Arg::Guid(Guid::new()), Arg::str("not a token")],
        )
        .unwrap_err();
        assert!(matches!(err, ProtocolError::ArgType { index: 1, .. }));
    }

    #[test]
    fn null_only_where_nullable() {
        let zone = Arg::Guid(Guid::new());
        let area = Arg::Area(Default::default());
        assert!(Command::new(CommandKind::ExposeFoW, vec![zone.clone(), area, Arg::Null]).is_ok());
        assert!(Command::new(CommandKind::RemoveZone, vec![Arg::Null]).is_err());
        assert!(Command::new(CommandKind::RemoveZone, vec![zone]).is_ok());
    }

    #[test]
    fn typed_get() {
        let zone_id = Guid::new();
        let cmd = Command::new(
            CommandKind::PutToken,
            vec![Arg::Guid(zone_id), Arg::token(Token::new("Elf"))],
        )
        .unwrap();
        assert_eq!(cmd.get::<Guid>(0).unwrap(), zone_id);
        assert_eq!(cmd.get::<&Token>(1).unwrap().name, "Elf");
        assert!(cmd.get::<i32>(0).is_err());
        assert!(cmd.get::<Guid>(5).is_err());
        assert!(cmd.sender().is_server());
    }

    #[test]
    fn dispatch_classes() {
        assert!(CommandKind::UpdateAssetTransfer.is_background_safe());
        assert!(CommandKind::UpdateData.is_background_safe());
        assert!(!CommandKind::PutToken.is_background_safe());
        assert!(CommandKind::PutToken.is_optimistic());
        assert!(!CommandKind::BringTokensToFront.is_optimistic());
    }
}
