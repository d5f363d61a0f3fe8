// Wire form of token updates.
//
// `updateTokenProperty` carries the update as an `(update kind, argument
// list)` pair so the command signature stays fixed while the payload varies
// per kind. These two functions convert between that pair and the typed
// `TokenUpdate` the model applies.

use tabletop_model::{TokenUpdate, TokenUpdateKind};

use crate::arg::{Arg, FromArg};
use crate::error::ProtocolError;

/// Split an update into its kind and positional arguments.
pub fn encode_update(update: &TokenUpdate) -> (TokenUpdateKind, Vec<Arg>) {
    let args = match update {
        TokenUpdate::SetZOrder(z) => vec![Arg::Int(*z)],
        TokenUpdate::SetPosition { x, y } => vec![Arg::Int(*x), Arg::Int(*y)],
        TokenUpdate::SetName(name) => vec![Arg::str(name.as_str())],
        TokenUpdate::SetGmName(name) => vec![Arg::opt_str(name.as_deref())],
        TokenUpdate::SetVisible(visible) => vec![Arg::Bool(*visible)],
        TokenUpdate::SetLayer(layer) => vec![Arg::Layer(*layer)],
        TokenUpdate::SetFacing(facing) => vec![facing.map_or(Arg::Null, Arg::Int)],
        TokenUpdate::SetProperty { name, value } => {
            vec![Arg::str(name.as_str()), Arg::str(value.as_str())]
        }
        TokenUpdate::RemoveProperty(name) => vec![Arg::str(name.as_str())],
        TokenUpdate::SetOwners(owners) => vec![Arg::StringList(owners.iter().cloned().collect())],
    };
    (update.kind(), args)
}

fn nth<'a, T: FromArg<'a>>(
    kind: TokenUpdateKind,
    args: &'a [Arg],
    index: usize,
) -> Result<T, ProtocolError> {
    args.get(index).and_then(T::from_arg).ok_or_else(|| {
        ProtocolError::Malformed(format!(
            "{kind:?} update argument {index} should be {}",
            T::EXPECTED.name()
        ))
    })
}

/// Rebuild a typed update from its kind and arguments.
pub fn decode_update(kind: TokenUpdateKind, args: &[Arg]) -> Result<TokenUpdate, ProtocolError> {
    let expected = match kind {
        TokenUpdateKind::SetPosition | TokenUpdateKind::SetProperty => 2,
        _ => 1,
    };
    if args.len() != expected {
        return Err(ProtocolError::Malformed(format!(
            "{kind:?} update takes {expected} arguments, got {}",
            args.len()
        )));
    }
    Ok(match kind {
        TokenUpdateKind::SetZOrder => TokenUpdate::SetZOrder(nth(kind, args, 0)?),
        TokenUpdateKind::SetPosition => TokenUpdate::SetPosition {
            x: nth(kind, args, 0)?,
            y: nth(kind, args, 1)?,
        },
        TokenUpdateKind::SetName => TokenUpdate::SetName(nth::<&str>(kind, args, 0)?.to_owned()),
        TokenUpdateKind::SetGmName => {
            TokenUpdate::SetGmName(nth::<Option<&str>>(kind, args, 0)?.map(str::to_owned))
        }
        TokenUpdateKind::SetVisible => TokenUpdate::SetVisible(nth(kind, args, 0)?),
        TokenUpdateKind::SetLayer => TokenUpdate::SetLayer(nth(kind, args, 0)?),
        TokenUpdateKind::SetFacing => TokenUpdate::SetFacing(nth(kind, args, 0)?),
        TokenUpdateKind::SetProperty => TokenUpdate::SetProperty {
            name: nth::<&str>(kind, args, 0)?.to_owned(),
            value: nth::<&str>(kind, args, 1)?.to_owned(),
        },
        TokenUpdateKind::RemoveProperty => {
            TokenUpdate::RemoveProperty(nth::<&str>(kind, args, 0)?.to_owned())
        }
        TokenUpdateKind::SetOwners => {
            TokenUpdate::SetOwners(nth::<&[String]>(kind, args, 0)?.iter().cloned().collect())
        }
    })
}
