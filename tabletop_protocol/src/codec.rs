// Gated decoding of command calls.
//
// A call arrives as a kind name plus a list of JSON argument nodes, each
// `{"type": <name>, "value": <payload>}`. Decoding runs in three steps and
// stops at the first failure, so a rejected message never yields a partial
// `Command`:
//
// 1. Gate: walk every argument node (and the elements of nested
//    `util.List` nodes) and check its type tag against the `AllowList`.
//    No payload is interpreted during this walk.
// 2. Resolve the kind name to a `CommandKind`.
// 3. Materialize each node into an `Arg` and check the result against the
//    kind's signature.

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::allowlist::AllowList;
use crate::arg::{Arg, ArgType};
use crate::command::{Command, CommandKind};
use crate::error::ProtocolError;
use crate::types::ConnectionId;

/// Deepest `util.List` nesting accepted inside one argument.
pub const MAX_LIST_DEPTH: usize = 16;

/// Check every type tag in `args` against `allow`.
pub fn gate(args: &[Value], allow: &AllowList) -> Result<(), ProtocolError> {
    for (index, node) in args.iter().enumerate() {
        gate_node(node, allow, 0).map_err(|e| {
            if let ProtocolError::Denied(name) = &e {
                warn!("denied type {name:?} in argument {index}");
            }
            e
        })?;
    }
    Ok(())
}

fn gate_node(node: &Value, allow: &AllowList, depth: usize) -> Result<(), ProtocolError> {
    if depth > MAX_LIST_DEPTH {
        return Err(ProtocolError::Malformed("argument lists nested too deeply".into()));
    }
    let fields = node
        .as_object()
        .ok_or_else(|| ProtocolError::Malformed("argument is not a tagged object".into()))?;
    let name = fields
        .get("type")
        .and_then(Value::as_str)
        .ok_or_else(|| ProtocolError::Malformed("argument has no type tag".into()))?;
    if !allow.permits(name) {
        return Err(ProtocolError::Denied(name.to_owned()));
    }
    if name == ArgType::List.name() {
        let items = fields
            .get("value")
            .and_then(Value::as_array)
            .ok_or_else(|| ProtocolError::Malformed("list argument without items".into()))?;
        for item in items {
            gate_node(item, allow, depth + 1)?;
        }
    }
    Ok(())
}

/// Decode a call received from `sender` into a validated `Command`.
pub fn decode_call(
    sender: ConnectionId,
    kind: &str,
    args: &[Value],
    allow: &AllowList,
) -> Result<Command, ProtocolError> {
    gate(args, allow)?;
    let kind: CommandKind = kind.parse()?;
    let args = args
        .iter()
        .map(Arg::deserialize)
        .collect::<Result<Vec<_>, _>>()?;
    Command::received(sender, kind, args)
}

/// Encode arguments into their tagged JSON form.
pub fn encode_args(args: &[Arg]) -> Result<Vec<Value>, ProtocolError> {
    args.iter()
        .map(|arg| serde_json::to_value(arg).map_err(ProtocolError::from))
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tabletop_model::{Guid, Token};

    use super::*;

    fn sender() -> ConnectionId {
        ConnectionId::new("c1")
    }

    #[test]
    fn decodes_valid_call() {
        let zone = Guid::from_u128(5);
        let args = encode_args(&[Arg::Guid(zone), Arg::token(Token::new("Bat"))]).unwrap();
        let cmd = decode_call(sender(), "putToken", &args, &AllowList::standard()).unwrap();
        assert_eq!(cmd.kind(), CommandKind::PutToken);
        assert_eq!(cmd.get::<Guid>(0).unwrap(), zone);
        assert_eq!(cmd.sender(), &sender());
    }

    #[test]
    fn denied_type_rejects_whole_message() {
        let args = vec![
            json!({"type": "util.Guid", "value": "00000000000000000000000000000001"}),
            json!({"type": "lang.Runtime", "value": "rm -rf /"}),
        ];
        let err = decode_call(sender(), "removeZone", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::Denied(name) if name == "lang.Runtime"));
    }

    #[test]
    fn gate_runs_before_kind_lookup() {
        let args = vec![json!({"type": "evil.Gadget", "value": null})];
        let err = decode_call(sender(), "fooBar", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::Denied(_)));
    }

    #[test]
    fn nested_list_items_are_gated() {
        let args = vec![
            json!({"type": "lang.Null"}),
            json!({"type": "lang.String", "value": "Ann"}),
            json!({"type": "lang.String", "value": "roll"}),
            json!({"type": "util.List", "value": [
                {"type": "lang.Integer", "value": 1},
                {"type": "util.List", "value": [{"type": "os.Process", "value": 0}]}
            ]}),
        ];
        let err = decode_call(sender(), "execFunction", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::Denied(name) if name == "os.Process"));
    }

    #[test]
    fn untagged_argument_is_malformed() {
        let args = vec![json!("00000000000000000000000000000001")];
        let err = decode_call(sender(), "removeZone", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::Malformed(_)));
    }

    #[test]
    fn unknown_kind_after_clean_gate() {
        let args = vec![json!({"type": "lang.Integer", "value": 1})];
        let err = decode_call(sender(), "fooBar", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::UnknownCommand(name) if name == "fooBar"));
    }

    #[test]
    fn permitted_but_unknown_model_type_fails_closed() {
        let args = vec![json!({"type": "tabletop.model.Gizmo", "value": {}})];
        let err = decode_call(sender(), "removeZone", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::Json(_)));
    }

    #[test]
    fn signature_mismatch_after_decode() {
        let args = encode_args(&[Arg::Int(3)]).unwrap();
        let err = decode_call(sender(), "removeZone", &args, &AllowList::standard()).unwrap_err();
        assert!(matches!(err, ProtocolError::ArgType { index: 0, .. }));
    }
}
