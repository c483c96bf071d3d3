use std::collections::HashMap;

use crate::error::{SupervisorError, SupervisorResult};
use crate::kind::InstructionKind;

/// A value found in a submitted program's `args` mapping.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
    Bool(bool),
}

impl Value {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }
}

/// The caller-submitted program, before decoding. A minimal self-describing
/// tree (map/list/scalar) standing in for whatever wire format an embedder's
/// transport actually uses; `rpc_request`/`sequence` accept any `ProgramNode`.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgramNode {
    Map(HashMap<String, ProgramNode>),
    List(Vec<ProgramNode>),
    Text(String),
    Number(f64),
    Bool(bool),
}

impl ProgramNode {
    pub fn map(fields: impl IntoIterator<Item = (&'static str, ProgramNode)>) -> Self {
        ProgramNode::Map(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    }

    fn as_map(&self) -> Option<&HashMap<String, ProgramNode>> {
        match self {
            ProgramNode::Map(m) => Some(m),
            _ => None,
        }
    }
}

/// Decoded instruction node: `AST{kind, args, body[]}`.
#[derive(Debug, Clone, PartialEq)]
pub struct Ast {
    pub kind: InstructionKind,
    pub args: HashMap<String, Value>,
    pub body: Vec<Ast>,
}

impl Ast {
    pub fn label(&self) -> Option<&str> {
        self.args.get("label").and_then(Value::as_text)
    }

    /// True when this AST is an RPC wrapping a single emergency lock/unlock,
    /// the shape that takes the hyper path instead of being queued.
    pub fn as_emergency_hyper_call(&self) -> Option<InstructionKind> {
        if self.kind != InstructionKind::RpcRequest || self.body.len() != 1 {
            return None;
        }
        match self.body[0].kind {
            kind @ (InstructionKind::EmergencyLock | InstructionKind::EmergencyUnlock) => {
                Some(kind)
            }
            _ => None,
        }
    }
}

/// Decodes a caller-submitted [`ProgramNode`] into an [`Ast`]. External
/// collaborator; the scheduler never interprets `ProgramNode`
/// itself. Implementations must accept whatever shape their embedder's
/// transport produces; [`MapDecoder`] is the bundled reference.
pub trait Decoder: Send + Sync + 'static {
    fn decode(&self, program: &ProgramNode) -> SupervisorResult<Ast>;
}

/// Reference decoder: expects `{kind: <string>, args: {..}, body: [..]}`,
/// the shape produced by [`ProgramNode::map`] and used throughout this
/// crate's own tests.
pub struct MapDecoder;

impl Decoder for MapDecoder {
    fn decode(&self, program: &ProgramNode) -> SupervisorResult<Ast> {
        decode_node(program)
    }
}

fn decode_node(node: &ProgramNode) -> SupervisorResult<Ast> {
    let map = node.as_map().ok_or_else(|| {
        SupervisorError::ArgumentError("program node is not a map".to_string())
    })?;

    let kind_name = map
        .get("kind")
        .and_then(ProgramNode::as_text_node)
        .ok_or_else(|| SupervisorError::ArgumentError("program node missing `kind`".to_string()))?;
    let kind = parse_kind(kind_name)?;

    let args = match map.get("args") {
        Some(ProgramNode::Map(fields)) => fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
            .collect::<SupervisorResult<HashMap<String, Value>>>()?,
        Some(_) => {
            return Err(SupervisorError::ArgumentError(
                "`args` must be a map".to_string(),
            ))
        }
        None => HashMap::new(),
    };

    let body = match map.get("body") {
        Some(ProgramNode::List(items)) => items
            .iter()
            .map(decode_node)
            .collect::<SupervisorResult<Vec<Ast>>>()?,
        Some(_) => return Err(SupervisorError::ArgumentError("`body` must be a list".to_string())),
        None => Vec::new(),
    };

    Ok(Ast { kind, args, body })
}

fn decode_value(node: &ProgramNode) -> SupervisorResult<Value> {
    match node {
        ProgramNode::Text(s) => Ok(Value::Text(s.clone())),
        ProgramNode::Number(n) => Ok(Value::Number(*n)),
        ProgramNode::Bool(b) => Ok(Value::Bool(*b)),
        _ => Err(SupervisorError::ArgumentError(
            "arg value must be a scalar".to_string(),
        )),
    }
}

impl ProgramNode {
    fn as_text_node(&self) -> Option<&str> {
        match self {
            ProgramNode::Text(s) => Some(s),
            _ => None,
        }
    }
}

fn parse_kind(name: &str) -> SupervisorResult<InstructionKind> {
    use InstructionKind::*;
    Ok(match name {
        "config_update" => ConfigUpdate,
        "_if" => If,
        "write_pin" => WritePin,
        "read_pin" => ReadPin,
        "move_absolute" => MoveAbsolute,
        "set_servo_angle" => SetServoAngle,
        "move_relative" => MoveRelative,
        "home" => Home,
        "find_home" => FindHome,
        "toggle_pin" => TogglePin,
        "zero" => Zero,
        "calibrate" => Calibrate,
        "sequence" => Sequence,
        "rpc_request" => RpcRequest,
        "check_updates" => CheckUpdates,
        "uninstall_farmware" => UninstallFarmware,
        "update_farmware" => UpdateFarmware,
        "rpc_ok" => RpcOk,
        "rpc_error" => RpcError,
        "install" => Install,
        "read_status" => ReadStatus,
        "sync" => Sync,
        "power_off" => PowerOff,
        "reboot" => Reboot,
        "factory_reset" => FactoryReset,
        "set_user_env" => SetUserEnv,
        "install_first_party_farmware" => InstallFirstPartyFarmware,
        "change_ownership" => ChangeOwnership,
        "dump_info" => DumpInfo,
        "send_message" => SendMessage,
        "wait" => Wait,
        "execute" => Execute,
        "execute_script" => ExecuteScript,
        "emergency_lock" => EmergencyLock,
        "emergency_unlock" => EmergencyUnlock,
        other => {
            return Err(SupervisorError::ArgumentError(format!(
                "unknown instruction kind `{other}`"
            )))
        }
    })
}

/// The interpreter's executable representation, produced by a [`Slicer`]
/// from a decoded [`Ast`] and consumed by the interpreter's process
/// constructor. Opaque to the scheduler core.
#[derive(Debug, Clone, PartialEq)]
pub struct Heap(pub Ast);

/// Slices a decoded AST into a [`Heap`]. External collaborator.
pub trait Slicer: Send + Sync + 'static {
    fn slice(&self, ast: &Ast) -> Heap;
}

/// Reference slicer: the toy interpreter's heap representation is just the
/// AST itself, so slicing is a move.
pub struct IdentitySlicer;

impl Slicer for IdentitySlicer {
    fn slice(&self, ast: &Ast) -> Heap {
        Heap(ast.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(kind: &'static str, body: Vec<ProgramNode>) -> ProgramNode {
        ProgramNode::map([
            ("kind", ProgramNode::Text(kind.to_string())),
            ("args", ProgramNode::map([])),
            ("body", ProgramNode::List(body)),
        ])
    }

    #[test]
    fn decodes_kind_args_and_body() {
        let node = ProgramNode::map([
            ("kind", ProgramNode::Text("move_absolute".to_string())),
            (
                "args",
                ProgramNode::map([("label", ProgramNode::Text("step one".to_string()))]),
            ),
            ("body", ProgramNode::List(vec![])),
        ]);
        let ast = MapDecoder.decode(&node).unwrap();
        assert_eq!(ast.kind, InstructionKind::MoveAbsolute);
        assert_eq!(ast.label(), Some("step one"));
        assert!(ast.body.is_empty());
    }

    #[test]
    fn missing_kind_is_an_argument_error() {
        let node = ProgramNode::map([]);
        assert!(matches!(
            MapDecoder.decode(&node),
            Err(SupervisorError::ArgumentError(_))
        ));
    }

    #[test]
    fn unknown_kind_is_an_argument_error() {
        let node = program("not_a_real_kind", vec![]);
        assert!(matches!(
            MapDecoder.decode(&node),
            Err(SupervisorError::ArgumentError(_))
        ));
    }

    #[test]
    fn recognizes_emergency_lock_rpc_shape() {
        let node = program("rpc_request", vec![program("emergency_lock", vec![])]);
        let ast = MapDecoder.decode(&node).unwrap();
        assert_eq!(
            ast.as_emergency_hyper_call(),
            Some(InstructionKind::EmergencyLock)
        );
    }

    #[test]
    fn an_ordinary_rpc_is_not_an_emergency_hyper_call() {
        let node = program("rpc_request", vec![program("read_status", vec![])]);
        let ast = MapDecoder.decode(&node).unwrap();
        assert_eq!(ast.as_emergency_hyper_call(), None);
    }
}
