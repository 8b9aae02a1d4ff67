use crate::value::Value;

/// How a statement finished. `Return` travels up through enclosing blocks
/// and loops until the call boundary of the running function catches it.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlFlow {
    Normal,
    Return(Value),
}
