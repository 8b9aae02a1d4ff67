//! Native functions installed in the global scope of every interpreter.

use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::environment::Environment;
use crate::value::{NativeFunction, Value};

const NATIVES: &[NativeFunction] = &[NativeFunction {
    name: "clock",
    arity: 0,
    function: builtin_clock,
}];

pub fn install(globals: &Environment) {
    for native in NATIVES {
        globals.define(native.name, Value::Native(Rc::new(*native)));
    }
}

/// Seconds since the Unix epoch, with sub-second precision.
pub fn builtin_clock(_args: &[Value]) -> Value {
    let seconds = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs_f64())
        .unwrap_or(0.0);
    Value::Number(seconds)
}
