//! Runtime value types

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use super::ast::{FuncDecl, Span};
use crate::errors::{ErrorKind, ScriptError, ScriptResult};
use crate::executor::environment::EnvId;
use crate::executor::Interpreter;
use crate::task::TaskRef;

pub type ObjMap = IndexMap<String, Val>;

/* ===================== Values ===================== */

/// Runtime value
///
/// Lists and objects have reference semantics: cloning a `Val` shares the
/// underlying storage.
#[derive(Clone)]
pub enum Val {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    List(Rc<RefCell<Vec<Val>>>),
    Obj(Rc<RefCell<ObjMap>>),
    Func(Rc<Closure>),
    Native(NativeFunc),
    Task(TaskRef),
}

/// A user function paired with the environment it was declared in
#[derive(Debug)]
pub struct Closure {
    pub decl: Rc<FuncDecl>,
    pub env: EnvId,
}

pub type NativeImpl = dyn Fn(&mut Interpreter, Vec<Val>, Span) -> ScriptResult<Val>;

/// A function implemented in Rust
#[derive(Clone)]
pub struct NativeFunc {
    pub name: Rc<str>,
    func: Rc<NativeImpl>,
}

impl NativeFunc {
    pub fn new<F>(name: impl Into<Rc<str>>, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Vec<Val>, Span) -> ScriptResult<Val> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    pub fn call(&self, interp: &mut Interpreter, args: Vec<Val>, span: Span) -> ScriptResult<Val> {
        let func = Rc::clone(&self.func);
        func(interp, args, span)
    }
}

impl Default for Val {
    fn default() -> Self {
        Val::Nil
    }
}

impl Val {
    pub fn string(s: impl Into<Rc<str>>) -> Val {
        Val::Str(s.into())
    }

    pub fn list(items: Vec<Val>) -> Val {
        Val::List(Rc::new(RefCell::new(items)))
    }

    pub fn object(map: ObjMap) -> Val {
        Val::Obj(Rc::new(RefCell::new(map)))
    }

    pub fn native<F>(name: &str, func: F) -> Val
    where
        F: Fn(&mut Interpreter, Vec<Val>, Span) -> ScriptResult<Val> + 'static,
    {
        Val::Native(NativeFunc::new(name, func))
    }

    /// Only `false` and `nil` are falsy
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Val::Nil | Val::Bool(false))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Val::Nil => "nil",
            Val::Bool(_) => "bool",
            Val::Int(_) => "int",
            Val::Float(_) => "float",
            Val::Str(_) => "string",
            Val::List(_) => "list",
            Val::Obj(_) => "object",
            Val::Func(_) | Val::Native(_) => "function",
            Val::Task(_) => "task",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Val::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Val::Int(i) => Some(*i as f64),
            Val::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Val::Func(_) | Val::Native(_))
    }

    /// Source-like rendering: strings are quoted
    pub fn repr(&self) -> String {
        match self {
            Val::Str(s) => format!("{:?}", s.as_ref()),
            other => other.to_string(),
        }
    }

    /// Identity of the shared storage behind a list or object
    fn container_ptr(&self) -> Option<*const ()> {
        match self {
            Val::List(items) => Some(Rc::as_ptr(items) as *const ()),
            Val::Obj(map) => Some(Rc::as_ptr(map) as *const ()),
            _ => None,
        }
    }
}

/* ===================== Equality ===================== */

impl PartialEq for Val {
    fn eq(&self, other: &Self) -> bool {
        values_equal(self, other, &mut Vec::new())
    }
}

/// Structural equality; a pair of containers already being compared
/// further up counts as equal so cyclic values terminate
fn values_equal(a: &Val, b: &Val, comparing: &mut Vec<(*const (), *const ())>) -> bool {
    match (a, b) {
        (Val::Nil, Val::Nil) => true,
        (Val::Bool(a), Val::Bool(b)) => a == b,
        (Val::Int(a), Val::Int(b)) => a == b,
        (Val::Float(a), Val::Float(b)) => a == b,
        (Val::Int(a), Val::Float(b)) | (Val::Float(b), Val::Int(a)) => (*a as f64) == *b,
        (Val::Str(a), Val::Str(b)) => a == b,
        (Val::List(x), Val::List(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && with_pair(a, b, comparing, |comparing| {
                    x.iter()
                        .zip(y.iter())
                        .all(|(l, r)| values_equal(l, r, comparing))
                })
        }
        (Val::Obj(x), Val::Obj(y)) => {
            if Rc::ptr_eq(x, y) {
                return true;
            }
            let (x, y) = (x.borrow(), y.borrow());
            x.len() == y.len()
                && with_pair(a, b, comparing, |comparing| {
                    x.iter().all(|(key, l)| {
                        y.get(key)
                            .map_or(false, |r| values_equal(l, r, comparing))
                    })
                })
        }
        (Val::Func(a), Val::Func(b)) => Rc::ptr_eq(a, b),
        (Val::Native(a), Val::Native(b)) => Rc::ptr_eq(&a.func, &b.func),
        (Val::Task(a), Val::Task(b)) => a.ptr_eq(b),
        _ => false,
    }
}

fn with_pair(
    a: &Val,
    b: &Val,
    comparing: &mut Vec<(*const (), *const ())>,
    compare: impl FnOnce(&mut Vec<(*const (), *const ())>) -> bool,
) -> bool {
    let (Some(pa), Some(pb)) = (a.container_ptr(), b.container_ptr()) else {
        return false;
    };
    if comparing.contains(&(pa, pb)) {
        return true;
    }
    comparing.push((pa, pb));
    let equal = compare(comparing);
    comparing.pop();
    equal
}

/* ===================== Display ===================== */

impl fmt::Display for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_val(self, f, &mut Vec::new(), false)
    }
}

/// Containers already on `open` render as `[...]` / `{...}`
fn write_val(
    val: &Val,
    f: &mut fmt::Formatter<'_>,
    open: &mut Vec<*const ()>,
    quoted: bool,
) -> fmt::Result {
    match val {
        Val::Nil => write!(f, "nil"),
        Val::Bool(b) => write!(f, "{}", b),
        Val::Int(i) => write!(f, "{}", i),
        Val::Float(x) => {
            if x.fract() == 0.0 && x.is_finite() {
                write!(f, "{:.1}", x)
            } else {
                write!(f, "{}", x)
            }
        }
        Val::Str(s) if quoted => write!(f, "{:?}", s.as_ref()),
        Val::Str(s) => write!(f, "{}", s),
        Val::List(items) => {
            let ptr = Rc::as_ptr(items) as *const ();
            if open.contains(&ptr) {
                return write!(f, "[...]");
            }
            open.push(ptr);
            write!(f, "[")?;
            for (i, item) in items.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write_val(item, f, open, true)?;
            }
            open.pop();
            write!(f, "]")
        }
        Val::Obj(map) => {
            let ptr = Rc::as_ptr(map) as *const ();
            if open.contains(&ptr) {
                return write!(f, "{{...}}");
            }
            open.push(ptr);
            write!(f, "{{")?;
            for (i, (key, value)) in map.borrow().iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}: ", key)?;
                write_val(value, f, open, true)?;
            }
            open.pop();
            write!(f, "}}")
        }
        Val::Func(closure) => write!(f, "<func {}>", closure.decl.display_name()),
        Val::Native(native) => write!(f, "<native {}>", native.name),
        Val::Task(task) => write!(f, "<task {}>", task.state().as_str()),
    }
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Val::Str(s) => write!(f, "Str({:?})", s.as_ref()),
            Val::Int(i) => write!(f, "Int({})", i),
            Val::Float(x) => write!(f, "Float({})", x),
            Val::Bool(b) => write!(f, "Bool({})", b),
            other => write!(f, "{}", other),
        }
    }
}

/* ===================== JSON Conversion ===================== */

/// Convert a JSON document into a runtime value
pub fn json_to_val(json: &JsonValue) -> Val {
    match json {
        JsonValue::Null => Val::Nil,
        JsonValue::Bool(b) => Val::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => Val::Int(i),
            None => Val::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => Val::string(s.as_str()),
        JsonValue::Array(items) => Val::list(items.iter().map(json_to_val).collect()),
        JsonValue::Object(map) => Val::object(
            map.iter()
                .map(|(k, v)| (k.clone(), json_to_val(v)))
                .collect(),
        ),
    }
}

/// Convert a runtime value into JSON; functions, tasks and cyclic values are not representable
pub fn val_to_json(val: &Val, span: Span) -> ScriptResult<JsonValue> {
    to_json(val, span, &mut Vec::new())
}

fn to_json(val: &Val, span: Span, open: &mut Vec<*const ()>) -> ScriptResult<JsonValue> {
    if let Some(ptr) = val.container_ptr() {
        if open.contains(&ptr) {
            return Err(ScriptError::at(
                ErrorKind::TypeError,
                "Cannot convert cyclic value to JSON",
                span,
            ));
        }
        open.push(ptr);
    }

    let json = match val {
        Val::Nil => JsonValue::Null,
        Val::Bool(b) => JsonValue::Bool(*b),
        Val::Int(i) => JsonValue::from(*i),
        Val::Float(x) => serde_json::Number::from_f64(*x)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        Val::Str(s) => JsonValue::String(s.to_string()),
        Val::List(items) => JsonValue::Array(
            items
                .borrow()
                .iter()
                .map(|v| to_json(v, span, open))
                .collect::<ScriptResult<_>>()?,
        ),
        Val::Obj(map) => {
            let mut out = serde_json::Map::new();
            for (k, v) in map.borrow().iter() {
                out.insert(k.clone(), to_json(v, span, open)?);
            }
            JsonValue::Object(out)
        }
        other => {
            return Err(ScriptError::at(
                ErrorKind::TypeError,
                format!("Cannot convert {} value to JSON", other.type_name()),
                span,
            ))
        }
    };

    if val.container_ptr().is_some() {
        open.pop();
    }
    Ok(json)
}
