//! This module implements the backing representation of runtime
//! values flowing through compiled Hilt programs.
//!
//! The compiler erases source types before lowering, so a single
//! dynamic value enum is enough: scalars, interned strings, tagged
//! datatype records, and handles to mutable cells. Continuations and
//! handler bodies are native closures and never appear as values.

use std::fmt::Display;
use std::rc::Rc;

use smol_str::SmolStr;

use crate::errors::ErrorKind;
use crate::region::Cell;

#[derive(Clone, Debug)]
pub enum Value {
    Unit,
    Bool(bool),
    Integer(i64),
    String(SmolStr),

    /// An instance of a compiler-declared datatype constructor.
    Data(Rc<Data>),

    /// Handle to a mutable cell owned by some region.
    Cell(Rc<Cell>),
}

/// A tagged record produced by a datatype constructor: the
/// constructor's kind (the datatype name), its tag within that
/// datatype, and the ordered field values.
#[derive(Clone, Debug, PartialEq)]
pub struct Data {
    pub kind: SmolStr,
    pub tag: usize,
    pub fields: Box<[Value]>,
}

/// Build a datatype constructor. The returned closure produces
/// instances carrying the tag and the ordered tuple of field values;
/// the compiler emits one such constructor per source-level variant.
pub fn constructor(kind: &str, tag: usize) -> impl Fn(Vec<Value>) -> Value {
    let kind = SmolStr::new(kind);
    move |fields| {
        Value::Data(Rc::new(Data {
            kind: kind.clone(),
            tag,
            fields: fields.into_boxed_slice(),
        }))
    }
}

/// Generate an accessor method that returns either the expected
/// type, or a type error.
macro_rules! gen_cast {
    ( $name:ident, $type:ty, $expected:expr, $variant:pat, $result:expr ) => {
        pub fn $name(&self) -> Result<$type, ErrorKind> {
            match self {
                $variant => Ok($result),
                other => Err(type_error($expected, other)),
            }
        }
    };
}

/// Generate an `is_*` type-checking method.
macro_rules! gen_is {
    ( $name:ident, $variant:pat ) => {
        pub fn $name(&self) -> bool {
            matches!(self, $variant)
        }
    };
}

impl Value {
    gen_cast!(as_int, i64, "int", Value::Integer(x), *x);
    gen_cast!(as_bool, bool, "bool", Value::Bool(b), *b);
    gen_cast!(to_str, SmolStr, "string", Value::String(s), s.clone());
    gen_cast!(to_cell, Rc<Cell>, "cell", Value::Cell(c), Rc::clone(c));
    gen_cast!(to_data, Rc<Data>, "data", Value::Data(d), Rc::clone(d));

    gen_is!(is_unit, Value::Unit);
    gen_is!(is_bool, Value::Bool(_));
    gen_is!(is_int, Value::Integer(_));
    gen_is!(is_string, Value::String(_));
    gen_is!(is_data, Value::Data(_));
    gen_is!(is_cell, Value::Cell(_));

    pub fn type_of(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Integer(_) => "int",
            Value::String(_) => "string",
            Value::Data(_) => "data",
            Value::Cell(_) => "cell",
        }
    }
}

fn type_error(expected: &'static str, actual: &Value) -> ErrorKind {
    ErrorKind::TypeError {
        expected,
        actual: actual.type_of(),
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,

            // Cells compare by identity; their contents are mutable.
            (Value::Cell(a), Value::Cell(b)) => Rc::ptr_eq(a, b),

            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Integer(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Data(d) => write!(f, "{}", d),
            Value::Cell(_) => write!(f, "<cell>"),
        }
    }
}

impl Display for Data {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.kind)?;

        if !self.fields.is_empty() {
            write!(f, "(")?;
            for (i, field) in self.fields.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{}", field)?;
            }
            write!(f, ")")?;
        }

        Ok(())
    }
}
