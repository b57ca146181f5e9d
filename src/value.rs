//! The closed, tagged value model shared by every other component.
//!
//! Values travel as [`ValueRef`] handles (reference counted).  The kind of a
//! value never changes after construction; the string, binary, raw and record
//! payloads sit behind a `RefCell` because `resize` and attribute edits
//! mutate them in place, and every handle to the same value observes the
//! edit.  [`ValueRef::copy`] produces an independent deep clone for the
//! operators that copy instead (`assign`, concatenation, conversions).
//!
//! Three access modes:
//!
//! * **actual** (`actual_*`): the exact stored kind, no indirection.
//! * **target** (`target*`): follow variable → reference → expression
//!   indirection through the [`Environment`], then behave as *actual*.
//! * **convert** (`convert_*`): best-effort coercion between primitive kinds.
//!
//! Kind mismatches surface as the internal `ExprError::WrongKind`.

use std::cell::{Ref, RefCell, RefMut};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

use bytes::BytesMut;
use log::debug;

use crate::environment::Environment;
use crate::error::{ExprError, Result};
use crate::expr::Expression;
use crate::function::Function;
use crate::pattern::Pattern;
use crate::tuple::Tuple;

// ─────────────────────────────────────────────────────────────────────────────
// Interned names
// ─────────────────────────────────────────────────────────────────────────────

thread_local! {
    static NAMES: RefCell<HashSet<Rc<str>>> = RefCell::new(HashSet::new());
}

/// An interned symbol.  Equal names share one allocation per thread.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Name(Rc<str>);

impl Name {
    pub fn new(text: &str) -> Self {
        NAMES.with(|names| {
            let mut names = names.borrow_mut();

            if let Some(existing) = names.get(text) {
                return Name(existing.clone());
            }

            let interned: Rc<str> = Rc::from(text);
            names.insert(interned.clone());
            Name(interned)
        })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Kinds and payloads
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Bool,
    Char,
    Int,
    Float,
    Name,
    String,
    Binary,
    Raw,
    Regex,
    Reference,
    Variable,
    Expression,
    Tuple,
    Meta,
    Function,
    Control,
}

impl Kind {
    pub fn name(self) -> &'static str {
        match self {
            Kind::Bool => "bool",
            Kind::Char => "char",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Name => "name",
            Kind::String => "string",
            Kind::Binary => "binary",
            Kind::Raw => "raw",
            Kind::Regex => "regex",
            Kind::Reference => "reference",
            Kind::Variable => "variable",
            Kind::Expression => "expression",
            Kind::Tuple => "tuple",
            Kind::Meta => "meta",
            Kind::Function => "function",
            Kind::Control => "control",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Path-shaped value resolved by the environment's external resolver,
/// optionally relative to a context value.
#[derive(Debug, Clone)]
pub struct Reference {
    pub path: String,
    pub context: Option<ValueRef>,
}

/// Internal signal values.  Only `return` exists.
#[derive(Debug, Clone)]
pub enum Control {
    Return(ValueRef),
}

#[derive(Debug)]
pub enum Value {
    Bool(bool),
    Char(char),
    Int(i64),
    Float(f64),
    Name(Name),
    String(RefCell<String>),
    Binary(RefCell<BytesMut>),
    Raw(RefCell<Vec<String>>),
    Regex(Pattern),
    Reference(Reference),
    Variable(Name),
    Expression(Expression),
    Tuple(RefCell<Tuple>),
    Meta(RefCell<Tuple>),
    Function(Function),
    Control(Control),
}

/// Shared handle to a [`Value`].
#[derive(Debug, Clone)]
pub struct ValueRef(Rc<Value>);

impl Deref for ValueRef {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for ValueRef {
    fn from(value: Value) -> Self {
        ValueRef(Rc::new(value))
    }
}

// ───────────────────────────── constructors ────────────────────────────────

impl Value {
    pub fn bool(b: bool) -> ValueRef {
        Value::Bool(b).into()
    }

    pub fn char(c: char) -> ValueRef {
        Value::Char(c).into()
    }

    pub fn int(i: i64) -> ValueRef {
        Value::Int(i).into()
    }

    pub fn float(x: f64) -> ValueRef {
        Value::Float(x).into()
    }

    pub fn name(text: &str) -> ValueRef {
        Value::Name(Name::new(text)).into()
    }

    pub fn string<S: Into<String>>(s: S) -> ValueRef {
        Value::String(RefCell::new(s.into())).into()
    }

    pub fn binary(bytes: &[u8]) -> ValueRef {
        Value::Binary(RefCell::new(BytesMut::from(bytes))).into()
    }

    pub fn raw<I, S>(lines: I) -> ValueRef
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::Raw(RefCell::new(lines.into_iter().map(Into::into).collect())).into()
    }

    pub fn regex(pattern: Pattern) -> ValueRef {
        Value::Regex(pattern).into()
    }

    pub fn reference(path: &str, context: Option<ValueRef>) -> ValueRef {
        Value::Reference(Reference {
            path: path.to_owned(),
            context,
        })
        .into()
    }

    pub fn variable(name: &str) -> ValueRef {
        Value::Variable(Name::new(name)).into()
    }

    pub fn expression(expr: Expression) -> ValueRef {
        Value::Expression(expr).into()
    }

    pub fn tuple(tuple: Tuple) -> ValueRef {
        Value::Tuple(RefCell::new(tuple)).into()
    }

    pub fn meta(tuple: Tuple) -> ValueRef {
        Value::Meta(RefCell::new(tuple)).into()
    }

    pub fn function(function: Function) -> ValueRef {
        Value::Function(function).into()
    }

    pub fn ret(payload: ValueRef) -> ValueRef {
        Value::Control(Control::Return(payload)).into()
    }
}

// ───────────────────────────── actual access ───────────────────────────────

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Char(_) => Kind::Char,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Name(_) => Kind::Name,
            Value::String(_) => Kind::String,
            Value::Binary(_) => Kind::Binary,
            Value::Raw(_) => Kind::Raw,
            Value::Regex(_) => Kind::Regex,
            Value::Reference(_) => Kind::Reference,
            Value::Variable(_) => Kind::Variable,
            Value::Expression(_) => Kind::Expression,
            Value::Tuple(_) => Kind::Tuple,
            Value::Meta(_) => Kind::Meta,
            Value::Function(_) => Kind::Function,
            Value::Control(_) => Kind::Control,
        }
    }

    /// Variable, reference and expression values stand for something else.
    pub fn is_indirection(&self) -> bool {
        matches!(self, Value::Variable(_) | Value::Reference(_) | Value::Expression(_))
    }

    #[inline]
    fn wrong(&self, expected: Kind) -> ExprError {
        ExprError::wrong_kind(expected.name(), self.kind().name())
    }

    pub fn actual_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            _ => Err(self.wrong(Kind::Bool)),
        }
    }

    pub fn actual_char(&self) -> Result<char> {
        match self {
            Value::Char(c) => Ok(*c),
            _ => Err(self.wrong(Kind::Char)),
        }
    }

    pub fn actual_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            _ => Err(self.wrong(Kind::Int)),
        }
    }

    pub fn actual_float(&self) -> Result<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            _ => Err(self.wrong(Kind::Float)),
        }
    }

    pub fn actual_name(&self) -> Result<&Name> {
        match self {
            Value::Name(n) => Ok(n),
            _ => Err(self.wrong(Kind::Name)),
        }
    }

    pub fn actual_string(&self) -> Result<Ref<'_, String>> {
        match self {
            Value::String(s) => Ok(s.borrow()),
            _ => Err(self.wrong(Kind::String)),
        }
    }

    pub fn actual_string_mut(&self) -> Result<RefMut<'_, String>> {
        match self {
            Value::String(s) => Ok(s.borrow_mut()),
            _ => Err(self.wrong(Kind::String)),
        }
    }

    pub fn actual_binary(&self) -> Result<Ref<'_, BytesMut>> {
        match self {
            Value::Binary(b) => Ok(b.borrow()),
            _ => Err(self.wrong(Kind::Binary)),
        }
    }

    pub fn actual_raw(&self) -> Result<Ref<'_, Vec<String>>> {
        match self {
            Value::Raw(lines) => Ok(lines.borrow()),
            _ => Err(self.wrong(Kind::Raw)),
        }
    }

    pub fn actual_raw_mut(&self) -> Result<RefMut<'_, Vec<String>>> {
        match self {
            Value::Raw(lines) => Ok(lines.borrow_mut()),
            _ => Err(self.wrong(Kind::Raw)),
        }
    }

    pub fn actual_regex(&self) -> Result<&Pattern> {
        match self {
            Value::Regex(p) => Ok(p),
            _ => Err(self.wrong(Kind::Regex)),
        }
    }

    pub fn actual_reference(&self) -> Result<&Reference> {
        match self {
            Value::Reference(r) => Ok(r),
            _ => Err(self.wrong(Kind::Reference)),
        }
    }

    pub fn actual_variable(&self) -> Result<&Name> {
        match self {
            Value::Variable(n) => Ok(n),
            _ => Err(self.wrong(Kind::Variable)),
        }
    }

    pub fn actual_expression(&self) -> Result<&Expression> {
        match self {
            Value::Expression(e) => Ok(e),
            _ => Err(self.wrong(Kind::Expression)),
        }
    }

    pub fn actual_tuple(&self) -> Result<Ref<'_, Tuple>> {
        match self {
            Value::Tuple(t) => Ok(t.borrow()),
            _ => Err(self.wrong(Kind::Tuple)),
        }
    }

    pub fn actual_meta(&self) -> Result<Ref<'_, Tuple>> {
        match self {
            Value::Meta(t) => Ok(t.borrow()),
            _ => Err(self.wrong(Kind::Meta)),
        }
    }

    /// Tuple or meta: both carry an attribute record.
    pub fn actual_record(&self) -> Result<Ref<'_, Tuple>> {
        match self {
            Value::Tuple(t) | Value::Meta(t) => Ok(t.borrow()),
            _ => Err(self.wrong(Kind::Tuple)),
        }
    }

    pub fn actual_record_mut(&self) -> Result<RefMut<'_, Tuple>> {
        match self {
            Value::Tuple(t) | Value::Meta(t) => Ok(t.borrow_mut()),
            _ => Err(self.wrong(Kind::Tuple)),
        }
    }

    pub fn actual_function(&self) -> Result<&Function> {
        match self {
            Value::Function(f) => Ok(f),
            _ => Err(self.wrong(Kind::Function)),
        }
    }

    pub fn actual_control(&self) -> Result<&Control> {
        match self {
            Value::Control(c) => Ok(c),
            _ => Err(self.wrong(Kind::Control)),
        }
    }

    /// Three-way comparison between two values of the same kind.
    ///
    /// Numeric for bool/char/int/float, byte-wise for string/binary/name,
    /// element-wise for raw and records.  Anything else is not ordered.
    pub fn actual_compare(&self, other: &Value) -> Result<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Ok(a.cmp(b)),
            (Value::Char(a), Value::Char(b)) => Ok(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
            (Value::Float(a), Value::Float(b)) => Ok(a.total_cmp(b)),
            (Value::Name(a), Value::Name(b)) => Ok(a.as_str().cmp(b.as_str())),
            (Value::String(a), Value::String(b)) => Ok(a.borrow().as_bytes().cmp(b.borrow().as_bytes())),
            (Value::Binary(a), Value::Binary(b)) => Ok(a.borrow()[..].cmp(&b.borrow()[..])),
            (Value::Raw(a), Value::Raw(b)) => Ok(a.borrow().as_slice().cmp(b.borrow().as_slice())),
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Meta(a), Value::Meta(b)) => {
                a.borrow().compare(&b.borrow())
            }
            _ => Err(other.wrong(self.kind())),
        }
    }
}

// ───────────────────────────── conversions ─────────────────────────────────

impl Value {
    pub fn convert_bool(&self) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Int(i) => Ok(*i != 0),
            Value::Float(x) => Ok(*x != 0.0),
            Value::Char(c) => Ok(*c != '\0'),
            Value::String(s) => match s.borrow().trim() {
                t if t.eq_ignore_ascii_case("true") => Ok(true),
                t if t.eq_ignore_ascii_case("false") => Ok(false),
                _ => Err(self.wrong(Kind::Bool)),
            },
            _ => Err(self.wrong(Kind::Bool)),
        }
    }

    pub fn convert_int(&self) -> Result<i64> {
        match self {
            Value::Int(i) => Ok(*i),
            Value::Bool(b) => Ok(i64::from(*b)),
            Value::Float(x) => Ok(*x as i64),
            Value::Char(c) => Ok(i64::from(u32::from(*c))),
            Value::String(s) => {
                let s = s.borrow();
                let t = s.trim();
                t.parse::<i64>()
                    .ok()
                    .or_else(|| t.parse::<f64>().ok().map(|x| x as i64))
                    .ok_or_else(|| self.wrong(Kind::Int))
            }
            _ => Err(self.wrong(Kind::Int)),
        }
    }

    pub fn convert_float(&self) -> Result<f64> {
        match self {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::Char(c) => Ok(f64::from(u32::from(*c))),
            Value::String(s) => s.borrow().trim().parse::<f64>().map_err(|_| self.wrong(Kind::Float)),
            _ => Err(self.wrong(Kind::Float)),
        }
    }

    pub fn convert_char(&self) -> Result<char> {
        match self {
            Value::Char(c) => Ok(*c),
            Value::Int(i) => u32::try_from(*i)
                .ok()
                .and_then(char::from_u32)
                .ok_or_else(|| self.wrong(Kind::Char)),
            Value::String(s) => {
                let s = s.borrow();
                let mut chars = s.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(self.wrong(Kind::Char)),
                }
            }
            Value::Name(n) if n.as_str().chars().count() == 1 => {
                n.as_str().chars().next().ok_or_else(|| self.wrong(Kind::Char))
            }
            _ => Err(self.wrong(Kind::Char)),
        }
    }

    /// Plain text form (no quotes, no escapes).
    pub fn convert_string(&self) -> Result<String> {
        match self {
            Value::String(s) => Ok(s.borrow().clone()),
            Value::Char(c) => Ok(c.to_string()),
            Value::Name(n) => Ok(n.as_str().to_owned()),
            Value::Bool(_) | Value::Int(_) | Value::Float(_) => Ok(self.to_string()),
            Value::Binary(b) => Ok(hex(&b.borrow())),
            Value::Raw(lines) => Ok(lines.borrow().join("\n")),
            _ => Err(self.wrong(Kind::String)),
        }
    }

    pub fn convert_name(&self) -> Result<Name> {
        match self {
            Value::Name(n) => Ok(n.clone()),
            Value::String(s) => Ok(Name::new(&s.borrow())),
            Value::Char(c) => Ok(Name::new(c.encode_utf8(&mut [0; 4]))),
            Value::Variable(n) => Ok(n.clone()),
            _ => Err(self.wrong(Kind::Name)),
        }
    }

    pub fn convert_binary(&self) -> Result<Vec<u8>> {
        match self {
            Value::Binary(b) => Ok(b.borrow().to_vec()),
            Value::String(s) => Ok(s.borrow().as_bytes().to_vec()),
            Value::Raw(lines) => Ok(lines.borrow().join("\n").into_bytes()),
            _ => Err(self.wrong(Kind::Binary)),
        }
    }

    pub fn convert_raw(&self) -> Result<Vec<String>> {
        match self {
            Value::Raw(lines) => Ok(lines.borrow().clone()),
            Value::String(s) => Ok(s.borrow().lines().map(str::to_owned).collect()),
            _ => Err(self.wrong(Kind::Raw)),
        }
    }

    /// Number of elements for the sized kinds: characters, bytes, lines or
    /// attributes.
    pub fn size(&self) -> Result<usize> {
        match self {
            Value::String(s) => Ok(s.borrow().chars().count()),
            Value::Binary(b) => Ok(b.borrow().len()),
            Value::Raw(lines) => Ok(lines.borrow().len()),
            Value::Tuple(t) | Value::Meta(t) => Ok(t.borrow().len()),
            _ => Err(self.wrong(Kind::String)),
        }
    }
}

// ───────────────────────────── handle operations ───────────────────────────

impl ValueRef {
    /// Do both handles point at the same value?
    pub fn ptr_eq(&self, other: &ValueRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Independent deep clone, including record attributes.
    pub fn copy(&self) -> ValueRef {
        let value = match &**self {
            Value::Bool(b) => Value::Bool(*b),
            Value::Char(c) => Value::Char(*c),
            Value::Int(i) => Value::Int(*i),
            Value::Float(x) => Value::Float(*x),
            Value::Name(n) => Value::Name(n.clone()),
            Value::String(s) => Value::String(RefCell::new(s.borrow().clone())),
            Value::Binary(b) => Value::Binary(RefCell::new(b.borrow().clone())),
            Value::Raw(lines) => Value::Raw(RefCell::new(lines.borrow().clone())),
            Value::Regex(p) => Value::Regex(p.clone()),
            Value::Reference(r) => Value::Reference(Reference {
                path: r.path.clone(),
                context: r.context.as_ref().map(ValueRef::copy),
            }),
            Value::Variable(n) => Value::Variable(n.clone()),
            Value::Expression(e) => Value::Expression(e.copy()),
            Value::Tuple(t) => Value::Tuple(RefCell::new(t.borrow().copy())),
            Value::Meta(t) => Value::Meta(RefCell::new(t.borrow().copy())),
            Value::Function(f) => Value::Function(f.clone()),
            Value::Control(Control::Return(v)) => Value::Control(Control::Return(v.copy())),
        };

        value.into()
    }

    /// Follow variable → reference → expression indirection until a concrete
    /// value, or `None` at an unresolved dead end.
    ///
    /// There is no cycle detection: a variable bound to itself never returns.
    pub fn resolve(&self, env: &mut Environment) -> Result<Option<ValueRef>> {
        let mut current = self.clone();

        loop {
            let next = match &*current {
                Value::Variable(name) => env.get_actual(name.as_str()),
                Value::Reference(r) => env.get_path(&r.path, r.context.as_ref()),
                Value::Expression(e) => e.evaluate(env)?,
                _ => return Ok(Some(current)),
            };

            match next {
                Some(v) => {
                    debug!("Resolved {} to {}", current, v);
                    current = v;
                }
                None => return Ok(None),
            }
        }
    }

    /// [`resolve`](Self::resolve), failing with `NotFound` (echoing this
    /// value's source text) at a dead end.
    pub fn target(&self, env: &mut Environment) -> Result<ValueRef> {
        self.resolve(env)?
            .ok_or_else(|| ExprError::not_found(self.to_string()))
    }

    pub fn target_bool(&self, env: &mut Environment) -> Result<bool> {
        self.target(env)?.actual_bool()
    }

    pub fn target_char(&self, env: &mut Environment) -> Result<char> {
        self.target(env)?.actual_char()
    }

    pub fn target_int(&self, env: &mut Environment) -> Result<i64> {
        self.target(env)?.actual_int()
    }

    pub fn target_float(&self, env: &mut Environment) -> Result<f64> {
        self.target(env)?.actual_float()
    }

    pub fn target_string(&self, env: &mut Environment) -> Result<String> {
        Ok(self.target(env)?.actual_string()?.clone())
    }

    pub fn target_compare(&self, env: &mut Environment, other: &ValueRef) -> Result<Ordering> {
        let a = self.target(env)?;
        let b = other.target(env)?;

        a.actual_compare(&b)
    }

    pub fn convert_target_bool(&self, env: &mut Environment) -> Result<bool> {
        self.target(env)?.convert_bool()
    }

    pub fn convert_target_int(&self, env: &mut Environment) -> Result<i64> {
        self.target(env)?.convert_int()
    }

    pub fn convert_target_float(&self, env: &mut Environment) -> Result<f64> {
        self.target(env)?.convert_float()
    }

    pub fn convert_target_char(&self, env: &mut Environment) -> Result<char> {
        self.target(env)?.convert_char()
    }

    pub fn convert_target_string(&self, env: &mut Environment) -> Result<String> {
        self.target(env)?.convert_string()
    }

    pub fn convert_target_name(&self, env: &mut Environment) -> Result<Name> {
        self.target(env)?.convert_name()
    }

    pub fn convert_target_binary(&self, env: &mut Environment) -> Result<Vec<u8>> {
        self.target(env)?.convert_binary()
    }

    pub fn convert_target_raw(&self, env: &mut Environment) -> Result<Vec<String>> {
        self.target(env)?.convert_raw()
    }
}

impl PartialEq for ValueRef {
    fn eq(&self, other: &Self) -> bool {
        **self == **other
    }
}

// ───────────────────────────── equality & text ─────────────────────────────

/// Literal equality: same kind, same payload.  Indirection is *not* followed.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Name(a), Value::Name(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Raw(a), Value::Raw(b)) => a == b,
            (Value::Regex(a), Value::Regex(b)) => a == b,
            (Value::Reference(a), Value::Reference(b)) => a.path == b.path && a.context == b.context,
            (Value::Variable(a), Value::Variable(b)) => a == b,
            (Value::Expression(a), Value::Expression(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) | (Value::Meta(a), Value::Meta(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same(b),
            (Value::Control(Control::Return(a)), Value::Control(Control::Return(b))) => a == b,
            _ => false,
        }
    }
}

pub(crate) fn hex(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(out, "{:02x}", b);
    }
    out
}

fn write_escaped(f: &mut fmt::Formatter<'_>, text: &str, quote: char) -> fmt::Result {
    for c in text.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\n' => f.write_str("\\n")?,
            '\t' => f.write_str("\\t")?,
            '\r' => f.write_str("\\r")?,
            '\0' => f.write_str("\\0")?,
            c if c == quote => write!(f, "\\{}", c)?,
            c => write!(f, "{}", c)?,
        }
    }
    Ok(())
}

/// Literal source syntax, as used by the textual AST forms.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{}", b),

            Value::Char(c) => {
                f.write_str("'")?;
                write_escaped(f, c.encode_utf8(&mut [0; 4]), '\'')?;
                f.write_str("'")
            }

            Value::Int(i) => f.write_str(itoa::Buffer::new().format(*i)),

            Value::Float(x) => {
                if x.is_finite() && x.fract() == 0.0 {
                    write!(f, "{:.1}", x)
                } else {
                    write!(f, "{}", x)
                }
            }

            Value::Name(n) => write!(f, "#{}", n),

            Value::String(s) => {
                f.write_str("\"")?;
                write_escaped(f, &s.borrow(), '"')?;
                f.write_str("\"")
            }

            Value::Binary(b) => write!(f, "x\"{}\"", hex(&b.borrow())),

            Value::Raw(lines) => {
                f.write_str("[")?;
                for (i, line) in lines.borrow().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    f.write_str("\"")?;
                    write_escaped(f, line, '"')?;
                    f.write_str("\"")?;
                }
                f.write_str("]")
            }

            Value::Regex(p) => write!(f, "{}", p),

            Value::Reference(r) => write!(f, "${}", r.path),

            Value::Variable(n) => write!(f, "{}", n),

            Value::Expression(e) => write!(f, "({})", e.infix_str()),

            Value::Tuple(t) => write!(f, "{}", t.borrow()),

            Value::Meta(t) => write!(f, "meta{}", t.borrow()),

            Value::Function(func) => write!(f, "{}", func),

            Value::Control(Control::Return(v)) => write!(f, "<return {}>", v),
        }
    }
}

impl fmt::Display for ValueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}
