//! Representation of values in Ze.

use std::rc::Rc;

use crate::object::Obj;

extern crate static_assertions as sa;

/// A Ze runtime value.
///
/// The same type serves as the compile-time constant representation and as the VM's operand
/// type. Exactly one variant is ever active, and the accessors below never hand back a payload
/// for the wrong variant --- they return `None` instead.
///
/// You can create a Ze value from its equivalent Rust type:
///
/// ```
/// # use zevm::value::Value;
/// let float: f64 = 0.5;
/// let v: Value = float.into();
/// assert_eq!("0.5", v.to_string());
///
/// let switch = false;
/// let v: Value = switch.into();
/// assert_eq!("false", v.to_string());
/// ```
///
/// This even works with `Option<T>`: a Rust `None` turns into [Value::None].
///
/// ```
/// # use zevm::value::Value;
/// let option: Option<f64> = None;
/// let v: Value = option.into();
/// assert_eq!("none", v.to_string());
/// ```
#[derive(Debug, Default, Clone)]
pub enum Value {
    /// The absence of a value. Doing arithmetic with this is an error.
    #[default]
    None,
    /// A boolean.
    Boolean(bool),
    /// All numbers in Ze are 64-bit floating point.
    Number(f64),
    /// A reference to a heap object, shared by reference count.
    Obj(Rc<Obj>),
}

// One word of tag, one word of payload.
sa::assert_eq_size!(Value, [u8; 16]);

/// A collection of values. Used as a chunk's constant pool.
#[derive(Default, Debug, Clone)]
pub struct ValueArray {
    values: Vec<Value>,
}

///////////////////////////////////////// Implementation //////////////////////////////////////////

impl Value {
    /// Returns true if this value is a Ze boolean.
    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Boolean(_))
    }

    /// Returns true if this value is Ze's none.
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Returns true if this value is a Ze number.
    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    /// Returns true if this value is a reference to a heap object.
    pub fn is_obj(&self) -> bool {
        matches!(self, Value::Obj(_))
    }

    /// Returns the boolean, if this value is a Ze boolean.
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    /// Returns the float, if this value is a Ze number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(num) => Some(*num),
            _ => None,
        }
    }

    /// Returns the referenced object, if this value is object-backed.
    pub fn as_obj(&self) -> Option<&Rc<Obj>> {
        match self {
            Value::Obj(obj) => Some(obj),
            _ => None,
        }
    }
}

// Ze's rules for equality: per-tag, never across tags. Numbers use IEEE 754 equality, so a NaN
// is not equal to itself. Objects delegate to the object subsystem.
impl PartialEq for Value {
    fn eq(&self, rhs: &Value) -> bool {
        match (self, rhs) {
            (Value::None, Value::None) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Obj(a), Value::Obj(b)) => Rc::ptr_eq(a, b) || a == b,
            _ => false,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Value::None => write!(f, "none"),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Number(num) => write!(f, "{num}"),
            Value::Obj(obj) => write!(f, "{obj}"),
        }
    }
}

// Convert any Rust float into a Ze value.
impl From<f64> for Value {
    #[inline(always)]
    fn from(float: f64) -> Value {
        Value::Number(float)
    }
}

// Convert any Rust bool into a Ze value.
impl From<bool> for Value {
    #[inline(always)]
    fn from(value: bool) -> Value {
        Value::Boolean(value)
    }
}

// Move any Rust (owned) string to the heap as a Ze value.
impl From<String> for Value {
    fn from(owned: String) -> Value {
        Value::Obj(Rc::new(Obj::ZeString(owned)))
    }
}

// Copy any Rust (borrowed) string to the heap as a Ze value.
impl From<&str> for Value {
    fn from(borrowed: &str) -> Value {
        borrowed.to_owned().into()
    }
}

// Convert an option of anything convertible, mapping Rust's None to Ze's none.
impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    #[inline]
    fn from(option: Option<T>) -> Value {
        option.map(Into::into).unwrap_or(Value::None)
    }
}

impl ValueArray {
    /// Return an empty [ValueArray].
    pub fn new() -> Self {
        ValueArray::default()
    }

    /// Returns the [Value] at the given index. If the index is out of bounds, this returns
    /// `None`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<Value> {
        self.values.get(index).cloned()
    }

    /// Appends a new [Value] to the array.
    pub fn write(&mut self, value: Value) {
        self.values.push(value)
    }

    /// Returns how many values are in the pool.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if there are no values.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn accessors_refuse_the_wrong_tag() {
        let number: Value = 1.5.into();
        assert_eq!(Some(1.5), number.as_number());
        assert_eq!(None, number.as_boolean());
        assert!(number.as_obj().is_none());

        let truthy: Value = true.into();
        assert_eq!(Some(true), truthy.as_boolean());
        assert_eq!(None, truthy.as_number());

        let nothing = Value::None;
        assert!(nothing.is_none());
        assert_eq!(None, nothing.as_number());
    }

    #[test]
    fn equality_is_per_tag() {
        assert_eq!(Value::from(1.0), Value::from(1.0));
        assert_eq!(Value::from(true), Value::from(true));
        assert_eq!(Value::None, Value::None);

        // Never equal across tags.
        assert_ne!(Value::from(0.0), Value::from(false));
        assert_ne!(Value::None, Value::from(false));

        // IEEE 754: NaN is not equal to itself.
        assert_ne!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn string_values_compare_by_content() {
        let a: Value = "hello".into();
        let b: Value = String::from("hello").into();
        assert_eq!(a, b);
        assert_ne!(a, Value::from("world"));
        assert!(a.is_obj());
    }

    #[test]
    fn display_uses_literal_words() {
        assert_eq!("none", Value::None.to_string());
        assert_eq!("true", Value::from(true).to_string());
        assert_eq!("false", Value::from(false).to_string());
        assert_eq!("2.5", Value::from(2.5).to_string());
        assert_eq!("inf", Value::from(f64::INFINITY).to_string());
        assert_eq!("hello", Value::from("hello").to_string());
    }

    #[test]
    fn value_array_is_bounds_checked() {
        let mut pool = ValueArray::new();
        assert!(pool.is_empty());
        assert_eq!(None, pool.get(0));

        pool.write(1.0.into());
        pool.write(2.0.into());
        assert_eq!(2, pool.len());
        assert_eq!(Some(Value::from(2.0)), pool.get(1));
        assert_eq!(None, pool.get(2));
    }
}
