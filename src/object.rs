//! Heap-allocated Ze objects.
//!
//! Only the minimal surface the value representation needs lives here: a polymorphic [Obj]
//! that [Value][crate::value::Value] points at through an [std::rc::Rc]. Reference counting is
//! the ownership model for every object-backed value; no object is ever aliased by a raw
//! pointer or a global store.

use std::fmt;

/// A heap-allocated Ze object.
///
/// Currently the only object kind is a string. Further kinds (functions, classes) get new
/// variants here rather than new [Value][crate::value::Value] variants.
#[derive(Debug, Clone)]
pub enum Obj {
    /// An immutable Ze string.
    ZeString(String),
}

impl Obj {
    /// Returns the string contents, if this object is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Obj::ZeString(contents) => Some(contents),
        }
    }
}

// Strings compare by content, which is indistinguishable from identity once literals are
// interned. Other object kinds will compare by identity (Rc::ptr_eq) at the Value level.
impl PartialEq for Obj {
    fn eq(&self, other: &Obj) -> bool {
        match (self, other) {
            (Obj::ZeString(a), Obj::ZeString(b)) => a == b,
        }
    }
}

impl Eq for Obj {}

impl fmt::Display for Obj {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Obj::ZeString(contents) => write!(f, "{contents}"),
        }
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;

    #[test]
    fn strings_compare_by_content() {
        let a = Rc::new(Obj::ZeString("hello".to_owned()));
        let b = Rc::new(Obj::ZeString("hello".to_owned()));
        assert!(!Rc::ptr_eq(&a, &b));
        assert_eq!(a, b);
    }

    #[test]
    fn strings_display_without_quotes() {
        let greeting = Obj::ZeString("hi".to_owned());
        assert_eq!("hi", greeting.to_string());
        assert_eq!(Some("hi"), greeting.as_str());
    }
}
