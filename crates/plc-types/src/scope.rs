//! Chained, shared name→binding scopes.
//!
//! A [`Scope`] is a handle to one frame. Frames are reference-counted so
//! that closures can keep their defining frame alive after the block that
//! created it has finished. Cloning a handle never copies bindings.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Returned by [`Scope::define`] when the name already exists in the frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is already defined in this scope")]
pub struct Redefinition(pub String);

struct Frame<T> {
    parent: Option<Scope<T>>,
    /// Bindings in definition order. Frames are small, so lookups are linear.
    bindings: Vec<(String, T)>,
}

pub struct Scope<T> {
    frame: Rc<RefCell<Frame<T>>>,
}

impl<T> Clone for Scope<T> {
    fn clone(&self) -> Self {
        Self {
            frame: Rc::clone(&self.frame),
        }
    }
}

impl<T: Clone> Scope<T> {
    pub fn new(parent: Option<Scope<T>>) -> Self {
        Self {
            frame: Rc::new(RefCell::new(Frame {
                parent,
                bindings: Vec::new(),
            })),
        }
    }

    /// A frame with no parent.
    pub fn root() -> Self {
        Self::new(None)
    }

    /// A fresh frame whose parent is `self`.
    pub fn child(&self) -> Self {
        Self::new(Some(self.clone()))
    }

    /// Look up `name`, either in this frame only or along the parent chain.
    pub fn get(&self, name: &str, current_only: bool) -> Option<T> {
        let frame = self.frame.borrow();
        if let Some((_, value)) = frame.bindings.iter().find(|(key, _)| key == name) {
            return Some(value.clone());
        }
        match &frame.parent {
            Some(parent) if !current_only => parent.get(name, false),
            _ => None,
        }
    }

    /// Bind `name` in this frame. Shadowing an outer binding is allowed.
    pub fn define(&self, name: impl Into<String>, value: T) -> Result<(), Redefinition> {
        let name = name.into();
        let mut frame = self.frame.borrow_mut();
        if frame.bindings.iter().any(|(key, _)| *key == name) {
            return Err(Redefinition(name));
        }
        frame.bindings.push((name, value));
        Ok(())
    }

    /// Replace the binding of `name` in the nearest frame that owns it.
    ///
    /// Returns `false` if `name` is unbound along the whole chain.
    pub fn set(&self, name: &str, value: T) -> bool {
        let parent = {
            let mut frame = self.frame.borrow_mut();
            if let Some((_, slot)) = frame.bindings.iter_mut().find(|(key, _)| key == name) {
                *slot = value;
                return true;
            }
            frame.parent.clone()
        };
        match parent {
            Some(parent) => parent.set(name, value),
            None => false,
        }
    }

    /// Replace the binding of `name` in this frame only.
    pub fn set_current(&self, name: &str, value: T) -> bool {
        let mut frame = self.frame.borrow_mut();
        match frame.bindings.iter_mut().find(|(key, _)| key == name) {
            Some((_, slot)) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// This frame's own bindings, in definition order.
    pub fn entries(&self) -> Vec<(String, T)> {
        self.frame.borrow().bindings.clone()
    }

    /// This frame's own names, in definition order.
    pub fn names(&self) -> Vec<String> {
        self.frame
            .borrow()
            .bindings
            .iter()
            .map(|(key, _)| key.clone())
            .collect()
    }
}

impl<T> Scope<T> {
    /// Frame identity.
    pub fn ptr_eq(a: &Scope<T>, b: &Scope<T>) -> bool {
        Rc::ptr_eq(&a.frame, &b.frame)
    }
}

impl<T: Clone> fmt::Debug for Scope<T> {
    // Only the frame's own names: closures make frame graphs cyclic.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let has_parent = self.frame.borrow().parent.is_some();
        f.debug_struct("Scope")
            .field("names", &self.names())
            .field("has_parent", &has_parent)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_define_and_get() {
        let scope = Scope::root();
        scope.define("x", 1).unwrap();
        assert_eq!(scope.get("x", true), Some(1));
        assert_eq!(scope.get("y", false), None);
    }

    #[test]
    fn test_redefinition_in_same_frame_fails() {
        let scope = Scope::root();
        scope.define("x", 1).unwrap();
        assert_eq!(scope.define("x", 2), Err(Redefinition("x".into())));
        assert_eq!(scope.get("x", true), Some(1));
    }

    #[test]
    fn test_shadowing_in_child_frame() {
        let outer = Scope::root();
        outer.define("x", 1).unwrap();
        let inner = outer.child();
        inner.define("x", 2).unwrap();
        assert_eq!(inner.get("x", false), Some(2));
        assert_eq!(outer.get("x", false), Some(1));
    }

    #[test]
    fn test_current_only_does_not_ascend() {
        let outer = Scope::root();
        outer.define("x", 1).unwrap();
        let inner = outer.child();
        assert_eq!(inner.get("x", true), None);
        assert_eq!(inner.get("x", false), Some(1));
    }

    #[test]
    fn test_set_updates_owning_frame() {
        let outer = Scope::root();
        outer.define("x", 1).unwrap();
        let inner = outer.child();
        assert!(inner.set("x", 5));
        assert_eq!(outer.get("x", true), Some(5));
        assert!(inner.get("x", true).is_none());
        assert!(!inner.set("missing", 0));
    }

    #[test]
    fn test_set_current_ignores_parent() {
        let outer = Scope::root();
        outer.define("x", 1).unwrap();
        let inner = outer.child();
        assert!(!inner.set_current("x", 2));
        assert_eq!(outer.get("x", true), Some(1));
    }

    #[test]
    fn test_entries_preserve_definition_order() {
        let scope = Scope::root();
        scope.define("b", 2).unwrap();
        scope.define("a", 1).unwrap();
        assert_eq!(
            scope.entries(),
            vec![("b".to_string(), 2), ("a".to_string(), 1)]
        );
        assert_eq!(scope.names(), ["b", "a"]);
    }

    #[test]
    fn test_handles_share_frames() {
        let scope: Scope<i32> = Scope::root();
        let alias = scope.clone();
        alias.define("x", 1).unwrap();
        assert_eq!(scope.get("x", true), Some(1));
        assert!(Scope::ptr_eq(&scope, &alias));
        assert!(!Scope::ptr_eq(&scope, &scope.child()));
    }
}
