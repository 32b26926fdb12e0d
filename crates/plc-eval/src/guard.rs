//! RAII scope guard for the evaluator.
//!
//! [`ScopedEvaluator`] swaps a frame in as the evaluator's current scope
//! and puts the previous one back when dropped. The restore runs on every
//! exit path: normal completion, an early `?` return, a `RETURN` flow and
//! unwinding.
//!
//! ```text
//! {
//!     let mut scoped = evaluator.scoped(frame);
//!     scoped.eval_block(body)?;
//! } // previous scope restored here
//! ```

use std::ops::{Deref, DerefMut};

use plc_types::Scope;

use crate::evaluator::Evaluator;
use crate::value::RuntimeValue;

/// Access the evaluator through this guard; it implements `Deref` and
/// `DerefMut`.
pub struct ScopedEvaluator<'guard> {
    evaluator: &'guard mut Evaluator,
    previous: Option<Scope<RuntimeValue>>,
}

impl Drop for ScopedEvaluator<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            self.evaluator.scope = previous;
        }
    }
}

impl Deref for ScopedEvaluator<'_> {
    type Target = Evaluator;

    fn deref(&self) -> &Self::Target {
        self.evaluator
    }
}

impl DerefMut for ScopedEvaluator<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.evaluator
    }
}

impl Evaluator {
    /// Make `frame` the current scope until the returned guard is dropped.
    pub fn scoped(&mut self, frame: Scope<RuntimeValue>) -> ScopedEvaluator<'_> {
        let previous = std::mem::replace(&mut self.scope, frame);
        ScopedEvaluator {
            evaluator: self,
            previous: Some(previous),
        }
    }
}
