//! Type argument inference.
//!
//! Calling or referring to a generic declaration without explicit type
//! arguments opens a [`TypeArgsInferringContext`] over the declaration's
//! parameters. Every occurrence of those parameters in the declaration's
//! type is marked as being inferred; assigning the marked type against the
//! actual types records a binding for each parameter, together with how
//! the binding may still change:
//!
//! - `ExactOrBigger`: the parameter sits in a covariant position and the
//!   binding may widen to accept later uses
//! - `ExactOrSmaller`: the contravariant counterpart
//! - `Exact`: the binding is fixed
//!
//! The context is the only mutable state of the checker. A trial that may
//! fail runs inside [`TypeArgsInferringContext::with_saved`] or
//! [`TypeArgsInferringContext::probe`], which roll back every binding made
//! by the trial. Independent trials (overload candidates) work on clones
//! and the winner is merged back.

use std::fmt;

use ena::snapshot_vec::{SnapshotVec, SnapshotVecDelegate};
use rowan::TextRange;

use crate::describe::describe_type;
use crate::error::{ExprError, ExprErrorKind};
use crate::ty::{Type, TypeBounds, TypeCtx, TypeParam};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    ExactOrBigger,
    ExactOrSmaller,
    Exact,
}

/// The current binding of a parameter under inference.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveType {
    pub current: Type,
    pub constraint: Constraint,
}

/// One slot per parameter; `None` until the parameter is first bound.
struct Slots;

impl SnapshotVecDelegate for Slots {
    type Value = Option<ActiveType>;
    type Undo = ();

    fn reverse(_values: &mut Vec<Option<ActiveType>>, _action: ()) {}
}

pub struct TypeArgsInferringContext {
    enabled: bool,
    params: Vec<TypeParam>,
    bounds: TypeBounds,
    slots: SnapshotVec<Slots>,
}

impl TypeArgsInferringContext {
    /// A context in which no parameter is being inferred.
    pub fn disabled() -> Self {
        TypeArgsInferringContext {
            enabled: false,
            params: Vec::new(),
            bounds: TypeBounds::default(),
            slots: SnapshotVec::new(),
        }
    }

    /// Start inferring the parameters of a generic declaration.
    pub fn enabled(params: &[TypeParam], bounds: &TypeBounds) -> Self {
        let mut slots = SnapshotVec::new();
        for _ in params {
            slots.push(None);
        }
        TypeArgsInferringContext {
            enabled: true,
            params: params.to_vec(),
            bounds: bounds.clone(),
            slots,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn arity(&self) -> usize {
        self.slots.len()
    }

    /// The parameters being inferred.
    pub fn params(&self) -> &[TypeParam] {
        &self.params
    }

    pub fn bounds(&self) -> &TypeBounds {
        &self.bounds
    }

    pub fn get(&self, index: usize) -> Option<&ActiveType> {
        if index < self.slots.len() {
            self.slots.get(index).as_ref()
        } else {
            None
        }
    }

    pub fn set(&mut self, index: usize, active: ActiveType) {
        if index < self.slots.len() {
            tracing::trace!(index, current = ?active.current, constraint = ?active.constraint, "inferred binding");
            self.slots.set(index, Some(active));
        }
    }

    pub fn all_inferred(&self) -> bool {
        (0..self.slots.len()).all(|i| self.slots.get(i).is_some())
    }

    /// The bound type of every parameter, if all are bound.
    pub fn inferred_args(&self) -> Option<Vec<Type>> {
        (0..self.slots.len())
            .map(|i| self.slots.get(i).as_ref().map(|a| a.current.clone()))
            .collect()
    }

    /// Run `f`, undoing its bindings if it fails.
    pub fn with_saved<T, E>(&mut self, f: impl FnOnce(&mut Self) -> Result<T, E>) -> Result<T, E> {
        let snapshot = self.slots.start_snapshot();
        let result = f(self);
        if result.is_ok() {
            self.slots.commit(snapshot);
        } else {
            self.slots.rollback_to(snapshot);
        }
        result
    }

    /// Run `f`, undoing its bindings if it yields nothing.
    pub fn probe<T>(&mut self, f: impl FnOnce(&mut Self) -> Option<T>) -> Option<T> {
        self.with_saved(|infer| f(infer).ok_or(())).ok()
    }

    /// Adopt the bindings of a clone that went on independently.
    ///
    /// The bindings are written slot by slot, so an enclosing
    /// [`with_saved`](Self::with_saved) can still roll them back.
    pub fn merge_from(&mut self, other: TypeArgsInferringContext) {
        for index in 0..self.slots.len().min(other.slots.len()) {
            let adopted = other.slots.get(index);
            if self.slots.get(index) != adopted {
                self.slots.set(index, adopted.clone());
            }
        }
    }
}

impl Clone for TypeArgsInferringContext {
    fn clone(&self) -> Self {
        let mut slots = SnapshotVec::new();
        for i in 0..self.slots.len() {
            slots.push(self.slots.get(i).clone());
        }
        TypeArgsInferringContext {
            enabled: self.enabled,
            params: self.params.clone(),
            bounds: self.bounds.clone(),
            slots,
        }
    }
}

impl fmt::Debug for TypeArgsInferringContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots: Vec<&Option<ActiveType>> = (0..self.slots.len()).map(|i| self.slots.get(i)).collect();
        f.debug_struct("TypeArgsInferringContext")
            .field("enabled", &self.enabled)
            .field("params", &self.params)
            .field("slots", &slots)
            .finish()
    }
}

/// Replace bound being-inferred parameters with their bindings, leaving
/// unbound ones in place.
pub fn substitute_inferred(t: &Type, infer: &TypeArgsInferringContext) -> Type {
    t.map_params(&mut |index, being_inferred| {
        if being_inferred {
            infer.get(index).map(|a| a.current.clone())
        } else {
            None
        }
    })
}

/// Replace every being-inferred parameter with its binding, failing if
/// one is still unbound.
pub fn get_certain_type(t: &Type, infer: &TypeArgsInferringContext, span: TextRange) -> Result<Type, ExprError> {
    let mut unbound = false;
    let certain = t.map_params(&mut |index, being_inferred| {
        if !being_inferred {
            return None;
        }
        match infer.get(index) {
            Some(active) => Some(active.current.clone()),
            None => {
                unbound = true;
                None
            }
        }
    });
    if unbound {
        Err(ExprError::new(ExprErrorKind::ExplicitTypeRequired, span))
    } else {
        Ok(certain)
    }
}

/// Describe `t` with inferred parameters shown as their bindings.
pub fn describe_in_ctx(t: &Type, ctx: &TypeCtx<'_>, infer: &TypeArgsInferringContext) -> String {
    let substituted = substitute_inferred(t, infer);
    if substituted.has_inferred_params() {
        // Unbound inferred parameters are named after the callee's
        // parameters, the others after the enclosing declaration's.
        let params: Vec<TypeParam> = (0..infer.arity().max(ctx.params.len()))
            .map(|i| TypeParam {
                name: infer
                    .params()
                    .get(i)
                    .map(|p| p.name.clone())
                    .or_else(|| ctx.params.get(i).map(|p| p.name.clone()))
                    .unwrap_or_else(|| format!("#{}", i)),
                variance: crate::variance::Variance::Invariant,
            })
            .collect();
        describe_type(&substituted, ctx.module, &params)
    } else {
        describe_type(&substituted, ctx.module, ctx.params)
    }
}
