//! RAII checkout

use std::ops::{Deref, DerefMut};

use crate::error::OpenWarning;
use crate::state::ModuleState;

use super::{Checkout, StatePool};

/// A checked-out state that goes back to its pool when dropped
pub struct Lease<'a, S: ModuleState> {
    pool: &'a StatePool,
    state: Option<S>,
    warnings: Vec<OpenWarning>,
    recycled: bool,
}

impl<'a, S: ModuleState> Lease<'a, S> {
    pub(crate) fn new(pool: &'a StatePool, checkout: Checkout<S>) -> Self {
        Self {
            pool,
            state: Some(checkout.state),
            warnings: checkout.warnings,
            recycled: checkout.recycled,
        }
    }

    pub fn warnings(&self) -> &[OpenWarning] {
        &self.warnings
    }

    pub fn recycled(&self) -> bool {
        self.recycled
    }

    /// Keep the state instead of returning it to the pool
    pub fn detach(mut self) -> S {
        match self.state.take() {
            Some(state) => state,
            None => unreachable!("lease state is only taken on detach or drop"),
        }
    }
}

impl<S: ModuleState> Deref for Lease<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.state {
            Some(state) => state,
            None => unreachable!("lease state is only taken on detach or drop"),
        }
    }
}

impl<S: ModuleState> DerefMut for Lease<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.state {
            Some(state) => state,
            None => unreachable!("lease state is only taken on detach or drop"),
        }
    }
}

impl<S: ModuleState> Drop for Lease<'_, S> {
    fn drop(&mut self) {
        if let Some(state) = self.state.take() {
            self.pool.release(state);
        }
    }
}
