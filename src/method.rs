//! Method decoration adapter.
//!
//! A [`MethodDef`] is the decorated definition of a method, built once when
//! the receiver type is set up (a `LazyLock` or a "class" value). Instances
//! hold a [`Method`] slot bound from it. Calls through the slot are profiled
//! under the method's name.
//!
//! Reassigning a slot stores the replacement verbatim: it is not wrapped
//! again and gets no name of its own. Calls through the slot keep the name,
//! label and options fixed at decoration time and report whatever the
//! replacement returns.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use serde::Serialize;

use crate::profiler::Profiler;
use crate::wrap::{CallSite, ProfileSpec};

type Body<S, A, R> = Arc<dyn Fn(&S, A) -> R + Send + Sync>;

pub struct MethodDef<S, A, R> {
    site: Arc<CallSite>,
    body: Body<S, A, R>,
}

impl<S, A, R> MethodDef<S, A, R> {
    pub fn new<F>(profiler: &Profiler, name: impl Into<String>, body: F) -> Self
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        Self::with_spec(profiler, name, ProfileSpec::default(), body)
    }

    pub fn with_spec<F>(
        profiler: &Profiler,
        name: impl Into<String>,
        spec: impl Into<ProfileSpec>,
        body: F,
    ) -> Self
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        let site = CallSite::new(profiler.core().clone(), Some(name.into()), spec.into());
        Self {
            site: Arc::new(site),
            body: Arc::new(body),
        }
    }

    pub fn name(&self) -> &str {
        self.site.fn_name().unwrap_or_default()
    }

    /// A fresh slot for one instance, resolving to this definition.
    pub fn bind(&self) -> Method<S, A, R> {
        Method {
            site: self.site.clone(),
            decorated: self.body.clone(),
            current: self.body.clone(),
        }
    }
}

impl<S, A, R> fmt::Debug for MethodDef<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDef").field("site", &self.site).finish()
    }
}

/// Per-instance method slot.
pub struct Method<S, A, R> {
    site: Arc<CallSite>,
    decorated: Body<S, A, R>,
    current: Body<S, A, R>,
}

impl<S, A, R> Method<S, A, R> {
    pub fn name(&self) -> &str {
        self.site.fn_name().unwrap_or_default()
    }

    /// Shadows the decorated definition for this instance only.
    pub fn reassign<F>(&mut self, body: F)
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        self.current = Arc::new(body);
    }

    pub fn restore(&mut self) {
        self.current = self.decorated.clone();
    }

    pub fn is_reassigned(&self) -> bool {
        !Arc::ptr_eq(&self.current, &self.decorated)
    }

    pub fn call(&self, receiver: &S, args: A) -> R
    where
        R: Serialize,
    {
        let invocation = self.site.begin();
        let output = (self.current)(receiver, args);
        self.site.settle(invocation, &output);
        output
    }
}

impl<S, A, T, E> Method<S, A, Result<T, E>> {
    pub fn try_call(&self, receiver: &S, args: A) -> Result<T, E>
    where
        T: Serialize,
    {
        let invocation = self.site.begin();
        let output = (self.current)(receiver, args);
        if let Ok(value) = &output {
            self.site.settle(invocation, value);
        }
        output
    }
}

impl<S, A, Fut> Method<S, A, Fut>
where
    Fut: Future,
{
    pub fn call_async(&self, receiver: &S, args: A) -> impl Future<Output = Fut::Output>
    where
        Fut::Output: Serialize,
    {
        let invocation = self.site.begin();
        self.site.observe(invocation, (self.current)(receiver, args))
    }

    pub fn try_call_async<T, E>(&self, receiver: &S, args: A) -> impl Future<Output = Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        let invocation = self.site.begin();
        self.site.observe_ok(invocation, (self.current)(receiver, args))
    }
}

impl<S, A, R> Clone for Method<S, A, R> {
    fn clone(&self) -> Self {
        Self {
            site: self.site.clone(),
            decorated: self.decorated.clone(),
            current: self.current.clone(),
        }
    }
}

impl<S, A, R> fmt::Debug for Method<S, A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("site", &self.site)
            .field("reassigned", &self.is_reassigned())
            .finish()
    }
}
