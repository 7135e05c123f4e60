//! Invocation wrapper.

mod invoke;
mod spec;

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use crate::profiler::Core;
use crate::telemetry::event::{InvocationEvent, InvocationId, Options};

pub(crate) use invoke::callable_name;
pub use invoke::Invoke;
pub use spec::ProfileSpec;

/// What every event from one wrapped callable shares.
#[derive(Clone)]
pub(crate) struct CallSite {
    core: Arc<Core>,
    fn_name: Option<String>,
    label: Option<String>,
    options: Option<Options>,
}

/// Start context of one invocation.
pub(crate) struct Invocation {
    id: InvocationId,
    started: Instant,
}

impl CallSite {
    pub(crate) fn new(core: Arc<Core>, fn_name: Option<String>, spec: ProfileSpec) -> Self {
        Self {
            core,
            fn_name,
            label: spec.label,
            options: spec.options,
        }
    }

    pub(crate) fn fn_name(&self) -> Option<&str> {
        self.fn_name.as_deref()
    }

    pub(crate) fn begin(&self) -> Invocation {
        Invocation {
            id: self.core.next_id(),
            started: Instant::now(),
        }
    }

    /// Records a successful result and schedules its emission.
    pub(crate) fn settle<T: Serialize + ?Sized>(&self, invocation: Invocation, value: &T) {
        let elapsed = invocation.started.elapsed();
        let result = serde_json::to_value(value).unwrap_or_else(|e| {
            warn!(
                invocation = %invocation.id,
                fn_name = self.fn_name.as_deref().unwrap_or("<anonymous>"),
                "result is not serializable, recording null: {}",
                e
            );
            Value::Null
        });

        self.core.emit(InvocationEvent {
            id: invocation.id,
            fn_name: self.fn_name.clone(),
            label: self.label.clone(),
            options: self.options.clone(),
            result,
            elapsed,
        });
    }

    pub(crate) fn call<F, Args>(&self, func: &F, args: Args) -> F::Output
    where
        F: Invoke<Args> + ?Sized,
        F::Output: Serialize,
    {
        let invocation = self.begin();
        let output = func.invoke(args);
        self.settle(invocation, &output);
        output
    }

    pub(crate) fn try_call<F, Args, T, E>(&self, func: &F, args: Args) -> Result<T, E>
    where
        F: Invoke<Args, Output = Result<T, E>> + ?Sized,
        T: Serialize,
    {
        let invocation = self.begin();
        let output = func.invoke(args);
        if let Ok(value) = &output {
            self.settle(invocation, value);
        }
        output
    }

    pub(crate) fn call_async<F, Args>(
        self: &Arc<Self>,
        func: &F,
        args: Args,
    ) -> impl Future<Output = <F::Output as Future>::Output>
    where
        F: Invoke<Args> + ?Sized,
        F::Output: Future,
        <F::Output as Future>::Output: Serialize,
    {
        let invocation = self.begin();
        self.observe(invocation, func.invoke(args))
    }

    /// Settles once `pending` resolves; the caller gets its output unchanged.
    pub(crate) fn observe<Fut>(
        self: &Arc<Self>,
        invocation: Invocation,
        pending: Fut,
    ) -> impl Future<Output = Fut::Output>
    where
        Fut: Future,
        Fut::Output: Serialize,
    {
        let site = self.clone();
        async move {
            let output = pending.await;
            site.settle(invocation, &output);
            output
        }
    }

    pub(crate) fn observe_ok<Fut, T, E>(
        self: &Arc<Self>,
        invocation: Invocation,
        pending: Fut,
    ) -> impl Future<Output = Result<T, E>>
    where
        Fut: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        let site = self.clone();
        async move {
            let output = pending.await;
            if let Ok(value) = &output {
                site.settle(invocation, value);
            }
            output
        }
    }

    pub(crate) fn try_call_async<F, Args, T, E>(
        self: &Arc<Self>,
        func: &F,
        args: Args,
    ) -> impl Future<Output = Result<T, E>>
    where
        F: Invoke<Args> + ?Sized,
        F::Output: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        let invocation = self.begin();
        self.observe_ok(invocation, func.invoke(args))
    }
}

impl fmt::Debug for CallSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallSite")
            .field("fn_name", &self.fn_name)
            .field("label", &self.label)
            .field("options", &self.options)
            .finish()
    }
}

/// A callable that reports every successful invocation to its profiler.
///
/// Arguments are passed as a tuple: `wrapped.call((a, b))` for `f(a, b)`,
/// `wrapped.call(())` for `f()`. The return value is exactly what the
/// wrapped function returned; the event is emitted on a later turn.
///
/// Rust has no runtime distinction between plain and deferred values, so the
/// caller picks the entry point: [`call`](Self::call) for plain values,
/// [`call_async`](Self::call_async) for futures, and the `try_` variants for
/// `Result`s, where an `Err` counts as a failed call and is not profiled.
pub struct Profiled<F> {
    func: F,
    site: Arc<CallSite>,
}

impl<F> Profiled<F> {
    pub(crate) fn new(core: Arc<Core>, func: F, spec: ProfileSpec) -> Self {
        Self {
            func,
            site: Arc::new(CallSite::new(core, callable_name::<F>(), spec)),
        }
    }

    /// Overrides the name derived from the callable's type.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        Arc::make_mut(&mut self.site).fn_name = Some(name.into());
        self
    }

    pub fn fn_name(&self) -> Option<&str> {
        self.site.fn_name()
    }

    pub fn label(&self) -> Option<&str> {
        self.site.label.as_deref()
    }

    pub fn options(&self) -> Option<&Options> {
        self.site.options.as_ref()
    }

    pub fn inner(&self) -> &F {
        &self.func
    }

    pub fn call<Args>(&self, args: Args) -> F::Output
    where
        F: Invoke<Args>,
        F::Output: Serialize,
    {
        self.site.call(&self.func, args)
    }

    pub fn try_call<Args, T, E>(&self, args: Args) -> Result<T, E>
    where
        F: Invoke<Args, Output = Result<T, E>>,
        T: Serialize,
    {
        self.site.try_call(&self.func, args)
    }

    /// Starts the call and returns a future resolving to the original output.
    pub fn call_async<Args>(&self, args: Args) -> impl Future<Output = <F::Output as Future>::Output>
    where
        F: Invoke<Args>,
        F::Output: Future,
        <F::Output as Future>::Output: Serialize,
    {
        self.site.call_async(&self.func, args)
    }

    pub fn try_call_async<Args, T, E>(&self, args: Args) -> impl Future<Output = Result<T, E>>
    where
        F: Invoke<Args>,
        F::Output: Future<Output = Result<T, E>>,
        T: Serialize,
    {
        self.site.try_call_async(&self.func, args)
    }
}

impl<F: Clone> Clone for Profiled<F> {
    fn clone(&self) -> Self {
        Self {
            func: self.func.clone(),
            site: self.site.clone(),
        }
    }
}

impl<F> fmt::Debug for Profiled<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Profiled").field("site", &self.site).finish()
    }
}
