use std::sync::{Arc, OnceLock};

use tracing::{debug, trace, warn};

use crate::config::ProfilerConfig;
use crate::error::{ProfileError, Result};
use crate::method::MethodDef;
use crate::telemetry::event::{InvocationEvent, InvocationId};
use crate::telemetry::ids::{IdGenerator, IdStrategy};
use crate::telemetry::registry::{ListenerRegistry, Subscription};
use crate::telemetry::scheduler::{InFlight, Scheduler, TokioScheduler};
use crate::telemetry::toggle::Toggle;
use crate::wrap::{Profiled, ProfileSpec};

pub(crate) struct Core {
    toggle: Toggle,
    registry: ListenerRegistry,
    ids: IdGenerator,
    scheduler: Arc<dyn Scheduler>,
    in_flight: Arc<InFlight>,
}

impl Core {
    pub(crate) fn next_id(&self) -> InvocationId {
        self.ids.next_id()
    }

    /// Hands the event to the scheduler. The toggle is checked when the job runs.
    pub(crate) fn emit(self: &Arc<Self>, event: InvocationEvent) {
        let core = self.clone();
        let guard = self.in_flight.begin();
        self.scheduler.schedule(Box::new(move || {
            let _guard = guard;
            core.deliver(&event);
        }));
    }

    fn deliver(&self, event: &InvocationEvent) {
        if !self.toggle.is_enabled() {
            trace!(invocation = %event.id, "profiling disabled, event dropped");
            return;
        }

        let delivered = self.registry.dispatch(event);
        debug!(
            invocation = %event.id,
            fn_name = event.fn_name.as_deref().unwrap_or("<anonymous>"),
            label = event.label.as_deref().unwrap_or(""),
            elapsed_us = event.elapsed.as_micros() as u64,
            listeners = delivered,
            "invocation emitted"
        );
    }
}

/// An isolated profiling context: toggle, listeners, ids and scheduler.
///
/// Cloning is cheap and yields a handle to the same context.
#[derive(Clone)]
pub struct Profiler {
    core: Arc<Core>,
}

impl Profiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self::builder().config(config).build()
    }

    pub fn builder() -> ProfilerBuilder {
        ProfilerBuilder::default()
    }

    pub(crate) fn core(&self) -> &Arc<Core> {
        &self.core
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.core.toggle.set_enabled(enabled);
    }

    pub fn is_enabled(&self) -> bool {
        self.core.toggle.is_enabled()
    }

    pub fn register<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&InvocationEvent) + Send + Sync + 'static,
    {
        self.core.registry.register(listener)
    }

    pub fn listeners(&self) -> &ListenerRegistry {
        &self.core.registry
    }

    pub fn id_strategy(&self) -> IdStrategy {
        self.core.ids.strategy()
    }

    pub fn profile<F>(&self, func: F) -> Profiled<F> {
        Profiled::new(self.core.clone(), func, ProfileSpec::default())
    }

    pub fn profile_with<F>(&self, func: F, spec: impl Into<ProfileSpec>) -> Profiled<F> {
        Profiled::new(self.core.clone(), func, spec.into())
    }

    /// Decorates a method body once; bind it per instance with [`MethodDef::bind`].
    pub fn method<S, A, R, F>(&self, name: impl Into<String>, body: F) -> MethodDef<S, A, R>
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        MethodDef::new(self, name, body)
    }

    pub fn method_with<S, A, R, F>(
        &self,
        name: impl Into<String>,
        spec: impl Into<ProfileSpec>,
        body: F,
    ) -> MethodDef<S, A, R>
    where
        F: Fn(&S, A) -> R + Send + Sync + 'static,
    {
        MethodDef::with_spec(self, name, spec, body)
    }

    /// Number of emissions scheduled but not yet run.
    pub fn pending(&self) -> usize {
        self.core.in_flight.pending()
    }

    /// Waits until no emission is in flight.
    ///
    /// This covers everything scheduled before the call, but it waits for
    /// quiescence: emissions scheduled while it waits are awaited too, so
    /// under steady concurrent traffic it may not return until calls stop.
    pub async fn flush(&self) {
        self.core.scheduler.run_pending();
        self.core.in_flight.wait_idle().await;
    }
}

impl Default for Profiler {
    fn default() -> Self {
        Self::new(ProfilerConfig::default())
    }
}

impl std::fmt::Debug for Profiler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profiler")
            .field("enabled", &self.is_enabled())
            .field("listeners", &self.core.registry.len())
            .field("id_strategy", &self.id_strategy())
            .field("pending", &self.pending())
            .finish()
    }
}

#[derive(Default)]
pub struct ProfilerBuilder {
    config: ProfilerConfig,
    scheduler: Option<Arc<dyn Scheduler>>,
}

impl ProfilerBuilder {
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.config.enabled = enabled;
        self
    }

    pub fn id_strategy(mut self, strategy: IdStrategy) -> Self {
        self.config.id_strategy = strategy;
        self
    }

    pub fn scheduler(mut self, scheduler: impl Scheduler + 'static) -> Self {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    pub fn build(self) -> Profiler {
        Profiler {
            core: Arc::new(Core {
                toggle: Toggle::new(self.config.enabled),
                registry: ListenerRegistry::new(),
                ids: IdGenerator::new(self.config.id_strategy),
                scheduler: self.scheduler.unwrap_or_else(|| Arc::new(TokioScheduler)),
                in_flight: Arc::new(InFlight::default()),
            }),
        }
    }
}

static GLOBAL: OnceLock<Profiler> = OnceLock::new();

/// Installs the process-wide profiler. Fails if it already exists.
pub fn install(config: ProfilerConfig) -> Result<&'static Profiler> {
    let mut installed = false;
    let profiler = GLOBAL.get_or_init(|| {
        installed = true;
        Profiler::new(config)
    });
    if installed {
        Ok(profiler)
    } else {
        Err(ProfileError::AlreadyInstalled)
    }
}

/// The process-wide profiler, built from the environment on first use.
pub fn global() -> &'static Profiler {
    GLOBAL.get_or_init(|| {
        let config = ProfilerConfig::from_env().unwrap_or_else(|e| {
            warn!("ignoring profiler environment: {}", e);
            ProfilerConfig::default()
        });
        Profiler::new(config)
    })
}

pub fn profile<F>(func: F) -> Profiled<F> {
    global().profile(func)
}

pub fn profile_with<F>(func: F, spec: impl Into<ProfileSpec>) -> Profiled<F> {
    global().profile_with(func, spec)
}

pub fn decorate_method<S, A, R, F>(
    name: impl Into<String>,
    spec: impl Into<ProfileSpec>,
    body: F,
) -> MethodDef<S, A, R>
where
    F: Fn(&S, A) -> R + Send + Sync + 'static,
{
    MethodDef::with_spec(global(), name, spec, body)
}

pub fn set_enabled(enabled: bool) {
    global().set_enabled(enabled);
}

pub fn is_enabled() -> bool {
    global().is_enabled()
}

pub fn register<F>(listener: F) -> Subscription
where
    F: Fn(&InvocationEvent) + Send + Sync + 'static,
{
    global().register(listener)
}

/// See [`Profiler::flush`].
pub async fn flush() {
    global().flush().await;
}
