//! Call profiling for plain functions, futures and method slots.
//!
//! Wrapped callables return exactly what the original returned; after the call
//! settles, an [`InvocationEvent`] is scheduled for every registered listener.
//!
//! ```ignore
//! profilr::set_enabled(true);
//! let subscription = profilr::register(|event| println!("{}", event.id));
//!
//! let area = profilr::profile_with(|w: u32, h: u32| w * h, "geometry");
//! assert_eq!(area.call((3, 4)), 12);
//!
//! profilr::flush().await;
//! subscription.dispose();
//! ```

pub mod config;
pub mod error;
pub mod method;
pub mod profiler;
pub mod telemetry;
pub mod wrap;

pub use config::ProfilerConfig;
pub use error::ProfileError;
pub use method::{Method, MethodDef};
pub use profiler::{
    decorate_method, flush, global, install, is_enabled, profile, profile_with, register,
    set_enabled, Profiler, ProfilerBuilder,
};
pub use telemetry::event::{InvocationEvent, InvocationId, Options};
pub use telemetry::ids::IdStrategy;
pub use telemetry::registry::{ListenerRegistry, Subscription, SubscriptionGuard};
pub use telemetry::scheduler::{DeferredQueue, Scheduler, TokioScheduler};
pub use wrap::{Invoke, ProfileSpec, Profiled};
