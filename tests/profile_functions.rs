use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use profilr::{InvocationEvent, InvocationId, Options, ProfileSpec, Profiler, ProfilerConfig};
use serde_json::json;

type Spy = Arc<Mutex<Vec<InvocationEvent>>>;

fn enabled_profiler() -> (Profiler, Spy) {
    let profiler = Profiler::new(ProfilerConfig::enabled());
    let spy: Spy = Arc::new(Mutex::new(Vec::new()));
    let sink = spy.clone();
    profiler.register(move |event| sink.lock().unwrap().push(event.clone()));
    (profiler, spy)
}

fn options() -> Options {
    Options::new().with("custom", json!({ "myData": "string" }))
}

fn take(spy: &Spy) -> Vec<InvocationEvent> {
    std::mem::take(&mut *spy.lock().unwrap())
}

fn my_fn() -> i32 {
    5
}

#[tokio::test]
async fn test_event_fires_after_one_yield() {
    let (profiler, spy) = enabled_profiler();
    let wrapped = profiler.profile(|| 5);

    assert_eq!(wrapped.call(()), 5);
    assert!(spy.lock().unwrap().is_empty(), "emission must not run inline");

    tokio::task::yield_now().await;

    let events = take(&spy);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].result, json!(5));
}

#[tokio::test]
async fn test_call_shapes() {
    let (profiler, spy) = enabled_profiler();

    assert_eq!(profiler.profile(|| 5).call(()), 5);
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].result, json!(5));
    assert_eq!(events[0].label, None);
    assert_eq!(events[0].options, None);

    assert_eq!(profiler.profile_with(|| 5, "other").call(()), 5);
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].label.as_deref(), Some("other"));
    assert_eq!(events[0].options, None);

    assert_eq!(profiler.profile(my_fn).call(()), 5);
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].fn_name.as_deref(), Some("my_fn"));

    assert_eq!(profiler.profile_with(|| 5, options()).call(()), 5);
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].label, None);
    assert_eq!(events[0].options, Some(options()));

    assert_eq!(profiler.profile_with(|| 5, ("other", options())).call(()), 5);
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].label.as_deref(), Some("other"));
    assert_eq!(events[0].options, Some(options()));
    assert_eq!(events[0].result, json!(5));
}

#[tokio::test]
async fn test_dynamic_call_shapes() {
    let (profiler, spy) = enabled_profiler();

    let spec = ProfileSpec::try_from(json!({ "a": 1 })).unwrap();
    profiler.profile_with(|| "x", spec).call(());
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].label, None);
    assert_eq!(events[0].options.as_ref().and_then(|o| o.get("a")), Some(&json!(1)));

    let spec = ProfileSpec::try_from((json!("x"), json!({ "a": 1 }))).unwrap();
    profiler.profile_with(|| "x", spec).call(());
    profiler.flush().await;
    let events = take(&spy);
    assert_eq!(events[0].label.as_deref(), Some("x"));
    assert!(events[0].options.is_some());

    assert!(ProfileSpec::try_from(json!(true)).is_err());
}

#[tokio::test]
async fn test_async_function_resolves_to_same_value() {
    let (profiler, spy) = enabled_profiler();
    let wrapped = profiler.profile(|user: u32| async move {
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        format!("user-{user}")
    });

    assert_eq!(wrapped.call_async((9,)).await, "user-9");
    profiler.flush().await;

    let events = take(&spy);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].result, json!("user-9"));
    assert!(events[0].elapsed >= std::time::Duration::from_millis(5));
}

#[tokio::test]
async fn test_unique_ids_per_invocation() {
    let (profiler, spy) = enabled_profiler();
    let fn1 = profiler.profile(|| 5);
    let fn2 = profiler.profile(|| 5);

    fn1.call(());
    fn2.call(());
    profiler.flush().await;
    let first_round: Vec<InvocationId> = take(&spy).iter().map(|e| e.id).collect();
    assert_eq!(first_round.len(), 2);
    assert_ne!(first_round[0], first_round[1]);

    fn1.call(());
    fn2.call(());
    profiler.flush().await;
    let second_round: Vec<InvocationId> = take(&spy).iter().map(|e| e.id).collect();

    let all: HashSet<InvocationId> = first_round.iter().chain(second_round.iter()).copied().collect();
    assert_eq!(all.len(), 4, "repeat calls of the same wrapper must get fresh ids");
}

#[tokio::test]
async fn test_concurrent_calls_get_distinct_ids() {
    let (profiler, spy) = enabled_profiler();
    let wrapped = Arc::new(profiler.profile(|n: u64| async move {
        tokio::task::yield_now().await;
        n
    }));

    let handles: Vec<_> = (0..32u64)
        .map(|n| {
            let wrapped = wrapped.clone();
            tokio::spawn(async move { wrapped.call_async((n,)).await })
        })
        .collect();
    for (n, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.await.unwrap(), n as u64);
    }
    profiler.flush().await;

    let events = take(&spy);
    let ids: HashSet<InvocationId> = events.iter().map(|e| e.id).collect();
    assert_eq!(events.len(), 32);
    assert_eq!(ids.len(), 32);
}

#[tokio::test]
async fn test_disable_and_reenable() {
    let (profiler, spy) = enabled_profiler();
    let wrapped = profiler.profile(|| 5);

    profiler.set_enabled(false);
    assert_eq!(wrapped.call(()), 5);
    profiler.flush().await;
    assert!(take(&spy).is_empty(), "disabled profiler must not emit");

    profiler.set_enabled(true);
    assert_eq!(wrapped.call(()), 5);
    profiler.flush().await;
    assert_eq!(take(&spy).len(), 1);
}

#[tokio::test]
async fn test_toggle_flip_before_emission_suppresses_event() {
    let (profiler, spy) = enabled_profiler();
    let wrapped = profiler.profile(|| 5);

    assert_eq!(wrapped.call(()), 5);
    profiler.set_enabled(false);
    profiler.flush().await;

    assert!(take(&spy).is_empty());
}

#[tokio::test]
async fn test_disposed_listener_receives_nothing() {
    let (profiler, spy) = enabled_profiler();
    let other: Spy = Arc::new(Mutex::new(Vec::new()));
    let sink = other.clone();
    let subscription = profiler.register(move |event| sink.lock().unwrap().push(event.clone()));

    subscription.dispose();
    let wrapped = profiler.profile_with(|| 5, "other");
    assert_eq!(wrapped.call(()), 5);
    profiler.flush().await;

    assert!(other.lock().unwrap().is_empty());
    assert_eq!(take(&spy).len(), 1, "remaining listeners still receive events");
}

#[tokio::test]
async fn test_panicking_listener_does_not_reach_caller() {
    let (profiler, spy) = enabled_profiler();
    profiler.register(|_| panic!("listener failure"));
    let after: Spy = Arc::new(Mutex::new(Vec::new()));
    let sink = after.clone();
    profiler.register(move |event| sink.lock().unwrap().push(event.clone()));

    assert_eq!(profiler.profile(|| 5).call(()), 5);
    profiler.flush().await;

    assert_eq!(take(&spy).len(), 1);
    assert_eq!(after.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_calls_are_not_profiled() {
    let (profiler, spy) = enabled_profiler();
    let parse = profiler.profile(|raw: &str| raw.parse::<u16>());

    assert!(parse.try_call(("70000",)).is_err());
    assert_eq!(parse.try_call(("8080",)), Ok(8080));
    profiler.flush().await;

    let events = take(&spy);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].result, json!(8080));
}

#[test]
fn test_without_runtime_listeners_run_in_call_order() {
    let profiler = Profiler::new(ProfilerConfig::enabled());
    let (tx, rx) = std::sync::mpsc::channel();
    let tx = Mutex::new(tx);
    let busy = Arc::new(std::sync::atomic::AtomicUsize::new(0));
    let peak = busy.clone();
    profiler.register(move |event| {
        let overlapping = peak.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        std::thread::sleep(std::time::Duration::from_millis(2));
        peak.fetch_sub(1, std::sync::atomic::Ordering::SeqCst);
        tx.lock().unwrap().send((event.result.clone(), overlapping)).unwrap();
    });

    let wrapped = profiler.profile(|n: u32| n);
    for n in 0..25u32 {
        assert_eq!(wrapped.call((n,)), n);
    }

    let delivered: Vec<_> = (0..25)
        .map(|_| rx.recv_timeout(std::time::Duration::from_secs(5)).unwrap())
        .collect();
    let results: Vec<serde_json::Value> = delivered.iter().map(|(r, _)| r.clone()).collect();
    assert_eq!(results, (0..25u32).map(|n| json!(n)).collect::<Vec<_>>());
    assert!(delivered.iter().all(|(_, overlapping)| *overlapping == 0));
    assert_eq!(busy.load(std::sync::atomic::Ordering::SeqCst), 0);
}
