use fluxstate_engine::{
    Action, ActionHandler, DispatchHandle, Dispatcher, DomainAction, Store,
};
use pretty_assertions::assert_eq;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Debug)]
enum TestAction {
    Outer,
    Inner,
    Ping,
}

impl DomainAction for TestAction {
    const DOMAIN: &'static str = "test";

    fn name(&self) -> &'static str {
        match self {
            Self::Outer => "Outer",
            Self::Inner => "Inner",
            Self::Ping => "Ping",
        }
    }
}

#[derive(Debug)]
struct OtherAction;

impl DomainAction for OtherAction {
    const DOMAIN: &'static str = "other";

    fn name(&self) -> &'static str {
        "Other"
    }
}

type Log = Arc<Mutex<Vec<String>>>;

struct Recorder {
    name: &'static str,
    log: Log,
    registered: AtomicUsize,
    redispatch: Option<DispatchHandle>,
}

impl Recorder {
    fn new(name: &'static str, log: &Log) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
            registered: AtomicUsize::new(0),
            redispatch: None,
        })
    }

    fn redispatching(name: &'static str, log: &Log, handle: DispatchHandle) -> Arc<Self> {
        Arc::new(Self {
            name,
            log: Arc::clone(log),
            registered: AtomicUsize::new(0),
            redispatch: Some(handle),
        })
    }
}

impl Store for Recorder {
    fn name(&self) -> &str {
        self.name
    }

    fn on_register(&self) {
        self.registered.fetch_add(1, Ordering::SeqCst);
    }

    fn on_action(&self, action: &Action) {
        let Some(action) = action.payload::<TestAction>() else {
            return;
        };
        self.log
            .lock()
            .unwrap()
            .push(format!("{}:{}", self.name, action.name()));
        if let (TestAction::Outer, Some(handle)) = (action, &self.redispatch) {
            assert!(handle.dispatch(TestAction::Inner));
        }
    }
}

fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

// ── Delivery ─────────────────────────────────────────────────────

#[test]
fn delivers_in_registration_order_before_returning() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    for name in ["a", "b", "c"] {
        dispatcher.register(Recorder::new(name, &log));
    }

    dispatcher.dispatch(TestAction::Ping);

    assert_eq!(entries(&log), vec!["a:Ping", "b:Ping", "c:Ping"]);
}

#[test]
fn nested_dispatch_completes_before_outer_continues() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    dispatcher.register(Recorder::redispatching("a", &log, dispatcher.handle()));
    dispatcher.register(Recorder::new("b", &log));

    dispatcher.dispatch(TestAction::Outer);

    assert_eq!(
        entries(&log),
        vec!["a:Outer", "a:Inner", "b:Inner", "b:Outer"]
    );
}

#[test]
fn unrecognized_actions_are_ignored() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    dispatcher.register(Recorder::new("a", &log));

    dispatcher.dispatch(OtherAction);

    assert!(entries(&log).is_empty());
}

#[test]
fn same_action_dispatched_twice_is_delivered_twice() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    dispatcher.register(Recorder::new("a", &log));

    dispatcher.dispatch(TestAction::Ping);
    dispatcher.dispatch(TestAction::Ping);

    assert_eq!(entries(&log).len(), 2);
}

// ── Registration ─────────────────────────────────────────────────

#[test]
fn duplicate_registration_is_ignored() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    let store = Recorder::new("a", &log);

    assert!(dispatcher.register(store.clone()));
    assert!(!dispatcher.register(store.clone()));

    assert_eq!(dispatcher.store_count(), 1);
    assert_eq!(store.registered.load(Ordering::SeqCst), 1);

    dispatcher.dispatch(TestAction::Ping);
    assert_eq!(entries(&log), vec!["a:Ping"]);
}

#[test]
fn unregister_stops_delivery() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    let store: Arc<dyn Store> = Recorder::new("a", &log);
    dispatcher.register(Arc::clone(&store));

    assert!(dispatcher.unregister(&store));
    assert!(!dispatcher.unregister(&store));

    dispatcher.dispatch(TestAction::Ping);
    assert!(entries(&log).is_empty());
}

// ── Handles ──────────────────────────────────────────────────────

#[test]
fn handle_dispatches_while_dispatcher_lives() {
    let dispatcher = Dispatcher::new();
    let log = Log::default();
    dispatcher.register(Recorder::new("a", &log));
    let handle = dispatcher.handle();

    assert!(handle.is_alive());
    assert!(handle.dispatch(TestAction::Ping));
    assert_eq!(entries(&log), vec!["a:Ping"]);
}

#[test]
fn handle_reports_dropped_dispatcher() {
    let dispatcher = Dispatcher::new();
    let handle = dispatcher.handle();
    drop(dispatcher);

    assert!(!handle.is_alive());
    assert!(!handle.dispatch(TestAction::Ping));
}

#[test]
fn cloned_dispatcher_keeps_handle_alive() {
    let dispatcher = Dispatcher::new();
    let clone = dispatcher.clone();
    let handle = dispatcher.handle();
    drop(dispatcher);

    assert!(handle.dispatch(TestAction::Ping));
    assert_eq!(clone.store_count(), 0);
}

// ── Typed handlers ───────────────────────────────────────────────

#[derive(Default)]
struct PingCounter {
    pings: AtomicUsize,
}

impl ActionHandler for PingCounter {
    type Action = TestAction;
    const NAME: &'static str = "pings";

    fn handle(&self, action: &TestAction) {
        if matches!(action, TestAction::Ping) {
            self.pings.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn action_handler_only_sees_its_domain() {
    let dispatcher = Dispatcher::new();
    let counter = Arc::new(PingCounter::default());
    dispatcher.register(counter.clone());

    dispatcher.dispatch(TestAction::Ping);
    dispatcher.dispatch(OtherAction);
    dispatcher.dispatch(TestAction::Outer);

    assert_eq!(counter.pings.load(Ordering::SeqCst), 1);
    assert_eq!(Store::name(counter.as_ref()), "pings");
}

#[test]
fn action_envelope_reports_domain_and_name() {
    let action = Action::new(TestAction::Inner);
    assert_eq!(action.domain(), "test");
    assert_eq!(action.name(), "Inner");
    assert!(action.is::<TestAction>());
    assert!(action.payload::<OtherAction>().is_none());
    assert_eq!(format!("{action:?}"), "Action(test::Inner)");
}
