// Include tests
#[cfg(test)]
mod tests {
    use crate::{EventBus, Listener, Subscription};
    use std::sync::{Arc, Mutex};

    #[derive(Debug)]
    struct PingEvent {
        seq: u32,
    }

    #[derive(Debug)]
    struct PongEvent;

    type Log = Arc<Mutex<Vec<String>>>;

    fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }

    /// Records `"{tag}:{seq}"` for every `PingEvent` at a fixed priority.
    struct TaggedListener {
        tag: &'static str,
        priority: i8,
        log: Log,
    }

    impl TaggedListener {
        fn new(tag: &'static str, priority: i8, log: &Log) -> Arc<Self> {
            Arc::new(Self {
                tag,
                priority,
                log: log.clone(),
            })
        }
    }

    impl Listener for TaggedListener {
        fn subscriptions(&self) -> Vec<Subscription> {
            let log = self.log.clone();
            let tag = self.tag;
            vec![Subscription::new(
                self.priority,
                tag,
                move |event: &PingEvent| {
                    log.lock().unwrap().push(format!("{tag}:{}", event.seq));
                    Ok(())
                },
            )]
        }

        fn listener_name(&self) -> &'static str {
            self.tag
        }
    }

    /// Always fails after recording that it ran.
    struct FailingListener {
        priority: i8,
        log: Log,
    }

    impl Listener for FailingListener {
        fn subscriptions(&self) -> Vec<Subscription> {
            let log = self.log.clone();
            vec![Subscription::new(
                self.priority,
                "failing",
                move |_: &PingEvent| {
                    log.lock().unwrap().push("failing".to_string());
                    Err(anyhow::anyhow!("listener exploded").into())
                },
            )]
        }
    }

    /// Subscribes to two event types at once.
    struct MultiListener {
        log: Log,
    }

    impl Listener for MultiListener {
        fn subscriptions(&self) -> Vec<Subscription> {
            let ping_log = self.log.clone();
            let pong_log = self.log.clone();
            vec![
                Subscription::new(0, "multi_ping", move |event: &PingEvent| {
                    ping_log.lock().unwrap().push(format!("ping:{}", event.seq));
                    Ok(())
                }),
                Subscription::new(0, "multi_pong", move |_: &PongEvent| {
                    pong_log.lock().unwrap().push("pong".to_string());
                    Ok(())
                }),
            ]
        }
    }

    #[test]
    fn dispatch_follows_ascending_priority() {
        let bus = EventBus::new();
        let log = new_log();

        // Registration order is deliberately scrambled; the extremes of the
        // priority range must land first and last.
        bus.register(&TaggedListener::new("mid", 0, &log));
        bus.register(&TaggedListener::new("last", i8::MAX, &log));
        bus.register(&TaggedListener::new("early", -3, &log));
        bus.register(&TaggedListener::new("first", i8::MIN, &log));
        bus.register(&TaggedListener::new("late", 5, &log));

        bus.post(&PingEvent { seq: 7 });

        assert_eq!(
            entries(&log),
            vec!["first:7", "early:7", "mid:7", "late:7", "last:7"]
        );
    }

    #[test]
    fn post_without_handlers_is_noop() {
        let bus = EventBus::new();
        bus.post(&PingEvent { seq: 1 });

        let stats = bus.stats();
        assert_eq!(stats.events_posted, 1);
        assert_eq!(stats.handler_invocations, 0);
        assert_eq!(stats.total_handlers, 0);
    }

    #[test]
    fn failing_handler_does_not_stop_dispatch() {
        let bus = EventBus::new();
        let log = new_log();

        bus.register(&Arc::new(FailingListener {
            priority: 0,
            log: log.clone(),
        }));
        bus.register(&TaggedListener::new("survivor", 1, &log));

        bus.post(&PingEvent { seq: 2 });

        assert_eq!(entries(&log), vec!["failing", "survivor:2"]);
        assert_eq!(bus.stats().handler_failures, 1);
    }

    #[test]
    fn unregister_removes_only_that_listener() {
        let bus = EventBus::new();
        let log = new_log();

        let keep = TaggedListener::new("keep", 0, &log);
        let drop = TaggedListener::new("drop", 1, &log);
        bus.register(&keep);
        bus.register(&drop);

        bus.unregister(&drop);
        bus.post(&PingEvent { seq: 3 });

        assert_eq!(entries(&log), vec!["keep:3"]);
        assert_eq!(bus.stats().total_handlers, 1);
    }

    #[test]
    fn unregister_unknown_listener_is_noop() {
        let bus = EventBus::new();
        let log = new_log();

        let registered = TaggedListener::new("registered", 0, &log);
        let stranger = TaggedListener::new("stranger", 0, &log);
        bus.register(&registered);

        bus.unregister(&stranger);
        bus.post(&PingEvent { seq: 4 });

        assert_eq!(entries(&log), vec!["registered:4"]);
    }

    #[test]
    fn events_match_exact_type_only() {
        let bus = EventBus::new();
        let log = new_log();

        bus.register(&TaggedListener::new("ping_only", 0, &log));
        bus.post(&PongEvent);

        assert!(entries(&log).is_empty());
    }

    #[test]
    fn listener_can_subscribe_to_multiple_event_types() {
        let bus = EventBus::new();
        let log = new_log();

        let multi = Arc::new(MultiListener { log: log.clone() });
        bus.register(&multi);

        bus.post(&PingEvent { seq: 5 });
        bus.post(&PongEvent);
        assert_eq!(entries(&log), vec!["ping:5", "pong"]);

        bus.unregister(&multi);
        bus.post(&PingEvent { seq: 6 });
        bus.post(&PongEvent);
        assert_eq!(entries(&log), vec!["ping:5", "pong"]);
        assert_eq!(bus.stats().total_handlers, 0);
    }

    #[test]
    fn reregistration_replaces_rather_than_stacks() {
        let bus = EventBus::new();
        let log = new_log();

        let listener = TaggedListener::new("repeat", 0, &log);
        bus.register(&listener);
        bus.register(&listener);

        bus.post(&PingEvent { seq: 8 });

        assert_eq!(entries(&log), vec!["repeat:8"]);
        assert_eq!(bus.stats().total_handlers, 1);
    }

    #[test]
    fn rebake_is_visible_to_subsequent_posts() {
        let bus = EventBus::new();
        let log = new_log();

        bus.register(&TaggedListener::new("second", 10, &log));
        bus.post(&PingEvent { seq: 1 });

        bus.register(&TaggedListener::new("first", -10, &log));
        bus.post(&PingEvent { seq: 2 });

        assert_eq!(entries(&log), vec!["second:1", "first:2", "second:2"]);
    }

    #[test]
    fn same_priority_listeners_all_run() {
        let bus = EventBus::new();
        let log = new_log();

        bus.register(&TaggedListener::new("a", 0, &log));
        bus.register(&TaggedListener::new("b", 0, &log));

        bus.post(&PingEvent { seq: 9 });

        // Relative order between equal priorities is unspecified.
        let mut seen = entries(&log);
        seen.sort();
        assert_eq!(seen, vec!["a:9", "b:9"]);
    }

    #[test]
    fn stats_track_dispatch_activity() {
        let bus = EventBus::new();
        let log = new_log();

        bus.register(&TaggedListener::new("counted", 0, &log));
        bus.post(&PingEvent { seq: 1 });
        bus.post(&PingEvent { seq: 2 });

        let stats = bus.stats();
        assert_eq!(stats.events_posted, 2);
        assert_eq!(stats.handler_invocations, 2);
        assert_eq!(stats.handler_failures, 0);
        assert_eq!(stats.total_handlers, 1);
    }
}
