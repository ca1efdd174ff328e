//! Best-effort diagnostic sink for swallowed observation failures

use tether_core::TetherError;

/// Target of every warning the sink emits
pub const OBSERVER_TARGET: &str = "tether::observer";

/// Report a failure that an interceptor caught and will not propagate
pub fn report_observation_failure(context: &str, error: &TetherError) {
    tracing::warn!(target: OBSERVER_TARGET, %error, "{}", context);
}

/// Run `f` and collect the messages of the observer warnings it emitted
#[cfg(test)]
pub(crate) fn capture_observer_warnings<F: FnOnce()>(f: F) -> Vec<String> {
    use std::fmt;
    use std::sync::Arc;

    use parking_lot::Mutex;
    use tracing::field::{Field, Visit};
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    struct Capture(Arc<Mutex<Vec<String>>>);

    struct MessageField(Option<String>);

    impl Visit for MessageField {
        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            if field.name() == "message" {
                self.0 = Some(format!("{value:?}"));
            }
        }
    }

    impl<S: Subscriber> Layer<S> for Capture {
        fn on_event(&self, event: &Event<'_>, _: Context<'_, S>) {
            let metadata = event.metadata();
            if metadata.target() != OBSERVER_TARGET || *metadata.level() != Level::WARN {
                return;
            }
            let mut message = MessageField(None);
            event.record(&mut message);
            self.0.lock().extend(message.0);
        }
    }

    let seen = Arc::new(Mutex::new(Vec::new()));
    let subscriber = tracing_subscriber::registry().with(Capture(Arc::clone(&seen)));
    tracing::subscriber::with_default(subscriber, f);
    let warnings = seen.lock().clone();
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reaches_observer_target() {
        let warnings = capture_observer_warnings(|| {
            report_observation_failure("Could not read the body", &TetherError::ChannelClosed);
            tracing::warn!(target: "tether::other", "unrelated");
        });

        assert_eq!(warnings, vec!["Could not read the body".to_string()]);
    }
}
