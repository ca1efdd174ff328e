//! Tether Runtime - the single long-lived service object
//!
//! Created once at startup, never reset. It owns the request bridge (and
//! through it the window listener), the interceptor state and the watcher
//! tasks. Dropping it stops the watchers; wrappers already installed on host
//! slots stay in place.

use std::any::Any;
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::task::JoinHandle;

use tether_bridge::{HostWindow, RequestBridge};
use tether_core::{EventNotifier, TetherError, TetherResult};
use tether_intercept::{
    AudioHook, BindingSource, MethodSlot, NetworkHook, NetworkRequest, OpenArgs, SoundInstance,
    SoundPrototype, AUDIO_HOOK,
};

use crate::{init_logging, RuntimeConfig};

#[derive(Clone, Debug, Default)]
pub struct RuntimeStats {
    pub network_hooks: u64,
    pub audio_hooks: u64,
}

/// Tether runtime
pub struct Runtime {
    config: RuntimeConfig,
    bridge: Arc<RequestBridge>,
    /// The `AudioHook<S>` watching the host library, once started
    audio: Option<Arc<dyn Any + Send + Sync>>,
    watchers: Vec<JoinHandle<()>>,
    stats: RuntimeStats,
}

impl Runtime {
    /// Validate the configuration, set up logging and attach to `window`
    pub fn start(config: RuntimeConfig, window: Arc<HostWindow>) -> TetherResult<Self> {
        config.validate()?;
        init_logging(&config.log)?;

        let bridge = Arc::new(RequestBridge::new(window));
        tracing::info!(
            window = bridge.window().id().0,
            poll_interval = ?config.poll_interval,
            "tether runtime started"
        );

        Ok(Runtime {
            config,
            bridge,
            audio: None,
            watchers: Vec::new(),
            stats: RuntimeStats::default(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn window(&self) -> &Arc<HostWindow> {
        self.bridge.window()
    }

    pub fn bridge(&self) -> &Arc<RequestBridge> {
        &self.bridge
    }

    /// The notifier handed to interceptors
    pub fn notifier(&self) -> Arc<dyn EventNotifier> {
        self.bridge.clone()
    }

    /// See [`RequestBridge::send_action_request`]
    pub fn send_action_request(
        &self,
        action: &str,
        value: Value,
    ) -> impl Future<Output = TetherResult<Option<Value>>> + Send + 'static {
        self.bridge.send_action_request(action, value)
    }

    /// Wrap the host's request `open` slot
    ///
    /// A slot is wrapped once; repeating the call fails with
    /// [`TetherError::AlreadyInstalled`].
    pub fn install_network_hook<R, O>(
        &mut self,
        slot: &MethodSlot<R, OpenArgs, O>,
    ) -> TetherResult<NetworkHook<R, O>>
    where
        R: NetworkRequest,
        O: 'static,
    {
        let hook = NetworkHook::install(slot, self.notifier(), &self.config.session_url_pattern)?;
        self.stats.network_hooks += 1;
        tracing::debug!("network hook installed");
        Ok(hook)
    }

    /// Start watching the host audio library, binding to each new prototype
    ///
    /// The runtime watches a single library. Later calls return the hook
    /// already running and drop `library`.
    pub fn watch_audio_library<S, B>(&mut self, library: B) -> TetherResult<Arc<AudioHook<S>>>
    where
        S: SoundInstance,
        B: BindingSource<Target = SoundPrototype<S>>,
    {
        if let Some(existing) = &self.audio {
            tracing::debug!("audio library already watched");
            return Arc::clone(existing)
                .downcast::<AudioHook<S>>()
                .map_err(|_| TetherError::AlreadyInstalled(AUDIO_HOOK.to_string()));
        }

        let hook = AudioHook::new(self.notifier());
        self.watchers.push(hook.watch(library, self.config.poll_interval));
        let erased: Arc<dyn Any + Send + Sync> = hook.clone();
        self.audio = Some(erased);
        self.stats.audio_hooks += 1;
        tracing::debug!("audio library watcher started");
        Ok(hook)
    }

    pub fn stats(&self) -> RuntimeStats {
        self.stats.clone()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        for watcher in &self.watchers {
            watcher.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use parking_lot::Mutex;
    use serde_json::json;
    use tether_bridge::ListenerControl;
    use tether_core::{Message, EVENT_SESSION_LOADED, EVENT_SOUND_PLAYED};
    use tether_intercept::LoadListener;

    fn record_notifications(window: &HostWindow) -> Arc<Mutex<Vec<(String, Value)>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        window.add_listener(move |event| {
            if let Some(Message::EventNotification(n)) = Message::from_value(event.data()) {
                sink.lock().push((n.event, n.value));
            }
            ListenerControl::Keep
        });
        seen
    }

    #[derive(Default)]
    struct Request {
        listeners: Mutex<Vec<LoadListener<Request>>>,
        body: String,
    }

    impl NetworkRequest for Request {
        fn add_load_listener(&self, listener: LoadListener<Self>) {
            self.listeners.lock().push(listener);
        }

        fn response(&self) -> Option<Value> {
            None
        }

        fn response_text(&self) -> Option<String> {
            Some(self.body.clone())
        }
    }

    struct Sound(&'static str);

    impl SoundInstance for Sound {
        fn source(&self) -> Option<String> {
            Some(self.0.to_string())
        }

        fn parent_source(&self) -> Option<String> {
            None
        }
    }

    #[derive(Clone, Default)]
    struct Library {
        prototype: Arc<Mutex<Option<Arc<SoundPrototype<Sound>>>>>,
    }

    impl BindingSource for Library {
        type Target = SoundPrototype<Sound>;

        fn is_available(&self) -> bool {
            self.prototype.lock().is_some()
        }

        fn current_binding(&self) -> Option<Arc<SoundPrototype<Sound>>> {
            self.prototype.lock().clone()
        }
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_config() {
        let config = RuntimeConfig {
            poll_interval: Duration::ZERO,
            ..RuntimeConfig::default()
        };
        assert!(Runtime::start(config, HostWindow::open()).is_err());
    }

    #[tokio::test]
    async fn test_network_hook_notifies_through_window() {
        let window = HostWindow::open();
        let seen = record_notifications(&window);
        let mut runtime = Runtime::start(RuntimeConfig::default(), Arc::clone(&window)).unwrap();

        let open: MethodSlot<Request, OpenArgs, ()> =
            MethodSlot::new(|_: &Request, _: OpenArgs| ());
        runtime.install_network_hook(&open).unwrap();

        let request = Request {
            body: r#"{"session":1}"#.to_string(),
            ..Default::default()
        };
        open.call(&request, OpenArgs::new("POST", "/2024-01-31/sessions"));
        let listeners: Vec<_> = request.listeners.lock().drain(..).collect();
        for listener in listeners {
            listener(&request);
        }
        window.flush().await;

        assert_eq!(
            *seen.lock(),
            vec![(EVENT_SESSION_LOADED.to_string(), json!({ "session": 1 }))]
        );
        assert_eq!(runtime.stats().network_hooks, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_audio_watcher_runs_until_drop() {
        let window = HostWindow::open();
        let seen = record_notifications(&window);
        let mut runtime = Runtime::start(RuntimeConfig::default(), Arc::clone(&window)).unwrap();
        let library = Library::default();
        let hook = runtime.watch_audio_library(library.clone()).unwrap();

        let prototype = SoundPrototype::new(|_: &Sound, _| Some(1));
        *library.prototype.lock() = Some(Arc::clone(&prototype));
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(hook.is_bound_to(&prototype));

        prototype.play.call(&Sound("/a.mp3"), None);
        window.flush().await;
        assert_eq!(
            *seen.lock(),
            vec![(EVENT_SOUND_PLAYED.to_string(), json!("/a.mp3"))]
        );

        // Watching again hands back the running hook
        let again = runtime.watch_audio_library(Library::default()).unwrap();
        assert!(Arc::ptr_eq(&again, &hook));
        assert_eq!(runtime.stats().audio_hooks, 1);

        drop(runtime);
        let replaced = SoundPrototype::new(|_: &Sound, _| Some(2));
        *library.prototype.lock() = Some(Arc::clone(&replaced));
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(hook.is_bound_to(&prototype));
    }
}
