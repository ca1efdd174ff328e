//! Simulated host objects

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use tether_intercept::{
    BindingSource, LoadListener, MethodSlot, NetworkRequest, OpenArgs, PlayArg, SoundInstance,
    SoundPrototype,
};

// ============================================================================
// NETWORK
// ============================================================================

/// A host network request that completes when told to
#[derive(Default)]
pub struct FakeRequest {
    listeners: Mutex<Vec<LoadListener<FakeRequest>>>,
    opened: Mutex<Vec<OpenArgs>>,
    response: Mutex<Option<Value>>,
    response_text: Mutex<Option<String>>,
}

impl FakeRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the raw body the request will complete with
    pub fn respond_text(&self, text: impl Into<String>) {
        *self.response_text.lock() = Some(text.into());
    }

    /// Set the body as already decoded by the host
    pub fn respond_json(&self, value: Value) {
        *self.response.lock() = Some(value);
    }

    /// Fire the load event; returns how many listeners ran
    pub fn complete(&self) -> usize {
        let listeners: Vec<_> = self.listeners.lock().drain(..).collect();
        let count = listeners.len();
        for listener in listeners {
            listener(self);
        }
        count
    }

    /// Every `open` call the host method received
    pub fn opened(&self) -> Vec<OpenArgs> {
        self.opened.lock().clone()
    }
}

impl NetworkRequest for FakeRequest {
    fn add_load_listener(&self, listener: LoadListener<Self>) {
        self.listeners.lock().push(listener);
    }

    fn response(&self) -> Option<Value> {
        self.response.lock().clone()
    }

    fn response_text(&self) -> Option<String> {
        self.response_text.lock().clone()
    }
}

/// The host's `open`: records its arguments and returns how many times
/// this request was opened
pub fn open_method() -> MethodSlot<FakeRequest, OpenArgs, usize> {
    MethodSlot::new(|request: &FakeRequest, args: OpenArgs| {
        let mut opened = request.opened.lock();
        opened.push(args);
        opened.len()
    })
}

// ============================================================================
// AUDIO
// ============================================================================

/// An instance of the simulated audio library
#[derive(Clone, Debug, Default)]
pub struct FakeSound {
    pub src: Option<String>,
    pub parent_src: Option<String>,
}

impl FakeSound {
    pub fn new(src: &str) -> Self {
        FakeSound {
            src: Some(src.to_string()),
            parent_src: None,
        }
    }

    /// A sound spawned by a group, with no source of its own
    pub fn in_group(parent_src: &str) -> Self {
        FakeSound {
            src: None,
            parent_src: Some(parent_src.to_string()),
        }
    }
}

impl SoundInstance for FakeSound {
    fn source(&self) -> Option<String> {
        self.src.clone()
    }

    fn parent_source(&self) -> Option<String> {
        self.parent_src.clone()
    }
}

/// A `play` call that reached the library itself
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayCall {
    /// Load generation of the prototype that handled the call
    pub generation: u64,
    pub arg: Option<PlayArg>,
    pub sound_id: u64,
}

#[derive(Default)]
struct LibraryState {
    prototype: Mutex<Option<Arc<SoundPrototype<FakeSound>>>>,
    generation: AtomicU64,
    next_sound_id: AtomicU64,
    plays: Mutex<Vec<PlayCall>>,
}

/// The host audio library, which may load late and reload at any time
#[derive(Clone, Default)]
pub struct SoundLibrary {
    state: Arc<LibraryState>,
}

impl SoundLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// (Re)initialize the library with a fresh prototype
    pub fn load(&self) -> Arc<SoundPrototype<FakeSound>> {
        let generation = self.state.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let state = Arc::downgrade(&self.state);

        let prototype = SoundPrototype::new(move |_: &FakeSound, arg: Option<PlayArg>| {
            let state = state.upgrade()?;
            let sound_id = state.next_sound_id.fetch_add(1, Ordering::Relaxed) + 1000;
            state.plays.lock().push(PlayCall {
                generation,
                arg,
                sound_id,
            });
            Some(sound_id)
        });

        *self.state.prototype.lock() = Some(Arc::clone(&prototype));
        prototype
    }

    /// Remove the library entry point
    pub fn unload(&self) {
        *self.state.prototype.lock() = None;
    }

    pub fn prototype(&self) -> Option<Arc<SoundPrototype<FakeSound>>> {
        self.state.prototype.lock().clone()
    }

    /// Play through whatever `play` the current prototype exposes
    pub fn play(&self, sound: &FakeSound, arg: Option<PlayArg>) -> Option<u64> {
        let prototype = self.prototype()?;
        prototype.play.call(sound, arg)
    }

    pub fn plays(&self) -> Vec<PlayCall> {
        self.state.plays.lock().clone()
    }
}

impl BindingSource for SoundLibrary {
    type Target = SoundPrototype<FakeSound>;

    fn is_available(&self) -> bool {
        self.state.prototype.lock().is_some()
    }

    fn current_binding(&self) -> Option<Arc<SoundPrototype<FakeSound>>> {
        self.prototype()
    }
}
