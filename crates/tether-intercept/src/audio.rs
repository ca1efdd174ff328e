//! Audio playback hook
//!
//! The host's audio library may load late and may be re-initialized with a
//! brand new prototype. The hook is either `Unbound` or bound to one
//! prototype; when the watcher sees a different prototype, the hook wraps
//! that prototype's `play` and forgets the previous one, which the host is
//! discarding anyway.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::task::JoinHandle;

use tether_core::{EventNotifier, EVENT_SOUND_PLAYED};

use crate::{observe, BindingSource, InterceptorBinding, MethodSlot, Watcher};

/// Slot claim held by the audio hook
pub const AUDIO_HOOK: &str = "tether.audio";

/// Argument of a `play` call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlayArg {
    /// Resume a sound by id
    Id(u64),
    /// Play a named sprite
    Sprite(String),
}

impl PlayArg {
    /// Does this name a specific sound? Zero ids and empty names do not.
    pub fn is_explicit(&self) -> bool {
        match self {
            PlayArg::Id(id) => *id != 0,
            PlayArg::Sprite(name) => !name.is_empty(),
        }
    }
}

/// An instance of the host audio library
pub trait SoundInstance: Send + Sync + 'static {
    /// Source configured on the instance itself
    fn source(&self) -> Option<String>;

    /// Source of the parent group, for sounds spawned by a group
    fn parent_source(&self) -> Option<String>;
}

/// Host `play`: returns the id of the started sound
pub type PlaySlot<S> = MethodSlot<S, Option<PlayArg>, Option<u64>>;

/// The library prototype holding the `play` method
pub struct SoundPrototype<S> {
    pub play: PlaySlot<S>,
}

impl<S: SoundInstance> SoundPrototype<S> {
    pub fn new<F>(play: F) -> Arc<Self>
    where
        F: Fn(&S, Option<PlayArg>) -> Option<u64> + Send + Sync + 'static,
    {
        Arc::new(SoundPrototype {
            play: MethodSlot::new(play),
        })
    }
}

/// Source of the sound an instance plays by default, trimmed
pub fn resolve_sound_source<S: SoundInstance>(sound: &S) -> Option<String> {
    let raw = sound
        .source()
        .filter(|source| !source.is_empty())
        .or_else(|| sound.parent_source())?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Binding state of the hook
pub enum HookState<S> {
    Unbound,
    Bound(Arc<SoundPrototype<S>>),
}

impl<S> Clone for HookState<S> {
    fn clone(&self) -> Self {
        match self {
            HookState::Unbound => HookState::Unbound,
            HookState::Bound(prototype) => HookState::Bound(Arc::clone(prototype)),
        }
    }
}

struct AudioBinding<S> {
    prototype: Arc<SoundPrototype<S>>,
    _binding: InterceptorBinding<S, Option<PlayArg>, Option<u64>>,
}

/// Emits `sound-played` for every default-sound `play` call
pub struct AudioHook<S> {
    notifier: Arc<dyn EventNotifier>,
    bound: Mutex<Option<AudioBinding<S>>>,
}

impl<S: SoundInstance> AudioHook<S> {
    pub fn new(notifier: Arc<dyn EventNotifier>) -> Arc<Self> {
        Arc::new(AudioHook {
            notifier,
            bound: Mutex::new(None),
        })
    }

    pub fn state(&self) -> HookState<S> {
        match &*self.bound.lock() {
            Some(binding) => HookState::Bound(Arc::clone(&binding.prototype)),
            None => HookState::Unbound,
        }
    }

    pub fn is_bound_to(&self, prototype: &Arc<SoundPrototype<S>>) -> bool {
        matches!(&*self.bound.lock(), Some(binding) if Arc::ptr_eq(&binding.prototype, prototype))
    }

    /// Wrap `prototype.play`, replacing any previous binding
    ///
    /// Returns false if the hook was already bound to this prototype, or if
    /// another audio hook already wraps its `play`.
    pub fn bind(&self, prototype: Arc<SoundPrototype<S>>) -> bool {
        let mut bound = self.bound.lock();
        if matches!(&*bound, Some(binding) if Arc::ptr_eq(&binding.prototype, &prototype)) {
            return false;
        }

        let notifier = Arc::clone(&self.notifier);
        let play = &prototype.play;
        let binding = InterceptorBinding::install_exclusive(play, AUDIO_HOOK, move |original| {
            observe(
                original,
                "Could not handle the played sound",
                move |sound: &S, arg: &Option<PlayArg>| {
                    if arg.as_ref().is_some_and(PlayArg::is_explicit) {
                        return Ok(());
                    }
                    match resolve_sound_source(sound) {
                        Some(source) => notifier.notify(EVENT_SOUND_PLAYED, Value::String(source)),
                        None => Ok(()),
                    }
                },
            )
        });
        let Some(binding) = binding else {
            tracing::warn!("play is already wrapped by another audio hook");
            return false;
        };

        tracing::debug!(rebind = bound.is_some(), "audio hook bound");
        *bound = Some(AudioBinding {
            prototype,
            _binding: binding,
        });
        true
    }

    /// Poll `library` every `interval` and bind to each new prototype
    pub fn watch<B>(self: &Arc<Self>, library: B, interval: Duration) -> JoinHandle<()>
    where
        B: BindingSource<Target = SoundPrototype<S>>,
    {
        let hook = Arc::clone(self);
        Watcher::new(library, interval).spawn(move |prototype| {
            hook.bind(prototype);
        })
    }
}
