//! Method slots and interceptor bindings
//!
//! A host object exposes each interceptable method as a [`MethodSlot`].
//! Installing an interceptor captures the slot's current function once and
//! puts a wrapper in its place; the wrapper always forwards to the captured
//! original and returns its result untouched.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use tether_core::TetherResult;

use crate::report_observation_failure;

/// A host function taking a receiver and its arguments
pub type HostFn<T, A, R> = Arc<dyn Fn(&T, A) -> R + Send + Sync>;

/// Identity comparison of two host functions
pub fn same_fn<T, A, R>(a: &HostFn<T, A, R>, b: &HostFn<T, A, R>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

/// A replaceable method on a host object
///
/// Each interceptor kind wraps a given slot at most once.
pub struct MethodSlot<T, A, R> {
    current: RwLock<HostFn<T, A, R>>,
    claims: Mutex<Vec<&'static str>>,
}

impl<T: 'static, A: 'static, R: 'static> MethodSlot<T, A, R> {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&T, A) -> R + Send + Sync + 'static,
    {
        MethodSlot {
            current: RwLock::new(Arc::new(f)),
            claims: Mutex::new(Vec::new()),
        }
    }

    /// The function currently installed
    pub fn get(&self) -> HostFn<T, A, R> {
        Arc::clone(&self.current.read())
    }

    /// Install `f`, returning the function it replaces
    pub fn replace(&self, f: HostFn<T, A, R>) -> HostFn<T, A, R> {
        std::mem::replace(&mut *self.current.write(), f)
    }

    /// Reserve the slot for interceptor `key`; false if already reserved
    pub fn claim(&self, key: &'static str) -> bool {
        let mut claims = self.claims.lock();
        if claims.contains(&key) {
            return false;
        }
        claims.push(key);
        true
    }

    pub fn is_claimed(&self, key: &str) -> bool {
        self.claims.lock().iter().any(|claimed| *claimed == key)
    }

    /// Invoke the installed function as the host would
    pub fn call(&self, this: &T, args: A) -> R {
        let f = self.get();
        f(this, args)
    }
}

/// An installed interceptor: the captured original and its wrapper
pub struct InterceptorBinding<T, A, R> {
    original: HostFn<T, A, R>,
    wrapped: HostFn<T, A, R>,
}

impl<T: 'static, A: 'static, R: 'static> InterceptorBinding<T, A, R> {
    /// Capture the slot's current function and install `wrap(original)`
    pub fn install<W>(slot: &MethodSlot<T, A, R>, wrap: W) -> Self
    where
        W: FnOnce(HostFn<T, A, R>) -> HostFn<T, A, R>,
    {
        let original = slot.get();
        let wrapped = wrap(Arc::clone(&original));
        slot.replace(Arc::clone(&wrapped));
        InterceptorBinding { original, wrapped }
    }

    /// Like [`install`](Self::install), unless interceptor `key` already
    /// wraps the slot, in which case nothing is captured and `wrap` is
    /// never called
    pub fn install_exclusive<W>(
        slot: &MethodSlot<T, A, R>,
        key: &'static str,
        wrap: W,
    ) -> Option<Self>
    where
        W: FnOnce(HostFn<T, A, R>) -> HostFn<T, A, R>,
    {
        slot.claim(key).then(|| Self::install(slot, wrap))
    }

    pub fn original(&self) -> &HostFn<T, A, R> {
        &self.original
    }

    pub fn wrapped(&self) -> &HostFn<T, A, R> {
        &self.wrapped
    }

    /// Is this binding's wrapper what the slot currently holds?
    pub fn is_installed_on(&self, slot: &MethodSlot<T, A, R>) -> bool {
        same_fn(&slot.get(), &self.wrapped)
    }
}

/// Wrap `original` so that `observer` sees every call first
///
/// Observer errors are reported under `context` and otherwise ignored; the
/// original is always called with the untouched arguments.
pub fn observe<T, A, R, O>(original: HostFn<T, A, R>, context: &'static str, observer: O) -> HostFn<T, A, R>
where
    T: 'static,
    A: 'static,
    R: 'static,
    O: Fn(&T, &A) -> TetherResult<()> + Send + Sync + 'static,
{
    Arc::new(move |this: &T, args: A| {
        if let Err(error) = observer(this, &args) {
            report_observation_failure(context, &error);
        }
        original(this, args)
    })
}
