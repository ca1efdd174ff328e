//! End-to-end Integration Test Suite
//!
//! Tests that verify the complete flow between the extension side and the
//! page:
//! - Action requests answered by a scripted peer
//! - Session data observed on the network and forwarded as notifications
//! - Played sounds observed across audio library reloads

use std::sync::Arc;

use tether_bridge::HostWindow;
use tether_core::TetherResult;
use tether_intercept::{AudioHook, MethodSlot, NetworkHook, OpenArgs};
use tether_runtime::{Runtime, RuntimeConfig};

use crate::host::{open_method, FakeRequest, FakeSound, SoundLibrary};
use crate::peer::SimulatedPeer;

/// A URL the host uses to start a practice session
pub const SESSION_URL: &str = "https://host.example/2017-06-30/sessions";

// ============================================================================
// HARNESS
// ============================================================================

/// A host page with the runtime attached and a peer listening
///
/// Must be created inside a Tokio runtime.
pub struct HostHarness {
    pub window: Arc<HostWindow>,
    pub peer: SimulatedPeer,
    pub runtime: Runtime,
    pub open: MethodSlot<FakeRequest, OpenArgs, usize>,
    pub network: NetworkHook<FakeRequest, usize>,
    pub library: SoundLibrary,
    pub audio: Arc<AudioHook<FakeSound>>,
}

impl HostHarness {
    pub fn start(config: RuntimeConfig) -> TetherResult<Self> {
        let window = HostWindow::open();
        let peer = SimulatedPeer::attach(&window);
        let mut runtime = Runtime::start(config, Arc::clone(&window))?;

        let open = open_method();
        let network = runtime.install_network_hook(&open)?;
        let library = SoundLibrary::new();
        let audio = runtime.watch_audio_library(library.clone())?;

        Ok(HostHarness {
            window,
            peer,
            runtime,
            open,
            network,
            library,
            audio,
        })
    }

    /// Open `url` on a fresh request and complete it with `body`
    pub fn load(&self, url: &str, body: &str) -> (FakeRequest, usize) {
        let request = FakeRequest::new();
        request.respond_text(body);
        let returned = self.open.call(&request, OpenArgs::new("POST", url));
        request.complete();
        (request, returned)
    }

    /// Wait until everything posted so far reached the listeners
    pub async fn settle(&self) {
        self.window.flush().await;
    }
}
