use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;

use frame_handoff::FrameSlot;
use parking_lot::Mutex;
use tracing::{debug, error, info, trace};

use crate::pipeline::frame::{Dimensions, ProcessedFrame};
use crate::pipeline::worker::RenderRequest;
use crate::render::error::{RenderError, Result};
use crate::render::renderer::{FrameTarget, RenderStats, Renderer, RendererState};

enum Signal {
    Render,
    Resize(u32, u32),
    SurfaceDestroyed,
    SurfaceRecreated,
    Shutdown,
}

/// State the render thread shares with everybody else.
#[derive(Debug, Clone)]
pub struct RenderStatus {
    pub state: RendererState,
    pub stats: RenderStats,
    /// Why setup failed, when the renderer is degraded.
    pub setup_error: Option<String>,
}

/// Cheap, cloneable way to poke the render thread from any other thread.
///
/// Render requests coalesce: while one is queued, further requests are
/// no-ops, so the thread draws once per batch of publishes.
#[derive(Clone)]
pub struct RenderHandle {
    tx: Sender<Signal>,
    queued: Arc<AtomicBool>,
}

impl RenderHandle {
    fn send(&self, signal: Signal) -> Result<()> {
        self.tx.send(signal).map_err(|_| RenderError::ThreadGone)
    }

    pub fn resize(&self, width: u32, height: u32) -> Result<()> {
        self.send(Signal::Resize(width, height))
    }

    pub fn surface_destroyed(&self) -> Result<()> {
        self.send(Signal::SurfaceDestroyed)
    }

    pub fn surface_recreated(&self) -> Result<()> {
        self.send(Signal::SurfaceRecreated)
    }
}

impl RenderRequest for RenderHandle {
    fn request_render(&self) {
        if !self.queued.swap(true, Ordering::AcqRel) && self.tx.send(Signal::Render).is_err() {
            trace!("render request after render thread exit");
        }
    }
}

/// The dedicated render thread. Owns every GPU object; nothing GPU-related
/// is touched from any other thread.
pub struct RenderThread {
    handle: RenderHandle,
    status: Arc<Mutex<RenderStatus>>,
    thread: Option<JoinHandle<()>>,
}

impl RenderThread {
    /// Spawn the render thread. `setup` runs on the new thread and creates the
    /// target there; this call returns once setup has finished.
    ///
    /// A failed setup does not fail the spawn: the renderer is reported as
    /// [`RendererState::Degraded`] and render requests are ignored.
    pub fn spawn<T, F>(
        setup: F,
        slot: Arc<FrameSlot<ProcessedFrame>>,
        extent: Dimensions,
    ) -> Result<Self>
    where
        T: FrameTarget + 'static,
        F: FnOnce() -> Result<T> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let queued = Arc::new(AtomicBool::new(false));
        let status = Arc::new(Mutex::new(RenderStatus {
            state: RendererState::Uninitialized,
            stats: RenderStats::default(),
            setup_error: None,
        }));

        let thread = {
            let queued = Arc::clone(&queued);
            let status = Arc::clone(&status);
            std::thread::Builder::new()
                .name("render".to_string())
                .spawn(move || {
                    let renderer = match setup() {
                        Ok(target) => {
                            let mut renderer = Renderer::new(target, slot, extent);
                            let result = renderer.surface_ready();
                            publish_status(&status, &renderer, result.err());
                            Some(renderer)
                        }
                        Err(e) => {
                            error!("render target setup failed: {e}");
                            let mut status = status.lock();
                            status.state = RendererState::Degraded;
                            status.setup_error = Some(e.to_string());
                            None
                        }
                    };
                    // The spawner may already be gone; nothing to report then.
                    let _ = ready_tx.send(());
                    run_loop(renderer, &rx, &queued, &status);
                })
                .map_err(RenderError::Spawn)?
        };

        if ready_rx.recv().is_err() {
            // The thread died during setup.
            status.lock().state = RendererState::Degraded;
        }

        Ok(Self {
            handle: RenderHandle { tx, queued },
            status,
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> RenderStatus {
        self.status.lock().clone()
    }

    /// Stop the thread after it finishes any queued signals. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(thread) = self.thread.take() {
            if self.handle.send(Signal::Shutdown).is_err() {
                debug!("render thread already exited");
            }
            if thread.join().is_err() {
                error!("render thread panicked");
            }
        }
    }
}

impl Drop for RenderThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn publish_status<T: FrameTarget>(
    status: &Mutex<RenderStatus>,
    renderer: &Renderer<T>,
    setup_error: Option<RenderError>,
) {
    let mut status = status.lock();
    status.state = renderer.state();
    status.stats = renderer.stats();
    if let Some(e) = setup_error {
        status.setup_error = Some(e.to_string());
    }
}

fn run_loop<T: FrameTarget>(
    mut renderer: Option<Renderer<T>>,
    rx: &Receiver<Signal>,
    queued: &AtomicBool,
    status: &Mutex<RenderStatus>,
) {
    info!("render thread running");
    while let Ok(signal) = rx.recv() {
        let Some(r) = renderer.as_mut() else {
            if let Signal::Shutdown = signal {
                break;
            }
            queued.store(false, Ordering::Release);
            continue;
        };
        let mut setup_error = None;
        match signal {
            Signal::Render => {
                queued.store(false, Ordering::Release);
                let outcome = r.render_tick();
                trace!(?outcome, "render tick");
            }
            Signal::Resize(width, height) => r.surface_changed(width, height),
            Signal::SurfaceDestroyed => r.surface_destroyed(),
            Signal::SurfaceRecreated => setup_error = r.surface_ready().err(),
            Signal::Shutdown => break,
        }
        publish_status(status, r, setup_error);
    }
    if let Some(r) = renderer.as_mut() {
        r.surface_destroyed();
        publish_status(status, r, None);
    }
    info!("render thread exiting");
}
