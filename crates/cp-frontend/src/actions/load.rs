//! Background model loads
//!
//! Each load runs the STEP-to-GLB pipeline off the UI thread and reports
//! back through a channel drained once per frame. Only the newest load may
//! reach the viewer; results of superseded loads are dropped and their
//! resources revoked.

use std::sync::mpsc::{Receiver, Sender, channel};

use cp_core::{
    KernelContext, LoadConfig, LoadController, LoadError, LoadRequest, MeshResource,
    SharedRegistry, load_model,
};

use super::execute;

/// Result of one load, tagged with its generation
#[derive(Debug)]
struct LoadOutcome {
    generation: u64,
    result: Result<MeshResource, LoadError>,
}

/// Starts loads and collects their results
pub struct LoadService {
    context: KernelContext,
    registry: SharedRegistry,
    config: LoadConfig,
    controller: LoadController,
    sender: Sender<LoadOutcome>,
    receiver: Receiver<LoadOutcome>,
    repaint: Option<egui::Context>,
}

impl LoadService {
    pub fn new(context: KernelContext, registry: SharedRegistry, config: LoadConfig) -> Self {
        let (sender, receiver) = channel();
        Self {
            context,
            registry,
            config,
            controller: LoadController::new(),
            sender,
            receiver,
            repaint: None,
        }
    }

    /// Request a repaint of `ctx` whenever a load finishes
    pub fn with_repaint(mut self, ctx: egui::Context) -> Self {
        self.repaint = Some(ctx);
        self
    }

    /// Start a load, superseding the one in flight. Returns its generation.
    pub fn start(&mut self, request: LoadRequest) -> u64 {
        let ticket = self.controller.begin(self.config.timeout());
        let generation = ticket.generation;
        tracing::info!(generation, path = %request.path, "Starting load");

        let context = self.context.clone();
        let registry = self.registry.clone();
        let sender = self.sender.clone();
        let repaint = self.repaint.clone();

        #[cfg(not(target_arch = "wasm32"))]
        let fetcher =
            cp_core::NativeFetcher::new(self.config.asset_root.clone(), self.config.timeout());
        #[cfg(target_arch = "wasm32")]
        let fetcher = cp_core::WebFetcher;

        execute(move || async move {
            let result = load_model(&context, &fetcher, &registry, &request, &ticket.token).await;
            // Receiver gone means the app is shutting down
            let _ = sender.send(LoadOutcome { generation, result });
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });

        generation
    }

    /// Check if a load is in flight
    pub fn in_flight(&self) -> bool {
        self.controller.in_flight()
    }

    /// Cancel the load in flight
    pub fn cancel(&mut self) {
        self.controller.cancel();
    }

    /// Drain finished loads, returning only results of the current one
    pub fn poll(&mut self) -> Vec<Result<MeshResource, LoadError>> {
        let mut results = Vec::new();
        while let Ok(outcome) = self.receiver.try_recv() {
            if self.controller.finish(outcome.generation) {
                results.push(outcome.result);
                continue;
            }
            match outcome.result {
                Ok(resource) => {
                    tracing::debug!(
                        generation = outcome.generation,
                        url = %resource.url,
                        "Discarding superseded load result"
                    );
                    self.registry.revoke(&resource.url);
                }
                Err(e) => {
                    tracing::debug!(
                        generation = outcome.generation,
                        error = %e,
                        "Superseded load ended"
                    );
                }
            }
        }
        results
    }
}
