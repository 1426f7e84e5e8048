//! Main application module

mod navbar;
mod prompt;
mod sidebar;
mod toasts;

use std::sync::Arc;

use cp_core::{CommandRegistry, ExportConfig, KernelContext, ResourceRegistry};
use cp_kernel::default_kernel;
use parking_lot::Mutex;

use crate::actions::{ActionContext, LoadService, dispatch_action, execute};
use crate::config::AppConfig;
use crate::panels::ViewportPanel;
use crate::state::{
    AppState, SharedAppState, SharedViewportState, ViewportState, create_shared_state,
};

pub use navbar::render_navbar;
pub use prompt::render_prompt;
pub use sidebar::render_sidebar;
pub use toasts::render_toasts;

/// Main application
pub struct CadPromptApp {
    app_state: SharedAppState,
    viewport_state: SharedViewportState,
    viewport_panel: ViewportPanel,
    kernel: KernelContext,
    registry: Arc<ResourceRegistry>,
    loads: LoadService,
    export: ExportConfig,
}

impl CadPromptApp {
    /// Create a new app and start the geometry kernel in the background
    pub fn new(cc: &eframe::CreationContext<'_>, config: AppConfig) -> Self {
        let registry = Arc::new(ResourceRegistry::new());
        let viewport_state = Arc::new(Mutex::new(ViewportState::new(
            config.viewer.clone(),
            config.scene.clone(),
            registry.clone(),
            cc.wgpu_render_state.as_ref(),
        )));

        let kernel = KernelContext::new();
        start_kernel(kernel.clone(), cc.egui_ctx.clone());

        let loads = LoadService::new(kernel.clone(), registry.clone(), config.load.clone())
            .with_repaint(cc.egui_ctx.clone());
        let app_state = create_shared_state(AppState::new(
            CommandRegistry::with_defaults(&config.load),
            config.scene.enabled,
        ));

        Self {
            app_state,
            viewport_state,
            viewport_panel: ViewportPanel::new(),
            kernel,
            registry,
            loads,
            export: config.export,
        }
    }

    /// Process pending actions
    fn process_actions(&mut self) {
        let actions = self.app_state.lock().take_pending_actions();
        let mut ctx = ActionContext {
            app_state: &self.app_state,
            viewport_state: &self.viewport_state,
            loads: &mut self.loads,
            export: &self.export,
        };

        for action in actions {
            dispatch_action(action, &mut ctx);
        }
    }

    /// Hand finished loads to the viewer and report failures
    fn poll_loads(&mut self, now: f64) {
        let results = self.loads.poll();
        let mut app = self.app_state.lock();
        app.loading = self.loads.in_flight();

        for result in results {
            match result {
                Ok(resource) => {
                    let shown = self
                        .viewport_state
                        .lock()
                        .show_resource(resource.url.clone());
                    match shown {
                        Ok(()) => {
                            tracing::info!(bytes = resource.byte_len, "Model displayed");
                        }
                        Err(e) => {
                            tracing::error!(error = %e, "Viewer rejected exported model");
                            self.registry.revoke(&resource.url);
                            app.notifications
                                .error(format!("Could not display the model: {e}"), now);
                        }
                    }
                }
                Err(e) if e.is_cancellation() => {
                    tracing::debug!("Load cancelled");
                }
                Err(e) => {
                    tracing::error!(error = %e, "Model load failed");
                    app.notifications.error(e.user_message(), now);
                }
            }
        }
    }
}

/// Initialize the kernel once, off the UI thread
fn start_kernel(kernel: KernelContext, repaint: egui::Context) {
    execute(move || async move {
        kernel.initialize(|| Ok(Arc::from(default_kernel())));
        repaint.request_repaint();
    });
}

impl eframe::App for CadPromptApp {
    fn update(&mut self, ctx: &egui::Context, frame: &mut eframe::Frame) {
        let now = ctx.input(|i| i.time);

        self.poll_loads(now);
        self.process_actions();

        render_navbar(ctx, &self.app_state, &self.kernel);
        render_sidebar(ctx, &self.app_state);
        render_prompt(ctx, &self.app_state);

        let render_state = frame.wgpu_render_state();
        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                self.viewport_panel
                    .ui(ui, &self.app_state, &self.viewport_state, render_state);
            });

        render_toasts(ctx, &self.app_state, now);
    }
}

impl Drop for CadPromptApp {
    fn drop(&mut self) {
        self.loads.cancel();
    }
}
