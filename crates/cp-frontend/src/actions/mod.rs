//! Action handling module
//!
//! Actions are queued in AppState and processed each frame.

mod load;

use std::future::Future;

use cp_core::{ExportConfig, LoadRequest};

use crate::state::{AppAction, SharedAppState, SharedViewportState};

pub use load::LoadService;

/// Run a task off the UI thread.
///
/// Native builds drive the future to completion on a new thread; the browser
/// build queues it on the page's event loop. The future itself is built on the
/// executing side, so it does not need to be `Send`.
#[cfg(not(target_arch = "wasm32"))]
pub fn execute<F, Fut>(task: F)
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + 'static,
{
    std::thread::spawn(move || pollster::block_on(task()));
}

/// Run a task off the UI thread.
#[cfg(target_arch = "wasm32")]
pub fn execute<F, Fut>(task: F)
where
    F: FnOnce() -> Fut + 'static,
    Fut: Future<Output = ()> + 'static,
{
    wasm_bindgen_futures::spawn_local(task());
}

/// Context for action handlers
pub struct ActionContext<'a> {
    pub app_state: &'a SharedAppState,
    pub viewport_state: &'a SharedViewportState,
    pub loads: &'a mut LoadService,
    pub export: &'a ExportConfig,
}

/// Dispatch an action to the appropriate handler
pub fn dispatch_action(action: AppAction, ctx: &mut ActionContext) {
    match action {
        AppAction::RunCommand(command) => {
            let Some(request) = LoadRequest::from_command(&command, ctx.export.tolerance) else {
                return;
            };
            ctx.loads.start(request);
            ctx.app_state.lock().loading = true;
        }
        AppAction::SetSceneEnabled(enabled) => {
            ctx.app_state.lock().scene_enabled = enabled;
            ctx.viewport_state.lock().set_scene_enabled(enabled);
            tracing::debug!(enabled, "Decorative scene toggled");
        }
        AppAction::ToggleSidebar => {
            ctx.app_state.lock().sidebar.toggle();
        }
        AppAction::ToggleMenu(menu) => {
            ctx.app_state.lock().sidebar.toggle_menu(menu);
        }
        AppAction::DismissToast(id) => {
            ctx.app_state.lock().notifications.dismiss(id);
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use std::sync::Arc;
    use std::sync::mpsc::channel;
    use std::time::Duration;

    use cp_core::{Command, CommandRegistry, KernelContext, LoadConfig, ResourceRegistry};
    use cp_renderer::{SceneConfig, ViewerOptions};
    use parking_lot::Mutex;

    use super::*;
    use crate::state::{AppState, SidebarMenu, ViewportState, create_shared_state};

    struct Fixture {
        app_state: SharedAppState,
        viewport_state: SharedViewportState,
        loads: LoadService,
        export: ExportConfig,
    }

    impl Fixture {
        fn new() -> Self {
            let registry = Arc::new(ResourceRegistry::new());
            let load = LoadConfig::default();
            Self {
                app_state: create_shared_state(AppState::new(
                    CommandRegistry::with_defaults(&load),
                    true,
                )),
                viewport_state: Arc::new(Mutex::new(ViewportState::new(
                    ViewerOptions::default(),
                    SceneConfig::default(),
                    registry.clone(),
                    None,
                ))),
                loads: LoadService::new(KernelContext::new(), registry, load),
                export: ExportConfig::default(),
            }
        }

        fn dispatch(&mut self, action: AppAction) {
            let mut ctx = ActionContext {
                app_state: &self.app_state,
                viewport_state: &self.viewport_state,
                loads: &mut self.loads,
                export: &self.export,
            };
            dispatch_action(action, &mut ctx);
        }
    }

    #[test]
    fn test_execute_runs_task() {
        let (sender, receiver) = channel();
        execute(move || async move {
            sender.send(42).unwrap();
        });
        assert_eq!(receiver.recv_timeout(Duration::from_secs(5)), Ok(42));
    }

    #[test]
    fn test_run_command_starts_load() {
        let mut fixture = Fixture::new();
        fixture.dispatch(AppAction::RunCommand(Command::LoadStep {
            path: "/model.step".into(),
            color: [1.0, 0.0, 0.0],
        }));
        assert!(fixture.app_state.lock().loading);
        assert!(fixture.loads.in_flight());
    }

    #[test]
    fn test_scene_toggle_reaches_viewport() {
        let mut fixture = Fixture::new();
        fixture.dispatch(AppAction::SetSceneEnabled(false));
        assert!(!fixture.app_state.lock().scene_enabled);
        assert!(!fixture.viewport_state.lock().scene_mounted());

        fixture.dispatch(AppAction::SetSceneEnabled(true));
        assert!(fixture.viewport_state.lock().scene_mounted());
    }

    #[test]
    fn test_sidebar_actions() {
        let mut fixture = Fixture::new();
        fixture.dispatch(AppAction::ToggleSidebar);
        fixture.dispatch(AppAction::ToggleMenu(SidebarMenu::Cae));
        let state = fixture.app_state.lock();
        assert!(state.sidebar.open);
        assert!(state.sidebar.cae_open);
    }

    #[test]
    fn test_dismiss_toast() {
        let mut fixture = Fixture::new();
        let id = fixture.app_state.lock().notifications.error("boom", 0.0);
        fixture.dispatch(AppAction::DismissToast(id));
        assert!(fixture.app_state.lock().notifications.is_empty());
    }
}
