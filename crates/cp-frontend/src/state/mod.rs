//! Application state module

mod notifications;
mod sidebar;
mod viewport;

pub use notifications::{Notifications, TOAST_DURATION, Toast, ToastKind};
pub use sidebar::{SidebarMenu, SidebarState};
pub use viewport::{RenderTarget, SharedViewportState, ViewportState, ViewportTextures};

use std::sync::Arc;

use cp_core::{Command, CommandRegistry, PromptState};
use parking_lot::Mutex;

/// Actions that can be performed on the app state
#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    /// Run a command recognized by the prompt
    RunCommand(Command),
    /// Mount or unmount the decorative scene
    SetSceneEnabled(bool),
    /// Open or close the sidebar
    ToggleSidebar,
    /// Open or close a sidebar menu window
    ToggleMenu(SidebarMenu),
    /// Close a toast
    DismissToast(u64),
}

/// Application state
#[derive(Debug, Default)]
pub struct AppState {
    /// Prompt box content
    pub prompt: PromptState,
    /// Phrases the prompt understands
    pub commands: CommandRegistry,
    /// Sidebar flags
    pub sidebar: SidebarState,
    /// Visible toasts
    pub notifications: Notifications,
    /// Whether the decorative scene should be mounted
    pub scene_enabled: bool,
    /// A load is in flight
    pub loading: bool,
    /// Pending actions
    pending_actions: Vec<AppAction>,
}

impl AppState {
    /// Create a new app state
    pub fn new(commands: CommandRegistry, scene_enabled: bool) -> Self {
        Self {
            commands,
            scene_enabled,
            ..Default::default()
        }
    }

    /// Queue an action
    pub fn queue_action(&mut self, action: AppAction) {
        self.pending_actions.push(action);
    }

    /// Take pending actions
    pub fn take_pending_actions(&mut self) -> Vec<AppAction> {
        std::mem::take(&mut self.pending_actions)
    }

    /// Submit the prompt text, queueing the command it names.
    ///
    /// The text is cleared whether or not it was recognized.
    pub fn submit_prompt(&mut self) -> bool {
        match self.prompt.submit(&self.commands) {
            Some(command) => {
                self.queue_action(AppAction::RunCommand(command));
                true
            }
            None => false,
        }
    }
}

/// Shared application state
pub type SharedAppState = Arc<Mutex<AppState>>;

/// Create a new shared app state
pub fn create_shared_state(state: AppState) -> SharedAppState {
    Arc::new(Mutex::new(state))
}
