//! Toast notifications

/// How long a toast stays on screen, in seconds
pub const TOAST_DURATION: f64 = 6.0;

/// Toast severity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

/// A transient message
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub id: u64,
    pub kind: ToastKind,
    pub message: String,
    /// Time it was shown, in seconds of app time
    pub created_at: f64,
}

/// Queue of visible toasts, oldest first
#[derive(Debug, Default)]
pub struct Notifications {
    toasts: Vec<Toast>,
    next_id: u64,
}

impl Notifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show a message. Returns its id.
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>, now: f64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.toasts.push(Toast {
            id,
            kind,
            message: message.into(),
            created_at: now,
        });
        id
    }

    pub fn info(&mut self, message: impl Into<String>, now: f64) -> u64 {
        self.push(ToastKind::Info, message, now)
    }

    pub fn success(&mut self, message: impl Into<String>, now: f64) -> u64 {
        self.push(ToastKind::Success, message, now)
    }

    pub fn error(&mut self, message: impl Into<String>, now: f64) -> u64 {
        self.push(ToastKind::Error, message, now)
    }

    /// Remove a toast
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.id != id);
        self.toasts.len() != before
    }

    /// Drop toasts older than `ttl` seconds
    pub fn expire(&mut self, now: f64, ttl: f64) {
        self.toasts.retain(|toast| now - toast.created_at < ttl);
    }

    /// Visible toasts, oldest first
    pub fn toasts(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
