//! Toast and navigation surfaces.
//!
//! The trackers emit user-visible signals through these traits and never talk
//! to a rendering layer directly. Both are fire-and-forget: no return value
//! is consumed by the core.

/// Visual intent of a toast.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ToastVariant {
    Info,
    Success,
    Destructive,
}

/// A clickable affordance attached to a toast (e.g. "View").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastAction {
    pub label: String,
    pub path: String,
}

/// A user-visible toast/alert.
#[derive(Debug, Clone, PartialEq)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub variant: ToastVariant,
    pub action: Option<ToastAction>,
}

impl Toast {
    pub fn new(title: impl Into<String>, description: impl Into<String>, variant: ToastVariant) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant,
            action: None,
        }
    }

    pub fn with_action(mut self, label: impl Into<String>, path: impl Into<String>) -> Self {
        self.action = Some(ToastAction {
            label: label.into(),
            path: path.into(),
        });
        self
    }
}

/// Sink for user-visible toasts.
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Navigation surface, invoked when the user follows a toast affordance.
pub trait Navigator: Send + Sync {
    fn navigate_to(&self, path: &str);
}

/// Send a toast action's target to the navigator.
pub fn follow_action(navigator: &dyn Navigator, action: &ToastAction) {
    navigator.navigate_to(&action.path);
}

/// Notifier that logs toasts through `tracing` (headless environments,
/// tests, and the demo shell).
#[derive(Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, toast: Toast) {
        match toast.variant {
            ToastVariant::Destructive => {
                tracing::warn!(title = %toast.title, description = %toast.description, "toast")
            }
            _ => tracing::info!(title = %toast.title, description = %toast.description, "toast"),
        }
    }
}

/// Navigator that logs the target path.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate_to(&self, path: &str) {
        tracing::info!(path, "navigate");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNavigator {
        paths: Mutex<Vec<String>>,
    }

    impl Navigator for RecordingNavigator {
        fn navigate_to(&self, path: &str) {
            self.paths.lock().unwrap().push(path.to_string());
        }
    }

    #[test]
    fn follow_action_routes_the_path() {
        let nav = RecordingNavigator::default();
        let toast = Toast::new("Campaign created", "Ready to review", ToastVariant::Success)
            .with_action("View", "/campaigns/3");

        follow_action(&nav, toast.action.as_ref().unwrap());
        assert_eq!(nav.paths.lock().unwrap().as_slice(), ["/campaigns/3"]);
    }
}
