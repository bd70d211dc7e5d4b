use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Destructive,
}

/// A transient user-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Toast {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Destructive,
        }
    }
}

/// Surface for transient messages
pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes toasts to stderr so they never mix with report output on stdout
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, toast: Toast) {
        let marker = match toast.severity {
            Severity::Info => "[ok]",
            Severity::Destructive => "[!!]",
        };
        eprintln!("{} {}: {}", marker, toast.title, toast.description);
    }
}

#[cfg(test)]
pub(crate) use recording::RecordingNotifier;
