//! Operator notifications ("toasts").
//!
//! Editors and the feed report outcomes through a [`Notifier`] instead of
//! returning display text, so the same code drives the console, the dashboard
//! and the tests.

use chrono::{DateTime, Utc};
use log::{error, info};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ToastVariant {
    Default,
    Destructive,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Toast {
    pub title: String,
    pub variant: ToastVariant,
    pub description: Option<String>,
    pub at: DateTime<Utc>,
}

impl Toast {
    pub fn success() -> Self {
        Self {
            title: "Success".to_string(),
            variant: ToastVariant::Default,
            description: None,
            at: Utc::now(),
        }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Self {
            title: "Error".to_string(),
            variant: ToastVariant::Destructive,
            description: Some(description.into()),
            at: Utc::now(),
        }
    }

    pub fn is_destructive(&self) -> bool {
        self.variant == ToastVariant::Destructive
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, toast: Toast);
}

/// Writes every toast to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, toast: Toast) {
        let description = toast.description.as_deref().unwrap_or("");
        match toast.variant {
            ToastVariant::Destructive => error!("{}: {}", toast.title, description),
            ToastVariant::Default => info!("{} {}", toast.title, description),
        }
    }
}
