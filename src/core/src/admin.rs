//! Editors for the backend's services and rules.
//!
//! Each editor validates its form locally, sends one or two write requests and
//! reports the outcome through the [`Notifier`](crate::notification::Notifier).
//! A failed request leaves the form untouched so it can be corrected and
//! resubmitted.

pub mod catalog;
pub mod rule_editor;
pub mod service_editor;

pub use catalog::Catalog;
pub use rule_editor::{RuleEditor, RuleForm};
pub use service_editor::{RuleWithChecked, ServiceEditor, ServiceForm};
