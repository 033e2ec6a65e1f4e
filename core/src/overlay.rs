//! Overlay option transformation.
//!
//! Operations can request four kinds of UI feedback surfaces: a confirm
//! dialog before the attempt, a loading indicator while it is in flight, and
//! a success or error toast after settlement. Callers describe each overlay
//! loosely — a bare string, a full spec, a flag, or a function of the action
//! payload — and the variants here normalize every shape into a canonical
//! display payload, or `None` for "no overlay". Rendering is external; the
//! core only computes what to show.

use crate::error::OperationError;
use std::fmt;
use std::sync::Arc;

/// Canonical confirm-dialog payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmSpec {
    /// Presentation style hint, interpreted by the overlay implementation.
    pub style: u8,
    /// Dialog title.
    pub title: String,
    /// Dialog body.
    pub content: String,
    /// Whether the dialog must collect a typed confirmation from the user.
    pub require_input_content: bool,
}

impl Default for ConfirmSpec {
    fn default() -> Self {
        Self {
            style: 1,
            title: String::new(),
            content: String::new(),
            require_input_content: false,
        }
    }
}

/// Canonical loading-indicator payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadingSpec {
    /// Presentation style hint.
    pub style: u8,
    /// Indicator text.
    pub text: String,
}

impl Default for LoadingSpec {
    fn default() -> Self {
        Self {
            style: 1,
            text: String::new(),
        }
    }
}

/// Canonical success/error toast payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackSpec {
    /// Presentation style hint.
    pub style: u8,
    /// Toast title.
    pub title: String,
    /// Toast body.
    pub content: String,
}

impl Default for FeedbackSpec {
    fn default() -> Self {
        Self {
            style: 1,
            title: String::new(),
            content: String::new(),
        }
    }
}

/// A string-or-spec value produced by a compute variant.
#[derive(Debug, Clone)]
pub enum OverlayValue<S> {
    /// Fills the title/text field over defaults.
    Title(String),
    /// Merged over defaults as-is.
    Spec(S),
}

impl<S> From<&str> for OverlayValue<S> {
    fn from(title: &str) -> Self {
        Self::Title(title.to_owned())
    }
}

impl<S> From<String> for OverlayValue<S> {
    fn from(title: String) -> Self {
        Self::Title(title)
    }
}

fn confirm_from(value: OverlayValue<ConfirmSpec>) -> ConfirmSpec {
    match value {
        OverlayValue::Title(title) => ConfirmSpec {
            title,
            ..ConfirmSpec::default()
        },
        OverlayValue::Spec(spec) => spec,
    }
}

fn feedback_from(value: OverlayValue<FeedbackSpec>) -> FeedbackSpec {
    match value {
        OverlayValue::Title(title) => FeedbackSpec {
            title,
            ..FeedbackSpec::default()
        },
        OverlayValue::Spec(spec) => spec,
    }
}

/// Confirm-dialog option: shown before the attempt starts; declining cancels
/// the action silently.
pub enum ConfirmOverlay<P = ()> {
    /// A bare title over the default spec.
    Title(String),
    /// A full spec.
    Spec(ConfirmSpec),
    /// Computed from the action payload.
    Compute(Arc<dyn Fn(Option<&P>) -> OverlayValue<ConfirmSpec> + Send + Sync>),
}

impl<P> ConfirmOverlay<P> {
    /// Computed confirm option.
    pub fn compute(
        f: impl Fn(Option<&P>) -> OverlayValue<ConfirmSpec> + Send + Sync + 'static,
    ) -> Self {
        Self::Compute(Arc::new(f))
    }

    /// Normalize into the canonical payload.
    #[must_use]
    pub fn resolve(&self, payload: Option<&P>) -> ConfirmSpec {
        match self {
            Self::Title(title) => ConfirmSpec {
                title: title.clone(),
                ..ConfirmSpec::default()
            },
            Self::Spec(spec) => spec.clone(),
            Self::Compute(f) => confirm_from(f(payload)),
        }
    }
}

/// Loading-indicator option.
pub enum LoadingOverlay<P = ()> {
    /// `true` requests the default indicator, `false` requests none.
    Enabled(bool),
    /// Indicator text over the default spec.
    Text(String),
    /// A full spec.
    Spec(LoadingSpec),
    /// Computed from the action payload.
    Compute(Arc<dyn Fn(Option<&P>) -> OverlayValue<LoadingSpec> + Send + Sync>),
}

impl<P> LoadingOverlay<P> {
    /// Computed loading option.
    pub fn compute(
        f: impl Fn(Option<&P>) -> OverlayValue<LoadingSpec> + Send + Sync + 'static,
    ) -> Self {
        Self::Compute(Arc::new(f))
    }

    /// Normalize into the canonical payload, or `None` when disabled.
    #[must_use]
    pub fn resolve(&self, payload: Option<&P>) -> Option<LoadingSpec> {
        match self {
            Self::Enabled(false) => None,
            Self::Enabled(true) => Some(LoadingSpec::default()),
            Self::Text(text) => Some(LoadingSpec {
                text: text.clone(),
                ..LoadingSpec::default()
            }),
            Self::Spec(spec) => Some(spec.clone()),
            Self::Compute(f) => Some(match f(payload) {
                OverlayValue::Title(text) => LoadingSpec {
                    text,
                    ..LoadingSpec::default()
                },
                OverlayValue::Spec(spec) => spec,
            }),
        }
    }
}

/// Success-toast option; the compute variant also receives the settled data.
pub enum SuccessOverlay<T, P = ()> {
    /// A bare title over the default spec.
    Title(String),
    /// A full spec.
    Spec(FeedbackSpec),
    /// Computed from the action payload and the settled data.
    Compute(Arc<dyn Fn(Option<&P>, Option<&T>) -> OverlayValue<FeedbackSpec> + Send + Sync>),
}

impl<T, P> SuccessOverlay<T, P> {
    /// Computed success option.
    pub fn compute(
        f: impl Fn(Option<&P>, Option<&T>) -> OverlayValue<FeedbackSpec> + Send + Sync + 'static,
    ) -> Self {
        Self::Compute(Arc::new(f))
    }

    /// Normalize into the canonical payload.
    #[must_use]
    pub fn resolve(&self, payload: Option<&P>, data: Option<&T>) -> FeedbackSpec {
        match self {
            Self::Title(title) => FeedbackSpec {
                title: title.clone(),
                ..FeedbackSpec::default()
            },
            Self::Spec(spec) => spec.clone(),
            Self::Compute(f) => feedback_from(f(payload, data)),
        }
    }
}

/// Error-toast option; the compute variant also receives the settled error.
pub enum ErrorOverlay<P = ()> {
    /// A bare title over the default spec.
    Title(String),
    /// A full spec.
    Spec(FeedbackSpec),
    /// Computed from the action payload and the settled error.
    Compute(
        Arc<dyn Fn(Option<&P>, Option<&OperationError>) -> OverlayValue<FeedbackSpec> + Send + Sync>,
    ),
}

impl<P> ErrorOverlay<P> {
    /// Computed error option.
    pub fn compute(
        f: impl Fn(Option<&P>, Option<&OperationError>) -> OverlayValue<FeedbackSpec>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self::Compute(Arc::new(f))
    }

    /// Normalize into the canonical payload.
    #[must_use]
    pub fn resolve(&self, payload: Option<&P>, error: Option<&OperationError>) -> FeedbackSpec {
        match self {
            Self::Title(title) => FeedbackSpec {
                title: title.clone(),
                ..FeedbackSpec::default()
            },
            Self::Spec(spec) => spec.clone(),
            Self::Compute(f) => feedback_from(f(payload, error)),
        }
    }
}

macro_rules! overlay_clone_debug {
    ($name:ident < $($generic:ident),+ >, $label:literal) => {
        impl<$($generic),+> Clone for $name<$($generic),+> {
            fn clone(&self) -> Self {
                match self {
                    Self::Title(title) => Self::Title(title.clone()),
                    Self::Spec(spec) => Self::Spec(spec.clone()),
                    Self::Compute(f) => Self::Compute(Arc::clone(f)),
                }
            }
        }

        impl<$($generic),+> fmt::Debug for $name<$($generic),+> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    Self::Title(title) => f.debug_tuple("Title").field(title).finish(),
                    Self::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
                    Self::Compute(_) => f.write_str(concat!($label, "::Compute(..)")),
                }
            }
        }
    };
}

overlay_clone_debug!(ConfirmOverlay<P>, "ConfirmOverlay");
overlay_clone_debug!(SuccessOverlay<T, P>, "SuccessOverlay");
overlay_clone_debug!(ErrorOverlay<P>, "ErrorOverlay");

impl<P> Clone for LoadingOverlay<P> {
    fn clone(&self) -> Self {
        match self {
            Self::Enabled(enabled) => Self::Enabled(*enabled),
            Self::Text(text) => Self::Text(text.clone()),
            Self::Spec(spec) => Self::Spec(spec.clone()),
            Self::Compute(f) => Self::Compute(Arc::clone(f)),
        }
    }
}

impl<P> fmt::Debug for LoadingOverlay<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Enabled(enabled) => f.debug_tuple("Enabled").field(enabled).finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Spec(spec) => f.debug_tuple("Spec").field(spec).finish(),
            Self::Compute(_) => f.write_str("LoadingOverlay::Compute(..)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_fills_title_over_defaults() {
        let spec = ConfirmOverlay::<()>::Title("Delete?".into()).resolve(None);
        assert_eq!(spec.title, "Delete?");
        assert_eq!(spec.style, 1);
        assert_eq!(spec.content, "");
        assert!(!spec.require_input_content);
    }

    #[test]
    fn spec_input_is_kept() {
        let spec = ConfirmOverlay::<()>::Spec(ConfirmSpec {
            style: 2,
            title: "t".into(),
            content: "c".into(),
            require_input_content: true,
        })
        .resolve(None);
        assert_eq!(spec.style, 2);
        assert!(spec.require_input_content);
    }

    #[test]
    fn loading_bool_variants() {
        assert_eq!(LoadingOverlay::<()>::Enabled(false).resolve(None), None);
        assert_eq!(
            LoadingOverlay::<()>::Enabled(true).resolve(None),
            Some(LoadingSpec::default())
        );
        assert_eq!(
            LoadingOverlay::<()>::Text("wait".into())
                .resolve(None)
                .map(|s| s.text),
            Some("wait".to_owned())
        );
    }

    #[test]
    fn success_compute_sees_payload_and_data() {
        let overlay = SuccessOverlay::<u32, String>::compute(|payload, data| {
            OverlayValue::Title(format!(
                "{}:{}",
                payload.map(String::as_str).unwrap_or("-"),
                data.copied().unwrap_or(0)
            ))
        });
        let spec = overlay.resolve(Some(&"save".to_owned()), Some(&9));
        assert_eq!(spec.title, "save:9");
    }

    #[test]
    fn error_compute_sees_error() {
        let overlay = ErrorOverlay::<()>::compute(|_, error| {
            OverlayValue::Title(error.map(ToString::to_string).unwrap_or_default())
        });
        let err = OperationError::Handler("boom".into());
        assert_eq!(overlay.resolve(None, Some(&err)).title, "response rejected: boom");
    }
}
