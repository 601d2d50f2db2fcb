//! Notices shown above page content: a short headline and a detail line.

use maud::{html, Markup, Render};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertVariant {
    Success,
    Error,
    Warning,
    Info,
}

impl AlertVariant {
    #[must_use]
    pub const fn class(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// Errors interrupt screen readers; everything else waits its turn.
    const fn live(self) -> &'static str {
        match self {
            Self::Error => "assertive",
            _ => "polite",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Alert<'a> {
    variant: AlertVariant,
    headline: &'a str,
    detail: &'a str,
}

impl<'a> Alert<'a> {
    #[must_use]
    pub const fn new(variant: AlertVariant, headline: &'a str, detail: &'a str) -> Self {
        Self {
            variant,
            headline,
            detail,
        }
    }

    #[must_use]
    pub const fn success(headline: &'a str, detail: &'a str) -> Self {
        Self::new(AlertVariant::Success, headline, detail)
    }

    /// `detail` is usually an error's display text.
    #[must_use]
    pub const fn error(headline: &'a str, detail: &'a str) -> Self {
        Self::new(AlertVariant::Error, headline, detail)
    }

    #[must_use]
    pub const fn warning(headline: &'a str, detail: &'a str) -> Self {
        Self::new(AlertVariant::Warning, headline, detail)
    }

    #[must_use]
    pub const fn info(headline: &'a str, detail: &'a str) -> Self {
        Self::new(AlertVariant::Info, headline, detail)
    }
}

impl Render for Alert<'_> {
    fn render(&self) -> Markup {
        html! {
            article class=(self.variant.class()) role="alert" aria-live=(self.variant.live()) {
                strong { (self.headline) }
                @if !self.detail.is_empty() {
                    p { (self.detail) }
                }
            }
        }
    }
}
