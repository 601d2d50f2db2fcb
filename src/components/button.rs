//! Buttons for the review UI.
//!
//! Every form in the UI posts a single `action` field, so a button is either
//! an action submitting `action=<value>` with its form, or a link.

use maud::{html, Markup, Render};

/// Name of the form field action buttons submit.
pub const ACTION_FIELD: &str = "action";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonVariant {
    Primary,
    Outline,
    Danger,
    Secondary,
}

impl ButtonVariant {
    #[must_use]
    pub fn class(&self) -> &'static str {
        match self {
            Self::Primary => "btn btn-primary",
            Self::Outline => "btn outline",
            Self::Danger => "btn btn-danger",
            Self::Secondary => "btn btn-secondary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target<'a> {
    /// Submits `action=<value>` with the enclosing form.
    Action(&'a str),
    /// Navigates to `href`; `download` suggests a filename.
    Link {
        href: &'a str,
        download: Option<&'a str>,
    },
}

#[derive(Debug, Clone)]
pub struct Button<'a> {
    label: &'a str,
    variant: ButtonVariant,
    target: Target<'a>,
}

impl<'a> Button<'a> {
    /// A submit button posting `action=<action>`.
    #[must_use]
    pub fn action(label: &'a str, action: &'a str, variant: ButtonVariant) -> Self {
        Self {
            label,
            variant,
            target: Target::Action(action),
        }
    }

    /// A link styled as a button.
    #[must_use]
    pub fn link(label: &'a str, href: &'a str, variant: ButtonVariant) -> Self {
        Self {
            label,
            variant,
            target: Target::Link {
                href,
                download: None,
            },
        }
    }

    /// Suggest `filename` when the link is saved. No effect on action buttons.
    #[must_use]
    pub fn download(mut self, filename: &'a str) -> Self {
        if let Target::Link { download, .. } = &mut self.target {
            *download = Some(filename);
        }
        self
    }
}

impl Render for Button<'_> {
    fn render(&self) -> Markup {
        let class = self.variant.class();
        match &self.target {
            Target::Action(value) => html! {
                button class=(class) type="submit" name=(ACTION_FIELD) value=(value) {
                    (self.label)
                }
            },
            Target::Link { href, download } => html! {
                a class=(class) href=(href) download=[*download] role="button" {
                    (self.label)
                }
            },
        }
    }
}
