use maud::{html, Markup};

use super::attachment_name;
use crate::components::{Alert, BaseLayout, Button, ButtonVariant};
use crate::entry::Entry;

/// Nickname form. `error` is shown above it when starting a session failed.
#[must_use]
pub fn render_index(error: Option<&str>) -> Markup {
    let content = html! {
        h1 { "Archive your favorites" }
        p { "Enter a nickname to review its favorited entries one by one. Kept entries are collected into a Word document." }
        @if let Some(message) = error {
            (Alert::error("Could not start.", message))
        }
        form method="post" action="/" {
            label for="nick" { "Nickname" }
            input type="text" id="nick" name="nick" required autofocus placeholder="nickname";
            button class=(ButtonVariant::Primary.class()) type="submit" { "Start" }
        }
    };
    BaseLayout::new("Start", None).render(content)
}

/// The focused entry with its keep / discard / finish actions.
#[must_use]
pub fn render_entry(subject: &str, entry: &Entry, kept: usize, error: Option<&str>) -> Markup {
    let content = html! {
        @if let Some(message) = error {
            (Alert::error("Not saved.", message))
        }
        article class="entry" {
            header {
                h2 { (entry.title) }
                small { "favorited " (entry.favorite_count) " times" }
            }
            div class="entry-content" {
                @for line in entry.content.lines() {
                    (line) br;
                }
            }
            @if !entry.image_urls.is_empty() {
                ul class="entry-images" {
                    @for image in &entry.image_urls {
                        li { a href=(image) target="_blank" rel="noopener noreferrer" { (image) } }
                    }
                }
            }
            footer {
                strong class="entry-author" { (entry.author) }
                " · "
                a href=(entry.url) target="_blank" rel="noopener noreferrer" { (entry.date) }
            }
        }
        (action_form(kept))
    };
    BaseLayout::new(&entry.title, Some(subject)).render(content)
}

/// Shown once the listing has ended and every entry was decided.
#[must_use]
pub fn render_exhausted(subject: &str, kept: usize) -> Markup {
    let content = html! {
        (Alert::info("All done.", "There are no more favorited entries."))
        p { (kept) " entries kept so far." }
        form method="post" action="/entry" {
            (Button::action("Finish and download", "finish", ButtonVariant::Primary))
        }
    };
    BaseLayout::new("No more entries", Some(subject)).render(content)
}

/// Shown when nothing is buffered because fetching the next page failed.
#[must_use]
pub fn render_stalled(subject: &str, kept: usize, error: Option<&str>) -> Markup {
    let message = error.unwrap_or("Fetching more entries failed.");
    let content = html! {
        (Alert::warning("Waiting for entries.", message))
        p { (kept) " entries kept so far." }
        form method="post" action="/entry" {
            div role="group" {
                (Button::action("Try again", "retry", ButtonVariant::Primary))
                (Button::action("Finish", "finish", ButtonVariant::Secondary))
            }
        }
    };
    BaseLayout::new("Fetch failed", Some(subject)).render(content)
}

/// Finish failed; the session is still reviewing.
#[must_use]
pub fn render_finish_failed(subject: &str, error: &str) -> Markup {
    let content = html! {
        (Alert::error("Saving the document failed.", error))
        form method="post" action="/entry" {
            (Button::action("Try again", "finish", ButtonVariant::Primary))
        }
    };
    BaseLayout::new("Save failed", Some(subject)).render(content)
}

/// The document is saved; offers the downloads and a way to quit.
#[must_use]
pub fn render_finished(subject: &str, kept: usize) -> Markup {
    let name = attachment_name(subject);
    let docx_name = format!("{name}.docx");
    let json_name = format!("{name}.json");
    let content = html! {
        (Alert::success("Finished.", "Your archive document is ready."))
        p { (kept) " entries archived for " strong { (subject) } "." }
        div role="group" {
            (Button::link("Download", "/download", ButtonVariant::Primary).download(&docx_name))
            (Button::link("Download JSON", "/download?format=json", ButtonVariant::Outline)
                .download(&json_name))
            (Button::link("Quit", "/exit", ButtonVariant::Secondary))
        }
    };
    BaseLayout::new("Finished", Some(subject)).render(content)
}

#[must_use]
pub fn render_goodbye() -> Markup {
    let content = html! {
        h1 { "Goodbye" }
        p { "The archiver has shut down. You can close this tab." }
    };
    BaseLayout::new("Goodbye", None).render(content)
}

fn action_form(kept: usize) -> Markup {
    html! {
        form method="post" action="/entry" {
            div role="group" {
                (Button::action("Keep", "keep", ButtonVariant::Primary))
                (Button::action("Discard", "discard", ButtonVariant::Outline))
                (Button::action("Finish", "finish", ButtonVariant::Danger))
            }
        }
        small { (kept) " kept" }
    }
}
