//! Page shell shared by every view.

use maud::{html, Markup, DOCTYPE};

const APP_NAME: &str = "Favorite Archiver";

/// Wraps page content with the head, navigation and footer.
///
/// ```ignore
/// let page = BaseLayout::new("Review", Some("alice")).render(html! { h1 { "Hi" } });
/// ```
#[derive(Debug, Clone, Copy)]
pub struct BaseLayout<'a> {
    title: &'a str,
    /// Nickname under review, shown in the navigation.
    subject: Option<&'a str>,
}

impl<'a> BaseLayout<'a> {
    #[must_use]
    pub fn new(title: &'a str, subject: Option<&'a str>) -> Self {
        Self { title, subject }
    }

    #[must_use]
    pub fn render(self, content: Markup) -> Markup {
        html! {
            (DOCTYPE)
            html lang="en" {
                head {
                    meta charset="UTF-8";
                    meta name="viewport" content="width=device-width, initial-scale=1.0";
                    meta name="color-scheme" content="light dark";
                    meta name="robots" content="noindex";
                    title { (self.title) " - " (APP_NAME) }
                    link rel="stylesheet" href="/static/css/style.css";
                }
                body {
                    header class="container" {
                        nav {
                            ul {
                                li { a href="/" { strong class="site-logo" { (APP_NAME) } } }
                            }
                            ul {
                                @if let Some(subject) = self.subject {
                                    li { small { "reviewing " strong { (subject) } } }
                                }
                                li { a href="/exit" { "Quit" } }
                            }
                        }
                    }
                    main class="container" { (content) }
                    footer class="container" {
                        small { "Kept entries are saved after every decision." }
                    }
                }
            }
        }
    }
}
