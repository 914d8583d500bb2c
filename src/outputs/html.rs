//! HTML rendering of a [`NewsPage`].
//!
//! The page is a Handlebars template in strict mode. Article fields are
//! untrusted upstream text and only ever reach the template through `{{ }}`,
//! which HTML-escapes them. Links are only emitted for `http`/`https` URLs.

use crate::models::{NewsPage, NormalizedArticle};
use crate::utils::display_date;
use handlebars::{Handlebars, RenderError, TemplateError};
use serde::Serialize;
use tracing::debug;
use url::Url;

const PAGE_TEMPLATE: &str = "page";

/// Compiled page template, built once at startup and shared by handlers.
pub struct PageRenderer {
    registry: Handlebars<'static>,
}

impl PageRenderer {
    pub fn new() -> Result<Self, TemplateError> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_template_string(PAGE_TEMPLATE, include_str!("page.hbs"))?;
        debug!(template = PAGE_TEMPLATE, "Registered HTML template");
        Ok(Self { registry })
    }

    /// Render the complete HTML document for `page`.
    pub fn render_page(&self, page: &NewsPage) -> Result<String, RenderError> {
        self.registry.render(PAGE_TEMPLATE, &PageView::from(page))
    }
}

/// Template data. Every key is always present so strict mode never trips
/// over an absent optional field.
#[derive(Serialize)]
struct PageView {
    window_start: String,
    window_end: String,
    error: Option<String>,
    articles: Vec<ArticleView>,
}

#[derive(Serialize)]
struct ArticleView {
    title: String,
    link: Option<String>,
    meta: Option<String>,
    description: Option<String>,
}

impl From<&NewsPage> for PageView {
    fn from(page: &NewsPage) -> Self {
        Self {
            window_start: display_date(&page.window_start.to_rfc3339()),
            window_end: display_date(&page.window_end.to_rfc3339()),
            error: page.error.clone(),
            articles: page.articles.iter().map(ArticleView::from).collect(),
        }
    }
}

impl From<&NormalizedArticle> for ArticleView {
    fn from(article: &NormalizedArticle) -> Self {
        let meta: Vec<String> = [
            article.source.clone(),
            article.date.as_deref().map(display_date),
        ]
        .into_iter()
        .flatten()
        .collect();
        Self {
            title: article.title.clone().unwrap_or_else(|| "Untitled".to_string()),
            link: article.url.as_deref().and_then(safe_link),
            meta: (!meta.is_empty()).then(|| meta.join(" · ")),
            description: article.description.clone(),
        }
    }
}

/// The normalized URL if it is an absolute `http(s)` link.
fn safe_link(raw: &str) -> Option<String> {
    let url = Url::parse(raw).ok()?;
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}
