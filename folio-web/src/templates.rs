//! Page templates
//!
//! Server-rendered pages using Askama. Every page extends `base.html`.

use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use chrono::NaiveDate;
use folio_core::{ContentEntry, ContentPage, SessionConfig};
use tracing::error;

/// One page of the post listing, shared by the home and blog pages
pub struct Listing<'a> {
    pub entries: Vec<&'a ContentEntry>,
    pub page: usize,
    pub total_pages: usize,
    pub prev: Option<usize>,
    pub next: Option<usize>,
}

impl<'a> From<ContentPage<'a>> for Listing<'a> {
    fn from(page: ContentPage<'a>) -> Self {
        let prev = (page.page > 1).then(|| page.page - 1);
        let next = (page.page < page.total_pages)
            .then(|| page.page.checked_add(1))
            .flatten();
        Self {
            entries: page.entries,
            page: page.page,
            total_pages: page.total_pages,
            prev,
            next,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate<'a> {
    pub title: String,
    pub listing: Listing<'a>,
}

#[derive(Template)]
#[template(path = "blog.html")]
pub struct BlogTemplate<'a> {
    pub title: String,
    pub listing: Listing<'a>,
}

/// Single post page
#[derive(Template)]
#[template(path = "post.html")]
pub struct PostTemplate<'a> {
    pub title: &'a str,
    pub date: NaiveDate,
    pub tags: &'a [String],
}

#[derive(Template)]
#[template(path = "admin.html")]
pub struct AdminTemplate {
    pub title: String,
}

#[derive(Template)]
#[template(path = "settings.html")]
pub struct SettingsTemplate {
    pub title: String,
}

/// Logged-out interstitial with a meta refresh back home
#[derive(Template)]
#[template(path = "waiting.html")]
pub struct WaitingTemplate<'a> {
    pub title: String,
    pub home_path: &'a str,
    pub redirect_secs: u32,
}

#[derive(Template)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate {
    pub title: String,
}

impl<'a> HomeTemplate<'a> {
    pub fn new(page: ContentPage<'a>) -> Self {
        Self {
            title: "Folio".to_string(),
            listing: page.into(),
        }
    }
}

impl<'a> BlogTemplate<'a> {
    pub fn new(page: ContentPage<'a>) -> Self {
        Self {
            title: "Blog".to_string(),
            listing: page.into(),
        }
    }
}

impl<'a> From<&'a ContentEntry> for PostTemplate<'a> {
    fn from(entry: &'a ContentEntry) -> Self {
        Self {
            title: &entry.title,
            date: entry.date,
            tags: &entry.tags,
        }
    }
}

impl Default for AdminTemplate {
    fn default() -> Self {
        Self {
            title: "Admin".to_string(),
        }
    }
}

impl Default for SettingsTemplate {
    fn default() -> Self {
        Self {
            title: "Settings".to_string(),
        }
    }
}

impl<'a> WaitingTemplate<'a> {
    pub fn new(session: &'a SessionConfig) -> Self {
        Self {
            title: "Logged out".to_string(),
            home_path: &session.home_path,
            redirect_secs: session.logout_redirect_secs,
        }
    }
}

impl Default for NotFoundTemplate {
    fn default() -> Self {
        Self {
            title: "Not found".to_string(),
        }
    }
}

/// Render a template into an HTML response
pub fn render_page<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("Template rendering failed: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_title_is_escaped() {
        let entry = ContentEntry {
            slug: "x".to_string(),
            title: "<script>alert(1)</script> & more".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            tags: vec!["<b>".to_string()],
            draft: false,
            need_access: false,
        };

        let html = PostTemplate::from(&entry).render().unwrap();
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt; &amp; more"));
        assert!(html.contains("<li>&lt;b&gt;</li>"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_listing_navigation() {
        let first = Listing::from(ContentPage {
            page: 1,
            total_pages: 3,
            entries: vec![],
        });
        assert_eq!(first.prev, None);
        assert_eq!(first.next, Some(2));

        let past_end = Listing::from(ContentPage {
            page: usize::MAX,
            total_pages: 3,
            entries: vec![],
        });
        assert_eq!(past_end.prev, Some(usize::MAX - 1));
        assert_eq!(past_end.next, None);
    }

    #[test]
    fn test_listing_marks_locked_posts() {
        let locked = ContentEntry {
            slug: "secret".to_string(),
            title: "Secret".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            tags: vec![],
            draft: false,
            need_access: true,
        };
        let html = BlogTemplate::new(ContentPage {
            page: 1,
            total_pages: 1,
            entries: vec![&locked],
        })
        .render()
        .unwrap();

        assert!(html.contains("<h1>Blog</h1>"));
        assert!(html.contains("<span class=\"lock\">locked</span>"));
        assert!(html.contains("Page 1 of 1"));
    }
}
