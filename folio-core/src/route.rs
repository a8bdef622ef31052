//! Request path classification for the route gate

use crate::access::AccessRequirement;
use crate::content::ContentIndex;
use std::borrow::Cow;

/// Path prefixes the route gate is mounted on
pub const GATED_PREFIXES: &[&str] = &["/blog", "/admin", "/settings"];

/// What kind of resource a request path addresses
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathClass {
    /// A blog post; carries the post's access requirement
    BlogPost {
        slug: String,
        requirement: AccessRequirement,
    },
    /// Anything under `/admin`
    Admin,
    /// Private settings pages
    OtherProtected,
    Unprotected,
}

impl PathClass {
    pub fn requirement(&self) -> AccessRequirement {
        match self {
            PathClass::BlogPost { requirement, .. } => *requirement,
            PathClass::Admin | PathClass::OtherProtected => AccessRequirement::Restricted,
            PathClass::Unprotected => AccessRequirement::Open,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.requirement().is_restricted()
    }

    pub fn label(&self) -> &'static str {
        match self {
            PathClass::BlogPost { .. } => "blog",
            PathClass::Admin => "admin",
            PathClass::OtherProtected => "other",
            PathClass::Unprotected => "unprotected",
        }
    }
}

/// Strip surrounding slashes from a slug that has already been decoded once,
/// such as an axum path parameter. Never decodes again.
pub fn trim_slug(decoded: &str) -> &str {
    decoded.trim_matches('/')
}

/// Normalize a raw request-path slug the way the router will see it:
/// percent-decoded exactly once, no surrounding slashes.
pub fn normalize_slug(raw: &str) -> Cow<'_, str> {
    let trimmed = trim_slug(raw);
    match urlencoding::decode(trimmed) {
        Ok(Cow::Borrowed(_)) => Cow::Borrowed(trimmed),
        Ok(Cow::Owned(decoded)) => Cow::Owned(trim_slug(&decoded).to_string()),
        // Invalid UTF-8 after decoding, keep the raw form; it will not match any slug
        Err(_) => Cow::Borrowed(trimmed),
    }
}

fn is_listing_slug(slug: &str) -> bool {
    slug.is_empty() || slug == "page" || slug.starts_with("page/")
}

fn under(path: &str, prefix: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Classify a request path.
///
/// Blog list and pagination paths are never resources. Unknown slugs are left
/// unprotected so they fall through to the ordinary not-found page.
pub fn classify_path(path: &str, index: &ContentIndex) -> PathClass {
    if let Some(rest) = path.strip_prefix("/blog/") {
        let slug = normalize_slug(rest);
        if is_listing_slug(&slug) {
            return PathClass::Unprotected;
        }
        return match index.requirement(&slug) {
            Some(requirement) => PathClass::BlogPost {
                slug: slug.into_owned(),
                requirement,
            },
            None => PathClass::Unprotected,
        };
    }

    if under(path, "/admin") {
        return PathClass::Admin;
    }

    if under(path, "/settings") && !under(path, "/settings/public") {
        return PathClass::OtherProtected;
    }

    PathClass::Unprotected
}
