//! Content access wrapper
//!
//! Chooses what a presentational component renders for a piece of content
//! given its access requirement and the caller's capability. The allow/deny
//! rule itself lives in [`folio_core::access`]; this module only layers the
//! display strategies on top of it.

use crate::context::SessionContext;
use folio_core::{allow, AccessRequirement, Capability};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// How denied content is presented
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Full blocking placeholder, used by detail views
    #[default]
    Page,
    /// Content visible underneath with a lock overlay, drawn by the caller
    Hover,
    None,
}

impl FromStr for DisplayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "page" => Ok(DisplayMode::Page),
            "hover" => Ok(DisplayMode::Hover),
            "none" => Ok(DisplayMode::None),
            other => Err(format!("Unknown display mode: {}", other)),
        }
    }
}

/// Standard restricted-access placeholder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestrictedPlaceholder {
    pub icon: &'static str,
    pub title: &'static str,
    pub message: &'static str,
    pub contact_hint: &'static str,
}

impl Default for RestrictedPlaceholder {
    fn default() -> Self {
        Self {
            icon: "lock",
            title: "Restricted content",
            message: "You need special access permissions to view this content.",
            contact_hint: "Please contact the administrator for access.",
        }
    }
}

/// Outcome of an access decision. `T` is whatever the lock renderer returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderChoice<T> {
    /// Render the content normally
    Content,
    /// Use the value returned by the caller's lock renderer
    Delegated(T),
    Nothing,
    Placeholder(RestrictedPlaceholder),
}

impl<T> RenderChoice<T> {
    pub fn shows_content(&self) -> bool {
        matches!(self, RenderChoice::Content)
    }
}

/// Decide what to render.
///
/// `render_lock` is only consulted in hover mode and is called with `true`
/// (locked). Hover mode without a lock renderer degrades to the placeholder.
pub fn decide<T, F>(
    requirement: AccessRequirement,
    capability: Capability,
    mode: DisplayMode,
    render_lock: Option<F>,
) -> RenderChoice<T>
where
    F: FnOnce(bool) -> T,
{
    if allow(requirement, capability) {
        return RenderChoice::Content;
    }

    match (mode, render_lock) {
        (DisplayMode::Hover, Some(render_lock)) => RenderChoice::Delegated(render_lock(true)),
        (DisplayMode::None, _) => RenderChoice::Nothing,
        _ => RenderChoice::Placeholder(RestrictedPlaceholder::default()),
    }
}

/// Per-resource wrapper around [`decide`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentAccess {
    requirement: AccessRequirement,
    mode: DisplayMode,
}

impl ContentAccess {
    pub fn new(requirement: impl Into<AccessRequirement>) -> Self {
        Self {
            requirement: requirement.into(),
            mode: DisplayMode::default(),
        }
    }

    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn requirement(&self) -> AccessRequirement {
        self.requirement
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    pub fn decide(&self, capability: Capability) -> RenderChoice<()> {
        decide::<(), fn(bool)>(self.requirement, capability, self.mode, None)
    }

    pub fn decide_with_lock<T, F>(&self, capability: Capability, render_lock: F) -> RenderChoice<T>
    where
        F: FnOnce(bool) -> T,
    {
        decide(self.requirement, capability, self.mode, Some(render_lock))
    }

    /// Decide using the session's current capability
    pub fn render(&self, session: &SessionContext) -> RenderChoice<()> {
        self.decide(session.capability())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::{capability, Role, User};

    fn denied() -> Capability {
        capability(None)
    }

    fn granted() -> Capability {
        capability(Some(&User::new(1, "a", "a@x.io").with_role(Role::Admin)))
    }

    #[test]
    fn test_open_content_always_renders() {
        for mode in [DisplayMode::Page, DisplayMode::Hover, DisplayMode::None] {
            let choice = ContentAccess::new(false).display_mode(mode).decide(denied());
            assert_eq!(choice, RenderChoice::Content);
        }
    }

    #[test]
    fn test_restricted_with_capability_renders() {
        let choice = ContentAccess::new(true)
            .display_mode(DisplayMode::None)
            .decide(granted());
        assert!(choice.shows_content());
    }

    #[test]
    fn test_none_mode_renders_nothing() {
        let choice = decide::<(), fn(bool)>(
            AccessRequirement::Restricted,
            denied(),
            DisplayMode::None,
            None,
        );
        assert_eq!(choice, RenderChoice::Nothing);
    }

    #[test]
    fn test_hover_mode_delegates_to_lock_renderer() {
        let mut seen = None;
        let choice = decide(
            AccessRequirement::Restricted,
            denied(),
            DisplayMode::Hover,
            Some(|locked| {
                seen = Some(locked);
                "overlay"
            }),
        );
        assert_eq!(choice, RenderChoice::Delegated("overlay"));
        assert_eq!(seen, Some(true));
    }

    #[test]
    fn test_hover_without_lock_falls_back_to_placeholder() {
        let choice = ContentAccess::new(AccessRequirement::Restricted)
            .display_mode(DisplayMode::Hover)
            .decide(denied());
        assert_eq!(
            choice,
            RenderChoice::Placeholder(RestrictedPlaceholder::default())
        );
    }

    #[test]
    fn test_page_mode_is_default_and_shows_placeholder() {
        let access = ContentAccess::new(true);
        assert_eq!(access.mode(), DisplayMode::Page);
        match access.decide(denied()) {
            RenderChoice::Placeholder(p) => {
                assert_eq!(p.title, "Restricted content");
                assert_eq!(p.icon, "lock");
            }
            other => panic!("unexpected choice {:?}", other),
        }
    }

    #[test]
    fn test_lock_renderer_not_called_when_allowed() {
        let choice = ContentAccess::new(true)
            .display_mode(DisplayMode::Hover)
            .decide_with_lock(granted(), |_| -> &'static str { panic!("should not be called") });
        assert_eq!(choice, RenderChoice::Content);
    }

    #[test]
    fn test_display_mode_parsing() {
        assert_eq!("hover".parse::<DisplayMode>().unwrap(), DisplayMode::Hover);
        assert_eq!("PAGE".parse::<DisplayMode>().unwrap(), DisplayMode::Page);
        assert!("sideways".parse::<DisplayMode>().is_err());
        assert_eq!(
            serde_json::from_str::<DisplayMode>(r#""none""#).unwrap(),
            DisplayMode::None
        );
    }
}
