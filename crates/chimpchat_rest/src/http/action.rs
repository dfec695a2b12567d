//! Path routing: request path to action

use std::borrow::Cow;

use phf::phf_map;

/// Actions that run against the bound device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceAction {
    Reboot,
    Wake,
    Install,
    Remove,
    GetVar,
    GetProp,
    Type,
    TakeSnapshot,
}

/// Every action the server answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Connect and bind the session
    Init,
    /// Browser noise, answered with an empty body
    Favicon,
    /// Requires a bound device
    Device(DeviceAction),
}

static ACTIONS: phf::Map<&'static str, Action> = phf_map! {
    "init" => Action::Init,
    "reboot" => Action::Device(DeviceAction::Reboot),
    "wake" => Action::Device(DeviceAction::Wake),
    "install" => Action::Device(DeviceAction::Install),
    "remove" => Action::Device(DeviceAction::Remove),
    "getVar" => Action::Device(DeviceAction::GetVar),
    "getProp" => Action::Device(DeviceAction::GetProp),
    "type" => Action::Device(DeviceAction::Type),
    "takeSnapshot" => Action::Device(DeviceAction::TakeSnapshot),
    "favicon.ico" => Action::Favicon,
};

impl Action {
    /// Exact, case-sensitive lookup of an action token
    pub fn from_token(token: &str) -> Option<Self> {
        ACTIONS.get(token).copied()
    }

    pub fn requires_device(self) -> bool {
        matches!(self, Action::Device(_))
    }
}

/// Result of splitting a request path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route<'a> {
    /// `/` or empty: the identification page
    About,
    /// Second path segment, percent-decoded
    Token(Cow<'a, str>),
}

/// Split `path` on `/` and pick the action token.
///
/// Trailing empty segments are dropped. With fewer than two segments left the
/// request is for the root; otherwise the segment at index 1 is the token and
/// anything after it is ignored. `//wake` therefore yields an empty token.
pub fn parse_path(path: &str) -> Route<'_> {
    let mut segments: Vec<&str> = path.split('/').collect();
    while segments.last().is_some_and(|s| s.is_empty()) {
        segments.pop();
    }

    if segments.len() < 2 {
        return Route::About;
    }

    let raw = segments[1];
    Route::Token(urlencoding::decode(raw).unwrap_or(Cow::Borrowed(raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(path: &str) -> Option<String> {
        match parse_path(path) {
            Route::About => None,
            Route::Token(t) => Some(t.into_owned()),
        }
    }

    #[test]
    fn test_root_paths() {
        assert_eq!(parse_path("/"), Route::About);
        assert_eq!(parse_path(""), Route::About);
        assert_eq!(parse_path("///"), Route::About);
    }

    #[test]
    fn test_second_segment_is_token() {
        assert_eq!(token("/wake").as_deref(), Some("wake"));
        assert_eq!(token("/wake/").as_deref(), Some("wake"));
        assert_eq!(token("/getProp/extra/segments").as_deref(), Some("getProp"));
    }

    #[test]
    fn test_empty_second_segment() {
        assert_eq!(token("//wake").as_deref(), Some(""));
    }

    #[test]
    fn test_token_is_percent_decoded() {
        assert_eq!(token("/get%56ar").as_deref(), Some("getVar"));
    }

    #[test]
    fn test_lookup_is_exact_and_case_sensitive() {
        assert_eq!(Action::from_token("init"), Some(Action::Init));
        assert_eq!(
            Action::from_token("takeSnapshot"),
            Some(Action::Device(DeviceAction::TakeSnapshot))
        );
        assert_eq!(Action::from_token("favicon.ico"), Some(Action::Favicon));
        assert_eq!(Action::from_token("getvar"), None);
        assert_eq!(Action::from_token("Init"), None);
        assert_eq!(Action::from_token("wak"), None);
        assert_eq!(Action::from_token(""), None);
    }

    #[test]
    fn test_requires_device() {
        assert!(!Action::Init.requires_device());
        assert!(!Action::Favicon.requires_device());
        assert!(Action::Device(DeviceAction::Wake).requires_device());
    }
}
