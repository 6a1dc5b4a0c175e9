//! Cookie-based session handling and the route guard
//!
//! The token lives in an HTTP-only cookie named `jwt`, set on login/signup,
//! deleted on logout, and attached as a bearer header on API calls. The
//! route guard keeps unauthenticated visitors out of protected pages and
//! sends authenticated visitors away from the auth pages.

use crate::client::api::ApiClient;
use crate::client::types::User;
use crate::types::Result;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "jwt";

/// Session cookie lifetime: one week
pub const SESSION_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 7;

/// Paths that require an authenticated session
pub const PROTECTED_ROUTES: &[&str] = &["/dashboard", "/challenges", "/leaderboard", "/profile"];

/// Auth pages an authenticated session is redirected away from
pub const AUTH_ROUTES: &[&str] = &["/login", "/signup", "/forgot-password"];

/// Where unauthenticated visitors land
pub const LOGIN_PATH: &str = "/login";

/// Where authenticated visitors land
pub const DASHBOARD_PATH: &str = "/dashboard";

/// An HTTP cookie as the session layer emits it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: &'static str,
    pub value: String,
    pub http_only: bool,
    pub secure: bool,
    pub max_age_secs: u64,
    pub path: &'static str,
}

impl SessionCookie {
    fn new(token: &str, secure: bool) -> Self {
        Self {
            name: SESSION_COOKIE,
            value: token.to_string(),
            http_only: true,
            secure,
            max_age_secs: SESSION_MAX_AGE_SECS,
            path: "/",
        }
    }

    /// Render as a Set-Cookie header value.
    pub fn header_value(&self) -> String {
        let mut header = format!(
            "{}={}; Path={}; Max-Age={}",
            self.name, self.value, self.path, self.max_age_secs
        );
        if self.http_only {
            header.push_str("; HttpOnly");
        }
        if self.secure {
            header.push_str("; Secure");
        }
        header
    }
}

/// Holds the session cookie and keeps the API client's token in sync
#[derive(Debug, Default)]
pub struct Session {
    cookie: Option<SessionCookie>,
    /// Set the Secure attribute on issued cookies (production deployments)
    secure: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_secure(secure: bool) -> Self {
        Self {
            cookie: None,
            secure,
        }
    }

    /// Restore a session from a cookie value (e.g. an incoming request).
    pub fn from_token(token: &str) -> Self {
        let mut session = Self::new();
        session.establish(token);
        session
    }

    fn establish(&mut self, token: &str) {
        self.cookie = Some(SessionCookie::new(token, self.secure));
    }

    pub fn cookie(&self) -> Option<&SessionCookie> {
        self.cookie.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.cookie.as_ref().map(|c| c.value.as_str())
    }

    pub fn is_authenticated(&self) -> bool {
        self.cookie.is_some()
    }

    /// Log in; on success the cookie is set and the client carries the token.
    pub async fn login(
        &mut self,
        api: &mut ApiClient,
        identifier: &str,
        password: &str,
    ) -> Result<User> {
        let auth = api.login(identifier, password).await?;
        self.establish(&auth.jwt);
        Ok(auth.user)
    }

    /// Register; on success the cookie is set and the client carries the token.
    pub async fn signup(
        &mut self,
        api: &mut ApiClient,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User> {
        let auth = api.register(username, email, password).await?;
        self.establish(&auth.jwt);
        Ok(auth.user)
    }

    /// Drop the cookie and the client's token. The caller navigates to the
    /// login page afterwards.
    pub fn logout(&mut self, api: &mut ApiClient) {
        self.cookie = None;
        api.set_token(None);
    }
}

/// Outcome of the navigation guard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    Redirect(&'static str),
}

/// Decide whether a navigation may proceed.
///
/// Without a session, protected paths redirect to the login page; with one,
/// the auth pages redirect to the dashboard. Prefix matching covers nested
/// paths like `/challenges/42`.
pub fn route_guard(path: &str, authenticated: bool) -> GuardDecision {
    if !authenticated && PROTECTED_ROUTES.iter().any(|p| path.starts_with(p)) {
        return GuardDecision::Redirect(LOGIN_PATH);
    }

    if authenticated && AUTH_ROUTES.iter().any(|p| path.starts_with(p)) {
        return GuardDecision::Redirect(DASHBOARD_PATH);
    }

    GuardDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dashboard_without_cookie_redirects_to_login() {
        assert_eq!(route_guard("/dashboard", false), GuardDecision::Redirect("/login"));
    }

    #[test]
    fn login_with_cookie_redirects_to_dashboard() {
        assert_eq!(route_guard("/login", true), GuardDecision::Redirect("/dashboard"));
    }

    #[test]
    fn nested_protected_paths_are_guarded() {
        assert_eq!(
            route_guard("/challenges/42", false),
            GuardDecision::Redirect("/login")
        );
        assert_eq!(route_guard("/profile", false), GuardDecision::Redirect("/login"));
    }

    #[test]
    fn public_paths_always_pass() {
        assert_eq!(route_guard("/", false), GuardDecision::Allow);
        assert_eq!(route_guard("/", true), GuardDecision::Allow);
        assert_eq!(route_guard("/about", false), GuardDecision::Allow);
    }

    #[test]
    fn authenticated_navigation_to_protected_paths_passes() {
        assert_eq!(route_guard("/dashboard", true), GuardDecision::Allow);
        assert_eq!(route_guard("/leaderboard", true), GuardDecision::Allow);
    }

    #[test]
    fn unauthenticated_navigation_to_auth_pages_passes() {
        assert_eq!(route_guard("/login", false), GuardDecision::Allow);
        assert_eq!(route_guard("/forgot-password", false), GuardDecision::Allow);
    }

    #[test]
    fn session_cookie_is_http_only_week_long() {
        let session = Session::from_token("tok-123");
        let cookie = session.cookie().unwrap();
        assert_eq!(cookie.name, "jwt");
        assert!(cookie.http_only);
        assert_eq!(cookie.max_age_secs, 60 * 60 * 24 * 7);

        let header = cookie.header_value();
        assert!(header.starts_with("jwt=tok-123"));
        assert!(header.contains("HttpOnly"));
        assert!(!header.contains("Secure"));
    }

    #[test]
    fn secure_flag_is_carried_into_the_header() {
        let mut session = Session::with_secure(true);
        session.establish("tok");
        assert!(session.cookie().unwrap().header_value().contains("Secure"));
    }

    #[test]
    fn logout_clears_cookie_and_client_token() {
        let mut api = ApiClient::new("http://localhost:1337");
        api.set_token(Some("tok".into()));
        let mut session = Session::from_token("tok");

        session.logout(&mut api);

        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
        assert!(api.token().is_none());
    }
}
