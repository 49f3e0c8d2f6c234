use crate::features::auth::guards::{guard, AuthStatus, GuardDecision, GuardInput, Redirect};

pub const HOME_PATH: &str = "/";
pub const MOOD_PATH: &str = "/mood";
pub const ANALYTICS_PATH: &str = "/analytics";
pub const LOGIN_PATH: &str = "/login";
pub const REGISTER_PATH: &str = "/register";
pub const ASSESSMENT_PATH: &str = "/assessment";
pub const SUBSCRIPTION_PATH: &str = "/subscription";
pub const ADMIN_PATH: &str = "/admin-panel";
pub const ADMIN_LOGIN_PATH: &str = "/admin-panel/login";

/// Where unknown paths land.
pub const FALLBACK_PATH: &str = MOOD_PATH;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Sign-in pages; signed-in users are sent home.
    GuestOnly,
    Protected,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Route {
    pub path: &'static str,
    pub access: Access,
    pub title: &'static str,
}

pub const ROUTES: [Route; 9] = [
    Route {
        path: HOME_PATH,
        access: Access::Public,
        title: "Home",
    },
    Route {
        path: ANALYTICS_PATH,
        access: Access::Public,
        title: "Analytics",
    },
    Route {
        path: MOOD_PATH,
        access: Access::Public,
        title: "Mood",
    },
    Route {
        path: LOGIN_PATH,
        access: Access::GuestOnly,
        title: "Sign in",
    },
    Route {
        path: REGISTER_PATH,
        access: Access::GuestOnly,
        title: "Create account",
    },
    Route {
        path: ASSESSMENT_PATH,
        access: Access::Protected,
        title: "Assessment",
    },
    Route {
        path: ADMIN_LOGIN_PATH,
        access: Access::Public,
        title: "Admin sign in",
    },
    Route {
        path: ADMIN_PATH,
        access: Access::Admin,
        title: "Admin panel",
    },
    Route {
        path: SUBSCRIPTION_PATH,
        access: Access::Protected,
        title: "Subscription",
    },
];

#[must_use]
pub fn is_admin_path(path: &str) -> bool {
    path.starts_with(ADMIN_PATH)
}

/// Looks up the route for `path`, ignoring any query string and a trailing slash.
#[must_use]
pub fn find(path: &str) -> Option<&'static Route> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let path = if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    };
    ROUTES.iter().find(|route| route.path == path)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Loading,
    Render(&'static Route),
    Redirect(Redirect),
}

/// Resolves `path` against the route table and the guard.
#[must_use]
pub fn resolve(path: &str, status: AuthStatus) -> Resolution {
    if status.is_loading {
        return Resolution::Loading;
    }

    let Some(route) = find(path) else {
        return Resolution::Redirect(Redirect::to(FALLBACK_PATH));
    };

    let admin_required = match route.access {
        Access::Public => return Resolution::Render(route),
        Access::GuestOnly if status.is_authenticated => {
            return Resolution::Redirect(Redirect::to(HOME_PATH));
        }
        Access::GuestOnly => return Resolution::Render(route),
        Access::Protected => false,
        Access::Admin => true,
    };

    match guard(&GuardInput::new(status, route.path, admin_required)) {
        GuardDecision::Allow => Resolution::Render(route),
        GuardDecision::Loading => Resolution::Loading,
        GuardDecision::Redirect(redirect) => Resolution::Redirect(redirect),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ANONYMOUS: AuthStatus = AuthStatus {
        is_authenticated: false,
        is_loading: false,
        is_admin: false,
    };
    const MEMBER: AuthStatus = AuthStatus {
        is_authenticated: true,
        is_loading: false,
        is_admin: false,
    };

    fn redirect_target(resolution: Resolution) -> String {
        match resolution {
            Resolution::Redirect(redirect) => redirect.to,
            other => panic!("expected redirect, got {other:?}"),
        }
    }

    #[test]
    fn public_pages_render_for_everyone() {
        for path in [HOME_PATH, MOOD_PATH, ANALYTICS_PATH, ADMIN_LOGIN_PATH] {
            assert!(matches!(resolve(path, ANONYMOUS), Resolution::Render(_)), "{path}");
        }
    }

    #[test]
    fn sign_in_pages_send_members_home() {
        assert_eq!(redirect_target(resolve("/login", MEMBER)), HOME_PATH);
        assert_eq!(redirect_target(resolve("/register?email=a%40b.co", MEMBER)), HOME_PATH);
        assert!(matches!(resolve("/login", ANONYMOUS), Resolution::Render(_)));
    }

    #[test]
    fn protected_and_admin_pages_use_the_guard() {
        assert_eq!(redirect_target(resolve("/assessment", ANONYMOUS)), LOGIN_PATH);
        assert_eq!(redirect_target(resolve("/admin-panel", ANONYMOUS)), ADMIN_LOGIN_PATH);
        assert_eq!(redirect_target(resolve("/admin-panel", MEMBER)), ADMIN_LOGIN_PATH);
        assert!(matches!(resolve("/subscription/", MEMBER), Resolution::Render(_)));
    }

    #[test]
    fn unknown_paths_fall_back_to_mood() {
        assert_eq!(redirect_target(resolve("/nope", MEMBER)), MOOD_PATH);
    }

    #[test]
    fn loading_blocks_resolution() {
        let status = AuthStatus {
            is_loading: true,
            ..MEMBER
        };
        assert_eq!(resolve(HOME_PATH, status), Resolution::Loading);
        assert_eq!(find("/mood?x=1").unwrap().path, MOOD_PATH);
    }
}
