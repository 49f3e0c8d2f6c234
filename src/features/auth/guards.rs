use crate::features::navigation::routes::{
    is_admin_path, ADMIN_LOGIN_PATH, LOGIN_PATH, MOOD_PATH,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AuthStatus {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub is_admin: bool,
}

/// Snapshot of everything the guard looks at.
#[derive(Clone, Copy, Debug)]
pub struct GuardInput<'a> {
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub admin_required: bool,
    pub is_admin: bool,
    pub path: &'a str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Redirect {
    pub to: String,
    /// Path the user was trying to reach. Carried for the caller; sign-in
    /// does not return to it.
    pub from: Option<String>,
}

impl<'a> GuardInput<'a> {
    #[must_use]
    pub fn new(status: AuthStatus, path: &'a str, admin_required: bool) -> Self {
        Self {
            is_authenticated: status.is_authenticated,
            is_loading: status.is_loading,
            admin_required,
            is_admin: status.is_admin,
            path,
        }
    }
}

impl Redirect {
    pub(crate) fn to(path: &str) -> Self {
        Self {
            to: path.to_string(),
            from: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardDecision {
    Loading,
    Redirect(Redirect),
    Allow,
}

/// Decides whether `input.path` may render. UX only; the API enforces access.
#[must_use]
pub fn guard(input: &GuardInput<'_>) -> GuardDecision {
    if input.is_loading {
        return GuardDecision::Loading;
    }

    let admin_area = is_admin_path(input.path);

    if !input.is_authenticated {
        if admin_area {
            return GuardDecision::Redirect(Redirect::to(ADMIN_LOGIN_PATH));
        }
        return GuardDecision::Redirect(Redirect {
            to: LOGIN_PATH.to_string(),
            from: Some(input.path.to_string()),
        });
    }

    if (input.admin_required || admin_area) && !input.is_admin {
        let to = if admin_area { ADMIN_LOGIN_PATH } else { MOOD_PATH };
        return GuardDecision::Redirect(Redirect::to(to));
    }

    GuardDecision::Allow
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(path: &str) -> GuardInput<'_> {
        GuardInput {
            is_authenticated: true,
            is_loading: false,
            admin_required: false,
            is_admin: false,
            path,
        }
    }

    #[test]
    fn loading_wins_over_everything() {
        let decision = guard(&GuardInput {
            is_loading: true,
            is_authenticated: false,
            ..input("/admin-panel")
        });
        assert_eq!(decision, GuardDecision::Loading);
    }

    #[test]
    fn anonymous_users_go_to_login_with_origin() {
        let decision = guard(&GuardInput {
            is_authenticated: false,
            ..input("/assessment")
        });
        assert_eq!(
            decision,
            GuardDecision::Redirect(Redirect {
                to: "/login".to_string(),
                from: Some("/assessment".to_string()),
            })
        );
    }

    #[test]
    fn anonymous_admin_area_goes_to_admin_login() {
        let decision = guard(&GuardInput {
            is_authenticated: false,
            ..input("/admin-panel/users")
        });
        assert_eq!(decision, GuardDecision::Redirect(Redirect::to("/admin-panel/login")));
    }

    #[test]
    fn non_admins_are_bounced() {
        assert_eq!(
            guard(&input("/admin-panel")),
            GuardDecision::Redirect(Redirect::to("/admin-panel/login"))
        );
        assert_eq!(
            guard(&GuardInput {
                admin_required: true,
                ..input("/subscription")
            }),
            GuardDecision::Redirect(Redirect::to("/mood"))
        );
    }

    #[test]
    fn allowed_cases() {
        assert_eq!(guard(&input("/assessment")), GuardDecision::Allow);
        assert_eq!(
            guard(&GuardInput {
                is_admin: true,
                ..input("/admin-panel")
            }),
            GuardDecision::Allow
        );
    }
}
