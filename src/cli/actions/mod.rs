pub mod context;

// Internal "interpreter" for `Action`, kept apart so this file stays a list
// of what the CLI can do.
mod run;

use crate::{
    cli::globals::GlobalArgs,
    features::{mood::Mood, navigation::NavigationType},
};
use secrecy::SecretString;

#[derive(Debug)]
pub enum MoodAction {
    Record {
        mood: Mood,
        intensity: u8,
        notes: Option<String>,
    },
    Timeline {
        days: u32,
    },
}

#[derive(Debug)]
pub enum CbtAction {
    Content,
    Progress,
}

#[derive(Debug)]
pub enum SubscriptionAction {
    Status,
    Upgrade,
    Cancel,
}

#[derive(Debug)]
pub enum Action {
    Login {
        email: Option<String>,
        password: Option<SecretString>,
        back: bool,
    },
    Register {
        email: Option<String>,
        password: Option<SecretString>,
        back: bool,
    },
    Logout,
    Whoami,
    Open {
        path: String,
    },
    Resume {
        path: String,
        navigation: NavigationType,
    },
    Mood(MoodAction),
    Cbt(CbtAction),
    Subscription(SubscriptionAction),
    Analytics {
        days: u32,
    },
    Crisis,
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self, globals: &GlobalArgs) -> anyhow::Result<()> {
        run::execute(self, globals).await
    }
}
