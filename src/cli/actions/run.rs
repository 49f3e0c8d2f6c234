use crate::{
    cli::{
        actions::{context::Context, Action, CbtAction, MoodAction, SubscriptionAction},
        globals::GlobalArgs,
    },
    features::{
        analytics,
        auth::{FlowError, LoginFlow, RegisterFlow, Step},
        cbt, crisis,
        mood::{self, MoodTracker},
        navigation::{
            routes::{self, Resolution},
            History, LastPageRecorder, NavigationType, PageEvent, PageRestorer, RestoreDecision,
        },
        subscription::{
            Subscriptions, FEATURE_ADVANCED_ANALYTICS, FEATURE_UNLIMITED_CBT,
            FEATURE_UNLIMITED_SESSIONS,
        },
    },
};
use anyhow::{anyhow, bail, Result};
use secrecy::SecretString;
use std::sync::Arc;

pub async fn execute(action: Action, globals: &GlobalArgs) -> Result<()> {
    let ctx = Context::open(globals)?;

    match action {
        Action::Login {
            email,
            password,
            back,
        } => login(&ctx, email, password, back).await,
        Action::Register {
            email,
            password,
            back,
        } => register(&ctx, email, password, back).await,
        Action::Logout => {
            ctx.mount().await;
            ctx.auth.logout().await?;
            ctx.toasts.success("Signed out.");
            Ok(())
        }
        Action::Whoami => {
            match ctx.mount().await {
                Some(user) => {
                    let plan = if user.has_premium() { "premium" } else { "free" };
                    println!("{} <{}> ({plan})", user.display_name(), user.email);
                    if user.is_admin {
                        println!("administrator");
                    }
                }
                None => println!("Not signed in."),
            }
            Ok(())
        }
        Action::Open { path } => open(&ctx, &path).await,
        Action::Resume { path, navigation } => resume(&ctx, &path, navigation).await,
        Action::Mood(action) => mood(&ctx, action).await,
        Action::Cbt(action) => cbt(&ctx, action).await,
        Action::Subscription(action) => subscription(&ctx, action).await,
        Action::Analytics { days } => {
            ctx.mount().await;
            let data = analytics::dashboard(ctx.auth.api(), ctx.auth.cache(), days).await?;
            println!("Last {} days", data.period_days);
            println!("  sessions:     {}", data.total_sessions);
            println!("  messages:     {}", data.total_messages);
            println!("  risk events:  {}", data.risk_events);
            if let Some(entries) = data.total_mood_entries {
                println!("  mood entries: {entries}");
            }
            if let Some(score) = data.wellness_score {
                println!("  wellness:     {score:.1}");
            }
            if let Some(mood) = &data.most_common_mood {
                println!("  common mood:  {mood}");
            }
            for theme in &data.dominant_themes {
                println!("  theme {} x{}", theme.theme, theme.count);
            }
            if let Some(message) = &data.upgrade_message {
                ctx.toasts.info(message.clone());
            }
            Ok(())
        }
        Action::Crisis => {
            for resource in crisis::list_resources(ctx.auth.api()).await? {
                let marker = if resource.is_emergency { "!" } else { " " };
                println!("{marker} {}", resource.title);
                if let Some(phone) = &resource.phone_number {
                    println!("    phone: {phone}");
                }
                if let Some(url) = &resource.website_url {
                    println!("    web:   {url}");
                }
            }
            Ok(())
        }
    }
}

/// Applies `--back` and `--email` to a resumed flow the way the form would:
/// a different email on the password step goes back first.
fn apply_email(step: Step, current: &str, email: Option<&str>) -> (bool, Option<String>) {
    match email {
        Some(email) if step == Step::Password && current != email => (true, Some(email.to_string())),
        Some(email) if step == Step::Email => (false, Some(email.to_string())),
        _ => (false, None),
    }
}

async fn login(
    ctx: &Context,
    email: Option<String>,
    password: Option<SecretString>,
    back: bool,
) -> Result<()> {
    let mut flow = LoginFlow::resume(ctx.auth.clone(), Arc::clone(&ctx.session));
    if let Some(failure) = flow.error() {
        ctx.toasts.error(failure.message.clone());
    }
    if back {
        flow.back();
    }
    let (go_back, email) = apply_email(flow.step(), flow.email(), email.as_deref());
    if go_back {
        flow.back();
    }
    if let Some(email) = email {
        flow.set_email(&email);
    }

    if flow.step() == Step::Email {
        if flow.email().is_empty() {
            println!("Enter your email with --email.");
            return Ok(());
        }
        flow.submit_email()?;
    }

    let Some(password) = password else {
        println!(
            "Signing in as {}. Pass the password with --password or NEWME_PASSWORD.",
            flow.email()
        );
        return Ok(());
    };
    flow.set_password(password);

    match flow.submit_password().await {
        Ok(destination) => {
            if let Some(user) = ctx.auth.user() {
                ctx.toasts.success(format!("Welcome back, {}!", user.display_name()));
            }
            println!("-> {destination}");
            Ok(())
        }
        Err(FlowError::Rejected(failure)) => {
            if let Some(link) = flow.register_link() {
                println!("No account yet? Open {link} or run `newme register`.");
            }
            bail!(failure.message)
        }
        Err(err) => Err(err.into()),
    }
}

async fn register(
    ctx: &Context,
    email: Option<String>,
    password: Option<SecretString>,
    back: bool,
) -> Result<()> {
    let mut flow = RegisterFlow::resume(ctx.auth.clone(), Arc::clone(&ctx.session));
    if let Some(failure) = flow.error() {
        ctx.toasts.error(failure.message.clone());
    }
    if back {
        flow.back();
    }
    let (go_back, email) = apply_email(flow.step(), flow.email(), email.as_deref());
    if go_back {
        flow.back();
    }
    if let Some(email) = email {
        flow.set_email(&email);
    }

    if flow.step() == Step::Email {
        if flow.email().is_empty() {
            println!("Enter your email with --email.");
            return Ok(());
        }
        flow.submit_email()?;
    }

    let Some(password) = password else {
        println!(
            "Creating an account for {}. Pass a password with --password or NEWME_PASSWORD.",
            flow.email()
        );
        return Ok(());
    };
    flow.set_password(password);

    match flow.submit_password().await {
        Ok(destination) => {
            ctx.toasts.success("Account created.");
            println!("-> {destination}");
            Ok(())
        }
        Err(FlowError::Rejected(failure)) => {
            if let Some(link) = flow.login_link() {
                println!("Already registered? Open {link} or run `newme login`.");
            }
            bail!(failure.message)
        }
        Err(err) => Err(err.into()),
    }
}

async fn open(ctx: &Context, path: &str) -> Result<()> {
    ctx.mount().await;
    let recorder = LastPageRecorder::new(Arc::clone(&ctx.cookies));
    let is_authenticated = ctx.auth.is_authenticated();

    match routes::resolve(path, ctx.auth.status()) {
        Resolution::Render(route) => {
            recorder.record(PageEvent::PathChanged, path, is_authenticated);
            println!("{} ({path})", route.title);
        }
        Resolution::Redirect(redirect) => {
            println!("-> {}", redirect.to);
            if let Resolution::Render(route) = routes::resolve(&redirect.to, ctx.auth.status()) {
                recorder.record(PageEvent::PathChanged, &redirect.to, is_authenticated);
                println!("{} ({})", route.title, redirect.to);
            }
        }
        Resolution::Loading => println!("Loading..."),
    }
    Ok(())
}

async fn resume(ctx: &Context, path: &str, navigation: NavigationType) -> Result<()> {
    ctx.mount().await;
    let history = History::new(path);
    let mut restorer = PageRestorer::new(Arc::clone(&ctx.cookies), Arc::clone(&ctx.session));

    match restorer
        .run(ctx.auth.is_loading(), navigation, &history)
        .await
    {
        RestoreDecision::Restore(restored) => println!("Restored {restored}"),
        RestoreDecision::Skip | RestoreDecision::AlreadyChecked => println!("Staying on {path}"),
        RestoreDecision::Waiting => println!("Still loading"),
    }
    Ok(())
}

async fn mood(ctx: &Context, action: MoodAction) -> Result<()> {
    ctx.mount().await;
    let tracker = MoodTracker::new(ctx.auth.clone());

    match action {
        MoodAction::Record {
            mood,
            intensity,
            notes,
        } => match tracker.record(mood, intensity, notes.as_deref()).await {
            Ok(state) => {
                ctx.toasts.success(format!(
                    "Recorded {} ({})",
                    mood.label(),
                    mood.intensity_label(state.intensity)
                ));
                Ok(())
            }
            Err(err) => Err(anyhow!(mood::describe_error(&err))),
        },
        MoodAction::Timeline { days } => {
            let entries = tracker.timeline(days).await?;
            if entries.is_empty() {
                println!("No moods recorded in the last {days} days.");
            }
            for entry in entries {
                println!(
                    "{}  {:<8} {:>2}  {}",
                    entry.recorded_at, entry.mood, entry.intensity, entry.notes
                );
            }
            Ok(())
        }
    }
}

async fn cbt(ctx: &Context, action: CbtAction) -> Result<()> {
    ctx.mount().await;
    let api = ctx.auth.api();

    match action {
        CbtAction::Content => {
            for program in cbt::list_content(api).await? {
                let lock = if program.is_locked { " [premium]" } else { "" };
                println!("{:>4}  {}{lock}", program.id, program.title);
                for lesson in &program.lessons {
                    println!("{:>8}  {}", lesson.id, lesson.title);
                }
            }
        }
        CbtAction::Progress => {
            let progress = cbt::list_progress(api).await?;
            if progress.is_empty() {
                println!("No progress yet.");
            }
            for row in progress {
                let done = if row.completed { "done" } else { "" };
                println!(
                    "{:>4}  {:<40} {:>5.0}% {done}",
                    row.content.id, row.content.title, row.progress_percentage
                );
            }
        }
    }
    Ok(())
}

async fn subscription(ctx: &Context, action: SubscriptionAction) -> Result<()> {
    if ctx.mount().await.is_none() {
        bail!("Sign in to manage your subscription.");
    }
    let subscriptions = Subscriptions::new(ctx.auth.clone());

    match action {
        SubscriptionAction::Status => {
            let entitlements = subscriptions.entitlements().await?;
            let plan = if entitlements.is_premium { "premium" } else { "free" };
            println!("Plan: {plan}");
            if let Some(expires_at) = entitlements
                .subscription
                .as_ref()
                .and_then(|subscription| subscription.expires_at.as_deref())
            {
                println!("Expires: {expires_at}");
            }
            let limit = |value: Option<u32>| value.map_or("unlimited".to_string(), |n| n.to_string());
            println!("CBT programs:    {}", limit(entitlements.limits.max_cbt_programs));
            println!("Sessions/month:  {}", limit(entitlements.limits.max_sessions_per_month));
            println!("Voice/month:     {}", limit(entitlements.limits.voice_sessions_per_month));
            for feature in [
                FEATURE_ADVANCED_ANALYTICS,
                FEATURE_UNLIMITED_CBT,
                FEATURE_UNLIMITED_SESSIONS,
            ] {
                let access = if entitlements.can_access(feature) { "yes" } else { "no" };
                println!("{feature}: {access}");
            }
        }
        SubscriptionAction::Upgrade => {
            subscriptions.upgrade().await?;
            ctx.toasts.success("Welcome to premium!");
        }
        SubscriptionAction::Cancel => {
            let cancellation = subscriptions.cancel().await?;
            ctx.toasts.info(cancellation.message);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_changes_on_the_password_step_go_back() {
        assert_eq!(
            apply_email(Step::Password, "a@b.co", Some("c@d.co")),
            (true, Some("c@d.co".to_string()))
        );
        assert_eq!(apply_email(Step::Password, "a@b.co", Some("a@b.co")), (false, None));
        assert_eq!(
            apply_email(Step::Email, "", Some("a@b.co")),
            (false, Some("a@b.co".to_string()))
        );
        assert_eq!(apply_email(Step::Email, "a@b.co", None), (false, None));
    }
}
