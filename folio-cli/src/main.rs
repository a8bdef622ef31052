//! Folio CLI - terminal client for Folio sessions
//!
//! Keeps a session on disk the same way the browser does (a durable store
//! plus a cookie jar) and talks to the auth backend.

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use folio_client::{
    AuthClient, AuthFlow, ClientError, ContentAccess, CookieStore, DisplayMode, FileBackend,
    LogoutCountdown, Navigator, RenderChoice, ResetPasswordRequest, SessionContext, SessionKeys,
    SessionStore, SignUpRequest,
};
use folio_core::{
    init_logging, log_operation_error, log_operation_start, log_operation_success, AccessPolicy,
    ContentIndex, FolioConfig, LoggingConfig, ProfileUpdate, User,
};
use folio_web::{GateDecision, SessionEvidence};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

#[derive(Parser)]
#[command(name = "folio")]
#[command(about = "Sign in to Folio and browse its content from the terminal")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the session store and cookie jar
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in and store the session
    Login {
        username: String,
        #[arg(short, long)]
        password: String,
    },

    /// Create an account, then sign in with it
    Register {
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// End the session
    Logout,

    /// Show the current identity
    Whoami {
        /// Print the identity as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update profile fields
    Profile {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },

    /// List published posts
    Posts {
        #[arg(short, long, default_value = "1")]
        page: usize,
    },

    /// Show a single post
    Read { slug: String },

    /// Evaluate the route gate for a path against the stored session
    Check { path: String },

    /// Request a password reset code
    ForgotPassword { email: String },

    /// Set a new password with a reset code
    ResetPassword {
        email: String,
        #[arg(long)]
        code: String,
        #[arg(long)]
        new_password: String,
    },
}

/// Prints navigation instead of moving a browser
struct ConsoleNavigator;

impl Navigator for ConsoleNavigator {
    fn navigate(&self, path: &str) {
        println!("-> {}", path);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config.as_ref())?;

    let mut logging_config = LoggingConfig {
        filter_directives: vec!["folio_client=warn".to_string()],
        ..config.logging.clone()
    }
    .with_level("warn");
    if cli.verbose {
        logging_config.level = "debug".to_string();
        logging_config.filter_directives.clear();
    }
    init_logging(&logging_config).map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    let data_dir = match cli.data_dir {
        Some(dir) => dir,
        None => default_data_dir()?,
    };
    let context = open_session(&config, &data_dir)?;
    context.initialize();

    match cli.command {
        Commands::Login { username, password } => {
            let client = AuthClient::new(&config.auth.base_url)?;
            log_operation_start!("login", username = %username);
            let user = AuthFlow::new(&client, &context)
                .sign_in(&username, &password)
                .await
                .map_err(form_error("login"))?;
            log_operation_success!("login", username = %user.username);
            println!("Logged in as {}", user.username);
        }
        Commands::Register {
            username,
            email,
            password,
            avatar_url,
        } => {
            let client = AuthClient::new(&config.auth.base_url)?;
            let user = AuthFlow::new(&client, &context)
                .sign_up(SignUpRequest {
                    username,
                    email,
                    password,
                    avatar_url,
                })
                .await
                .map_err(form_error("register"))?;
            println!("Registered and logged in as {}", user.username);
        }
        Commands::Logout => handle_logout(&config, &context).await,
        Commands::Whoami { json } => match context.current() {
            Some(user) if json => println!("{}", serde_json::to_string_pretty(&user)?),
            Some(user) => print_user(&user, &context),
            None => println!("Not logged in"),
        },
        Commands::Profile { email, avatar_url } => {
            let update = ProfileUpdate {
                email,
                avatar_url: avatar_url.map(Some),
                ..Default::default()
            };
            if update.is_empty() {
                println!("Nothing to update");
                return Ok(());
            }
            let client = AuthClient::new(&config.auth.base_url)?;
            let user = AuthFlow::new(&client, &context)
                .save_profile(update)
                .await
                .map_err(form_error("profile"))?;
            println!("Profile updated");
            print_user(&user, &context);
        }
        Commands::Posts { page } => {
            let index = load_content(&config)?;
            let page = index.page(page, config.content.posts_per_page);
            let capability = context.capability();

            for entry in &page.entries {
                let marker = ContentAccess::new(entry.need_access)
                    .display_mode(DisplayMode::Hover)
                    .decide_with_lock(capability, |_| " [locked]");
                let marker = match marker {
                    RenderChoice::Delegated(lock) => lock,
                    _ => "",
                };
                println!("{}  {}{}  ({})", entry.date, entry.title, marker, entry.slug);
            }
            println!("Page {} of {}", page.page, page.total_pages);
        }
        Commands::Read { slug } => {
            let index = load_content(&config)?;
            let entry = index
                .get(&slug)
                .filter(|entry| !entry.draft)
                .ok_or_else(|| anyhow!("No post named {}", slug))?;

            match ContentAccess::new(entry.need_access).render(&context) {
                RenderChoice::Content => {
                    println!("{}\n{}", entry.title, entry.date);
                    if !entry.tags.is_empty() {
                        println!("Tags: {}", entry.tags.join(", "));
                    }
                }
                RenderChoice::Placeholder(placeholder) => {
                    println!("[{}] {}", placeholder.icon, placeholder.title);
                    println!("{}", placeholder.message);
                    println!("{}", placeholder.contact_hint);
                }
                RenderChoice::Delegated(()) | RenderChoice::Nothing => {}
            }
        }
        Commands::Check { path } => {
            let index = load_content(&config)?;
            let evidence = cookie_evidence(&open_cookie_jar(&config, &data_dir), &config);
            println!("{}", check_path(&path, &index, context.policy(), &evidence));
        }
        Commands::ForgotPassword { email } => {
            let client = AuthClient::new(&config.auth.base_url)?;
            client
                .forgot_password(&email)
                .await
                .map_err(form_error("forgot_password"))?;
            println!("Verification code sent to {}", email);
        }
        Commands::ResetPassword {
            email,
            code,
            new_password,
        } => {
            let client = AuthClient::new(&config.auth.base_url)?;
            client
                .reset_password(&ResetPasswordRequest {
                    email,
                    code,
                    new_password,
                })
                .await
                .map_err(form_error("reset_password"))?;
            println!("Password reset, you can log in now");
        }
    }

    Ok(())
}

fn load_config(config_path: Option<&PathBuf>) -> anyhow::Result<FolioConfig> {
    if let Some(path) = config_path {
        info!("Loading configuration from {:?}", path);
        return Ok(FolioConfig::from_file(path)?);
    }

    let default_paths = [
        dirs::config_dir().map(|d| d.join("folio").join("config.toml")),
        Some(PathBuf::from("folio.toml")),
    ];
    for path in default_paths.iter().flatten() {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            return Ok(FolioConfig::from_file(path)?);
        }
    }

    Ok(FolioConfig::default())
}

fn default_data_dir() -> anyhow::Result<PathBuf> {
    dirs::data_local_dir()
        .map(|dir| dir.join("folio"))
        .context("Could not determine a data directory; pass --data-dir")
}

fn open_session(config: &FolioConfig, data_dir: &Path) -> anyhow::Result<SessionContext> {
    let kv = FileBackend::open(data_dir.join("session.json"))
        .context("Failed to open the session store")?;
    let store = SessionStore::new(
        Arc::new(kv),
        Arc::new(open_cookie_jar(config, data_dir)),
        SessionKeys::from(&config.session),
    );

    Ok(SessionContext::new(
        store,
        config.auth.access_policy(),
        Arc::new(ConsoleNavigator),
        config.session.waiting_path.clone(),
    ))
}

fn open_cookie_jar(config: &FolioConfig, data_dir: &Path) -> CookieStore {
    CookieStore::persistent(
        data_dir.join("cookies.json"),
        config.session.cookie_max_age_days,
    )
}

/// What the server would read from the cookies this client sends
fn cookie_evidence(cookies: &CookieStore, config: &FolioConfig) -> SessionEvidence {
    cookies
        .header_value()
        .map(|header| SessionEvidence::from_cookie_header(&header, &config.session))
        .unwrap_or(SessionEvidence::Missing)
}

fn load_content(config: &FolioConfig) -> anyhow::Result<ContentIndex> {
    ContentIndex::from_file(&config.content.index_path).with_context(|| {
        format!(
            "Failed to load content index from {}",
            config.content.index_path.display()
        )
    })
}

/// Log the failure and turn it into the message the form would show
fn form_error(operation: &'static str) -> impl Fn(ClientError) -> anyhow::Error {
    move |e| {
        log_operation_error!(operation, e);
        anyhow!(e.user_message())
    }
}

fn print_user(user: &User, context: &SessionContext) {
    println!("{} <{}>", user.username, user.email);
    let roles: Vec<String> = user.roles.iter().map(ToString::to_string).collect();
    println!("Roles: {}", roles.join(", "));
    if let Some(avatar_url) = &user.avatar_url {
        println!("Avatar: {}", avatar_url);
    }
    println!(
        "Restricted content: {}",
        if context.capability().is_granted() {
            "visible"
        } else {
            "hidden"
        }
    );
}

async fn handle_logout(config: &FolioConfig, context: &SessionContext) {
    let username = context.current().map(|user| user.username);
    context.logout();
    match username {
        Some(username) => println!("Logged out {}", username),
        None => println!("No active session"),
    }

    let countdown = LogoutCountdown::start(
        config.session.logout_redirect_secs,
        config.session.home_path.clone(),
        Arc::new(ConsoleNavigator),
    );
    let mut remaining = countdown.subscribe();
    println!("Returning home in {}...", countdown.remaining());
    while remaining.changed().await.is_ok() {
        let secs = *remaining.borrow_and_update();
        if secs == 0 {
            break;
        }
        println!("{}...", secs);
    }
    countdown.wait().await;
}

/// Gate decision for `path` as the server would make it
fn check_path(
    path: &str,
    index: &ContentIndex,
    policy: AccessPolicy,
    evidence: &SessionEvidence,
) -> String {
    let decision = GateDecision::evaluate(path, index, policy, evidence);
    match &decision {
        GateDecision::Ungated => format!("{}: open (not gated)", path),
        GateDecision::Open(_) => format!("{}: open ({})", path, decision.label()),
        GateDecision::Allowed(_) => format!("{}: allowed ({})", path, decision.label()),
        GateDecision::Denied(_) => format!(
            "{}: denied, served as not found ({}, session {})",
            path,
            decision.label(),
            evidence.label()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_client::StorageBackend;
    use folio_core::{ContentEntry, Role};

    fn index() -> ContentIndex {
        ContentIndex::from_entries(vec![ContentEntry {
            slug: "secret-post".to_string(),
            title: "Secret".to_string(),
            date: "2024-05-01".parse().unwrap(),
            tags: vec![],
            draft: false,
            need_access: true,
        }])
    }

    #[test]
    fn test_args_parsing() {
        let cli = Cli::parse_from(["folio", "login", "mod", "--password", "pw"]);
        assert!(matches!(
            cli.command,
            Commands::Login { ref username, ref password } if username == "mod" && password == "pw"
        ));

        let cli = Cli::parse_from(["folio", "--data-dir", "/tmp/f", "posts", "--page", "3"]);
        assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/f")));
        assert!(matches!(cli.command, Commands::Posts { page: 3 }));
    }

    fn jar_with(user: Option<&User>, token: Option<&str>) -> CookieStore {
        let jar = CookieStore::in_memory(7);
        if let Some(user) = user {
            jar.set("user", &serde_json::to_string(user).unwrap()).unwrap();
        }
        if let Some(token) = token {
            jar.set("token", token).unwrap();
        }
        jar
    }

    #[test]
    fn test_check_path_decisions() {
        let index = index();
        let config = FolioConfig::default();
        let policy = AccessPolicy::role_based();
        let moderator = User::new(1, "m", "m@x.io").with_role(Role::Moderator);

        let anonymous = cookie_evidence(&jar_with(None, None), &config);
        assert_eq!(
            check_path("/blog/secret-post", &index, policy, &anonymous),
            "/blog/secret-post: denied, served as not found (blog, session missing)"
        );

        let signed_in = cookie_evidence(&jar_with(Some(&moderator), Some("t")), &config);
        assert_eq!(
            check_path("/blog/secret-post", &index, policy, &signed_in),
            "/blog/secret-post: allowed (blog)"
        );
        assert_eq!(
            check_path("/blog/page/2", &index, policy, &anonymous),
            "/blog/page/2: open (unprotected)"
        );
        assert_eq!(
            check_path("/about", &index, policy, &signed_in),
            "/about: open (not gated)"
        );
    }

    #[test]
    fn test_check_path_requires_token_cookie() {
        let config = FolioConfig::default();
        let moderator = User::new(1, "m", "m@x.io").with_role(Role::Moderator);

        let user_only = cookie_evidence(&jar_with(Some(&moderator), None), &config);
        assert_eq!(user_only, SessionEvidence::Missing);
        assert_eq!(
            check_path("/blog/secret-post", &index(), AccessPolicy::role_based(), &user_only),
            "/blog/secret-post: denied, served as not found (blog, session missing)"
        );
    }

    #[test]
    fn test_session_persists_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = FolioConfig::default();

        let context = open_session(&config, dir.path()).unwrap();
        context.initialize();
        context
            .login(
                User::new(1, "m", "m@x.io").with_role(Role::Moderator),
                folio_core::SessionToken::new("t"),
            )
            .unwrap();

        let reopened = open_session(&config, dir.path()).unwrap();
        assert_eq!(reopened.initialize().map(|u| u.username), Some("m".to_string()));
        assert!(reopened.capability().is_granted());
    }
}
