use std::io::Write;
use std::pin::pin;
use std::sync::atomic::Ordering;

use adk_api::{AdkApiClient, AdkApiConfig, CancellationSignal};
use session_store::SessionStore;
use tokio::io::AsyncBufReadExt;
use tracing_subscriber::EnvFilter;

use chat_console::app::{App, ChatMessage, Role, RunId};
use chat_console::commands::{parse_slash_command, SlashCommand};
use chat_console::config::{resolve, EnvConfig};
use chat_console::prefs::{
    FilePrefs, PrefsStore, PREF_BASE_URL, PREF_SESSION_ID, PREF_USER_ID,
};
use chat_console::runtime::{TranscriptView, TurnDriver, TurnStatus};

const LOG_ENV_VAR: &str = "CHAT_CONSOLE_LOG";
const HELP_TEXT: &str =
    "Commands: /help, /sessions, /new, /switch <n>, /delete [n], /user <id>, /quit";

#[tokio::main(flavor = "current_thread")]
async fn main() -> std::io::Result<()> {
    init_tracing();

    let cwd = std::env::current_dir()?;
    let mut prefs = FilePrefs::in_dir(&cwd);
    let config = resolve(&EnvConfig::from_env(), &prefs);
    prefs.save(PREF_USER_ID, &config.user_id);
    prefs.save(PREF_BASE_URL, &config.base_url);

    let mut api_config =
        AdkApiConfig::new(config.app_name.clone()).with_base_url(config.base_url.clone());
    if let Some(timeout) = config.timeout {
        api_config = api_config.with_timeout(timeout);
    }
    let client = AdkApiClient::new(api_config).map_err(std::io::Error::other)?;

    let mut console = Console {
        app: App::new(),
        store: SessionStore::new(client.clone(), config.user_id.clone()),
        driver: TurnDriver::new(client.clone()),
        client,
        prefs,
        view: ConsoleView::default(),
    };

    println!(
        "chat console: app '{}' at {} as {}",
        config.app_name, config.base_url, config.user_id
    );
    println!("{HELP_TEXT}");
    console.bootstrap().await;

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt_marker()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        if let Some(command) = parse_slash_command(&line) {
            if !console.handle_command(command).await {
                break;
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        console.submit(line.trim()).await;
    }

    Ok(())
}

struct Console {
    app: App,
    store: SessionStore<AdkApiClient>,
    driver: TurnDriver<AdkApiClient>,
    client: AdkApiClient,
    prefs: FilePrefs,
    view: ConsoleView,
}

impl Console {
    /// Reconcile against the server's session list and resume the cached
    /// selection when the server still knows it.
    async fn bootstrap(&mut self) {
        if let Err(error) = self.store.refresh().await {
            println!("! {error}");
        }

        if let Some(cached) = self.prefs.load(PREF_SESSION_ID) {
            let _ = self.store.select(&cached);
        }

        if self.store.selected_id().is_some() {
            self.open_selected().await;
        } else {
            println!("No sessions yet. /new to start one.");
        }
    }

    /// Returns false when the console should exit.
    async fn handle_command(&mut self, command: SlashCommand) -> bool {
        match command {
            SlashCommand::Help => println!("{HELP_TEXT}"),
            SlashCommand::Sessions => {
                if let Err(error) = self.store.refresh().await {
                    // Keep showing the last known list on failure.
                    println!("! {error}");
                }
                self.print_sessions();
            }
            SlashCommand::New => match self.store.create().await {
                Ok(summary) => {
                    let _ = self.store.select(&summary.id);
                    self.app.clear_messages();
                    self.prefs.save(PREF_SESSION_ID, &summary.id);
                    println!("session {} created", summary.id);
                }
                Err(error) => println!("! {error}"),
            },
            SlashCommand::Switch(index) => {
                match self.store.sessions().get(index).map(|s| s.id.clone()) {
                    Some(session_id) => {
                        let _ = self.store.select(&session_id);
                        self.open_selected().await;
                    }
                    None => println!("No session at position {}", index + 1),
                }
            }
            SlashCommand::Delete(index) => self.delete_session(index).await,
            SlashCommand::User(user_id) => {
                self.store = SessionStore::new(self.client.clone(), user_id.clone());
                self.prefs.save(PREF_USER_ID, &user_id);
                self.app.clear_messages();
                println!("switched to user {user_id}");
                self.bootstrap().await;
            }
            SlashCommand::Quit => return false,
            SlashCommand::Malformed { usage } => println!("usage: {usage}"),
            SlashCommand::Unknown(name) => println!("Unknown command: {name} ({HELP_TEXT})"),
        }

        true
    }

    async fn delete_session(&mut self, index: Option<usize>) {
        let target = match index {
            Some(index) => self.store.sessions().get(index).map(|s| s.id.clone()),
            None => self.store.selected_id().map(str::to_string),
        };
        let Some(session_id) = target else {
            println!("Nothing to delete.");
            return;
        };

        let was_selected = self.store.selected_id() == Some(session_id.as_str());
        match self.store.delete(&session_id).await {
            Ok(()) => {
                println!("session {session_id} deleted");
                if was_selected {
                    self.app.clear_messages();
                    if self.store.selected_id().is_some() {
                        self.open_selected().await;
                    } else {
                        self.prefs.save(PREF_SESSION_ID, "");
                        println!("No sessions left. /new to start one.");
                    }
                }
            }
            // A failed delete leaves the list untouched and visible.
            Err(error) => println!("! {error}"),
        }
    }

    async fn open_selected(&mut self) {
        let Some(session_id) = self.store.selected_id().map(str::to_string) else {
            return;
        };

        match self.store.open(&session_id).await {
            Ok(messages) => {
                self.app.load_messages(messages);
                self.prefs.save(PREF_SESSION_ID, &session_id);
                println!(
                    "-- session {session_id} ({} messages) --",
                    self.app.messages().len()
                );
                print_messages(self.app.messages());
            }
            Err(error) => println!("! {error}"),
        }
    }

    async fn submit(&mut self, prompt: &str) {
        let Some(session_id) = self.store.selected_id().map(str::to_string) else {
            println!("No session selected. /new to start one.");
            return;
        };
        let user_id = self.store.user_id().to_string();

        let cancellation = CancellationSignal::default();
        let outcome = {
            let mut turn = pin!(self.driver.run_turn(
                &mut self.app,
                &mut self.view,
                &user_id,
                &session_id,
                prompt,
                Some(&cancellation),
            ));

            // Ctrl-C while streaming cancels the run instead of killing the
            // console; the stream loop observes the flag at its next poll.
            loop {
                tokio::select! {
                    outcome = &mut turn => break outcome,
                    _ = tokio::signal::ctrl_c() => {
                        cancellation.store(true, Ordering::Release);
                    }
                }
            }
        };

        match outcome {
            Ok(TurnStatus::Completed) => {}
            Ok(TurnStatus::Failed(message)) => {
                self.view.reset_line();
                println!("! turn failed: {message}");
            }
            Ok(TurnStatus::Cancelled) => {
                self.view.reset_line();
                println!("! run cancelled");
            }
            Err(error) => println!("! {error}"),
        }
    }

    fn print_sessions(&self) {
        if self.store.sessions().is_empty() {
            println!("No sessions. /new to start one.");
            return;
        }

        for (position, session) in self.store.sessions().iter().enumerate() {
            let marker = if self.store.selected_id() == Some(session.id.as_str()) {
                '*'
            } else {
                ' '
            };
            println!(
                "{marker} {}. {}  (updated {})",
                position + 1,
                session.id,
                session.last_update_label()
            );
        }
    }
}

/// Prints only the unseen growth of each published snapshot; a snapshot
/// whose prefix changed (superset redelivery) is restated on a fresh line.
#[derive(Debug, Default)]
struct ConsoleView {
    active_run: Option<RunId>,
    rendered: String,
}

impl ConsoleView {
    fn reset_line(&mut self) {
        if self.active_run.take().is_some() {
            println!();
        }
        self.rendered.clear();
    }
}

impl TranscriptView for ConsoleView {
    fn publish(&mut self, run_id: RunId, snapshot: &str) {
        if self.active_run != Some(run_id) {
            self.active_run = Some(run_id);
            self.rendered.clear();
        }

        if let Some(growth) = snapshot.strip_prefix(self.rendered.as_str()) {
            print!("{growth}");
        } else {
            print!("\n{snapshot}");
        }
        let _ = std::io::stdout().flush();
        self.rendered = snapshot.to_string();
    }

    fn finalize(&mut self, _run_id: RunId, _final_text: &str) {
        println!();
        self.active_run = None;
        self.rendered.clear();
    }
}

fn print_messages(messages: &[ChatMessage]) {
    for message in messages {
        println!("{}> {}", role_label(message.role), message.text);
    }
}

fn role_label(role: Role) -> &'static str {
    match role {
        Role::User => "you",
        Role::Assistant => "agent",
        Role::System => "note",
    }
}

fn prompt_marker() -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    write!(stdout, "> ")?;
    stdout.flush()
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
