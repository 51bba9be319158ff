//! A terminal front-end for the research agent.

#[macro_use]
extern crate tracing;

use std::io::Write as _;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use research_agent::{
    ChatError, ChatSession, Provider, ResearchAgentFactory, Role, Settings,
};
use tokio::io::{self, AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio::select;
use tokio::time::sleep;

const BAR_CHAR: &str = "▎";

const HELP: &str = "\
/key openai   re-enter the OpenAI API key
/key serper   re-enter the Serper API key
/new          start a new chat
/clear        clear the chat history
/history      show the chat history
/help         show this help
/quit         exit";

type Session = ChatSession<ResearchAgentFactory>;

#[derive(Debug, PartialEq, Eq)]
enum Command<'a> {
    Key(Provider),
    NewChat,
    Clear,
    History,
    Help,
    Quit,
    Unknown(&'a str),
    Message(&'a str),
}

impl<'a> Command<'a> {
    fn parse(line: &'a str) -> Self {
        if !line.starts_with('/') {
            return Command::Message(line);
        }
        let mut words = line.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("/key"), Some(provider), None) => {
                match provider.to_ascii_lowercase().as_str() {
                    "openai" => Command::Key(Provider::OpenAI),
                    "serper" => Command::Key(Provider::Serper),
                    _ => Command::Unknown(line),
                }
            }
            (Some("/new"), None, _) => Command::NewChat,
            (Some("/clear"), None, _) => Command::Clear,
            (Some("/history"), None, _) => Command::History,
            (Some("/help"), None, _) => Command::Help,
            (Some("/quit" | "/exit"), None, _) => Command::Quit,
            _ => Command::Unknown(line),
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let settings = Settings::from_env();
    print_header(&settings);

    let initial_keys = [
        (Provider::OpenAI, settings.openai_api_key.clone()),
        (Provider::Serper, settings.serper_api_key.clone()),
    ];
    let mut session = ChatSession::new(ResearchAgentFactory::new(settings));
    for (provider, key) in initial_keys {
        match key {
            Some(key) => session.set_credential(provider, key),
            None => prompt_key(&mut session, provider),
        }
        print_key_status(&session, provider);
    }
    if let Err(err) = session.prepare() {
        print_error(&err);
    }
    println!(
        "\nWhat would you like to research? Type {} for the commands.\n",
        "/help".bold()
    );

    let mut lines = BufReader::new(io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = read_line(&mut lines).await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::parse(line) {
            Command::Key(provider) => {
                prompt_key(&mut session, provider);
                print_key_status(&session, provider);
            }
            Command::NewChat => {
                session.new_chat();
                println!("🔄 Started a new chat.\n");
            }
            Command::Clear => {
                let removed = session.clear_history();
                println!(
                    "🗑️  Chat history cleared! ({removed} messages removed)\n"
                );
            }
            Command::History => print_history(&session),
            Command::Help => println!("{HELP}\n"),
            Command::Quit => break,
            Command::Unknown(command) => {
                println!("Unknown command: {command}. Type /help for help.\n");
            }
            Command::Message(message) => research(&mut session, message).await,
        }
    }
}

async fn research(session: &mut Session, message: &str) {
    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let progress_bar = ProgressBar::new_spinner();
    progress_bar.set_style(progress_style);
    progress_bar.set_message("🔬 Researching...");

    let send = session.send_message(message);
    tokio::pin!(send);
    let result = loop {
        progress_bar.inc(1);
        select! {
            result = &mut send => break result,
            _ = sleep(Duration::from_millis(100)) => {}
        }
    };

    // Finish the progress bar before printing anything else.
    progress_bar.finish_and_clear();

    match result {
        Ok(reply) => print_turn(Role::Assistant, &reply),
        Err(err) => print_error(&err),
    }
}

async fn read_line(lines: &mut Lines<BufReader<Stdin>>) -> Option<String> {
    match lines.next_line().await {
        Ok(line) => line,
        Err(err) => {
            error!("error reading input: {}", err);
            None
        }
    }
}

fn prompt_key(session: &mut Session, provider: Provider) {
    let prompt = if provider.is_required() {
        format!("🔑 Enter your {provider} API key: ")
    } else {
        format!("🔍 Enter your {provider} API key (optional, Enter to skip): ")
    };
    match rpassword::prompt_password(prompt) {
        Ok(key) => session.set_credential(provider, key.trim()),
        Err(err) => error!("error reading the {provider} API key: {err}"),
    }
}

fn print_header(settings: &Settings) {
    println!("{}", "🔬 Research Agent".bold());
    println!("Powered by {}\n", settings.agent_model);
    println!("{}", "🤖 Agent Information".bold());
    println!("  Model:   {}", settings.agent_model.bright_white());
    println!("  Memory:  🟢 Enabled (summaries by {})", settings.summary_model);
    println!(
        "  Tools:   {}\n",
        ResearchAgentFactory::tool_names().join(", ")
    );
}

fn print_key_status(session: &Session, provider: Provider) {
    let present = session.credentials().is_present(provider);
    match (provider, present) {
        (_, true) => println!("✅ {provider} API key configured"),
        (Provider::OpenAI, false) => {
            let warning = "⚠️  Please enter your OpenAI API key to start";
            println!("{}", warning.yellow());
        }
        (Provider::Serper, false) => {
            println!("ℹ️  Serper key optional for web search");
        }
    }
}

fn print_history(session: &Session) {
    if session.history().is_empty() {
        println!("No messages yet.\n");
        return;
    }
    for turn in session.history() {
        print_turn(turn.role, &turn.content);
    }
}

fn print_turn(role: Role, content: &str) {
    let (bar, icon) = match role {
        Role::User => (BAR_CHAR.bright_green().to_string(), "🧑"),
        Role::Assistant => (BAR_CHAR.bright_cyan().to_string(), "🤖"),
    };
    let mut lines = content.lines();
    println!("{bar}{icon} {}", lines.next().unwrap_or_default().bright_white());
    for line in lines {
        println!("{bar}{}", line.bright_white());
    }
    println!();
}

fn print_error(err: &ChatError) {
    match err {
        ChatError::MissingCredential => {
            println!("{}\n", format!("⚠️  {err}").yellow());
        }
        _ => println!("{}\n", format!("❌ {err}").red()),
    }
}
