use std::io::{self, Write};
use std::path::Path;

use clap::{CommandFactory, Parser};
use colored::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use ai_world::chat::Conversation;
use ai_world::cli::{resolve_model, Args, Command};
use ai_world::config::Settings;
use ai_world::diagram::{self, NOT_FOUND_MESSAGE};
use ai_world::error::{AppError, Result};
use ai_world::extract::ExtractionResult;
use ai_world::personas::{find_personality, PersonaSession};
use ai_world::terminal::{self, StreamPrinter};
use ai_world::translate;
use ai_world::{web, CompletionClient};

// ---------------------------------------------------------------------------
// Turns
// ---------------------------------------------------------------------------

/// Send the conversation plus `input`, printing the reply as it streams.
async fn run_turn(client: &CompletionClient, model: &str, conversation: &mut Conversation, input: &str) -> Result<()> {
    conversation.push_user(input);
    print!("{} ", "AI:".bright_green().bold());
    io::stdout().flush()?;

    let mut printer = StreamPrinter::new();
    let reply = client
        .stream_chat(model, &conversation.request_messages(), |snapshot| {
            print!("{}", printer.delta(snapshot));
            let _ = io::stdout().flush();
        })
        .await?;
    println!();

    conversation.push_assistant(reply);
    Ok(())
}

async fn interactive(client: &CompletionClient, model: &str, conversation: &mut Conversation, title: &str) -> Result<()> {
    println!("{}", terminal::banner(title, model));
    println!("{}", "Type /clear to start over, /quit to exit.".dimmed());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", "You:".bright_cyan().bold());
        io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            println!();
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/clear" => {
                conversation.clear();
                println!("{}", "Conversation cleared.".bright_blue());
            }
            input => {
                if let Err(e) = run_turn(client, model, conversation, input).await {
                    println!();
                    eprintln!("{}", terminal::error_lines(&e));
                }
            }
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

async fn run_diagram(
    client: &CompletionClient,
    model: &str,
    prompt: &str,
    code_only: bool,
    output: Option<&Path>,
) -> Result<()> {
    let mut printer = StreamPrinter::new();
    let result = diagram::generate_diagram(client, model, prompt, |snapshot| {
        if !code_only {
            print!("{}", printer.delta(snapshot));
            let _ = io::stdout().flush();
        }
    })
    .await?;
    if !code_only {
        println!("\n");
    }
    println!("{}", terminal::render_diagram(&result, code_only));

    if let Some(path) = output {
        match &result.diagram {
            ExtractionResult::Found(code) => {
                tokio::fs::write(path, format!("{code}\n")).await?;
                eprintln!("{} {}", "Saved diagram to".bright_green(), path.display());
            }
            _ => eprintln!("{}", format!("{NOT_FOUND_MESSAGE} Nothing written.").yellow()),
        }
    }
    Ok(())
}

async fn run_translate(client: &CompletionClient, model: &str, text: &str, to: &str) -> Result<()> {
    let target = translate::find_language(to).ok_or_else(|| {
        AppError::InvalidInput(format!(
            "Unsupported target language: {to}. Run `ai-world languages` for the list."
        ))
    })?;
    eprintln!("{}", "Translating...".dimmed());
    let outcome = translate::translate(client, model, text, target).await?;
    println!("{}", terminal::render_translation(&outcome));
    Ok(())
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(args.config.as_deref())?.with_api_key(args.api_key.clone());
    let model = resolve_model(&settings, args.model, args.model_id.as_deref());
    tracing::debug!(?settings, %model, "settings resolved");

    match args.command {
        Command::Personas => println!("{}", terminal::render_personas()),
        Command::Languages => println!("{}", terminal::render_languages()),
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Args::command(), "ai-world", &mut io::stdout());
        }
        Command::Web { port, no_open } => {
            web::serve(port, settings.with_default_model(model), !no_open).await?;
        }
        Command::Chat { message } => {
            let client = CompletionClient::new(&settings)?;
            let mut conversation = Conversation::new();
            match message {
                Some(msg) => run_turn(&client, &model, &mut conversation, &msg).await?,
                None => {
                    println!("{}", terminal::render_models());
                    interactive(&client, &model, &mut conversation, "AI Chat Assistant").await?;
                }
            }
        }
        Command::Persona { personality, message } => {
            let chosen = find_personality(&personality).ok_or_else(|| {
                AppError::InvalidInput(format!(
                    "Unknown personality: {personality}. Run `ai-world personas` for the list."
                ))
            })?;
            let client = CompletionClient::new(&settings)?;
            let mut session = PersonaSession::new(chosen);
            match message {
                Some(msg) => run_turn(&client, &model, session.conversation_mut(), &msg).await?,
                None => {
                    println!("{}\n", terminal::render_personality(chosen));
                    let title = format!("Chat with {}", chosen.title());
                    interactive(&client, &model, session.conversation_mut(), &title).await?;
                }
            }
        }
        Command::Diagram { examples: true, .. } => println!("{}", terminal::render_diagram_examples()),
        Command::Diagram { prompt, code_only, output, .. } => {
            let prompt = prompt.unwrap_or_default();
            diagram::diagram_messages(&prompt)?;
            let client = CompletionClient::new(&settings)?;
            run_diagram(&client, &model, &prompt, code_only, output.as_deref()).await?;
        }
        Command::Translate { examples: true, .. } => println!("{}", terminal::render_translate_examples()),
        Command::Translate { text, to, .. } => {
            let text = text.unwrap_or_default();
            let client = CompletionClient::new(&settings)?;
            run_translate(&client, &model, &text, &to).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args).await {
        match &e {
            AppError::InvalidInput(msg) => eprintln!("{}", msg.yellow()),
            _ => eprintln!("{}", terminal::error_lines(&e)),
        }
        std::process::exit(1);
    }
    Ok(())
}
