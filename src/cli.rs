use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;
use crate::providers::ModelChoice;

#[derive(Parser, Debug)]
#[command(name = "ai-world")]
#[command(version)]
#[command(about = "Chat, personalities, diagrams and translation on top of hosted LLMs (OpenRouter)")]
pub struct Args {
    /// OpenRouter API key (overrides OPENROUTER_API_KEY and the config file)
    #[arg(long, global = true)]
    pub api_key: Option<String>,

    /// Model from the built-in catalogue
    #[arg(long, short, global = true, value_enum)]
    pub model: Option<ModelChoice>,

    /// Any OpenRouter model id (wins over --model)
    #[arg(long, global = true)]
    pub model_id: Option<String>,

    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Free chat; interactive when no message is given
    Chat {
        message: Option<String>,
    },

    /// Chat with one of the personalities; interactive when no message is given
    Persona {
        /// business, creative, technical, friendly or academic
        #[arg(long, short, default_value = "business")]
        personality: String,

        message: Option<String>,
    },

    /// List personalities and their conversation starters
    Personas,

    /// Generate a Mermaid software diagram from a description
    Diagram {
        #[arg(required_unless_present = "examples")]
        prompt: Option<String>,

        /// List example prompts and exit
        #[arg(long)]
        examples: bool,

        /// Print only the extracted Mermaid source
        #[arg(long)]
        code_only: bool,

        /// Write the extracted Mermaid source to this file
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Translate text, detecting the source language
    Translate {
        #[arg(required_unless_present = "examples")]
        text: Option<String>,

        /// List quick-translate examples and exit
        #[arg(long)]
        examples: bool,

        /// Target language name or ISO code
        #[arg(long, short, default_value = "English")]
        to: String,
    },

    /// List supported target languages
    Languages,

    /// Serve the browser UI
    Web {
        #[arg(long, default_value = "8501")]
        port: u16,

        /// Do not try to open a browser
        #[arg(long)]
        no_open: bool,
    },

    /// Print shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Model id to send: `--model-id`, else `--model`, else the configured default.
pub fn resolve_model(settings: &Settings, model: Option<ModelChoice>, model_id: Option<&str>) -> String {
    if let Some(id) = model_id.map(str::trim).filter(|s| !s.is_empty()) {
        return id.to_string();
    }
    match model {
        Some(m) => m.model_id().to_string(),
        None => settings.default_model.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_model_default() {
        assert_eq!(resolve_model(&Settings::default(), None, None), "deepseek/deepseek-v3.2");
    }

    #[test]
    fn test_resolve_model_choice() {
        assert_eq!(
            resolve_model(&Settings::default(), Some(ModelChoice::Gemini), None),
            "google/gemini-2.5-flash"
        );
    }

    #[test]
    fn test_resolve_model_id_wins() {
        assert_eq!(
            resolve_model(&Settings::default(), Some(ModelChoice::Claude), Some("openai/gpt-4o")),
            "openai/gpt-4o"
        );
    }

    #[test]
    fn test_resolve_model_blank_id_ignored() {
        assert_eq!(
            resolve_model(&Settings::default(), Some(ModelChoice::Claude), Some("  ")),
            "anthropic/claude-sonnet-4"
        );
    }

    #[test]
    fn test_args_parse_chat_interactive() {
        let args = Args::parse_from(["ai-world", "chat"]);
        assert!(matches!(args.command, Command::Chat { message: None }));
        assert!(args.api_key.is_none());
        assert!(args.model.is_none());
    }

    #[test]
    fn test_args_parse_chat_message() {
        let args = Args::parse_from(["ai-world", "chat", "hello there"]);
        match args.command {
            Command::Chat { message } => assert_eq!(message.as_deref(), Some("hello there")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_global_flags_after_subcommand() {
        let args = Args::parse_from(["ai-world", "chat", "hi", "--model", "claude", "--api-key", "sk"]);
        assert_eq!(args.model, Some(ModelChoice::Claude));
        assert_eq!(args.api_key.as_deref(), Some("sk"));
    }

    #[test]
    fn test_args_persona_default() {
        let args = Args::parse_from(["ai-world", "persona"]);
        match args.command {
            Command::Persona { personality, message } => {
                assert_eq!(personality, "business");
                assert!(message.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_persona_short_flag() {
        let args = Args::parse_from(["ai-world", "persona", "-p", "technical", "explain closures"]);
        match args.command {
            Command::Persona { personality, message } => {
                assert_eq!(personality, "technical");
                assert_eq!(message.as_deref(), Some("explain closures"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_diagram() {
        let args = Args::parse_from(["ai-world", "diagram", "login flow", "--code-only", "-o", "out.mmd"]);
        match args.command {
            Command::Diagram { prompt, code_only, output, .. } => {
                assert_eq!(prompt.as_deref(), Some("login flow"));
                assert!(code_only);
                assert_eq!(output, Some(PathBuf::from("out.mmd")));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_translate_default_target() {
        let args = Args::parse_from(["ai-world", "translate", "Bonjour"]);
        match args.command {
            Command::Translate { text, to, .. } => {
                assert_eq!(text.as_deref(), Some("Bonjour"));
                assert_eq!(to, "English");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_examples_without_input() {
        let args = Args::parse_from(["ai-world", "diagram", "--examples"]);
        assert!(matches!(args.command, Command::Diagram { prompt: None, examples: true, .. }));
        let args = Args::parse_from(["ai-world", "translate", "--examples"]);
        assert!(matches!(args.command, Command::Translate { text: None, examples: true, .. }));
    }

    #[test]
    fn test_args_input_required_without_examples() {
        assert!(Args::try_parse_from(["ai-world", "diagram"]).is_err());
        assert!(Args::try_parse_from(["ai-world", "translate", "--to", "French"]).is_err());
    }

    #[test]
    fn test_args_web_defaults() {
        let args = Args::parse_from(["ai-world", "web"]);
        match args.command {
            Command::Web { port, no_open } => {
                assert_eq!(port, 8501);
                assert!(!no_open);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_args_completions() {
        let args = Args::parse_from(["ai-world", "completions", "bash"]);
        assert!(matches!(args.command, Command::Completions { shell: clap_complete::Shell::Bash }));
    }

    #[test]
    fn test_args_rejects_unknown_model() {
        assert!(Args::try_parse_from(["ai-world", "chat", "--model", "gpt5"]).is_err());
    }

    #[test]
    fn test_args_config_path() {
        let args = Args::parse_from(["ai-world", "--config", "ai.toml", "languages"]);
        assert_eq!(args.config, Some(PathBuf::from("ai.toml")));
        assert!(matches!(args.command, Command::Languages));
    }
}
