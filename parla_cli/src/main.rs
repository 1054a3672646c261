use clap::{Parser, Subcommand};
use parla_core::config::API_KEY_ENV;
use parla_core::console::StdConsole;
use parla_core::report::write_error_entry;
use parla_core::*;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "parla")]
#[command(about = "Interactive language quiz tutor", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive quiz menu (default)
    Quiz,

    /// Drop review entries whose explanation is a provider error message
    Clean,

    /// Export the progress history as CSV
    Export {
        /// Destination CSV file
        #[arg(long, short)]
        output: PathBuf,
    },
}

/// Level sub-menu: key, label, file under `levels/`
const LEVELS: [(&str, &str, &str); 4] = [
    ("1", "A1.1", "a1_1.json"),
    ("2", "A1.2", "a1_2.json"),
    ("3", "A2.1", "a2_1.json"),
    ("4", "A2.2", "a2_2.json"),
];

/// Explanations that were really provider failures saved by older versions
const PROVIDER_ERROR_MARKERS: [&str; 2] = ["RESOURCE_EXHAUSTED", "Error generating explanation"];

const FAREWELL: &str = "Arrivederci! / Auf Wiedersehen! 👋";

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.verbose {
        parla_core::logging::init_with_level("debug");
    } else {
        parla_core::logging::init();
    }

    let config = match &cli.config {
        Some(path) => Config::load_or_default(path)?,
        None => Config::load()?,
    };
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let store = Store::new(data_dir);

    match cli.command {
        Some(Commands::Clean) => cmd_clean(&store),
        Some(Commands::Export { output }) => cmd_export(&store, &output),
        Some(Commands::Quiz) | None => cmd_quiz(&store, &config),
    }
}

/// What the main menu resolved to
enum MenuChoice {
    Session(SessionPlan),
    Back,
    Quit,
}

fn cmd_quiz(store: &Store, config: &Config) -> Result<()> {
    let api_key = match config.api_key() {
        Ok(key) => key,
        Err(e) => {
            eprintln!("❌ {}", e);
            eprintln!(
                "Set {} in your environment or provider.api_key in {}.",
                API_KEY_ENV,
                Config::default_config_path().display()
            );
            std::process::exit(1);
        }
    };

    let client = GeminiClient::new(api_key, &config.provider)?;
    let mut engine = QuizEngine::new(store, &client, RetryPolicy::from_config(&config.session));
    tracing::info!(
        "Data directory {:?}, {} local fallback questions",
        store.data_dir(),
        engine.local_questions().len()
    );

    let mut console = StdConsole::stdio();
    display_welcome(&mut console, config)?;

    loop {
        match main_menu(store, config, &mut console)? {
            MenuChoice::Quit => break,
            MenuChoice::Back => continue,
            MenuChoice::Session(plan) => {
                engine.run(plan, &mut console)?;

                console.say(format!("\n{}", "-".repeat(40)))?;
                let answer = console
                    .choice("Vuoi tornare al menu principale? (s/n) / Back to menu? (y/n): ")?
                    .unwrap_or_default();
                if !is_yes(&answer) {
                    break;
                }
                console.say("")?;
            }
        }
    }

    console.say(FAREWELL)?;
    Ok(())
}

fn cmd_clean(store: &Store) -> Result<()> {
    let path = store.errors_path();

    match store.clean_errors(&PROVIDER_ERROR_MARKERS)? {
        None => println!("No error list found at {}.", path.display()),
        Some(report) => {
            println!("Total entries before cleaning: {}", report.before);
            println!("Total entries after cleaning: {}", report.after);
            if report.unreadable > 0 {
                println!("Unreadable entries left untouched: {}", report.unreadable);
            }
            println!("✓ Cleaned {}", path.display());
        }
    }

    Ok(())
}

fn cmd_export(store: &Store, output: &Path) -> Result<()> {
    let history = store.load_progress();
    let count = parla_core::export::export_progress_csv(&history, output)?;

    println!("✓ Exported {} sessions to CSV", count);
    println!("  CSV: {}", output.display());
    Ok(())
}

fn display_welcome<R: BufRead, W: Write>(console: &mut Console<R, W>, config: &Config) -> Result<()> {
    console.say("\n╭─────────────────────────────────────────╮")?;
    console.say("│  P A R L A                              │")?;
    console.say("╰─────────────────────────────────────────╯")?;
    console.say(format!(
        "  🇮🇹 {} tutor for {} speakers 🇩🇪",
        config.provider.target_language, config.provider.learner_language
    ))?;
    Ok(())
}

fn main_menu<R: BufRead, W: Write>(
    store: &Store,
    config: &Config,
    console: &mut Console<R, W>,
) -> Result<MenuChoice> {
    console.say("\nSelect Mode:")?;
    console.say("1. Online (AI generated)")?;
    console.say("2. Offline (level files)")?;
    console.say("3. Review errors (personalized)")?;
    console.say("q. Quit")?;

    let Some(choice) = console.choice("Choice: ")? else {
        return Ok(MenuChoice::Quit);
    };

    let default_length = config.session.session_length();
    let choice = match choice.as_str() {
        "q" | "quit" | "exit" => MenuChoice::Quit,
        "1" => {
            let length = ask_session_length(console, default_length)?;
            MenuChoice::Session(
                SessionPlan::new(QuestionSource::Remote, length).with_level(&config.provider.level),
            )
        }
        "2" => match select_level(store, console)? {
            Some(pool) => {
                let length = ask_session_length(console, default_length)?;
                MenuChoice::Session(SessionPlan::new(QuestionSource::Offline(pool), length))
            }
            None => MenuChoice::Back,
        },
        "3" => match select_review(store, console)? {
            Some(pool) => MenuChoice::Session(SessionPlan::review(pool)),
            None => MenuChoice::Back,
        },
        _ => {
            console.say("❌ Invalid choice. Please try again.")?;
            MenuChoice::Back
        }
    };

    Ok(choice)
}

/// Pick a level file; `None` goes back to the main menu
fn select_level<R: BufRead, W: Write>(
    store: &Store,
    console: &mut Console<R, W>,
) -> Result<Option<Vec<QuestionRecord>>> {
    loop {
        console.say("\nSelect Level:")?;
        for (key, label, _) in LEVELS {
            console.say(format!("{}. {}", key, label))?;
        }
        console.say("b. Back to Main Menu")?;

        let Some(choice) = console.choice("Choice: ")? else {
            return Ok(None);
        };
        if choice == "b" {
            return Ok(None);
        }

        match LEVELS.iter().find(|(key, _, _)| *key == choice) {
            Some((_, _, file)) => {
                let questions = store.load_level_questions(file);
                if questions.is_empty() {
                    console.say(format!(
                        "❌ Error: Could not load questions from 'levels/{}'. File missing or empty.",
                        file
                    ))?;
                    continue;
                }
                return Ok(Some(questions));
            }
            None => console.say("❌ Invalid choice. Please try again.")?,
        }
    }
}

/// Offer the saved error list for practice; `None` goes back to the main menu
fn select_review<R: BufRead, W: Write>(
    store: &Store,
    console: &mut Console<R, W>,
) -> Result<Option<Vec<QuestionRecord>>> {
    let errors = store.load_errors();
    if errors.is_empty() {
        console.say("🎉 Great news! You have no saved errors to review.")?;
        console.say("Try a normal quiz to practice more!")?;
        return Ok(None);
    }

    console.say(format!("📂 Found {} errors to review.", errors.len()))?;
    let action = console
        .choice("Type 'p' to practice immediately, 'v' to view the list, or 'b' to go back: ")?
        .unwrap_or_default();

    match action.as_str() {
        "p" => {}
        "v" => {
            console.say("\n--- Error List ---")?;
            for (idx, error) in errors.iter().enumerate() {
                write_error_entry(console, idx + 1, error)?;
                console.say("-".repeat(30))?;
            }

            let answer = console
                .choice("\nReady to practice these errors? (y/n): ")?
                .unwrap_or_default();
            if !is_yes(&answer) {
                return Ok(None);
            }
        }
        _ => return Ok(None),
    }

    match review_pool(&errors) {
        Ok(pool) => Ok(Some(pool)),
        Err(reason) => {
            tracing::debug!("Review unavailable: {:?}", reason);
            console.say("⚠️  No valid questions to review.")?;
            Ok(None)
        }
    }
}

fn ask_session_length<R: BufRead, W: Write>(
    console: &mut Console<R, W>,
    default_length: usize,
) -> Result<usize> {
    console.say("\nHow many questions do you want to answer? (15 / 30 / 50)")?;
    let input = console
        .prompt(&format!("Number [Default {}]: ", default_length))?
        .unwrap_or_default();
    let input = input.trim();

    if input.is_empty() {
        return Ok(default_length);
    }

    match input.parse::<i64>() {
        Ok(n) if n > 0 => Ok(n as usize),
        _ => {
            console.say(format!("Invalid number. Using default: {}.", default_length))?;
            Ok(default_length)
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer, "y" | "yes" | "s" | "si" | "sì")
}
