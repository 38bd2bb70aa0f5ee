//! pico wizard - step-by-step search strategy builder
//!
//! Walks through Title → PICO → Concepts → Search Terms → Query, calling the
//! LLM for each generative step and letting the user accept, regenerate or
//! edit the result before moving on.

mod session;

use clap::Parser;
use pico::{
    generate_concepts_from_pico, generate_pico_from_title, generate_search_terms_for_concepts,
    refine_pico, LlmConfig, OpenAiClient, PicoElement,
};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use session::{Step, WizardSession};
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "pico_wizard")]
#[command(about = "Build a literature search strategy from a research title")]
struct Args {
    /// Model to use
    #[arg(short, long, default_value = "gpt-4o")]
    model: String,

    /// Backend LLM URL (defaults to the OpenAI API)
    #[arg(short = 'u', long)]
    backend_url: Option<String>,

    /// Backend API key (uses OPENAI_API_KEY env var if not provided)
    #[arg(short = 'k', long)]
    backend_key: Option<String>,

    /// Temperature for sampling (overrides the per-step defaults)
    #[arg(short, long)]
    temperature: Option<f32>,

    /// Research title to start with
    #[arg(long)]
    title: Option<String>,

    /// Verbose mode (log LLM calls)
    #[arg(short, long)]
    verbose: bool,
}

/// What the user typed at a step prompt
enum Input {
    Line(String),
    Quit,
}

fn read_input(rl: &mut DefaultEditor, prompt: &str) -> Input {
    match rl.readline(prompt) {
        Ok(line) => {
            let line = line.trim().to_string();
            if !line.is_empty() {
                let _ = rl.add_history_entry(line.as_str());
            }
            Input::Line(line)
        }
        Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Input::Quit,
        Err(e) => {
            eprintln!("Error: {}", e);
            Input::Quit
        }
    }
}

fn print_progress(session: &WizardSession) {
    println!("─────────────────────────────────────────────────────────────");
    for line in session.progress() {
        println!("  {}", line);
    }
    println!("─────────────────────────────────────────────────────────────");
}

fn print_pico(session: &WizardSession) {
    for element in PicoElement::ALL {
        println!("  {:<13} {}", format!("{}:", element), session.pico.get(element));
    }
}

fn print_concepts(session: &WizardSession) {
    for (i, concept) in session.concepts.iter().enumerate() {
        println!("  {}. {}", i + 1, concept);
    }
}

fn print_terms(session: &WizardSession) {
    for (concept, terms) in session.terms.iter() {
        println!("  {}", concept);
        println!("    MeSH Terms: {}", terms.mesh_terms.join("; "));
        println!("    Text Terms: {}", terms.text_terms.join("; "));
    }
}

/// Returns false when the user quits
fn step_title(session: &mut WizardSession, client: &OpenAiClient, rl: &mut DefaultEditor) -> bool {
    let title = match read_input(rl, "Research title (Enter or 'skip' to go straight to PICO): ") {
        Input::Line(line) => line,
        Input::Quit => return false,
    };
    let title = title.trim();
    if title.is_empty() || title.eq_ignore_ascii_case("skip") {
        match session.skip_title() {
            Ok(()) => println!("Skipped the title. Fill in the PICO elements by hand."),
            Err(e) => println!("{}", e),
        }
        return true;
    }
    if let Err(e) = session.complete_title(title) {
        println!("{}", e);
        return true;
    }
    if !session.pico_generated {
        println!("Generating PICO elements...");
        match generate_pico_from_title(client, &session.title) {
            Ok(pico) => {
                session.set_generated_pico(pico);
                println!("PICO elements generated successfully.");
            }
            Err(e) => println!("{} You can fill in the PICO by hand.", e),
        }
    }
    true
}

fn step_pico(session: &mut WizardSession, client: &OpenAiClient, rl: &mut DefaultEditor) -> bool {
    if !session.title.is_empty() {
        println!("Title: {}", session.title);
    }
    print_pico(session);
    let command = match read_input(rl, "[a]ccept, [r]efine, [e]dit, [b]ack: ") {
        Input::Line(line) => line.to_lowercase(),
        Input::Quit => return false,
    };

    match command.as_str() {
        "a" | "accept" => match session.complete_pico() {
            Ok(()) => println!("PICO input completed. Proceeding to the next step."),
            Err(e) => println!("{}", e),
        },
        "r" | "refine" => {
            println!("Refining PICO elements...");
            match refine_pico(client, &session.pico) {
                Ok(refined) => session.pico = refined,
                Err(e) => println!("{}", e),
            }
        }
        "e" | "edit" => {
            let field = match read_input(rl, "Element (population/intervention/comparison/outcome): ") {
                Input::Line(line) => line,
                Input::Quit => return false,
            };
            let Some(element) = PicoElement::from_label(&field) else {
                println!("Unknown PICO element: {}", field);
                return true;
            };
            match read_input(rl, &format!("{}: ", element)) {
                Input::Line(value) => session.pico.set(element, value),
                Input::Quit => return false,
            }
        }
        "b" | "back" => session.go_back(Step::Title),
        _ => println!("Unknown command: {}", command),
    }
    true
}

fn step_concepts(session: &mut WizardSession, client: &OpenAiClient, rl: &mut DefaultEditor) -> bool {
    if session.concepts.is_empty() {
        println!("Extracting concepts...");
        match generate_concepts_from_pico(client, &session.pico) {
            Ok(concepts) => session.concepts = concepts,
            Err(e) => println!("{}", e),
        }
    }
    print_concepts(session);

    let command = match read_input(rl, "[a]ccept, [g]enerate again, add <concept>, remove <n>, [b]ack: ") {
        Input::Line(line) => line,
        Input::Quit => return false,
    };

    if let Some(concept) = command.strip_prefix("add ") {
        session.concepts.push(concept.trim().to_string());
        return true;
    }
    if let Some(index) = command.strip_prefix("remove ") {
        match index.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= session.concepts.len() => {
                session.concepts.remove(n - 1);
            }
            _ => println!("No concept numbered {}", index.trim()),
        }
        return true;
    }

    match command.to_lowercase().as_str() {
        "a" | "accept" => {
            if let Err(e) = session.complete_concepts() {
                println!("{}", e);
            }
        }
        "g" | "generate" => session.concepts.clear(),
        "b" | "back" => session.go_back(Step::Pico),
        _ => println!("Unknown command: {}", command),
    }
    true
}

fn step_search_terms(
    session: &mut WizardSession,
    client: &OpenAiClient,
    rl: &mut DefaultEditor,
) -> bool {
    if session.terms.is_empty() {
        println!("Generating search terms for {} concepts...", session.concepts.len());
        match generate_search_terms_for_concepts(client, session.concepts.as_slice()) {
            Ok(terms) => session.terms = terms,
            Err(e) => println!("{}", e),
        }
    }
    print_terms(session);

    let command = match read_input(rl, "[a]ccept, [g]enerate again, [b]ack: ") {
        Input::Line(line) => line.to_lowercase(),
        Input::Quit => return false,
    };
    match command.as_str() {
        "a" | "accept" => {
            if let Err(e) = session.complete_search_terms() {
                println!("{}", e);
            }
        }
        "g" | "generate" => session.terms = Default::default(),
        "b" | "back" => {
            session.terms = Default::default();
            session.go_back(Step::Concepts);
        }
        _ => println!("Unknown command: {}", command),
    }
    true
}

fn step_query(session: &mut WizardSession, rl: &mut DefaultEditor) -> bool {
    println!("PubMed query:");
    println!();
    println!("{}", session.query());
    println!();

    let command = match read_input(rl, "[d]one, [b]ack: ") {
        Input::Line(line) => line.to_lowercase(),
        Input::Quit => return false,
    };
    match command.as_str() {
        "d" | "done" => {
            if let Err(e) = session.complete_query() {
                println!("{}", e);
            }
        }
        "b" | "back" => session.go_back(Step::SearchTerms),
        _ => println!("Unknown command: {}", command),
    }
    true
}

fn main() {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::WARN };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = LlmConfig::new(&args.model);
    if let Some(url) = &args.backend_url {
        config = config.with_base_url(url);
    }
    if let Some(key) = &args.backend_key {
        config = config.with_api_key(key);
    }
    if let Some(t) = args.temperature {
        config = config.with_temperature(t);
    }

    let client = match OpenAiClient::new(config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to create LLM client: {}", e);
            std::process::exit(1);
        }
    };

    let mut rl = match DefaultEditor::new() {
        Ok(r) => r,
        Err(e) => {
            eprintln!("Failed to initialize readline: {}", e);
            std::process::exit(1);
        }
    };

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║              Systematic Review Search Assistant              ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
    println!("Model: {}", args.model);
    println!("Use Ctrl+C or Ctrl+D to exit.");

    let mut session = WizardSession::new();
    if let Some(title) = &args.title {
        // Goes through the same path as a typed title, including PICO generation
        if session.complete_title(title).is_ok() {
            match generate_pico_from_title(&client, &session.title) {
                Ok(pico) => session.set_generated_pico(pico),
                Err(e) => println!("{}", e),
            }
        }
    }

    loop {
        println!();
        print_progress(&session);

        let keep_going = match session.current_step() {
            Some(Step::Title) => step_title(&mut session, &client, &mut rl),
            Some(Step::Pico) => step_pico(&mut session, &client, &mut rl),
            Some(Step::Concepts) => step_concepts(&mut session, &client, &mut rl),
            Some(Step::SearchTerms) => step_search_terms(&mut session, &client, &mut rl),
            Some(Step::Query) => step_query(&mut session, &mut rl),
            None => {
                println!("All steps completed!");
                false
            }
        };

        if !keep_going {
            println!("\nGoodbye!");
            break;
        }
    }
}
