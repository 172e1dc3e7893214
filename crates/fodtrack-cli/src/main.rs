use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "fodtrack-cli", version, about = "Fodtrack CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Symptom diary
    Diary {
        #[command(subcommand)]
        action: commands::diary::DiaryAction,
    },
    /// Food logging
    Food {
        #[command(subcommand)]
        action: commands::food::FoodAction,
    },
    /// Product catalog management
    Product {
        #[command(subcommand)]
        action: commands::product::ProductAction,
    },
    /// Phase tracking and streaks
    Phase {
        #[command(subcommand)]
        action: commands::phase::PhaseAction,
    },
}

fn main() {
    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Diary { action } => commands::diary::run(action),
        Commands::Food { action } => commands::food::run(action),
        Commands::Product { action } => commands::product::run(action),
        Commands::Phase { action } => commands::phase::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
