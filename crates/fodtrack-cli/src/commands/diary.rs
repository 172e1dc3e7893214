use chrono::Utc;
use clap::Subcommand;
use fodtrack_core::{DiaryStore, SymptomScores};

#[derive(Subcommand)]
pub enum DiaryAction {
    /// Record a diary entry
    Add {
        /// External user id
        #[arg(long)]
        user: String,
        /// Pain severity, 0-10
        #[arg(long)]
        pain: u8,
        /// Bloating severity, 0-10
        #[arg(long)]
        bloating: u8,
        /// Gas severity, 0-10
        #[arg(long)]
        gas: u8,
        /// Nausea severity, 0-10
        #[arg(long)]
        nausea: u8,
        /// Free-text note
        #[arg(long)]
        note: Option<String>,
    },
    /// List all diary entries
    List {
        /// External user id
        #[arg(long)]
        user: String,
    },
}

pub fn run(action: DiaryAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_database()?;
    let now = Utc::now();

    match action {
        DiaryAction::Add {
            user,
            pain,
            bloating,
            gas,
            nausea,
            note,
        } => {
            let user_id = db.ensure_user(&user, now)?;
            let scores = SymptomScores::new(pain, bloating, gas, nausea)?;
            let id = db.record_diary_entry(user_id, scores, note.as_deref(), now)?;
            println!("recorded diary entry {id}");
        }
        DiaryAction::List { user } => {
            let user_id = db.ensure_user(&user, now)?;
            let entries = db.diary_entries(user_id, None)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
