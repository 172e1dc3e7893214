use chrono::Utc;
use clap::Subcommand;
use fodtrack_core::{DiaryStore, FoodSource};

#[derive(Subcommand)]
pub enum FoodAction {
    /// Log a meal by product ids
    Log {
        /// External user id
        #[arg(long)]
        user: String,
        /// Catalog product ids
        #[arg(long = "product")]
        products: Vec<i64>,
        /// User-authored product ids
        #[arg(long = "custom")]
        custom: Vec<i64>,
    },
    /// List all food log entries
    List {
        /// External user id
        #[arg(long)]
        user: String,
    },
}

pub fn run(action: FoodAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_database()?;
    let now = Utc::now();

    match action {
        FoodAction::Log {
            user,
            products,
            custom,
        } => {
            if products.is_empty() && custom.is_empty() {
                return Err("nothing to log: pass --product and/or --custom ids".into());
            }
            let user_id = db.ensure_user(&user, now)?;
            let items: Vec<FoodSource> = products
                .into_iter()
                .map(FoodSource::Catalog)
                .chain(custom.into_iter().map(FoodSource::UserAuthored))
                .collect();
            let id = db.record_food_log(user_id, now, &items)?;
            println!("recorded food log {id}");
        }
        FoodAction::List { user } => {
            let user_id = db.ensure_user(&user, now)?;
            let entries = db.food_log_entries(user_id, None)?;
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
    }
    Ok(())
}
