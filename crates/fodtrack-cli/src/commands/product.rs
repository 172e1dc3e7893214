use chrono::Utc;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ProductAction {
    /// Add a catalog product (levels on the catalog scale: 0 none,
    /// 1 low, above 1 high)
    Add {
        #[arg(long)]
        name: String,
        /// Six FODMAP levels: fructose lactose fructan mannitol sorbitol gos
        #[arg(long, num_args = 6)]
        levels: Vec<u8>,
        #[arg(long)]
        serving: Option<String>,
        #[arg(long)]
        grams: Option<f64>,
    },
    /// Add a user-authored product (inverted scale: 0 high, 1 medium,
    /// 2 low)
    AddCustom {
        /// External user id
        #[arg(long)]
        user: String,
        #[arg(long)]
        name: String,
        /// Six FODMAP levels: fructose lactose fructan mannitol sorbitol gos
        #[arg(long, num_args = 6)]
        levels: Vec<u8>,
    },
    /// List the catalog
    List,
    /// List a user's authored products
    ListCustom {
        /// External user id
        #[arg(long)]
        user: String,
    },
}

fn levels_array(levels: Vec<u8>) -> Result<[u8; 6], Box<dyn std::error::Error>> {
    <[u8; 6]>::try_from(levels).map_err(|v| format!("expected 6 levels, got {}", v.len()).into())
}

pub fn run(action: ProductAction) -> Result<(), Box<dyn std::error::Error>> {
    let db = super::open_database()?;

    match action {
        ProductAction::Add {
            name,
            levels,
            serving,
            grams,
        } => {
            let id = db.add_product(&name, levels_array(levels)?, serving.as_deref(), grams)?;
            println!("added product {id}");
        }
        ProductAction::AddCustom { user, name, levels } => {
            let user_id = db.ensure_user(&user, Utc::now())?;
            let id = db.add_user_product(user_id, &name, levels_array(levels)?)?;
            println!("added custom product {id}");
        }
        ProductAction::List => {
            let products = db.list_products()?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
        ProductAction::ListCustom { user } => {
            let user_id = db.ensure_user(&user, Utc::now())?;
            let products = db.list_user_products(user_id)?;
            println!("{}", serde_json::to_string_pretty(&products)?);
        }
    }
    Ok(())
}
