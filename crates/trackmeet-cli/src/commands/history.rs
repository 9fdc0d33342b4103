use clap::Args;
use trackmeet_core::storage::Database;

#[derive(Args)]
pub struct HistoryArgs {
    /// Maximum number of sessions to list, newest first
    #[arg(long, default_value_t = 20)]
    limit: usize,
}

pub fn run(args: HistoryArgs) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;
    let sessions = db.recent_sessions(args.limit)?;
    println!("{}", serde_json::to_string_pretty(&sessions)?);
    Ok(())
}
