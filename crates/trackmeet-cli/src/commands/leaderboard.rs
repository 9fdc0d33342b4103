use clap::Subcommand;
use serde_json::json;
use trackmeet_core::storage::Database;
use trackmeet_core::{ActivityType, Config, LeaderboardEntry};

#[derive(Subcommand)]
pub enum LeaderboardAction {
    /// Submit (or replace) a subject's score
    Submit {
        /// Activity slug
        #[arg(long)]
        activity: ActivityType,
        /// Subject identifier
        #[arg(long)]
        subject: String,
        /// Score in the activity's native unit
        #[arg(long)]
        score: f64,
        /// Location tag
        #[arg(long)]
        location: Option<String>,
    },
    /// Show the ranked leaderboard for an activity
    Show {
        /// Activity slug
        #[arg(long)]
        activity: ActivityType,
        /// Only rank entries from this location
        #[arg(long)]
        location: Option<String>,
    },
}

pub fn run(action: LeaderboardAction) -> Result<(), Box<dyn std::error::Error>> {
    let mut db = Database::open()?;

    match action {
        LeaderboardAction::Submit {
            activity,
            subject,
            score,
            location,
        } => {
            let score = if score == 0.0 { 0.0 } else { score };
            let tier = Config::load_or_default().classifier().classify(score, activity);
            let entry = LeaderboardEntry {
                subject_id: subject,
                display_score: score,
                score_unit: activity.unit(),
                tier,
                location,
            };
            let id = db.submit_entry(activity, &entry)?;
            let output = json!({ "id": id, "activity": activity, "entry": entry });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        LeaderboardAction::Show { activity, location } => {
            let board = db.leaderboard(activity)?;
            let output = json!({
                "activity": activity,
                "location": location,
                "locations": board.locations(),
                "entries": board.ranked(location.as_deref()),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}
