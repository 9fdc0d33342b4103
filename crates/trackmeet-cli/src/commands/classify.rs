use clap::Args;
use serde_json::json;
use trackmeet_core::{ActivityType, Config};

#[derive(Args)]
pub struct ClassifyArgs {
    /// Activity slug
    #[arg(long)]
    activity: ActivityType,
    /// Raw score in the activity's native unit
    #[arg(long)]
    score: f64,
}

pub fn run(args: ClassifyArgs) -> Result<(), Box<dyn std::error::Error>> {
    let classifier = Config::load_or_default().classifier();
    let tier = classifier.classify(args.score, args.activity);
    let output = json!({
        "activity": args.activity,
        "score": args.score,
        "unit": args.activity.unit(),
        "tier": tier,
        "thresholds": classifier.thresholds(args.activity),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
