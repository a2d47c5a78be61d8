use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a meal photo and print its estimated nutritional breakdown
    Analyze {
        /// Path to the meal image (jpeg, png, webp, gif or heic)
        #[arg(short, long)]
        image: String,
    },
    /// Generate a personalized 7-day meal and workout plan
    Plan {
        /// Height, unit of your choice (e.g. "180cm" or "5ft 11in")
        #[arg(long)]
        height: String,
        /// Weight, unit of your choice (e.g. "75kg")
        #[arg(long)]
        weight: String,
        #[arg(long)]
        age: String,
        /// One of: male, female, other
        #[arg(long)]
        gender: String,
        /// One of: sedentary, light, moderate, active, very_active
        #[arg(long)]
        activity: String,
        /// Primary goal, in your own words and language
        #[arg(long)]
        goal: String,
    },
}

pub fn parse_args() -> Cli {
    Cli::parse()
}
