use anyhow::{Context, Result};
use nutri_coach::api_connection::endpoints::Provider;
use nutri_coach::cli::{parse_args, Command};
use nutri_coach::gateway::plan_generation::{ActivityLevel, Gender, UserMetrics, WEEKDAYS};
use nutri_coach::gateway::{analyze_meal, generate_plan};
use nutri_coach::history::HistoryStore;
use std::path::Path;
use tokio::fs;

const API_KEY_ENV_VAR: &str = "OPENROUTER_API_KEY";

fn guess_image_mime(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        _ => None,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok(); // Load .env for the API key

    let cli_args = parse_args();

    // The store is owned here, at the composition root, and handed to the
    // gateways by reference. A persistent implementation would be swapped in
    // at this single point.
    let history = HistoryStore::new();
    let provider = Provider::openrouter(API_KEY_ENV_VAR);

    match cli_args.command {
        Command::Analyze { image } => {
            let path = Path::new(&image);
            let mime_type = guess_image_mime(path)
                .with_context(|| format!("Unrecognized image extension for '{}'", image))?;
            let image_bytes = fs::read(path)
                .await
                .with_context(|| format!("Failed to read image file '{}'", image))?;

            println!("Analyzing meal photo '{}' ({})...", image, mime_type);
            match analyze_meal(&provider, &history, &image_bytes, mime_type).await {
                Ok(info) => {
                    println!("\nFood items: {}", info.food_items.join(", "));
                    println!(
                        "Macros: {:.0} kcal, {:.1}g protein, {:.1}g carbs, {:.1}g fat",
                        info.macros.calories,
                        info.macros.protein,
                        info.macros.carbohydrates,
                        info.macros.fat
                    );
                    for vitamin in &info.vitamins {
                        println!("Vitamin: {} ({})", vitamin.name, vitamin.amount);
                    }
                    for mineral in &info.minerals {
                        println!("Mineral: {} ({})", mineral.name, mineral.amount);
                    }
                    println!("\n{}", info.summary);
                }
                Err(e) => {
                    eprintln!("\n{}", e);
                    return Err(anyhow::anyhow!("Meal analysis failed"));
                }
            }
        }
        Command::Plan {
            height,
            weight,
            age,
            gender,
            activity,
            goal,
        } => {
            let gender: Gender = gender.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let activity_level: ActivityLevel =
                activity.parse().map_err(|e: String| anyhow::anyhow!(e))?;
            let metrics = UserMetrics {
                height,
                weight,
                age,
                gender: Some(gender),
                activity_level: Some(activity_level),
            };

            println!("Generating your personalized plan...");
            match generate_plan(&provider, &history, &metrics, &goal).await {
                Ok(plan) => {
                    println!("\n{}\n", plan.summary);
                    for day in WEEKDAYS {
                        println!("--- {} ---", day);
                        if let Some(meal) = plan.meal_plan.get(day) {
                            println!("  Breakfast: {}", meal.breakfast);
                            println!("  Lunch:     {}", meal.lunch);
                            println!("  Dinner:    {}", meal.dinner);
                            if let Some(snacks) = &meal.snacks {
                                println!("  Snacks:    {}", snacks);
                            }
                        }
                        if let Some(workout) = plan.workout_plan.get(day) {
                            println!("  Workout:   {}", workout);
                        }
                    }
                }
                Err(e) => {
                    eprintln!("\n{}", e);
                    return Err(anyhow::anyhow!("Plan generation failed"));
                }
            }
        }
    }

    let snapshot = history.list();
    println!(
        "\nHistory: {} meal analyses, {} plans this session.",
        snapshot.meals.len(),
        snapshot.plans.len()
    );

    Ok(())
}
