use clap::{Parser, Subcommand};
use inquire::Text;

use crate::config::PlannerConfig;
use crate::error::PlannerError;
use crate::models::plan::{PlanOutcome, PlanningDay};
use crate::service::calendar_service::GoogleCalendarService;
use crate::service::openai_service::OpenAIService;
use crate::service::plan_flow;

#[derive(Parser)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Dry run: print the model's proposals without writing anything
    Suggest {
        date: String,
        tasks: Vec<String>,
    },
    /// Run the full pipeline and write the placed events
    Plan {
        date: String,
        tasks: Vec<String>,
    },
    /// Like plan, but asks for the task list interactively
    PlanPrompt {
        date: String,
    },
}

pub async fn cli(config: PlannerConfig) {
    // Fine to panic here
    let cli = Cli::parse();
    match &cli.command {
        Commands::Suggest { date, tasks } => {
            if let Err(e) = suggest(&config, date, tasks.clone()).await {
                println!("Suggest failed: {}", e);
            }
        }
        Commands::Plan { date, tasks } => {
            if let Err(e) = plan(&config, date, tasks.clone()).await {
                println!("Plan failed: {}", e);
            }
        }
        Commands::PlanPrompt { date } => {
            let tasks = match specify_tasks() {
                Ok(tasks) => tasks,
                Err(e) => {
                    println!("No tasks supplied: {}", e);
                    return;
                }
            };
            if let Err(e) = plan(&config, date, tasks).await {
                println!("Plan failed: {}", e);
            }
        }
    }
}

async fn suggest(config: &PlannerConfig, date: &str, tasks: Vec<String>) -> Result<(), PlannerError> {
    let day = parse_day(date)?;
    let calendar = GoogleCalendarService::from_config(config)?;
    let proposer = OpenAIService::from_config(config)?;
    let proposals = plan_flow::suggest(&calendar, &proposer, &day, &tasks).await?;
    for proposal in proposals {
        println!(
            "{} -> {}  {}",
            proposal.window.start.to_rfc3339(),
            proposal.window.end.to_rfc3339(),
            proposal.task
        );
    }
    Ok(())
}

async fn plan(config: &PlannerConfig, date: &str, tasks: Vec<String>) -> Result<(), PlannerError> {
    let day = parse_day(date)?;
    let calendar = GoogleCalendarService::from_config(config)?;
    let proposer = OpenAIService::from_config(config)?;
    let outcome = plan_flow::plan(&calendar, &proposer, &day, &tasks).await?;
    print_outcome(&outcome);
    Ok(())
}

fn print_outcome(outcome: &PlanOutcome) {
    for event in &outcome.written {
        println!(
            "placed   {} -> {}  {}",
            event.window.start.to_rfc3339(),
            event.window.end.to_rfc3339(),
            event.task
        );
    }
    for failure in &outcome.failures {
        println!("failed   {} ({})", failure.task, failure.reason);
    }
    for task in &outcome.unscheduled {
        println!("skipped  {}", task);
    }
}

fn parse_day(date: &str) -> Result<PlanningDay, PlannerError> {
    PlanningDay::parse(date).ok_or(PlannerError::InvalidRequest(
        "date must be YYYY-MM-DD".to_string(),
    ))
}

fn specify_tasks() -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let raw = Text::new("Enter your tasks, separated by commas.").prompt()?;
    let tasks: Vec<String> = raw
        .split(',')
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if tasks.is_empty() {
        return Err("No tasks provided".into());
    }
    Ok(tasks)
}
