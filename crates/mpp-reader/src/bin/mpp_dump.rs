use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mpp_model::ProjectFile;
use mpp_reader::{read_mpp_path, ReadOptions};
use serde::Serialize;

#[derive(Clone, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(about = "Decode a Microsoft Project .mpp file and print what was read.")]
struct Args {
    /// Project file to read.
    input: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Emit the whole decoded document instead of a summary (JSON only).
    #[arg(long)]
    full: bool,

    /// Skip timephased work curves.
    #[arg(long)]
    no_timephased: bool,

    /// Skip baseline curves.
    #[arg(long)]
    no_baselines: bool,

    /// Read files flagged as password protected.
    #[arg(long)]
    allow_password_protected: bool,
}

#[derive(Debug, Serialize)]
struct JsonSummary<'a> {
    input: &'a str,
    generation: u8,
    application_version: Option<u32>,
    calendars: usize,
    tasks: usize,
    resources: usize,
    assignments: usize,
    relations: usize,
    sub_projects: usize,
    split_tasks: usize,
    timephased_assignments: usize,
    ignored_errors: Vec<&'a str>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let options = ReadOptions {
        read_timephased: !args.no_timephased,
        read_baselines: !args.no_baselines,
        allow_password_protected: args.allow_password_protected,
    };
    let project = read_mpp_path(&args.input, &options)
        .with_context(|| format!("reading {}", args.input.display()))?;

    for error in &project.ignored_errors {
        eprintln!("warning: {error}");
    }

    match args.format {
        OutputFormat::Text => {
            if args.full {
                anyhow::bail!("--full requires --format json");
            }
            print_text(&args, &project);
            Ok(())
        }
        OutputFormat::Json => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            if args.full {
                serde_json::to_writer_pretty(&mut handle, &project)?;
            } else {
                let input = args.input.to_string_lossy().into_owned();
                serde_json::to_writer_pretty(&mut handle, &summary(&input, &project))?;
            }
            handle.write_all(b"\n")?;
            Ok(())
        }
    }
}

fn summary<'a>(input: &'a str, project: &'a ProjectFile) -> JsonSummary<'a> {
    JsonSummary {
        input,
        generation: project.properties.generation.number(),
        application_version: project.properties.application_version,
        calendars: project.calendars.len(),
        tasks: project.tasks.len(),
        resources: project.resources.len(),
        assignments: project.assignments.len(),
        relations: project.relations.len(),
        sub_projects: project.sub_projects.len(),
        split_tasks: project.tasks.iter().filter(|t| !t.splits.is_empty()).count(),
        timephased_assignments: project
            .assignments
            .iter()
            .filter(|a| !a.timephased.is_empty())
            .count(),
        ignored_errors: project
            .ignored_errors
            .iter()
            .map(|e| e.message.as_str())
            .collect(),
    }
}

fn print_text(args: &Args, project: &ProjectFile) {
    let properties = &project.properties;
    println!("Project file: {}", args.input.display());
    println!("  generation: {}", properties.generation.number());
    if let Some(version) = properties.application_version {
        println!("  application version: {version}");
    }
    if let Some(name) = &properties.default_calendar_name {
        println!("  default calendar: {name}");
    }
    println!();

    println!("Calendars ({})", project.calendars.len());
    for calendar in &project.calendars {
        println!(
            "  {:>5}  {}{}",
            calendar.unique_id,
            calendar.name.as_deref().unwrap_or("(unnamed)"),
            calendar
                .parent_unique_id
                .map(|base| format!(" (base {base})"))
                .unwrap_or_default()
        );
    }

    println!("Tasks ({})", project.tasks.len());
    for task in &project.tasks {
        let split = if task.splits.is_empty() {
            String::new()
        } else {
            format!(" [{} split ranges]", task.splits.len())
        };
        println!(
            "  {:>5}  {:>5}  {}{split}",
            task.id.map(|id| id.to_string()).unwrap_or_default(),
            task.unique_id,
            task.name.as_deref().unwrap_or("")
        );
    }

    if !project.sub_projects.is_empty() {
        println!("Sub-projects ({})", project.sub_projects.len());
        for sub_project in &project.sub_projects {
            println!(
                "  task {:>5}  {}",
                sub_project
                    .task_unique_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                sub_project.path().unwrap_or("(no path)")
            );
        }
    }

    println!("Resources ({})", project.resources.len());
    for resource in &project.resources {
        println!(
            "  {:>5}  {}",
            resource.unique_id,
            resource.name.as_deref().unwrap_or("")
        );
    }

    println!("Assignments ({})", project.assignments.len());
    for assignment in &project.assignments {
        let resource = assignment
            .resource_unique_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:>5}  task {:>5}  resource {:>5}  {} planned / {} complete segments",
            assignment.unique_id,
            assignment.task_unique_id,
            resource,
            assignment.timephased.planned_work.len(),
            assignment.timephased.complete_work.len()
        );
    }

    println!("Relations ({})", project.relations.len());
    if !project.ignored_errors.is_empty() {
        println!();
        println!("Ignored errors: {}", project.ignored_errors.len());
    }
}
