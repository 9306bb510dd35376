//! hive-worker — pulls tasks from a Hive master, runs them, and returns
//! the results.

use anyhow::{Context, Result};

mod cmd;

const DEFAULT_MASTER: &str = "127.0.0.1:5678";

fn print_usage() {
    println!("Usage: hive-worker [options] <command>");
    println!();
    println!("Commands:");
    println!("  run           Join the job and work tasks until it completes");
    println!("  status        Show the master's job and worker status");
    println!("  discover      Print the master's advertised address");
    println!();
    println!("Options:");
    println!("  --master <addr>   Master host:port (default: {DEFAULT_MASTER})");
    println!("  --id <id>         Connection id (default: worker-<pid>)");
    println!("  --work-dir <dir>  Working directory for task files (default: ./hive-work)");
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut master = DEFAULT_MASTER.to_string();
    let mut connection_id = format!("worker-{}", std::process::id());
    let mut work_dir = std::path::PathBuf::from("hive-work");
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--master" => {
                i += 1;
                master = args.get(i).context("--master requires a value")?.clone();
            }
            "--id" => {
                i += 1;
                connection_id = args.get(i).context("--id requires a value")?.clone();
            }
            "--work-dir" => {
                i += 1;
                work_dir = args.get(i).context("--work-dir requires a value")?.into();
            }
            other => remaining.push(other),
        }
        i += 1;
    }

    match remaining.as_slice() {
        ["run"] => cmd::run::run(&master, &connection_id, work_dir).await,
        ["status"] | [] => cmd::status::status(&master).await,
        ["discover"] => cmd::status::discover(&master).await,
        ["help"] | ["--help"] | ["-h"] => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
