use colored::Colorize;
use shipit_monorepo_tools::{AnalyticsStore, WorkspaceResolver};

use crate::app::App;
use crate::cli::StatsArgs;
use crate::error::Result;
use crate::output;

/// Shows (or clears) recorded publish statistics.
pub async fn run(app: App, args: StatsArgs) -> Result<()> {
    let root = match WorkspaceResolver::new(&app.cwd).initialize().await {
        Ok(workspace) => workspace.root,
        Err(_) => app.cwd.clone(),
    };
    let store = AnalyticsStore::new(&root);

    if args.clear {
        store.clear().await?;
        println!("Cleared publish statistics");
        return Ok(());
    }

    if let Some(n) = args.recent {
        let records = store.recent(n).await?;
        if args.json {
            println!("{}", output::render_json(&records));
            return Ok(());
        }

        if records.is_empty() {
            println!("No publishes recorded yet");
        }
        for record in records {
            let marker = if record.success { "ok".green() } else { "failed".red() };
            println!(
                "{}  {}  {} package(s) in {}ms  {}",
                marker,
                record.timestamp.format("%Y-%m-%d %H:%M:%S"),
                record.package_count,
                record.duration_ms,
                record.packages.join(", ")
            );
        }
        return Ok(());
    }

    let stats = store.statistics().await?;
    if args.json {
        println!("{}", output::render_json(&stats));
        return Ok(());
    }

    println!("Publishes: {} total, {} ok, {} failed", stats.total, stats.successful, stats.failed);
    println!("Success rate: {:.2}%", stats.success_rate);
    println!("Average duration: {}ms", stats.avg_duration_ms);
    println!("Packages published: {}", stats.total_packages);
    if let Some(fastest) = &stats.fastest {
        println!("Fastest: {}ms on {}", fastest.duration_ms, fastest.date);
    }
    if let Some(slowest) = &stats.slowest {
        println!("Slowest: {}ms on {}", slowest.duration_ms, slowest.date);
    }

    Ok(())
}
