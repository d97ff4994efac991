use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use proshield_offline::{
    AppConfig, CacheStorage, CacheWorker, FileStore, HttpNetwork, HttpUploader,
    MemoryCacheStorage, MemoryClients, OfflineQueue, format_date, format_file_size, sync_pending,
};

fn print_usage() {
    eprintln!("Usage: proshield-offline [--config <path>] <command>");
    eprintln!();
    eprintln!("Queue commands:");
    eprintln!("  queue list              Show queued offline reports");
    eprintln!("  queue count             Print the number of queued reports");
    eprintln!("  queue add <json>        Queue a report object");
    eprintln!("  queue remove <id>       Remove one queued report");
    eprintln!("  queue clear             Delete the whole queue");
    eprintln!("  queue sync <origin>     Upload queued reports to <origin>");
    eprintln!();
    eprintln!("Worker commands:");
    eprintln!("  precache <origin>       Install and activate against <origin>, listing cached URLs");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --config <path>         Config file (default: platform config dir)");
    eprintln!("  -h, --help              Show this help");
}

fn usage_error(msg: &str) -> ! {
    eprintln!("Error: {msg}");
    eprintln!();
    print_usage();
    std::process::exit(1);
}

#[tokio::main]
async fn main() -> proshield_offline::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut config_path: Option<PathBuf> = None;
    let mut positional = Vec::new();

    let args: Vec<String> = env::args().skip(1).collect();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                return Ok(());
            }
            "--config" => {
                i += 1;
                match args.get(i) {
                    Some(path) => config_path = Some(PathBuf::from(path)),
                    None => usage_error("--config requires a value"),
                }
            }
            _ => positional.push(args[i].clone()),
        }
        i += 1;
    }

    let config = AppConfig::load(&config_path.unwrap_or_else(AppConfig::default_path))?;
    let positional: Vec<&str> = positional.iter().map(String::as_str).collect();

    match positional.as_slice() {
        ["queue", rest @ ..] => run_queue(&config, rest).await,
        ["precache", origin] => run_precache(&config, origin).await,
        [] => {
            print_usage();
            std::process::exit(1);
        }
        _ => usage_error("unknown command"),
    }
}

async fn run_queue(config: &AppConfig, args: &[&str]) -> proshield_offline::Result<()> {
    let store = FileStore::new(config.queue.data_dir.clone());
    let queue = OfflineQueue::with_key(store, &config.queue.storage_key);

    match args {
        ["list"] => {
            let reports = queue.list()?;
            for report in &reports {
                let queued_at = chrono::DateTime::from_timestamp_millis(report.offline_id)
                    .and_then(|dt| format_date(&dt.to_rfc3339()))
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}",
                    report.offline_id,
                    queued_at,
                    serde_json::to_string(&report.payload())?
                );
            }
            let bytes: usize = reports
                .iter()
                .map(|r| r.payload().to_string().len())
                .sum();
            println!(
                "{} queued ({})",
                reports.len(),
                format_file_size(bytes as u64)
            );
        }
        ["count"] => println!("{}", queue.count()?),
        ["add", json] => {
            let report: serde_json::Value = serde_json::from_str(json)?;
            println!("{}", queue.save(&report)?);
        }
        ["remove", id] => {
            let Ok(id) = id.parse::<i64>() else {
                usage_error("report id must be a number");
            };
            queue.remove(id)?;
        }
        ["clear"] => queue.clear()?,
        ["sync", origin] => {
            let uploader = HttpUploader::new(origin, &config.queue.upload_path)?;
            let summary = sync_pending(&queue, &uploader).await?;
            println!(
                "Uploaded {}, {} remaining",
                summary.uploaded, summary.remaining
            );
        }
        _ => usage_error("unknown queue command"),
    }
    Ok(())
}

async fn run_precache(config: &AppConfig, origin: &str) -> proshield_offline::Result<()> {
    let caches = Arc::new(MemoryCacheStorage::new());
    let worker = CacheWorker::new(
        config.worker.clone().with_origin(origin),
        Arc::clone(&caches),
        Arc::new(HttpNetwork::new(origin)?),
        Arc::new(MemoryClients::new()),
    );

    worker.install().await?;
    if worker.state() != proshield_offline::WorkerState::Activated {
        worker.activate().await?;
    }

    let name = worker.config().static_cache_name();
    for url in worker.config().precache_urls() {
        let key = proshield_offline::Request::get(url.as_str()).cache_key(origin);
        if let Some(response) = caches.match_in(&name, &key).await? {
            println!(
                "{}  {}  {}",
                response.status.as_u16(),
                format_file_size(response.body.len() as u64),
                url
            );
        }
    }
    println!("{} ready in {name}", worker.config().cache_version);
    Ok(())
}
