//! Watch a bridge file and apply its selection as it changes
//!
//! Holds a small scene of named objects and polls the bridge file at a
//! fixed interval. With `--write-sample` a document is written first so the
//! loop has something to pick up.

use anyhow::{anyhow, Context};
use avatar_budget::prelude::*;
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(about = "Poll a selection bridge file and apply it to a scene")]
struct Args {
    /// Bridge file; defaults to the documents folder location
    #[arg(long)]
    path: Option<PathBuf>,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 2000)]
    interval_ms: u64,

    /// Stop after this many seconds; runs until killed when omitted
    #[arg(long)]
    duration: Option<u64>,

    /// Only load new documents, do not apply them
    #[arg(long)]
    no_auto_apply: bool,

    /// Delete marked objects after applying
    #[arg(long)]
    auto_delete: bool,

    /// Write a sample document before watching
    #[arg(long)]
    write_sample: bool,
}

fn demo_scene() -> Scene {
    let mut scene = Scene::new();
    for name in ["Body", "Hair", "Hat", "Glasses", "Jacket", "Jacket"] {
        scene.add_empty(name);
    }
    scene
}

fn sample_document() -> ExchangeDocument {
    ExchangeDocument {
        avatar_name: "Demo Avatar".to_string(),
        timestamp: "2024-01-01T00:00:00".to_string(),
        keep_objects: vec!["Body".to_string(), "Hair".to_string()],
        remove_objects: vec!["Hat".to_string(), "Jacket".to_string()],
        ..ExchangeDocument::default()
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let path = match args.path {
        Some(path) => path,
        None => default_bridge_path().ok_or_else(|| anyhow!("no home directory; pass --path"))?,
    };
    let dir = ensure_bridge_dir(&path)?;
    println!("bridge folder: {}", dir.display());

    if args.write_sample {
        sample_document()
            .write_to(&path)
            .with_context(|| format!("writing sample to {}", path.display()))?;
    }

    let mut engine = Engine::with_bridge_path(demo_scene(), &path);
    let watcher = BridgeWatcher::new(WatchConfig {
        interval: Duration::from_millis(args.interval_ms.max(10)),
        auto_apply: !args.no_auto_apply,
        auto_delete: args.auto_delete,
    });

    if let Some(secs) = args.duration {
        log::info!("stopping after {secs}s");
        let flag = watcher.enabled_flag();
        thread::spawn(move || {
            thread::sleep(Duration::from_secs(secs));
            flag.store(false, Ordering::SeqCst);
        });
    }

    let handled = watcher.run(&mut engine);
    println!("handled {handled} bridge updates");
    for (_, obj) in engine.scene().objects() {
        println!(
            "  {:<12} selected={:<5} hidden={}",
            obj.name, obj.selected, obj.hidden
        );
    }
    Ok(())
}
