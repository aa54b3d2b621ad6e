//! Preview: render a personalised story in the terminal.
//!
//! Usage: preview [--theme <tag>] [--name <name>] [--age <n>]
//!                [--interests <a,b>] [--friend <name>] [--fears <text>]
//!                [--place <text>] [--json] [--illustrate]
//!
//! `--illustrate` runs the full generation flow against the illustration
//! service from the environment (the local stub unless
//! STORYBOOK_ILLUSTRATION_API is set) and prints each page as it arrives.

use std::process;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use storybook_engine::core::assembler::StoryAssembler;
use storybook_engine::core::config::ServiceConfig;
use storybook_engine::core::onboarding::GenerationTask;
use storybook_engine::core::progress::ProgressReadout;
use storybook_engine::core::session::SessionStore;
use storybook_engine::schema::profile::{ChildProfile, PhotoHandle, Theme};
use storybook_engine::schema::story::Story;
use strum::IntoEnumIterator;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

struct Options {
    profile: ChildProfile,
    json: bool,
    illustrate: bool,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return;
    }

    let options = match parse_args(&args[1..]) {
        Ok(options) => options,
        Err(message) => {
            eprintln!("ERROR: {}", message);
            print_usage();
            process::exit(1);
        }
    };
    init_logging();

    if let Err(e) = options.profile.validate() {
        eprintln!("ERROR: invalid profile: {}", e);
        process::exit(1);
    }

    let assembler = match StoryAssembler::builtin() {
        Ok(assembler) => Arc::new(assembler),
        Err(e) => {
            eprintln!("ERROR: failed to load themes: {}", e);
            process::exit(1);
        }
    };

    if options.illustrate {
        if let Err(e) = illustrate(assembler, options.profile) {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
        return;
    }

    let story = match assembler.assemble(&options.profile) {
        Ok(story) => story,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    };
    if options.json {
        match serde_json::to_string_pretty(&story) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        }
    } else {
        print_story(&story);
    }
}

fn print_usage() {
    println!("Usage: preview [--theme <tag>] [--name <name>] [--age <n>]");
    println!("               [--interests <a,b>] [--friend <name>] [--fears <text>]");
    println!("               [--place <text>] [--json] [--illustrate]");
    println!();
    println!("Themes:");
    for theme in Theme::iter() {
        let meta = theme.meta();
        println!("  {:<13} {} {}", theme.tag(), meta.emoji, meta.label);
    }
}

fn init_logging() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut profile = ChildProfile {
        name: "Alex".to_string(),
        age: 6,
        theme: Theme::default(),
        interests: vec!["drawing".to_string()],
        best_friend: String::new(),
        fears: String::new(),
        favorite_place: "the park".to_string(),
        photos: vec![
            PhotoHandle("preview://photo-1".to_string()),
            PhotoHandle("preview://photo-2".to_string()),
        ],
    };
    let mut json = false;
    let mut illustrate = false;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value", flag))
        };
        match arg.as_str() {
            "--theme" => {
                let tag = value("--theme")?;
                profile.theme =
                    Theme::from_str(&tag).map_err(|_| format!("unknown theme '{}'", tag))?;
            }
            "--name" => profile.name = value("--name")?,
            "--age" => {
                let age = value("--age")?;
                profile.age = age.parse().map_err(|_| format!("bad age '{}'", age))?;
            }
            "--interests" => {
                profile.interests = value("--interests")?
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
            }
            "--friend" => profile.best_friend = value("--friend")?,
            "--fears" => profile.fears = value("--fears")?,
            "--place" => profile.favorite_place = value("--place")?,
            "--json" => json = true,
            "--illustrate" => illustrate = true,
            other => return Err(format!("unknown argument: {}", other)),
        }
    }

    Ok(Options {
        profile,
        json,
        illustrate,
    })
}

fn print_story(story: &Story) {
    let meta = story.theme.meta();
    println!("{} {}", meta.emoji, story.title);
    println!("{}\n", "=".repeat(story.title.chars().count() + 3));
    for page in &story.pages {
        println!("[{}] {}", page.id, page.glyph);
        println!("{}", page.text);
        match &page.illustration_url {
            Some(url) => println!("  art: {}", url),
            None => println!("  prompt: {}", page.illustration_prompt),
        }
        println!();
    }
}

fn illustrate(
    assembler: Arc<StoryAssembler>,
    profile: ChildProfile,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let store = SessionStore::new();
        let mut updates = store.subscribe();
        let task = GenerationTask::spawn(
            store.clone(),
            assembler,
            config.illustration_service(),
            profile,
        );

        let mut last = None;
        while !task.is_finished() {
            match tokio::time::timeout(POLL_INTERVAL, updates.changed()).await {
                Ok(Ok(())) => {}
                Ok(Err(_)) => break,
                Err(_) => continue,
            }
            let progress = updates.borrow_and_update().generation_progress;
            if last != Some(progress) {
                let readout = ProgressReadout::at(progress);
                println!("{:>3}% {} {}", readout.percent, readout.stage.icon, readout.stage.label);
                last = Some(progress);
            }
        }

        let outcome = task.join().await?;
        tracing::info!(?outcome, "generation finished");
        if let Some(story) = store.snapshot().story {
            println!();
            print_story(&story);
        }
        Ok::<(), Box<dyn std::error::Error>>(())
    })
}
