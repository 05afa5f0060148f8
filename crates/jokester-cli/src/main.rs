//! `jokester` – run the joke-telling skill against a simulated robot.
//!
//! The binary:
//!
//! 1. Initialises tracing (optional OTLP export).
//! 2. Loads `~/.jokester/config.toml`, writing the defaults on first run.
//! 3. Builds a [`SimRobot`] that reports audio completion after a simulated
//!    clip duration, and the [`EventBus`] the skill listens on.
//! 4. Starts the skill and drops the operator into a REPL.
//! 5. Cancels the skill on **Ctrl-C** and times it out after the configured
//!    host timeout.  Disposes it on exit.

mod config;
mod repl;

use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

use jokester_hal::SimRobot;
use jokester_middleware::EventBus;
use jokester_skill::{BehaviorCoordinator, RobotSkill, SkillParameters, telemetry};
use jokester_types::{Event, EventPayload, RobotCommand};

use crate::repl::Flow;

/// Everything the main loop reacts to.
enum Input {
    Line(String),
    Interrupt,
    Timeout,
}

fn main() {
    // Before the runtime exists: the OTLP exporter is synchronous.
    let _telemetry = telemetry::init_tracing("jokester");

    print_banner();

    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  {} Default config written to {}",
                    "✓".green().bold(),
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Error saving config".red(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}: {}", "Failed to start async runtime".red(), e);
            return;
        }
    };
    runtime.block_on(run(cfg));
}

async fn run(cfg: config::Config) {
    let bus = EventBus::default();
    let robot = Arc::new(build_robot(&cfg, &bus));

    let skill = match BehaviorCoordinator::new(robot, bus.clone(), cfg.skill.clone()) {
        Ok(skill) => skill,
        Err(e) => {
            println!("{}: {}", "Invalid skill settings".red(), e);
            return;
        }
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<Input>();

    let ctrlc_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – cancelling the skill …".yellow().bold());
        let _ = ctrlc_tx.send(Input::Interrupt);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; Ctrl-C will not cancel the skill");
    }

    let timeout = Duration::from_secs(cfg.skill_timeout_secs);
    let timeout_tx = tx.clone();
    tokio::spawn(async move {
        tokio::time::sleep(timeout).await;
        let _ = timeout_tx.send(Input::Timeout);
    });

    let manifest = skill.manifest();
    info!(skill = %manifest.name, id = %manifest.id, ?timeout, "starting skill");
    let starter = skill.clone();
    tokio::spawn(async move { starter.on_start(&SkillParameters::new()).await });

    println!();
    println!("  Type {} for a list of commands.\n", "/help".bold().cyan());
    repl::spawn_reader(tx, Input::Line);

    while let Some(input) = rx.recv().await {
        match input {
            Input::Line(line) => {
                if repl::execute(repl::parse(&line), &skill, &bus).await == Flow::Quit {
                    break;
                }
            }
            Input::Interrupt => {
                skill.on_cancel(&SkillParameters::new()).await;
                println!("{}", "  ✓ Skill cancelled.".green());
                break;
            }
            Input::Timeout => {
                println!();
                println!("{}", "⏱  Skill timed out.".yellow().bold());
                skill.on_timeout(&SkillParameters::new()).await;
            }
        }
    }

    if skill.dispose() {
        println!("{}", "  ✓ Skill resources released.".green());
    }
}

/// A simulated robot carrying the configured catalogs.  With auto-complete
/// on, every `PlayAudio` publishes its completion event after `clip_ms`.
fn build_robot(cfg: &config::Config, bus: &EventBus) -> SimRobot {
    let script = &cfg.skill.script;
    let mut builder = SimRobot::builder()
        .with_audio(cfg.sim.audio_catalog(script))
        .with_images(cfg.sim.image_catalog(script));

    if cfg.sim.auto_complete {
        let bus = bus.clone();
        let clip = Duration::from_millis(cfg.sim.clip_ms);
        let handle = tokio::runtime::Handle::current();
        builder = builder.observe(move |command| {
            if let RobotCommand::PlayAudio { name, .. } = command {
                let bus = bus.clone();
                let name = name.clone();
                handle.spawn(async move {
                    tokio::time::sleep(clip).await;
                    bus.publish(Event::new("sim-robot", EventPayload::AudioPlayComplete { name }));
                });
            }
        });
    }
    builder.build()
}

fn print_banner() {
    println!();
    println!("{}", r#"       __      __               __           "#.bold().cyan());
    println!("{}", r#"      / /___  / /_____  _______/ /____  _____"#.bold().cyan());
    println!("{}", r#" __  / / __ \/ //_/ _ \/ ___/ __/ _ \/ ___/"#.bold().cyan());
    println!("{}", r#"/ /_/ / /_/ / ,< /  __(__  ) /_/  __/ /    "#.bold().cyan());
    println!("{}", r#"\____/\____/_/|_|\___/____/\__/\___/_/     "#.bold().cyan());
    println!();
    println!("  {}", "A joke-telling robot skill on a simulated robot".dimmed());
    println!();
}
