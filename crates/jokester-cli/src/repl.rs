//! REPL – drive the running skill from the terminal.
//!
//! Supported slash-commands:
//!   /help           – show this list
//!   /status         – session state, joke cursor, last clip, timers
//!   /face <label>   – simulate a recognized face (default "unknown person")
//!   /keyphrase      – simulate the wake-up key phrase
//!   /pause /resume  – host pause / resume
//!   /cancel         – host cancel
//!   /quit | /exit   – dispose the skill and exit

use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::thread;

use jokester_middleware::EventBus;
use jokester_skill::{BehaviorCoordinator, RobotSkill, SkillParameters};
use jokester_types::{Event, EventPayload};
use tokio::sync::mpsc::UnboundedSender;

/// Source name stamped on events the operator injects.
const OPERATOR: &str = "jokester-cli";

/// A parsed REPL line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Status,
    Face(String),
    KeyPhrase,
    Pause,
    Resume,
    Cancel,
    Quit,
    Empty,
    Unknown(String),
}

/// Whether the REPL keeps running after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub fn parse(line: &str) -> Command {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };
    match head {
        "" => Command::Empty,
        "/help" => Command::Help,
        "/status" => Command::Status,
        "/face" if rest.is_empty() => Command::Face("unknown person".to_string()),
        "/face" => Command::Face(rest.to_string()),
        "/keyphrase" => Command::KeyPhrase,
        "/pause" => Command::Pause,
        "/resume" => Command::Resume,
        "/cancel" => Command::Cancel,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(line.to_string()),
    }
}

/// Read stdin on a plain thread and forward each line.  Ends on EOF, on a
/// read error, or when the receiver is gone.
pub fn spawn_reader<T, F>(tx: UnboundedSender<T>, wrap: F)
where
    T: Send + 'static,
    F: Fn(String) -> T + Send + 'static,
{
    thread::spawn(move || {
        let stdin = io::stdin();
        loop {
            print!("{} ", "jokester>".bold().cyan());
            io::stdout().flush().ok();

            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) => {
                    let _ = tx.send(wrap("/quit".to_string()));
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    eprintln!("{}: {}", "Read error".red(), e);
                    break;
                }
            }
            if tx.send(wrap(line)).is_err() {
                break;
            }
        }
    });
}

/// Run one command against the skill.
pub async fn execute(command: Command, skill: &BehaviorCoordinator, bus: &EventBus) -> Flow {
    let params = SkillParameters::new();
    match command {
        Command::Empty => {}
        Command::Help => cmd_help(),
        Command::Status => cmd_status(skill),
        Command::Face(label) => {
            let delivered = bus.publish(Event::new(
                OPERATOR,
                EventPayload::FaceRecognition { label: label.clone() },
            ));
            println!("  Face {} shown to {} listener(s).", label.bold(), delivered);
        }
        Command::KeyPhrase => {
            let delivered = bus.publish(Event::new(
                OPERATOR,
                EventPayload::KeyPhraseRecognized { confidence: 100 },
            ));
            if delivered == 0 {
                println!("  {}", "Key phrase recognition is off (set JOKESTER_KEY_PHRASE=1).".dimmed());
            }
        }
        Command::Pause => {
            skill.on_pause(&params).await;
            println!("{}", "  Paused.".yellow());
        }
        Command::Resume => {
            let starter = skill.clone();
            tokio::spawn(async move { starter.on_resume(&SkillParameters::new()).await });
            println!("{}", "  Resuming – the robot introduces itself again.".green());
        }
        Command::Cancel => {
            skill.on_cancel(&params).await;
            println!("{}", "  Cancelled. Use /resume to start over.".yellow());
        }
        Command::Quit => {
            println!("{}", "Goodbye.".green());
            return Flow::Quit;
        }
        Command::Unknown(other) => {
            println!(
                "{} '{}'. Type {} for available commands.",
                "Unknown command:".red(),
                other.yellow(),
                "/help".bold()
            );
        }
    }
    Flow::Continue
}

fn cmd_help() {
    println!();
    println!("{}", "Jokester Commands".bold().underline());
    println!("  {}        – session state and joke progress", "/status".bold().cyan());
    println!("  {}  – simulate a recognized face", "/face <label>".bold().cyan());
    println!("  {}     – simulate the wake-up key phrase", "/keyphrase".bold().cyan());
    println!("  {} – host pause / resume", "/pause  /resume".bold().cyan());
    println!("  {}        – host cancel", "/cancel".bold().cyan());
    println!("  {}   – exit", "/quit  /exit".bold().cyan());
    println!();
}

fn cmd_status(skill: &BehaviorCoordinator) {
    let manifest = skill.manifest();
    println!("{}", "Skill Status".bold().underline());
    println!("  Skill        : {} ({})", manifest.name.bold(), manifest.id);
    println!("  State        : {}", skill.state().to_string().yellow());
    println!(
        "  Next joke    : {} of {}",
        skill.joke_cursor() + 1,
        skill.config().script.joke_clips.len()
    );
    println!(
        "  Last clip    : {}",
        skill.last_completed_audio().unwrap_or_else(|| "–".to_string())
    );
    println!("  Timers       : {}", skill.active_timers());
    if skill.is_disposed() {
        println!("  {}", "Disposed".red());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_commands() {
        assert_eq!(parse("/help"), Command::Help);
        assert_eq!(parse("  /status \n"), Command::Status);
        assert_eq!(parse("/keyphrase"), Command::KeyPhrase);
        assert_eq!(parse("/pause"), Command::Pause);
        assert_eq!(parse("/resume"), Command::Resume);
        assert_eq!(parse("/cancel"), Command::Cancel);
        assert_eq!(parse("/exit"), Command::Quit);
        assert_eq!(parse(""), Command::Empty);
    }

    #[test]
    fn face_takes_the_rest_of_the_line_as_label() {
        assert_eq!(parse("/face Daddy"), Command::Face("Daddy".to_string()));
        assert_eq!(
            parse("/face  unknown person "),
            Command::Face("unknown person".to_string())
        );
        assert_eq!(parse("/face"), Command::Face("unknown person".to_string()));
    }

    #[test]
    fn unknown_input_is_echoed_back() {
        assert_eq!(parse("tell me a joke"), Command::Unknown("tell me a joke".to_string()));
    }

    #[tokio::test]
    async fn quit_ends_the_loop_and_face_reaches_the_bus() {
        use jokester_hal::SimRobot;
        use jokester_middleware::Topic;
        use jokester_skill::SkillConfig;
        use std::sync::Arc;

        let bus = EventBus::default();
        let robot = Arc::new(SimRobot::builder().build());
        let skill = BehaviorCoordinator::new(robot, bus.clone(), SkillConfig::default()).unwrap();
        let mut faces = bus.subscribe_to(Topic::FaceRecognition);

        assert_eq!(execute(parse("/face Daddy"), &skill, &bus).await, Flow::Continue);
        let event = faces.recv().await.expect("face event");
        assert_eq!(event.payload, EventPayload::FaceRecognition { label: "Daddy".to_string() });

        assert_eq!(execute(Command::Quit, &skill, &bus).await, Flow::Quit);
    }
}
