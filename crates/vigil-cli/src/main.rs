use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use vigil_proctoring::{
    CheatAssessment, DetectorError, InMemoryBackend, PageState, ProctoredQuiz,
    ProctoringSnapshot, QuizSessionState, VideoFrame, VigilConfig,
};
use vigil_signals::DetectionFrame;

mod scenario;

use scenario::{synthetic_face, Event, Scenario, ScriptedDevices, ScriptedModels};

#[derive(Parser)]
#[command(name = "vigil", about = "Replay proctored quiz scenarios")]
struct Cli {
    /// TOML config file; VIGIL_* environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a JSON scenario and print the final report
    Replay {
        scenario: PathBuf,
        /// Print a snapshot after every event
        #[arg(long)]
        trace: bool,
    },
    /// Print the effective configuration
    Config {},
}

#[derive(Serialize)]
struct Report<'a> {
    state: &'a PageState,
    quiz: Option<QuizSessionState>,
    proctoring: ProctoringSnapshot,
    cheat: CheatAssessment,
    claims: Vec<String>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let config = VigilConfig::load(cli.config.as_deref())?;

    match cli.cmd {
        Commands::Config {} => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        Commands::Replay { scenario, trace } => {
            let content = std::fs::read_to_string(&scenario)?;
            let scenario: Scenario = serde_json::from_str(&content)?;
            replay(scenario, config, trace)?;
        }
    }
    Ok(())
}

fn replay(
    scenario: Scenario,
    config: VigilConfig,
    trace: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let course_id = scenario.course.id.clone();
    let resolution = config.capture.resolution();

    let mut backend = InMemoryBackend::new().with_course(scenario.course);
    if let Some(profile) = scenario.profile {
        backend = backend.with_profile(profile);
    }
    backend.fail_completion = scenario.fail_completion;

    let audio = Rc::new(RefCell::new(Vec::new()));
    let queue = Rc::new(RefCell::new(VecDeque::new()));
    let mut devices = ScriptedDevices {
        script: scenario.capture,
        audio: audio.clone(),
    };
    let models = ScriptedModels {
        queue: queue.clone(),
    };

    let mut page = ProctoredQuiz::new(course_id, backend, config.clone(), 0);
    let state = page.open(&mut devices, &models, 0);
    log::info!("page opened: {:?}", state);

    let mut claims = Vec::new();
    for timed in scenario.events {
        let now_us = timed.timestamp_us();
        match timed.event {
            Event::Frame { faces, tilt, shift } => {
                let frame = DetectionFrame::new(
                    (0..faces)
                        .map(|_| synthetic_face(tilt, shift))
                        .collect(),
                );
                queue.borrow_mut().push_back(Ok(frame));
                page.on_video_frame(&VideoFrame::new(now_us, resolution));
            }
            Event::FrameError => {
                queue
                    .borrow_mut()
                    .push_back(Err(DetectorError::Inference("scripted failure".into())));
                page.on_video_frame(&VideoFrame::new(now_us, resolution));
            }
            Event::Audio { signal, gain } => {
                *audio.borrow_mut() = signal.samples(config.audio.fft_size, gain);
                page.on_animation_frame();
            }
            Event::Blur => page.on_window_blur(),
            Event::Tick => {
                page.on_timer_tick(now_us);
            }
            Event::Answer { option } => {
                if let Err(e) = page.answer(&option) {
                    log::warn!("answer rejected: {}", e);
                }
            }
            Event::Next => {
                if let Err(e) = page.next() {
                    log::warn!("next rejected: {}", e);
                }
            }
            Event::Previous => {
                if let Err(e) = page.previous() {
                    log::warn!("previous rejected: {}", e);
                }
            }
            Event::Submit => {
                if let Err(e) = page.complete() {
                    log::warn!("submit rejected: {}", e);
                }
            }
            Event::Claim => match page.claim_certificate() {
                Ok(claim) => claims.push(claim.certificate_path),
                Err(e) => {
                    log::warn!("claim refused: {}", e);
                    claims.push(format!("refused: {}", e));
                }
            },
            Event::Retake => {
                if let Err(e) = page.retake(now_us) {
                    log::warn!("retake rejected: {}", e);
                }
            }
        }
        // frames the model never consumed (slot busy) are dropped
        queue.borrow_mut().clear();

        if trace {
            println!("{}", serde_json::to_string(&page.snapshot())?);
        }
    }

    let report = Report {
        state: page.state(),
        quiz: page.quiz().map(|q| q.state()),
        proctoring: page.snapshot(),
        cheat: page.cheat_assessment(),
        claims,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    page.unmount();
    Ok(())
}
