use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use clinic_voice::{
    CaptureBackend, Config, MicCapture, NewTimeSlot, PlaybackSink, SAMPLE_RATE, SpeakerSink,
    SpeechBackend, SpeechClient, TimeSlotClient, UiAction, VoiceSession,
};

/// Clinic Voice - voice scheduling client for the clinic appointment portal
#[derive(Parser)]
#[command(name = "clinic-voice", version, about)]
struct Cli {
    /// Backend base URL
    #[arg(short, long, env = "CLINIC_SERVER_URL")]
    server: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Disable voice features (for machines without audio hardware)
    #[arg(long, env = "CLINIC_DISABLE_VOICE")]
    disable_voice: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Synthesize a text via the backend and play it
    Say {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the clinic voice system.")]
        text: String,
    },
    /// Manage doctor availability slots
    Slots {
        #[command(subcommand)]
        command: SlotsCommand,
    },
}

#[derive(Subcommand)]
enum SlotsCommand {
    /// List all availability slots
    List,
    /// Add an availability slot
    Add {
        /// Slot date (YYYY-MM-DD)
        date: chrono::NaiveDate,
        /// Start time (HH:MM)
        start: String,
        /// End time (HH:MM)
        end: String,
    },
    /// Delete an availability slot by id
    Delete {
        /// Slot id
        id: i64,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,clinic_voice=info",
        1 => "info,clinic_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

#[allow(clippy::future_not_send)]
async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load_with_options(cli.server.as_deref(), cli.disable_voice)?;

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker(),
            Command::Say { text } => say(&config, &text).await,
            Command::Slots { command } => slots(&config, command).await,
        };
    }

    run_session(&config).await
}

/// Run the interactive voice session until the user quits
///
/// Exactly one session affordance is offered per state; errors are
/// printed and the loop continues with the state machine intact.
#[allow(clippy::future_not_send)]
async fn run_session(config: &Config) -> anyhow::Result<()> {
    if !config.voice.enabled {
        anyhow::bail!("voice is disabled; nothing to do");
    }

    tracing::info!(server = %config.server_url, "starting voice session");

    let speech = SpeechClient::new(&config.server_url);
    let capture = MicCapture::new();
    let sink = SpeakerSink::new()?;
    let mut session = VoiceSession::new(speech, capture, sink, &config.greeting);

    loop {
        let action = session.ui_action();
        let label = match action {
            UiAction::Start => "Start",
            UiAction::StartRecording => "Start Recording",
            UiAction::StopRecording => "Stop Recording",
        };

        let choice = dialoguer::Select::new()
            .with_prompt("Clinic voice session")
            .items(&[label, "Quit"])
            .default(0)
            .interact()?;

        if choice == 1 {
            break;
        }

        let result = match action {
            UiAction::Start => session.start_session().await,
            UiAction::StartRecording => session.start_recording(),
            UiAction::StopRecording => session.stop_recording().await,
        };

        if let Err(e) = result {
            eprintln!("error: {e}");
        }
    }

    Ok(())
}

/// Test microphone input
#[allow(clippy::future_not_send)]
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = MicCapture::new();
    capture.start()?;

    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let energy = capture.level();
        let buffered = capture.buffered();

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!("[{:2}s] RMS: {energy:.4} | samples: {buffered} | [{meter}]", i + 1);
    }

    let clip = capture.stop().await?;
    println!("\n---");
    println!("Captured {} bytes of WAV audio.", clip.len());
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let sink = SpeakerSink::new()?;

    // Generate 2 seconds of 440Hz sine wave
    let sample_rate = 24000_u32;
    let frequency = 440.0_f32;
    let duration_secs = 2.0_f32;
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let num_samples = (sample_rate as f32 * duration_secs) as usize;

    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3 // 30% volume
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    sink.play_samples(samples)?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Synthesize a text via the backend and play it locally
#[allow(clippy::future_not_send)]
async fn say(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Synthesizing: \"{text}\"");

    let speech = SpeechClient::new(&config.server_url);
    let clip = speech.synthesize(text).await?;
    println!("Got {} bytes of audio ({})", clip.len(), clip.content_type());

    let mut sink = SpeakerSink::new()?;
    sink.play(&clip).await?;

    println!("\n---");
    println!("If you heard the speech, the backend and speakers are working!");

    Ok(())
}

/// Slot administration subcommands
async fn slots(config: &Config, command: SlotsCommand) -> anyhow::Result<()> {
    let client = TimeSlotClient::new(&config.server_url);

    match command {
        SlotsCommand::List => {
            let slots = client.list().await?;
            if slots.is_empty() {
                println!("No availability slots.");
                return Ok(());
            }
            for slot in slots {
                let booked = if slot.is_booked { " (booked)" } else { "" };
                println!(
                    "{:>4}  {}  {}-{}{booked}",
                    slot.id, slot.date, slot.start_time, slot.end_time
                );
            }
        }
        SlotsCommand::Add { date, start, end } => {
            let created = client
                .create(&NewTimeSlot {
                    date,
                    start_time: start,
                    end_time: end,
                })
                .await?;
            println!(
                "Added slot {} on {} {}-{}",
                created.id, created.date, created.start_time, created.end_time
            );
        }
        SlotsCommand::Delete { id } => {
            let slots = client.list().await?;
            let slot = slots
                .iter()
                .find(|s| s.id == id)
                .ok_or_else(|| anyhow::anyhow!("no slot with id {id}"))?;
            client.delete(slot).await?;
            println!("Deleted slot {id}");
        }
    }

    Ok(())
}
