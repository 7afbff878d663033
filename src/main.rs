mod cue;
mod error;
mod loader;
mod parser;
mod sync;

use crate::cue::{format_time, Cue};
use crate::loader::{CaptionSession, HttpSource};
use crate::parser::Parser;

use std::io::{self, Read, Write};

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vttsync=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(()) => (),
        Err(err) => {
            eprintln!("An error occurred: {}", err);
            for cause in err.chain().skip(1) {
                eprintln!("    {}", cause);
            }
            std::process::exit(1);
        }
    }
}

#[derive(ClapParser)]
#[command(about = "Parse WebVTT captions and look up the cue active at a playback time")]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE|URL",
        help = "The captions to read: a file path, an http(s) URL, or '-' for standard input.",
        default_value = "-"
    )]
    input: String,
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        help = "Print the text of the cue active at this playback time instead of listing all cues."
    )]
    at: Option<f64>,
    #[arg(
        short,
        long,
        value_enum,
        default_value = "text",
        help = "Output format for the cue listing."
    )]
    format: OutputFormat,
    #[arg(
        long,
        help = "Emit a trailing cue even when it is not terminated by a blank line."
    )]
    flush_trailing: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

async fn run() -> Result<()> {
    let cli = Cli::parse();

    let parser = Parser::with_options(cli.flush_trailing);

    let cues = if cli.input.starts_with("http://") || cli.input.starts_with("https://") {
        let session = CaptionSession::new(HttpSource::new());
        session
            .load(&parser, &cli.input)
            .await
            .context(format!("Failed to load captions from '{}'", cli.input))?
            .unwrap_or_default()
    } else {
        let data = if cli.input == "-" {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Failed to read from stdin")?;
            buffer
        } else {
            std::fs::read_to_string(&cli.input)
                .context(format!("Failed to open input file: '{}'", cli.input))?
        };
        parser
            .parse(&data)
            .context(format!("Failed to parse captions: '{}'", cli.input))?
    };

    if let Some(time) = cli.at {
        if let Some(index) = sync::active_cue(&cues, Some(time)) {
            print!("{}", cues[index].text);
        }
        return Ok(());
    }

    match cli.format {
        OutputFormat::Text => {
            let stdout = io::stdout();
            write_cues(&mut stdout.lock(), &cues)?;
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(io::stdout(), &cues)
                .context("Failed to serialise cues")?;
            println!();
        }
    }

    Ok(())
}

fn write_cues<W: Write>(buf: &mut W, cues: &[Cue]) -> Result<()> {
    for cue in cues {
        writeln!(buf, "{} --> {}", format_time(cue.start), format_time(cue.end))?;
        write!(buf, "{}", cue.text)?;
        writeln!(buf)?;
    }
    Ok(())
}
