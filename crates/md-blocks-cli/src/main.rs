mod args;

use std::{io::Read, path::Path, process::ExitCode, sync::Arc, time::Duration};

use md_blocks::{InconsistencyPolicy, StructuralNode};
use md_blocks_render::{Error, Outcome, PipelineConfig, RenderResult, ResponseParser};
use tokio::{
    sync::mpsc,
    time::{sleep, Instant},
};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::args::Args;

fn setup_logging() {
    // Log to stderr (if you run with `RUST_LOG=debug`), stdout carries the output
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("md_blocks=info,md_blocks_render=info,md_blocks_cli=info")
    });

    tracing_subscriber::fmt()
        .with_target(true)
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    setup_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (args, unrecognized_args) = Args::parse(&args);
    for arg in &unrecognized_args {
        warn!("unrecognized argument: {arg}");
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Error> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => PipelineConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if args.resync {
        config.inconsistency = InconsistencyPolicy::Resync;
    }
    config.validate()?;

    let message = read_input(args.input.as_deref()).await?;
    let parser = ResponseParser::from_config(&config)?;
    let turn = parser.begin_turn();
    info!(
        "replaying {} chars as turn {turn}, {} chars per token, threshold {}",
        message.chars().count(),
        args.chunk_chars,
        config.threshold
    );

    let (tx, mut rx) = mpsc::unbounded_channel::<Outcome>();
    let mut snapshot = String::new();
    let mut chars = message.chars().peekable();
    let mut accepted = 0usize;
    let mut throttled = 0usize;
    let mut last_redraw = Instant::now();

    while chars.peek().is_some() {
        snapshot.extend(chars.by_ref().take(args.chunk_chars));

        let tx = tx.clone();
        let queued = parser.parse_with_threshold(
            snapshot.as_str(),
            false,
            config.threshold,
            move |outcome| {
                let _ = tx.send(outcome);
            },
        );
        if queued {
            accepted += 1;
        } else {
            throttled += 1;
        }

        while let Ok(outcome) = rx.try_recv() {
            let results = outcome?;
            if last_redraw.elapsed() >= config.render_interval() {
                let partial = results.iter().filter(|r| r.partial).count();
                debug!(
                    "redraw: {} blocks ({partial} partial) at {} chars",
                    results.len(),
                    snapshot.len()
                );
                last_redraw = Instant::now();
            }
        }

        if args.delay_ms > 0 {
            sleep(Duration::from_millis(args.delay_ms)).await;
        }
    }

    let Some(outcome) = parser.parse_async(snapshot, true).await else {
        warn!("final parse of turn {turn} was superseded");
        return Ok(());
    };
    let results = outcome?;

    let cache = parser.cache();
    let highlighted = results.iter().filter(|r| r.highlighted).count();
    info!(
        "{} blocks ({highlighted} highlighted), {accepted} passes, {throttled} throttled, highlight cache {} hits / {} misses",
        results.len(),
        cache.hits(),
        cache.misses()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        print!("{}", render_text(&results));
    }

    Ok(())
}

async fn read_input(path: Option<&Path>) -> Result<String, Error> {
    match path {
        Some(path) => Ok(tokio::fs::read_to_string(path).await?),
        None => {
            let mut message = String::new();
            std::io::stdin().read_to_string(&mut message)?;
            Ok(message)
        }
    }
}

/// Plain terminal rendering, one block per paragraph.
fn render_text(results: &[Arc<RenderResult>]) -> String {
    let mut out = String::new();

    for result in results {
        match &result.node {
            StructuralNode::Heading { level, text } => {
                out.push_str(&"#".repeat(usize::from(*level)));
                out.push(' ');
                out.push_str(text);
            }
            StructuralNode::CodeBlock { .. } => {
                out.push_str("```");
                out.push_str(result.language.as_deref().unwrap_or_default());
                out.push('\n');
                out.push_str(&result.content.to_plain_string());
                out.push_str("\n```");
            }
            StructuralNode::ListItem { text, number } => {
                match number {
                    Some(n) => out.push_str(&format!("{n}. ")),
                    None => out.push_str("- "),
                }
                out.push_str(text);
            }
            StructuralNode::Quote { text } => {
                let quoted: Vec<String> = text.lines().map(|line| format!("> {line}")).collect();
                out.push_str(&quoted.join("\n"));
            }
            StructuralNode::HorizontalRule => out.push_str("---"),
            StructuralNode::Paragraph { text } => out.push_str(text),
        }
        out.push_str("\n\n");
    }

    out
}
