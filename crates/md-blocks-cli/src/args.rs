use std::{collections::BTreeSet, path::PathBuf};

use tracing::error;

const DEFAULT_CHUNK_CHARS: usize = 4;
const DEFAULT_DELAY_MS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub threshold: Option<usize>,

    /// Characters appended to the snapshot per simulated token
    pub chunk_chars: usize,
    pub delay_ms: u64,
    pub json: bool,
    pub resync: bool,

    /// Markdown to replay, stdin when missing
    pub input: Option<PathBuf>,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            config: None,
            threshold: None,
            chunk_chars: DEFAULT_CHUNK_CHARS,
            delay_ms: DEFAULT_DELAY_MS,
            json: false,
            resync: false,
            input: None,
        }
    }
}

impl Args {
    // parse arguments, return set of unrecognized args
    pub fn parse(args: &[String]) -> (Self, BTreeSet<String>) {
        let mut unrecognized_args = BTreeSet::new();
        let mut res = Args::default();

        let mut i = 0;
        let len = args.len();
        while i < len {
            let arg = &args[i];

            if arg == "--json" {
                res.json = true;
            } else if arg == "--resync" {
                res.resync = true;
            } else if arg == "--config" {
                i += 1;
                let Some(path) = args.get(i) else {
                    error!("config argument missing?");
                    continue;
                };
                res.config = Some(PathBuf::from(path));
            } else if arg == "--threshold" {
                i += 1;
                match args.get(i).map(|s| s.parse::<usize>()) {
                    Some(Ok(threshold)) => res.threshold = Some(threshold),
                    _ => error!("--threshold needs a character count"),
                }
            } else if arg == "--chunk" {
                i += 1;
                match args.get(i).map(|s| s.parse::<usize>()) {
                    Some(Ok(chunk)) if chunk > 0 => res.chunk_chars = chunk,
                    _ => error!("--chunk needs a positive character count"),
                }
            } else if arg == "--delay-ms" {
                i += 1;
                match args.get(i).map(|s| s.parse::<u64>()) {
                    Some(Ok(delay)) => res.delay_ms = delay,
                    _ => error!("--delay-ms needs a number of milliseconds"),
                }
            } else if !arg.starts_with("--") && res.input.is_none() {
                res.input = Some(PathBuf::from(arg));
            } else {
                unrecognized_args.insert(arg.clone());
            }

            i += 1;
        }

        (res, unrecognized_args)
    }
}
