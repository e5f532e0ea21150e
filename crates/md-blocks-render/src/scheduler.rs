use std::{
    future::Future,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

use md_blocks::{classify, BoundaryDetector, InconsistencyPolicy, StructuralNode};
use tokio::sync::oneshot;
use tracing::{debug, error, trace};

use crate::cache::HighlightCache;
use crate::config::{PipelineConfig, DEFAULT_HIGHLIGHT_THREADS};
use crate::error::Error;
use crate::highlight::{StyledText, SyntectHighlighter};
use crate::policy::should_reparse;
use crate::pool::HighlightPool;
use crate::result::RenderResult;

/// Results of one parse pass: every block of the turn so far, in order.
pub type Outcome = Result<Vec<Arc<RenderResult>>, Error>;

/// Callback receiving the outcome of a pass. Runs on the worker thread.
pub type Completion = Box<dyn FnOnce(Outcome) + Send + 'static>;

struct Request {
    generation: u64,
    snapshot: String,
    is_done: bool,
    completion: Completion,
}

/// A finished highlight job, waiting for the worker to pick it up.
struct Highlighted {
    generation: u64,
    id: u64,
    styled: Arc<StyledText>,
}

/// State shared between the caller side, the worker and the highlight pool.
struct Slot {
    generation: u64,

    /// At most one request waits; a newer one replaces it
    queued: Option<Request>,

    highlighted: Vec<Highlighted>,

    /// Character length of the last snapshot accepted for parsing
    last_parsed_len: usize,

    shutdown: bool,
}

struct Shared {
    slot: Mutex<Slot>,
    wake: Condvar,

    /// Held while a completion runs, so a new turn never races a stale
    /// delivery
    delivery: Mutex<()>,
}

impl Shared {
    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Parses a streaming response off the calling thread.
///
/// Each response is a *turn*. Snapshots of the turn are handed to a single
/// worker that owns the block detector and classifies the blocks that
/// completed. Code blocks are highlighted on a separate pool through the
/// shared cache, so a slow highlight never holds up later text: a pass
/// delivers code plain until its highlight is done, and the final pass of a
/// turn waits for outstanding highlights before it delivers.
///
/// Only the latest snapshot matters. A request still waiting when a newer
/// one arrives is dropped without its completion being called.
///
/// Completions run on the worker thread. They may call [`parse`] again but
/// must not call [`begin_turn`] or [`cancel`], which wait for deliveries to
/// finish.
///
/// [`parse`]: ResponseParser::parse
/// [`begin_turn`]: ResponseParser::begin_turn
/// [`cancel`]: ResponseParser::cancel
pub struct ResponseParser {
    shared: Arc<Shared>,
    cache: Arc<HighlightCache>,
    worker: Option<JoinHandle<()>>,
}

impl ResponseParser {
    pub fn new(cache: Arc<HighlightCache>, policy: InconsistencyPolicy) -> Result<Self, Error> {
        Self::with_highlight_threads(cache, policy, DEFAULT_HIGHLIGHT_THREADS)
    }

    pub fn with_highlight_threads(
        cache: Arc<HighlightCache>,
        policy: InconsistencyPolicy,
        highlight_threads: usize,
    ) -> Result<Self, Error> {
        let shared = Arc::new(Shared {
            slot: Mutex::new(Slot {
                generation: 0,
                queued: None,
                highlighted: Vec::new(),
                last_parsed_len: 0,
                shutdown: false,
            }),
            wake: Condvar::new(),
            delivery: Mutex::new(()),
        });

        let pool = HighlightPool::new(highlight_threads.max(1))?;
        let worker = {
            let worker = Worker {
                shared: shared.clone(),
                cache: cache.clone(),
                pool,
                policy,
                turn: Turn::new(0, policy),
            };

            thread::Builder::new()
                .name("md-blocks-parser".to_string())
                .spawn(move || worker.run())?
        };

        Ok(Self {
            shared,
            cache,
            worker: Some(worker),
        })
    }

    /// Parser with syntect highlighting and a cache sized by `config`.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, Error> {
        config.validate()?;

        let cache = HighlightCache::new(SyntectHighlighter::new(), config.cache_capacity()?);
        Self::with_highlight_threads(
            Arc::new(cache),
            config.inconsistency,
            config.highlight_threads,
        )
    }

    pub fn cache(&self) -> &Arc<HighlightCache> {
        &self.cache
    }

    pub fn generation(&self) -> u64 {
        self.shared.slot().generation
    }

    pub fn last_parsed_len(&self) -> usize {
        self.shared.slot().last_parsed_len
    }

    /// Start a new response. Queued and in-flight work of the previous turn
    /// is dropped, and none of its completions run after this returns.
    pub fn begin_turn(&self) -> u64 {
        let generation = {
            let mut slot = self.shared.slot();
            slot.generation += 1;
            slot.last_parsed_len = 0;
            if slot.queued.take().is_some() {
                trace!("dropped queued request of turn {}", slot.generation - 1);
            }

            slot.generation
        };

        // a delivery that checked the old generation finishes first
        drop(
            self.shared
                .delivery
                .lock()
                .unwrap_or_else(PoisonError::into_inner),
        );

        debug!("began turn {generation}");
        generation
    }

    /// Abandon the current turn. Same as beginning a new one that never
    /// receives a snapshot.
    pub fn cancel(&self) {
        self.begin_turn();
    }

    /// Queue `snapshot` for parsing. `completion` gets the outcome, unless a
    /// newer request or a new turn supersedes this one first.
    pub fn parse(
        &self,
        snapshot: impl Into<String>,
        is_done: bool,
        completion: impl FnOnce(Outcome) + Send + 'static,
    ) {
        self.submit(snapshot.into(), is_done, None, Box::new(completion));
    }

    /// Like [`parse`](Self::parse), but only when the snapshot grew by at
    /// least `threshold` characters since the last accepted one. Returns
    /// false, dropping `completion`, when throttled.
    pub fn parse_with_threshold(
        &self,
        snapshot: impl Into<String>,
        is_done: bool,
        threshold: usize,
        completion: impl FnOnce(Outcome) + Send + 'static,
    ) -> bool {
        self.submit(
            snapshot.into(),
            is_done,
            Some(threshold),
            Box::new(completion),
        )
    }

    /// Future form of [`parse`](Self::parse). Resolves to `None` when the
    /// request was superseded.
    pub fn parse_async(
        &self,
        snapshot: impl Into<String>,
        is_done: bool,
    ) -> impl Future<Output = Option<Outcome>> {
        let (tx, rx) = oneshot::channel::<Outcome>();
        self.parse(snapshot, is_done, move |outcome| {
            let _ = tx.send(outcome);
        });

        async move { rx.await.ok() }
    }

    /// Future form of [`parse_with_threshold`](Self::parse_with_threshold).
    /// `None` when throttled.
    pub fn parse_with_threshold_async(
        &self,
        snapshot: impl Into<String>,
        is_done: bool,
        threshold: usize,
    ) -> Option<impl Future<Output = Option<Outcome>>> {
        let (tx, rx) = oneshot::channel::<Outcome>();
        let accepted = self.parse_with_threshold(snapshot, is_done, threshold, move |outcome| {
            let _ = tx.send(outcome);
        });

        accepted.then(|| async move { rx.await.ok() })
    }

    /// Throttle check and enqueue happen under one lock, so concurrent
    /// callers cannot both pass the same check.
    fn submit(
        &self,
        snapshot: String,
        is_done: bool,
        threshold: Option<usize>,
        completion: Completion,
    ) -> bool {
        let new_len = snapshot.chars().count();
        let mut slot = self.shared.slot();

        if let Some(threshold) = threshold {
            if !should_reparse(new_len, slot.last_parsed_len, threshold, is_done) {
                return false;
            }
        }

        slot.last_parsed_len = new_len;
        let request = Request {
            generation: slot.generation,
            snapshot,
            is_done,
            completion,
        };

        if slot.queued.replace(request).is_some() {
            trace!("coalesced queued request");
        }
        drop(slot);

        self.shared.wake.notify_all();
        true
    }
}

impl Drop for ResponseParser {
    fn drop(&mut self) {
        self.shared.slot().shutdown = true;
        self.shared.wake.notify_all();

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("parser worker panicked");
            }
        }
    }
}

/// A delivered result and where its block ended in the snapshot.
struct Entry {
    id: u64,
    end: usize,
    result: Arc<RenderResult>,
}

/// Detector and results of the turn the worker is on.
struct Turn {
    generation: u64,
    detector: BoundaryDetector,
    entries: Vec<Entry>,
    next_id: u64,
    pending_highlights: usize,

    /// Completion of a final pass waiting for its highlights
    deferred: Option<Completion>,
}

impl Turn {
    fn new(generation: u64, policy: InconsistencyPolicy) -> Self {
        Self {
            generation,
            detector: BoundaryDetector::with_policy(policy),
            entries: Vec::new(),
            next_id: 0,
            pending_highlights: 0,
            deferred: None,
        }
    }

    fn results(&self, is_done: bool) -> Vec<Arc<RenderResult>> {
        let mut results: Vec<_> = self.entries.iter().map(|e| e.result.clone()).collect();
        if !is_done {
            results.extend(
                classify(self.detector.pending_tail())
                    .into_iter()
                    .map(|node| Arc::new(RenderResult::speculative(node))),
            );
        }

        results
    }

    /// Forget results of blocks that a resync took back.
    fn rewind(&mut self, at: usize) {
        let kept = self.entries.partition_point(|entry| entry.end <= at);
        if kept < self.entries.len() {
            debug!(
                "dropping {} results past byte {at}",
                self.entries.len() - kept
            );
            self.entries.truncate(kept);
        }
    }

    fn apply(&mut self, highlighted: Highlighted) {
        self.pending_highlights = self.pending_highlights.saturating_sub(1);

        if let Ok(i) = self
            .entries
            .binary_search_by_key(&highlighted.id, |entry| entry.id)
        {
            let entry = &mut self.entries[i];
            entry.result = Arc::new(entry.result.with_highlight(highlighted.styled));
        }
    }
}

/// Owns the detector. Runs passes and folds finished highlights back in.
struct Worker {
    shared: Arc<Shared>,
    cache: Arc<HighlightCache>,
    pool: HighlightPool,
    policy: InconsistencyPolicy,
    turn: Turn,
}

impl Worker {
    fn run(mut self) {
        loop {
            let (request, highlighted) = {
                let mut slot = self.shared.slot();
                loop {
                    if slot.shutdown {
                        return;
                    }
                    if slot.queued.is_some() || !slot.highlighted.is_empty() {
                        break (slot.queued.take(), std::mem::take(&mut slot.highlighted));
                    }
                    slot = self
                        .shared
                        .wake
                        .wait(slot)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            if !highlighted.is_empty() {
                self.apply_highlights(highlighted);
            }
            if let Some(request) = request {
                self.pass(request);
            }
        }
    }

    #[profiling::function]
    fn pass(&mut self, request: Request) {
        if request.generation != self.turn.generation {
            self.turn = Turn::new(request.generation, self.policy);
        }
        if self.turn.deferred.take().is_some() {
            trace!("superseded a final pass waiting on highlights");
        }

        let blocks = match self.turn.detector.consume(&request.snapshot, request.is_done) {
            Ok(blocks) => blocks,
            Err(err) => {
                deliver(
                    &self.shared,
                    request.generation,
                    request.completion,
                    Err(err.into()),
                );
                return;
            }
        };

        if let Some(at) = self.turn.detector.last_rewind() {
            self.turn.rewind(at);
        }

        for block in &blocks {
            for node in block.classify() {
                self.push(node, block.span.end);
            }
        }

        if request.is_done && self.turn.pending_highlights > 0 {
            self.turn.deferred = Some(request.completion);
            return;
        }

        let results = self.turn.results(request.is_done);
        deliver(
            &self.shared,
            request.generation,
            request.completion,
            Ok(results),
        );
    }

    fn push(&mut self, node: StructuralNode, end: usize) {
        let id = self.turn.next_id;
        self.turn.next_id += 1;

        if let StructuralNode::CodeBlock { language, code } = &node {
            self.highlight(id, code.clone(), language.clone());
        }

        self.turn.entries.push(Entry {
            id,
            end,
            result: Arc::new(RenderResult::new(node)),
        });
    }

    fn highlight(&mut self, id: u64, code: String, language: String) {
        let generation = self.turn.generation;
        let shared = self.shared.clone();
        let cache = self.cache.clone();

        let scheduled = self.pool.schedule(move || {
            if shared.slot().generation != generation {
                trace!("skipping highlight for abandoned turn {generation}");
                return;
            }

            let styled = cache.highlight(&code, &language);
            shared.slot().highlighted.push(Highlighted {
                generation,
                id,
                styled,
            });
            shared.wake.notify_all();
        });

        if scheduled {
            self.turn.pending_highlights += 1;
        } else {
            error!("highlight pool is gone, code block {id} stays plain");
        }
    }

    fn apply_highlights(&mut self, highlighted: Vec<Highlighted>) {
        for item in highlighted {
            if item.generation == self.turn.generation {
                self.turn.apply(item);
            }
        }

        if self.turn.pending_highlights == 0 {
            if let Some(completion) = self.turn.deferred.take() {
                let results = self.turn.results(true);
                deliver(&self.shared, self.turn.generation, completion, Ok(results));
            }
        }
    }
}

fn deliver(shared: &Shared, generation: u64, completion: Completion, outcome: Outcome) {
    let _delivery = shared
        .delivery
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    let current = shared.slot().generation;
    if current != generation {
        debug!("discarding result of turn {generation}, now on {current}");
        return;
    }

    completion(outcome);
}
