use crate::rate::RevealRate;
use std::cmp::Ordering;
use tokio::time::Instant;

/// How a timeline absorbed the latest source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceSync {
    /// Same length as before; nothing to do.
    Unchanged,
    /// This many new characters were queued.
    Grew(usize),
    /// The source shrank (or no longer extends what was seen) and the
    /// timeline started over.
    Reset,
    /// The display already covered the new text and now shows it verbatim.
    Settled,
}

/// Point-in-time view of a timeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSnapshot {
    /// Text revealed so far.
    pub displayed: String,
    /// Characters queued but not yet revealed.
    pub pending_chars: usize,
    /// Byte length of the source the timeline has absorbed.
    pub source_len: usize,
    /// Fractional characters the timeline may still release.
    pub budget: f64,
}

/// Animation state of one revealed field.
///
/// New source text is queued and released into `displayed` at a bounded rate.
/// The allowance is a fractional budget refilled from wall-clock time, the
/// same way a token bucket refills, so irregular tick spacing does not change
/// the overall pace.
#[derive(Debug, Clone)]
pub struct RevealTimeline {
    displayed: String,
    pending: String,
    pending_chars: usize,
    /// Bytes of source text already split between `displayed` and `pending`.
    source_len: usize,
    budget: f64,
    last_tick: Instant,
}

impl RevealTimeline {
    /// Start a timeline for `source`.
    ///
    /// Text that is no longer being produced is shown at once; live text is
    /// queued in full and animates from the beginning.
    pub fn new(source: &str, is_live: bool, now: Instant) -> Self {
        let (displayed, pending) = if is_live {
            (String::new(), source.to_string())
        } else {
            (source.to_string(), String::new())
        };
        Self {
            pending_chars: pending.chars().count(),
            displayed,
            pending,
            source_len: source.len(),
            budget: 0.0,
            last_tick: now,
        }
    }

    /// Account for the latest full source text.
    ///
    /// Growth queues exactly the new suffix, whether or not production is
    /// still live. A shorter source means a fresh generation and is a hard
    /// reset: displayed and pending text are dropped and the recorded length
    /// becomes the new, shorter length.
    ///
    /// Text arriving at an empty queue starts the clock at `now`, so time spent
    /// with nothing to reveal is never credited.
    pub fn sync_source(&mut self, source: &str, now: Instant) -> SourceSync {
        match source.len().cmp(&self.source_len) {
            Ordering::Equal => SourceSync::Unchanged,
            Ordering::Less => {
                self.reset(source.len(), now);
                SourceSync::Reset
            }
            Ordering::Greater => match source.get(self.source_len..) {
                Some(delta) => {
                    let added = self.enqueue(delta, now);
                    self.source_len = source.len();
                    SourceSync::Grew(added)
                }
                // Old length is not a char boundary of the new text.
                None => {
                    self.reset(source.len(), now);
                    SourceSync::Reset
                }
            },
        }
    }

    /// Replace the source with `text`, an authoritative rewrite of it.
    ///
    /// Revealed text is never re-animated when `text` covers it. A `text` no
    /// longer than what is displayed is shown verbatim at once; one that
    /// extends the displayed text queues only the remainder. Anything else
    /// restarts the animation on `text`.
    pub fn replace_source(&mut self, text: &str, now: Instant) -> SourceSync {
        if text.len() <= self.displayed.len() {
            self.displayed.clear();
            self.displayed.push_str(text);
            self.pending.clear();
            self.pending_chars = 0;
            self.source_len = text.len();
            self.budget = 0.0;
            return SourceSync::Settled;
        }

        let sync = match text.strip_prefix(self.displayed.as_str()) {
            Some(rest) => {
                self.pending.clear();
                self.pending_chars = 0;
                SourceSync::Grew(self.enqueue(rest, now))
            }
            None => {
                self.reset(0, now);
                self.enqueue(text, now);
                SourceSync::Reset
            }
        };
        self.source_len = text.len();
        sync
    }

    /// Credit the time since the previous tick and release what the budget
    /// allows. Returns the number of characters moved.
    pub fn tick(&mut self, now: Instant, rate: &RevealRate) -> usize {
        let elapsed = now.saturating_duration_since(self.last_tick);
        self.last_tick = now;

        if self.pending_chars == 0 {
            return 0;
        }

        self.budget += rate.chars_per_second * elapsed.as_secs_f64();
        if !self.budget.is_finite() || self.budget < 0.0 {
            self.budget = 0.0;
        }

        let allowance = self.budget.floor() as usize;
        let take = allowance.min(self.pending_chars).min(rate.max_burst());
        if take == 0 {
            return 0;
        }

        let split = self
            .pending
            .char_indices()
            .nth(take)
            .map_or(self.pending.len(), |(idx, _)| idx);
        self.displayed.push_str(&self.pending[..split]);
        self.pending.drain(..split);
        self.pending_chars -= take;
        self.budget -= take as f64;
        take
    }

    /// Text revealed so far.
    pub fn displayed(&self) -> &str {
        &self.displayed
    }

    /// Characters waiting to be revealed.
    pub fn pending_chars(&self) -> usize {
        self.pending_chars
    }

    /// Byte length of the absorbed source.
    pub fn source_len(&self) -> usize {
        self.source_len
    }

    /// Instant up to which time has been credited.
    pub fn last_tick(&self) -> Instant {
        self.last_tick
    }

    /// Nothing is left to reveal.
    pub fn is_settled(&self) -> bool {
        self.pending_chars == 0
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            displayed: self.displayed.clone(),
            pending_chars: self.pending_chars,
            source_len: self.source_len,
            budget: self.budget,
        }
    }

    /// Queue `text`; returns the number of characters added.
    fn enqueue(&mut self, text: &str, now: Instant) -> usize {
        if self.pending_chars == 0 {
            self.last_tick = self.last_tick.max(now);
            self.budget = self.budget.fract();
        }
        let added = text.chars().count();
        self.pending.push_str(text);
        self.pending_chars += added;
        added
    }

    fn reset(&mut self, source_len: usize, now: Instant) {
        self.displayed.clear();
        self.pending.clear();
        self.pending_chars = 0;
        self.source_len = source_len;
        self.budget = 0.0;
        self.last_tick = self.last_tick.max(now);
    }
}
