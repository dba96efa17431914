//! Purpose: Consumer-side helpers that pull an enumerator to completion in batches.
//! Exports: `DrainOptions`, `Batches`, `drain`.
//! Role: Reference consumer used by the CLI and by library callers.
//! Invariants: A batch that is not `Complete` ends the pull; no further `Next` calls follow it.
//! Invariants: Batch size is never zero; zero would never make progress.

use crate::core::enumerator::{Batch, EnumString, Progress};
use crate::core::error::{Error, ErrorKind};

pub const DEFAULT_BATCH: usize = 16;
pub const BATCH_ENV: &str = "STRENUM_BATCH";

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct DrainOptions {
    batch: usize,
    limit: Option<usize>,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            batch: DEFAULT_BATCH,
            limit: None,
        }
    }
}

impl DrainOptions {
    pub fn new(batch: usize) -> Result<Self, Error> {
        if batch == 0 {
            return Err(Error::new(ErrorKind::InvalidArgument).with_message("batch size must be > 0"));
        }
        Ok(Self { batch, limit: None })
    }

    /// Batch size from `STRENUM_BATCH`, falling back to [`DEFAULT_BATCH`] when unset.
    pub fn from_env() -> Result<Self, Error> {
        match std::env::var(BATCH_ENV) {
            Ok(raw) => Self::new(parse_batch(&raw)?),
            Err(std::env::VarError::NotPresent) => Ok(Self::default()),
            Err(err) => Err(Error::new(ErrorKind::InvalidArgument)
                .with_message(format!("{BATCH_ENV} is not valid unicode"))
                .with_source(err)),
        }
    }

    /// Stop after `limit` elements even if the sequence goes on.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn batch(&self) -> usize {
        self.batch
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

fn parse_batch(raw: &str) -> Result<usize, Error> {
    raw.trim().parse::<usize>().map_err(|err| {
        Error::new(ErrorKind::InvalidArgument)
            .with_message(format!("{BATCH_ENV}={raw:?} is not a count"))
            .with_source(err)
    })
}

/// Iterator over the batches of one enumerator. Yields the final short batch,
/// if it carries elements, and then stops.
pub struct Batches<'a> {
    source: &'a mut dyn EnumString,
    options: DrainOptions,
    taken: usize,
    done: bool,
}

impl<'a> Batches<'a> {
    pub fn new(source: &'a mut dyn EnumString, options: DrainOptions) -> Self {
        Self {
            source,
            options,
            taken: 0,
            done: false,
        }
    }

    fn request(&self) -> usize {
        match self.options.limit {
            Some(limit) => self.options.batch.min(limit.saturating_sub(self.taken)),
            None => self.options.batch,
        }
    }
}

impl Iterator for Batches<'_> {
    type Item = Result<Batch, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let request = self.request();
        if request == 0 {
            self.done = true;
            return None;
        }
        let batch = match self.source.next(request) {
            Ok(batch) => batch,
            Err(err) => {
                self.done = true;
                return Some(Err(err));
            }
        };
        self.taken += batch.len();
        if batch.progress != Progress::Complete {
            self.done = true;
        }
        if batch.progress == Progress::Exhausted {
            return None;
        }
        Some(Ok(batch))
    }
}

/// Pull every remaining element (up to the limit) as UTF-8 strings.
pub fn drain(source: &mut dyn EnumString, options: DrainOptions) -> Result<Vec<String>, Error> {
    let mut out = Vec::new();
    for batch in Batches::new(source, options) {
        for item in batch?.items {
            out.push(item.to_utf8()?);
        }
    }
    tracing::trace!(count = out.len(), batch = options.batch, "drained enumerator");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{Batches, DrainOptions, drain, parse_batch};
    use crate::core::enumerator::{EnumString, Progress, SequenceEnumerator};
    use crate::core::error::ErrorKind;
    use crate::core::sequence::{Generated, Snapshot};

    fn letters() -> SequenceEnumerator {
        SequenceEnumerator::from_sequence(Snapshot::new(["a", "b", "c", "d", "e"]))
    }

    #[test]
    fn drain_returns_everything_in_order() {
        let mut en = letters();
        let all = drain(&mut en, DrainOptions::new(2).expect("opts")).expect("drain");
        assert_eq!(all, ["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn drain_resumes_from_cursor() {
        let mut en = letters();
        en.skip(3).expect("skip");
        let rest = drain(&mut en, DrainOptions::default()).expect("drain");
        assert_eq!(rest, ["d", "e"]);
    }

    #[test]
    fn exact_multiple_ends_on_exhausted_without_empty_batch() {
        let mut en = SequenceEnumerator::from_sequence(Snapshot::new(["a", "b", "c", "d"]));
        let batches: Vec<_> = Batches::new(&mut en, DrainOptions::new(2).expect("opts"))
            .collect::<Result<_, _>>()
            .expect("batches");
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|b| b.progress == Progress::Complete));
    }

    #[test]
    fn short_final_batch_is_yielded() {
        let mut en = letters();
        let progress: Vec<_> = Batches::new(&mut en, DrainOptions::new(2).expect("opts"))
            .map(|b| b.expect("batch").progress)
            .collect();
        assert_eq!(
            progress,
            [Progress::Complete, Progress::Complete, Progress::Partial]
        );
    }

    #[test]
    fn limit_bounds_unbounded_sequences() {
        let mut en = SequenceEnumerator::from_sequence(Generated::from_iterator(
            (0..).map(|n: u32| n.to_string()),
        ));
        let opts = DrainOptions::new(3).expect("opts").with_limit(7);
        let items = drain(&mut en, opts).expect("drain");
        assert_eq!(items, ["0", "1", "2", "3", "4", "5", "6"]);
        assert_eq!(en.position(), 7);
    }

    #[test]
    fn zero_batch_is_rejected() {
        assert_eq!(
            DrainOptions::new(0).expect_err("zero").kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(parse_batch(" 8 ").expect("parse"), 8);
        assert!(parse_batch("eight").is_err());
    }

    #[test]
    fn element_errors_stop_the_drain() {
        let mut en = SequenceEnumerator::from_sequence(Snapshot::new(["ok", "bad\0"]));
        let err = drain(&mut en, DrainOptions::new(1).expect("opts")).expect_err("nul");
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(en.position(), 1);
    }
}
