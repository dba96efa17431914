// Producer-owned backing sequences shared by every enumerator over them.
use crate::core::error::{Error, ErrorKind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Indexed, read-only view of a producer's elements.
///
/// Any index that has once been observed must keep returning the same element;
/// enumerators and their clones rely on that to stay consistent.
pub trait Sequence: Send + Sync {
    /// Element at `index`, or `None` when the sequence ends before it.
    fn get(&self, index: usize) -> Result<Option<Arc<str>>, Error>;

    /// Total length when known without materializing further elements.
    fn len_hint(&self) -> Option<usize>;
}

/// Immutable list frozen at construction.
#[derive(Debug, Clone)]
pub struct Snapshot {
    items: Arc<[Arc<str>]>,
}

impl Snapshot {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Arc<str>>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Sequence for Snapshot {
    fn get(&self, index: usize) -> Result<Option<Arc<str>>, Error> {
        Ok(self.items.get(index).cloned())
    }

    fn len_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

type Generator = Box<dyn FnMut() -> Option<Result<String, Error>> + Send>;

/// Lazily produced sequence. Elements are memoized as they are generated, so
/// resets and clones replay exactly what was produced before.
///
/// The generator returns `None` at the end and `Some(Err(..))` on failure. A
/// failure is reported to the caller without ending the sequence; the next
/// access calls the generator again for the same index.
///
/// Memory grows with the furthest index ever reached, including indices that
/// were only skipped over.
pub struct Generated {
    state: Mutex<GeneratedState>,
}

struct GeneratedState {
    produced: Vec<Arc<str>>,
    // None once the generator reported the end.
    source: Option<Generator>,
}

impl Generated {
    pub fn new<F>(generator: F) -> Self
    where
        F: FnMut() -> Option<Result<String, Error>> + Send + 'static,
    {
        Self {
            state: Mutex::new(GeneratedState {
                produced: Vec::new(),
                source: Some(Box::new(generator)),
            }),
        }
    }

    pub fn from_iterator<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: Send + 'static,
    {
        let mut iter = iter.into_iter();
        Self::new(move || iter.next().map(Ok))
    }
}

impl std::fmt::Debug for Generated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let produced = self.state.lock().map(|state| state.produced.len()).ok();
        f.debug_struct("Generated")
            .field("produced", &produced)
            .finish()
    }
}

impl Sequence for Generated {
    fn get(&self, index: usize) -> Result<Option<Arc<str>>, Error> {
        let mut state = self.state.lock().map_err(|_| {
            Error::new(ErrorKind::HandleInvalid).with_message("generator panicked earlier")
        })?;
        while state.produced.len() <= index {
            let Some(source) = state.source.as_mut() else {
                break;
            };
            match source() {
                Some(Ok(item)) => state.produced.push(item.into()),
                Some(Err(err)) => {
                    let at = state.produced.len();
                    tracing::debug!(index = at, error = %err, "generator failed");
                    return Err(if err.index().is_some() {
                        err
                    } else {
                        err.with_index(at)
                    });
                }
                None => {
                    tracing::trace!(len = state.produced.len(), "generator finished");
                    state.source = None;
                }
            }
        }
        Ok(state.produced.get(index).cloned())
    }

    fn len_hint(&self) -> Option<usize> {
        let state = self.state.lock().ok()?;
        match state.source {
            Some(_) => None,
            None => Some(state.produced.len()),
        }
    }
}

/// Wraps a sequence whose backing resource can be released by the producer.
/// After [`Revoker::revoke`], every access fails with `HandleInvalid`.
#[derive(Debug)]
pub struct Revocable<S> {
    inner: S,
    revoked: Arc<AtomicBool>,
}

#[derive(Debug, Clone)]
pub struct Revoker {
    revoked: Arc<AtomicBool>,
}

impl<S: Sequence> Revocable<S> {
    pub fn new(inner: S) -> (Self, Revoker) {
        let revoked = Arc::new(AtomicBool::new(false));
        let revoker = Revoker {
            revoked: Arc::clone(&revoked),
        };
        (Self { inner, revoked }, revoker)
    }

    fn check(&self) -> Result<(), Error> {
        if self.revoked.load(Ordering::Acquire) {
            tracing::warn!("access to released sequence");
            return Err(Error::new(ErrorKind::HandleInvalid)
                .with_message("backing sequence was released"));
        }
        Ok(())
    }
}

impl<S: Sequence> Sequence for Revocable<S> {
    fn get(&self, index: usize) -> Result<Option<Arc<str>>, Error> {
        self.check()?;
        self.inner.get(index)
    }

    fn len_hint(&self) -> Option<usize> {
        self.check().ok()?;
        self.inner.len_hint()
    }
}

impl Revoker {
    pub fn revoke(&self) {
        self.revoked.store(true, Ordering::Release);
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::{Generated, Revocable, Sequence, Snapshot};
    use crate::core::error::{Error, ErrorKind};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn snapshot_reports_exact_length() {
        let seq = Snapshot::new(["a", "b"]);
        assert_eq!(seq.len_hint(), Some(2));
        assert_eq!(seq.get(1).expect("get").as_deref(), Some("b"));
        assert_eq!(seq.get(2).expect("get"), None);
    }

    #[test]
    fn generated_memoizes_and_stops_calling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let mut next = 0;
        let seq = Generated::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            next += 1;
            (next <= 2).then(|| Ok(format!("g{next}")))
        });

        assert_eq!(seq.len_hint(), None);
        assert_eq!(seq.get(1).expect("get").as_deref(), Some("g2"));
        assert_eq!(seq.get(0).expect("get").as_deref(), Some("g1"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert_eq!(seq.get(5).expect("get"), None);
        assert_eq!(seq.get(6).expect("get"), None);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(seq.len_hint(), Some(2));
    }

    #[test]
    fn generated_from_iterator_is_lazy() {
        let seq = Generated::from_iterator((0..).map(|n: u64| n.to_string()));
        assert_eq!(seq.get(1000).expect("get").as_deref(), Some("1000"));
        assert_eq!(seq.len_hint(), None);
    }

    #[test]
    fn generator_failure_is_not_the_end() {
        let mut script = vec![
            Ok("one".to_string()),
            Err(Error::new(ErrorKind::Io).with_message("bad line")),
            Ok("three".to_string()),
        ]
        .into_iter();
        let seq = Generated::new(move || script.next());

        assert_eq!(seq.get(0).expect("get").as_deref(), Some("one"));
        let err = seq.get(1).expect_err("failed read");
        assert_eq!(err.kind(), ErrorKind::Io);
        assert_eq!(err.index(), Some(1));
        assert_eq!(seq.len_hint(), None);

        // The generator is still live; the failed slot is retried.
        assert_eq!(seq.get(1).expect("get").as_deref(), Some("three"));
        assert_eq!(seq.get(2).expect("get"), None);
        assert_eq!(seq.len_hint(), Some(2));
    }

    #[test]
    fn revoked_sequence_is_unusable() {
        let (seq, revoker) = Revocable::new(Snapshot::new(["a"]));
        assert_eq!(seq.get(0).expect("get").as_deref(), Some("a"));
        revoker.revoke();
        assert!(revoker.is_revoked());
        let err = seq.get(0).expect_err("revoked");
        assert_eq!(err.kind(), ErrorKind::HandleInvalid);
        assert_eq!(seq.len_hint(), None);
    }
}
