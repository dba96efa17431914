// The enumerator contract and its implementation over shared sequences.
use crate::core::cursor::Cursor;
use crate::core::element::OleString;
use crate::core::error::Error;
use crate::core::sequence::Sequence;
use std::sync::Arc;

/// How much of a `next` or `skip` request was satisfied. None of these are errors.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Progress {
    /// Every requested position existed.
    Complete,
    /// The sequence ended after some, but not all, requested positions.
    Partial,
    /// The cursor was already at the end; nothing was produced.
    Exhausted,
}

impl Progress {
    pub fn classify(requested: usize, done: usize) -> Self {
        if done >= requested {
            Progress::Complete
        } else if done == 0 {
            Progress::Exhausted
        } else {
            Progress::Partial
        }
    }

    pub fn is_complete(self) -> bool {
        self == Progress::Complete
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Progress::Complete => "complete",
            Progress::Partial => "partial",
            Progress::Exhausted => "exhausted",
        }
    }
}

/// Elements handed over by one `next` call. The caller owns every element.
#[derive(Debug)]
pub struct Batch {
    pub items: Vec<OleString>,
    pub progress: Progress,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Pull-based, batched, resettable and cloneable cursor over text elements.
///
/// A failed call leaves the cursor where it was. Instances may be moved to and
/// dropped on another thread, because an exported handle can be called or
/// released from any thread; sharing one instance still needs external
/// serialization.
pub trait EnumString: Send {
    /// Transfer up to `requested` elements from the cursor and advance past them.
    /// `requested == 0` is a no-op reported as [`Progress::Complete`].
    fn next(&mut self, requested: usize) -> Result<Batch, Error>;

    /// Advance by up to `count` positions without transferring anything.
    fn skip(&mut self, count: usize) -> Result<Progress, Error>;

    /// Move the cursor back to the start.
    fn reset(&mut self) -> Result<(), Error>;

    /// New, independent enumerator positioned where this one is now.
    fn clone_enum(&self) -> Result<Box<dyn EnumString>, Error>;
}

impl<E: EnumString + ?Sized> EnumString for Box<E> {
    fn next(&mut self, requested: usize) -> Result<Batch, Error> {
        (**self).next(requested)
    }

    fn skip(&mut self, count: usize) -> Result<Progress, Error> {
        (**self).skip(count)
    }

    fn reset(&mut self) -> Result<(), Error> {
        (**self).reset()
    }

    fn clone_enum(&self) -> Result<Box<dyn EnumString>, Error> {
        (**self).clone_enum()
    }
}

/// Enumerator over any [`Sequence`]; clones share the sequence, not the cursor.
pub struct SequenceEnumerator {
    sequence: Arc<dyn Sequence>,
    cursor: Cursor,
}

impl SequenceEnumerator {
    pub fn new(sequence: Arc<dyn Sequence>) -> Self {
        Self {
            sequence,
            cursor: Cursor::new(),
        }
    }

    pub fn from_sequence<S: Sequence + 'static>(sequence: S) -> Self {
        Self::new(Arc::new(sequence))
    }

    pub fn position(&self) -> usize {
        self.cursor.position()
    }
}

impl std::fmt::Debug for SequenceEnumerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceEnumerator")
            .field("position", &self.cursor.position())
            .field("len_hint", &self.sequence.len_hint())
            .finish()
    }
}

impl EnumString for SequenceEnumerator {
    fn next(&mut self, requested: usize) -> Result<Batch, Error> {
        let start = self.cursor.position();
        let mut items = Vec::new();
        for offset in 0..requested {
            let index = start.saturating_add(offset);
            let Some(text) = self.sequence.get(index)? else {
                break;
            };
            let element = OleString::new(&text).map_err(|err| err.with_index(index))?;
            items.push(element);
        }
        // Every element exists before the cursor moves, so a failure above
        // leaves this instance untouched and drops what was built.
        self.cursor.advance(items.len());
        let progress = Progress::classify(requested, items.len());
        if !progress.is_complete() {
            tracing::debug!(
                requested,
                fetched = items.len(),
                position = self.cursor.position(),
                "sequence ended before request was satisfied"
            );
        }
        Ok(Batch { items, progress })
    }

    fn skip(&mut self, count: usize) -> Result<Progress, Error> {
        if count == 0 {
            return Ok(Progress::Complete);
        }
        let start = self.cursor.position();
        let end = match self.sequence.len_hint() {
            Some(len) => len,
            None => {
                // Length unknown: probe the last requested position, then
                // find the end by walking forward if it was missing.
                let last = start.saturating_add(count - 1);
                if self.sequence.get(last)?.is_some() {
                    last.saturating_add(1)
                } else {
                    let mut end = start;
                    while end < last && self.sequence.get(end)?.is_some() {
                        end += 1;
                    }
                    end
                }
            }
        };
        let moved = self.cursor.advance_within(count, end);
        Ok(Progress::classify(count, moved))
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.cursor.reset();
        Ok(())
    }

    fn clone_enum(&self) -> Result<Box<dyn EnumString>, Error> {
        Ok(Box::new(SequenceEnumerator {
            sequence: Arc::clone(&self.sequence),
            cursor: self.cursor,
        }))
    }
}
