//! Pull-based geometry cursors.
//!
//! A cursor yields geometries one at a time together with a caller-meaningful
//! id. Cursors are single pass: once `next` has returned `Ok(None)` it keeps
//! doing so.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::error::KernelResult;
use crate::geometry::Geometry;
use crate::topology::edit_shape::{EditShape, GeometryId};

pub trait GeometryCursor {
    /// The next geometry, or `None` at the end of the sequence.
    fn next(&mut self) -> KernelResult<Option<Geometry>>;

    /// Id of the geometry last returned by `next`; -1 before the first call
    /// and after the end.
    fn current_id(&self) -> i64;

    /// True when the last `None` only meant "nothing yet": more input may
    /// still arrive from a producer.
    fn is_pending(&self) -> bool {
        false
    }
}

impl<C: GeometryCursor + ?Sized> GeometryCursor for Box<C> {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        (**self).next()
    }

    fn current_id(&self) -> i64 {
        (**self).current_id()
    }

    fn is_pending(&self) -> bool {
        (**self).is_pending()
    }
}

impl<C: GeometryCursor + ?Sized> GeometryCursor for &mut C {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        (**self).next()
    }

    fn current_id(&self) -> i64 {
        (**self).current_id()
    }

    fn is_pending(&self) -> bool {
        (**self).is_pending()
    }
}

// ─── Array-backed cursor ─────────────────────────────────────────────────────

/// Cursor over an owned list of geometries.
#[derive(Debug, Clone, Default)]
pub struct SimpleGeometryCursor {
    items: VecDeque<(i64, Geometry)>,
    current: i64,
}

impl SimpleGeometryCursor {
    /// Ids are the positions 0, 1, 2, ...
    pub fn new(geometries: Vec<Geometry>) -> Self {
        Self::with_ids(
            geometries
                .into_iter()
                .enumerate()
                .map(|(i, g)| (i as i64, g))
                .collect(),
        )
    }

    pub fn with_ids(items: Vec<(i64, Geometry)>) -> Self {
        Self {
            items: items.into(),
            current: -1,
        }
    }

    pub fn single(geometry: Geometry) -> Self {
        Self::new(vec![geometry])
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

impl GeometryCursor for SimpleGeometryCursor {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        match self.items.pop_front() {
            Some((id, g)) => {
                self.current = id;
                Ok(Some(g))
            }
            None => {
                self.current = -1;
                Ok(None)
            }
        }
    }

    fn current_id(&self) -> i64 {
        self.current
    }
}

// ─── Concatenation ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AppendState {
    First,
    Second,
    Done,
}

/// Yields everything from `first`, then everything from `second`.
///
/// A pending `first` is not left until it is exhausted; until then an
/// empty pull returns `None` and the cursor stays pending.
pub struct AppendCursor<'a> {
    first: Box<dyn GeometryCursor + 'a>,
    second: Box<dyn GeometryCursor + 'a>,
    state: AppendState,
    current: i64,
}

impl<'a> AppendCursor<'a> {
    pub fn new(
        first: impl GeometryCursor + 'a,
        second: impl GeometryCursor + 'a,
    ) -> Self {
        Self {
            first: Box::new(first),
            second: Box::new(second),
            state: AppendState::First,
            current: -1,
        }
    }
}

impl GeometryCursor for AppendCursor<'_> {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        loop {
            let (source, following) = match self.state {
                AppendState::First => (&mut self.first, AppendState::Second),
                AppendState::Second => (&mut self.second, AppendState::Done),
                AppendState::Done => {
                    self.current = -1;
                    return Ok(None);
                }
            };
            if let Some(g) = source.next()? {
                self.current = source.current_id();
                return Ok(Some(g));
            }
            if source.is_pending() {
                self.current = -1;
                return Ok(None);
            }
            self.state = following;
        }
    }

    fn current_id(&self) -> i64 {
        self.current
    }

    fn is_pending(&self) -> bool {
        match self.state {
            AppendState::First => self.first.is_pending() || self.second.is_pending(),
            AppendState::Second => self.second.is_pending(),
            AppendState::Done => false,
        }
    }
}

// ─── Push queue ──────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<(i64, Geometry)>,
    pushed: i64,
    finished: bool,
}

/// Producer side of a [`ListeningCursor`].
#[derive(Debug, Clone)]
pub struct QueueHandle {
    state: Rc<RefCell<QueueState>>,
}

impl QueueHandle {
    /// Queue a geometry under the next positional id.
    pub fn push(&self, geometry: Geometry) {
        let mut state = self.state.borrow_mut();
        let id = state.pushed;
        state.pushed += 1;
        state.items.push_back((id, geometry));
    }

    pub fn push_with_id(&self, id: i64, geometry: Geometry) {
        let mut state = self.state.borrow_mut();
        state.pushed += 1;
        state.items.push_back((id, geometry));
    }

    /// No more geometries will be pushed.
    pub fn finish(&self) {
        self.state.borrow_mut().finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.state.borrow().finished
    }

    pub fn pending(&self) -> usize {
        self.state.borrow().items.len()
    }
}

/// Consumer side of a push queue.
///
/// While the queue is empty and unfinished `next` returns `None` without
/// ending the sequence; once the producer has called
/// [`QueueHandle::finish`] and the queue drained, the end is final.
#[derive(Debug)]
pub struct ListeningCursor {
    state: Rc<RefCell<QueueState>>,
    current: i64,
    ended: bool,
}

impl ListeningCursor {
    pub fn is_finished(&self) -> bool {
        let state = self.state.borrow();
        state.finished && state.items.is_empty()
    }
}

/// A connected producer and consumer pair.
pub fn listening_cursor() -> (QueueHandle, ListeningCursor) {
    let state = Rc::new(RefCell::new(QueueState::default()));
    (
        QueueHandle {
            state: Rc::clone(&state),
        },
        ListeningCursor {
            state,
            current: -1,
            ended: false,
        },
    )
}

impl GeometryCursor for ListeningCursor {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        if self.ended {
            return Ok(None);
        }
        let mut state = self.state.borrow_mut();
        match state.items.pop_front() {
            Some((id, g)) => {
                self.current = id;
                Ok(Some(g))
            }
            None => {
                self.ended = state.finished;
                self.current = -1;
                Ok(None)
            }
        }
    }

    fn current_id(&self) -> i64 {
        self.current
    }

    fn is_pending(&self) -> bool {
        !self.ended && !self.is_finished()
    }
}

// ─── Edit shape slots ────────────────────────────────────────────────────────

/// Yields the current state of each geometry slot of an edit shape in
/// insertion order.
///
/// Ids come from a user-index channel when one is given, otherwise they are
/// positions.
#[derive(Debug)]
pub struct EditShapeCursor {
    shape: EditShape,
    next: Option<GeometryId>,
    id_slot: Option<usize>,
    position: i64,
    current: i64,
}

impl EditShapeCursor {
    pub fn new(shape: EditShape, id_slot: Option<usize>) -> Self {
        let next = shape.first_geometry();
        Self {
            shape,
            next,
            id_slot,
            position: 0,
            current: -1,
        }
    }
}

impl GeometryCursor for EditShapeCursor {
    fn next(&mut self) -> KernelResult<Option<Geometry>> {
        let Some(g) = self.next else {
            self.current = -1;
            return Ok(None);
        };
        self.next = self.shape.next_geometry(g);
        self.current = match self.id_slot {
            Some(slot) => i64::from(self.shape.get_geometry_user_index(g, slot)),
            None => self.position,
        };
        self.position += 1;
        Ok(Some(self.shape.get_geometry(g)))
    }

    fn current_id(&self) -> i64 {
        self.current
    }
}

// ─── Iterator adapter ────────────────────────────────────────────────────────

/// Iterator over `(id, geometry)` pairs; stops after the first error.
pub struct CursorIter<C> {
    cursor: C,
    done: bool,
}

impl<C: GeometryCursor> CursorIter<C> {
    pub fn new(cursor: C) -> Self {
        Self {
            cursor,
            done: false,
        }
    }
}

impl<C: GeometryCursor> Iterator for CursorIter<C> {
    type Item = KernelResult<(i64, Geometry)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.cursor.next() {
            Ok(Some(g)) => Some(Ok((self.cursor.current_id(), g))),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Drain a cursor into `(id, geometry)` pairs.
pub fn collect_cursor(cursor: impl GeometryCursor) -> KernelResult<Vec<(i64, Geometry)>> {
    CursorIter::new(cursor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pt(x: f64) -> Geometry {
        Geometry::point(x, 0.0)
    }

    #[test]
    fn test_simple_cursor_exhaustion_is_sticky() {
        let mut c = SimpleGeometryCursor::new(vec![pt(0.0), pt(1.0)]);
        assert!(c.next().unwrap().is_some());
        assert_eq!(c.current_id(), 0);
        assert!(c.next().unwrap().is_some());
        assert_eq!(c.current_id(), 1);
        for _ in 0..3 {
            assert!(c.next().unwrap().is_none());
            assert_eq!(c.current_id(), -1);
        }
    }

    #[test]
    fn test_append_cursor_switches_once() {
        let a = SimpleGeometryCursor::with_ids(vec![(10, pt(0.0))]);
        let b = SimpleGeometryCursor::with_ids(vec![(20, pt(1.0)), (21, pt(2.0))]);
        let items = collect_cursor(AppendCursor::new(a, b)).unwrap();
        let ids: Vec<i64> = items.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![10, 20, 21]);
    }

    #[test]
    fn test_append_cursor_with_empty_first() {
        let mut c = AppendCursor::new(SimpleGeometryCursor::empty(), SimpleGeometryCursor::single(pt(3.0)));
        assert_eq!(c.next().unwrap(), Some(pt(3.0)));
        assert_eq!(c.next().unwrap(), None);
        assert_eq!(c.next().unwrap(), None);
    }

    #[test]
    fn test_listening_cursor_waits_for_finish() {
        let (handle, mut cursor) = listening_cursor();
        assert!(cursor.next().unwrap().is_none());
        assert!(!cursor.is_finished());
        handle.push(pt(0.0));
        handle.push_with_id(99, pt(1.0));
        assert!(cursor.next().unwrap().is_some());
        assert_eq!(cursor.current_id(), 0);
        assert!(cursor.next().unwrap().is_some());
        assert_eq!(cursor.current_id(), 99);
        handle.finish();
        assert!(cursor.next().unwrap().is_none());
        assert!(cursor.is_finished());
        handle.push(pt(2.0));
        assert!(cursor.next().unwrap().is_none());
    }

    #[test]
    fn test_append_cursor_waits_on_pending_first() {
        let (handle, queue) = listening_cursor();
        let mut c = AppendCursor::new(queue, SimpleGeometryCursor::with_ids(vec![(5, pt(9.0))]));
        assert_eq!(c.next().unwrap(), None);
        assert!(c.is_pending());
        assert_eq!(c.current_id(), -1);
        handle.push(pt(1.0));
        handle.finish();
        assert_eq!(c.next().unwrap(), Some(pt(1.0)));
        assert_eq!(c.current_id(), 0);
        assert_eq!(c.next().unwrap(), Some(pt(9.0)));
        assert_eq!(c.current_id(), 5);
        assert_eq!(c.next().unwrap(), None);
        assert!(!c.is_pending());
    }

    #[test]
    fn test_edit_shape_cursor_uses_user_index() {
        let mut shape = EditShape::new();
        let slot = shape.create_geometry_user_index();
        let a = shape.add_geometry(&pt(0.0));
        let b = shape.add_geometry(&pt(1.0));
        shape.set_geometry_user_index(a, slot, 7);
        shape.set_geometry_user_index(b, slot, 8);
        let items = collect_cursor(EditShapeCursor::new(shape, Some(slot))).unwrap();
        assert_eq!(items.iter().map(|(id, _)| *id).collect::<Vec<_>>(), vec![7, 8]);
        assert_eq!(items[1].1, pt(1.0));
    }
}
