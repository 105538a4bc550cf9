use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// Opaque handle to one open overlay. Used only for identification and
/// removal, never ownership.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OverlayId(u64);

impl OverlayId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }
}

struct Slots<S> {
    surfaces: Vec<(OverlayId, S)>,
    next_id: u64,
}

impl<S> Slots<S> {
    fn allocate(&mut self) -> OverlayId {
        let id = OverlayId(self.next_id);
        self.next_id += 1;
        id
    }
}

fn detach<S>(slots: &RefCell<Slots<S>>, id: OverlayId) -> Option<S> {
    let mut slots = slots.borrow_mut();
    let pos = slots.surfaces.iter().position(|(i, _)| *i == id)?;
    Some(slots.surfaces.remove(pos).1)
}

/// Ordered registry of open overlay surfaces, creation order preserved.
/// Cloning shares the registry; surfaces stay inside a `RefCell`, so surface
/// callbacks invoked by the registry must not re-enter it for *other* ids
/// while they run (re-entry for the surface's own, already-detached id is
/// always safe).
pub struct OverlayStack<S> {
    inner: Rc<RefCell<Slots<S>>>,
}

impl<S> Clone for OverlayStack<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<S> OverlayStack<S> {
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Slots {
                surfaces: Vec::new(),
                next_id: 0,
            })),
        }
    }

    /// Construct a surface via the factory (which receives the fresh id) and
    /// append it.
    pub fn open(&self, factory: impl FnOnce(OverlayId) -> S) -> OverlayId {
        let id = self.inner.borrow_mut().allocate();
        let surface = factory(id);
        self.inner.borrow_mut().surfaces.push((id, surface));
        id
    }

    /// Detach a surface. Unknown ids are a harmless no-op (`None`): an
    /// overlay may be asked to close after another path already tore it down.
    pub fn remove(&self, id: OverlayId) -> Option<S> {
        detach(&self.inner, id)
    }

    pub fn contains(&self, id: OverlayId) -> bool {
        self.inner
            .borrow()
            .surfaces
            .iter()
            .any(|(i, _)| *i == id)
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().surfaces.is_empty()
    }

    pub fn front_id(&self) -> Option<OverlayId> {
        self.inner.borrow().surfaces.first().map(|(id, _)| *id)
    }

    pub fn ids(&self) -> Vec<OverlayId> {
        self.inner.borrow().surfaces.iter().map(|(id, _)| *id).collect()
    }

    /// Visit surfaces in creation order with their slot index
    pub fn for_each(&self, mut f: impl FnMut(usize, OverlayId, &S)) {
        for (slot, (id, surface)) in self.inner.borrow().surfaces.iter().enumerate() {
            f(slot, *id, surface);
        }
    }
}

impl<S> Default for OverlayStack<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// A surface that stacks visually and shifts up when a sibling below it goes
/// away.
pub trait NotificationSurface {
    fn reposition(&mut self, slot: usize);
}

fn compact<S: NotificationSurface>(slots: &RefCell<Slots<S>>) {
    for (slot, (_, surface)) in slots.borrow_mut().surfaces.iter_mut().enumerate() {
        surface.reposition(slot);
    }
}

/// Notification flavor: every removal compacts the stack, sending each
/// remaining surface exactly one reposition signal with its new slot.
pub struct NotificationStack<S: NotificationSurface> {
    stack: OverlayStack<S>,
}

impl<S: NotificationSurface> Clone for NotificationStack<S> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

impl<S: NotificationSurface> NotificationStack<S> {
    pub fn new() -> Self {
        Self {
            stack: OverlayStack::new(),
        }
    }

    /// The factory receives a weak back-reference the surface may keep for
    /// self-dismissal.
    pub fn open(&self, factory: impl FnOnce(NotificationHandle<S>) -> S) -> OverlayId {
        let id = self.stack.inner.borrow_mut().allocate();
        let handle = NotificationHandle {
            slots: Rc::downgrade(&self.stack.inner),
            id,
        };
        let surface = factory(handle);
        self.stack.inner.borrow_mut().surfaces.push((id, surface));
        id
    }

    pub fn dismiss(&self, id: OverlayId) -> bool {
        match self.stack.remove(id) {
            Some(_) => {
                compact(&self.stack.inner);
                true
            }
            None => false,
        }
    }

    /// Dismiss every surface the predicate selects, compacting after each
    pub fn dismiss_where(&self, pred: impl Fn(&S) -> bool) -> usize {
        let doomed: Vec<OverlayId> = {
            self.stack
                .inner
                .borrow()
                .surfaces
                .iter()
                .filter(|(_, s)| pred(s))
                .map(|(id, _)| *id)
                .collect()
        };
        doomed.iter().filter(|id| self.dismiss(**id)).count()
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(usize, OverlayId, &S)) {
        self.stack.for_each(f);
    }
}

impl<S: NotificationSurface> Default for NotificationStack<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning back-reference a notification keeps to request its own removal
pub struct NotificationHandle<S: NotificationSurface> {
    slots: Weak<RefCell<Slots<S>>>,
    id: OverlayId,
}

impl<S: NotificationSurface> NotificationHandle<S> {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn dismiss(&self) -> bool {
        let Some(slots) = self.slots.upgrade() else {
            return false;
        };
        match detach(&slots, self.id) {
            Some(_) => {
                compact(&slots);
                true
            }
            None => false,
        }
    }
}

/// A free-floating overlay with its own teardown
pub trait QuicklookSurface {
    fn close(&mut self);
}

/// Quicklook flavor: surfaces are independent (no reposition signals);
/// `close_all` sweeps from the front, tolerating re-entrant self-removal.
pub struct QuicklookShelf<S: QuicklookSurface> {
    stack: OverlayStack<S>,
}

impl<S: QuicklookSurface> Clone for QuicklookShelf<S> {
    fn clone(&self) -> Self {
        Self {
            stack: self.stack.clone(),
        }
    }
}

impl<S: QuicklookSurface> QuicklookShelf<S> {
    pub fn new() -> Self {
        Self {
            stack: OverlayStack::new(),
        }
    }

    pub fn open(&self, factory: impl FnOnce(QuicklookHandle<S>) -> S) -> OverlayId {
        let id = self.stack.inner.borrow_mut().allocate();
        let handle = QuicklookHandle {
            slots: Rc::downgrade(&self.stack.inner),
            id,
        };
        let surface = factory(handle);
        self.stack.inner.borrow_mut().surfaces.push((id, surface));
        id
    }

    /// Detach and tear down one surface; false if it was already gone
    pub fn dismiss(&self, id: OverlayId) -> bool {
        match self.stack.remove(id) {
            Some(mut surface) => {
                surface.close();
                true
            }
            None => false,
        }
    }

    /// Close every surface, front first. The surface is detached before its
    /// teardown runs, so a teardown that re-enters removal for its own id
    /// finds nothing and the loop strictly shrinks the collection.
    pub fn close_all(&self) {
        while let Some(id) = self.stack.front_id() {
            if let Some(mut surface) = self.stack.remove(id) {
                surface.close();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn for_each(&self, f: impl FnMut(usize, OverlayId, &S)) {
        self.stack.for_each(f);
    }
}

impl<S: QuicklookSurface> Default for QuicklookShelf<S> {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-owning back-reference a quicklook keeps to splice itself out during
/// its own teardown. Does not run teardown again.
pub struct QuicklookHandle<S: QuicklookSurface> {
    slots: Weak<RefCell<Slots<S>>>,
    id: OverlayId,
}

impl<S: QuicklookSurface> QuicklookHandle<S> {
    pub fn id(&self) -> OverlayId {
        self.id
    }

    pub fn dismiss(&self) -> bool {
        self.slots
            .upgrade()
            .and_then(|slots| detach(&slots, self.id))
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RepositionLog {
        calls: RefCell<Vec<(u64, usize)>>,
    }

    struct Note {
        tag: u64,
        log: Rc<RepositionLog>,
    }

    impl NotificationSurface for Note {
        fn reposition(&mut self, slot: usize) {
            self.log.calls.borrow_mut().push((self.tag, slot));
        }
    }

    fn note_stack() -> (NotificationStack<Note>, Rc<RepositionLog>) {
        (NotificationStack::new(), Rc::new(RepositionLog::default()))
    }

    #[test]
    fn dismiss_unknown_id_is_a_noop() {
        let (stack, log) = note_stack();
        let sink = Rc::clone(&log);
        let id = stack.open(|_| Note { tag: 1, log: sink });
        assert!(stack.dismiss(id));
        assert!(!stack.dismiss(id), "second dismissal must be a no-op");
        assert_eq!(stack.len(), 0);
    }

    #[test]
    fn removal_sends_one_reposition_to_each_survivor() {
        let (stack, log) = note_stack();
        let mut ids = Vec::new();
        for tag in 1..=3 {
            let sink = Rc::clone(&log);
            ids.push(stack.open(move |_| Note { tag, log: sink }));
        }

        assert!(stack.dismiss(ids[1]));

        let calls = log.calls.borrow().clone();
        assert_eq!(calls, vec![(1, 0), (3, 1)]);
        assert!(!calls.iter().any(|(tag, _)| *tag == 2));
    }

    #[test]
    fn notification_self_dismissal_compacts() {
        let (stack, log) = note_stack();
        let sink_a = Rc::clone(&log);
        stack.open(move |_| Note { tag: 1, log: sink_a });

        let mut kept_handle = None;
        let sink_b = Rc::clone(&log);
        stack.open(|handle| {
            kept_handle = Some(handle);
            Note { tag: 2, log: sink_b }
        });

        let handle = kept_handle.unwrap();
        assert!(handle.dismiss());
        assert!(!handle.dismiss());
        assert_eq!(stack.len(), 1);
        assert_eq!(log.calls.borrow().as_slice(), &[(1, 0)]);
    }

    #[test]
    fn dismiss_where_sweeps_matching_surfaces() {
        let (stack, log) = note_stack();
        for tag in 1..=4 {
            let sink = Rc::clone(&log);
            stack.open(move |_| Note { tag, log: sink });
        }
        let removed = stack.dismiss_where(|note| note.tag % 2 == 0);
        assert_eq!(removed, 2);
        assert_eq!(stack.len(), 2);
    }

    struct Pane {
        tag: u64,
        handle: QuicklookHandle<Pane>,
        closed: Rc<RefCell<Vec<u64>>>,
    }

    impl QuicklookSurface for Pane {
        fn close(&mut self) {
            self.closed.borrow_mut().push(self.tag);
            // Self-initiated teardown path: splice ourselves out, as the
            // real surface does when its window goes away.
            self.handle.dismiss();
        }
    }

    #[test]
    fn close_all_terminates_under_reentrant_removal() {
        let shelf: QuicklookShelf<Pane> = QuicklookShelf::new();
        let closed: Rc<RefCell<Vec<u64>>> = Rc::default();
        for tag in 1..=5 {
            let closed = Rc::clone(&closed);
            shelf.open(move |handle| Pane { tag, handle, closed });
        }

        shelf.close_all();

        assert!(shelf.is_empty());
        assert_eq!(closed.borrow().as_slice(), &[1, 2, 3, 4, 5]);
    }

    #[test]
    fn quicklook_dismiss_runs_teardown_once() {
        let shelf: QuicklookShelf<Pane> = QuicklookShelf::new();
        let closed: Rc<RefCell<Vec<u64>>> = Rc::default();
        let sink = Rc::clone(&closed);
        let id = shelf.open(move |handle| Pane {
            tag: 9,
            handle,
            closed: sink,
        });

        assert!(shelf.dismiss(id));
        assert!(!shelf.dismiss(id));
        assert_eq!(closed.borrow().as_slice(), &[9]);
    }

    #[test]
    fn overlay_ids_are_never_reused() {
        let stack: OverlayStack<u8> = OverlayStack::new();
        let a = stack.open(|_| 0);
        stack.remove(a);
        let b = stack.open(|_| 0);
        assert_ne!(a, b);
    }
}
