//! Signal Graph
//!
//! Typed value cells wired into a dependency DAG:
//! - `SignalGraph::create` - input cell written by the host
//! - `Signal::map` - derived cell over one source
//! - `SignalGraph::combine` (and `map2`..`map4`) - derived cell over several sources
//!
//! Propagation is synchronous. A write marks the direct dependents dirty and
//! the scheduler drains the dirty set in `(rank, id)` order, where a derived
//! cell's rank is one more than its highest source. Every source of a cell has
//! therefore settled before that cell recomputes, so a combine never sees a
//! fresh value next to a stale one.
//!
//! Writes made inside `SignalGraph::batch` are stored immediately but only
//! propagated when the outermost batch closes.
//!
//! Sources hold their dependents weakly. Dropping the last handle to a derived
//! cell unmounts it; dead entries are pruned on the next propagation.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Deref;
use std::rc::{Rc, Weak};

type NodeId = u64;

/// A cell as seen by the scheduler
trait Node {
    /// Recompute from sources, returning true when the stored value changed
    fn recompute(&self) -> bool;

    /// Queue every live dependent for recomputation
    fn schedule_dependents(&self);
}

/// Propagation state shared by every cell of one graph
#[derive(Default)]
struct Scheduler {
    next_id: Cell<NodeId>,
    batch_depth: Cell<usize>,
    flushing: Cell<bool>,
    dirty: RefCell<BTreeMap<(usize, NodeId), Weak<dyn Node>>>,
}

impl Scheduler {
    fn allocate_id(&self) -> NodeId {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        id
    }

    fn enqueue(&self, rank: usize, id: NodeId, node: Weak<dyn Node>) {
        self.dirty.borrow_mut().insert((rank, id), node);
    }

    /// Drain the dirty set unless a batch is open or a drain is already running
    fn flush(&self) {
        if self.batch_depth.get() > 0 || self.flushing.get() {
            return;
        }
        self.flushing.set(true);

        let mut recomputed = 0usize;
        loop {
            let next = self.dirty.borrow_mut().pop_first();
            let Some((_, weak)) = next else { break };
            let Some(node) = weak.upgrade() else { continue };

            recomputed += 1;
            if node.recompute() {
                node.schedule_dependents();
            }
        }

        self.flushing.set(false);
        if recomputed > 0 {
            tracing::trace!(recomputed, "signal propagation settled");
        }
    }
}

/// Dependent registration entry
struct Dependent {
    rank: usize,
    id: NodeId,
    node: Weak<dyn Node>,
}

struct Inner<T> {
    id: NodeId,
    rank: usize,
    value: RefCell<T>,
    compute: Option<Box<dyn Fn() -> T>>,
    dependents: RefCell<Vec<Dependent>>,
    scheduler: Rc<Scheduler>,
}

impl<T: PartialEq + 'static> Node for Inner<T> {
    fn recompute(&self) -> bool {
        let Some(compute) = &self.compute else {
            return false;
        };

        let next = compute();
        let mut current = self.value.borrow_mut();
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    }

    fn schedule_dependents(&self) {
        let mut dependents = self.dependents.borrow_mut();
        dependents.retain(|d| d.node.strong_count() > 0);
        for dependent in dependents.iter() {
            self.scheduler
                .enqueue(dependent.rank, dependent.id, dependent.node.clone());
        }
    }
}

/// Type-erased view of a cell used when wiring a derived cell to its sources
pub trait AnySignal {
    /// Propagation rank (0 for inputs)
    fn rank(&self) -> usize;

    /// Register a dependent recomputed whenever this cell changes
    #[doc(hidden)]
    fn attach(&self, dependent: DependentHandle);
}

/// Opaque dependent registration passed to `AnySignal::attach`
#[doc(hidden)]
pub struct DependentHandle(Dependent);

/// A typed cell in a signal graph
///
/// Cloning a `Signal` clones the handle, not the value.
pub struct Signal<T> {
    inner: Rc<Inner<T>>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("rank", &self.inner.rank)
            .field("value", &self.inner.value.borrow())
            .finish()
    }
}

impl<T: PartialEq + 'static> Signal<T> {
    /// Current value
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.inner.value.borrow().clone()
    }

    /// Borrow the current value
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Derive a cell recomputed whenever this one changes
    pub fn map<U, F>(&self, f: F) -> Signal<U>
    where
        U: PartialEq + 'static,
        F: Fn(&T) -> U + 'static,
    {
        let source = self.clone();
        self.graph()
            .combine(&[self as &dyn AnySignal], move || source.with(&f))
    }

    /// Registered dependent entries, dead ones included
    #[cfg(test)]
    pub(crate) fn dependent_slots(&self) -> usize {
        self.inner.dependents.borrow().len()
    }

    /// Whether this cell is computed from other cells
    pub fn is_derived(&self) -> bool {
        self.inner.compute.is_some()
    }

    /// Number of mounted cells depending directly on this one
    pub fn dependent_count(&self) -> usize {
        self.inner
            .dependents
            .borrow()
            .iter()
            .filter(|d| d.node.strong_count() > 0)
            .count()
    }

    /// The graph this cell belongs to
    pub fn graph(&self) -> SignalGraph {
        SignalGraph {
            scheduler: Rc::clone(&self.inner.scheduler),
        }
    }
}

impl<T: PartialEq + 'static> AnySignal for Signal<T> {
    fn rank(&self) -> usize {
        self.inner.rank
    }

    fn attach(&self, dependent: DependentHandle) {
        let mut dependents = self.inner.dependents.borrow_mut();
        // unmounted cells are otherwise only pruned when this cell changes
        dependents.retain(|d| d.node.strong_count() > 0);
        dependents.push(dependent.0);
    }
}

/// A host-writable cell
pub struct Input<T> {
    signal: Signal<T>,
}

impl<T> Clone for Input<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal.clone(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Input<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Input").field(&self.signal).finish()
    }
}

impl<T> Deref for Input<T> {
    type Target = Signal<T>;

    fn deref(&self) -> &Signal<T> {
        &self.signal
    }
}

impl<T: PartialEq + 'static> Input<T> {
    /// Write a new value and propagate it (deferred while a batch is open)
    ///
    /// Writing a value equal to the current one is a no-op.
    pub fn set(&self, value: T) {
        let inner = &self.signal.inner;
        {
            let mut current = inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value;
        }
        inner.schedule_dependents();
        inner.scheduler.flush();
    }

    /// Modify the value in place through a clone of the current value
    pub fn update(&self, f: impl FnOnce(&mut T))
    where
        T: Clone,
    {
        let mut value = self.signal.get();
        f(&mut value);
        self.set(value);
    }

    /// Read-only handle to this cell
    pub fn signal(&self) -> &Signal<T> {
        &self.signal
    }
}

impl<T: PartialEq + 'static> AnySignal for Input<T> {
    fn rank(&self) -> usize {
        self.signal.rank()
    }

    fn attach(&self, dependent: DependentHandle) {
        self.signal.attach(dependent);
    }
}

/// Handle to a graph of cells sharing one propagation scheduler
#[derive(Clone, Default)]
pub struct SignalGraph {
    scheduler: Rc<Scheduler>,
}

impl fmt::Debug for SignalGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalGraph")
            .field("cells", &self.scheduler.next_id.get())
            .field("batch_depth", &self.scheduler.batch_depth.get())
            .finish()
    }
}

impl SignalGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input cell holding `value`
    pub fn create<T: PartialEq + 'static>(&self, value: T) -> Input<T> {
        let inner = Rc::new(Inner {
            id: self.scheduler.allocate_id(),
            rank: 0,
            value: RefCell::new(value),
            compute: None,
            dependents: RefCell::new(Vec::new()),
            scheduler: Rc::clone(&self.scheduler),
        });
        Input {
            signal: Signal { inner },
        }
    }

    /// Create a cell recomputed whenever any of `sources` changes
    ///
    /// `compute` reads the sources through handles it captured. It runs once
    /// immediately, then after every propagation that touched a source.
    pub fn combine<T, F>(&self, sources: &[&dyn AnySignal], compute: F) -> Signal<T>
    where
        T: PartialEq + 'static,
        F: Fn() -> T + 'static,
    {
        let rank = sources.iter().map(|s| s.rank()).max().unwrap_or(0) + 1;
        let id = self.scheduler.allocate_id();
        let inner = Rc::new(Inner {
            id,
            rank,
            value: RefCell::new(compute()),
            compute: Some(Box::new(compute)),
            dependents: RefCell::new(Vec::new()),
            scheduler: Rc::clone(&self.scheduler),
        });

        let node: Rc<dyn Node> = inner.clone();
        let weak = Rc::downgrade(&node);
        for source in sources {
            source.attach(DependentHandle(Dependent {
                rank,
                id,
                node: weak.clone(),
            }));
        }

        Signal { inner }
    }

    /// Derived cell over two sources
    pub fn map2<A, B, T, F>(&self, a: &Signal<A>, b: &Signal<B>, f: F) -> Signal<T>
    where
        A: PartialEq + 'static,
        B: PartialEq + 'static,
        T: PartialEq + 'static,
        F: Fn(&A, &B) -> T + 'static,
    {
        let (sa, sb) = (a.clone(), b.clone());
        self.combine(&[a as &dyn AnySignal, b], move || {
            sa.with(|a| sb.with(|b| f(a, b)))
        })
    }

    /// Derived cell over three sources
    pub fn map3<A, B, C, T, F>(
        &self,
        a: &Signal<A>,
        b: &Signal<B>,
        c: &Signal<C>,
        f: F,
    ) -> Signal<T>
    where
        A: PartialEq + 'static,
        B: PartialEq + 'static,
        C: PartialEq + 'static,
        T: PartialEq + 'static,
        F: Fn(&A, &B, &C) -> T + 'static,
    {
        let (sa, sb, sc) = (a.clone(), b.clone(), c.clone());
        self.combine(&[a as &dyn AnySignal, b, c], move || {
            sa.with(|a| sb.with(|b| sc.with(|c| f(a, b, c))))
        })
    }

    /// Derived cell over four sources
    pub fn map4<A, B, C, D, T, F>(
        &self,
        a: &Signal<A>,
        b: &Signal<B>,
        c: &Signal<C>,
        d: &Signal<D>,
        f: F,
    ) -> Signal<T>
    where
        A: PartialEq + 'static,
        B: PartialEq + 'static,
        C: PartialEq + 'static,
        D: PartialEq + 'static,
        T: PartialEq + 'static,
        F: Fn(&A, &B, &C, &D) -> T + 'static,
    {
        let (sa, sb, sc, sd) = (a.clone(), b.clone(), c.clone(), d.clone());
        self.combine(&[a as &dyn AnySignal, b, c, d], move || {
            sa.with(|a| sb.with(|b| sc.with(|c| sd.with(|d| f(a, b, c, d)))))
        })
    }

    /// Run `f` with propagation deferred until the outermost batch closes
    pub fn batch<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = BatchGuard::open(&self.scheduler);
        f()
    }

    /// Whether a batch is currently open
    pub fn is_batching(&self) -> bool {
        self.scheduler.batch_depth.get() > 0
    }
}

/// Closes a batch level on drop and propagates once the last level closes
struct BatchGuard<'a> {
    scheduler: &'a Scheduler,
}

impl<'a> BatchGuard<'a> {
    fn open(scheduler: &'a Scheduler) -> Self {
        scheduler.batch_depth.set(scheduler.batch_depth.get() + 1);
        Self { scheduler }
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        let depth = self.scheduler.batch_depth.get().saturating_sub(1);
        self.scheduler.batch_depth.set(depth);
        if depth == 0 && !std::thread::panicking() {
            self.scheduler.flush();
        }
    }
}
