//! Attribute evaluation engine
//!
//! Attributes are write-once cells keyed by a subject (a node or a built-in
//! declaration) and an attribute name. Rules declare the cells they read and
//! the cells they write; a rule fires exactly once, as soon as every input
//! holds a value. Firing order among ready rules is first come, first served.
//!
//! A rule body may write its outputs, report errors and register new rules.
//! Rules that never become ready are left alone: the engine stops at the
//! fixpoint and reports how many rules stalled.

use std::collections::hash_map::Entry;
use std::collections::VecDeque;

use rustc_hash::FxHashMap;

use super::scope::{Builtin, DeclRef, ScopeId};
use super::types::Type;
use crate::ast::NodeId;
use crate::errors::SemaError;

/// Owner of an attribute cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Node(NodeId),
    Builtin(Builtin),
}

impl From<NodeId> for Subject {
    fn from(id: NodeId) -> Self {
        Subject::Node(id)
    }
}

impl From<Builtin> for Subject {
    fn from(builtin: Builtin) -> Self {
        Subject::Builtin(builtin)
    }
}

impl From<DeclRef> for Subject {
    fn from(decl: DeclRef) -> Self {
        match decl {
            DeclRef::Node(id) => Subject::Node(id),
            DeclRef::Builtin(builtin) => Subject::Builtin(builtin),
        }
    }
}

/// Attribute names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Attr {
    /// Type of an expression or declaration
    Type,
    /// Scope opened by a node, or the scope a name was found in
    Scope,
    /// Declaration a reference resolves to
    Decl,
    /// Whether control unconditionally exits
    Returns,
    /// Type denoted by a type node
    Value,
    /// Type introduced by a type declaration
    Declared,
    /// Position of a call argument
    Index,
}

/// Identifier of an attribute cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId {
    pub subject: Subject,
    pub attr: Attr,
}

impl CellId {
    pub fn new(subject: impl Into<Subject>, attr: Attr) -> Self {
        Self {
            subject: subject.into(),
            attr,
        }
    }

    pub fn ty(subject: impl Into<Subject>) -> Self {
        Self::new(subject, Attr::Type)
    }

    pub fn value(subject: impl Into<Subject>) -> Self {
        Self::new(subject, Attr::Value)
    }

    pub fn declared(subject: impl Into<Subject>) -> Self {
        Self::new(subject, Attr::Declared)
    }

    pub fn returns(subject: impl Into<Subject>) -> Self {
        Self::new(subject, Attr::Returns)
    }
}

/// Content of an attribute cell
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Type(Type),
    Scope(ScopeId),
    Decl(DeclRef),
    Bool(bool),
    Index(usize),
}

impl Value {
    pub fn as_type(&self) -> Option<&Type> {
        match self {
            Value::Type(ty) => Some(ty),
            _ => None,
        }
    }

    pub fn as_scope(&self) -> Option<ScopeId> {
        match self {
            Value::Scope(scope) => Some(*scope),
            _ => None,
        }
    }

    pub fn as_decl(&self) -> Option<DeclRef> {
        match self {
            Value::Decl(decl) => Some(*decl),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            Value::Index(i) => Some(*i),
            _ => None,
        }
    }
}

impl From<Type> for Value {
    fn from(ty: Type) -> Self {
        Value::Type(ty)
    }
}

impl From<ScopeId> for Value {
    fn from(scope: ScopeId) -> Self {
        Value::Scope(scope)
    }
}

impl From<DeclRef> for Value {
    fn from(decl: DeclRef) -> Self {
        Value::Decl(decl)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<usize> for Value {
    fn from(i: usize) -> Self {
        Value::Index(i)
    }
}

type RuleBody<'a, C> = Box<dyn FnOnce(&mut Firing<'_, 'a, C>) + 'a>;

/// A deferred computation over attribute cells
pub struct Rule<'a, C> {
    label: &'static str,
    inputs: Vec<CellId>,
    outputs: Vec<CellId>,
    body: RuleBody<'a, C>,
}

impl<'a, C> Rule<'a, C> {
    pub fn new(
        label: &'static str,
        inputs: Vec<CellId>,
        outputs: Vec<CellId>,
        body: impl FnOnce(&mut Firing<'_, 'a, C>) + 'a,
    ) -> Self {
        Self {
            label,
            inputs,
            outputs,
            body: Box::new(body),
        }
    }

    /// A rule that copies its single input into its single output
    pub fn copy(label: &'static str, from: CellId, to: CellId) -> Self {
        Self::new(label, vec![from], vec![to], |f| {
            if let Some(value) = f.input(0) {
                f.set(0, value.clone());
            }
        })
    }
}

/// Handle given to a rule body while it fires
pub struct Firing<'f, 'a, C> {
    ctx: &'f C,
    cells: &'f FxHashMap<CellId, Value>,
    inputs: &'f [CellId],
    outputs: &'f [CellId],
    label: &'static str,
    writes: Vec<(CellId, Value)>,
    spawned: Vec<Rule<'a, C>>,
    errors: Vec<SemaError>,
}

impl<'f, 'a, C> Firing<'f, 'a, C> {
    pub fn ctx(&self) -> &'f C {
        self.ctx
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Value of the input at `index`
    pub fn input(&self, index: usize) -> Option<&'f Value> {
        let cells = self.cells;
        self.inputs.get(index).and_then(|cell| cells.get(cell))
    }

    pub fn ty(&self, index: usize) -> Option<&'f Type> {
        self.input(index).and_then(Value::as_type)
    }

    pub fn decl(&self, index: usize) -> Option<DeclRef> {
        self.input(index).and_then(Value::as_decl)
    }

    pub fn flag(&self, index: usize) -> Option<bool> {
        self.input(index).and_then(Value::as_bool)
    }

    pub fn position(&self, index: usize) -> Option<usize> {
        self.input(index).and_then(Value::as_index)
    }

    /// Any cell that already holds a value, declared as input or not
    pub fn peek(&self, cell: CellId) -> Option<&'f Value> {
        self.cells.get(&cell)
    }

    /// Write the output at `index`
    pub fn set(&mut self, index: usize, value: impl Into<Value>) {
        match self.outputs.get(index) {
            Some(cell) => self.writes.push((*cell, value.into())),
            None => tracing::error!(
                rule = self.label,
                index,
                "rule wrote an output it did not declare"
            ),
        }
    }

    pub fn error(&mut self, error: SemaError) {
        self.errors.push(error);
    }

    /// Register a new rule; it fires once its own inputs are ready
    pub fn spawn(&mut self, rule: Rule<'a, C>) {
        self.spawned.push(rule);
    }
}

/// Index of a registered rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId(usize);

struct Slot<'a, C> {
    label: &'static str,
    inputs: Vec<CellId>,
    outputs: Vec<CellId>,
    /// `None` once fired
    body: Option<RuleBody<'a, C>>,
    /// Number of distinct inputs still unset
    missing: usize,
}

/// A cell written more than once
#[derive(Debug, Clone, PartialEq)]
pub struct Conflict {
    pub cell: CellId,
    /// Label of the rule attempting the second write
    pub rule: &'static str,
}

/// Outcome of running the engine to its fixpoint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fixpoint {
    pub fired: usize,
    pub stalled: usize,
    /// Dependency cycles among stalled rules, as rule labels
    pub cycles: Vec<Vec<&'static str>>,
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Active,
    Done,
}

/// The cell store and rule scheduler
pub struct Engine<'a, C> {
    cells: FxHashMap<CellId, Value>,
    rules: Vec<Slot<'a, C>>,
    waiters: FxHashMap<CellId, Vec<RuleId>>,
    producers: FxHashMap<CellId, Vec<RuleId>>,
    ready: VecDeque<RuleId>,
    errors: Vec<SemaError>,
    conflicts: Vec<Conflict>,
    fired: usize,
}

impl<'a, C> Default for Engine<'a, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, C> Engine<'a, C> {
    pub fn new() -> Self {
        Self {
            cells: FxHashMap::default(),
            rules: Vec::new(),
            waiters: FxHashMap::default(),
            producers: FxHashMap::default(),
            ready: VecDeque::new(),
            errors: Vec::new(),
            conflicts: Vec::new(),
            fired: 0,
        }
    }

    /// Write a cell directly, outside any rule
    pub fn set(&mut self, cell: CellId, value: impl Into<Value>) {
        self.write(cell, value.into(), "direct");
    }

    pub fn get(&self, cell: CellId) -> Option<&Value> {
        self.cells.get(&cell)
    }

    pub fn report(&mut self, error: SemaError) {
        self.errors.push(error);
    }

    pub fn errors(&self) -> &[SemaError] {
        &self.errors
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Register a rule. It is queued right away if its inputs are all set.
    pub fn add(&mut self, rule: Rule<'a, C>) -> RuleId {
        let id = RuleId(self.rules.len());
        let Rule {
            label,
            inputs,
            outputs,
            body,
        } = rule;

        let mut missing = 0;
        for (i, cell) in inputs.iter().enumerate() {
            if inputs[..i].contains(cell) || self.cells.contains_key(cell) {
                continue;
            }
            missing += 1;
            self.waiters.entry(*cell).or_default().push(id);
        }
        for cell in &outputs {
            self.producers.entry(*cell).or_default().push(id);
        }

        self.rules.push(Slot {
            label,
            inputs,
            outputs,
            body: Some(body),
            missing,
        });
        if missing == 0 {
            self.ready.push_back(id);
        }
        id
    }

    /// Fire rules until none is ready
    pub fn run(&mut self, ctx: &C) -> Fixpoint {
        while let Some(id) = self.ready.pop_front() {
            let Some(body) = self.rules[id.0].body.take() else {
                continue;
            };
            self.fired += 1;

            let slot = &self.rules[id.0];
            tracing::trace!(rule = slot.label, "firing");
            let mut firing = Firing {
                ctx,
                cells: &self.cells,
                inputs: &slot.inputs,
                outputs: &slot.outputs,
                label: slot.label,
                writes: Vec::new(),
                spawned: Vec::new(),
                errors: Vec::new(),
            };
            body(&mut firing);

            let Firing {
                label,
                writes,
                spawned,
                errors,
                ..
            } = firing;
            for (cell, value) in writes {
                self.write(cell, value, label);
            }
            self.errors.extend(errors);
            for rule in spawned {
                self.add(rule);
            }
        }

        let stalled = self.rules.iter().filter(|slot| slot.body.is_some()).count();
        let cycles: Vec<Vec<&'static str>> = self
            .find_cycles()
            .into_iter()
            .map(|cycle| cycle.into_iter().map(|id| self.rules[id.0].label).collect())
            .collect();

        tracing::debug!(fired = self.fired, stalled, "attribute fixpoint reached");
        for cycle in &cycles {
            tracing::warn!(rules = ?cycle, "dependency cycle among stalled rules");
        }

        Fixpoint {
            fired: self.fired,
            stalled,
            cycles,
        }
    }

    /// Consume the engine, keeping the cells, the errors and the conflicts
    pub fn into_parts(self) -> (FxHashMap<CellId, Value>, Vec<SemaError>, Vec<Conflict>) {
        (self.cells, self.errors, self.conflicts)
    }

    fn write(&mut self, cell: CellId, value: Value, label: &'static str) {
        match self.cells.entry(cell) {
            Entry::Occupied(_) => {
                tracing::error!(?cell, rule = label, "attribute written twice");
                self.conflicts.push(Conflict { cell, rule: label });
            }
            Entry::Vacant(entry) => {
                entry.insert(value);
                for id in self.waiters.remove(&cell).unwrap_or_default() {
                    let slot = &mut self.rules[id.0];
                    slot.missing -= 1;
                    if slot.missing == 0 {
                        self.ready.push_back(id);
                    }
                }
            }
        }
    }

    /// Stalled rules producing a cell that the stalled rule `id` waits on
    fn blockers(&self, id: RuleId) -> Vec<RuleId> {
        let slot = &self.rules[id.0];
        slot.inputs
            .iter()
            .filter(|cell| !self.cells.contains_key(cell))
            .filter_map(|cell| self.producers.get(cell))
            .flatten()
            .copied()
            .filter(|producer| self.rules[producer.0].body.is_some())
            .collect()
    }

    fn find_cycles(&self) -> Vec<Vec<RuleId>> {
        let mut marks: FxHashMap<RuleId, Mark> = FxHashMap::default();
        let mut cycles = Vec::new();

        for start in (0..self.rules.len()).map(RuleId) {
            if self.rules[start.0].body.is_none() || marks.contains_key(&start) {
                continue;
            }
            marks.insert(start, Mark::Active);
            let mut stack = vec![(start, self.blockers(start), 0usize)];

            while let Some((node, next, cursor)) = stack.last_mut() {
                let Some(&succ) = next.get(*cursor) else {
                    let done = *node;
                    marks.insert(done, Mark::Done);
                    stack.pop();
                    continue;
                };
                *cursor += 1;

                match marks.get(&succ) {
                    None => {
                        marks.insert(succ, Mark::Active);
                        let blockers = self.blockers(succ);
                        stack.push((succ, blockers, 0));
                    }
                    Some(Mark::Active) => {
                        let from = stack.iter().position(|(n, ..)| *n == succ).unwrap_or(0);
                        cycles.push(stack[from..].iter().map(|(n, ..)| *n).collect());
                    }
                    Some(Mark::Done) => {}
                }
            }
        }

        cycles
    }
}
