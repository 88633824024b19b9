use std::sync::atomic::{AtomicU64, Ordering};

use entity::deal::{self, Stage};
use uuid::Uuid;

/// Partition a fetched deal set into the five pipeline columns, preserving
/// each deal's fetch order within its column. Every deal lands in exactly
/// one bucket; columns always come out in pipeline order, empty or not.
pub fn partition_by_stage(deals: Vec<deal::Model>) -> Vec<(Stage, Vec<deal::Model>)> {
    let mut columns: Vec<(Stage, Vec<deal::Model>)> =
        Stage::ALL.iter().map(|stage| (*stage, Vec::new())).collect();
    for model in deals {
        let slot = columns
            .iter_mut()
            .find(|(stage, _)| *stage == model.stage)
            .expect("Stage::ALL covers every stage value");
        slot.1.push(model);
    }
    columns
}

/// Monotonic ticket dispenser guarding against overlapping loads: a snapshot
/// is applied only if its ticket is still the newest one issued, so a slow
/// first response can never overwrite a faster second one.
#[derive(Debug, Default)]
pub struct LoadSequence {
    issued: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket(u64);

impl LoadSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> LoadTicket {
        LoadTicket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: LoadTicket) -> bool {
        self.issued.load(Ordering::SeqCst) == ticket.0
    }
}

/// Marker for the single in-flight drag gesture. Rendering concern only;
/// cleared unconditionally when the gesture ends, committed or cancelled.
#[derive(Debug, Default)]
pub struct DragState {
    active: Option<Uuid>,
}

impl DragState {
    pub fn start(&mut self, deal_id: Uuid) {
        self.active = Some(deal_id);
    }

    pub fn end(&mut self) {
        self.active = None;
    }

    pub fn is_dragging(&self, deal_id: Uuid) -> bool {
        self.active == Some(deal_id)
    }

    pub fn active(&self) -> Option<Uuid> {
        self.active
    }
}

/// In-memory view-model an embedding UI keeps per board screen: the current
/// columns plus the drag marker and the load-race guard.
#[derive(Debug, Default)]
pub struct BoardSession {
    sequence: LoadSequence,
    drag: DragState,
    columns: Vec<(Stage, Vec<deal::Model>)>,
}

impl BoardSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin_load(&self) -> LoadTicket {
        self.sequence.begin()
    }

    /// Apply a fetched snapshot. Returns false (leaving the columns alone)
    /// when a newer load has been issued since this ticket.
    pub fn apply_snapshot(&mut self, ticket: LoadTicket, deals: Vec<deal::Model>) -> bool {
        if !self.sequence.is_current(ticket) {
            return false;
        }
        self.columns = partition_by_stage(deals);
        true
    }

    pub fn columns(&self) -> &[(Stage, Vec<deal::Model>)] {
        &self.columns
    }

    pub fn drag_mut(&mut self) -> &mut DragState {
        &mut self.drag
    }

    pub fn drag(&self) -> &DragState {
        &self.drag
    }
}
