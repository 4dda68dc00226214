//! Binding directory
//!
//! One [`BindingSet`] per named profile. Axis bindings are kept as an arena of
//! records numbered in bind order, indexed by control and by physical slot.
//! Button bindings are a many-to-many relation with a forward index (control
//! to bindings) and a reverse index (binding to controls) kept in lockstep.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::binding::{AxisBinding, AxisSlot, ButtonBinding};
use super::types::{Control, Hand};

type RecordId = u64;

#[derive(Debug, Clone)]
struct AxisRecord<C> {
    control: C,
    binding: AxisBinding,
}

/// A named set of control bindings
#[derive(Debug, Clone)]
pub struct BindingSet<C: Control> {
    name: String,
    next_record: RecordId,
    axis_records: HashMap<RecordId, AxisRecord<C>>,
    axis_by_control: BTreeMap<C, Vec<RecordId>>,
    axis_by_slot: HashMap<AxisSlot, BTreeSet<RecordId>>,
    buttons_by_control: BTreeMap<C, BTreeSet<ButtonBinding>>,
    controls_by_button: HashMap<ButtonBinding, BTreeSet<C>>,
}

impl<C: Control> BindingSet<C> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            next_record: 0,
            axis_records: HashMap::new(),
            axis_by_control: BTreeMap::new(),
            axis_by_slot: HashMap::new(),
            buttons_by_control: BTreeMap::new(),
            controls_by_button: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.axis_records.is_empty() && self.buttons_by_control.is_empty()
    }

    // --- axes ---

    /// Add an axis binding for a control.
    ///
    /// Binding a control to a slot it already holds replaces that record, so
    /// the new parameters apply and the control becomes the newest owner.
    pub fn bind_axis(&mut self, control: C, binding: AxisBinding) -> AxisSlot {
        let slot = binding.slot();
        if let Some(existing) = self.record_for(control, slot) {
            self.remove_axis_record(existing);
        }

        let id = self.next_record;
        self.next_record += 1;
        self.axis_records.insert(id, AxisRecord { control, binding });
        self.axis_by_control.entry(control).or_default().push(id);
        self.axis_by_slot.entry(slot).or_default().insert(id);
        slot
    }

    fn record_for(&self, control: C, slot: AxisSlot) -> Option<RecordId> {
        self.axis_by_control.get(&control)?.iter().copied().find(|id| {
            self.axis_records
                .get(id)
                .is_some_and(|record| record.binding.slot() == slot)
        })
    }

    fn remove_axis_record(&mut self, id: RecordId) {
        let Some(record) = self.axis_records.remove(&id) else {
            return;
        };
        if let Some(ids) = self.axis_by_control.get_mut(&record.control) {
            ids.retain(|&other| other != id);
            if ids.is_empty() {
                self.axis_by_control.remove(&record.control);
            }
        }
        let slot = record.binding.slot();
        if let Some(ids) = self.axis_by_slot.get_mut(&slot) {
            ids.remove(&id);
            if ids.is_empty() {
                self.axis_by_slot.remove(&slot);
            }
        }
    }

    /// Remove every axis binding of a control, returning the slots it held
    pub fn unbind_axis(&mut self, control: C) -> Vec<AxisSlot> {
        let ids = self.axis_by_control.get(&control).cloned().unwrap_or_default();
        let mut slots = BTreeSet::new();
        for id in ids {
            if let Some(record) = self.axis_records.get(&id) {
                slots.insert(record.binding.slot());
            }
            self.remove_axis_record(id);
        }
        slots.into_iter().collect()
    }

    /// Axis bindings of a control in bind order
    pub fn axis_bindings(&self, control: C) -> Vec<AxisBinding> {
        self.axis_by_control
            .get(&control)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.axis_records.get(id))
                    .map(|record| record.binding)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Slots a control is bound to
    pub fn axis_slots(&self, control: C) -> Vec<AxisSlot> {
        let slots: BTreeSet<AxisSlot> = self
            .axis_bindings(control)
            .iter()
            .map(AxisBinding::slot)
            .collect();
        slots.into_iter().collect()
    }

    /// The most recently bound control on a slot and its binding
    pub fn axis_owner(&self, slot: AxisSlot) -> Option<(C, AxisBinding)> {
        let id = self.axis_by_slot.get(&slot)?.last()?;
        let record = self.axis_records.get(id)?;
        Some((record.control, record.binding))
    }

    /// Every control bound to a slot, oldest binding first
    pub fn axis_controls(&self, slot: AxisSlot) -> Vec<C> {
        self.axis_by_slot
            .get(&slot)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.axis_records.get(id))
                    .map(|record| record.control)
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- buttons ---

    /// Relate a control to a button binding; returns false if already related
    pub fn bind_button(&mut self, control: C, binding: ButtonBinding) -> bool {
        let added = self
            .buttons_by_control
            .entry(control)
            .or_default()
            .insert(binding);
        self.controls_by_button
            .entry(binding)
            .or_default()
            .insert(control);
        added
    }

    /// Remove every button binding of a control, returning them
    pub fn unbind_button(&mut self, control: C) -> Vec<ButtonBinding> {
        let Some(bindings) = self.buttons_by_control.remove(&control) else {
            return Vec::new();
        };
        for binding in &bindings {
            if let Some(controls) = self.controls_by_button.get_mut(binding) {
                controls.remove(&control);
                if controls.is_empty() {
                    self.controls_by_button.remove(binding);
                }
            }
        }
        bindings.into_iter().collect()
    }

    pub fn button_bindings(&self, control: C) -> Vec<ButtonBinding> {
        self.buttons_by_control
            .get(&control)
            .map(|bindings| bindings.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_wildcard(&self, control: C) -> bool {
        self.buttons_by_control
            .get(&control)
            .is_some_and(|bindings| bindings.iter().any(ButtonBinding::is_wildcard))
    }

    /// Physical buttons a control's bindings cover
    pub fn button_slots(&self, control: C) -> BTreeSet<(Hand, u32)> {
        self.buttons_by_control
            .get(&control)
            .into_iter()
            .flatten()
            .flat_map(ButtonBinding::physical_buttons)
            .collect()
    }

    /// Every control whose bindings cover a physical button, wildcards
    /// included, sorted by ordinal
    pub fn controls_covering(&self, hand: Hand, button: u32) -> Vec<C> {
        let mut controls: Vec<C> = ButtonBinding::widening(hand, button)
            .iter()
            .filter(|binding| binding.covers(hand, button))
            .filter_map(|binding| self.controls_by_button.get(binding))
            .flatten()
            .copied()
            .collect::<BTreeSet<C>>()
            .into_iter()
            .collect();
        controls.sort_by_key(|control| control.ordinal());
        controls
    }
}
