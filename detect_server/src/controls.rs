//! Interaction controls derived from confirmed classes.
use log::{info, warn};

/// Callback invoked when a control is activated.
pub type ActionFn = Box<dyn Fn(&str) + Send + Sync>;

/// One interactive control, keyed by the class it stands for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub class_name: String,
}

impl Control {
    fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_owned(),
        }
    }
}

/// Changes needed to bring a control set in line with confirmed classes.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ControlDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl ControlDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }
}

/// Compare confirmed class names against existing controls.
///
/// Additions come out in `confirmed` order, removals in `existing` order.
/// The function only describes the changes; applying them is up to the
/// caller.
pub fn diff_controls(confirmed: &[String], existing: &[String]) -> ControlDiff {
    let to_add = confirmed
        .iter()
        .filter(|name| !existing.contains(name))
        .cloned()
        .collect();
    let to_remove = existing
        .iter()
        .filter(|name| !confirmed.contains(name))
        .cloned()
        .collect();
    ControlDiff { to_add, to_remove }
}

/// The live control set plus an optional action bridge.
#[derive(Default)]
pub struct ControlPanel {
    controls: Vec<Control>,
    action: Option<ActionFn>,
}

impl ControlPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_action(action: ActionFn) -> Self {
        Self {
            controls: Vec::new(),
            action: Some(action),
        }
    }

    /// Apply a reconciliation diff, keeping earlier controls in place.
    pub fn apply(&mut self, diff: &ControlDiff) {
        for name in &diff.to_add {
            if !self.contains(name) {
                self.controls.push(Control::new(name));
            }
        }
        if !diff.to_remove.is_empty() {
            self.controls
                .retain(|ctrl| !diff.to_remove.contains(&ctrl.class_name));
        }
    }

    /// Trigger the control for `name`.
    ///
    /// Returns `false` when no such control exists. A missing action bridge
    /// is logged and swallowed, so activation never fails the caller.
    pub fn activate(&self, name: &str) -> bool {
        if !self.contains(name) {
            return false;
        }
        match &self.action {
            Some(action) => {
                info!("Activating control '{}'", name);
                action(name);
            }
            None => warn!("No action bridge bound, skipping activation of '{}'", name),
        }
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.controls.iter().any(|ctrl| ctrl.class_name == name)
    }

    pub fn names(&self) -> Vec<String> {
        self.controls
            .iter()
            .map(|ctrl| ctrl.class_name.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}
