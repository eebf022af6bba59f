//! Logical-action bindings over raw input sources.

use std::collections::HashMap;

/// Source of an action binding.
///
/// The string forms are `key_down:<key>`, `pointer_down:<button>` and
/// `char:<ch>`; keys are normalized lower-case.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum BindingSource {
    KeyDown(String),
    PointerDown(i32),
    Char(char),
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

/// Registered bindings from input sources to logical action names.
///
/// Multiple actions may share one source; when those actions are
/// distinct, the assembler counts a mapping conflict.
#[derive(Default)]
pub struct ActionBindings {
    by_source: HashMap<BindingSource, Vec<String>>,
}

impl ActionBindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_key_down(&mut self, key: &str, action: &str) -> Result<(), BindingError> {
        let key = normalize_required(key, "key")?;
        let action = normalize_required(action, "action")?;
        self.insert(BindingSource::KeyDown(key), action);
        Ok(())
    }

    pub fn bind_pointer_down(&mut self, button: i32, action: &str) -> Result<(), BindingError> {
        if button < 0 {
            return Err(BindingError::InvalidArgument(format!(
                "button must be >= 0, got {button}"
            )));
        }
        let action = normalize_required(action, "action")?;
        self.insert(BindingSource::PointerDown(button), action);
        Ok(())
    }

    pub fn bind_char(&mut self, ch: char, action: &str) -> Result<(), BindingError> {
        let action = normalize_required(action, "action")?;
        self.insert(BindingSource::Char(ch), action);
        Ok(())
    }

    /// Actions bound to a source, in binding order.
    pub fn actions_for(&self, source: &BindingSource) -> &[String] {
        self.by_source
            .get(source)
            .map_or(&[], |actions| actions.as_slice())
    }

    /// Number of sources mapping to more than one distinct action.
    pub fn conflict_count(&self) -> u64 {
        self.by_source
            .values()
            .filter(|actions| {
                actions
                    .iter()
                    .any(|action| action != &actions[0])
            })
            .count() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.by_source.is_empty()
    }

    fn insert(&mut self, source: BindingSource, action: String) {
        self.by_source.entry(source).or_default().push(action);
    }
}

fn normalize_required(value: &str, what: &str) -> Result<String, BindingError> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(BindingError::InvalidArgument(format!(
            "{what} must not be empty"
        )));
    }
    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_names_are_rejected() {
        let mut bindings = ActionBindings::new();
        assert!(bindings.bind_key_down("", "fire").is_err());
        assert!(bindings.bind_key_down("space", "  ").is_err());
        assert!(bindings.bind_pointer_down(-1, "fire").is_err());
    }

    #[test]
    fn keys_are_normalized() {
        let mut bindings = ActionBindings::new();
        bindings.bind_key_down(" Space ", "Fire").unwrap();
        assert_eq!(
            bindings.actions_for(&BindingSource::KeyDown("space".to_owned())),
            ["fire"]
        );
    }

    #[test]
    fn conflicts_require_distinct_actions() {
        let mut bindings = ActionBindings::new();
        bindings.bind_key_down("space", "fire").unwrap();
        bindings.bind_key_down("space", "fire").unwrap();
        assert_eq!(bindings.conflict_count(), 0);
        bindings.bind_key_down("space", "jump").unwrap();
        assert_eq!(bindings.conflict_count(), 1);
        bindings.bind_pointer_down(1, "select").unwrap();
        bindings.bind_pointer_down(1, "shoot").unwrap();
        assert_eq!(bindings.conflict_count(), 2);
    }
}
