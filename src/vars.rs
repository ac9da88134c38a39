use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VarsError {
    #[error("Error: too many local variables")]
    Full { capacity: usize },
}

/// Shell-local variables, kept in insertion order.
///
/// Names are unique: setting an existing name overwrites its value in place,
/// removing a name keeps the remaining bindings dense and ordered.
#[derive(Debug, Clone)]
pub struct LocalVars {
    entries: Vec<(String, String)>,
    capacity: usize,
}

impl LocalVars {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Vec::new(),
            capacity,
        }
    }

    /// Insert or overwrite a binding.
    ///
    /// New names are rejected with [`VarsError::Full`] once the store holds
    /// `capacity` bindings; overwriting an existing name always succeeds.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), VarsError> {
        if let Some((_, v)) = self.entries.iter_mut().find(|(n, _)| n == name) {
            *v = value.to_string();
            return Ok(());
        }
        if self.entries.len() >= self.capacity {
            return Err(VarsError::Full {
                capacity: self.capacity,
            });
        }
        self.entries.push((name.to_string(), value.to_string()));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a binding. Unknown names are ignored.
    pub fn unset(&mut self, name: &str) {
        if let Some(pos) = self.entries.iter().position(|(n, _)| n == name) {
            self.entries.remove(pos);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_overwrites_in_place() {
        let mut vars = LocalVars::new(8);
        vars.set("A", "1").unwrap();
        vars.set("B", "2").unwrap();
        vars.set("A", "3").unwrap();

        let all: Vec<_> = vars.iter().collect();
        assert_eq!(all, vec![("A", "3"), ("B", "2")]);
    }

    #[test]
    fn test_unset_keeps_order() {
        let mut vars = LocalVars::new(8);
        vars.set("A", "1").unwrap();
        vars.set("B", "2").unwrap();
        vars.set("C", "3").unwrap();
        vars.unset("B");

        let all: Vec<_> = vars.iter().collect();
        assert_eq!(all, vec![("A", "1"), ("C", "3")]);
        assert_eq!(vars.get("B"), None);
    }

    #[test]
    fn test_unset_missing_is_noop() {
        let mut vars = LocalVars::new(8);
        vars.set("A", "1").unwrap();
        vars.unset("NOPE");
        assert_eq!(vars.len(), 1);
    }

    #[test]
    fn test_capacity_error() {
        let mut vars = LocalVars::new(2);
        vars.set("A", "1").unwrap();
        vars.set("B", "2").unwrap();

        assert_eq!(vars.set("C", "3"), Err(VarsError::Full { capacity: 2 }));
        // Overwriting is still allowed when full.
        assert!(vars.set("A", "9").is_ok());
        assert_eq!(vars.get("A"), Some("9"));
        assert_eq!(vars.get("C"), None);
    }
}
