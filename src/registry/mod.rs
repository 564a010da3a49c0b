//! Task registry: the static mapping from task identifier to execution
//! descriptor.
//!
//! The registry is loaded once at process start and is read-only afterwards.
//! It is the single source of truth for which container image backs each
//! pipeline step, whether the step needs the worker credential injected, and
//! which extra per-run parameters it consumes.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Extra per-run parameters a task can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskParam {
    /// Target language code derived from the request text, injected as
    /// `TARGET_LANG`.
    TargetLanguage,
}

/// Execution descriptor for a single pipeline task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDescriptor {
    /// Task identifier as produced by the planner.
    pub id: String,
    /// Container image that implements the task.
    pub image: String,
    /// Whether the worker credential must be injected into the container.
    pub needs_secret: bool,
    /// Extra per-run parameters this task consumes.
    #[serde(default)]
    pub params: Vec<TaskParam>,
    /// Whether the task reads the binary input slot instead of the text slot.
    #[serde(default)]
    pub binary_input: bool,
    /// Human-readable description, fed to the planner prompt.
    pub description: String,
}

impl TaskDescriptor {
    /// Returns true if this task declares the given parameter.
    pub fn requires_param(&self, param: TaskParam) -> bool {
        self.params.contains(&param)
    }
}

/// Read-only mapping from task identifier to descriptor.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    entries: HashMap<String, TaskDescriptor>,
}

impl TaskRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the built-in registry of known worker services.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let builtin = [
            TaskDescriptor {
                id: "summarizer-service".to_string(),
                image: "summarizer-app".to_string(),
                needs_secret: true,
                params: Vec::new(),
                binary_input: false,
                description: "Creates a short summary of text.".to_string(),
            },
            TaskDescriptor {
                id: "translator-service".to_string(),
                image: "translator-app".to_string(),
                needs_secret: true,
                params: vec![TaskParam::TargetLanguage],
                binary_input: false,
                description:
                    "Translates text to a specified language. Needs the target language \
                     (e.g., 'German', 'Spanish', 'French')."
                        .to_string(),
            },
            TaskDescriptor {
                id: "anonymizer-service".to_string(),
                image: "anonymizer-app".to_string(),
                needs_secret: true,
                params: Vec::new(),
                binary_input: false,
                description: "Replaces personally identifiable information with placeholders."
                    .to_string(),
            },
            TaskDescriptor {
                id: "med-term-translator-service".to_string(),
                image: "med-term-translator-app".to_string(),
                needs_secret: true,
                params: Vec::new(),
                binary_input: false,
                description: "Rewrites complex medical terminology for a layperson.".to_string(),
            },
            TaskDescriptor {
                id: "pdf-reader-service".to_string(),
                image: "pdf-reader-app".to_string(),
                needs_secret: false,
                params: Vec::new(),
                binary_input: true,
                description: "Extracts plain text from a PDF document.".to_string(),
            },
        ];

        for descriptor in builtin {
            // Ids are distinct by construction.
            registry.entries.insert(descriptor.id.clone(), descriptor);
        }

        registry
    }

    /// Loads a registry from a JSON file containing a list of descriptors.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateTask` if two descriptors share an id.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let contents = fs::read_to_string(path)?;
        let descriptors: Vec<TaskDescriptor> = serde_json::from_str(&contents)?;

        let mut registry = Self::new();
        for descriptor in descriptors {
            registry.register(descriptor)?;
        }

        Ok(registry)
    }

    /// Registers a descriptor.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateTask` if a descriptor with the same id exists.
    pub fn register(&mut self, descriptor: TaskDescriptor) -> Result<(), RegistryError> {
        if self.entries.contains_key(&descriptor.id) {
            return Err(RegistryError::DuplicateTask(descriptor.id));
        }

        self.entries.insert(descriptor.id.clone(), descriptor);
        Ok(())
    }

    /// Gets a descriptor by task id.
    pub fn get(&self, id: &str) -> Option<&TaskDescriptor> {
        self.entries.get(id)
    }

    /// Returns true if the registry knows the given task id.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    /// Returns all descriptors, sorted by id for stable output.
    pub fn descriptors(&self) -> Vec<&TaskDescriptor> {
        let mut all: Vec<&TaskDescriptor> = self.entries.values().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of registered tasks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the registry has no tasks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = TaskRegistry::builtin();
        assert_eq!(registry.len(), 5);
        assert!(registry.contains("summarizer-service"));
        assert!(registry.contains("translator-service"));
        assert!(!registry.contains("unknown-service"));
    }

    #[test]
    fn test_translator_requires_target_language() {
        let registry = TaskRegistry::builtin();
        let translator = registry.get("translator-service").unwrap();
        assert!(translator.requires_param(TaskParam::TargetLanguage));

        let summarizer = registry.get("summarizer-service").unwrap();
        assert!(!summarizer.requires_param(TaskParam::TargetLanguage));
    }

    #[test]
    fn test_pdf_reader_consumes_binary_input() {
        let registry = TaskRegistry::builtin();
        let reader = registry.get("pdf-reader-service").unwrap();
        assert!(reader.binary_input);
        assert!(!reader.needs_secret);
    }

    #[test]
    fn test_register_rejects_duplicate() {
        let mut registry = TaskRegistry::new();
        let descriptor = TaskDescriptor {
            id: "echo-service".to_string(),
            image: "echo-app".to_string(),
            needs_secret: false,
            params: Vec::new(),
            binary_input: false,
            description: "Echoes its input.".to_string(),
        };

        registry.register(descriptor.clone()).unwrap();
        let err = registry.register(descriptor).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateTask(id) if id == "echo-service"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tasks.json");
        std::fs::write(
            &path,
            r#"[{"id": "echo-service", "image": "echo-app", "needs_secret": false,
                "description": "Echoes its input."}]"#,
        )
        .unwrap();

        let registry = TaskRegistry::from_file(&path).unwrap();
        assert_eq!(registry.len(), 1);
        let echo = registry.get("echo-service").unwrap();
        assert!(!echo.binary_input);
        assert!(echo.params.is_empty());
    }

    #[test]
    fn test_descriptors_sorted() {
        let registry = TaskRegistry::builtin();
        let ids: Vec<&str> = registry.descriptors().iter().map(|d| d.id.as_str()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
