//! Binding between the node's prompt boxes and its hidden bundle slots.
//!
//! The host owns the widgets; it reports edits through
//! [`PromptBinding::on_text_changed`] and the binding writes the matching
//! bundle back through [`EditorSurface`].

use crate::models::preset::PresetRecord;
use crate::models::prompt::Direction;
use crate::parser;
use tracing::debug;

/// Initial value of a bundle slot before any text was parsed.
pub const EMPTY_BUNDLE: &str = "[]";

/// The widget capabilities the binding needs from the host editor.
pub trait EditorSurface {
    /// Current content of the multiline box for `direction`.
    fn text(&self, direction: Direction) -> String;

    /// Replaces the content of the multiline box for `direction`.
    fn set_text(&mut self, direction: Direction, text: String);

    /// Writes the persisted hidden slot for `direction`.
    fn set_bundle(&mut self, direction: Direction, bundle: String);
}

/// In-memory widgets of one prompt builder node.
///
/// The two text boxes are not persisted with the graph; the two bundle slots
/// are, and the host restores them verbatim on reload.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWidgets {
    pub positive_prompts: String,
    pub negative_prompts: String,
    pub positive_bundle: String,
    pub negative_bundle: String,
}

impl Default for NodeWidgets {
    fn default() -> Self {
        Self {
            positive_prompts: String::new(),
            negative_prompts: String::new(),
            positive_bundle: EMPTY_BUNDLE.to_string(),
            negative_bundle: EMPTY_BUNDLE.to_string(),
        }
    }
}

impl NodeWidgets {
    pub fn bundle(&self, direction: Direction) -> &str {
        match direction {
            Direction::Positive => &self.positive_bundle,
            Direction::Negative => &self.negative_bundle,
        }
    }
}

impl EditorSurface for NodeWidgets {
    fn text(&self, direction: Direction) -> String {
        match direction {
            Direction::Positive => self.positive_prompts.clone(),
            Direction::Negative => self.negative_prompts.clone(),
        }
    }

    fn set_text(&mut self, direction: Direction, text: String) {
        match direction {
            Direction::Positive => self.positive_prompts = text,
            Direction::Negative => self.negative_prompts = text,
        }
    }

    fn set_bundle(&mut self, direction: Direction, bundle: String) {
        match direction {
            Direction::Positive => self.positive_bundle = bundle,
            Direction::Negative => self.negative_bundle = bundle,
        }
    }
}

/// Keeps a node's bundles in step with its prompt text.
#[derive(Debug, Default)]
pub struct PromptBinding<E> {
    surface: E,
}

impl<E: EditorSurface> PromptBinding<E> {
    pub fn new(surface: E) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &E {
        &self.surface
    }

    pub fn into_surface(self) -> E {
        self.surface
    }

    /// Records new text for `direction` and returns the bundle written for it.
    pub fn on_text_changed(&mut self, direction: Direction, text: &str) -> String {
        self.surface.set_text(direction, text.to_string());
        self.update_bundle(direction)
    }

    /// Recomputes both bundles from the current text.
    pub fn refresh(&mut self) {
        for direction in Direction::ALL {
            self.update_bundle(direction);
        }
    }

    fn update_bundle(&mut self, direction: Direction) -> String {
        let entries = parser::parse(&self.surface.text(direction));
        let bundle = parser::to_bundle(&entries);
        debug!(%direction, entries = entries.len(), "Updated prompt bundle");
        self.surface.set_bundle(direction, bundle.clone());
        bundle
    }

    /// Opens a fresh line at the end of the box, leaving a blank separator
    /// line after existing text.
    pub fn add_line(&mut self, direction: Direction) {
        let mut text = self.surface.text(direction);
        if !text.is_empty() && !text.ends_with('\n') {
            text.push_str("\n\n");
        } else {
            text.push('\n');
        }
        self.surface.set_text(direction, text);
        self.update_bundle(direction);
    }

    /// Replaces both boxes with a preset's text.
    pub fn apply_preset(&mut self, record: &PresetRecord) {
        self.surface.set_text(Direction::Positive, record.positive().to_string());
        self.surface.set_text(Direction::Negative, record.negative().to_string());
        self.refresh();
    }

    /// Current `(positive, negative)` text, as saved into a preset.
    pub fn snapshot(&self) -> (String, String) {
        (
            self.surface.text(Direction::Positive),
            self.surface.text(Direction::Negative),
        )
    }
}

/// Bundle for single-box nodes, where one text holds every prompt line.
pub fn combined_bundle(text: &str) -> String {
    parser::bundle_text(text)
}
