//! Notification payload model.
//!
//! A [`Card`] is what a webhook target receives. Its serialized field names
//! are a compatibility contract with third-party receivers and must never be
//! renamed.
//!
//! ## Wire format
//!
//! ```json
//! {
//!   "@type": "MessageCard",
//!   "@context": "http://schema.org/extensions",
//!   "title": "nightly - #42 Build Failed",
//!   "summary": "nightly - #42 Build Failed",
//!   "themeColor": "E81123",
//!   "sections": [{ "title": "...", "facts": [{ "name": "Status", "value": "Build Failed" }] }],
//!   "potentialAction": [{ "@type": "OpenUri", "name": "View Build",
//!                         "targets": [{ "os": "default", "uri": "https://..." }] }]
//! }
//! ```

use serde::{Deserialize, Serialize};

const CARD_TYPE: &str = "MessageCard";
const CARD_CONTEXT: &str = "http://schema.org/extensions";
const OPEN_URI_TYPE: &str = "OpenUri";

// ---------------------------------------------------------------------------
// Facts and sections
// ---------------------------------------------------------------------------

/// A single named value displayed within a card.
///
/// Names are not required to be unique; display order is insertion order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fact {
    name: String,
    value: String,
}

impl Fact {
    /// Creates a new fact.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Display name of the fact.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Plain-text value of the fact.
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// A titled group of facts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    title: String,
    facts: Vec<Fact>,
}

impl Section {
    /// Creates a section with the given title and facts.
    pub fn new(title: impl Into<String>, facts: Vec<Fact>) -> Self {
        Self {
            title: title.into(),
            facts,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn facts(&self) -> &[Fact] {
        &self.facts
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// A link rendered as a button by the receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionLink {
    #[serde(rename = "@type")]
    kind: String,
    name: String,
    targets: Vec<ActionTarget>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ActionTarget {
    os: String,
    uri: String,
}

impl ActionLink {
    /// Creates a link that opens `uri` on every platform.
    pub fn open_uri(name: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            kind: OPEN_URI_TYPE.to_string(),
            name: name.into(),
            targets: vec![ActionTarget {
                os: "default".to_string(),
                uri: uri.into(),
            }],
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The link's destination.
    pub fn uri(&self) -> Option<&str> {
        self.targets.first().map(|t| t.uri.as_str())
    }
}

// ---------------------------------------------------------------------------
// Card
// ---------------------------------------------------------------------------

/// The structured payload sent to a webhook target.
///
/// Constructed fresh per notification by [`crate::CardBuilder`] and never
/// mutated after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Card {
    #[serde(rename = "@type")]
    card_type: String,
    #[serde(rename = "@context")]
    context: String,
    title: String,
    summary: String,
    #[serde(rename = "themeColor", skip_serializing_if = "Option::is_none", default)]
    theme_color: Option<String>,
    sections: Vec<Section>,
    #[serde(
        rename = "potentialAction",
        skip_serializing_if = "Vec::is_empty",
        default
    )]
    actions: Vec<ActionLink>,
}

impl Card {
    /// Creates a card.
    pub fn new(
        title: impl Into<String>,
        summary: impl Into<String>,
        theme_color: Option<String>,
        sections: Vec<Section>,
        actions: Vec<ActionLink>,
    ) -> Self {
        Self {
            card_type: CARD_TYPE.to_string(),
            context: CARD_CONTEXT.to_string(),
            title: title.into(),
            summary: summary.into(),
            theme_color,
            sections,
            actions,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn theme_color(&self) -> Option<&str> {
        self.theme_color.as_deref()
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn actions(&self) -> &[ActionLink] {
        &self.actions
    }

    /// All facts across all sections, in display order.
    pub fn facts(&self) -> impl Iterator<Item = &Fact> {
        self.sections.iter().flat_map(|s| s.facts.iter())
    }

    /// Returns the value of the first fact named `name`.
    pub fn fact(&self, name: &str) -> Option<&str> {
        self.facts().find(|f| f.name == name).map(Fact::value)
    }

    /// Serializes the card to its JSON wire representation.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}
