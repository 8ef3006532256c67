// ── Question domain types ──

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// An interactive question raised by the installer.
///
/// `id` is assigned by the remote side and is unique within the pending
/// set. `class` is the discriminator the rendering layer dispatches on
/// (for example `storage.luks_activation`); everything that class needs
/// beyond the common fields arrives in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: u32,
    pub class: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub default_option: Option<String>,
    #[serde(default, flatten)]
    pub extra: Map<String, Value>,
}

impl Question {
    /// Whether `answer` is one of the options the remote side offered.
    pub fn accepts(&self, answer: &str) -> bool {
        self.options.iter().any(|option| option == answer)
    }
}
