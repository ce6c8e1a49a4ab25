use serde::{Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared definition behind an [`Item`] handle.
#[derive(Debug, Serialize)]
struct ItemDef {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    group: Option<String>,
}

/// A distinct resource type.
///
/// Items are identity-bearing: cloning an `Item` yields another handle to the
/// same definition, and equality compares handles, not contents. Two items
/// created independently with the same id are different items.
#[derive(Clone)]
pub struct Item(Arc<ItemDef>);

impl Item {
    pub fn new(id: &str, name: &str, group: Option<&str>) -> Self {
        Self(Arc::new(ItemDef {
            id: id.to_string(),
            name: name.to_string(),
            group: group.map(str::to_string),
        }))
    }

    /// Shorthand for an item whose display name is its id.
    pub fn named(id: &str) -> Self {
        Self::new(id, id, None)
    }

    pub fn id(&self) -> &str {
        &self.0.id
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Optional display group (e.g. "intermediates").
    pub fn group(&self) -> Option<&str> {
        self.0.group.as_deref()
    }
}

impl PartialEq for Item {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Item {}

impl Hash for Item {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

impl fmt::Debug for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Item({})", self.0.id)
    }
}

impl fmt::Display for Item {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.name)
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}
