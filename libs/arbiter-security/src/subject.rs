use std::collections::HashMap;
use std::fmt;

/// `Subject` is the acting entity an authorization check runs for.
///
/// Built by the hosting layer from whatever identifies the caller (a session,
/// a token, a service account) and passed through policies untouched. Policies
/// compare it against resources; the engine itself only displays it.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Subject {
    /// Stable identifier of the subject (user name, service ID).
    id: String,
    /// Subject type classification (e.g. "user", "service").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    /// Roles granted to the subject by the hosting layer.
    #[serde(default)]
    roles: Vec<String>,
    /// Additional subject properties available to policy handlers.
    #[serde(default)]
    attributes: HashMap<String, serde_json::Value>,
}

impl Subject {
    /// Create a subject with only an identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self::builder(id).build()
    }

    /// Create a new `Subject` builder
    #[must_use]
    pub fn builder(id: impl Into<String>) -> SubjectBuilder {
        SubjectBuilder {
            id: id.into(),
            kind: None,
            roles: Vec::new(),
            attributes: HashMap::new(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the subject type classification (e.g. "user", "service").
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    #[must_use]
    pub fn roles(&self) -> &[String] {
        &self.roles
    }

    /// Returns `true` if the subject carries `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }

    /// Look up a single attribute.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, serde_json::Value> {
        &self.attributes
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

pub struct SubjectBuilder {
    id: String,
    kind: Option<String>,
    roles: Vec<String>,
    attributes: HashMap<String, serde_json::Value>,
}

impl SubjectBuilder {
    #[must_use]
    pub fn kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_owned());
        self
    }

    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.roles.push(role.into());
        self
    }

    #[must_use]
    pub fn roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    #[must_use]
    pub fn attribute(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> Subject {
        Subject {
            id: self.id,
            kind: self.kind,
            roles: self.roles,
            attributes: self.attributes,
        }
    }
}
