use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type NodeId = String;
pub type TemplateId = String;

/// Key/value configuration visible to every node of a run.
pub type EnvironmentMap = BTreeMap<String, String>;

/// Per-node settings, scoped to the node that declares them.
pub type Settings = BTreeMap<String, String>;

pub type NodeMap = BTreeMap<NodeId, NodeDefinition>;

fn default_flow_type() -> String {
    FlowNodeKind::FLOW.to_string()
}

/// Complete workflow topology: a list of independent chain heads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowDefinition {
    #[serde(rename = "type", default = "default_flow_type")]
    pub kind: String,

    #[serde(rename = "nodes", alias = "chains", default)]
    pub chains: Vec<FlowNodeRef>,
}

impl WorkflowDefinition {
    pub fn new() -> Self {
        Self {
            kind: default_flow_type(),
            chains: Vec::new(),
        }
    }

    pub fn with_chain(mut self, head: FlowNodeRef) -> Self {
        self.chains.push(head);
        self
    }

    pub fn add_chain(&mut self, head: FlowNodeRef) {
        self.chains.push(head);
    }
}

impl Default for WorkflowDefinition {
    fn default() -> Self {
        Self::new()
    }
}

/// One link of a chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowNodeRef {
    pub id: NodeId,

    /// Kept as the raw string so unknown kinds survive until the chain reaches them.
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<Box<FlowNodeRef>>,
}

impl FlowNodeRef {
    pub fn node(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            kind: FlowNodeKind::NODE.to_string(),
            next: None,
        }
    }

    pub fn flow(id: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            kind: FlowNodeKind::FLOW.to_string(),
            next: None,
        }
    }

    pub fn with_next(mut self, next: FlowNodeRef) -> Self {
        self.next = Some(Box::new(next));
        self
    }

    /// Build a linear chain of `node` references, in order.
    pub fn chain<I, S>(ids: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        I::IntoIter: DoubleEndedIterator,
        S: Into<NodeId>,
    {
        ids.into_iter().rev().fold(None::<FlowNodeRef>, |next, id| {
            let link = FlowNodeRef::node(id);
            Some(match next {
                Some(next) => link.with_next(next),
                None => link,
            })
        })
    }

    pub fn parsed_kind(&self) -> Option<FlowNodeKind> {
        FlowNodeKind::parse(&self.kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowNodeKind {
    /// Executable leaf.
    Node,
    /// Reserved placeholder for nested flows. Inert.
    Flow,
}

impl FlowNodeKind {
    pub const NODE: &'static str = "node";
    pub const FLOW: &'static str = "flow";

    pub fn parse(kind: &str) -> Option<Self> {
        match kind {
            Self::NODE => Some(Self::Node),
            Self::FLOW => Some(Self::Flow),
            _ => None,
        }
    }
}

/// Stored definition of a node.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct NodeDefinition {
    #[serde(default)]
    pub id: NodeId,

    #[serde(default)]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// When set, the template's code replaces `code` at run time.
    #[serde(default, alias = "templateId", skip_serializing_if = "Option::is_none")]
    pub template_id: Option<TemplateId>,

    #[serde(default)]
    pub settings: Settings,
}

impl NodeDefinition {
    pub fn new(id: impl Into<NodeId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_template(mut self, template_id: impl Into<TemplateId>) -> Self {
        self.template_id = Some(template_id.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// Reusable code body with a declared settings schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Template {
    #[serde(default)]
    pub id: TemplateId,

    #[serde(default)]
    pub name: String,

    #[serde(default, alias = "settingSchema")]
    pub setting_schema: BTreeMap<String, SettingField>,

    #[serde(default)]
    pub code: String,
}

impl Template {
    pub fn new(
        id: impl Into<TemplateId>,
        name: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            setting_schema: BTreeMap::new(),
            code: code.into(),
        }
    }

    pub fn with_setting(
        mut self,
        key: impl Into<String>,
        label: impl Into<String>,
        kind: SettingType,
    ) -> Self {
        self.setting_schema.insert(
            key.into(),
            SettingField {
                label: label.into(),
                kind,
            },
        );
        self
    }

    pub fn is_complete(&self) -> bool {
        !self.id.is_empty() && !self.name.is_empty() && !self.code.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SettingField {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: SettingType,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettingType {
    Text,
    Number,
}

/// The persisted workflow document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredWorkflow {
    #[serde(default)]
    pub flow: WorkflowDefinition,

    #[serde(default)]
    pub node_map: NodeMap,

    #[serde(default)]
    pub env: EnvironmentMap,
}
