//! Pipeline state and the partial-state patches nodes return.
//!
//! State is a closed record per pipeline. A node never mutates state directly;
//! it returns a patch whose `Some` fields replace the corresponding keys and whose
//! `None` fields leave them untouched. Merging is shallow: a patched list replaces
//! the whole list.

use crate::endpoint::{Catalog, NormalizedEndpoint, Page, RawEndpoint};
use crate::error::{Error, Result};
use crate::report::RunError;
use crate::tool::{ToolRecord, WorkItem};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    File,
    Url,
}

impl InputType {
    pub fn as_str(self) -> &'static str {
        match self {
            InputType::File => "file",
            InputType::Url => "url",
        }
    }
}

/// Raw input for a discovery run: API description files or a documentation site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryInput {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_url: Option<String>,
    /// Base URL the discovered endpoints are served from; overrides any server
    /// found in the sources.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl DiscoveryInput {
    pub fn from_files<P: Into<PathBuf>>(files: impl IntoIterator<Item = P>) -> Self {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn from_url(root_url: impl Into<String>) -> Self {
        Self {
            root_url: Some(root_url.into()),
            ..Default::default()
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }

    /// The configured server override, if non-blank.
    pub fn server_override(&self) -> Option<&str> {
        self.server_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub endpoints_raw: Vec<RawEndpoint>,
    #[serde(default)]
    pub endpoints_normalized: Vec<NormalizedEndpoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,
    /// Endpoint ids chosen at the selection interrupt.
    #[serde(default)]
    pub selected_ids: Vec<String>,
    #[serde(default)]
    pub errors: Vec<RunError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryState {
    pub input: DiscoveryInput,
    #[serde(default)]
    pub discovery: DiscoveryData,
}

impl DiscoveryState {
    pub fn new(input: DiscoveryInput) -> Self {
        Self {
            input,
            discovery: DiscoveryData::default(),
        }
    }

    /// The error list with `new` appended, ready to be put in a patch.
    pub fn errors_with(&self, new: impl IntoIterator<Item = RunError>) -> Vec<RunError> {
        let mut errors = self.discovery.errors.clone();
        errors.extend(new);
        errors
    }

    /// The selection to hand to generation, once a catalog exists.
    pub fn selection(&self) -> Option<Selection> {
        let catalog = self.discovery.catalog.clone()?;
        let selection = Selection::new(catalog, self.discovery.selected_ids.clone());
        Some(match self.input.server_override() {
            Some(server) => selection.with_server_url(server),
            None => selection,
        })
    }
}

/// The endpoints handed from discovery to generation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub endpoint_ids: Vec<String>,
    pub catalog: Catalog,
    /// Overrides the server recorded on each endpoint when composing tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_url: Option<String>,
}

impl Selection {
    pub fn new(catalog: Catalog, endpoint_ids: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            endpoint_ids: endpoint_ids.into_iter().map(Into::into).collect(),
            catalog,
            server_url: None,
        }
    }

    pub fn with_server_url(mut self, server_url: impl Into<String>) -> Self {
        self.server_url = Some(server_url.into());
        self
    }
}

/// Reviewer decision supplied when resuming generation after aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub approved: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_tools: Option<Vec<ToolRecord>>,
}

impl Review {
    pub fn approve() -> Self {
        Self {
            approved: true,
            edited_tools: None,
        }
    }

    pub fn reject() -> Self {
        Self {
            approved: false,
            edited_tools: None,
        }
    }

    pub fn with_edits(tools: Vec<ToolRecord>) -> Self {
        Self {
            approved: true,
            edited_tools: Some(tools),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Completed,
    Rejected,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationData {
    #[serde(default)]
    pub work_items: Vec<WorkItem>,
    #[serde(default)]
    pub tools: Vec<ToolRecord>,
    #[serde(default)]
    pub errors: Vec<RunError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GenerationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_count: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationState {
    pub selection: Selection,
    #[serde(default)]
    pub generation: GenerationData,
}

impl GenerationState {
    pub fn new(selection: Selection) -> Self {
        Self {
            selection,
            generation: GenerationData::default(),
        }
    }

    /// The error list with `new` appended, ready to be put in a patch.
    pub fn errors_with(&self, new: impl IntoIterator<Item = RunError>) -> Vec<RunError> {
        let mut errors = self.generation.errors.clone();
        errors.extend(new);
        errors
    }
}

/// State of a single run of either pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum PipelineState {
    Discovery(DiscoveryState),
    Generation(GenerationState),
}

impl PipelineState {
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineState::Discovery(_) => "discovery",
            PipelineState::Generation(_) => "generation",
        }
    }

    pub fn as_discovery(&self) -> Result<&DiscoveryState> {
        match self {
            PipelineState::Discovery(s) => Ok(s),
            other => Err(Error::StateMismatch(format!(
                "expected discovery state, found {}",
                other.kind()
            ))),
        }
    }

    pub fn as_generation(&self) -> Result<&GenerationState> {
        match self {
            PipelineState::Generation(s) => Ok(s),
            other => Err(Error::StateMismatch(format!(
                "expected generation state, found {}",
                other.kind()
            ))),
        }
    }

    /// Merge a patch key-wise. Patches for the other pipeline are rejected.
    pub fn merge(&mut self, patch: StatePatch) -> Result<()> {
        match (self, patch) {
            (PipelineState::Discovery(state), StatePatch::Discovery(patch)) => {
                patch.apply_to(state);
                Ok(())
            }
            (PipelineState::Generation(state), StatePatch::Generation(patch)) => {
                patch.apply_to(state);
                Ok(())
            }
            (state, patch) => Err(Error::StateMismatch(format!(
                "cannot apply {} patch to {} state",
                patch.kind(),
                state.kind()
            ))),
        }
    }
}

impl From<DiscoveryState> for PipelineState {
    fn from(state: DiscoveryState) -> Self {
        PipelineState::Discovery(state)
    }
}

impl From<GenerationState> for PipelineState {
    fn from(state: GenerationState) -> Self {
        PipelineState::Generation(state)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<DiscoveryInput>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<InputType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<Vec<Page>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints_raw: Option<Vec<RawEndpoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoints_normalized: Option<Vec<NormalizedEndpoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Catalog>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<RunError>>,
}

impl DiscoveryPatch {
    fn apply_to(self, state: &mut DiscoveryState) {
        if let Some(input) = self.input {
            state.input = input;
        }
        let data = &mut state.discovery;
        if let Some(v) = self.input_type {
            data.input_type = Some(v);
        }
        if let Some(v) = self.pages {
            data.pages = v;
        }
        if let Some(v) = self.endpoints_raw {
            data.endpoints_raw = v;
        }
        if let Some(v) = self.endpoints_normalized {
            data.endpoints_normalized = v;
        }
        if let Some(v) = self.catalog {
            data.catalog = Some(v);
        }
        if let Some(v) = self.selected_ids {
            data.selected_ids = v;
        }
        if let Some(v) = self.errors {
            data.errors = v;
        }
    }

    /// Names of the keys this patch overwrites.
    pub fn keys(&self) -> Vec<&'static str> {
        let fields = [
            ("input", self.input.is_some()),
            ("input_type", self.input_type.is_some()),
            ("pages", self.pages.is_some()),
            ("endpoints_raw", self.endpoints_raw.is_some()),
            ("endpoints_normalized", self.endpoints_normalized.is_some()),
            ("catalog", self.catalog.is_some()),
            ("selected_ids", self.selected_ids.is_some()),
            ("errors", self.errors.is_some()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<Selection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_items: Option<Vec<WorkItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<RunError>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub review: Option<Review>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<GenerationStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_count: Option<usize>,
}

impl GenerationPatch {
    fn apply_to(self, state: &mut GenerationState) {
        if let Some(selection) = self.selection {
            state.selection = selection;
        }
        let data = &mut state.generation;
        if let Some(v) = self.work_items {
            data.work_items = v;
        }
        if let Some(v) = self.tools {
            data.tools = v;
        }
        if let Some(v) = self.errors {
            data.errors = v;
        }
        if let Some(v) = self.review {
            data.review = Some(v);
        }
        if let Some(v) = self.status {
            data.status = Some(v);
        }
        if let Some(v) = self.final_count {
            data.final_count = Some(v);
        }
    }

    /// Names of the keys this patch overwrites.
    pub fn keys(&self) -> Vec<&'static str> {
        let fields = [
            ("selection", self.selection.is_some()),
            ("work_items", self.work_items.is_some()),
            ("tools", self.tools.is_some()),
            ("errors", self.errors.is_some()),
            ("review", self.review.is_some()),
            ("status", self.status.is_some()),
            ("final_count", self.final_count.is_some()),
        ];
        fields
            .into_iter()
            .filter_map(|(name, present)| present.then_some(name))
            .collect()
    }
}

/// A node's output: the keys it declares, for one pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "pipeline", rename_all = "snake_case")]
pub enum StatePatch {
    Discovery(DiscoveryPatch),
    Generation(GenerationPatch),
}

impl StatePatch {
    pub fn kind(&self) -> &'static str {
        match self {
            StatePatch::Discovery(_) => "discovery",
            StatePatch::Generation(_) => "generation",
        }
    }

    pub fn keys(&self) -> Vec<&'static str> {
        match self {
            StatePatch::Discovery(p) => p.keys(),
            StatePatch::Generation(p) => p.keys(),
        }
    }

    /// A patch that declares no keys.
    pub fn empty_for(state: &PipelineState) -> Self {
        match state {
            PipelineState::Discovery(_) => StatePatch::Discovery(DiscoveryPatch::default()),
            PipelineState::Generation(_) => StatePatch::Generation(GenerationPatch::default()),
        }
    }
}

impl From<DiscoveryPatch> for StatePatch {
    fn from(patch: DiscoveryPatch) -> Self {
        StatePatch::Discovery(patch)
    }
}

impl From<GenerationPatch> for StatePatch {
    fn from(patch: GenerationPatch) -> Self {
        StatePatch::Generation(patch)
    }
}
