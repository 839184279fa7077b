use std::collections::HashMap;

use crate::config::ClientConfig;
use crate::error::ValidationError;

/// A server-defined operation blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobTemplate {
    pub name: String,
    pub id: String,
    pub resource_uri: String,
}

/// Immutable name/id -> template table, built once from configuration and
/// handed to whoever needs to resolve templates.
#[derive(Debug, Clone, Default)]
pub struct JobTemplateCatalog {
    templates: Vec<JobTemplate>,
    by_name: HashMap<String, usize>,
    by_id: HashMap<String, usize>,
}

impl JobTemplateCatalog {
    pub fn new(templates: impl IntoIterator<Item = JobTemplate>) -> Self {
        let templates: Vec<JobTemplate> = templates.into_iter().collect();
        let by_name = templates
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.name.to_lowercase(), idx))
            .collect();
        let by_id = templates
            .iter()
            .enumerate()
            .map(|(idx, t)| (t.id.clone(), idx))
            .collect();
        Self { templates, by_name, by_id }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let endpoint = config.job_templates_endpoint.trim_end_matches('/');
        Self::new(config.job_templates.iter().map(|(name, id)| JobTemplate {
            name: name.clone(),
            id: id.clone(),
            resource_uri: format!("{endpoint}/{id}"),
        }))
    }

    /// Looks a template up by name (case-insensitive) or by id.
    pub fn resolve(&self, name_or_id: &str) -> Result<&JobTemplate, ValidationError> {
        self.by_name
            .get(&name_or_id.to_lowercase())
            .or_else(|| self.by_id.get(name_or_id))
            .map(|&idx| &self.templates[idx])
            .ok_or_else(|| ValidationError::UnknownTemplate(name_or_id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
