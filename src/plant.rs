//! "Plant your tree" form: two names and a species, submitted to the backend.
//! Errors stay on the form until the user edits a field or resubmits.

use crate::api_client::ForestClient;
use crate::models::{Species, Tree};

pub const MISSING_NAMES: &str = "Please fill in both name fields";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    UserName,
    TreeName,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlantForm {
    user_name: String,
    tree_name: String,
    species: Species,
    error: Option<String>,
    submitting: bool,
}

impl PlantForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_field(&mut self, field: Field, value: &str) {
        match field {
            Field::UserName => self.user_name = value.to_string(),
            Field::TreeName => self.tree_name = value.to_string(),
        }
        self.error = None;
    }

    pub fn set_species(&mut self, species: Species) {
        self.species = species;
        self.error = None;
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn tree_name(&self) -> &str {
        &self.tree_name
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// Trimmed names, or the inline message when either is blank
    pub fn validate(&self) -> Result<(&str, &str), &'static str> {
        let user = self.user_name.trim();
        let tree = self.tree_name.trim();
        if user.is_empty() || tree.is_empty() {
            return Err(MISSING_NAMES);
        }
        Ok((user, tree))
    }

    /// Returns the created tree and resets the form on success. On failure
    /// the message is kept on the form and `None` is returned.
    pub async fn submit(&mut self, client: &ForestClient) -> Option<Tree> {
        let (user, tree) = match self.validate() {
            Ok((user, tree)) => (user.to_string(), tree.to_string()),
            Err(message) => {
                self.error = Some(message.to_string());
                return None;
            }
        };

        self.submitting = true;
        self.error = None;
        let outcome = client.plant_tree(&user, &tree, self.species).await;
        self.submitting = false;

        match outcome {
            Ok(planted) => {
                log::info!("[Plant] {} planted '{}' ({})", planted.planter_name, planted.name, planted.tree_type);
                *self = PlantForm::default();
                Some(planted)
            }
            Err(e) => {
                log::warn!("[Plant] Rejected: {}", e);
                self.error = Some(e.message().to_string());
                None
            }
        }
    }
}
