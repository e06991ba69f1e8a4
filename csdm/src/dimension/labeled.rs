use serde_json::Value;

use crate::errors::{Error, Result};
use crate::helpers::{
    get_application, get_string, get_string_list, insert_application, insert_text, Object,
};

/// A dimension whose coordinates are text labels.
///
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDimension {
    labels: Vec<String>,
    pub label: String,
    pub description: String,
    pub application: Object,
}

impl LabeledDimension {
    /// Create a labeled dimension.
    ///
    /// # Arguments
    ///
    /// * `labels` - The coordinates. At least one is required.
    ///
    pub fn new<S: Into<String>>(labels: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut dimension = Self {
            labels: vec![],
            label: String::new(),
            description: String::new(),
            application: Object::new(),
        };
        dimension.set_labels(labels)?;

        Ok(dimension)
    }

    pub(crate) fn from_object(object: &Object, context: &str) -> Result<Self> {
        let labels = get_string_list(object, "labels", context)?
            .ok_or_else(|| Error::missing("labels", context))?;
        let mut dimension = Self::new(labels)?;
        dimension.label = get_string(object, "label", context)?;
        dimension.description = get_string(object, "description", context)?;
        dimension.application = get_application(object, context)?;

        Ok(dimension)
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// Replace the labels. The count of the dimension becomes the number of labels.
    ///
    pub fn set_labels<S: Into<String>>(&mut self, labels: impl IntoIterator<Item = S>) -> Result<()> {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(Error::Value(
                "a labeled dimension needs at least one label".to_string(),
            ));
        }
        self.labels = labels;

        Ok(())
    }

    pub fn count(&self) -> usize {
        self.labels.len()
    }

    /// Keep the labels at `indices`, which must be in bounds.
    pub(crate) fn select(&self, indices: &[usize]) -> Self {
        Self {
            labels: indices.iter().map(|&i| self.labels[i].clone()).collect(),
            ..self.clone()
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut object = Object::new();
        object.insert("type".to_string(), Value::String("labeled".to_string()));
        insert_text(&mut object, "description", self.description.trim());
        object.insert(
            "labels".to_string(),
            Value::Array(self.labels.iter().cloned().map(Value::String).collect()),
        );
        insert_text(&mut object, "label", self.label.trim());
        insert_application(&mut object, &self.application);

        Value::Object(object)
    }
}
