//! Typed definition of the index schema created on first use.

use serde::Serialize;

pub(crate) const SEMANTIC_CONFIG_NAME: &str = "azureml-default";
pub(crate) const VECTOR_CONFIG_NAME: &str = "default";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IndexSchema {
    pub(crate) name: String,
    pub(crate) fields: Vec<FieldSchema>,
    pub(crate) suggesters: Vec<serde_json::Value>,
    pub(crate) scoring_profiles: Vec<serde_json::Value>,
    pub(crate) semantic: SemanticSettings,
    pub(crate) vector_search: VectorSearchSettings,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FieldSchema {
    pub(crate) name: &'static str,
    #[serde(rename = "type")]
    pub(crate) field_type: &'static str,
    pub(crate) searchable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) key: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) sortable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) facetable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) filterable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) retrievable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) analyzer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) dimensions: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) vector_search_configuration: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SemanticSettings {
    pub(crate) configurations: Vec<SemanticConfiguration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SemanticConfiguration {
    pub(crate) name: &'static str,
    pub(crate) prioritized_fields: PrioritizedFields,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrioritizedFields {
    pub(crate) title_field: NamedField,
    pub(crate) prioritized_content_fields: Vec<NamedField>,
    pub(crate) prioritized_keywords_fields: Vec<NamedField>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NamedField {
    pub(crate) field_name: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VectorSearchSettings {
    pub(crate) algorithm_configurations: Vec<AlgorithmConfiguration>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AlgorithmConfiguration {
    pub(crate) name: &'static str,
    pub(crate) kind: &'static str,
}

impl FieldSchema {
    fn text(name: &'static str) -> Self {
        Self {
            name,
            field_type: "Edm.String",
            searchable: true,
            key: None,
            sortable: None,
            facetable: None,
            filterable: None,
            retrievable: None,
            analyzer: None,
            dimensions: None,
            vector_search_configuration: None,
        }
    }
}

/// Build the schema body used when the index is created.
pub(crate) fn index_schema(index_name: &str, vector_dimension: usize) -> IndexSchema {
    IndexSchema {
        name: index_name.to_string(),
        fields: vec![
            FieldSchema {
                key: Some(true),
                ..FieldSchema::text("id")
            },
            FieldSchema {
                sortable: Some(false),
                facetable: Some(false),
                filterable: Some(false),
                ..FieldSchema::text("content")
            },
            FieldSchema {
                sortable: Some(false),
                facetable: Some(false),
                filterable: Some(false),
                ..FieldSchema::text("title")
            },
            FieldSchema {
                sortable: Some(false),
                facetable: Some(false),
                filterable: Some(true),
                ..FieldSchema::text("filepath")
            },
            FieldSchema::text("url"),
            FieldSchema::text("metadata"),
            FieldSchema {
                field_type: "Collection(Edm.Single)",
                retrievable: Some(true),
                dimensions: Some(vector_dimension),
                vector_search_configuration: Some(VECTOR_CONFIG_NAME),
                ..FieldSchema::text("contentVector")
            },
        ],
        suggesters: Vec::new(),
        scoring_profiles: Vec::new(),
        semantic: SemanticSettings {
            configurations: vec![SemanticConfiguration {
                name: SEMANTIC_CONFIG_NAME,
                prioritized_fields: PrioritizedFields {
                    title_field: NamedField {
                        field_name: "title",
                    },
                    prioritized_content_fields: vec![NamedField {
                        field_name: "content",
                    }],
                    prioritized_keywords_fields: Vec::new(),
                },
            }],
        },
        vector_search: VectorSearchSettings {
            algorithm_configurations: vec![AlgorithmConfiguration {
                name: VECTOR_CONFIG_NAME,
                kind: "hnsw",
            }],
        },
    }
}
