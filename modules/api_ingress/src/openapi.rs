//! Assembly of the served OpenAPI document from per-module fragments.

use utoipa::openapi::{Components, InfoBuilder, OpenApi, OpenApiBuilder};

pub(crate) fn base_document() -> OpenApi {
    OpenApiBuilder::new()
        .info(
            InfoBuilder::new()
                .title("Academy API")
                .version(env!("CARGO_PKG_VERSION"))
                .description(Some(
                    "School management API for music and dance academies",
                ))
                .build(),
        )
        .build()
}

/// Folds `doc` into `base`. Paths and component names that already exist
/// are left untouched and returned so the caller can report them.
pub(crate) fn merge_into(base: &mut OpenApi, doc: OpenApi) -> Vec<String> {
    let mut skipped = Vec::new();

    for (path, item) in doc.paths.paths {
        if base.paths.paths.contains_key(&path) {
            skipped.push(path);
            continue;
        }
        base.paths.paths.insert(path, item);
    }

    if let Some(incoming) = doc.components {
        let components = base.components.get_or_insert_with(Components::new);
        for (name, schema) in incoming.schemas {
            components.schemas.entry(name).or_insert(schema);
        }
        for (name, response) in incoming.responses {
            components.responses.entry(name).or_insert(response);
        }
        for (name, scheme) in incoming.security_schemes {
            components.security_schemes.entry(name).or_insert(scheme);
        }
    }

    if let Some(tags) = doc.tags {
        let existing = base.tags.get_or_insert_with(Vec::new);
        for tag in tags {
            if !existing.iter().any(|t| t.name == tag.name) {
                existing.push(tag);
            }
        }
    }

    skipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fragment(paths: serde_json::Value) -> OpenApi {
        serde_json::from_value(json!({
            "openapi": "3.1.0",
            "info": { "title": "fragment", "version": "0" },
            "paths": paths,
            "components": { "schemas": { "Course": { "type": "object" } } },
            "tags": [{ "name": "courses" }]
        }))
        .unwrap()
    }

    #[test]
    fn merges_paths_and_components() {
        let mut base = base_document();
        let skipped = merge_into(
            &mut base,
            fragment(json!({ "/api/courses": { "get": { "responses": {} } } })),
        );
        assert!(skipped.is_empty());
        assert!(base.paths.paths.contains_key("/api/courses"));
        assert!(base
            .components
            .as_ref()
            .is_some_and(|c| c.schemas.contains_key("Course")));
        assert_eq!(base.info.title, "Academy API");
    }

    #[test]
    fn duplicate_paths_are_skipped_and_reported() {
        let mut base = base_document();
        merge_into(
            &mut base,
            fragment(json!({ "/api/courses": { "get": { "responses": {} } } })),
        );
        let skipped = merge_into(
            &mut base,
            fragment(json!({
                "/api/courses": { "post": { "responses": {} } },
                "/api/branches": { "get": { "responses": {} } }
            })),
        );
        assert_eq!(skipped, vec!["/api/courses".to_string()]);
        assert_eq!(base.paths.paths.len(), 2);
        assert_eq!(base.tags.as_ref().map(Vec::len), Some(1));
    }
}
