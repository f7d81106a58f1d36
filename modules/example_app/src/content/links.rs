//! Link resolution for entry collections.
//!
//! The API answers with `items` plus an `includes` section holding linked
//! entries and assets. Links inside `fields` are replaced by their targets,
//! recursively, up to the requested include depth. Links that cannot be
//! resolved are removed: dropped from arrays, omitted from objects.

use std::collections::HashMap;

use serde_json::{Map, Value};

type LinkIndex<'a> = HashMap<(&'a str, &'a str), &'a Value>;

/// Resolve every item of a collection response.
pub fn resolve_collection(response: &Value, depth: u32) -> Vec<Value> {
    let items = response
        .get("items")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();

    let mut index: LinkIndex<'_> = HashMap::new();
    for item in items {
        if let Some(key) = entity_key(item, "Entry") {
            index.insert(key, item);
        }
    }
    if let Some(includes) = response.get("includes") {
        for link_type in ["Entry", "Asset"] {
            let included = includes
                .get(link_type)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();
            for entity in included {
                if let Some(key) = entity_key(entity, link_type) {
                    index.insert(key, entity);
                }
            }
        }
    }

    items
        .iter()
        .map(|item| resolve_entity(item, &index, depth))
        .collect()
}

fn entity_key<'a>(entity: &'a Value, link_type: &'a str) -> Option<(&'a str, &'a str)> {
    let id = entity.pointer("/sys/id")?.as_str()?;
    Some((link_type, id))
}

/// `(linkType, id)` if `node` is a link to an entry or asset.
fn as_link(node: &Value) -> Option<(&str, &str)> {
    let sys = node.get("sys")?;
    if sys.get("type")?.as_str()? != "Link" {
        return None;
    }
    let link_type = sys.get("linkType")?.as_str()?;
    if link_type != "Entry" && link_type != "Asset" {
        return None;
    }
    Some((link_type, sys.get("id")?.as_str()?))
}

// `sys` is left as-is: it holds links of its own (content type, space) that
// must stay links.
fn resolve_entity(entity: &Value, index: &LinkIndex<'_>, remaining: u32) -> Value {
    let mut out = entity.clone();
    if let (Some(fields), Value::Object(map)) = (entity.get("fields"), &mut out) {
        let resolved = resolve_node(fields, index, remaining).unwrap_or(Value::Null);
        map.insert("fields".to_string(), resolved);
    }
    out
}

fn resolve_node(node: &Value, index: &LinkIndex<'_>, remaining: u32) -> Option<Value> {
    if let Some(key) = as_link(node) {
        if remaining == 0 {
            return None;
        }
        let target = index.get(&key)?;
        return Some(resolve_entity(target, index, remaining - 1));
    }

    Some(match node {
        Value::Array(items) => Value::Array(
            items
                .iter()
                .filter_map(|item| resolve_node(item, index, remaining))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .filter_map(|(k, v)| resolve_node(v, index, remaining).map(|v| (k.clone(), v)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    })
}
