use opentelemetry::KeyValue;

/// Inserts `attribute` into `attributes`, replacing an existing entry with
/// the same key so a key occurs at most once. Insertion order is preserved
/// for first occurrences.
pub(crate) fn merge_attribute(attributes: &mut Vec<KeyValue>, attribute: KeyValue) {
    match attributes.iter_mut().find(|kv| kv.key == attribute.key) {
        Some(existing) => *existing = attribute,
        None => attributes.push(attribute),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_in_place_and_appends_new() {
        let mut attrs = vec![KeyValue::new("a", "1"), KeyValue::new("b", "2")];
        merge_attribute(&mut attrs, KeyValue::new("a", "override"));
        merge_attribute(&mut attrs, KeyValue::new("c", "3"));
        assert_eq!(attrs.len(), 3);
        assert_eq!(attrs[0].value.as_str(), "override");
        assert_eq!(attrs[2].key.as_str(), "c");
    }
}
