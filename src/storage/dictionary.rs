use fxhash::FxHashMap;

/// Interned label values of one string column.
///
/// Filled while a table is built, then read-only once the table is shared.
#[derive(Debug, Clone, Default)]
pub struct StringDictionary {
    ids: FxHashMap<String, u32>,
    values: Vec<String>,
}

impl StringDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of `value`, interning it on first sight
    pub fn intern(&mut self, value: &str) -> u32 {
        if let Some(&id) = self.ids.get(value) {
            return id;
        }
        let id = self.values.len() as u32;
        self.values.push(value.to_string());
        self.ids.insert(value.to_string(), id);
        id
    }

    pub fn resolve(&self, id: u32) -> Option<&str> {
        self.values.get(id as usize).map(String::as_str)
    }

    pub fn id_of(&self, value: &str) -> Option<u32> {
        self.ids.get(value).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Each value is held twice: once as a map key, once in id order.
    pub fn memory_usage(&self) -> usize {
        let text: usize = self.values.iter().map(|v| v.capacity() * 2).sum();
        let slots = self.values.capacity() * std::mem::size_of::<String>()
            + self.ids.capacity() * (std::mem::size_of::<String>() + std::mem::size_of::<u32>());
        text + slots
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_assigns_dense_ids() {
        let mut dict = StringDictionary::new();

        assert_eq!(dict.intern("a:9100"), 0);
        assert_eq!(dict.intern("b:9100"), 1);
        assert_eq!(dict.intern("a:9100"), 0);
        assert_eq!(dict.len(), 2);
    }

    #[test]
    fn test_resolve_and_id_of() {
        let mut dict = StringDictionary::new();
        assert!(dict.is_empty());
        assert_eq!(dict.id_of("Paris"), None);

        let id = dict.intern("Paris");
        assert_eq!(dict.id_of("Paris"), Some(id));
        assert_eq!(dict.resolve(id), Some("Paris"));
        assert_eq!(dict.resolve(7), None);
    }

    #[test]
    fn test_memory_usage_grows() {
        let mut dict = StringDictionary::new();
        let empty = dict.memory_usage();
        dict.intern("a-fairly-long-label-value");
        assert!(dict.memory_usage() > empty);
    }
}
